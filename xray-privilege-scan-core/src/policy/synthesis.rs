//! Policy synthesis from one function's resource/action facts

use std::collections::BTreeMap;

use log::error;

use super::{IamPolicyDocument, IamStatement};
use crate::accumulator::ResourceActionMap;
use crate::arn::service_from_arn;

/// Build the least-privilege policy for `subject` from its observed facts.
///
/// Actions are qualified with the service prefix of their resource ARN. Resources
/// whose qualified action lists are identical share one `Allow` statement.
pub fn synthesize(actions: &ResourceActionMap, subject: &str) -> IamPolicyDocument {
    if actions.is_empty() {
        return IamPolicyDocument::new(
            format!("No permissions were inferred from X-Ray traces for: {subject}"),
            Vec::new(),
        );
    }

    // sorted qualified actions -> resources requiring exactly those actions
    let mut groups: BTreeMap<Vec<String>, Vec<String>> = BTreeMap::new();
    for (resource, resource_actions) in actions.iter() {
        let service = service_from_arn(resource).unwrap_or_else(|| {
            error!("Couldn't extract service name from resource arn: {}", resource);
            ""
        });
        let mut qualified: Vec<String> = resource_actions
            .iter()
            .map(|action| format!("{service}:{action}"))
            .collect();
        qualified.sort();
        groups.entry(qualified).or_default().push(resource.to_string());
    }

    let statement = groups
        .into_iter()
        .map(|(actions, resources)| IamStatement::allow(actions, resources))
        .collect();

    IamPolicyDocument::new(
        format!("Generated policy from X-Ray trace scan for: {subject}"),
        statement,
    )
}
