//! Excess permission detection
//!
//! Compares the statements a role currently grants (effective) with the
//! statements generated from traces (desired). Only `Allow` statements over the
//! services the engine can observe take part; everything else the role grants is
//! outside what traces can prove or disprove.

use std::collections::{BTreeMap, BTreeSet};

use log::debug;

use super::{Effect, IamStatement, OneOrMany};
use crate::arn::{service_from_arn, wildcard_account};
use crate::extraction::ExtractorRegistry;

const WILDCARD: &str = "*";

/// Action to the resources it is granted on
pub type ActionResourceMap = BTreeMap<String, BTreeSet<String>>;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PolicyComparator {
    services: BTreeSet<String>,
}

impl PolicyComparator {
    /// Comparator restricted to the given IAM service prefixes
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            services: services.into_iter().map(Into::into).collect(),
        }
    }

    /// Comparator over every service the registry can extract
    pub fn for_registry(registry: &ExtractorRegistry) -> Self {
        Self::new(registry.iam_services())
    }

    fn is_supported_action(&self, action: &str) -> bool {
        action == WILDCARD
            || action
                .split_once(':')
                .is_some_and(|(service, _)| self.services.contains(service))
    }

    fn is_supported_resource(&self, resource: &str) -> bool {
        resource == WILDCARD
            || service_from_arn(resource).is_some_and(|service| self.services.contains(service))
    }

    /// Expand `Allow` statements into an action to resource-set map, keeping
    /// only supported actions and resources
    pub fn action_resource_map(&self, statements: &[IamStatement]) -> ActionResourceMap {
        let mut mapped = ActionResourceMap::new();
        for statement in statements.iter().filter(|s| s.effect == Effect::Allow) {
            let resources = statement.resources();
            for action in statement.actions() {
                if !self.is_supported_action(action) {
                    continue;
                }
                let granted = mapped.entry(action.to_string()).or_default();
                granted.extend(
                    resources
                        .iter()
                        .filter(|resource| self.is_supported_resource(resource))
                        .map(|resource| (*resource).to_string()),
                );
            }
        }
        mapped
    }

    /// Statements granted by `effective` but not needed according to `desired`.
    ///
    /// Returns `None` when `desired` covers everything `effective` grants for the
    /// supported services.
    pub fn compare(
        &self,
        effective: &[IamStatement],
        desired: &[IamStatement],
    ) -> Option<Vec<IamStatement>> {
        let effective = self.action_resource_map(effective);
        let desired = self.action_resource_map(desired);

        let mut excess = Vec::new();
        for (action, effective_resources) in &effective {
            let unneeded: Vec<String> = match desired.get(action) {
                Some(desired_resources) if !desired_resources.is_empty() => effective_resources
                    .iter()
                    .filter(|resource| !desired_resources.contains(&wildcard_account(resource)))
                    .cloned()
                    .collect(),
                _ => effective_resources.iter().cloned().collect(),
            };
            if unneeded.is_empty() {
                continue;
            }
            debug!("Excess resources for action {}: {:?}", action, unneeded);
            excess.push(IamStatement::allow(action.as_str(), unneeded));
        }

        if excess.is_empty() {
            None
        } else {
            Some(unite_statements(excess))
        }
    }
}

/// Merge statements that grant actions on exactly one resource into one
/// statement per resource. Statements over several resources are kept as they are.
pub fn unite_statements(statements: Vec<IamStatement>) -> Vec<IamStatement> {
    let mut united = Vec::new();
    let mut resource_actions: BTreeMap<String, Vec<String>> = BTreeMap::new();

    for statement in statements {
        let single_resource = match statement.resources().as_slice() {
            [resource] => Some((*resource).to_string()),
            _ => None,
        };
        match single_resource {
            Some(resource) => {
                let actions = resource_actions.entry(resource).or_default();
                for action in statement.actions() {
                    if !actions.iter().any(|a| a == action) {
                        actions.push(action.to_string());
                    }
                }
            }
            None => united.push(statement),
        }
    }

    united.extend(
        resource_actions
            .into_iter()
            .map(|(resource, actions)| IamStatement::allow(OneOrMany::Multiple(actions), resource)),
    );
    united
}
