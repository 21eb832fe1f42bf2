//! SNS subsegments
//!
//! ```json
//! {
//!     "name": "SNS",
//!     "namespace": "aws",
//!     "aws": {
//!         "operation": "ListSubscriptionsByTopic",
//!         "region": "us-east-1",
//!         "topic_arn": "arn:aws:sns:us-east-1:123456789012:test-topic"
//!     }
//! }
//! ```

use log::warn;

use super::{payload, required, CallerContext, MissingField, ResourceExtractor};
use crate::accumulator::ResourceActionMap;
use crate::arn::{region_from_arn, resource_name_from_arn};
use crate::trace::SegmentDocument;

/// Actions that are not tied to a single topic
const GLOBAL_ACTIONS: &[&str] = &[
    "ListTopics",
    "ListPlatformApplications",
    "ListSubscriptions",
    "CreateTopic",
    "CreatePlatformApplication",
];

#[derive(Debug, Clone, Copy, Default)]
pub struct SnsExtractor;

impl SnsExtractor {
    fn resource_for<'a>(
        segment: &'a SegmentDocument,
        operation: &str,
        caller: &CallerContext<'a>,
    ) -> Result<String, MissingField> {
        let aws = payload(segment)?;
        let explicit_region = aws.region.as_deref().filter(|region| !region.is_empty());

        if GLOBAL_ACTIONS.contains(&operation) {
            let region = caller.region(explicit_region);
            return Ok(format!("arn:aws:sns:{region}:*:*"));
        }

        let topic_arn = required(&aws.topic_arn, "topic_arn")?;
        let topic = resource_name_from_arn(topic_arn).unwrap_or(topic_arn);
        let region = caller.region(explicit_region.or_else(|| region_from_arn(topic_arn)));
        Ok(format!("arn:aws:sns:{region}:*:{topic}"))
    }
}

impl ResourceExtractor for SnsExtractor {
    fn segment_name(&self) -> &'static str {
        "SNS"
    }

    fn iam_service(&self) -> &'static str {
        "sns"
    }

    fn extract(
        &self,
        segment: &SegmentDocument,
        actions: &mut ResourceActionMap,
        caller: &CallerContext<'_>,
    ) {
        let operation = match payload(segment).and_then(|aws| required(&aws.operation, "operation")) {
            Ok(operation) => operation,
            Err(missing) => {
                warn!(
                    "Couldn't extract SNS info for segment [{}]: {}",
                    segment.id, missing
                );
                return;
            }
        };
        match Self::resource_for(segment, operation, caller) {
            Ok(resource) => actions.add_action(resource, operation),
            Err(missing) => warn!(
                "Couldn't extract SNS topic for op [{}] on segment [{}] (skipping): {}",
                operation, segment.id, missing
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::test_utils::service_segment;
    use serde_json::json;

    const CALLER: &str = "arn:aws:lambda:us-west-2:123456789012:function:notifier";

    fn extract(aws: serde_json::Value) -> ResourceActionMap {
        let segment = service_segment("SNS", aws);
        let mut actions = ResourceActionMap::new();
        SnsExtractor.extract(&segment, &mut actions, &CallerContext::new(Some(CALLER), None));
        actions
    }

    #[test]
    fn test_topic_action_drops_account() {
        let actions = extract(json!({
            "operation": "Publish",
            "topic_arn": "arn:aws:sns:us-east-1:123456789012:test-topic"
        }));
        assert!(actions
            .actions("arn:aws:sns:us-east-1:*:test-topic")
            .unwrap()
            .contains("Publish"));
    }

    #[test]
    fn test_global_action_uses_caller_region() {
        let actions = extract(json!({"operation": "ListTopics"}));
        assert!(actions
            .actions("arn:aws:sns:us-west-2:*:*")
            .unwrap()
            .contains("ListTopics"));
    }

    #[test]
    fn test_missing_topic_is_skipped() {
        assert!(extract(json!({"operation": "Publish"})).is_empty());
    }
}
