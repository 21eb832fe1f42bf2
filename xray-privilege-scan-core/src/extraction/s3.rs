//! S3 subsegments
//!
//! S3 ARNs carry neither region nor account. Operations are classified after
//! aliasing into account-wide operations (`arn:aws:s3:::*`), bucket-level
//! operations (`arn:aws:s3:::bucket`) and object-level operations
//! (`arn:aws:s3:::bucket/*`).

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use super::{canonical_operation, payload, required, CallerContext, MissingField, ResourceExtractor};
use crate::accumulator::ResourceActionMap;
use crate::trace::SegmentDocument;

/// SDK operation names that differ from the IAM action they require
const OPERATION_ALIASES: &[(&str, &str)] = &[
    // the Java SDK calls it SetObjectTagging
    ("SetObjectTagging", "PutObjectTagging"),
    ("ListObjectsV2", "ListBucket"),
    ("ListObjects", "ListBucket"),
    ("CreateMultipartUpload", "PutObject"),
    ("InitiateMultipartUpload", "PutObject"),
    ("ListBuckets", "ListAllMyBuckets"),
];

/// Actions granted on the account-wide `arn:aws:s3:::*` resource
const GLOBAL_ACTIONS: &[&str] = &["ListAllMyBuckets", "CreateBucket", "DeleteBucket"];

const ALL_BUCKETS: &str = "arn:aws:s3:::*";

const BUCKET_ACTIONS_PATTERN: &str = concat!(
    "^(ListBucketVersions|ListBucketMultipartUploads|ListBucket",
    "|GetBucket.+|PutBucket.+|DeleteBucket.+",
    "|.+EncryptionConfiguration|.+InventoryConfiguration|.+LifecycleConfiguration",
    "|.+MetricsConfiguration|.+ReplicationConfiguration|.+AnalyticsConfiguration",
    "|.+AccelerateConfiguration)$",
);

/// Actions that apply to the bucket itself rather than to objects in it
#[allow(clippy::expect_used)]
static BUCKET_ACTIONS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(BUCKET_ACTIONS_PATTERN).expect("bucket action pattern is valid"));

/// Resource scope of an S3 action
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Scope {
    Account,
    Bucket,
    Object,
}

fn scope_of(action: &str) -> Scope {
    if GLOBAL_ACTIONS.contains(&action) {
        Scope::Account
    } else if BUCKET_ACTIONS.is_match(action) {
        Scope::Bucket
    } else {
        Scope::Object
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct S3Extractor;

impl S3Extractor {
    fn resource_for(segment: &SegmentDocument, action: &str) -> Result<String, MissingField> {
        let scope = scope_of(action);
        if scope == Scope::Account {
            return Ok(ALL_BUCKETS.to_string());
        }
        let aws = payload(segment)?;
        let bucket = required(&aws.bucket_name, "bucket_name")?;
        Ok(match scope {
            Scope::Bucket => format!("arn:aws:s3:::{bucket}"),
            Scope::Account | Scope::Object => format!("arn:aws:s3:::{bucket}/*"),
        })
    }
}

impl ResourceExtractor for S3Extractor {
    fn segment_name(&self) -> &'static str {
        "S3"
    }

    fn iam_service(&self) -> &'static str {
        "s3"
    }

    fn extract(
        &self,
        segment: &SegmentDocument,
        actions: &mut ResourceActionMap,
        _caller: &CallerContext<'_>,
    ) {
        let operation = match payload(segment).and_then(|aws| required(&aws.operation, "operation")) {
            Ok(operation) => operation,
            Err(missing) => {
                warn!(
                    "Couldn't extract S3 info for segment [{}] (skipping): {}",
                    segment.id, missing
                );
                return;
            }
        };
        let action = canonical_operation(OPERATION_ALIASES, operation);
        match Self::resource_for(segment, action) {
            Ok(resource) => actions.add_action(resource, action),
            Err(missing) => warn!(
                "Couldn't extract S3 bucket for op [{}] on segment [{}] (skipping): {}",
                action, segment.id, missing
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extraction::test_utils::service_segment;
    use rstest::rstest;
    use serde_json::json;

    #[test]
    fn test_bucket_action_pattern_compiles() {
        assert!(Regex::new(BUCKET_ACTIONS_PATTERN).is_ok());
    }

    fn extract(aws: serde_json::Value) -> ResourceActionMap {
        let segment = service_segment("S3", aws);
        let mut actions = ResourceActionMap::new();
        S3Extractor.extract(&segment, &mut actions, &CallerContext::default());
        actions
    }

    #[rstest]
    #[case("ListObjectsV2", "ListBucket", "arn:aws:s3:::b")]
    #[case("ListObjects", "ListBucket", "arn:aws:s3:::b")]
    #[case("GetBucketLocation", "GetBucketLocation", "arn:aws:s3:::b")]
    #[case("PutLifecycleConfiguration", "PutLifecycleConfiguration", "arn:aws:s3:::b")]
    #[case("GetObject", "GetObject", "arn:aws:s3:::b/*")]
    #[case("SetObjectTagging", "PutObjectTagging", "arn:aws:s3:::b/*")]
    #[case("CreateMultipartUpload", "PutObject", "arn:aws:s3:::b/*")]
    #[case("ListBuckets", "ListAllMyBuckets", "arn:aws:s3:::*")]
    #[case("CreateBucket", "CreateBucket", "arn:aws:s3:::*")]
    #[case("DeleteBucket", "DeleteBucket", "arn:aws:s3:::*")]
    #[case("DeleteBucketPolicy", "DeleteBucketPolicy", "arn:aws:s3:::b")]
    fn test_operation_scope(#[case] operation: &str, #[case] action: &str, #[case] resource: &str) {
        let actions = extract(json!({"operation": operation, "bucket_name": "b"}));
        assert_eq!(actions.len(), 1);
        assert!(
            actions.actions(resource).unwrap().contains(action),
            "{operation} should map to {action} on {resource}"
        );
    }

    #[test]
    fn test_global_action_without_bucket() {
        let actions = extract(json!({"operation": "ListBuckets"}));
        assert!(actions.actions("arn:aws:s3:::*").unwrap().contains("ListAllMyBuckets"));
    }

    #[test]
    fn test_missing_bucket_is_skipped() {
        assert!(extract(json!({"operation": "GetObject"})).is_empty());
    }

    #[test]
    fn test_empty_payload_is_skipped() {
        assert!(extract(json!({})).is_empty());
    }
}
