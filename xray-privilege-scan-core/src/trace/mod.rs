//! X-Ray trace model
//!
//! [`Trace`] and [`Segment`] mirror the shape returned by the X-Ray `BatchGetTraces`
//! API, where every segment carries its document as a raw JSON string.
//! [`SegmentDocument`] is the decoded segment/subsegment tree the walker consumes.
//!
//! Decoding a document is lenient below the top level: a subsegment that is not a
//! segment object is dropped with a warning, and a field of an unexpected type
//! reads as absent. A malformed node therefore never hides its siblings.

use log::warn;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::errors::Result;

pub mod walker;

pub use walker::SegmentWalker;

/// Namespace X-Ray assigns to subsegments recording AWS SDK calls
pub const AWS_NAMESPACE: &str = "aws";

/// A trace as returned by the tracing backend
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Trace {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default)]
    pub segments: Vec<Segment>,
}

/// A top-level segment with its still-encoded document
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Segment {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

impl Trace {
    /// Decode a JSON array of traces in the `BatchGetTraces` shape
    pub fn list_from_json(json: &str) -> Result<Vec<Self>> {
        Ok(serde_json::from_str(json)?)
    }
}

/// A decoded segment or subsegment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SegmentDocument {
    #[serde(default, deserialize_with = "lenient_id")]
    pub id: String,
    /// Service name for AWS subsegments (`DynamoDB`, `S3`, ...), function or
    /// application name otherwise
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, deserialize_with = "lenient_payload", skip_serializing_if = "Option::is_none")]
    pub aws: Option<AwsPayload>,
    #[serde(default, deserialize_with = "lenient_subsegments", skip_serializing_if = "Vec::is_empty")]
    pub subsegments: Vec<SegmentDocument>,
}

/// The `aws` block of a segment. Every field is optional here; extractors
/// validate the fields their service requires.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwsPayload {
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub operation: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub region: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub table_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub bucket_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub function_name: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub queue_url: Option<String>,
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub topic_arn: Option<String>,
    /// Present only on segments representing an invoked function
    #[serde(default, deserialize_with = "lenient_string", skip_serializing_if = "Option::is_none")]
    pub function_arn: Option<String>,
}

impl AwsPayload {
    /// Whether the payload carries no usable field at all
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// A string field, or `None` when it holds any other JSON type
fn lenient_string<'de, D>(deserializer: D) -> std::result::Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(value) => Some(value),
        Value::Null => None,
        other => {
            warn!("Ignoring non-string segment field: {}", other);
            None
        }
    })
}

fn lenient_id<'de, D>(deserializer: D) -> std::result::Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(lenient_string(deserializer)?.unwrap_or_default())
}

fn lenient_payload<'de, D>(deserializer: D) -> std::result::Result<Option<AwsPayload>, D::Error>
where
    D: Deserializer<'de>,
{
    match Value::deserialize(deserializer)? {
        Value::Null => Ok(None),
        value @ Value::Object(_) => Ok(AwsPayload::deserialize(value)
            .map_err(|e| warn!("Ignoring undecodable aws block: {}", e))
            .ok()),
        other => {
            warn!("Ignoring aws block that is not an object: {}", other);
            Ok(None)
        }
    }
}

fn lenient_subsegments<'de, D>(
    deserializer: D,
) -> std::result::Result<Vec<SegmentDocument>, D::Error>
where
    D: Deserializer<'de>,
{
    let values = match Value::deserialize(deserializer)? {
        Value::Array(values) => values,
        Value::Null => return Ok(Vec::new()),
        other => {
            warn!("Ignoring subsegments that are not an array: {}", other);
            return Ok(Vec::new());
        }
    };
    Ok(values
        .into_iter()
        .filter_map(|value| match SegmentDocument::deserialize(value) {
            Ok(subsegment) => Some(subsegment),
            Err(e) => {
                warn!("Skipping undecodable subsegment: {}", e);
                None
            }
        })
        .collect())
}

impl SegmentDocument {
    /// Decode a segment document
    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Whether the node records a call made through an AWS SDK
    pub fn is_aws_call(&self) -> bool {
        self.namespace.as_deref() == Some(AWS_NAMESPACE)
    }

    /// The function identity marker, if this node represents an invoked function
    pub fn function_arn(&self) -> Option<&str> {
        self.aws
            .as_ref()
            .and_then(|aws| aws.function_arn.as_deref())
            .filter(|arn| !arn.is_empty())
    }

    /// The `aws` payload, treating an all-empty block as absent
    pub fn payload(&self) -> Option<&AwsPayload> {
        self.aws.as_ref().filter(|aws| !aws.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DYNAMO_SUBSEGMENT: &str = r#"{
        "id": "491547679650c254",
        "name": "DynamoDB",
        "start_time": 1515258497.911,
        "end_time": 1515258501.692,
        "http": { "response": { "status": 200 } },
        "aws": {
            "operation": "PutItem",
            "region": "us-east-1",
            "request_id": "E6QO2IJHL85I63K7N7KIQPP1UFVV4KQNSO5AEMVJF66Q9ASUAAJG",
            "retries": 0,
            "table_name": "gen-docs",
            "consumed_capacity": { "TableName": "gen-docs", "CapacityUnits": 1 },
            "resource_names": ["gen-docs"]
        },
        "namespace": "aws"
    }"#;

    #[test]
    fn test_decode_service_subsegment_ignores_unknown_fields() {
        let doc = SegmentDocument::from_json(DYNAMO_SUBSEGMENT).unwrap();
        assert_eq!(doc.id, "491547679650c254");
        assert_eq!(doc.name.as_deref(), Some("DynamoDB"));
        assert!(doc.is_aws_call());
        let aws = doc.payload().unwrap();
        assert_eq!(aws.operation.as_deref(), Some("PutItem"));
        assert_eq!(aws.table_name.as_deref(), Some("gen-docs"));
        assert!(doc.function_arn().is_none());
        assert!(doc.subsegments.is_empty());
    }

    #[test]
    fn test_function_arn_marker() {
        let doc = SegmentDocument::from_json(
            r#"{"id": "1", "name": "hello", "aws": {"function_arn": "arn:aws:lambda:us-east-2:1:function:hello"}}"#,
        )
        .unwrap();
        assert_eq!(
            doc.function_arn(),
            Some("arn:aws:lambda:us-east-2:1:function:hello")
        );
        assert!(!doc.is_aws_call());
    }

    #[test]
    fn test_empty_aws_block_is_not_a_payload() {
        let doc = SegmentDocument::from_json(r#"{"id": "1", "name": "S3", "namespace": "aws", "aws": {}}"#)
            .unwrap();
        assert!(doc.payload().is_none());
    }

    #[test]
    fn test_malformed_fields_read_as_absent() {
        let doc = SegmentDocument::from_json(
            r#"{"id": 7, "name": ["DynamoDB"], "namespace": "aws", "aws": {"operation": "PutItem", "table_name": ["a", "b"]}}"#,
        )
        .unwrap();
        assert_eq!(doc.id, "");
        assert!(doc.name.is_none());
        let aws = doc.payload().unwrap();
        assert_eq!(aws.operation.as_deref(), Some("PutItem"));
        assert!(aws.table_name.is_none());

        let doc = SegmentDocument::from_json(r#"{"id": "1", "aws": "PutItem", "subsegments": {}}"#)
            .unwrap();
        assert!(doc.aws.is_none());
        assert!(doc.subsegments.is_empty());
    }

    #[test]
    fn test_undecodable_subsegment_is_dropped() {
        let doc = SegmentDocument::from_json(
            r#"{"id": "root", "subsegments": [42, "call", {"id": "kept", "name": "S3"}]}"#,
        )
        .unwrap();
        assert_eq!(doc.subsegments.len(), 1);
        assert_eq!(doc.subsegments[0].id, "kept");
    }

    #[test]
    fn test_trace_list_from_json() {
        let traces = Trace::list_from_json(
            r#"[{"Id": "1-5a4f", "Duration": 1.2, "Segments": [{"Id": "abc", "Document": "{}"}]}, {"Id": "1-5a50"}]"#,
        )
        .unwrap();
        assert_eq!(traces.len(), 2);
        assert_eq!(traces[0].segments[0].document.as_deref(), Some("{}"));
        assert!(traces[1].segments.is_empty());
    }
}
