//! DynamoDB subsegments
//!
//! ```json
//! {
//!     "name": "DynamoDB",
//!     "namespace": "aws",
//!     "aws": {
//!         "operation": "PutItem",
//!         "region": "us-east-1",
//!         "table_name": "gen-docs",
//!         "resource_names": ["gen-docs"]
//!     }
//! }
//! ```

use log::warn;

use super::{payload, required, CallerContext, MissingField, ResourceExtractor};
use crate::accumulator::ResourceActionMap;
use crate::trace::SegmentDocument;

/// A validated call against a table
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct TableCall<'a> {
    operation: &'a str,
    table_name: &'a str,
    region: Option<&'a str>,
}

impl<'a> TableCall<'a> {
    fn from_segment(segment: &'a SegmentDocument) -> Result<Self, MissingField> {
        let aws = payload(segment)?;
        Ok(Self {
            operation: required(&aws.operation, "operation")?,
            table_name: required(&aws.table_name, "table_name")?,
            region: aws.region.as_deref(),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct DynamoDbExtractor;

impl ResourceExtractor for DynamoDbExtractor {
    fn segment_name(&self) -> &'static str {
        "DynamoDB"
    }

    fn iam_service(&self) -> &'static str {
        "dynamodb"
    }

    fn extract(
        &self,
        segment: &SegmentDocument,
        actions: &mut ResourceActionMap,
        caller: &CallerContext<'_>,
    ) {
        let call = match TableCall::from_segment(segment) {
            Ok(call) => call,
            Err(missing) => {
                warn!(
                    "Couldn't extract DynamoDB info for segment [{}]: {}",
                    segment.id, missing
                );
                return;
            }
        };
        let region = caller.region(call.region);
        actions.add_action(
            format!("arn:aws:dynamodb:{region}:*:table/{}", call.table_name),
            call.operation,
        );
    }
}
