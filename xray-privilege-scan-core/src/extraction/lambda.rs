//! Lambda subsegments, recorded when a function invokes another function
//!
//! ```json
//! {
//!     "name": "Lambda",
//!     "namespace": "aws",
//!     "aws": {
//!         "operation": "Invoke",
//!         "region": "us-east-1",
//!         "function_name": "java-test-dev-hello",
//!         "resource_names": ["java-test-dev-hello"]
//!     }
//! }
//! ```

use log::warn;

use super::{canonical_operation, payload, required, CallerContext, MissingField, ResourceExtractor};
use crate::accumulator::ResourceActionMap;
use crate::arn::region_from_arn;
use crate::trace::SegmentDocument;

/// See <https://docs.aws.amazon.com/lambda/latest/dg/lambda-api-permissions-ref.html>
const OPERATION_ALIASES: &[(&str, &str)] = &[
    ("Invoke", "InvokeFunction"),
    ("InvokeAsync", "InvokeFunction"),
    ("InvokeWithResponseStream", "InvokeFunction"),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct InvokeCall<'a> {
    operation: &'a str,
    function_name: &'a str,
    region: Option<&'a str>,
}

impl<'a> InvokeCall<'a> {
    fn from_segment(segment: &'a SegmentDocument) -> Result<Self, MissingField> {
        let aws = payload(segment)?;
        let operation = required(&aws.operation, "operation")?;
        let function_name = required(&aws.function_name, "function_name")?;

        // `function_name` may also be given as a full or partial function ARN
        let (function_name, arn_region) = match function_name.split_once(":function:") {
            Some((prefix, rest)) => (
                rest.split(':').next().unwrap_or(rest),
                region_from_arn(function_name).or_else(|| region_from_arn(prefix)),
            ),
            None => (function_name, None),
        };

        Ok(Self {
            operation,
            function_name,
            region: aws
                .region
                .as_deref()
                .filter(|region| !region.is_empty())
                .or(arn_region),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct LambdaExtractor;

impl ResourceExtractor for LambdaExtractor {
    fn segment_name(&self) -> &'static str {
        "Lambda"
    }

    fn iam_service(&self) -> &'static str {
        "lambda"
    }

    fn extract(
        &self,
        segment: &SegmentDocument,
        actions: &mut ResourceActionMap,
        caller: &CallerContext<'_>,
    ) {
        let call = match InvokeCall::from_segment(segment) {
            Ok(call) => call,
            Err(missing) => {
                warn!(
                    "Couldn't extract Lambda info for segment [{}]: {}",
                    segment.id, missing
                );
                return;
            }
        };
        let region = caller.region(call.region);
        actions.add_action(
            format!("arn:aws:lambda:{region}:*:function:{}", call.function_name),
            canonical_operation(OPERATION_ALIASES, call.operation),
        );
    }
}
