//! SQS subsegments
//!
//! Calls are identified by their queue URL, e.g.
//! `https://sqs.us-east-1.amazonaws.com/111111111111/test-msg-queue`; the
//! queue name is the last path segment and the host usually names the region.

use std::sync::LazyLock;

use log::warn;
use regex::Regex;

use super::{payload, required, CallerContext, MissingField, ResourceExtractor};
use crate::accumulator::ResourceActionMap;
use crate::trace::SegmentDocument;

const QUEUE_URL_REGION_PATTERN: &str =
    r"^https?://(?:sqs\.)?([a-z]{2}(?:-[a-z]+)+-\d+)\.(?:queue\.)?amazonaws\.com";

/// Matches both `sqs.<region>.amazonaws.com` and the legacy `<region>.queue.amazonaws.com`
/// hosts. The region-less `sqs.amazonaws.com` and `queue.amazonaws.com` hosts don't match.
#[allow(clippy::expect_used)]
static QUEUE_URL_REGION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(QUEUE_URL_REGION_PATTERN).expect("queue url pattern is valid")
});

fn region_from_queue_url(queue_url: &str) -> Option<&str> {
    QUEUE_URL_REGION
        .captures(queue_url)
        .and_then(|captures| captures.get(1))
        .map(|region| region.as_str())
}

fn queue_name_from_url(queue_url: &str) -> Option<&str> {
    queue_url
        .rsplit_once('/')
        .map(|(_, name)| name)
        .filter(|name| !name.is_empty())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct QueueCall<'a> {
    operation: &'a str,
    queue_name: &'a str,
    region: Option<&'a str>,
}

impl<'a> QueueCall<'a> {
    fn from_segment(segment: &'a SegmentDocument) -> Result<Self, MissingField> {
        let aws = payload(segment)?;
        let operation = required(&aws.operation, "operation")?;
        let queue_url = required(&aws.queue_url, "queue_url")?;
        let queue_name = queue_name_from_url(queue_url).ok_or(MissingField("queue name"))?;
        Ok(Self {
            operation,
            queue_name,
            region: aws
                .region
                .as_deref()
                .filter(|region| !region.is_empty())
                .or_else(|| region_from_queue_url(queue_url)),
        })
    }
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SqsExtractor;

impl ResourceExtractor for SqsExtractor {
    fn segment_name(&self) -> &'static str {
        "SQS"
    }

    fn iam_service(&self) -> &'static str {
        "sqs"
    }

    fn extract(
        &self,
        segment: &SegmentDocument,
        actions: &mut ResourceActionMap,
        caller: &CallerContext<'_>,
    ) {
        let call = match QueueCall::from_segment(segment) {
            Ok(call) => call,
            Err(missing) => {
                warn!(
                    "Couldn't extract SQS info for segment [{}]: {}",
                    segment.id, missing
                );
                return;
            }
        };
        let region = caller.region(call.region);
        actions.add_action(
            format!("arn:aws:sqs:{region}:*:{}", call.queue_name),
            call.operation,
        );
    }
}
