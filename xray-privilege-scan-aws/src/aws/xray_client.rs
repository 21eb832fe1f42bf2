//! X-Ray trace retrieval
//!
//! `GetTraceSummaries` is paged through for the whole window first. The trace ids
//! are then fetched with `BatchGetTraces`, which accepts at most five ids per
//! request, keeping a bounded number of batch requests in flight.

use async_trait::async_trait;
use aws_sdk_xray::primitives::DateTime;
use aws_sdk_xray::types as xray;
use aws_sdk_xray::Client as XRayClient;
use futures::stream::{self, StreamExt, TryStreamExt};
use log::{debug, error, info};
use xray_privilege_scan_core::{ScanWindow, Segment, Trace, TraceSource};

use crate::aws::{AwsError, AwsResult};

/// `BatchGetTraces` limit
pub(crate) const MAX_TRACE_IDS_PER_BATCH: usize = 5;

const MAX_CONCURRENT_BATCHES: usize = 10;

pub struct XRayTraceSource {
    client: XRayClient,
}

/// Split trace ids into `BatchGetTraces` sized batches
pub(crate) fn batch_trace_ids(trace_ids: &[String]) -> Vec<Vec<String>> {
    trace_ids
        .chunks(MAX_TRACE_IDS_PER_BATCH)
        .map(<[String]>::to_vec)
        .collect()
}

/// Convert an SDK trace into the core trace model
pub(crate) fn to_core_trace(trace: &xray::Trace) -> Trace {
    Trace {
        id: trace.id().map(str::to_string),
        segments: trace
            .segments()
            .iter()
            .map(|segment| Segment {
                id: segment.id().map(str::to_string),
                document: segment.document().map(str::to_string),
            })
            .collect(),
    }
}

impl XRayTraceSource {
    pub fn new(client: XRayClient) -> Self {
        Self { client }
    }

    /// Ids of every trace in the window matching the filter expression
    async fn trace_ids(
        &self,
        window: ScanWindow,
        filter_expression: Option<&str>,
    ) -> AwsResult<Vec<String>> {
        let mut trace_ids = Vec::new();
        let mut next_token: Option<String> = None;
        let mut pages = 0;
        loop {
            let response = self
                .client
                .get_trace_summaries()
                .start_time(DateTime::from_secs(window.start.timestamp()))
                .end_time(DateTime::from_secs(window.end.timestamp()))
                .set_filter_expression(filter_expression.map(str::to_string))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AwsError::XRayError(format!("Failed to get trace summaries: {e}")))?;
            pages += 1;
            trace_ids.extend(
                response
                    .trace_summaries()
                    .iter()
                    .filter_map(|summary| summary.id())
                    .map(str::to_string),
            );
            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        info!(
            "getTraceSummaries total summaries after [{}] pagination: {}",
            pages,
            trace_ids.len()
        );
        Ok(trace_ids)
    }

    /// Traces for one batch of ids, following `NextToken`
    async fn batch_get_traces(&self, trace_ids: Vec<String>) -> AwsResult<Vec<Trace>> {
        debug!("Performing batchGetTraces with ids: {:?}", trace_ids);
        let mut traces = Vec::new();
        let mut next_token: Option<String> = None;
        loop {
            let response = self
                .client
                .batch_get_traces()
                .set_trace_ids(Some(trace_ids.clone()))
                .set_next_token(next_token.take())
                .send()
                .await
                .map_err(|e| AwsError::XRayError(format!("Failed to batch get traces: {e}")))?;
            traces.extend(response.traces().iter().map(to_core_trace));
            next_token = response.next_token().map(str::to_string);
            if next_token.is_none() {
                break;
            }
        }
        if traces.is_empty() {
            error!("Got empty result from batchGetTraces for ids: {:?}", trace_ids);
        }
        Ok(traces)
    }

    /// Every trace of the window, fully materialized
    pub async fn traces(
        &self,
        window: ScanWindow,
        filter_expression: Option<&str>,
    ) -> AwsResult<Vec<Trace>> {
        let trace_ids = self.trace_ids(window, filter_expression).await?;
        let batches = batch_trace_ids(&trace_ids);
        let batch_count = batches.len();

        let traces: Vec<Vec<Trace>> = stream::iter(batches)
            .map(|batch| self.batch_get_traces(batch))
            .buffer_unordered(MAX_CONCURRENT_BATCHES)
            .try_collect()
            .await?;
        let traces: Vec<Trace> = traces.into_iter().flatten().collect();

        info!(
            "getXrayTraces total traces returned: {}, number of batches: {}",
            traces.len(),
            batch_count
        );
        Ok(traces)
    }
}

#[async_trait]
impl TraceSource for XRayTraceSource {
    async fn fetch_traces(
        &self,
        window: ScanWindow,
        filter_expression: Option<&str>,
    ) -> xray_privilege_scan_core::Result<Vec<Trace>> {
        Ok(self.traces(window, filter_expression).await?)
    }
}
