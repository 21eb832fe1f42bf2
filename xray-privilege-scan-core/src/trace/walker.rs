//! Segment tree walker
//!
//! A function's identity (`aws.function_arn`) is only known on the node that
//! represents the invoked function, while the downstream calls it makes are
//! recorded as descendants of that node, possibly several levels deep. The
//! walker therefore carries the nearest enclosing function identity down the
//! recursion and hands every recognized AWS subsegment to its extractor.

use log::{debug, info, warn};

use super::{SegmentDocument, Trace};
use crate::accumulator::FunctionActionsMap;
use crate::extraction::{CallerContext, ExtractorRegistry};

/// Depth-first walker over X-Ray segment trees
#[derive(Debug, Clone, Copy)]
pub struct SegmentWalker<'a> {
    registry: &'a ExtractorRegistry,
    default_region: Option<&'a str>,
}

impl<'a> SegmentWalker<'a> {
    pub fn new(registry: &'a ExtractorRegistry) -> Self {
        Self {
            registry,
            default_region: None,
        }
    }

    /// Region used when neither a call nor its caller identify one
    #[must_use]
    pub fn with_default_region(mut self, default_region: Option<&'a str>) -> Self {
        self.default_region = default_region;
        self
    }

    /// Walk every segment of every trace into a fresh map
    pub fn walk_traces(&self, traces: &[Trace]) -> FunctionActionsMap {
        let mut functions = FunctionActionsMap::new();
        for trace in traces {
            self.walk_trace(trace, &mut functions);
        }
        functions
    }

    /// Walk every segment of a trace, decoding each segment document
    pub fn walk_trace(&self, trace: &Trace, functions: &mut FunctionActionsMap) {
        let trace_id = trace.id.as_deref().unwrap_or("<unknown>");
        if trace.segments.is_empty() {
            info!("No segments found for trace: {}", trace_id);
            return;
        }

        for segment in &trace.segments {
            let segment_id = segment.id.as_deref().unwrap_or("<unknown>");
            let document = match segment.document.as_deref().map(str::trim) {
                Some(document) if !document.is_empty() => document,
                _ => {
                    warn!("Got segment [id: {}] with empty document.", segment_id);
                    continue;
                }
            };
            match SegmentDocument::from_json(document) {
                Ok(document) => self.walk(&document, functions, None),
                Err(e) => warn!(
                    "Couldn't decode document of segment [id: {}] in trace {}: {}",
                    segment_id, trace_id, e
                ),
            }
        }
    }

    /// Walk a segment tree in pre-order.
    ///
    /// `ancestor_function` is the identity of the nearest enclosing function node;
    /// AWS subsegments below it have their facts recorded into that function's entry.
    pub fn walk<'n>(
        &self,
        node: &'n SegmentDocument,
        functions: &mut FunctionActionsMap,
        ancestor_function: Option<&'n str>,
    ) {
        if let Some(function_arn) = ancestor_function {
            if node.is_aws_call() {
                self.extract(node, functions, function_arn);
            }
        }

        let own_function = node.function_arn();
        if let Some(function_arn) = own_function {
            debug!("Found arn: {} for segment: {}", function_arn, node.id);
            functions.entry(function_arn);
        }

        let context = own_function.or(ancestor_function);
        for child in &node.subsegments {
            self.walk(child, functions, context);
        }
    }

    fn extract(&self, node: &SegmentDocument, functions: &mut FunctionActionsMap, function_arn: &str) {
        let Some(service) = node.name.as_deref() else {
            warn!("AWS subsegment [{}] has no service name (skipping)", node.id);
            return;
        };
        match self.registry.get(service) {
            Some(extractor) => {
                let caller = CallerContext::new(Some(function_arn), self.default_region);
                extractor.extract(node, functions.entry(function_arn), &caller);
            }
            None => warn!(
                "Unsupported service [{}] in subsegment [{}] (skipping)",
                service, node.id
            ),
        }
    }
}
