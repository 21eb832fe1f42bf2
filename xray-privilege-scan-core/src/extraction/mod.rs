//! Resource extraction from AWS service subsegments
//!
//! Every supported downstream service has one [`ResourceExtractor`]. The
//! [`ExtractorRegistry`] maps the X-Ray subsegment name (e.g. `DynamoDB`) to the
//! extractor, so supporting another service means registering one more
//! implementation; the walker does not change.
//!
//! Extractors never fail. A payload missing the fields a service needs is logged
//! and skipped, leaving the accumulator untouched.

use std::collections::BTreeMap;
use std::fmt::{self, Debug, Display};

use log::warn;

use crate::accumulator::ResourceActionMap;
use crate::arn::region_from_arn;
use crate::trace::{AwsPayload, SegmentDocument};

pub mod dynamodb;
pub mod lambda;
pub mod s3;
pub mod sns;
pub mod sqs;

pub use dynamodb::DynamoDbExtractor;
pub use lambda::LambdaExtractor;
pub use s3::S3Extractor;
pub use sns::SnsExtractor;
pub use sqs::SqsExtractor;

/// Region used when neither the payload, the caller nor the configuration provide one
pub const UNKNOWN_REGION: &str = "*";

/// Turns a service-specific call record into canonical (resource, action) facts
pub trait ResourceExtractor: Send + Sync + Debug {
    /// Subsegment name X-Ray records for this service
    fn segment_name(&self) -> &'static str;

    /// IAM service prefix of the produced actions and resources
    fn iam_service(&self) -> &'static str;

    /// Record the resource and action of `segment` into `actions`
    fn extract(
        &self,
        segment: &SegmentDocument,
        actions: &mut ResourceActionMap,
        caller: &CallerContext<'_>,
    );
}

/// Identity of the function that issued a call, plus the configured fallback region
#[derive(Debug, Clone, Copy, Default)]
pub struct CallerContext<'a> {
    function_arn: Option<&'a str>,
    default_region: Option<&'a str>,
}

impl<'a> CallerContext<'a> {
    pub fn new(function_arn: Option<&'a str>, default_region: Option<&'a str>) -> Self {
        Self {
            function_arn,
            default_region,
        }
    }

    pub fn function_arn(&self) -> Option<&'a str> {
        self.function_arn
    }

    /// Resolve the region of a call.
    ///
    /// Order: the region known from the call itself, the region of the caller's
    /// ARN, the configured default region. Falls back to [`UNKNOWN_REGION`].
    pub fn region(&self, call_region: Option<&'a str>) -> &'a str {
        if let Some(region) = call_region.filter(|r| !r.is_empty()) {
            return region;
        }
        if let Some(region) = self.function_arn.and_then(region_from_arn) {
            return region;
        }
        if let Some(region) = self.default_region.filter(|r| !r.is_empty()) {
            warn!(
                "Can't extract region from caller [{}], using default region: {}",
                self.function_arn.unwrap_or("<unknown>"),
                region
            );
            return region;
        }
        warn!(
            "No region available for caller [{}], using wildcard region",
            self.function_arn.unwrap_or("<unknown>")
        );
        UNKNOWN_REGION
    }
}

/// A required payload field that was absent or empty
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MissingField(pub &'static str);

impl Display for MissingField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "missing `{}`", self.0)
    }
}

/// The non-empty `aws` payload of a segment
pub(crate) fn payload(segment: &SegmentDocument) -> Result<&AwsPayload, MissingField> {
    segment.payload().ok_or(MissingField("aws"))
}

/// A non-empty string field of the payload
pub(crate) fn required<'a>(
    value: &'a Option<String>,
    name: &'static str,
) -> Result<&'a str, MissingField> {
    value
        .as_deref()
        .filter(|v| !v.is_empty())
        .ok_or(MissingField(name))
}

/// Map an SDK operation name to its IAM action name through an alias table
pub(crate) fn canonical_operation<'a>(
    aliases: &[(&str, &'static str)],
    operation: &'a str,
) -> &'a str {
    aliases
        .iter()
        .find(|(sdk_name, _)| *sdk_name == operation)
        .map_or(operation, |(_, action)| *action)
}

/// Extractors keyed by subsegment name
#[derive(Debug)]
pub struct ExtractorRegistry {
    extractors: BTreeMap<&'static str, Box<dyn ResourceExtractor>>,
}

impl ExtractorRegistry {
    /// An empty registry
    #[must_use]
    pub fn empty() -> Self {
        Self {
            extractors: BTreeMap::new(),
        }
    }

    /// Registry with every built-in extractor
    #[must_use]
    pub fn new() -> Self {
        let mut registry = Self::empty();
        registry.register(Box::new(DynamoDbExtractor));
        registry.register(Box::new(S3Extractor));
        registry.register(Box::new(LambdaExtractor));
        registry.register(Box::new(SqsExtractor));
        registry.register(Box::new(SnsExtractor));
        registry
    }

    /// Register an extractor, replacing any previous one for the same subsegment name
    pub fn register(&mut self, extractor: Box<dyn ResourceExtractor>) {
        let name = extractor.segment_name();
        if self.extractors.insert(name, extractor).is_some() {
            log::debug!("Replaced extractor for service: {}", name);
        }
    }

    /// Extractor for a subsegment name
    pub fn get(&self, segment_name: &str) -> Option<&dyn ResourceExtractor> {
        self.extractors.get(segment_name).map(AsRef::as_ref)
    }

    /// Subsegment names with a registered extractor
    pub fn segment_names(&self) -> Vec<&'static str> {
        self.extractors.keys().copied().collect()
    }

    /// IAM service prefixes covered by the registered extractors
    pub fn iam_services(&self) -> Vec<&'static str> {
        let mut services: Vec<&'static str> =
            self.extractors.values().map(|e| e.iam_service()).collect();
        services.sort_unstable();
        services.dedup();
        services
    }
}

impl Default for ExtractorRegistry {
    fn default() -> Self {
        Self::new()
    }
}
