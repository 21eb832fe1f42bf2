//! Least-privilege IAM policy inference from AWS X-Ray traces.
//!
//! The engine walks the segment tree of each trace, attributes every AWS SDK
//! call to the nearest enclosing Lambda function, turns the call into a canonical
//! (resource, action) fact through a per-service [`ResourceExtractor`], and
//! synthesizes one policy per function. [`PolicyComparator`] reports what a
//! function's current role grants beyond that policy.
//!
//! Network access is left to implementations of the traits in [`sources`].

pub mod accumulator;
pub mod arn;
pub mod config;
pub mod errors;
pub mod extraction;
pub mod policy;
pub mod scanner;
pub mod sources;
pub mod trace;

pub use accumulator::{FunctionActionsMap, ResourceActionMap};
pub use config::{ScanConfig, ScanWindow, DEFAULT_TIME_RANGE_MINUTES};
pub use errors::{Result, ScanError};
pub use extraction::{CallerContext, ExtractorRegistry, ResourceExtractor};
pub use policy::{
    synthesize, Effect, ExcessPermissionReport, IamPolicyDocument, IamStatement, OneOrMany,
    PolicyComparator,
};
pub use scanner::{generate_from_traces, generate_policies, GeneratedPolicy, ScanOutcome, Scanner};
pub use sources::{PolicySource, RoleResolver, TraceSource};
pub use trace::{Segment, SegmentDocument, SegmentWalker, Trace};
