//! AWS collaborators for the X-Ray privilege scan:
//! - trace retrieval from X-Ray
//! - role policy retrieval from IAM
//! - execution role resolution through Lambda
//!
//! Each collaborator implements the matching trait of `xray_privilege_scan_core::sources`.

mod aws;

pub use aws::{
    AwsError, AwsResult, AwsSources, IamPolicySource, LambdaRoleResolver, XRayTraceSource,
};
