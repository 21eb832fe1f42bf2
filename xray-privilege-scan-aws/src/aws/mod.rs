//! AWS SDK integration: X-Ray trace retrieval, IAM role policies, Lambda execution roles.

pub(crate) mod iam_client;
pub(crate) mod lambda_client;
pub(crate) mod xray_client;

use aws_config::{BehaviorVersion, Region};
use log::debug;
use thiserror::Error;
use xray_privilege_scan_core::ScanError;

pub use iam_client::IamPolicySource;
pub use lambda_client::LambdaRoleResolver;
pub use xray_client::XRayTraceSource;

#[derive(Error, Debug)]
pub enum AwsError {
    #[error("AWS configuration error: {0}")]
    ConfigError(String),
    #[error("X-Ray client error: {0}")]
    XRayError(String),
    #[error("IAM client error: {0}")]
    IamError(String),
    #[error("Lambda client error: {0}")]
    LambdaError(String),
    #[error("Policy document error: {0}")]
    PolicyError(String),
}

pub type AwsResult<T> = Result<T, AwsError>;

impl From<AwsError> for ScanError {
    fn from(error: AwsError) -> Self {
        let source_name = match error {
            AwsError::ConfigError(_) => "aws-config",
            AwsError::XRayError(_) => "x-ray",
            AwsError::IamError(_) | AwsError::PolicyError(_) => "iam",
            AwsError::LambdaError(_) => "lambda",
        };
        ScanError::source(source_name, error.to_string())
    }
}

/// All AWS collaborators, built from one SDK configuration
pub struct AwsSources {
    pub traces: XRayTraceSource,
    pub policies: IamPolicySource,
    pub roles: LambdaRoleResolver,
}

impl AwsSources {
    /// Load the SDK configuration with the default credential provider chain.
    ///
    /// `region` overrides the region from the environment and profile.
    pub async fn from_env(region: Option<String>) -> AwsResult<Self> {
        let mut loader = aws_config::defaults(BehaviorVersion::latest());
        if let Some(region) = region {
            loader = loader.region(Region::new(region));
        }
        let config = loader.load().await;

        let region = config.region().ok_or_else(|| {
            AwsError::ConfigError(
                "No AWS region configured. Set AWS_REGION or pass --region".to_string(),
            )
        })?;
        debug!("Using AWS region: {}", region);

        Ok(Self {
            traces: XRayTraceSource::new(aws_sdk_xray::Client::new(&config)),
            policies: IamPolicySource::new(aws_sdk_iam::Client::new(&config)),
            roles: LambdaRoleResolver::new(aws_sdk_lambda::Client::new(&config)),
        })
    }
}
