//! Execution role lookup through the Lambda API

use async_trait::async_trait;
use aws_sdk_lambda::Client as LambdaClient;
use log::debug;
use xray_privilege_scan_core::RoleResolver;

use crate::aws::{AwsError, AwsResult};

pub struct LambdaRoleResolver {
    client: LambdaClient,
}

impl LambdaRoleResolver {
    pub fn new(client: LambdaClient) -> Self {
        Self { client }
    }

    /// ARN of the role a function executes with
    pub async fn role_arn(&self, function_arn: &str) -> AwsResult<String> {
        let response = self
            .client
            .get_function_configuration()
            .function_name(function_arn)
            .send()
            .await
            .map_err(|e| {
                AwsError::LambdaError(format!(
                    "Failed to get configuration of function '{function_arn}': {e}"
                ))
            })?;
        let role = response.role().ok_or_else(|| {
            AwsError::LambdaError(format!("Function '{function_arn}' has no execution role"))
        })?;
        debug!("Function {} executes with role {}", function_arn, role);
        Ok(role.to_string())
    }
}

#[async_trait]
impl RoleResolver for LambdaRoleResolver {
    async fn execution_role(&self, function_arn: &str) -> xray_privilege_scan_core::Result<String> {
        Ok(self.role_arn(function_arn).await?)
    }
}
