//! AWS IAM client wrapper for reading the policies granted to a role
//!
//! A role's effective statements are the statements of the default version of
//! every attached managed policy plus the statements of every inline policy.

use async_trait::async_trait;
use aws_sdk_iam::Client as IamClient;
use log::{debug, warn};
use xray_privilege_scan_core::{IamPolicyDocument, IamStatement, PolicySource};

use crate::aws::{AwsError, AwsResult};

pub struct IamPolicySource {
    client: IamClient,
}

/// Role name from a role ARN such as `arn:aws:iam::123456789012:role/service-role/name`
pub(crate) fn role_name_from_arn(role_arn: &str) -> AwsResult<&str> {
    role_arn
        .split_once(":role/")
        .and_then(|(_, path)| path.rsplit('/').next())
        .filter(|name| !name.is_empty())
        .ok_or_else(|| AwsError::IamError(format!("Not a role ARN: {role_arn}")))
}

/// Decode a policy document as returned by IAM
pub(crate) fn decode_policy_document(policy_json: &str) -> AwsResult<IamPolicyDocument> {
    // URL decode the policy document (AWS returns URL-encoded JSON)
    let decoded = percent_encoding::percent_decode_str(policy_json)
        .decode_utf8()
        .map_err(|e| AwsError::PolicyError(format!("Failed to URL decode policy document: {e}")))?;

    IamPolicyDocument::from_json(&decoded)
        .map_err(|e| AwsError::PolicyError(format!("Failed to parse policy document JSON: {e}")))
}

impl IamPolicySource {
    pub fn new(client: IamClient) -> Self {
        Self { client }
    }

    /// ARNs of all managed policies attached to a role
    async fn list_attached_policies(&self, role_name: &str) -> AwsResult<Vec<String>> {
        let mut policy_arns = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .list_attached_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| {
                    AwsError::IamError(format!(
                        "Failed to list attached policies of role '{role_name}': {e}"
                    ))
                })?;
            policy_arns.extend(
                response
                    .attached_policies()
                    .iter()
                    .filter_map(|policy| policy.policy_arn())
                    .map(str::to_string),
            );
            if !response.is_truncated() {
                break;
            }
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(policy_arns)
    }

    /// Names of all inline policies of a role
    async fn list_inline_policies(&self, role_name: &str) -> AwsResult<Vec<String>> {
        let mut policy_names = Vec::new();
        let mut marker: Option<String> = None;
        loop {
            let response = self
                .client
                .list_role_policies()
                .role_name(role_name)
                .set_marker(marker.take())
                .send()
                .await
                .map_err(|e| AwsError::IamError(format!("Failed to list role policies: {e}")))?;
            policy_names.extend(response.policy_names().iter().cloned());
            if !response.is_truncated() {
                break;
            }
            marker = response.marker().map(str::to_string);
            if marker.is_none() {
                break;
            }
        }
        Ok(policy_names)
    }

    /// Document of the default version of a managed policy
    async fn get_managed_policy(&self, policy_arn: &str) -> AwsResult<Option<IamPolicyDocument>> {
        let response = self
            .client
            .get_policy()
            .policy_arn(policy_arn)
            .send()
            .await
            .map_err(|e| AwsError::IamError(format!("Failed to get policy '{policy_arn}': {e}")))?;
        let Some(version_id) = response.policy().and_then(|policy| policy.default_version_id())
        else {
            warn!("Policy {} has no default version (skipping)", policy_arn);
            return Ok(None);
        };

        let response = self
            .client
            .get_policy_version()
            .policy_arn(policy_arn)
            .version_id(version_id)
            .send()
            .await
            .map_err(|e| {
                AwsError::IamError(format!(
                    "Failed to get version '{version_id}' of policy '{policy_arn}': {e}"
                ))
            })?;
        debug!("Done fetching policy doc: {} {}", policy_arn, version_id);
        response
            .policy_version()
            .and_then(|version| version.document())
            .map(decode_policy_document)
            .transpose()
    }

    /// Document of an inline role policy
    async fn get_inline_policy(
        &self,
        role_name: &str,
        policy_name: &str,
    ) -> AwsResult<IamPolicyDocument> {
        let response = self
            .client
            .get_role_policy()
            .role_name(role_name)
            .policy_name(policy_name)
            .send()
            .await
            .map_err(|e| AwsError::IamError(format!("Failed to get role policy: {e}")))?;
        decode_policy_document(response.policy_document())
    }

    /// Combined statements of every managed and inline policy of a role
    pub async fn combined_statements(&self, role_arn: &str) -> AwsResult<Vec<IamStatement>> {
        let role_name = role_name_from_arn(role_arn)?;
        debug!("Going to fetch policies for: {}", role_name);

        let mut statements = Vec::new();
        for policy_arn in self.list_attached_policies(role_name).await? {
            if let Some(document) = self.get_managed_policy(&policy_arn).await? {
                statements.extend(document.statement);
            }
        }
        for policy_name in self.list_inline_policies(role_name).await? {
            let document = self.get_inline_policy(role_name, &policy_name).await?;
            statements.extend(document.statement);
        }
        debug!("Role {} grants {} statements", role_name, statements.len());
        Ok(statements)
    }
}

#[async_trait]
impl PolicySource for IamPolicySource {
    async fn role_statements(
        &self,
        role_arn: &str,
    ) -> xray_privilege_scan_core::Result<Vec<IamStatement>> {
        Ok(self.combined_statements(role_arn).await?)
    }
}
