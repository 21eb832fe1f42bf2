//! IAM policy document model
//!
//! The same types describe the policies generated from traces and the policies
//! currently attached to a role, so they decode the full statement grammar the
//! comparison needs (`NotAction`, `NotResource`, `Condition`, single-or-many
//! values) even though generation only ever emits `Effect`, `Action` and `Resource`.

use serde::{Deserialize, Deserializer, Serialize};

use crate::errors::{Result, ScanError};

pub mod comparison;
pub mod synthesis;

pub use comparison::PolicyComparator;
pub use synthesis::synthesize;

/// The only policy language version IAM accepts for new documents
pub const POLICY_VERSION: &str = "2012-10-17";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

/// A policy element that IAM accepts either as a single string or as an array
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany {
    Single(String),
    Multiple(Vec<String>),
}

impl OneOrMany {
    /// All values, regardless of representation
    pub fn values(&self) -> Vec<&str> {
        match self {
            Self::Single(value) => vec![value.as_str()],
            Self::Multiple(values) => values.iter().map(String::as_str).collect(),
        }
    }

    pub fn is_empty(&self) -> bool {
        match self {
            Self::Single(_) => false,
            Self::Multiple(values) => values.is_empty(),
        }
    }
}

impl From<&str> for OneOrMany {
    fn from(value: &str) -> Self {
        Self::Single(value.to_string())
    }
}

impl From<String> for OneOrMany {
    fn from(value: String) -> Self {
        Self::Single(value)
    }
}

impl From<Vec<String>> for OneOrMany {
    fn from(values: Vec<String>) -> Self {
        Self::Multiple(values)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamStatement {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sid: Option<String>,
    pub effect: Effect,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub action: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_action: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub not_resource: Option<OneOrMany>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub condition: Option<serde_json::Value>,
}

impl IamStatement {
    /// An `Allow` statement over the given actions and resources
    pub fn allow(action: impl Into<OneOrMany>, resource: impl Into<OneOrMany>) -> Self {
        Self {
            sid: None,
            effect: Effect::Allow,
            action: Some(action.into()),
            not_action: None,
            resource: Some(resource.into()),
            not_resource: None,
            condition: None,
        }
    }

    /// Values of `Action`, empty when absent
    pub fn actions(&self) -> Vec<&str> {
        self.action.as_ref().map(OneOrMany::values).unwrap_or_default()
    }

    /// Values of `Resource`, empty when absent
    pub fn resources(&self) -> Vec<&str> {
        self.resource.as_ref().map(OneOrMany::values).unwrap_or_default()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct IamPolicyDocument {
    pub version: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, deserialize_with = "one_or_many_statements")]
    pub statement: Vec<IamStatement>,
}

fn one_or_many_statements<'de, D>(deserializer: D) -> std::result::Result<Vec<IamStatement>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Statements {
        Single(Box<IamStatement>),
        Multiple(Vec<IamStatement>),
    }

    Ok(match Statements::deserialize(deserializer)? {
        Statements::Single(statement) => vec![*statement],
        Statements::Multiple(statements) => statements,
    })
}

impl IamPolicyDocument {
    pub fn new(description: impl Into<String>, statement: Vec<IamStatement>) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            id: None,
            description: Some(description.into()),
            statement,
        }
    }

    /// Decode a policy document as returned by IAM (already URL-decoded)
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| ScanError::policy_document(e.to_string()))
    }

    pub fn to_json_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Excess permissions found for one function's execution role
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ExcessPermissionReport {
    /// Function ARN
    pub arn: String,
    /// Execution role ARN
    pub role: String,
    pub excess_permissions: Vec<IamStatement>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_decode_attached_policy_shapes() {
        let document = IamPolicyDocument::from_json(
            r#"{
                "Version": "2012-10-17",
                "Statement": {
                    "Sid": "All",
                    "Effect": "Allow",
                    "Action": "dynamodb:*",
                    "Resource": ["*"],
                    "Condition": {"StringEquals": {"aws:RequestedRegion": "us-east-1"}}
                }
            }"#,
        )
        .unwrap();
        assert_eq!(document.statement.len(), 1);
        let statement = &document.statement[0];
        assert_eq!(statement.sid.as_deref(), Some("All"));
        assert_eq!(statement.effect, Effect::Allow);
        assert_eq!(statement.actions(), vec!["dynamodb:*"]);
        assert_eq!(statement.resources(), vec!["*"]);
        assert!(statement.condition.is_some());
    }

    #[test]
    fn test_decode_statement_array_with_not_action() {
        let document = IamPolicyDocument::from_json(
            r#"{"Version": "2012-10-17", "Statement": [
                {"Effect": "Deny", "NotAction": ["iam:*"], "NotResource": "arn:aws:iam::*:role/x"},
                {"Effect": "Allow", "Action": ["s3:GetObject", "s3:PutObject"], "Resource": "arn:aws:s3:::b/*"}
            ]}"#,
        )
        .unwrap();
        assert_eq!(document.statement.len(), 2);
        assert_eq!(document.statement[0].effect, Effect::Deny);
        assert!(document.statement[0].actions().is_empty());
        assert_eq!(
            document.statement[0].not_action,
            Some(OneOrMany::Multiple(vec!["iam:*".to_string()]))
        );
        assert_eq!(document.statement[1].actions().len(), 2);
    }

    #[test]
    fn test_statement_without_effect_is_rejected() {
        let result = IamPolicyDocument::from_json(
            r#"{"Version": "2012-10-17", "Statement": [{"Action": "s3:*", "Resource": "*"}]}"#,
        );
        assert!(matches!(result, Err(ScanError::PolicyDocument { .. })));
    }

    #[test]
    fn test_generated_document_shape() {
        let document = IamPolicyDocument::new(
            "Generated policy",
            vec![IamStatement::allow(
                vec!["dynamodb:PutItem".to_string()],
                vec!["arn:aws:dynamodb:us-east-2:*:table/t".to_string()],
            )],
        );
        assert_eq!(
            serde_json::to_value(&document).unwrap(),
            json!({
                "Version": "2012-10-17",
                "Description": "Generated policy",
                "Statement": [{
                    "Effect": "Allow",
                    "Action": ["dynamodb:PutItem"],
                    "Resource": ["arn:aws:dynamodb:us-east-2:*:table/t"]
                }]
            })
        );
    }

    #[test]
    fn test_report_field_names() {
        let report = ExcessPermissionReport {
            arn: "arn:aws:lambda:us-east-1:1:function:f".to_string(),
            role: "arn:aws:iam::1:role/r".to_string(),
            excess_permissions: vec![IamStatement::allow("dynamodb:*", "*")],
        };
        let value = serde_json::to_value(&report).unwrap();
        assert_eq!(value["role"], "arn:aws:iam::1:role/r");
        assert_eq!(value["excessPermissions"][0]["Action"], "dynamodb:*");
    }
}
