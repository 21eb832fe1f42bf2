//! Collaborator seams
//!
//! The core never talks to AWS. Traces, role policies and execution roles are
//! provided through these traits so the scan can run against the live services
//! or against recorded data.

use async_trait::async_trait;

use crate::config::ScanWindow;
use crate::errors::Result;
use crate::policy::IamStatement;
use crate::trace::Trace;

/// Supplies fully materialized traces for a time window
#[async_trait]
pub trait TraceSource: Send + Sync {
    async fn fetch_traces(
        &self,
        window: ScanWindow,
        filter_expression: Option<&str>,
    ) -> Result<Vec<Trace>>;
}

/// Supplies the statements currently granted to a role
#[async_trait]
pub trait PolicySource: Send + Sync {
    /// All statements of the role's attached managed and inline policies
    async fn role_statements(&self, role_arn: &str) -> Result<Vec<IamStatement>>;
}

/// Resolves the execution role of a function
#[async_trait]
pub trait RoleResolver: Send + Sync {
    async fn execution_role(&self, function_arn: &str) -> Result<String>;
}
