//! Scan orchestration
//!
//! Fetches traces, walks them into per-function facts, synthesizes one policy per
//! function and, when requested, compares each policy with what the function's
//! execution role currently grants.

use chrono::{DateTime, Utc};
use log::{debug, info, warn};

use crate::accumulator::FunctionActionsMap;
use crate::config::ScanConfig;
use crate::errors::{Result, ScanError};
use crate::extraction::ExtractorRegistry;
use crate::policy::{synthesize, ExcessPermissionReport, IamPolicyDocument, PolicyComparator};
use crate::sources::{PolicySource, RoleResolver, TraceSource};
use crate::trace::{SegmentWalker, Trace};

/// Policy generated for one function
#[derive(Debug, Clone, PartialEq)]
pub struct GeneratedPolicy {
    pub arn: String,
    pub document: IamPolicyDocument,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ScanOutcome {
    pub policies: Vec<GeneratedPolicy>,
    pub excess_permissions: Vec<ExcessPermissionReport>,
}

/// Collaborators needed to compare generated policies with existing roles
pub struct RoleComparison<R, P> {
    pub roles: R,
    pub policies: P,
}

pub struct Scanner<T, R, P> {
    registry: ExtractorRegistry,
    traces: T,
    comparison: Option<RoleComparison<R, P>>,
}

/// Synthesize a policy for every function in `functions`
pub fn generate_policies(functions: &FunctionActionsMap) -> Vec<GeneratedPolicy> {
    functions
        .iter()
        .map(|(arn, actions)| GeneratedPolicy {
            arn: arn.to_string(),
            document: synthesize(actions, arn),
        })
        .collect()
}

/// Walk recorded traces and synthesize their policies without any collaborator
pub fn generate_from_traces(
    registry: &ExtractorRegistry,
    traces: &[Trace],
    default_region: Option<&str>,
) -> Vec<GeneratedPolicy> {
    let functions = SegmentWalker::new(registry)
        .with_default_region(default_region)
        .walk_traces(traces);
    info!("Found {} functions in {} traces", functions.len(), traces.len());
    generate_policies(&functions)
}

impl<T, R, P> Scanner<T, R, P>
where
    T: TraceSource,
    R: RoleResolver,
    P: PolicySource,
{
    pub fn new(registry: ExtractorRegistry, traces: T) -> Self {
        Self {
            registry,
            traces,
            comparison: None,
        }
    }

    #[must_use]
    pub fn with_comparison(mut self, roles: R, policies: P) -> Self {
        self.comparison = Some(RoleComparison { roles, policies });
        self
    }

    pub async fn scan(&self, config: &ScanConfig, now: DateTime<Utc>) -> Result<ScanOutcome> {
        config.validate(now)?;
        let window = config.window(now);
        info!("Scanning traces from {} to {}", window.start, window.end);

        let traces = self
            .traces
            .fetch_traces(window, config.filter_expression.as_deref())
            .await?;
        let policies = generate_from_traces(&self.registry, &traces, config.default_region.as_deref());

        let excess_permissions = if config.compare_existing_role {
            let comparison = self.comparison.as_ref().ok_or_else(|| {
                ScanError::invalid_config("Role comparison requested without role and policy sources")
            })?;
            self.find_excess_permissions(comparison, &policies).await
        } else {
            Vec::new()
        };

        Ok(ScanOutcome {
            policies,
            excess_permissions,
        })
    }

    async fn find_excess_permissions(
        &self,
        comparison: &RoleComparison<R, P>,
        policies: &[GeneratedPolicy],
    ) -> Vec<ExcessPermissionReport> {
        let comparator = PolicyComparator::for_registry(&self.registry);
        let mut reports = Vec::new();

        for policy in policies {
            let role = match comparison.roles.execution_role(&policy.arn).await {
                Ok(role) => role,
                Err(e) => {
                    warn!("Couldn't resolve execution role of {} (skipping): {}", policy.arn, e);
                    continue;
                }
            };
            let effective = match comparison.policies.role_statements(&role).await {
                Ok(statements) => statements,
                Err(e) => {
                    warn!("Couldn't fetch policies of role {} (skipping): {}", role, e);
                    continue;
                }
            };
            debug!("Comparing {} statements of role {}", effective.len(), role);

            if let Some(excess_permissions) = comparator.compare(&effective, &policy.document.statement) {
                info!(
                    "Found {} excess statements for {} (role {})",
                    excess_permissions.len(),
                    policy.arn,
                    role
                );
                reports.push(ExcessPermissionReport {
                    arn: policy.arn.clone(),
                    role,
                    excess_permissions,
                });
            }
        }
        reports
    }
}
