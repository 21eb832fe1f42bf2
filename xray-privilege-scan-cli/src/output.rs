//! Persisting scan results
//!
//! Every generated policy is written to its own file, named after the SHA-256 of
//! the function ARN. Excess permissions of all functions go to one report file.
//! A failed write is logged and does not stop the remaining writes.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use aws_lc_rs::digest;
use log::{error, info};
use xray_privilege_scan_core::{ExcessPermissionReport, GeneratedPolicy};

pub const EXCESSIVE_PERMISSION_FILE: &str = "excessive-permissions.json";

const POLICY_FILE_SUFFIX: &str = ".policy.json";

/// A policy file that was written
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenPolicy {
    pub arn: String,
    pub file_name: String,
}

/// File name of the policy generated for a function
pub fn policy_file_name(function_arn: &str) -> String {
    let hash = digest::digest(&digest::SHA256, function_arn.as_bytes());
    format!("{}{}", hex::encode(hash.as_ref()), POLICY_FILE_SUFFIX)
}

fn write_json(path: &Path, json: &str) -> Result<()> {
    fs::write(path, json).with_context(|| format!("Failed writing to file: [{}]", path.display()))
}

/// Write one pretty-printed policy file per function into `output_dir`
pub fn write_policies(output_dir: &Path, policies: &[GeneratedPolicy]) -> Vec<WrittenPolicy> {
    let mut written = Vec::new();
    for policy in policies {
        let file_name = policy_file_name(&policy.arn);
        let result = policy
            .document
            .to_json_pretty()
            .context("Failed serializing policy document")
            .and_then(|json| write_json(&output_dir.join(&file_name), &json));
        match result {
            Ok(()) => {
                info!("Wrote policy of {} to {}", policy.arn, file_name);
                written.push(WrittenPolicy {
                    arn: policy.arn.clone(),
                    file_name,
                });
            }
            Err(e) => error!("{:#}", e),
        }
    }
    written
}

/// Write the excess permission report into `output_dir`
pub fn write_excess_permissions(
    output_dir: &Path,
    reports: &[ExcessPermissionReport],
) -> Result<PathBuf> {
    let path = output_dir.join(EXCESSIVE_PERMISSION_FILE);
    let json = serde_json::to_string_pretty(reports).context("Failed serializing excess permission report")?;
    write_json(&path, &json)?;
    Ok(path)
}
