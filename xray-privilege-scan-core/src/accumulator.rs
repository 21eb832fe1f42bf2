//! Accumulators populated while walking traces
//!
//! [`ResourceActionMap`] collects the actions observed per canonical resource ARN,
//! [`FunctionActionsMap`] keeps one such map per function identity. Both are
//! ordered so that everything derived from them is reproducible.

use std::collections::{BTreeMap, BTreeSet};

/// Canonical resource ARN to the set of unqualified actions observed on it
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ResourceActionMap {
    resources: BTreeMap<String, BTreeSet<String>>,
}

impl ResourceActionMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `action` against `resource`, creating the action set on first use
    pub fn add_action(&mut self, resource: impl Into<String>, action: impl Into<String>) {
        self.resources
            .entry(resource.into())
            .or_default()
            .insert(action.into());
    }

    /// Actions recorded for a resource
    pub fn actions(&self, resource: &str) -> Option<&BTreeSet<String>> {
        self.resources.get(resource)
    }

    /// Iterate resources in lexicographic order together with their actions
    pub fn iter(&self) -> impl Iterator<Item = (&str, &BTreeSet<String>)> {
        self.resources
            .iter()
            .map(|(resource, actions)| (resource.as_str(), actions))
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }
}

/// Function ARN to the resources and actions that function was observed using
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FunctionActionsMap {
    functions: BTreeMap<String, ResourceActionMap>,
}

impl FunctionActionsMap {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Resolve the entry for a function, creating an empty one the first time
    /// the identity is seen. Entries are never removed.
    pub fn entry(&mut self, function_arn: &str) -> &mut ResourceActionMap {
        if !self.functions.contains_key(function_arn) {
            log::debug!("Tracking new function identity: {}", function_arn);
        }
        self.functions.entry(function_arn.to_string()).or_default()
    }

    pub fn get(&self, function_arn: &str) -> Option<&ResourceActionMap> {
        self.functions.get(function_arn)
    }

    /// Iterate functions in lexicographic ARN order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &ResourceActionMap)> {
        self.functions
            .iter()
            .map(|(function_arn, actions)| (function_arn.as_str(), actions))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}
