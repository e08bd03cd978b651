// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Data shared between the fan-out executor and the aggregators

use std::collections::BTreeMap;
use std::time::Duration;

use crate::error::ClusterError;
use crate::kubernetes::objects::ResourceObject;
use crate::kubernetes::query::NamespaceScope;

/// Fan-out tuning
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Upper bound on clusters worked on at the same time
    pub max_concurrency: usize,
    /// Deadline applied to each cluster independently
    pub timeout_per_cluster: Duration,
    /// Advisory only; a round always runs every cluster to completion
    pub continue_on_error: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            max_concurrency: 10,
            timeout_per_cluster: Duration::from_secs(30),
            continue_on_error: true,
        }
    }
}

/// Shape of the per-cluster work
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryMode {
    /// Return items for table/JSON/YAML output
    List,
    /// Return a rendered narrative block
    Describe,
}

/// What to run on each cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuerySpec {
    /// Resource token as typed by the user (alias or canonical name)
    pub resource: String,
    pub name: Option<String>,
    pub namespace: NamespaceScope,
    pub mode: QueryMode,
}

impl QuerySpec {
    pub fn list(resource: &str, name: Option<&str>, namespace: NamespaceScope) -> Self {
        Self {
            resource: resource.to_string(),
            name: name.map(String::from),
            namespace,
            mode: QueryMode::List,
        }
    }

    pub fn describe(resource: &str, name: &str, namespace: NamespaceScope) -> Self {
        Self {
            resource: resource.to_string(),
            name: Some(name.to_string()),
            namespace,
            mode: QueryMode::Describe,
        }
    }
}

/// Data returned by a successful cluster
#[derive(Debug, Clone, Default)]
pub struct ClusterPayload {
    pub items: Vec<ResourceObject>,
    /// Only set by describe queries
    pub narrative: String,
}

/// Outcome of one cluster in a round
#[derive(Debug, Clone)]
pub struct ClusterResult {
    pub cluster_name: String,
    pub outcome: Result<ClusterPayload, ClusterError>,
}

impl ClusterResult {
    pub fn new(cluster_name: impl Into<String>, outcome: Result<ClusterPayload, ClusterError>) -> Self {
        Self {
            cluster_name: cluster_name.into(),
            outcome,
        }
    }

    pub fn failed(cluster_name: impl Into<String>, error: impl Into<ClusterError>) -> Self {
        Self::new(cluster_name, Err(error.into()))
    }

    pub fn success(&self) -> bool {
        self.outcome.is_ok()
    }

    /// Items of a successful result, empty otherwise
    pub fn items(&self) -> &[ResourceObject] {
        match &self.outcome {
            Ok(payload) => &payload.items,
            Err(_) => &[],
        }
    }

    pub fn narrative(&self) -> &str {
        match &self.outcome {
            Ok(payload) => &payload.narrative,
            Err(_) => "",
        }
    }

    pub fn error(&self) -> Option<&ClusterError> {
        self.outcome.as_ref().err()
    }
}

/// Counters for a round
#[derive(Debug, Clone, Default)]
pub struct ResultSummary {
    pub total: usize,
    pub successful: usize,
    pub failed: usize,
    /// Failure per cluster name
    pub errors: BTreeMap<String, ClusterError>,
}

/// Every cluster's outcome for one round, in completion order
#[derive(Debug, Clone, Default)]
pub struct AggregatedResults {
    pub results: Vec<ClusterResult>,
    pub summary: ResultSummary,
}

impl AggregatedResults {
    pub fn new(total: usize) -> Self {
        Self {
            results: Vec::with_capacity(total),
            summary: ResultSummary {
                total,
                ..Default::default()
            },
        }
    }

    /// Record one cluster outcome and update the counters
    pub fn add_result(&mut self, result: ClusterResult) {
        match &result.outcome {
            Ok(_) => self.summary.successful += 1,
            Err(e) => {
                self.summary.failed += 1;
                self.summary
                    .errors
                    .insert(result.cluster_name.clone(), e.clone());
            }
        }
        self.results.push(result);
    }

    /// True once every targeted cluster has reported
    pub fn is_complete(&self) -> bool {
        self.summary.successful + self.summary.failed == self.summary.total
    }

    /// True when there was at least one cluster and none succeeded
    pub fn all_failed(&self) -> bool {
        self.summary.total > 0 && self.summary.successful == 0
    }
}
