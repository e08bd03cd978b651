// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Error types shared by discovery, context resolution and the fan-out executor
//!
//! Discovery errors are fatal for a command. Everything raised while working on a
//! single cluster is a [`ClusterError`], which the executor records instead of
//! propagating.

use thiserror::Error;

/// Failure to enumerate clusters from the hub registry
#[derive(Error, Debug)]
pub enum DiscoveryError {
    /// The hub API could not be reached or refused the list call
    #[error("failed to list ClusterProfiles in namespace '{namespace}': {reason}")]
    Unreachable { namespace: String, reason: String },

    /// The hub answered with something that is not a ClusterProfile record
    #[error("malformed ClusterProfile: {reason}")]
    Malformed { reason: String },

    /// Single-cluster lookup found nothing
    #[error("cluster '{name}' not found")]
    NotFound { name: String },
}

impl DiscoveryError {
    pub fn unreachable(namespace: &str, reason: impl ToString) -> Self {
        Self::Unreachable {
            namespace: namespace.to_string(),
            reason: reason.to_string(),
        }
    }

    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::Malformed {
            reason: reason.into(),
        }
    }
}

/// Per-cluster failure captured into a round's results
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClusterError {
    /// No kubeconfig context has been mapped to this cluster name
    #[error("no kubeconfig context mapped for cluster {cluster}")]
    Unmapped { cluster: String },

    /// The resource token is not in the registry
    #[error("unknown resource type: {resource}")]
    UnknownResourceType { resource: String },

    /// The query against the cluster failed or did not finish in time
    #[error(transparent)]
    Query(#[from] QueryError),
}

impl ClusterError {
    pub fn unmapped(cluster: &str) -> Self {
        Self::Unmapped {
            cluster: cluster.to_string(),
        }
    }

    pub fn unknown_resource(resource: &str) -> Self {
        Self::UnknownResourceType {
            resource: resource.to_string(),
        }
    }
}

/// Failure of the per-cluster query itself
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum QueryError {
    /// Could not build a client for the mapped context
    #[error("failed to create client: {reason}")]
    Client { reason: String },

    /// The cluster API returned an error
    #[error("K8s API error: {reason}")]
    Api { reason: String },

    /// Fetch-by-name found no object
    #[error("{kind} \"{name}\" not found")]
    NotFound { kind: String, name: String },

    /// The per-cluster deadline expired
    #[error("timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The caller cancelled the round
    #[error("cancelled before completion")]
    Cancelled,

    /// The task driving this cluster terminated abnormally
    #[error("query task aborted: {reason}")]
    Aborted { reason: String },
}

impl QueryError {
    pub fn api(reason: impl ToString) -> Self {
        Self::Api {
            reason: reason.to_string(),
        }
    }

    pub fn client(reason: impl ToString) -> Self {
        Self::Client {
            reason: reason.to_string(),
        }
    }
}
