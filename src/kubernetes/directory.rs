// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cluster discovery via the sig-multicluster ClusterProfile API
//!
//! The hub cluster holds one `ClusterProfile` per managed cluster. Listing them
//! produces a fresh snapshot of [`ClusterInfo`] records for the current command.

use async_trait::async_trait;
use kube::api::{DynamicObject, GetParams, ListParams};
use kube::core::Request;
use kube::discovery::ApiResource;
use kube::{Client, Resource};
use serde_json::Value;
use std::collections::BTreeMap;
use tracing::{debug, warn};

use crate::error::DiscoveryError;

/// Condition type marking a cluster's control plane as healthy
const HEALTHY_CONDITION: &str = "ControlPlaneHealthy";

/// One discovered cluster
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClusterInfo {
    /// ClusterProfile name, unique within a snapshot
    pub name: String,
    pub display_name: String,
    /// Namespace of the ClusterProfile record on the hub
    pub namespace: String,
    pub kubernetes_version: Option<String>,
    pub healthy: bool,
    pub labels: BTreeMap<String, String>,
}

impl ClusterInfo {
    /// Minimal record, mostly useful for tests and fixtures
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
            display_name: name.to_string(),
            namespace: String::new(),
            kubernetes_version: None,
            healthy: true,
            labels: BTreeMap::new(),
        }
    }
}

/// Source of cluster snapshots
#[async_trait]
pub trait ClusterDirectory: Send + Sync {
    /// List all clusters known to the registry
    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, DiscoveryError>;

    /// Look up a single cluster by name
    async fn get_cluster(&self, name: &str) -> Result<ClusterInfo, DiscoveryError>;
}

/// ClusterProfile API resource (multicluster.x-k8s.io/v1alpha1)
pub fn cluster_profile_resource() -> ApiResource {
    ApiResource {
        group: "multicluster.x-k8s.io".to_string(),
        version: "v1alpha1".to_string(),
        api_version: "multicluster.x-k8s.io/v1alpha1".to_string(),
        kind: "ClusterProfile".to_string(),
        plural: "clusterprofiles".to_string(),
    }
}

/// Directory backed by ClusterProfile objects on a hub cluster
pub struct ClusterProfileDirectory {
    client: Client,
    namespace: String,
}

impl ClusterProfileDirectory {
    pub fn new(client: Client, namespace: impl Into<String>) -> Self {
        Self {
            client,
            namespace: namespace.into(),
        }
    }

    fn request(&self) -> Request {
        Request::new(DynamicObject::url_path(
            &cluster_profile_resource(),
            Some(&self.namespace),
        ))
    }
}

#[async_trait]
impl ClusterDirectory for ClusterProfileDirectory {
    async fn list_clusters(&self) -> Result<Vec<ClusterInfo>, DiscoveryError> {
        // Fetched untyped so one bad record cannot fail the whole list
        let request = self
            .request()
            .list(&ListParams::default())
            .map_err(|e| DiscoveryError::unreachable(&self.namespace, e))?;
        let body = self
            .client
            .request::<Value>(request)
            .await
            .map_err(|e| request_error(&self.namespace, e))?;

        let clusters = parse_list_response(body)?;
        debug!(
            namespace = %self.namespace,
            clusters = clusters.len(),
            "Listed ClusterProfiles"
        );
        Ok(clusters)
    }

    async fn get_cluster(&self, name: &str) -> Result<ClusterInfo, DiscoveryError> {
        let request = self
            .request()
            .get(name, &GetParams::default())
            .map_err(|e| DiscoveryError::unreachable(&self.namespace, e))?;
        match self.client.request::<Value>(request).await {
            Ok(value) => parse_cluster_profile(&value),
            Err(kube::Error::Api(resp)) if resp.code == 404 => Err(DiscoveryError::NotFound {
                name: name.to_string(),
            }),
            Err(e) => Err(request_error(&self.namespace, e)),
        }
    }
}

/// Undecodable bodies are malformed, everything else means the hub did not answer
fn request_error(namespace: &str, err: kube::Error) -> DiscoveryError {
    match err {
        kube::Error::SerdeError(e) => DiscoveryError::malformed(e.to_string()),
        other => DiscoveryError::unreachable(namespace, other),
    }
}

/// Parse a raw ClusterProfileList body
pub fn parse_list_response(body: Value) -> Result<Vec<ClusterInfo>, DiscoveryError> {
    let Value::Object(mut list) = body else {
        return Err(DiscoveryError::malformed("list response is not an object"));
    };
    match list.remove("items") {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(Value::Array(items)) => Ok(parse_cluster_list(items)),
        Some(_) => Err(DiscoveryError::malformed("list items are not an array")),
    }
}

/// Parse a list of ClusterProfile objects, skipping records that fail to parse
pub fn parse_cluster_list(items: Vec<Value>) -> Vec<ClusterInfo> {
    items
        .iter()
        .filter_map(|item| match parse_cluster_profile(item) {
            Ok(cluster) => Some(cluster),
            Err(e) => {
                warn!(error = %e, "Skipping ClusterProfile record");
                None
            }
        })
        .collect()
}

/// Extract a [`ClusterInfo`] from a ClusterProfile object
pub fn parse_cluster_profile(obj: &Value) -> Result<ClusterInfo, DiscoveryError> {
    let metadata = obj
        .get("metadata")
        .and_then(Value::as_object)
        .ok_or_else(|| DiscoveryError::malformed("missing metadata"))?;

    let name = metadata
        .get("name")
        .and_then(Value::as_str)
        .filter(|n| !n.is_empty())
        .ok_or_else(|| DiscoveryError::malformed("missing metadata.name"))?
        .to_string();

    let namespace = metadata
        .get("namespace")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();

    let labels = match metadata.get("labels") {
        None | Some(Value::Null) => BTreeMap::new(),
        Some(Value::Object(map)) => map
            .iter()
            .filter_map(|(k, v)| v.as_str().map(|v| (k.clone(), v.to_string())))
            .collect(),
        Some(_) => {
            return Err(DiscoveryError::malformed(format!(
                "labels of '{}' are not a string map",
                name
            )));
        }
    };

    let display_name = nested_str(obj, &["spec", "displayName"])
        .filter(|d| !d.is_empty())
        .unwrap_or(&name)
        .to_string();

    let kubernetes_version =
        nested_str(obj, &["status", "version", "kubernetes"]).map(String::from);

    Ok(ClusterInfo {
        healthy: is_cluster_healthy(obj),
        name,
        display_name,
        namespace,
        kubernetes_version,
        labels,
    })
}

/// A cluster is healthy iff a ControlPlaneHealthy condition has status "True"
pub fn is_cluster_healthy(obj: &Value) -> bool {
    let Some(conditions) = obj
        .get("status")
        .and_then(|s| s.get("conditions"))
        .and_then(Value::as_array)
    else {
        return false;
    };

    conditions.iter().any(|cond| {
        cond.get("type").and_then(Value::as_str) == Some(HEALTHY_CONDITION)
            && cond.get("status").and_then(Value::as_str) == Some("True")
    })
}

fn nested_str<'a>(value: &'a Value, path: &[&str]) -> Option<&'a str> {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
}
