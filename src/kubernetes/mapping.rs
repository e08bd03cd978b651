// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cluster name to kubeconfig context mappings
//!
//! ClusterProfile names rarely match local kubeconfig context names, so each
//! cluster is mapped explicitly. Mappings live in a small YAML document
//! (default: ~/.kube/kubectl-mc-clusters.yaml) that is rewritten atomically on
//! every change.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::error::ClusterError;

pub const MAPPING_API_VERSION: &str = "kubectl-mc.k8s.io/v1alpha1";
pub const MAPPING_KIND: &str = "ClusterMapping";

/// One cluster-to-context association
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClusterMapping {
    /// ClusterProfile name
    pub name: String,
    /// kubeconfig context name
    pub context: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
}

/// On-disk mapping document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MappingConfig {
    pub api_version: String,
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_context: Option<String>,
    #[serde(default)]
    pub clusters: Vec<ClusterMapping>,
}

impl Default for MappingConfig {
    fn default() -> Self {
        Self {
            api_version: MAPPING_API_VERSION.to_string(),
            kind: MAPPING_KIND.to_string(),
            hub_context: None,
            clusters: Vec::new(),
        }
    }
}

impl MappingConfig {
    /// Insert or replace the mapping for `name`
    pub fn upsert(&mut self, name: &str, context: &str, namespace: Option<&str>) {
        let namespace = namespace.filter(|ns| !ns.is_empty()).map(String::from);
        if let Some(existing) = self.clusters.iter_mut().find(|m| m.name == name) {
            existing.context = context.to_string();
            existing.namespace = namespace;
        } else {
            self.clusters.push(ClusterMapping {
                name: name.to_string(),
                context: context.to_string(),
                namespace,
            });
        }
    }

    pub fn get(&self, name: &str) -> Option<&ClusterMapping> {
        self.clusters.iter().find(|m| m.name == name)
    }
}

/// Connection handle the per-cluster query executor needs
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectionContext {
    /// kubeconfig context name
    pub context: String,
    pub namespace: Option<String>,
}

/// Maps a cluster name to its connection context
pub trait ContextResolver: Send + Sync {
    fn resolve(&self, cluster_name: &str) -> Result<ConnectionContext, ClusterError>;
}

impl ContextResolver for MappingConfig {
    fn resolve(&self, cluster_name: &str) -> Result<ConnectionContext, ClusterError> {
        self.get(cluster_name)
            .map(|m| ConnectionContext {
                context: m.context.clone(),
                namespace: m.namespace.clone(),
            })
            .ok_or_else(|| ClusterError::unmapped(cluster_name))
    }
}

/// Default mapping file location (~/.kube/kubectl-mc-clusters.yaml)
pub fn default_mapping_path() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kube").join("kubectl-mc-clusters.yaml"))
        .context("Could not determine home directory")
}

/// File-backed mapping store
#[derive(Debug, Clone)]
pub struct MappingStore {
    path: PathBuf,
    config: MappingConfig,
}

impl MappingStore {
    /// Load from `path`, or start an empty document if the file does not exist
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let config = if path.exists() {
            let content = fs::read_to_string(&path)
                .with_context(|| format!("Failed to read mapping file: {}", path.display()))?;
            serde_yaml::from_str(&content)
                .with_context(|| format!("Failed to parse mapping file: {}", path.display()))?
        } else {
            MappingConfig::default()
        };

        debug!(path = %path.display(), mappings = config.clusters.len(), "Loaded cluster mappings");
        Ok(Self { path, config })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Create or overwrite a mapping and persist immediately
    pub fn set_mapping(&mut self, name: &str, context: &str, namespace: Option<&str>) -> Result<()> {
        let mut updated = self.config.clone();
        updated.upsert(name, context, namespace);
        self.persist(&updated)?;
        self.config = updated;
        Ok(())
    }

    pub fn list_mappings(&self) -> &[ClusterMapping] {
        &self.config.clusters
    }

    pub fn hub_context(&self) -> Option<&str> {
        self.config.hub_context.as_deref()
    }

    pub fn set_hub_context(&mut self, context: &str) -> Result<()> {
        let mut updated = self.config.clone();
        updated.hub_context = Some(context.to_string());
        self.persist(&updated)?;
        self.config = updated;
        Ok(())
    }

    fn persist(&self, config: &MappingConfig) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).with_context(|| {
                format!("Failed to create config directory: {}", parent.display())
            })?;
        }
        let content = serde_yaml::to_string(config).context("Failed to serialize mappings")?;
        crate::config::atomic_write(&self.path, content.as_bytes())
    }
}

impl ContextResolver for MappingStore {
    fn resolve(&self, cluster_name: &str) -> Result<ConnectionContext, ClusterError> {
        self.config.resolve(cluster_name)
    }
}
