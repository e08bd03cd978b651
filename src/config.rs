// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Configuration for kubectl-mc
//!
//! User defaults are read from ~/.kubectl-mc/config.json and merged with
//! command-line flags into an immutable [`Settings`] value built once per
//! invocation. All kubectl-mc data is stored under ~/.kubectl-mc/:
//! - ~/.kubectl-mc/config.json - user configuration
//! - ~/.kubectl-mc/log/ - log files
//!
//! Cluster mappings live separately, in ~/.kube/kubectl-mc-clusters.yaml.

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::executor::ExecutorConfig;
use crate::kubernetes::mapping::default_mapping_path;

/// Namespace on the hub where ClusterProfile objects live
pub const DEFAULT_HUB_NAMESPACE: &str = "open-cluster-management";

/// Get the base kubectl-mc directory (~/.kubectl-mc/)
pub fn base_dir() -> Result<PathBuf> {
    dirs::home_dir()
        .map(|p| p.join(".kubectl-mc"))
        .context("Could not determine home directory")
}

/// Atomically write content to a file using tempfile + rename
///
/// Readers in other processes see either the old or the new content, never a
/// partial write.
pub fn atomic_write(path: &Path, content: &[u8]) -> Result<()> {
    use tempfile::NamedTempFile;

    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    let temp_file = NamedTempFile::new_in(dir).context("Failed to create temp file")?;

    fs::write(temp_file.path(), content)
        .with_context(|| format!("Failed to write temp file {:?}", temp_file.path()))?;

    temp_file
        .persist(path)
        .with_context(|| format!("Failed to persist file to {:?}", path))?;

    Ok(())
}

/// kubectl-mc configuration file
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// kubeconfig context of the hub cluster
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_context: Option<String>,
    /// Namespace holding ClusterProfile objects
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hub_namespace: Option<String>,
    /// Override for the mapping document location
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mapping_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_concurrency: Option<usize>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timeout_seconds: Option<u64>,
}

impl Config {
    /// Load config from disk, or return default if not found
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            let config: Config = serde_json::from_str(&content)
                .with_context(|| format!("Failed to parse config file: {}", path.display()))?;
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    /// Get the config file path (~/.kubectl-mc/config.json)
    pub fn config_path() -> Result<PathBuf> {
        Ok(base_dir()?.join("config.json"))
    }
}

/// Values given on the command line, which take precedence over the file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub hub_context: Option<String>,
    pub hub_namespace: Option<String>,
    pub mapping_file: Option<PathBuf>,
    pub max_concurrency: Option<usize>,
    pub timeout_seconds: Option<u64>,
}

/// Effective configuration for one invocation
#[derive(Debug, Clone)]
pub struct Settings {
    /// Explicit hub context; `None` falls back to the mapping document, then kubeconfig
    pub hub_context: Option<String>,
    pub hub_namespace: String,
    pub mapping_file: PathBuf,
    pub executor: ExecutorConfig,
}

impl Settings {
    pub fn resolve(file: &Config, overrides: &Overrides) -> Result<Self> {
        let defaults = ExecutorConfig::default();

        let max_concurrency = overrides
            .max_concurrency
            .or(file.max_concurrency)
            .unwrap_or(defaults.max_concurrency);
        if max_concurrency == 0 {
            bail!("max_concurrency must be a positive integer");
        }

        let timeout_per_cluster = overrides
            .timeout_seconds
            .or(file.timeout_seconds)
            .map(Duration::from_secs)
            .unwrap_or(defaults.timeout_per_cluster);
        if timeout_per_cluster.is_zero() {
            bail!("timeout_seconds must be greater than zero");
        }

        let mapping_file = match overrides.mapping_file.clone().or_else(|| file.mapping_file.clone()) {
            Some(path) => path,
            None => default_mapping_path()?,
        };

        Ok(Self {
            hub_context: overrides.hub_context.clone().or_else(|| file.hub_context.clone()),
            hub_namespace: overrides
                .hub_namespace
                .clone()
                .or_else(|| file.hub_namespace.clone())
                .unwrap_or_else(|| DEFAULT_HUB_NAMESPACE.to_string()),
            mapping_file,
            executor: ExecutorConfig {
                max_concurrency,
                timeout_per_cluster,
                continue_on_error: defaults.continue_on_error,
            },
        })
    }
}
