// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Kubeconfig-backed client factory
//!
//! Creates one `kube::Client` per kubeconfig context on first use and keeps it
//! for the rest of the process.

use anyhow::{Result, anyhow};
use kube::config::{KubeConfigOptions, Kubeconfig};
use kube::{Client, Config};
use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::debug;

use crate::error::QueryError;

/// Timeout for connecting to K8s API
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Timeout for reading K8s API responses
const READ_TIMEOUT: Duration = Duration::from_secs(30);

/// Client cache keyed by context name
pub struct ClientFactory {
    kubeconfig: Kubeconfig,
    clients: Arc<RwLock<HashMap<String, Client>>>,
}

impl ClientFactory {
    /// Read `path`, or the user's kubeconfig (KUBECONFIG or ~/.kube/config)
    pub fn new(path: Option<&Path>) -> Result<Self> {
        let kubeconfig = match path {
            Some(path) => Kubeconfig::read_from(path)?,
            None => Kubeconfig::read()?,
        };
        Ok(Self::from_kubeconfig(kubeconfig))
    }

    pub fn from_kubeconfig(kubeconfig: Kubeconfig) -> Self {
        Self {
            kubeconfig,
            clients: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    pub fn current_context(&self) -> Option<&str> {
        self.kubeconfig.current_context.as_deref()
    }

    pub fn list_contexts(&self) -> Vec<String> {
        self.kubeconfig
            .contexts
            .iter()
            .map(|c| c.name.clone())
            .collect()
    }

    pub fn has_context(&self, context: &str) -> bool {
        self.kubeconfig.contexts.iter().any(|c| c.name == context)
    }

    /// Namespace set on a kubeconfig context (current context when `None`)
    pub fn default_namespace(&self, context: Option<&str>) -> Option<String> {
        let name = context.or(self.current_context())?;
        self.kubeconfig
            .contexts
            .iter()
            .find(|c| c.name == name)
            .and_then(|c| c.context.as_ref())
            .and_then(|c| c.namespace.clone())
            .filter(|ns| !ns.is_empty())
    }

    /// Resolve the hub context: explicit value, else kubeconfig current context
    pub fn hub_context(&self, explicit: Option<&str>) -> Result<String> {
        let context = explicit
            .map(String::from)
            .or_else(|| self.kubeconfig.current_context.clone())
            .ok_or_else(|| anyhow!("No hub context specified and no current context in kubeconfig"))?;

        if !self.has_context(&context) {
            return Err(anyhow!(
                "Context '{}' not found in kubeconfig (available: {})",
                context,
                self.list_contexts().join(", ")
            ));
        }
        Ok(context)
    }

    /// Get or create a client for the given context
    pub async fn client_for(&self, context: &str) -> Result<Client, QueryError> {
        {
            let clients = self.clients.read().await;
            if let Some(client) = clients.get(context) {
                return Ok(client.clone());
            }
        }

        if !self.has_context(context) {
            return Err(QueryError::client(format!(
                "context '{}' not found in kubeconfig",
                context
            )));
        }

        let start = Instant::now();
        let mut config = Config::from_custom_kubeconfig(
            self.kubeconfig.clone(),
            &KubeConfigOptions {
                context: Some(context.to_string()),
                ..Default::default()
            },
        )
        .await
        .map_err(|e| {
            QueryError::client(format!("failed to load kubeconfig for context '{}': {}", context, e))
        })?;

        config.connect_timeout = Some(CONNECT_TIMEOUT);
        config.read_timeout = Some(READ_TIMEOUT);

        let client = Client::try_from(config).map_err(QueryError::client)?;
        debug!(
            context = %context,
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Created client"
        );

        let mut clients = self.clients.write().await;
        Ok(clients
            .entry(context.to_string())
            .or_insert(client)
            .clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const KUBECONFIG: &str = r#"
apiVersion: v1
kind: Config
current-context: kind-hub
clusters:
  - name: hub
    cluster:
      server: https://127.0.0.1:6443
contexts:
  - name: kind-hub
    context:
      cluster: hub
      user: admin
      namespace: team-a
  - name: kind-cluster1
    context:
      cluster: hub
      user: admin
users:
  - name: admin
    user:
      token: abc
"#;

    fn factory() -> ClientFactory {
        ClientFactory::from_kubeconfig(Kubeconfig::from_yaml(KUBECONFIG).unwrap())
    }

    #[test]
    fn test_contexts() {
        let f = factory();
        assert_eq!(f.current_context(), Some("kind-hub"));
        assert_eq!(f.list_contexts(), vec!["kind-hub", "kind-cluster1"]);
        assert!(f.has_context("kind-cluster1"));
        assert!(!f.has_context("missing"));
    }

    #[test]
    fn test_default_namespace() {
        let f = factory();
        assert_eq!(f.default_namespace(None).as_deref(), Some("team-a"));
        assert_eq!(f.default_namespace(Some("kind-cluster1")), None);
        assert_eq!(f.default_namespace(Some("missing")), None);
    }

    #[test]
    fn test_hub_context() {
        let f = factory();
        assert_eq!(f.hub_context(None).unwrap(), "kind-hub");
        assert_eq!(f.hub_context(Some("kind-cluster1")).unwrap(), "kind-cluster1");
        assert!(f.hub_context(Some("missing")).is_err());
    }

    #[test]
    fn test_explicit_kubeconfig_path() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("hub.yaml");
        std::fs::write(&path, KUBECONFIG).unwrap();

        let f = ClientFactory::new(Some(&path)).unwrap();
        assert_eq!(f.current_context(), Some("kind-hub"));
        assert!(f.has_context("kind-cluster1"));

        assert!(ClientFactory::new(Some(&dir.path().join("missing.yaml"))).is_err());
    }

    #[tokio::test]
    async fn test_unknown_context_is_client_error() {
        let err = factory().client_for("missing").await.err().unwrap();
        assert!(matches!(err, QueryError::Client { .. }));
    }
}
