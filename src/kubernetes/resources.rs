// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Registry of resource types the fan-out executor knows how to query
//!
//! Maps colloquial names (singular, plural, short names) to a canonical
//! resource type carrying the API coordinates and the table layout used
//! when rendering list results.

use kube::discovery::ApiResource;
use std::collections::HashMap;
use std::sync::OnceLock;

use crate::error::ClusterError;

/// Column layout used by the table aggregator
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableLayout {
    Pods,
    Deployments,
    Services,
    Generic,
}

/// A canonical resource type
#[derive(Debug, Clone)]
pub struct ResourceType {
    /// Canonical name (lowercase plural, e.g. "pods")
    pub name: String,
    pub api_resource: ApiResource,
    pub namespaced: bool,
    pub layout: TableLayout,
}

impl ResourceType {
    pub fn kind(&self) -> &str {
        &self.api_resource.kind
    }
}

/// Closed lookup table from aliases to canonical resource types
#[derive(Debug, Clone)]
pub struct ResourceRegistry {
    by_name: HashMap<String, ResourceType>,
    alias_map: HashMap<String, String>,
}

impl ResourceRegistry {
    fn new() -> Self {
        Self {
            by_name: HashMap::new(),
            alias_map: HashMap::new(),
        }
    }

    fn add(&mut self, info: ResourceType, aliases: &[&str]) {
        for alias in aliases {
            self.alias_map
                .insert(alias.to_string(), info.name.clone());
        }
        self.alias_map.insert(info.name.clone(), info.name.clone());
        self.by_name.insert(info.name.clone(), info);
    }

    /// Look up a resource by canonical name or alias (case-insensitive)
    pub fn get(&self, token: &str) -> Option<&ResourceType> {
        let name = self.alias_map.get(&token.trim().to_lowercase())?;
        self.by_name.get(name)
    }

    /// Resolve a resource token for one cluster
    pub fn resolve(&self, token: &str) -> Result<&ResourceType, ClusterError> {
        self.get(token)
            .ok_or_else(|| ClusterError::unknown_resource(token))
    }

    /// Canonical names, sorted
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.by_name.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }
}

/// The built-in registry, built once from k8s-openapi type information
pub fn registry() -> &'static ResourceRegistry {
    static REGISTRY: OnceLock<ResourceRegistry> = OnceLock::new();
    REGISTRY.get_or_init(build_registry)
}

fn build_registry() -> ResourceRegistry {
    use k8s_openapi::api::{
        apps::v1::{DaemonSet, Deployment, ReplicaSet, StatefulSet},
        batch::v1::{CronJob, Job},
        core::v1::{
            ConfigMap, Namespace, Node, PersistentVolume, PersistentVolumeClaim, Pod, Secret,
            Service, ServiceAccount,
        },
        networking::v1::Ingress,
    };
    use kube::Resource;

    let mut registry = ResourceRegistry::new();

    macro_rules! add_resource {
        ($type:ty, namespaced, $layout:expr, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, true, $layout, [$($alias),*])
        }};
        ($type:ty, cluster, $layout:expr, [$($alias:expr),* $(,)?]) => {{
            add_resource!(@inner $type, false, $layout, [$($alias),*])
        }};
        (@inner $type:ty, $namespaced:expr, $layout:expr, [$($alias:expr),* $(,)?]) => {{
            let api_resource = ApiResource {
                group: <$type>::group(&()).to_string(),
                version: <$type>::version(&()).to_string(),
                api_version: <$type>::api_version(&()).to_string(),
                kind: <$type>::kind(&()).to_string(),
                plural: <$type>::plural(&()).to_string(),
            };
            let info = ResourceType {
                name: api_resource.plural.clone(),
                api_resource,
                namespaced: $namespaced,
                layout: $layout,
            };
            registry.add(info, &[$($alias),*]);
        }};
    }

    add_resource!(Pod, namespaced, TableLayout::Pods, ["pod", "po"]);
    add_resource!(Deployment, namespaced, TableLayout::Deployments, ["deployment", "deploy"]);
    add_resource!(Service, namespaced, TableLayout::Services, ["service", "svc"]);

    add_resource!(ConfigMap, namespaced, TableLayout::Generic, ["configmap", "cm"]);
    add_resource!(Secret, namespaced, TableLayout::Generic, ["secret"]);
    add_resource!(ServiceAccount, namespaced, TableLayout::Generic, ["serviceaccount", "sa"]);
    add_resource!(
        PersistentVolumeClaim,
        namespaced,
        TableLayout::Generic,
        ["persistentvolumeclaim", "pvc"]
    );
    add_resource!(StatefulSet, namespaced, TableLayout::Generic, ["statefulset", "sts"]);
    add_resource!(DaemonSet, namespaced, TableLayout::Generic, ["daemonset", "ds"]);
    add_resource!(ReplicaSet, namespaced, TableLayout::Generic, ["replicaset", "rs"]);
    add_resource!(Job, namespaced, TableLayout::Generic, ["job"]);
    add_resource!(CronJob, namespaced, TableLayout::Generic, ["cronjob", "cj"]);
    add_resource!(Ingress, namespaced, TableLayout::Generic, ["ingress", "ing"]);

    add_resource!(Namespace, cluster, TableLayout::Generic, ["namespace", "ns"]);
    add_resource!(Node, cluster, TableLayout::Generic, ["node", "no"]);
    add_resource!(PersistentVolume, cluster, TableLayout::Generic, ["persistentvolume", "pv"]);

    registry
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_singular_and_plural_resolve_to_same_type() {
        let reg = registry();
        let plural = reg.get("pods").unwrap();
        let singular = reg.get("pod").unwrap();
        assert_eq!(plural.name, "pods");
        assert_eq!(singular.name, "pods");
        assert_eq!(plural.api_resource.version, "v1");
        assert_eq!(plural.api_resource.group, "");
    }

    #[test]
    fn test_deployment_coordinates() {
        let deploy = registry().get("deployment").unwrap();
        assert_eq!(deploy.name, "deployments");
        assert_eq!(deploy.api_resource.group, "apps");
        assert_eq!(deploy.api_resource.version, "v1");
        assert_eq!(deploy.kind(), "Deployment");
        assert_eq!(deploy.layout, TableLayout::Deployments);
    }

    #[test]
    fn test_short_names_and_case() {
        let reg = registry();
        assert_eq!(reg.get("svc").unwrap().name, "services");
        assert_eq!(reg.get("Services").unwrap().name, "services");
        assert_eq!(reg.get("CM").unwrap().name, "configmaps");
    }

    #[test]
    fn test_cluster_scoped_types() {
        let reg = registry();
        assert!(!reg.get("namespaces").unwrap().namespaced);
        assert!(!reg.get("node").unwrap().namespaced);
        assert!(reg.get("secrets").unwrap().namespaced);
    }

    #[test]
    fn test_unknown_resource_is_cluster_error() {
        let err = registry().resolve("widgets").unwrap_err();
        assert_eq!(err, ClusterError::unknown_resource("widgets"));
    }

    #[test]
    fn test_names_sorted() {
        let names = registry().names();
        let mut sorted = names.clone();
        sorted.sort_unstable();
        assert_eq!(names, sorted);
        assert!(names.contains(&"pods"));
    }
}
