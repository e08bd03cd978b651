// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Typed views over the loosely-typed objects returned by the cluster API
//!
//! Formatters only need a handful of fields per kind. Each known kind gets a
//! small serde view; anything that does not parse (or is not a known kind)
//! falls back to [`ResourceObject::Generic`] with just name/namespace/kind.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;

use super::resources::TableLayout;

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Metadata {
    pub name: String,
    pub namespace: String,
    pub creation_timestamp: Option<String>,
    pub labels: BTreeMap<String, String>,
    pub annotations: BTreeMap<String, String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Envelope {
    kind: String,
    metadata: Metadata,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ContainerStatus {
    name: String,
    ready: bool,
    restart_count: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodStatus {
    phase: String,
    #[serde(rename = "podIP")]
    pod_ip: Option<String>,
    container_statuses: Option<Vec<ContainerStatus>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct PodSpec {
    node_name: Option<String>,
    containers: Vec<Container>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct Container {
    name: String,
    image: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawPod {
    spec: PodSpec,
    status: PodStatus,
}

/// Fields the pod table and describe view need
#[derive(Debug, Clone, Default)]
pub struct PodView {
    pub phase: String,
    pub pod_ip: Option<String>,
    pub node_name: Option<String>,
    /// (name, image, ready, restarts) per container
    pub containers: Vec<(String, String, bool, i64)>,
    pub ready_containers: usize,
    pub total_containers: usize,
    pub restarts: i64,
}

impl From<RawPod> for PodView {
    fn from(raw: RawPod) -> Self {
        let statuses = raw.status.container_statuses.unwrap_or_default();
        let ready_containers = statuses.iter().filter(|cs| cs.ready).count();
        let restarts = statuses.iter().map(|cs| cs.restart_count).sum();
        let containers = raw
            .spec
            .containers
            .iter()
            .map(|c| {
                let status = statuses.iter().find(|cs| cs.name == c.name);
                (
                    c.name.clone(),
                    c.image.clone().unwrap_or_default(),
                    status.is_some_and(|cs| cs.ready),
                    status.map(|cs| cs.restart_count).unwrap_or(0),
                )
            })
            .collect();

        Self {
            phase: raw.status.phase,
            pod_ip: raw.status.pod_ip,
            node_name: raw.spec.node_name,
            containers,
            ready_containers,
            total_containers: statuses.len(),
            restarts,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DeploymentSpec {
    replicas: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct DeploymentStatus {
    replicas: i64,
    ready_replicas: i64,
    updated_replicas: i64,
    available_replicas: i64,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawDeployment {
    spec: DeploymentSpec,
    status: DeploymentStatus,
}

#[derive(Debug, Clone, Default)]
pub struct DeploymentView {
    /// Declared replica count (spec), falling back to the observed count
    pub desired: i64,
    pub ready: i64,
    pub up_to_date: i64,
    pub available: i64,
}

impl From<RawDeployment> for DeploymentView {
    fn from(raw: RawDeployment) -> Self {
        Self {
            desired: raw.spec.replicas.unwrap_or(raw.status.replicas),
            ready: raw.status.ready_replicas,
            up_to_date: raw.status.updated_replicas,
            available: raw.status.available_replicas,
        }
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServicePort {
    port: i64,
    protocol: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServiceSpec {
    #[serde(rename = "type")]
    type_: Option<String>,
    #[serde(rename = "clusterIP")]
    cluster_ip: Option<String>,
    #[serde(rename = "externalIPs")]
    external_ips: Vec<String>,
    ports: Vec<ServicePort>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct LoadBalancerIngress {
    ip: Option<String>,
    hostname: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct LoadBalancerStatus {
    ingress: Vec<LoadBalancerIngress>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
struct ServiceStatus {
    load_balancer: LoadBalancerStatus,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
struct RawService {
    spec: ServiceSpec,
    status: ServiceStatus,
}

#[derive(Debug, Clone, Default)]
pub struct ServiceView {
    pub service_type: String,
    pub cluster_ip: String,
    pub external_ips: Vec<String>,
    /// Rendered as "port/protocol"
    pub ports: Vec<String>,
}

impl From<RawService> for ServiceView {
    fn from(raw: RawService) -> Self {
        let mut external_ips = raw.spec.external_ips;
        for ingress in raw.status.load_balancer.ingress {
            if let Some(addr) = ingress.ip.or(ingress.hostname) {
                external_ips.push(addr);
            }
        }
        let ports = raw
            .spec
            .ports
            .iter()
            .map(|p| format!("{}/{}", p.port, p.protocol.as_deref().unwrap_or("TCP")))
            .collect();

        Self {
            service_type: raw.spec.type_.unwrap_or_default(),
            cluster_ip: raw.spec.cluster_ip.unwrap_or_default(),
            external_ips,
            ports,
        }
    }
}

/// Body of a resource object, by kind
#[derive(Debug, Clone)]
pub enum ObjectBody {
    Pod(PodView),
    Deployment(DeploymentView),
    Service(ServiceView),
    Generic,
}

/// One object returned by a cluster, with typed accessors
#[derive(Debug, Clone)]
pub struct ResourceObject {
    pub kind: String,
    pub metadata: Metadata,
    pub body: ObjectBody,
    /// The object as returned by the API
    pub raw: Value,
}

impl ResourceObject {
    /// Build a typed object according to the layout of its resource type
    pub fn from_value(layout: TableLayout, raw: Value) -> Self {
        let envelope: Envelope = serde_json::from_value(raw.clone()).unwrap_or_else(|_| Envelope {
            kind: string_at(&raw, &["kind"]),
            metadata: Metadata {
                name: string_at(&raw, &["metadata", "name"]),
                namespace: string_at(&raw, &["metadata", "namespace"]),
                creation_timestamp: None,
                ..Default::default()
            },
        });

        let body = match layout {
            TableLayout::Pods => serde_json::from_value::<RawPod>(raw.clone())
                .map(|p| ObjectBody::Pod(p.into()))
                .unwrap_or(ObjectBody::Generic),
            TableLayout::Deployments => serde_json::from_value::<RawDeployment>(raw.clone())
                .map(|d| ObjectBody::Deployment(d.into()))
                .unwrap_or(ObjectBody::Generic),
            TableLayout::Services => serde_json::from_value::<RawService>(raw.clone())
                .map(|s| ObjectBody::Service(s.into()))
                .unwrap_or(ObjectBody::Generic),
            TableLayout::Generic => ObjectBody::Generic,
        };

        Self {
            kind: envelope.kind,
            metadata: envelope.metadata,
            body,
            raw,
        }
    }

    pub fn name(&self) -> &str {
        &self.metadata.name
    }

    pub fn namespace(&self) -> &str {
        &self.metadata.namespace
    }

    pub fn creation_timestamp(&self) -> Option<&str> {
        self.metadata.creation_timestamp.as_deref()
    }
}

fn string_at(value: &Value, path: &[&str]) -> String {
    path.iter()
        .try_fold(value, |v, key| v.get(key))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string()
}
