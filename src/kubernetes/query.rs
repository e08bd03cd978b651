// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Per-cluster query executor
//!
//! [`ClusterQuery`] is the seam between the fan-out executor and the cluster
//! API. [`KubeQueryExecutor`] implements it with kube-rs dynamic objects,
//! paginated lists and retries for transient failures.

use async_trait::async_trait;
use glob::Pattern;
use kube::api::{DynamicObject, ListParams, ObjectList};
use kube::Api;
use serde_json::Value;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, trace, warn};

use super::client::ClientFactory;
use super::describe;
use super::mapping::ConnectionContext;
use super::objects::ResourceObject;
use super::resources::ResourceType;
use crate::error::QueryError;

/// Maximum retry attempts for transient failures
const MAX_RETRIES: u32 = 3;

/// Base delay for exponential backoff (doubles each retry)
const RETRY_BASE_DELAY: Duration = Duration::from_millis(100);

/// Page size for paginated list requests
const PAGE_SIZE: u32 = 500;

/// Namespace scope of a query
///
/// `All` is distinct from any named namespace, including "default".
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NamespaceScope {
    All,
    Named(String),
}

impl NamespaceScope {
    pub fn as_str(&self) -> &str {
        match self {
            Self::All => "",
            Self::Named(ns) => ns,
        }
    }
}

/// Apply namespace precedence: `-A`, then `-n`, then the context's namespace, then "default"
pub fn resolve_namespace(
    all_namespaces: bool,
    explicit: Option<&str>,
    ambient: Option<&str>,
) -> NamespaceScope {
    if all_namespaces {
        return NamespaceScope::All;
    }
    if let Some(ns) = explicit {
        return NamespaceScope::Named(ns.to_string());
    }
    NamespaceScope::Named(
        ambient
            .filter(|ns| !ns.is_empty())
            .unwrap_or("default")
            .to_string(),
    )
}

/// True when a name should be matched as a glob rather than fetched directly
pub fn is_glob(name: &str) -> bool {
    name.contains(['*', '?', '['])
}

/// Queries one cluster
#[async_trait]
pub trait ClusterQuery: Send + Sync {
    /// List every object of `resource` in `scope`
    async fn list(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
    ) -> Result<Vec<ResourceObject>, QueryError>;

    /// Fetch one object by exact name
    async fn get(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
        name: &str,
    ) -> Result<ResourceObject, QueryError>;

    /// Fetch by name; glob names list the scope and keep matching objects
    async fn fetch(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
        name: &str,
    ) -> Result<Vec<ResourceObject>, QueryError> {
        if !is_glob(name) {
            return Ok(vec![self.get(ctx, resource, scope, name).await?]);
        }

        let pattern = Pattern::new(name).map_err(|e| QueryError::api(format!("invalid name pattern '{}': {}", name, e)))?;
        let items = self.list(ctx, resource, scope).await?;
        Ok(items
            .into_iter()
            .filter(|obj| pattern.matches(obj.name()))
            .collect())
    }

    /// Fetch by name and render a narrative block
    async fn describe(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
        name: &str,
    ) -> Result<String, QueryError> {
        let objects = self.fetch(ctx, resource, scope, name).await?;
        Ok(describe::render_all(&objects))
    }
}

/// [`ClusterQuery`] backed by kube-rs
pub struct KubeQueryExecutor {
    clients: Arc<ClientFactory>,
}

impl KubeQueryExecutor {
    pub fn new(clients: Arc<ClientFactory>) -> Self {
        Self { clients }
    }

    async fn api(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
    ) -> Result<Api<DynamicObject>, QueryError> {
        let client = self.clients.client_for(&ctx.context).await?;
        let ar = &resource.api_resource;

        let (api, api_scope) = if resource.namespaced {
            match scope {
                NamespaceScope::Named(ns) => (Api::namespaced_with(client, ns, ar), "namespaced"),
                NamespaceScope::All => (Api::all_with(client, ar), "all-namespaces"),
            }
        } else {
            (Api::all_with(client, ar), "cluster-scoped")
        };

        debug!(
            context = %ctx.context,
            resource = %resource.name,
            namespace = %scope.as_str(),
            scope = %api_scope,
            "API scope"
        );
        Ok(api)
    }

    /// List resources with pagination and retry logic
    async fn list_all(
        &self,
        api: &Api<DynamicObject>,
        resource: &ResourceType,
        ctx_name: &str,
    ) -> Result<Vec<DynamicObject>, QueryError> {
        let mut all_items: Vec<DynamicObject> = Vec::new();
        let mut continue_token: Option<String> = None;
        let mut page_count = 0u32;

        loop {
            let mut params = ListParams::default().limit(PAGE_SIZE);
            if let Some(ref token) = continue_token {
                params = params.continue_token(token);
            }

            let list: ObjectList<DynamicObject> =
                with_retry(&resource.name, ctx_name, || api.list(&params)).await?;

            let items_count = list.items.len();
            all_items.extend(list.items);
            page_count += 1;

            match list.metadata.continue_ {
                Some(token) if !token.is_empty() => {
                    trace!(
                        resource = %resource.name,
                        context = %ctx_name,
                        page = page_count,
                        items_this_page = items_count,
                        total_so_far = all_items.len(),
                        "Fetched page, continuing"
                    );
                    continue_token = Some(token);
                }
                _ => break,
            }
        }

        if page_count > 1 {
            debug!(
                resource = %resource.name,
                context = %ctx_name,
                pages = page_count,
                total_items = all_items.len(),
                "Pagination complete"
            );
        }
        Ok(all_items)
    }
}

#[async_trait]
impl ClusterQuery for KubeQueryExecutor {
    async fn list(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
    ) -> Result<Vec<ResourceObject>, QueryError> {
        let api = self.api(ctx, resource, scope).await?;
        let items = self.list_all(&api, resource, &ctx.context).await?;
        items
            .into_iter()
            .map(|item| to_resource_object(resource, item))
            .collect()
    }

    async fn get(
        &self,
        ctx: &ConnectionContext,
        resource: &ResourceType,
        scope: &NamespaceScope,
        name: &str,
    ) -> Result<ResourceObject, QueryError> {
        let api = self.api(ctx, resource, scope).await?;
        let item = with_retry(&resource.name, &ctx.context, || api.get_opt(name))
            .await?
            .ok_or_else(|| QueryError::NotFound {
                kind: resource.kind().to_string(),
                name: name.to_string(),
            })?;
        to_resource_object(resource, item)
    }
}

fn to_resource_object(resource: &ResourceType, item: DynamicObject) -> Result<ResourceObject, QueryError> {
    let mut value = serde_json::to_value(item).map_err(QueryError::api)?;
    inject_type_meta(&mut value, resource);
    Ok(ResourceObject::from_value(resource.layout, value))
}

/// Inject apiVersion and kind (K8s list API doesn't include these per-item)
fn inject_type_meta(value: &mut Value, resource: &ResourceType) {
    if let Value::Object(map) = value {
        map.insert(
            "apiVersion".to_string(),
            Value::String(resource.api_resource.api_version.clone()),
        );
        map.insert(
            "kind".to_string(),
            Value::String(resource.api_resource.kind.clone()),
        );
    }
}

/// Run an API call, retrying transient failures with exponential backoff
async fn with_retry<T, F, Fut>(resource: &str, ctx_name: &str, mut call: F) -> Result<T, QueryError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, kube::Error>>,
{
    let mut last_error = None;

    for attempt in 0..MAX_RETRIES {
        match call().await {
            Ok(value) => return Ok(value),
            Err(e) if is_retryable_error(&e) => {
                let delay = RETRY_BASE_DELAY * 2u32.pow(attempt);
                warn!(
                    resource = %resource,
                    context = %ctx_name,
                    attempt = attempt + 1,
                    max_attempts = MAX_RETRIES,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "Retryable error, backing off"
                );
                tokio::time::sleep(delay).await;
                last_error = Some(e);
            }
            Err(e) => {
                debug!(resource = %resource, context = %ctx_name, error = %e, "Non-retryable error");
                return Err(QueryError::api(e));
            }
        }
    }

    Err(QueryError::api(format!(
        "failed after {} retries: {}",
        MAX_RETRIES,
        last_error.map(|e| e.to_string()).unwrap_or_default()
    )))
}

/// Check if an error is retryable (transient failures)
fn is_retryable_error(err: &kube::Error) -> bool {
    match err {
        kube::Error::HyperError(_) => true,
        // 429 (rate limit), 503 (unavailable), 504 (timeout)
        kube::Error::Api(api_err) => matches!(api_err.code, 429 | 503 | 504),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::resources::registry;
    use serde_json::json;

    struct StaticQuery {
        items: Vec<Value>,
    }

    #[async_trait]
    impl ClusterQuery for StaticQuery {
        async fn list(
            &self,
            _ctx: &ConnectionContext,
            resource: &ResourceType,
            _scope: &NamespaceScope,
        ) -> Result<Vec<ResourceObject>, QueryError> {
            Ok(self
                .items
                .iter()
                .map(|v| ResourceObject::from_value(resource.layout, v.clone()))
                .collect())
        }

        async fn get(
            &self,
            ctx: &ConnectionContext,
            resource: &ResourceType,
            scope: &NamespaceScope,
            name: &str,
        ) -> Result<ResourceObject, QueryError> {
            self.list(ctx, resource, scope)
                .await?
                .into_iter()
                .find(|o| o.name() == name)
                .ok_or_else(|| QueryError::NotFound {
                    kind: resource.kind().to_string(),
                    name: name.to_string(),
                })
        }
    }

    fn ctx() -> ConnectionContext {
        ConnectionContext {
            context: "kind-c1".to_string(),
            namespace: None,
        }
    }

    fn pods() -> StaticQuery {
        StaticQuery {
            items: ["nginx-1", "nginx-2", "redis"]
                .iter()
                .map(|n| json!({"kind": "Pod", "metadata": {"name": n, "namespace": "web"}}))
                .collect(),
        }
    }

    #[test]
    fn test_namespace_precedence() {
        assert_eq!(resolve_namespace(true, Some("x"), Some("y")), NamespaceScope::All);
        assert_eq!(
            resolve_namespace(false, Some("x"), Some("y")),
            NamespaceScope::Named("x".into())
        );
        assert_eq!(
            resolve_namespace(false, None, Some("y")),
            NamespaceScope::Named("y".into())
        );
        assert_eq!(
            resolve_namespace(false, None, None),
            NamespaceScope::Named("default".into())
        );
        assert_eq!(
            resolve_namespace(false, None, Some("")),
            NamespaceScope::Named("default".into())
        );
    }

    #[test]
    fn test_all_namespaces_is_distinct_scope() {
        assert_eq!(NamespaceScope::All.as_str(), "");
        assert_ne!(NamespaceScope::All, NamespaceScope::Named("default".into()));
    }

    #[test]
    fn test_is_glob() {
        assert!(is_glob("nginx-*"));
        assert!(is_glob("web-?"));
        assert!(is_glob("db-[12]"));
        assert!(!is_glob("nginx"));
    }

    #[test]
    fn test_inject_type_meta() {
        let resource = registry().get("deploy").unwrap();
        let mut value = json!({"metadata": {"name": "api"}});
        inject_type_meta(&mut value, resource);
        assert_eq!(value["apiVersion"], "apps/v1");
        assert_eq!(value["kind"], "Deployment");
    }

    #[tokio::test]
    async fn test_fetch_glob_filters_list() {
        let resource = registry().get("pods").unwrap();
        let scope = NamespaceScope::Named("web".into());
        let items = pods().fetch(&ctx(), resource, &scope, "nginx-*").await.unwrap();
        let names: Vec<_> = items.iter().map(|o| o.name()).collect();
        assert_eq!(names, vec!["nginx-1", "nginx-2"]);
    }

    #[tokio::test]
    async fn test_fetch_exact_name_not_found() {
        let resource = registry().get("pods").unwrap();
        let err = pods()
            .fetch(&ctx(), resource, &NamespaceScope::All, "nginx")
            .await
            .unwrap_err();
        assert_eq!(
            err,
            QueryError::NotFound {
                kind: "Pod".into(),
                name: "nginx".into()
            }
        );
    }

    #[tokio::test]
    async fn test_describe_renders_narrative() {
        let resource = registry().get("pods").unwrap();
        let text = pods()
            .describe(&ctx(), resource, &NamespaceScope::All, "redis")
            .await
            .unwrap();
        assert!(text.starts_with("Name:         redis\n"));
    }
}
