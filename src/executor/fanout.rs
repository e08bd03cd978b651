// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Bounded-concurrency fan-out across clusters
//!
//! One task per cluster, admitted through a semaphore of `max_concurrency`
//! permits. Tasks report into a single collector over an mpsc channel, so
//! results arrive in completion order. A round always yields exactly one
//! [`ClusterResult`] per input cluster, whatever happens to the individual
//! tasks (errors, timeouts, cancellation, panics).

use futures::FutureExt;
use std::any::Any;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::{Semaphore, mpsc};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::types::{
    AggregatedResults, ClusterPayload, ClusterResult, ExecutorConfig, QueryMode, QuerySpec,
};
use crate::error::{ClusterError, QueryError};
use crate::kubernetes::describe;
use crate::kubernetes::directory::ClusterInfo;
use crate::kubernetes::mapping::{ConnectionContext, ContextResolver};
use crate::kubernetes::query::ClusterQuery;
use crate::kubernetes::resources::{ResourceType, registry};
use crate::progress::ProgressHandle;

/// Runs one query against many clusters
pub struct FanOutExecutor {
    resolver: Arc<dyn ContextResolver>,
    query: Arc<dyn ClusterQuery>,
    config: ExecutorConfig,
    progress: Option<ProgressHandle>,
}

impl FanOutExecutor {
    pub fn new(
        resolver: Arc<dyn ContextResolver>,
        query: Arc<dyn ClusterQuery>,
        config: ExecutorConfig,
    ) -> Self {
        Self {
            resolver,
            query,
            config,
            progress: None,
        }
    }

    /// Publish round events to a progress reporter
    pub fn with_progress(mut self, progress: ProgressHandle) -> Self {
        self.progress = Some(progress);
        self
    }

    /// Run `spec` against every cluster and collect all outcomes
    pub async fn execute(
        &self,
        clusters: &[ClusterInfo],
        spec: &QuerySpec,
        cancel: &CancellationToken,
    ) -> AggregatedResults {
        let total = clusters.len();
        let mut aggregated = AggregatedResults::new(total);
        if total == 0 {
            return aggregated;
        }

        let round_start = Instant::now();
        info!(
            resource = %spec.resource,
            name = ?spec.name,
            namespace = %spec.namespace.as_str(),
            clusters = total,
            max_concurrency = self.config.max_concurrency,
            timeout_ms = self.config.timeout_per_cluster.as_millis() as u64,
            continue_on_error = self.config.continue_on_error,
            "Starting fan-out round"
        );
        if let Some(progress) = &self.progress {
            progress.start_round(&spec.resource, total);
        }

        // More permits than clusters never matter, and tokio caps the permit count
        let permits = self.config.max_concurrency.clamp(1, total);
        let semaphore = Arc::new(Semaphore::new(permits));
        let spec = Arc::new(spec.clone());
        let (tx, mut rx) = mpsc::channel::<(usize, ClusterResult, u64)>(total);

        for (index, cluster) in clusters.iter().enumerate() {
            let task = ClusterTask {
                cluster_name: cluster.name.clone(),
                resolver: Arc::clone(&self.resolver),
                query: Arc::clone(&self.query),
                spec: Arc::clone(&spec),
                semaphore: Arc::clone(&semaphore),
                config: self.config.clone(),
                cancel: cancel.clone(),
            };
            let tx = tx.clone();

            tokio::spawn(async move {
                let start = Instant::now();
                let cluster_name = task.cluster_name.clone();
                let outcome = AssertUnwindSafe(task.run())
                    .catch_unwind()
                    .await
                    .unwrap_or_else(|panic| {
                        Err(QueryError::Aborted {
                            reason: panic_message(panic.as_ref()),
                        }
                        .into())
                    });
                let result = ClusterResult::new(cluster_name, outcome);
                let _ = tx
                    .send((index, result, start.elapsed().as_millis() as u64))
                    .await;
            });
        }
        drop(tx);

        let mut reported = vec![false; total];
        while let Some((index, result, elapsed_ms)) = rx.recv().await {
            if std::mem::replace(&mut reported[index], true) {
                continue;
            }
            self.record(&mut aggregated, result, elapsed_ms);
        }

        // A task that ended without reporting still owes an outcome
        for (index, cluster) in clusters.iter().enumerate() {
            if !reported[index] {
                let result = ClusterResult::failed(
                    cluster.name.clone(),
                    QueryError::Aborted {
                        reason: "task ended without reporting".to_string(),
                    },
                );
                self.record(&mut aggregated, result, 0);
            }
        }

        debug_assert!(aggregated.is_complete());
        info!(
            clusters = total,
            successful = aggregated.summary.successful,
            failed = aggregated.summary.failed,
            elapsed_ms = round_start.elapsed().as_millis() as u64,
            "Fan-out round complete"
        );
        aggregated
    }

    fn record(&self, aggregated: &mut AggregatedResults, result: ClusterResult, elapsed_ms: u64) {
        match result.error() {
            None => debug!(
                cluster = %result.cluster_name,
                items = result.items().len(),
                elapsed_ms,
                "Cluster query succeeded"
            ),
            Some(e) => warn!(
                cluster = %result.cluster_name,
                error = %e,
                elapsed_ms,
                "Cluster query failed"
            ),
        }
        if let Some(progress) = &self.progress {
            progress.cluster_complete(&result.cluster_name, result.success(), elapsed_ms);
        }
        aggregated.add_result(result);
    }
}

/// Everything one cluster's task needs, owned so it can be spawned
struct ClusterTask {
    cluster_name: String,
    resolver: Arc<dyn ContextResolver>,
    query: Arc<dyn ClusterQuery>,
    spec: Arc<QuerySpec>,
    semaphore: Arc<Semaphore>,
    config: ExecutorConfig,
    cancel: CancellationToken,
}

impl ClusterTask {
    async fn run(self) -> Result<ClusterPayload, ClusterError> {
        // Permit is released when this function returns, on every path
        let _permit = tokio::select! {
            biased;
            _ = self.cancel.cancelled() => return Err(QueryError::Cancelled.into()),
            permit = Arc::clone(&self.semaphore).acquire_owned() => {
                permit.map_err(|e| QueryError::Aborted { reason: e.to_string() })?
            }
        };

        let ctx = self.resolver.resolve(&self.cluster_name)?;
        debug!(
            cluster = %self.cluster_name,
            context = %ctx.context,
            mapped_namespace = ?ctx.namespace,
            "Resolved connection context"
        );
        let resource = registry().resolve(&self.spec.resource)?;

        let timeout = self.config.timeout_per_cluster;
        let work = dispatch(self.query.as_ref(), &ctx, resource, &self.spec);

        tokio::select! {
            biased;
            _ = self.cancel.cancelled() => Err(QueryError::Cancelled.into()),
            res = tokio::time::timeout(timeout, work) => match res {
                Ok(outcome) => outcome.map_err(ClusterError::from),
                Err(_) => Err(QueryError::Timeout {
                    timeout_ms: timeout.as_millis() as u64,
                }
                .into()),
            },
        }
    }
}

async fn dispatch(
    query: &dyn ClusterQuery,
    ctx: &ConnectionContext,
    resource: &ResourceType,
    spec: &QuerySpec,
) -> Result<ClusterPayload, QueryError> {
    let scope = &spec.namespace;
    match (spec.mode, spec.name.as_deref()) {
        (QueryMode::List, None) => Ok(ClusterPayload {
            items: query.list(ctx, resource, scope).await?,
            narrative: String::new(),
        }),
        (QueryMode::List, Some(name)) => Ok(ClusterPayload {
            items: query.fetch(ctx, resource, scope, name).await?,
            narrative: String::new(),
        }),
        (QueryMode::Describe, Some(name)) => Ok(ClusterPayload {
            items: Vec::new(),
            narrative: query.describe(ctx, resource, scope, name).await?,
        }),
        (QueryMode::Describe, None) => {
            let items = query.list(ctx, resource, scope).await?;
            Ok(ClusterPayload {
                narrative: describe::render_all(&items),
                items: Vec::new(),
            })
        }
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}
