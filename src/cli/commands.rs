// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Command wiring: discovery, selection, fan-out and rendering

use anyhow::{Context, Result, bail};
use comfy_table::{Cell, Color, ContentArrangement, Table, presets::UTF8_FULL_CONDENSED};
use console::style;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use super::args::{Args, ClusterFilter, Command, NamespaceArgs};
use super::setup;
use crate::config::{Config, Settings};
use crate::executor::{AggregatedResults, FanOutExecutor, QuerySpec};
use crate::kubernetes::mapping::ClusterMapping;
use crate::kubernetes::query::resolve_namespace;
use crate::kubernetes::resources::{TableLayout, registry};
use crate::kubernetes::selector;
use crate::kubernetes::{
    ClientFactory, ClusterDirectory, ClusterInfo, ClusterProfileDirectory, ContextResolver,
    KubeQueryExecutor, MappingStore,
};
use crate::output::{self, ListOptions, OutputFormatKind};
use crate::progress::{SpinnerGuard, create_progress_handle};

/// Everything a command needs, built once per invocation
pub struct App {
    settings: Settings,
    clients: Arc<ClientFactory>,
    mappings: MappingStore,
    verbose: bool,
}

impl App {
    pub fn new(args: &Args) -> Result<Self> {
        let file = Config::load()?;
        let settings = Settings::resolve(&file, &args.overrides())?;
        let mappings = MappingStore::open(&settings.mapping_file)?;
        let clients = ClientFactory::new(args.kubeconfig.as_deref())
            .context("Failed to read kubeconfig")?;
        let clients = Arc::new(clients);

        Ok(Self {
            settings,
            clients,
            mappings,
            verbose: args.verbose,
        })
    }

    /// Hub context: flag or config file, then mapping document, then kubeconfig current context
    fn hub_context(&self) -> Result<String> {
        let explicit = self
            .settings
            .hub_context
            .as_deref()
            .or(self.mappings.hub_context());
        self.clients.hub_context(explicit)
    }

    async fn directory(&self) -> Result<ClusterProfileDirectory> {
        let hub = self.hub_context()?;
        let client = self
            .clients
            .client_for(&hub)
            .await
            .with_context(|| format!("Failed to connect to hub context '{}'", hub))?;
        Ok(ClusterProfileDirectory::new(
            client,
            self.settings.hub_namespace.clone(),
        ))
    }

    /// Fresh directory snapshot after include/exclude filtering
    async fn selected_clusters(&self, filter: &ClusterFilter) -> Result<Vec<ClusterInfo>> {
        let all = self
            .directory()
            .await?
            .list_clusters()
            .await
            .context("Failed to discover clusters")?;
        let selected = selector::select(&all, &filter.clusters, &filter.exclude);
        info!(
            discovered = all.len(),
            selected = selected.len(),
            "Cluster snapshot ready"
        );
        Ok(selected)
    }

    fn executor(&self) -> FanOutExecutor {
        let resolver: Arc<dyn ContextResolver> = Arc::new(self.mappings.clone());
        let query = Arc::new(KubeQueryExecutor::new(Arc::clone(&self.clients)));
        FanOutExecutor::new(resolver, query, self.settings.executor.clone())
    }

    /// Run one round, with a spinner on interactive terminals
    async fn run_round(
        &self,
        clusters: &[ClusterInfo],
        spec: &QuerySpec,
        cancel: &CancellationToken,
    ) -> AggregatedResults {
        let show_spinner = !self.verbose && console::Term::stderr().is_term() && !clusters.is_empty();
        if !show_spinner {
            return self.executor().execute(clusters, spec, cancel).await;
        }

        let progress = create_progress_handle();
        let spinner = SpinnerGuard::start(&progress, "Querying clusters...");
        let results = self
            .executor()
            .with_progress(progress)
            .execute(clusters, spec, cancel)
            .await;
        spinner.finish();
        results
    }

    fn namespace_scope(&self, namespace: &NamespaceArgs) -> crate::kubernetes::NamespaceScope {
        let ambient = self.clients.default_namespace(None);
        resolve_namespace(
            namespace.all_namespaces,
            namespace.namespace.as_deref(),
            ambient.as_deref(),
        )
    }
}

/// Dispatch a parsed command line
pub async fn run(args: Args, cancel: CancellationToken) -> Result<()> {
    let mut app = App::new(&args)?;

    match args.command {
        Command::Get {
            resource,
            name,
            namespace,
            filter,
            output: format,
            no_headers,
            show_errors,
        } => {
            let clusters = app.selected_clusters(&filter).await?;
            let spec = QuerySpec::list(&resource, name.as_deref(), app.namespace_scope(&namespace));
            let results = app.run_round(&clusters, &spec, &cancel).await;

            let options = ListOptions {
                format: OutputFormatKind::from(&format),
                no_headers,
                now: chrono::Utc::now(),
            };
            print!("{}", output::render_list(&results, layout_for(&resource), &options));
            finish_round(&results, show_errors)
        }
        Command::Describe {
            resource,
            name,
            namespace,
            filter,
            show_errors,
        } => {
            let clusters = app.selected_clusters(&filter).await?;
            let spec = QuerySpec::describe(&resource, &name, app.namespace_scope(&namespace));
            let results = app.run_round(&clusters, &spec, &cancel).await;

            match output::render_narratives(&results) {
                Ok(text) => {
                    print!("{}", text);
                    finish_round(&results, show_errors)
                }
                Err(e) => {
                    eprint!("{}", output::failure_report(&results.summary, true));
                    Err(e)
                }
            }
        }
        Command::Clusters { name, filter } => {
            let clusters = match name {
                Some(name) => vec![app.directory().await?.get_cluster(&name).await?],
                None => app.selected_clusters(&filter).await?,
            };
            if clusters.is_empty() {
                println!("No clusters found");
                return Ok(());
            }
            println!("{}", clusters_table(&clusters, app.mappings.list_mappings()));
            Ok(())
        }
        Command::Setup => {
            let hub = app.hub_context()?;
            let clusters = app
                .directory()
                .await?
                .list_clusters()
                .await
                .context("Failed to discover clusters")?;
            let mut prompter = setup::RustylinePrompter::new()?;
            let mut stdout = std::io::stdout();
            setup::run_setup(&clusters, &mut app.mappings, &hub, &mut prompter, &mut stdout)
        }
    }
}

/// Layout for a resource token; unknown tokens fail per cluster and never reach a table
fn layout_for(resource: &str) -> TableLayout {
    match registry().get(resource) {
        Some(r) => r.layout,
        None => {
            warn!(resource, known = ?registry().names(), "Unknown resource type");
            TableLayout::Generic
        }
    }
}

/// Decide the command outcome of a list round
///
/// Only a round where every cluster failed is an error. Partial failures are
/// logged and printed on request.
fn finish_round(results: &AggregatedResults, show_errors: bool) -> Result<()> {
    let summary = &results.summary;
    if results.all_failed() {
        eprint!("{}", output::failure_report(summary, true));
        bail!("all clusters failed");
    }

    if summary.failed > 0 {
        warn!(
            failed = summary.failed,
            total = summary.total,
            "Partial results: some clusters failed"
        );
        if show_errors {
            eprint!("{}", output::failure_report(summary, false));
        }
    }
    Ok(())
}

/// Directory snapshot as a table with each cluster's mapped context
pub fn clusters_table(clusters: &[ClusterInfo], mappings: &[ClusterMapping]) -> String {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL_CONDENSED);
    table.set_content_arrangement(ContentArrangement::Dynamic);

    let header: Vec<Cell> = ["NAME", "DISPLAY NAME", "VERSION", "HEALTHY", "CONTEXT"]
        .iter()
        .map(|h| Cell::new(h).fg(Color::Yellow))
        .collect();
    table.set_header(header);

    for cluster in clusters {
        let healthy = if cluster.healthy {
            Cell::new("true").fg(Color::Green)
        } else {
            Cell::new("false").fg(Color::Red)
        };
        let context = mappings
            .iter()
            .find(|m| m.name == cluster.name)
            .map(|m| m.context.clone())
            .unwrap_or_else(|| style("<unmapped>").dim().to_string());
        table.add_row(vec![
            Cell::new(&cluster.name),
            Cell::new(&cluster.display_name),
            Cell::new(cluster.kubernetes_version.as_deref().unwrap_or("<none>")),
            healthy,
            Cell::new(context),
        ]);
    }

    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ClusterError, QueryError};
    use crate::executor::{ClusterPayload, ClusterResult};

    fn round(results: Vec<ClusterResult>) -> AggregatedResults {
        let mut agg = AggregatedResults::new(results.len());
        for r in results {
            agg.add_result(r);
        }
        agg
    }

    fn ok(cluster: &str) -> ClusterResult {
        ClusterResult::new(cluster, Ok(ClusterPayload::default()))
    }

    #[test]
    fn test_partial_failure_succeeds() {
        let results = round(vec![
            ok("c1"),
            ok("c2"),
            ClusterResult::failed("c3", QueryError::api("refused")),
        ]);
        assert!(finish_round(&results, false).is_ok());
        assert!(finish_round(&results, true).is_ok());
    }

    #[test]
    fn test_all_failed_is_error() {
        let results = round(vec![
            ClusterResult::failed("c1", ClusterError::unmapped("c1")),
            ClusterResult::failed("c2", QueryError::Cancelled),
            ClusterResult::failed("c3", QueryError::api("refused")),
        ]);
        let err = finish_round(&results, false).unwrap_err();
        assert_eq!(err.to_string(), "all clusters failed");
    }

    #[test]
    fn test_zero_clusters_is_success() {
        assert!(finish_round(&AggregatedResults::new(0), false).is_ok());
    }

    #[test]
    fn test_layout_for() {
        assert_eq!(layout_for("po"), TableLayout::Pods);
        assert_eq!(layout_for("deploy"), TableLayout::Deployments);
        assert_eq!(layout_for("svc"), TableLayout::Services);
        assert_eq!(layout_for("cm"), TableLayout::Generic);
        assert_eq!(layout_for("widgets"), TableLayout::Generic);
    }

    #[test]
    fn test_clusters_table() {
        let mut mapped = ClusterInfo::named("cluster1");
        mapped.kubernetes_version = Some("v1.30.0".to_string());
        let mut unmapped = ClusterInfo::named("cluster2");
        unmapped.healthy = false;

        let dir = tempfile::TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path().join("clusters.yaml")).unwrap();
        store.set_mapping("cluster1", "kind-cluster1", None).unwrap();

        let out = clusters_table(&[mapped, unmapped], store.list_mappings());
        assert!(out.contains("DISPLAY NAME"));
        assert!(out.contains("kind-cluster1"));
        assert!(out.contains("v1.30.0"));
        assert!(out.contains("<unmapped>"));
    }
}
