// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use clap::{Args as ClapArgs, Parser, Subcommand, ValueEnum};
use std::path::PathBuf;

use crate::config::Overrides;

#[derive(Parser, Debug)]
#[command(name = "kubectl-mc")]
#[command(author, version, about = "Run read-only kubectl queries across all clusters on a multicluster hub")]
pub struct Args {
    #[command(subcommand)]
    pub command: Command,

    /// kubeconfig file to use instead of KUBECONFIG or ~/.kube/config
    #[arg(long, global = true, value_name = "PATH")]
    pub kubeconfig: Option<PathBuf>,

    /// kubeconfig context of the hub cluster (default: mapping file, then current context)
    #[arg(long, global = true, value_name = "CONTEXT")]
    pub hub_context: Option<String>,

    /// Namespace holding ClusterProfile objects on the hub
    #[arg(long, global = true, value_name = "NAMESPACE")]
    pub hub_namespace: Option<String>,

    /// Cluster mapping file (default: ~/.kube/kubectl-mc-clusters.yaml)
    #[arg(long, global = true, value_name = "PATH")]
    pub mapping_file: Option<PathBuf>,

    /// Maximum number of clusters queried at the same time
    #[arg(long, global = true, value_parser = clap::value_parser!(u64).range(1..))]
    pub max_concurrency: Option<u64>,

    /// Per-cluster timeout in seconds
    #[arg(long, global = true, value_name = "SECONDS", value_parser = clap::value_parser!(u64).range(1..))]
    pub timeout: Option<u64>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

impl Args {
    /// Command-line values that override the config file
    pub fn overrides(&self) -> Overrides {
        Overrides {
            hub_context: self.hub_context.clone(),
            hub_namespace: self.hub_namespace.clone(),
            mapping_file: self.mapping_file.clone(),
            max_concurrency: self.max_concurrency.map(|n| n as usize),
            timeout_seconds: self.timeout,
        }
    }
}

/// Which clusters to target
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct ClusterFilter {
    /// Only these clusters (comma-separated names or glob patterns)
    #[arg(long, value_delimiter = ',', value_name = "PATTERNS")]
    pub clusters: Vec<String>,

    /// Skip these clusters (comma-separated names or glob patterns)
    #[arg(long, value_delimiter = ',', value_name = "PATTERNS")]
    pub exclude: Vec<String>,
}

/// Namespace scope of a query
#[derive(ClapArgs, Debug, Clone, Default)]
pub struct NamespaceArgs {
    /// Namespace to query
    #[arg(short, long, conflicts_with = "all_namespaces")]
    pub namespace: Option<String>,

    /// Query all namespaces
    #[arg(short = 'A', long)]
    pub all_namespaces: bool,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List resources across clusters
    Get {
        /// Resource type (e.g. pods, deploy, svc)
        resource: String,

        /// Object name; glob patterns such as 'nginx-*' are allowed
        name: Option<String>,

        #[command(flatten)]
        namespace: NamespaceArgs,

        #[command(flatten)]
        filter: ClusterFilter,

        /// Output format
        #[arg(short, long, value_enum, default_value = "table")]
        output: OutputFormat,

        /// Omit column headers in table output
        #[arg(long)]
        no_headers: bool,

        /// Print per-cluster failures even when some clusters succeed
        #[arg(long)]
        show_errors: bool,
    },

    /// Show details of a resource across clusters
    Describe {
        /// Resource type (e.g. pod, deployment)
        resource: String,

        /// Object name
        name: String,

        #[command(flatten)]
        namespace: NamespaceArgs,

        #[command(flatten)]
        filter: ClusterFilter,

        /// Print per-cluster failures even when some clusters succeed
        #[arg(long)]
        show_errors: bool,
    },

    /// List clusters registered on the hub
    Clusters {
        /// Show a single cluster by name
        name: Option<String>,

        #[command(flatten)]
        filter: ClusterFilter,
    },

    /// Map discovered clusters to kubeconfig contexts
    Setup,
}

#[derive(ValueEnum, Clone, Debug, Default, PartialEq, Eq)]
pub enum OutputFormat {
    #[default]
    Table,
    Json,
    Yaml,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(argv: &[&str]) -> Args {
        Args::try_parse_from(argv).unwrap()
    }

    #[test]
    fn test_global_kubeconfig() {
        let args = parse(&["kubectl-mc", "clusters", "--kubeconfig", "/tmp/hub.yaml"]);
        assert_eq!(args.kubeconfig, Some(PathBuf::from("/tmp/hub.yaml")));
        assert!(parse(&["kubectl-mc", "setup"]).kubeconfig.is_none());
    }

    #[test]
    fn test_get_with_filters() {
        let args = parse(&[
            "kubectl-mc",
            "get",
            "pods",
            "-n",
            "web",
            "--clusters",
            "prod-*,dev",
            "--exclude=prod-eu-*",
            "-o",
            "json",
        ]);
        let Command::Get {
            resource,
            name,
            namespace,
            filter,
            output,
            ..
        } = args.command
        else {
            panic!("expected get");
        };
        assert_eq!(resource, "pods");
        assert_eq!(name, None);
        assert_eq!(namespace.namespace.as_deref(), Some("web"));
        assert_eq!(filter.clusters, vec!["prod-*", "dev"]);
        assert_eq!(filter.exclude, vec!["prod-eu-*"]);
        assert_eq!(output, OutputFormat::Json);
    }

    #[test]
    fn test_all_namespaces_conflicts_with_namespace() {
        assert!(Args::try_parse_from(["kubectl-mc", "get", "pods", "-A", "-n", "x"]).is_err());
        let args = parse(&["kubectl-mc", "get", "pods", "-A"]);
        let Command::Get { namespace, .. } = args.command else {
            panic!("expected get");
        };
        assert!(namespace.all_namespaces);
    }

    #[test]
    fn test_describe_requires_name() {
        assert!(Args::try_parse_from(["kubectl-mc", "describe", "pod"]).is_err());
        let args = parse(&["kubectl-mc", "describe", "pod", "nginx"]);
        assert!(matches!(args.command, Command::Describe { .. }));
    }

    #[test]
    fn test_global_flags() {
        let args = parse(&[
            "kubectl-mc",
            "get",
            "svc",
            "--hub-context",
            "hub",
            "--max-concurrency",
            "4",
            "--timeout",
            "5",
            "-v",
        ]);
        let overrides = args.overrides();
        assert_eq!(overrides.hub_context.as_deref(), Some("hub"));
        assert_eq!(overrides.max_concurrency, Some(4));
        assert_eq!(overrides.timeout_seconds, Some(5));
        assert!(args.verbose);
    }

    #[test]
    fn test_clusters_optional_name() {
        let args = parse(&["kubectl-mc", "clusters", "cluster1"]);
        let Command::Clusters { name, filter } = args.command else {
            panic!("expected clusters");
        };
        assert_eq!(name.as_deref(), Some("cluster1"));
        assert!(filter.clusters.is_empty());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Args::try_parse_from(["kubectl-mc", "get", "pods", "--max-concurrency", "0"]).is_err());
    }
}
