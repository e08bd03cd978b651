// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Aggregation and rendering of fan-out results

mod describe;
mod json;
pub mod table;
mod yaml;

pub use describe::render_narratives;
pub use json::JsonFormatter;
pub use yaml::YamlFormatter;

use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write;

use crate::cli::OutputFormat;
use crate::executor::{AggregatedResults, ResultSummary};
use crate::kubernetes::objects::ResourceObject;
use crate::kubernetes::resources::TableLayout;

pub const NO_RESOURCES: &str = "No resources found";

/// One object together with the cluster it came from
#[derive(Debug, Clone, Copy)]
pub struct ClusterItem<'a> {
    pub cluster: &'a str,
    pub object: &'a ResourceObject,
}

/// Machine-readable entry for JSON/YAML output
#[derive(Debug, Serialize)]
pub struct MachineEntry<'a> {
    pub cluster: &'a str,
    pub object: &'a Value,
}

impl<'a> From<&ClusterItem<'a>> for MachineEntry<'a> {
    fn from(item: &ClusterItem<'a>) -> Self {
        Self {
            cluster: item.cluster,
            object: &item.object.raw,
        }
    }
}

/// Flatten successful clusters' items, sorted by (cluster, namespace, name)
pub fn collect_items(results: &AggregatedResults) -> Vec<ClusterItem<'_>> {
    let mut items: Vec<ClusterItem<'_>> = results
        .results
        .iter()
        .filter(|r| r.success())
        .flat_map(|r| {
            r.items().iter().map(|object| ClusterItem {
                cluster: &r.cluster_name,
                object,
            })
        })
        .collect();

    items.sort_by(|a, b| {
        (a.cluster, a.object.namespace(), a.object.name()).cmp(&(
            b.cluster,
            b.object.namespace(),
            b.object.name(),
        ))
    });
    items
}

#[derive(Debug, Clone, Copy)]
pub struct ListOptions {
    pub format: OutputFormatKind,
    pub no_headers: bool,
    pub now: DateTime<Utc>,
}

/// Output format without the clap derive, so rendering can be tested alone
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormatKind {
    Table,
    Json,
    Yaml,
}

impl From<&OutputFormat> for OutputFormatKind {
    fn from(format: &OutputFormat) -> Self {
        match format {
            OutputFormat::Table => Self::Table,
            OutputFormat::Json => Self::Json,
            OutputFormat::Yaml => Self::Yaml,
        }
    }
}

/// Render a list round; an empty combined list prints the "no resources" notice
pub fn render_list(results: &AggregatedResults, layout: TableLayout, options: &ListOptions) -> String {
    let items = collect_items(results);

    match options.format {
        OutputFormatKind::Json => format!("{}\n", JsonFormatter::format(&items)),
        OutputFormatKind::Yaml => {
            let mut yaml = YamlFormatter::format(&items);
            if !yaml.ends_with('\n') {
                yaml.push('\n');
            }
            yaml
        }
        OutputFormatKind::Table => {
            if items.is_empty() {
                return format!("{}\n", NO_RESOURCES);
            }
            let rows: Vec<Vec<String>> = items
                .iter()
                .map(|item| table::row(layout, item, options.now))
                .collect();
            table::render(table::headers(layout), &rows, options.no_headers)
        }
    }
}

/// Enumerate every failed cluster, for stderr
pub fn failure_report(summary: &ResultSummary, all_failed: bool) -> String {
    let mut out = String::new();
    if all_failed {
        let _ = writeln!(out, "\nError: Failed to query all {} clusters", summary.total);
    } else {
        let _ = writeln!(
            out,
            "\nWarning: {} of {} clusters failed",
            summary.failed, summary.total
        );
    }
    for (cluster, err) in &summary.errors {
        let _ = writeln!(out, "  - {}: {}", cluster, err);
    }
    out
}
