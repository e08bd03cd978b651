// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Per-cluster narrative output for describe queries

use anyhow::{Result, bail};
use std::fmt::Write;

use crate::executor::AggregatedResults;

const RULE_WIDTH: usize = 80;

/// Render successful narratives sorted by cluster name
///
/// Failed clusters and clusters with empty output are left out. Fails only when
/// nothing was printed and every cluster failed.
pub fn render_narratives(results: &AggregatedResults) -> Result<String> {
    let mut sorted: Vec<_> = results
        .results
        .iter()
        .filter(|r| r.success() && !r.narrative().is_empty())
        .collect();
    sorted.sort_by(|a, b| a.cluster_name.cmp(&b.cluster_name));

    let mut out = String::new();
    for (i, result) in sorted.iter().enumerate() {
        if i > 0 {
            let _ = writeln!(out, "\n{}", "=".repeat(RULE_WIDTH));
        }
        out.push('\n');
        let _ = writeln!(out, "CLUSTER: {}", result.cluster_name);
        let _ = writeln!(out, "{}", "-".repeat(RULE_WIDTH));
        out.push_str(result.narrative());
    }

    if sorted.is_empty() {
        let summary = &results.summary;
        if summary.total > 0 && summary.failed == summary.total {
            bail!("failed to describe resource in all {} clusters", summary.total);
        }
        out.push_str("No resources found\n");
    }
    Ok(out)
}
