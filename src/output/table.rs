// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Fixed-width tables for list results
//!
//! Each column is as wide as its longest cell or header plus two spaces, and
//! columns are joined by one more space. The trailing AGE column is not padded.

use chrono::{DateTime, Utc};
use std::fmt::Write;

use super::ClusterItem;
use crate::kubernetes::objects::ObjectBody;
use crate::kubernetes::resources::TableLayout;

/// Placeholder for missing values
pub const NONE_VALUE: &str = "<none>";

/// Column padding added to every computed width
const PADDING: usize = 2;

/// Headers for a layout; the last one is the unpadded AGE column
pub fn headers(layout: TableLayout) -> &'static [&'static str] {
    match layout {
        TableLayout::Pods => &["NAMESPACE", "NAME", "CLUSTER", "READY", "STATUS", "RESTARTS", "AGE"],
        TableLayout::Deployments => &["NAMESPACE", "NAME", "CLUSTER", "READY", "UP-TO-DATE", "AVAILABLE", "AGE"],
        TableLayout::Services => &[
            "NAMESPACE",
            "NAME",
            "CLUSTER",
            "TYPE",
            "CLUSTER-IP",
            "EXTERNAL-IP",
            "PORT(S)",
            "AGE",
        ],
        TableLayout::Generic => &["NAMESPACE", "NAME", "CLUSTER", "KIND", "AGE"],
    }
}

/// Cells of one row, in header order
pub fn row(layout: TableLayout, item: &ClusterItem<'_>, now: DateTime<Utc>) -> Vec<String> {
    let obj = item.object;
    let age = format_age(obj.creation_timestamp(), now);
    let namespace = obj.namespace().to_string();
    let name = obj.name().to_string();
    let cluster = item.cluster.to_string();

    match (layout, &obj.body) {
        (TableLayout::Pods, ObjectBody::Pod(pod)) => vec![
            namespace,
            name,
            cluster,
            format!("{}/{}", pod.ready_containers, pod.total_containers),
            pod.phase.clone(),
            pod.restarts.to_string(),
            age,
        ],
        (TableLayout::Pods, _) => vec![namespace, name, cluster, "0/0".into(), String::new(), "0".into(), age],
        (TableLayout::Deployments, ObjectBody::Deployment(d)) => vec![
            namespace,
            name,
            cluster,
            format!("{}/{}", d.ready, d.desired),
            d.up_to_date.to_string(),
            d.available.to_string(),
            age,
        ],
        (TableLayout::Deployments, _) => {
            vec![namespace, name, cluster, "0/0".into(), "0".into(), "0".into(), age]
        }
        (TableLayout::Services, ObjectBody::Service(s)) => vec![
            namespace,
            name,
            cluster,
            s.service_type.clone(),
            s.cluster_ip.clone(),
            join_or_none(&s.external_ips),
            join_or_none(&s.ports),
            age,
        ],
        (TableLayout::Services, _) => vec![
            namespace,
            name,
            cluster,
            String::new(),
            String::new(),
            NONE_VALUE.into(),
            NONE_VALUE.into(),
            age,
        ],
        (TableLayout::Generic, _) => vec![
            if namespace.is_empty() {
                NONE_VALUE.to_string()
            } else {
                namespace
            },
            name,
            cluster,
            obj.kind.clone(),
            age,
        ],
    }
}

/// Render headers and rows as a fixed-width table
pub fn render(headers: &[&str], rows: &[Vec<String>], no_headers: bool) -> String {
    let padded = headers.len().saturating_sub(1);
    let widths: Vec<usize> = (0..padded)
        .map(|col| {
            rows.iter()
                .map(|r| r.get(col).map_or(0, |c| c.chars().count()))
                .chain(std::iter::once(headers[col].chars().count()))
                .max()
                .unwrap_or(0)
                + PADDING
        })
        .collect();

    let mut out = String::new();
    let header_cells: Vec<String> = headers.iter().map(|h| h.to_string()).collect();
    let lines = (!no_headers)
        .then_some(&header_cells)
        .into_iter()
        .chain(rows.iter());

    for cells in lines {
        for (col, width) in widths.iter().enumerate() {
            let cell = cells.get(col).map(String::as_str).unwrap_or_default();
            let _ = write!(out, "{:<width$} ", cell, width = width);
        }
        if let Some(last) = cells.get(padded) {
            out.push_str(last);
        }
        out.push('\n');
    }
    out
}

/// Age of an object, or `<none>` when the timestamp is missing or unparseable
pub fn format_age(creation_timestamp: Option<&str>, now: DateTime<Utc>) -> String {
    let Some(ts) = creation_timestamp.filter(|ts| !ts.is_empty()) else {
        return NONE_VALUE.to_string();
    };
    match DateTime::parse_from_rfc3339(ts) {
        Ok(created) => format_duration(now.signed_duration_since(created.with_timezone(&Utc))),
        Err(_) => NONE_VALUE.to_string(),
    }
}

/// kubectl-style short duration: 45s, 5m, 2h, 3d
pub fn format_duration(d: chrono::Duration) -> String {
    let secs = d.num_seconds().max(0);
    if secs < 60 {
        format!("{}s", secs)
    } else if secs < 3600 {
        format!("{}m", secs / 60)
    } else if secs < 86400 {
        format!("{}h", secs / 3600)
    } else {
        format!("{}d", secs / 86400)
    }
}

fn join_or_none(values: &[String]) -> String {
    if values.is_empty() {
        NONE_VALUE.to_string()
    } else {
        values.join(",")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap()
    }

    fn ago(secs: i64) -> String {
        (now() - chrono::Duration::seconds(secs)).to_rfc3339()
    }

    #[test]
    fn test_age_units() {
        assert_eq!(format_age(Some(&ago(45)), now()), "45s");
        assert_eq!(format_age(Some(&ago(90)), now()), "1m");
        assert_eq!(format_age(Some(&ago(2 * 3600 + 59)), now()), "2h");
        assert_eq!(format_age(Some(&ago(25 * 3600)), now()), "1d");
    }

    #[test]
    fn test_age_placeholder() {
        assert_eq!(format_age(None, now()), "<none>");
        assert_eq!(format_age(Some(""), now()), "<none>");
        assert_eq!(format_age(Some("yesterday"), now()), "<none>");
    }

    #[test]
    fn test_age_in_future_clamps() {
        assert_eq!(format_age(Some(&ago(-30)), now()), "0s");
    }

    #[test]
    fn test_render_widths() {
        let rows = vec![
            vec!["default".to_string(), "a-very-long-name".to_string(), "5m".to_string()],
            vec!["kube-system".to_string(), "b".to_string(), "<none>".to_string()],
        ];
        let out = render(&["NAMESPACE", "NAME", "AGE"], &rows, false);
        let expected = "\
NAMESPACE     NAME               AGE
default       a-very-long-name   5m
kube-system   b                  <none>
";
        assert_eq!(out, expected);
    }

    #[test]
    fn test_render_no_headers() {
        let rows = vec![vec!["ns".to_string(), "x".to_string()]];
        assert_eq!(render(&["NAMESPACE", "AGE"], &rows, true), "ns          x\n");
    }
}
