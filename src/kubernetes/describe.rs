// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Narrative rendering of single objects, in the style of `kubectl describe`

use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt::Write;

use super::objects::{ObjectBody, ResourceObject};

/// Width of the label column
const LABEL_WIDTH: usize = 14;

/// Render several objects, separated by a blank line
pub fn render_all(objects: &[ResourceObject]) -> String {
    objects
        .iter()
        .map(render)
        .collect::<Vec<_>>()
        .join("\n")
}

/// Render one object
pub fn render(obj: &ResourceObject) -> String {
    let mut out = String::new();

    field(&mut out, "Name:", obj.name());
    if !obj.namespace().is_empty() {
        field(&mut out, "Namespace:", obj.namespace());
    }
    field(&mut out, "Kind:", &obj.kind);
    map_field(&mut out, "Labels:", &obj.metadata.labels);
    map_field(&mut out, "Annotations:", &obj.metadata.annotations);
    field(&mut out, "Created:", obj.creation_timestamp().unwrap_or("<unknown>"));

    match &obj.body {
        ObjectBody::Pod(pod) => {
            field(&mut out, "Status:", &pod.phase);
            field(&mut out, "Node:", pod.node_name.as_deref().unwrap_or("<none>"));
            field(&mut out, "IP:", pod.pod_ip.as_deref().unwrap_or("<none>"));
            if !pod.containers.is_empty() {
                out.push_str("Containers:\n");
                for (name, image, ready, restarts) in &pod.containers {
                    let _ = writeln!(out, "  {}:", name);
                    let _ = writeln!(out, "    {:<LABEL_WIDTH$}{}", "Image:", image);
                    let _ = writeln!(out, "    {:<LABEL_WIDTH$}{}", "Ready:", ready);
                    let _ = writeln!(out, "    {:<LABEL_WIDTH$}{}", "Restarts:", restarts);
                }
            }
        }
        ObjectBody::Deployment(d) => {
            field(
                &mut out,
                "Replicas:",
                &format!(
                    "{} desired | {} updated | {} ready | {} available",
                    d.desired, d.up_to_date, d.ready, d.available
                ),
            );
        }
        ObjectBody::Service(s) => {
            field(&mut out, "Type:", &s.service_type);
            field(&mut out, "IP:", &s.cluster_ip);
            let ports = if s.ports.is_empty() {
                "<none>".to_string()
            } else {
                s.ports.join(",")
            };
            field(&mut out, "Ports:", &ports);
        }
        ObjectBody::Generic => {}
    }

    yaml_block(&mut out, "Spec:", obj.raw.get("spec"));
    yaml_block(&mut out, "Status:", obj.raw.get("status"));
    out
}

fn field(out: &mut String, label: &str, value: &str) {
    let _ = writeln!(out, "{:<LABEL_WIDTH$}{}", label, value);
}

fn map_field(out: &mut String, label: &str, map: &BTreeMap<String, String>) {
    if map.is_empty() {
        field(out, label, "<none>");
        return;
    }
    for (i, (k, v)) in map.iter().enumerate() {
        let label = if i == 0 { label } else { "" };
        field(out, label, &format!("{}={}", k, v));
    }
}

fn yaml_block(out: &mut String, label: &str, value: Option<&Value>) {
    let Some(value) = value.filter(|v| !v.is_null()) else {
        return;
    };
    let Ok(yaml) = serde_yaml::to_string(value) else {
        return;
    };
    out.push_str(label);
    out.push('\n');
    for line in yaml.lines() {
        let _ = writeln!(out, "  {}", line);
    }
}
