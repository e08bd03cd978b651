// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Interactive mapping of discovered clusters to kubeconfig contexts

use anyhow::Result;
use console::style;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::io::Write;

use crate::kubernetes::{ClusterInfo, MappingStore};

/// Source of answers to setup questions
pub trait Prompter {
    /// Ask a question; `None` means the user ended input
    fn ask(&mut self, prompt: &str) -> Result<Option<String>>;
}

/// Line editor backed prompter
pub struct RustylinePrompter {
    editor: DefaultEditor,
}

impl RustylinePrompter {
    pub fn new() -> Result<Self> {
        Ok(Self {
            editor: DefaultEditor::new()?,
        })
    }
}

impl Prompter for RustylinePrompter {
    fn ask(&mut self, prompt: &str) -> Result<Option<String>> {
        match self.editor.readline(prompt) {
            Ok(line) => Ok(Some(line)),
            Err(ReadlineError::Interrupted | ReadlineError::Eof) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }
}

/// Context name suggested for a cluster
pub fn suggested_context(cluster: &str) -> String {
    format!("kind-{}", cluster)
}

/// Walk every discovered cluster and record its context in `store`
pub fn run_setup(
    clusters: &[ClusterInfo],
    store: &mut MappingStore,
    hub_context: &str,
    prompter: &mut impl Prompter,
    out: &mut impl Write,
) -> Result<()> {
    if clusters.is_empty() {
        writeln!(out, "No clusters discovered from hub")?;
        return Ok(());
    }

    if store.hub_context().is_none() {
        store.set_hub_context(hub_context)?;
    }

    writeln!(out, "Discovered {} cluster(s)\n", clusters.len())?;

    for cluster in clusters {
        let existing = store
            .list_mappings()
            .iter()
            .find(|m| m.name == cluster.name)
            .map(|m| m.context.clone());
        if let Some(existing) = existing {
            writeln!(
                out,
                "Cluster '{}' is already mapped to context '{}'",
                cluster.name, existing
            )?;
            let Some(answer) = prompter.ask("Update mapping? [y/N]: ")? else {
                break;
            };
            if !matches!(answer.trim().to_lowercase().as_str(), "y" | "yes") {
                continue;
            }
        }

        writeln!(
            out,
            "\nCluster: {} (namespace: {})",
            style(&cluster.display_name).cyan().bold(),
            cluster.namespace
        )?;
        if let Some(version) = &cluster.kubernetes_version {
            writeln!(out, "  Kubernetes version: {}", version)?;
        }
        writeln!(out, "  Healthy: {}", cluster.healthy)?;

        let suggested = suggested_context(&cluster.name);
        let Some(answer) = prompter.ask(&format!("Enter kubeconfig context name [{}]: ", suggested))?
        else {
            break;
        };
        let context = match answer.trim() {
            "" => suggested,
            other => other.to_string(),
        };

        let namespace = Some(cluster.namespace.as_str()).filter(|ns| !ns.is_empty());
        if let Err(e) = store.set_mapping(&cluster.name, &context, namespace) {
            eprintln!(
                "{} Failed to save mapping for {}: {}",
                style("Warning:").yellow().bold(),
                cluster.name,
                e
            );
            continue;
        }
        writeln!(
            out,
            "{} Mapped '{}' to context '{}'",
            style("✓").green(),
            cluster.name,
            context
        )?;
    }

    writeln!(out, "\nSetup complete!")?;
    writeln!(out, "Mappings saved to: {}", store.path().display())?;
    writeln!(out, "\nYou can now use: kubectl mc get pods")?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::kubernetes::ContextResolver;
    use std::collections::VecDeque;
    use tempfile::TempDir;

    struct Scripted(VecDeque<&'static str>);

    impl Prompter for Scripted {
        fn ask(&mut self, _prompt: &str) -> Result<Option<String>> {
            Ok(self.0.pop_front().map(String::from))
        }
    }

    fn cluster(name: &str) -> ClusterInfo {
        let mut c = ClusterInfo::named(name);
        c.namespace = "open-cluster-management".to_string();
        c
    }

    #[test]
    fn test_suggestion_and_explicit_answer() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path().join("clusters.yaml")).unwrap();
        let mut prompter = Scripted(VecDeque::from(["", "my-context"]));
        let mut out = Vec::new();

        run_setup(
            &[cluster("cluster1"), cluster("cluster2")],
            &mut store,
            "hub",
            &mut prompter,
            &mut out,
        )
        .unwrap();

        assert_eq!(store.resolve("cluster1").unwrap().context, "kind-cluster1");
        assert_eq!(store.resolve("cluster2").unwrap().context, "my-context");
        assert_eq!(
            store.resolve("cluster1").unwrap().namespace.as_deref(),
            Some("open-cluster-management")
        );
        assert_eq!(store.hub_context(), Some("hub"));
        let text = String::from_utf8(out).unwrap();
        assert!(text.contains("Discovered 2 cluster(s)"));
        assert!(text.contains("Setup complete!"));
    }

    #[test]
    fn test_existing_mapping_kept_unless_confirmed() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path().join("clusters.yaml")).unwrap();
        store.set_mapping("cluster1", "old", None).unwrap();
        store.set_mapping("cluster2", "old", None).unwrap();

        let mut prompter = Scripted(VecDeque::from(["n", "yes", "new"]));
        let mut out = Vec::new();
        run_setup(
            &[cluster("cluster1"), cluster("cluster2")],
            &mut store,
            "hub",
            &mut prompter,
            &mut out,
        )
        .unwrap();

        assert_eq!(store.resolve("cluster1").unwrap().context, "old");
        assert_eq!(store.resolve("cluster2").unwrap().context, "new");
    }

    #[test]
    fn test_end_of_input_stops() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path().join("clusters.yaml")).unwrap();
        let mut prompter = Scripted(VecDeque::new());
        let mut out = Vec::new();
        run_setup(&[cluster("cluster1")], &mut store, "hub", &mut prompter, &mut out).unwrap();
        assert!(store.list_mappings().is_empty());
    }

    #[test]
    fn test_no_clusters() {
        let dir = TempDir::new().unwrap();
        let mut store = MappingStore::open(dir.path().join("clusters.yaml")).unwrap();
        let mut out = Vec::new();
        run_setup(&[], &mut store, "hub", &mut Scripted(VecDeque::new()), &mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "No clusters discovered from hub\n");
        assert!(!store.path().exists());
    }
}
