// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Progress reporting for fan-out rounds
//!
//! The executor publishes round events on a broadcast channel; the CLI turns
//! them into a spinner on stderr.

use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use tokio::sync::broadcast;
use tokio::task::JoinHandle;
use tracing::trace;

/// Create a spinner with consistent styling
pub fn create_spinner(msg: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner()
        .tick_chars("⠋⠙⠹⠸⠼⠴⠦⠧⠇⠏")
        .template("{spinner:.cyan} {msg} {elapsed:.dim}")
    {
        pb.set_style(style);
    }
    pb.set_message(msg.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(80));
    pb
}

/// Progress update message
#[derive(Clone, Debug)]
pub enum ProgressUpdate {
    /// A round of per-cluster queries started
    RoundStarted { resource: String, total: usize },
    /// One cluster reported its outcome
    ClusterComplete {
        cluster: String,
        success: bool,
        elapsed_ms: u64,
    },
}

/// Progress reporter shared by the executor and the CLI
pub struct ProgressReporter {
    sender: broadcast::Sender<ProgressUpdate>,
    clusters_done: AtomicUsize,
    clusters_total: AtomicUsize,
}

impl ProgressReporter {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(100);
        Self {
            sender,
            clusters_done: AtomicUsize::new(0),
            clusters_total: AtomicUsize::new(0),
        }
    }

    /// Subscribe to progress updates
    pub fn subscribe(&self) -> broadcast::Receiver<ProgressUpdate> {
        self.sender.subscribe()
    }

    /// Report round start
    pub fn start_round(&self, resource: &str, total: usize) {
        self.clusters_done.store(0, Ordering::SeqCst);
        self.clusters_total.store(total, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::RoundStarted {
            resource: resource.to_string(),
            total,
        });
    }

    /// Report one cluster outcome
    pub fn cluster_complete(&self, cluster: &str, success: bool, elapsed_ms: u64) {
        self.clusters_done.fetch_add(1, Ordering::SeqCst);
        let _ = self.sender.send(ProgressUpdate::ClusterComplete {
            cluster: cluster.to_string(),
            success,
            elapsed_ms,
        });
    }

    /// Get current progress (done/total)
    pub fn progress(&self) -> (usize, usize) {
        (
            self.clusters_done.load(Ordering::SeqCst),
            self.clusters_total.load(Ordering::SeqCst),
        )
    }
}

impl Default for ProgressReporter {
    fn default() -> Self {
        Self::new()
    }
}

/// Thread-safe handle to progress reporter
pub type ProgressHandle = Arc<ProgressReporter>;

/// Create a new progress reporter handle
pub fn create_progress_handle() -> ProgressHandle {
    Arc::new(ProgressReporter::new())
}

/// Show a spinner that follows round progress until the returned guard is finished
pub struct SpinnerGuard {
    spinner: ProgressBar,
    task: JoinHandle<()>,
}

impl SpinnerGuard {
    pub fn start(handle: &ProgressHandle, msg: &str) -> Self {
        let spinner = create_spinner(msg);
        let mut rx = handle.subscribe();
        let reporter = Arc::clone(handle);
        let pb = spinner.clone();
        let base = msg.to_string();

        let task = tokio::spawn(async move {
            loop {
                match rx.recv().await {
                    Ok(ProgressUpdate::RoundStarted { resource, total }) => {
                        pb.set_message(format!("{} {} 0/{}", base, resource, total));
                    }
                    Ok(ProgressUpdate::ClusterComplete {
                        cluster,
                        success,
                        elapsed_ms,
                    }) => {
                        trace!(cluster = %cluster, success, elapsed_ms, "Cluster reported");
                        let (done, total) = reporter.progress();
                        pb.set_message(format!("{} {}/{} (last: {})", base, done, total, cluster));
                    }
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        });

        Self { spinner, task }
    }

    pub fn finish(self) {
        self.task.abort();
        self.spinner.finish_and_clear();
    }
}
