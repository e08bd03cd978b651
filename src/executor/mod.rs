// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod fanout;
mod types;

pub use fanout::FanOutExecutor;
pub use types::{
    AggregatedResults, ClusterPayload, ClusterResult, ExecutorConfig, QuerySpec, ResultSummary,
};
