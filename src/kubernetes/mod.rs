// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

mod client;
pub mod describe;
pub mod directory;
pub mod mapping;
pub mod objects;
pub mod query;
pub mod resources;
pub mod selector;

pub use client::ClientFactory;
pub use directory::{ClusterDirectory, ClusterInfo, ClusterProfileDirectory};
pub use mapping::{ContextResolver, MappingStore};
pub use query::{KubeQueryExecutor, NamespaceScope};
