// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use super::{ClusterItem, MachineEntry};

pub struct JsonFormatter;

impl JsonFormatter {
    pub fn format(items: &[ClusterItem<'_>]) -> String {
        let entries: Vec<MachineEntry<'_>> = items.iter().map(MachineEntry::from).collect();
        serde_json::to_string_pretty(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}
