// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

use super::{ClusterItem, MachineEntry};

pub struct YamlFormatter;

impl YamlFormatter {
    pub fn format(items: &[ClusterItem<'_>]) -> String {
        if items.is_empty() {
            return "[]".to_string();
        }
        let entries: Vec<MachineEntry<'_>> = items.iter().map(MachineEntry::from).collect();
        serde_yaml::to_string(&entries).unwrap_or_else(|_| "[]".to_string())
    }
}
