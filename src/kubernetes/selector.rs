// Copyright (c) 2025 Nikolay Denev <ndenev@gmail.com>
// SPDX-License-Identifier: BSD-3-Clause

//! Cluster selection by name patterns
//!
//! Filters a directory snapshot with include/exclude pattern sets. Patterns are
//! exact names or shell globs (`*`, `?`, `[...]`) matched against the cluster
//! name only.

use glob::Pattern;
use tracing::debug;

use super::directory::ClusterInfo;

/// Include/exclude filter over cluster names
///
/// A cluster is dropped if it matches any exclude pattern. Otherwise it is kept
/// when the include set is empty or it matches any include pattern.
#[derive(Debug, Clone, Default)]
pub struct ClusterSelector {
    include: Vec<String>,
    exclude: Vec<String>,
}

impl ClusterSelector {
    pub fn new(include: &[String], exclude: &[String]) -> Self {
        Self {
            include: normalize(include),
            exclude: normalize(exclude),
        }
    }

    /// Apply the filter, preserving the input order
    pub fn select(&self, all: &[ClusterInfo]) -> Vec<ClusterInfo> {
        if self.include.is_empty() && self.exclude.is_empty() {
            return all.to_vec();
        }

        let selected: Vec<ClusterInfo> = all
            .iter()
            .filter(|c| self.matches(&c.name))
            .cloned()
            .collect();

        debug!(
            total = all.len(),
            selected = selected.len(),
            include = ?self.include,
            exclude = ?self.exclude,
            "Applied cluster selection"
        );
        selected
    }

    /// Whether a single cluster name passes the filter
    pub fn matches(&self, name: &str) -> bool {
        if matches_any(name, &self.exclude) {
            return false;
        }
        self.include.is_empty() || matches_any(name, &self.include)
    }
}

/// Free-function form of [`ClusterSelector::select`]
pub fn select(all: &[ClusterInfo], include: &[String], exclude: &[String]) -> Vec<ClusterInfo> {
    ClusterSelector::new(include, exclude).select(all)
}

/// Split comma-separated entries and drop blanks
fn normalize(patterns: &[String]) -> Vec<String> {
    patterns
        .iter()
        .flat_map(|p| p.split(','))
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(String::from)
        .collect()
}

/// Exact match first, then glob. An invalid glob never matches.
fn matches_any(name: &str, patterns: &[String]) -> bool {
    patterns.iter().any(|pattern| {
        if pattern == name {
            return true;
        }
        match Pattern::new(pattern) {
            Ok(glob) => glob.matches(name),
            Err(e) => {
                debug!(pattern = %pattern, error = %e, "Ignoring malformed cluster pattern");
                false
            }
        }
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn clusters(names: &[&str]) -> Vec<ClusterInfo> {
        names.iter().map(|n| ClusterInfo::named(n)).collect()
    }

    fn names(clusters: &[ClusterInfo]) -> Vec<&str> {
        clusters.iter().map(|c| c.name.as_str()).collect()
    }

    fn s(v: &[&str]) -> Vec<String> {
        v.iter().map(|x| x.to_string()).collect()
    }

    fn test_clusters() -> Vec<ClusterInfo> {
        clusters(&["prod-us-west-1", "prod-eu-west-2", "staging-01", "staging-02", "dev"])
    }

    #[test]
    fn test_identity_without_patterns() {
        let all = test_clusters();
        assert_eq!(select(&all, &[], &[]), all);
    }

    #[test]
    fn test_include_glob() {
        let all = test_clusters();
        let result = select(&all, &s(&["prod-*"]), &[]);
        assert_eq!(names(&result), vec!["prod-us-west-1", "prod-eu-west-2"]);
    }

    #[test]
    fn test_question_mark_and_class() {
        let all = test_clusters();
        let result = select(&all, &s(&["prod-??-west-?"]), &[]);
        assert_eq!(names(&result), vec!["prod-us-west-1", "prod-eu-west-2"]);

        let result = select(&all, &s(&["staging-0[2-9]"]), &[]);
        assert_eq!(names(&result), vec!["staging-02"]);
    }

    #[test]
    fn test_exact_match_only_identical() {
        let all = test_clusters();
        let result = select(&all, &s(&["dev"]), &[]);
        assert_eq!(names(&result), vec!["dev"]);

        let result = select(&all, &s(&["staging"]), &[]);
        assert!(result.is_empty());
    }

    #[test]
    fn test_exclude_wins_over_include() {
        let all = test_clusters();
        let result = select(&all, &s(&["prod-*", "dev"]), &s(&["prod-eu-*"]));
        assert_eq!(names(&result), vec!["prod-us-west-1", "dev"]);
    }

    #[test]
    fn test_exclude_only() {
        let all = test_clusters();
        let result = select(&all, &[], &s(&["*-0?"]));
        assert_eq!(names(&result), vec!["prod-us-west-1", "prod-eu-west-2", "dev"]);
    }

    #[test]
    fn test_comma_separated_entries() {
        let all = test_clusters();
        let result = select(&all, &s(&[" dev , staging-01 "]), &[]);
        assert_eq!(names(&result), vec!["staging-01", "dev"]);
    }

    #[test]
    fn test_malformed_pattern_is_non_match() {
        let all = test_clusters();
        let result = select(&all, &s(&["prod-[us"]), &[]);
        assert!(result.is_empty());

        // A malformed exclude pattern excludes nothing
        let result = select(&all, &[], &s(&["[dev"]));
        assert_eq!(result.len(), all.len());
    }

    #[test]
    fn test_exact_match_of_glob_like_name() {
        let all = clusters(&["odd[name"]);
        let result = select(&all, &s(&["odd[name"]), &[]);
        assert_eq!(names(&result), vec!["odd[name"]);
    }

    #[test]
    fn test_idempotent() {
        let all = test_clusters();
        let inc = s(&["prod-*", "staging-*"]);
        let exc = s(&["*-02"]);
        let once = select(&all, &inc, &exc);
        let twice = select(&once, &inc, &exc);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_matches_name_not_display_name() {
        let mut cluster = ClusterInfo::named("c-123");
        cluster.display_name = "prod-east".to_string();
        let result = select(&[cluster], &s(&["prod-*"]), &[]);
        assert!(result.is_empty());
    }
}
