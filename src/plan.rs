//! Resolved Plan
//!
//! The merged set of operations for one target OS version. Built fresh by the
//! resolver, then handed to the validation harness or an applier.
//!
//! # Shape
//!
//! | Key          | Value |
//! |--------------|-------|
//! | `InstallRoot`  | directory → file → source tag (system volume) |
//! | `InstallUser`  | directory → file → source tag (data volume) |
//! | `RemoveRoot`   | directory → set of files |
//! | `RemoveUser`   | directory → set of files |
//! | `Processes`    | command → requires root |
//!
//! Sorted maps keep serialization byte-stable across runs.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Identifier of the historical OS build a payload file is copied from,
/// e.g. `11.7.10`, `12.5-23.4` or `WebDriver-387.10.10.10.40.140`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SourceTag(String);

impl SourceTag {
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for SourceTag {
    fn from(tag: &str) -> Self {
        Self(tag.to_string())
    }
}

impl From<String> for SourceTag {
    fn from(tag: String) -> Self {
        Self(tag)
    }
}

impl fmt::Display for SourceTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// directory → file → source tag
pub type InstallMap = BTreeMap<String, BTreeMap<String, SourceTag>>;
/// directory → files
pub type RemoveMap = BTreeMap<String, BTreeSet<String>>;

/// One install operation borrowed out of a plan.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InstallEntry<'a> {
    pub directory: &'a str,
    pub file: &'a str,
    pub tag: &'a SourceTag,
    /// Destined for the data volume instead of the system volume
    pub user: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResolvedPlan {
    #[serde(rename = "InstallRoot")]
    pub install_root: InstallMap,
    #[serde(rename = "InstallUser")]
    pub install_user: InstallMap,
    #[serde(rename = "RemoveRoot")]
    pub remove_root: RemoveMap,
    #[serde(rename = "RemoveUser")]
    pub remove_user: RemoveMap,
    #[serde(rename = "Processes")]
    pub processes: BTreeMap<String, bool>,
    /// Names of the groups merged into this plan, in merge order
    #[serde(skip)]
    pub applied_groups: Vec<String>,
}

impl ResolvedPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Merge `other` into `self`. On a collision `other` wins: the value for
    /// the same destination (or command) is overwritten.
    pub fn merge(&mut self, other: ResolvedPlan) {
        merge_install(&mut self.install_root, other.install_root);
        merge_install(&mut self.install_user, other.install_user);
        merge_remove(&mut self.remove_root, other.remove_root);
        merge_remove(&mut self.remove_user, other.remove_user);
        self.processes.extend(other.processes);
        self.applied_groups.extend(other.applied_groups);
    }

    pub fn is_empty(&self) -> bool {
        self.install_root.is_empty()
            && self.install_user.is_empty()
            && self.remove_root.is_empty()
            && self.remove_user.is_empty()
            && self.processes.is_empty()
    }

    /// Every install operation, system volume first.
    pub fn install_entries(&self) -> impl Iterator<Item = InstallEntry<'_>> {
        let root = flatten(&self.install_root, false);
        let user = flatten(&self.install_user, true);
        root.chain(user)
    }

    /// Source tag for a system-volume install, if planned
    pub fn root_tag(&self, directory: &str, file: &str) -> Option<&SourceTag> {
        self.install_root.get(directory)?.get(file)
    }

    /// Source tag for a data-volume install, if planned
    pub fn user_tag(&self, directory: &str, file: &str) -> Option<&SourceTag> {
        self.install_user.get(directory)?.get(file)
    }

    /// Whether a system-volume removal of `file` under `directory` is planned
    pub fn removes_root(&self, directory: &str, file: &str) -> bool {
        self.remove_root.get(directory).is_some_and(|files| files.contains(file))
    }

    /// Human-readable summary of the plan
    pub fn summary(&self) -> String {
        let count = |map: &InstallMap| map.values().map(BTreeMap::len).sum::<usize>();
        let removals = |map: &RemoveMap| map.values().map(BTreeSet::len).sum::<usize>();

        let mut lines = Vec::new();
        lines.push(format!("Groups: {}", self.applied_groups.len()));
        for name in &self.applied_groups {
            lines.push(format!("  - {}", name));
        }
        lines.push(format!(
            "Install: {} root, {} user",
            count(&self.install_root),
            count(&self.install_user)
        ));
        lines.push(format!(
            "Remove: {} root, {} user",
            removals(&self.remove_root),
            removals(&self.remove_user)
        ));
        lines.push(format!("Processes: {}", self.processes.len()));
        lines.join("\n")
    }
}

impl fmt::Display for ResolvedPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.summary())
    }
}

fn merge_install(into: &mut InstallMap, from: InstallMap) {
    for (directory, files) in from {
        into.entry(directory).or_default().extend(files);
    }
}

fn merge_remove(into: &mut RemoveMap, from: RemoveMap) {
    for (directory, files) in from {
        into.entry(directory).or_default().extend(files);
    }
}

fn flatten(map: &InstallMap, user: bool) -> impl Iterator<Item = InstallEntry<'_>> {
    map.iter().flat_map(move |(directory, files)| {
        files.iter().map(move |(file, tag)| InstallEntry {
            directory,
            file,
            tag,
            user,
        })
    })
}
