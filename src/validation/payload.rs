//! Payload store checks
//!
//! The payload store is a read-only tree laid out as
//! `<root>/<source tag>/<install directory>/<file>`. Nothing here writes to it.

use crate::error::{PatchsetError, Result};
use crate::plan::{InstallEntry, ResolvedPlan};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Housekeeping files that are never referenced by a plan
const IGNORED_FILE_NAMES: &[&str] = &[".DS_Store"];
const IGNORED_RELATIVE_PATHS: &[&str] = &[".fseventsd/fseventsd-uuid", ".signed"];

/// Payload-relative paths checked during a run, kept for orphan detection.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsedPaths(BTreeSet<String>);

impl UsedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, relative: impl Into<String>) {
        self.0.insert(relative.into());
    }

    pub fn contains(&self, relative: &str) -> bool {
        self.0.contains(relative)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Substring match in either direction, so a used bundle directory
    /// covers the files inside it
    fn covers(&self, relative: &str) -> bool {
        self.0
            .iter()
            .any(|used| used.contains(relative) || relative.contains(used.as_str()))
    }
}

/// Payload-relative source path of one install entry:
/// `<tag>/<directory>/<file>`.
pub fn relative_source_path(entry: &InstallEntry<'_>) -> String {
    let directory = entry.directory.trim_matches('/');
    if directory.is_empty() {
        format!("{}/{}", entry.tag, entry.file)
    } else {
        format!("{}/{}/{}", entry.tag, directory, entry.file)
    }
}

/// Check that every install entry of `plan` has its source under `root`.
///
/// Fails on the first absent source, naming the full expected path. When
/// `used` is given each checked path is recorded for `detect_orphans`.
pub fn cross_validate_against_payload(
    plan: &ResolvedPlan,
    root: &Path,
    mut used: Option<&mut UsedPaths>,
) -> Result<()> {
    for entry in plan.install_entries() {
        let relative = relative_source_path(&entry);
        let source = root.join(&relative);

        if !source.exists() {
            info!("File not found: {}", source.display());
            return Err(PatchsetError::missing_payload(source));
        }

        if let Some(used) = used.as_deref_mut() {
            used.insert(relative);
        }
    }
    Ok(())
}

/// Files under `root` that no used path refers to.
///
/// Walks the whole payload tree, so it is slow on a real store and only run
/// on request.
pub fn detect_orphans(root: &Path, used: &UsedPaths) -> Result<BTreeSet<PathBuf>> {
    let mut orphans = BTreeSet::new();

    for entry in WalkDir::new(root).follow_links(false) {
        let entry = entry?;
        if entry.file_type().is_dir() {
            continue;
        }

        let Ok(relative) = entry.path().strip_prefix(root) else {
            continue;
        };
        if is_housekeeping(relative) {
            continue;
        }

        let relative_str = relative.to_string_lossy();
        if used.covers(&relative_str) {
            continue;
        }

        debug!("Unreferenced payload file: {}", relative.display());
        orphans.insert(relative.to_path_buf());
    }

    Ok(orphans)
}

fn is_housekeeping(relative: &Path) -> bool {
    let name_ignored = relative
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| IGNORED_FILE_NAMES.contains(&n));

    name_ignored
        || IGNORED_RELATIVE_PATHS
            .iter()
            .any(|ignored| relative == Path::new(ignored))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plan::SourceTag;
    use std::fs;
    use tempfile::TempDir;

    fn plan_of(entries: &[(&str, &str, &str)]) -> ResolvedPlan {
        let mut plan = ResolvedPlan::new();
        for (directory, file, tag) in entries {
            plan.install_root
                .entry(directory.to_string())
                .or_default()
                .insert(file.to_string(), SourceTag::from(*tag));
        }
        plan
    }

    fn touch(root: &Path, relative: &str) {
        let path = root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }

    #[test]
    fn test_relative_source_path() {
        let tag = SourceTag::from("11.7.10");
        let entry = InstallEntry {
            directory: "/System/Library/Extensions",
            file: "AppleIntelHD4000Graphics.kext",
            tag: &tag,
            user: false,
        };
        assert_eq!(
            relative_source_path(&entry),
            "11.7.10/System/Library/Extensions/AppleIntelHD4000Graphics.kext"
        );
    }

    #[test]
    fn test_missing_file_names_exact_path() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "12.5/System/Library/Extensions/GPUCompiler.framework");
        let plan = plan_of(&[
            ("/System/Library/Extensions", "GPUCompiler.framework", "12.5"),
            ("/System/Library/Extensions", "AMDRadeonX4000.kext", "12.5"),
        ]);

        let err = cross_validate_against_payload(&plan, root.path(), None).unwrap_err();
        match err {
            PatchsetError::MissingPayloadFile { path } => assert_eq!(
                path,
                root.path().join("12.5/System/Library/Extensions/AMDRadeonX4000.kext")
            ),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_user_entries_checked() {
        let root = TempDir::new().unwrap();
        let mut plan = ResolvedPlan::new();
        plan.install_user
            .entry("/Library/Application Support/SkyLightPlugins".to_string())
            .or_default()
            .insert("DropboxHack.dylib".to_string(), SourceTag::from("Mojave"));

        assert!(cross_validate_against_payload(&plan, root.path(), None).is_err());
        touch(
            root.path(),
            "Mojave/Library/Application Support/SkyLightPlugins/DropboxHack.dylib",
        );
        assert!(cross_validate_against_payload(&plan, root.path(), None).is_ok());
    }

    #[test]
    fn test_used_paths_recorded() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "10.13.6/usr/libexec/resetpassword");
        let plan = plan_of(&[("/usr/libexec", "resetpassword", "10.13.6")]);

        let mut used = UsedPaths::new();
        cross_validate_against_payload(&plan, root.path(), Some(&mut used)).unwrap();

        assert_eq!(used.len(), 1);
        assert!(used.contains("10.13.6/usr/libexec/resetpassword"));
    }

    #[test]
    fn test_orphans_empty_when_covered() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "12.5/System/Library/Extensions/AMDShared.bundle/Contents/Info.plist");
        touch(root.path(), ".DS_Store");
        touch(root.path(), "12.5/.DS_Store");
        touch(root.path(), ".fseventsd/fseventsd-uuid");
        touch(root.path(), ".signed");

        let mut used = UsedPaths::new();
        used.insert("12.5/System/Library/Extensions/AMDShared.bundle");

        assert!(detect_orphans(root.path(), &used).unwrap().is_empty());
    }

    #[test]
    fn test_orphan_reported() {
        let root = TempDir::new().unwrap();
        touch(root.path(), "11.7.10/System/Library/Extensions/AppleIntelHD4000Graphics.kext/Contents/Info.plist");
        touch(root.path(), "11.7.10/System/Library/Extensions/Unused.kext/Contents/Info.plist");

        let mut used = UsedPaths::new();
        used.insert("11.7.10/System/Library/Extensions/AppleIntelHD4000Graphics.kext");

        let orphans = detect_orphans(root.path(), &used).unwrap();
        assert_eq!(
            orphans.into_iter().collect::<Vec<_>>(),
            vec![PathBuf::from("11.7.10/System/Library/Extensions/Unused.kext/Contents/Info.plist")]
        );
    }
}
