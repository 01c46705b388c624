//! Target OS version descriptors.
//!
//! # Version comparison
//!
//! Kernel versions are compared as an explicit `(major, minor)` pair. Minor
//! components of 10 and above therefore order correctly (`21.10 > 21.9`), which
//! a single concatenated decimal value cannot do.

use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Two-component XNU kernel version, ordered major first then minor.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct KernelVersion {
    pub major: u32,
    pub minor: u32,
}

impl KernelVersion {
    pub const fn new(major: u32, minor: u32) -> Self {
        Self { major, minor }
    }
}

impl fmt::Display for KernelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.major, self.minor)
    }
}

/// Kernel versions matching the marketing releases the catalog gates on.
pub mod kernel {
    use super::KernelVersion;

    /// macOS 12.0 Beta 7
    pub const MACOS_12_0_B7: KernelVersion = KernelVersion::new(21, 1);
    pub const MACOS_12_4: KernelVersion = KernelVersion::new(21, 5);
    pub const MACOS_12_5: KernelVersion = KernelVersion::new(21, 6);
    pub const MACOS_13_3: KernelVersion = KernelVersion::new(22, 4);
    pub const MACOS_14_2: KernelVersion = KernelVersion::new(23, 2);
    pub const MACOS_14_4: KernelVersion = KernelVersion::new(23, 4);
}

/// Dotted numeric marketing version such as `12.7.4` or `14.4`.
///
/// Missing trailing components compare as zero, so `14.4 == 14.4.0`.
#[derive(Debug, Clone)]
pub struct DottedVersion(Vec<u64>);

impl DottedVersion {
    /// Parse a dotted version, returning `None` for anything that is not
    /// purely numeric components separated by dots.
    pub fn parse(input: &str) -> Option<Self> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return None;
        }
        trimmed
            .split('.')
            .map(|part| part.parse::<u64>().ok())
            .collect::<Option<Vec<_>>>()
            .map(Self)
    }

    fn component(&self, index: usize) -> u64 {
        self.0.get(index).copied().unwrap_or(0)
    }
}

impl FromStr for DottedVersion {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| format!("'{}' is not a dotted numeric version", s))
    }
}

impl Ord for DottedVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.0.len().max(other.0.len());
        (0..len)
            .map(|i| self.component(i).cmp(&other.component(i)))
            .find(|ord| ord.is_ne())
            .unwrap_or(Ordering::Equal)
    }
}

impl PartialEq for DottedVersion {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other).is_eq()
    }
}

impl Eq for DottedVersion {}

impl PartialOrd for DottedVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

/// Normalized target OS descriptor consumed by the resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VersionContext {
    pub kernel_major: u32,
    pub kernel_minor: u32,
    pub marketing_version: String,
    /// Kernel majors with non-metal graphics support, ascending and deduplicated
    pub legacy_majors: Vec<u32>,
}

impl VersionContext {
    /// Build a context, sorting and deduplicating `legacy_majors`.
    pub fn new(
        kernel_major: u32,
        kernel_minor: u32,
        marketing_version: impl Into<String>,
        legacy_majors: impl IntoIterator<Item = u32>,
    ) -> Self {
        let mut legacy_majors: Vec<u32> = legacy_majors.into_iter().collect();
        legacy_majors.sort_unstable();
        legacy_majors.dedup();

        Self {
            kernel_major,
            kernel_minor,
            marketing_version: marketing_version.into(),
            legacy_majors,
        }
    }

    pub fn kernel(&self) -> KernelVersion {
        KernelVersion::new(self.kernel_major, self.kernel_minor)
    }

    /// Oldest non-metal major, if any
    pub fn oldest_legacy_major(&self) -> Option<u32> {
        self.legacy_majors.first().copied()
    }

    /// Newest non-metal major, if any
    pub fn newest_legacy_major(&self) -> Option<u32> {
        self.legacy_majors.last().copied()
    }
}

impl fmt::Display for VersionContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Darwin {} (macOS {}, non-metal {:?})",
            self.kernel(),
            self.marketing_version,
            self.legacy_majors
        )
    }
}

/// First release shipping each kernel minor, Big Sur through Sonoma.
/// The last minor of a major covers every later point release as well.
const FIRST_RELEASE_BY_MINOR: &[(u32, &[&str])] = &[
    (20, &["11.0", "11.0.1", "11.1", "11.2", "11.3", "11.4", "11.5"]),
    (21, &["12.0", "12.0.1", "12.1", "12.2", "12.3", "12.4", "12.5"]),
    (22, &["13.0", "13.0", "13.1", "13.2", "13.3", "13.4", "13.5"]),
    (23, &["14.0", "14.1", "14.2", "14.3", "14.4", "14.5", "14.6"]),
];

/// Best-effort marketing version for a kernel version, used when the harness
/// has no detected OS version to pin.
///
/// Known majors map to the first release carrying that kernel minor. Several
/// point releases can share one kernel (Darwin 21.6 spans 12.5 to 12.7.x), so
/// the result is the oldest of them and the legacy Wi-Fi CVE check sees it as
/// unpatched. Pin `marketing_version` in the harness config to check a later
/// point release. Unknown majors fall back to `major - 9` with the minor.
pub fn approximate_marketing_version(kernel: KernelVersion) -> String {
    let known = FIRST_RELEASE_BY_MINOR
        .iter()
        .find(|(major, _)| *major == kernel.major)
        .and_then(|(_, releases)| {
            let index = (kernel.minor as usize).min(releases.len().saturating_sub(1));
            releases.get(index)
        });

    match known {
        Some(release) => release.to_string(),
        None => format!("{}.{}", kernel.major.saturating_sub(9), kernel.minor),
    }
}
