//! Patch Catalog
//!
//! A read-only registry of named patch groups. Each group carries a version
//! range and conditional operation rules; nothing is evaluated until the
//! resolver runs it against a `VersionContext`.
//!
//! # Design
//!
//! - **Declarative rules**: every conditional entry is an explicit
//!   `{predicate, key, value}` rule evaluated at resolution time, so one
//!   catalog serves every target version
//! - **Shared fragments**: framebuffer families and version-range shapes are
//!   referenced by value (`TagSource::Framebuffer`, `RangeBound::*Legacy`)
//!   instead of being copied per group
//! - **Checked once**: `PatchCatalog::new` rejects malformed groups up front

pub mod groups;

use crate::error::{PatchsetError, Result};
use crate::logic::flags::{Capability, CapabilityFlags};
use crate::logic::framebuffer::resolve_framebuffer_tag;
use crate::plan::SourceTag;
use crate::types::{Category, FramebufferFamily};
use crate::version::{KernelVersion, VersionContext};
use std::collections::HashSet;
use std::fmt;

// ============================================================================
// Rule Building Blocks
// ============================================================================

/// Condition gating a single rule.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Predicate {
    Always,
    When(Capability),
    Unless(Capability),
    AllOf(Vec<Predicate>),
}

impl Predicate {
    pub fn holds(&self, flags: &CapabilityFlags) -> bool {
        match self {
            Self::Always => true,
            Self::When(capability) => flags.holds(*capability),
            Self::Unless(capability) => !flags.holds(*capability),
            Self::AllOf(all) => all.iter().all(|p| p.holds(flags)),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Always => write!(f, "always"),
            Self::When(c) => write!(f, "{}", c),
            Self::Unless(c) => write!(f, "!{}", c),
            Self::AllOf(all) => {
                let parts: Vec<String> = all.iter().map(ToString::to_string).collect();
                write!(f, "({})", parts.join(" && "))
            }
        }
    }
}

/// Where an install rule gets its source tag from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TagSource {
    Literal(SourceTag),
    /// `"<base>-<target major>"`, for stubbed binaries rebuilt per release
    ForTargetMajor(String),
    Framebuffer(FramebufferFamily),
}

impl TagSource {
    pub fn per_major(base: impl Into<String>) -> Self {
        Self::ForTargetMajor(base.into())
    }

    pub fn resolve(&self, ctx: &VersionContext) -> SourceTag {
        match self {
            Self::Literal(tag) => tag.clone(),
            Self::ForTargetMajor(base) => SourceTag::new(format!("{}-{}", base, ctx.kernel_major)),
            Self::Framebuffer(family) => resolve_framebuffer_tag(*family, ctx),
        }
    }

    fn is_blank(&self) -> bool {
        match self {
            Self::Literal(tag) => tag.as_str().trim().is_empty(),
            Self::ForTargetMajor(base) => base.trim().is_empty(),
            Self::Framebuffer(_) => false,
        }
    }
}

impl From<&str> for TagSource {
    fn from(tag: &str) -> Self {
        Self::Literal(SourceTag::from(tag))
    }
}

impl From<FramebufferFamily> for TagSource {
    fn from(family: FramebufferFamily) -> Self {
        Self::Framebuffer(family)
    }
}

/// One end of a group's supported version range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RangeBound {
    Kernel(KernelVersion),
    /// Oldest non-metal major of the context, with the given minor
    OldestLegacy { minor: u32 },
    /// Newest non-metal major of the context, with the given minor
    NewestLegacy { minor: u32 },
}

impl RangeBound {
    pub const fn kernel(major: u32, minor: u32) -> Self {
        Self::Kernel(KernelVersion::new(major, minor))
    }

    /// Concrete bound for `ctx`, or `None` when the context lists no legacy majors
    pub fn resolve(&self, ctx: &VersionContext) -> Option<KernelVersion> {
        match *self {
            Self::Kernel(version) => Some(version),
            Self::OldestLegacy { minor } => ctx
                .oldest_legacy_major()
                .map(|major| KernelVersion::new(major, minor)),
            Self::NewestLegacy { minor } => ctx
                .newest_legacy_major()
                .map(|major| KernelVersion::new(major, minor)),
        }
    }
}

impl fmt::Display for RangeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Kernel(version) => write!(f, "{}", version),
            Self::OldestLegacy { minor } => write!(f, "oldest-legacy.{}", minor),
            Self::NewestLegacy { minor } => write!(f, "newest-legacy.{}", minor),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRule {
    pub when: Predicate,
    pub directory: String,
    pub file: String,
    pub source: TagSource,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoveRule {
    pub when: Predicate,
    pub directory: String,
    pub file: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessRule {
    pub when: Predicate,
    pub command: String,
    pub requires_root: bool,
}

// ============================================================================
// Patch Group
// ============================================================================

/// One named, version-ranged bundle of operations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchGroup {
    pub name: String,
    /// User-facing name; `None` for groups only pulled in as dependencies
    pub display_name: Option<String>,
    pub category: Category,
    pub min: RangeBound,
    pub max: RangeBound,
    pub install_root: Vec<InstallRule>,
    pub install_user: Vec<InstallRule>,
    pub remove_root: Vec<RemoveRule>,
    pub remove_user: Vec<RemoveRule>,
    pub processes: Vec<ProcessRule>,
}

impl PatchGroup {
    pub fn builder(name: impl Into<String>, category: Category) -> PatchGroupBuilder {
        PatchGroupBuilder::new(name, category)
    }

    /// Inclusive `[min, max]` for `ctx`, or `None` when a legacy-bounded end
    /// cannot be resolved.
    pub fn version_range(&self, ctx: &VersionContext) -> Option<(KernelVersion, KernelVersion)> {
        Some((self.min.resolve(ctx)?, self.max.resolve(ctx)?))
    }

    /// Whether the target kernel version of `ctx` falls inside this group's range
    pub fn applies_to(&self, ctx: &VersionContext) -> bool {
        self.version_range(ctx)
            .is_some_and(|(min, max)| (min..=max).contains(&ctx.kernel()))
    }

    fn rule_count(&self) -> usize {
        self.install_root.len()
            + self.install_user.len()
            + self.remove_root.len()
            + self.remove_user.len()
            + self.processes.len()
    }

    fn check(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(PatchsetError::defect("<unnamed>", "group name is empty"));
        }

        if let (RangeBound::Kernel(min), RangeBound::Kernel(max)) = (self.min, self.max) {
            if min > max {
                return Err(PatchsetError::defect(
                    &self.name,
                    format!("minimum version {} exceeds maximum {}", min, max),
                ));
            }
        }

        for rule in self.install_root.iter().chain(&self.install_user) {
            if rule.directory.is_empty() || rule.file.is_empty() {
                return Err(PatchsetError::defect(&self.name, "install rule without a destination"));
            }
            if rule.source.is_blank() {
                return Err(PatchsetError::defect(
                    &self.name,
                    format!("empty source tag for {}/{}", rule.directory, rule.file),
                ));
            }
        }

        for rule in self.remove_root.iter().chain(&self.remove_user) {
            if rule.directory.is_empty() || rule.file.is_empty() {
                return Err(PatchsetError::defect(&self.name, "remove rule without a target"));
            }
        }

        if self.processes.iter().any(|p| p.command.trim().is_empty()) {
            return Err(PatchsetError::defect(&self.name, "empty process command"));
        }

        Ok(())
    }
}

/// Fluent constructor for `PatchGroup`.
///
/// Ranges default to fully open (`0.0..=99.99`); every catalog group sets
/// its own.
#[derive(Debug, Clone)]
pub struct PatchGroupBuilder {
    group: PatchGroup,
}

impl PatchGroupBuilder {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            group: PatchGroup {
                name: name.into(),
                display_name: None,
                category,
                min: RangeBound::kernel(0, 0),
                max: RangeBound::kernel(crate::types::darwin::MAX_OS, 99),
                install_root: Vec::new(),
                install_user: Vec::new(),
                remove_root: Vec::new(),
                remove_user: Vec::new(),
                processes: Vec::new(),
            },
        }
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.group.display_name = Some(name.into());
        self
    }

    pub fn supported(mut self, min: RangeBound, max: RangeBound) -> Self {
        self.group.min = min;
        self.group.max = max;
        self
    }

    /// Apply a shared fragment
    pub fn with(self, fragment: impl FnOnce(Self) -> Self) -> Self {
        fragment(self)
    }

    pub fn install(self, directory: &str, file: &str, source: impl Into<TagSource>) -> Self {
        self.install_if(Predicate::Always, directory, file, source)
    }

    pub fn install_if(
        mut self,
        when: Predicate,
        directory: &str,
        file: &str,
        source: impl Into<TagSource>,
    ) -> Self {
        self.group.install_root.push(install_rule(when, directory, file, source.into()));
        self
    }

    /// `if_set` when `capability` holds, `otherwise` when it does not
    pub fn install_either(
        self,
        capability: Capability,
        directory: &str,
        file: &str,
        if_set: impl Into<TagSource>,
        otherwise: impl Into<TagSource>,
    ) -> Self {
        self.install_if(Predicate::When(capability), directory, file, if_set)
            .install_if(Predicate::Unless(capability), directory, file, otherwise)
    }

    pub fn install_user(self, directory: &str, file: &str, source: impl Into<TagSource>) -> Self {
        self.install_user_if(Predicate::Always, directory, file, source)
    }

    pub fn install_user_if(
        mut self,
        when: Predicate,
        directory: &str,
        file: &str,
        source: impl Into<TagSource>,
    ) -> Self {
        self.group.install_user.push(install_rule(when, directory, file, source.into()));
        self
    }

    pub fn remove(mut self, directory: &str, files: &[&str]) -> Self {
        self.group.remove_root.extend(remove_rules(directory, files));
        self
    }

    pub fn remove_user(mut self, directory: &str, files: &[&str]) -> Self {
        self.group.remove_user.extend(remove_rules(directory, files));
        self
    }

    pub fn process(self, command: &str, requires_root: bool) -> Self {
        self.process_if(Predicate::Always, command, requires_root)
    }

    pub fn process_if(mut self, when: Predicate, command: &str, requires_root: bool) -> Self {
        self.group.processes.push(ProcessRule {
            when,
            command: command.to_string(),
            requires_root,
        });
        self
    }

    pub fn build(self) -> PatchGroup {
        self.group
    }
}

fn install_rule(when: Predicate, directory: &str, file: &str, source: TagSource) -> InstallRule {
    InstallRule {
        when,
        directory: directory.to_string(),
        file: file.to_string(),
        source,
    }
}

fn remove_rules<'a>(directory: &'a str, files: &'a [&'a str]) -> impl Iterator<Item = RemoveRule> + 'a {
    files.iter().map(move |file| RemoveRule {
        when: Predicate::Always,
        directory: directory.to_string(),
        file: file.to_string(),
    })
}

// ============================================================================
// Catalog
// ============================================================================

/// Immutable registry of patch groups in declaration order.
///
/// Declaration order is the merge order: when two applicable groups target
/// the same destination, the later one wins.
#[derive(Debug, Clone)]
pub struct PatchCatalog {
    groups: Vec<PatchGroup>,
}

impl PatchCatalog {
    /// Build a catalog, rejecting malformed or duplicate groups.
    pub fn new(groups: Vec<PatchGroup>) -> Result<Self> {
        let mut seen = HashSet::new();
        for group in &groups {
            group.check()?;
            if !seen.insert(group.name.as_str()) {
                return Err(PatchsetError::defect(&group.name, "duplicate group name"));
            }
        }

        tracing::debug!(
            "Patch catalog ready: {} groups, {} rules",
            groups.len(),
            groups.iter().map(PatchGroup::rule_count).sum::<usize>()
        );

        Ok(Self { groups })
    }

    /// The full legacy-hardware catalog
    pub fn standard() -> Result<Self> {
        Self::new(groups::standard_groups())
    }

    pub fn groups(&self) -> &[PatchGroup] {
        &self.groups
    }

    pub fn get(&self, name: &str) -> Option<&PatchGroup> {
        self.groups.iter().find(|g| g.name == name)
    }

    /// Groups of one display category, in declaration order
    pub fn groups_in(&self, category: Category) -> impl Iterator<Item = &PatchGroup> {
        self.groups.iter().filter(move |g| g.category == category)
    }

    pub fn len(&self) -> usize {
        self.groups.len()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.is_empty()
    }
}
