//! Patch Set Resolver
//!
//! Evaluates the catalog against one target OS version and merges every
//! applicable group into a single `ResolvedPlan`.
//!
//! # Design
//!
//! - **Pure logic**: No I/O, no side effects. Same catalog + context gives a
//!   byte-identical plan
//! - **Declaration order**: groups are visited in catalog order and merged one
//!   after another
//! - **Later wins**: a later group overwrites an earlier group's value for the
//!   same destination file or command
//!
//! # Resolution Steps
//!
//! | Step | Action |
//! |------|--------|
//! | 1 | Derive `CapabilityFlags` from the context |
//! | 2 | Keep groups whose `[min, max]` contains `major.minor` |
//! | 3 | Evaluate each rule predicate, resolve tag sources |
//! | 4 | Merge the group plan into the accumulator |

use crate::catalog::{InstallRule, PatchCatalog, PatchGroup, RemoveRule};
use crate::logic::flags::{CapabilityFlags, derive_flags};
use crate::plan::{InstallMap, RemoveMap, ResolvedPlan};
use crate::version::VersionContext;
use tracing::debug;

// ============================================================================
// Plan Resolution
// ============================================================================

/// Resolve the full plan for `ctx`.
///
/// # Returns
///
/// The merged plan of every group whose version range contains the target.
/// An empty plan is a valid answer.
///
/// # What This Explicitly Refuses To Do
///
/// - Probe hardware: every applicable group is included, whatever the machine
/// - Touch the filesystem: payload presence is the harness's job
/// - Apply anything: the plan is data only
pub fn resolve(catalog: &PatchCatalog, ctx: &VersionContext) -> ResolvedPlan {
    resolve_with(catalog, ctx, |_| true)
}

/// Resolve only the applicable groups accepted by `filter`.
///
/// Used by appliers that already know which hardware groups a machine needs.
/// Merge order is still catalog order, not filter order.
pub fn resolve_with<F>(catalog: &PatchCatalog, ctx: &VersionContext, mut filter: F) -> ResolvedPlan
where
    F: FnMut(&PatchGroup) -> bool,
{
    let flags = derive_flags(ctx);
    let mut plan = ResolvedPlan::new();

    for group in applicable_groups(catalog, ctx) {
        if !filter(group) {
            continue;
        }
        plan.merge(resolve_group(group, ctx, &flags));
    }

    debug!(
        "Resolved {} groups for {}",
        plan.applied_groups.len(),
        ctx
    );

    plan
}

/// Groups whose supported range contains the target, in declaration order.
pub fn applicable_groups<'a>(
    catalog: &'a PatchCatalog,
    ctx: &'a VersionContext,
) -> impl Iterator<Item = &'a PatchGroup> + 'a {
    catalog.groups().iter().filter(move |group| {
        if group.version_range(ctx).is_none() {
            debug!("Skipping '{}': no legacy majors in context", group.name);
            return false;
        }
        group.applies_to(ctx)
    })
}

/// Plan for a single group, ignoring its version range.
///
/// Rules inside the group are applied in declaration order, so a later rule
/// for the same file replaces an earlier one.
pub fn resolve_group(group: &PatchGroup, ctx: &VersionContext, flags: &CapabilityFlags) -> ResolvedPlan {
    let mut plan = ResolvedPlan::new();

    collect_installs(&mut plan.install_root, &group.install_root, ctx, flags);
    collect_installs(&mut plan.install_user, &group.install_user, ctx, flags);
    collect_removals(&mut plan.remove_root, &group.remove_root, flags);
    collect_removals(&mut plan.remove_user, &group.remove_user, flags);

    for rule in group.processes.iter().filter(|r| r.when.holds(flags)) {
        plan.processes.insert(rule.command.clone(), rule.requires_root);
    }

    plan.applied_groups.push(group.name.clone());
    plan
}

// ============================================================================
// Helpers
// ============================================================================

fn collect_installs(
    into: &mut InstallMap,
    rules: &[InstallRule],
    ctx: &VersionContext,
    flags: &CapabilityFlags,
) {
    for rule in rules.iter().filter(|r| r.when.holds(flags)) {
        into.entry(rule.directory.clone())
            .or_default()
            .insert(rule.file.clone(), rule.source.resolve(ctx));
    }
}

fn collect_removals(into: &mut RemoveMap, rules: &[RemoveRule], flags: &CapabilityFlags) {
    for rule in rules.iter().filter(|r| r.when.holds(flags)) {
        into.entry(rule.directory.clone())
            .or_default()
            .insert(rule.file.clone());
    }
}

// ============================================================================
// Tests
// ============================================================================
