//! Property-Based Tests for the patch set resolver
//!
//! These tests verify:
//! - Catalog range invariants for any legacy major list
//! - Resolution determinism
//! - Framebuffer ladder monotonicity
//! - Marketing version ordering used by the CVE predicate

use proptest::prelude::*;

use patchset::catalog::PatchCatalog;
use patchset::logic::flags::{derive_flags, is_affected_by_legacy_wifi_cve};
use patchset::logic::framebuffer::resolve_framebuffer_tag;
use patchset::logic::resolver::resolve;
use patchset::plan::ResolvedPlan;
use patchset::types::FramebufferFamily;
use patchset::version::{DottedVersion, KernelVersion, VersionContext};

// =============================================================================
// Strategies
// =============================================================================

fn legacy_majors_strategy() -> impl Strategy<Value = Vec<u32>> {
    prop::collection::vec(16u32..=25, 1..5)
}

fn context_strategy() -> impl Strategy<Value = VersionContext> {
    (16u32..=26, 0u32..=12, legacy_majors_strategy(), 0u32..=8, 0u32..=9).prop_map(
        |(major, minor, legacy, point, patch)| {
            let marketing = format!("{}.{}.{}", major.saturating_sub(9), point, patch);
            VersionContext::new(major, minor, marketing, legacy)
        },
    )
}

fn family_strategy() -> impl Strategy<Value = FramebufferFamily> {
    prop_oneof![
        Just(FramebufferFamily::IvyBridge),
        Just(FramebufferFamily::KeplerGeforce),
        Just(FramebufferFamily::MontereyCommon),
    ]
}

/// Ladder tier of a tag: 0 base, 1 Sonoma, 2 Sonoma 14.4+
fn tier(tag: &str) -> u8 {
    if tag.ends_with("-23.4") {
        2
    } else if tag.ends_with("-23") {
        1
    } else {
        0
    }
}

// =============================================================================
// Catalog & Resolver
// =============================================================================

proptest! {
    /// Every group's resolved range is ordered, whatever the legacy majors
    #[test]
    fn group_ranges_are_ordered(legacy in legacy_majors_strategy()) {
        let catalog = PatchCatalog::standard().expect("standard catalog");
        let ctx = VersionContext::new(22, 0, "13.0", legacy);

        for group in catalog.groups() {
            let (min, max) = group.version_range(&ctx).expect("legacy majors are non-empty");
            prop_assert!(min <= max, "{}: {} > {}", group.name, min, max);
        }
    }

    /// Same context, byte-identical plan
    #[test]
    fn resolution_is_deterministic(ctx in context_strategy()) {
        let catalog = PatchCatalog::standard().expect("standard catalog");

        let first = resolve(&catalog, &ctx);
        let second = resolve(&catalog, &ctx);

        prop_assert_eq!(&first, &second);
        prop_assert_eq!(
            serde_json::to_vec(&first).unwrap(),
            serde_json::to_vec(&second).unwrap()
        );
    }

    /// Rebuilding the catalog does not change the plan
    #[test]
    fn resolution_independent_of_catalog_instance(ctx in context_strategy()) {
        let a = PatchCatalog::standard().expect("standard catalog");
        let b = PatchCatalog::standard().expect("standard catalog");
        prop_assert_eq!(resolve(&a, &ctx), resolve(&b, &ctx));
    }

    /// Plans survive a JSON descriptor round-trip
    #[test]
    fn descriptor_round_trip(ctx in context_strategy()) {
        let catalog = PatchCatalog::standard().expect("standard catalog");
        let plan = resolve(&catalog, &ctx);

        let json = serde_json::to_string(&plan).unwrap();
        let decoded: ResolvedPlan = serde_json::from_str(&json).unwrap();

        prop_assert_eq!(decoded, ResolvedPlan { applied_groups: Vec::new(), ..plan });
    }

    /// Only groups whose range contains the target are merged
    #[test]
    fn applied_groups_contain_target(ctx in context_strategy()) {
        let catalog = PatchCatalog::standard().expect("standard catalog");
        let plan = resolve(&catalog, &ctx);

        for name in &plan.applied_groups {
            let group = catalog.get(name).expect("applied group exists");
            let (min, max) = group.version_range(&ctx).expect("applied group has a range");
            prop_assert!(min <= ctx.kernel() && ctx.kernel() <= max);
        }
    }
}

// =============================================================================
// Version Context
// =============================================================================

proptest! {
    /// Framebuffer tier never goes down as the target gets newer
    #[test]
    fn framebuffer_ladder_is_monotonic(
        family in family_strategy(),
        a in (16u32..=26, 0u32..=12),
        b in (16u32..=26, 0u32..=12),
    ) {
        let (older, newer) = if KernelVersion::new(a.0, a.1) <= KernelVersion::new(b.0, b.1) { (a, b) } else { (b, a) };
        let older_tag = resolve_framebuffer_tag(family, &VersionContext::new(older.0, older.1, "", [20]));
        let newer_tag = resolve_framebuffer_tag(family, &VersionContext::new(newer.0, newer.1, "", [20]));

        prop_assert!(tier(older_tag.as_str()) <= tier(newer_tag.as_str()));
    }

    /// Two-component ordering handles minors past 9
    #[test]
    fn kernel_version_is_lexicographic(major in 16u32..30, minor in 0u32..20) {
        prop_assert!(KernelVersion::new(major, minor) < KernelVersion::new(major, minor + 1));
        prop_assert!(KernelVersion::new(major, 99) < KernelVersion::new(major + 1, 0));
    }

    /// Trailing zero components do not change a marketing version
    #[test]
    fn dotted_version_zero_padding(major in 10u64..20, minor in 0u64..10) {
        let short = DottedVersion::parse(&format!("{}.{}", major, minor)).unwrap();
        let long = DottedVersion::parse(&format!("{}.{}.0", major, minor)).unwrap();
        prop_assert_eq!(short, long);
    }

    /// Majors past Sonoma are always affected, whatever the marketing string
    #[test]
    fn future_majors_always_cve_affected(major in 24u32..40, marketing in ".*") {
        prop_assert!(is_affected_by_legacy_wifi_cve(major, &marketing));
    }

    /// Majors without a fixed floor are never affected
    #[test]
    fn old_majors_never_cve_affected(major in 0u32..21, marketing in "[0-9]{1,2}(\\.[0-9]{1,2}){0,2}") {
        prop_assert!(!is_affected_by_legacy_wifi_cve(major, &marketing));
    }

    /// Flags are a pure function of the context
    #[test]
    fn flags_are_pure(ctx in context_strategy()) {
        prop_assert_eq!(derive_flags(&ctx), derive_flags(&ctx.clone()));
    }
}
