//! Validation Harness
//!
//! Release gate for the catalog. Drives the resolver across every supported
//! `(major, minor)` cell and checks each plan against the payload store, then
//! asks the external builder and validator to accept a config for every
//! hardware profile under both settings profiles.
//!
//! # Run Order
//!
//! | Phase | Action |
//! |-------|--------|
//! | 1 | Config matrix: predefined models, then dumped machines, default settings then flipped |
//! | 2 | Remove the build output directory |
//! | 3 | Download the payload archive if absent and not already mounted |
//! | 4 | Mount the payload image (or borrow an existing mount) |
//! | 5 | Version matrix: per-group payload check + descriptor round-trip |
//! | 6 | Orphan detection, when enabled |
//! | 7 | Detach the image and delete the shadow overlay |
//!
//! Any failure aborts the run. The mount is released on every path.

pub mod payload;

use crate::catalog::PatchCatalog;
use crate::config::HarnessConfig;
use crate::error::{PatchsetError, Result};
use crate::interrupt::InterruptFlag;
use crate::logic::flags::derive_flags;
use crate::logic::resolver::{applicable_groups, resolve, resolve_group};
use crate::plan::ResolvedPlan;
use crate::tools::{
    ArchiveFetcher, BuildSettings, ConfigBuilder, ConfigValidator, DiskImageTool, HardwareProfile,
    MountedImage, is_mounted,
};
use crate::types::SettingsProfile;
use crate::version::{KernelVersion, VersionContext, approximate_marketing_version};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use strum::IntoEnumIterator;
use tracing::{debug, info, warn};

pub use payload::{UsedPaths, cross_validate_against_payload, detect_orphans};

/// External collaborators used by a full run
pub struct Toolset<'a> {
    pub fetcher: &'a dyn ArchiveFetcher,
    pub disk_image: &'a dyn DiskImageTool,
    pub builder: &'a dyn ConfigBuilder,
    pub validator: &'a dyn ConfigValidator,
}

/// Outcome of the payload phase
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SysPatchReport {
    /// Version matrix cells validated
    pub cells: usize,
    /// Payload files no plan referenced (only filled when tracking usage)
    pub orphans: BTreeSet<PathBuf>,
    /// The payload image was already mounted and was left mounted
    pub borrowed_mount: bool,
}

pub struct ValidationHarness<'a> {
    config: &'a HarnessConfig,
    catalog: &'a PatchCatalog,
    interrupt: InterruptFlag,
}

impl<'a> ValidationHarness<'a> {
    pub fn new(config: &'a HarnessConfig, catalog: &'a PatchCatalog) -> Self {
        Self {
            config,
            catalog,
            interrupt: InterruptFlag::new(),
        }
    }

    /// Abort between steps once `flag` is set
    pub fn with_interrupt(mut self, flag: InterruptFlag) -> Self {
        self.interrupt = flag;
        self
    }

    /// Both phases, config matrix first
    pub fn run(&self, tools: &Toolset<'_>) -> Result<SysPatchReport> {
        let builds = self.run_config_matrix(tools.builder, tools.validator, &self.hardware_profiles())?;
        info!("Config matrix passed ({} builds)", builds);

        let report = self.validate_sys_patch(tools.fetcher, tools.disk_image)?;
        info!("Version matrix passed ({} cells)", report.cells);
        Ok(report)
    }

    /// Context for one matrix cell
    pub fn context_for(&self, kernel: KernelVersion) -> VersionContext {
        let marketing = self
            .config
            .marketing_version
            .clone()
            .unwrap_or_else(|| approximate_marketing_version(kernel));
        VersionContext::new(
            kernel.major,
            kernel.minor,
            marketing,
            self.config.legacy_majors.iter().copied(),
        )
    }

    /// A tool killed by the interrupt handler reports as a tool failure
    fn interrupted_or(&self, err: PatchsetError) -> PatchsetError {
        if self.interrupt.is_set() {
            PatchsetError::Interrupted
        } else {
            err
        }
    }

    /// Predefined models first, then the dumped machines
    pub fn hardware_profiles(&self) -> Vec<HardwareProfile> {
        self.config
            .predefined_models
            .iter()
            .map(HardwareProfile::predefined)
            .chain(HardwareProfile::default_dumps())
            .collect()
    }

    // ========================================================================
    // Version matrix
    // ========================================================================

    /// Validate every configured `(major, minor)` cell against the payload
    /// store at `payload_root`. Returns the number of cells checked.
    pub fn run_version_matrix(&self, payload_root: &Path, mut used: Option<&mut UsedPaths>) -> Result<usize> {
        let cells = self.config.version_matrix();

        for kernel in &cells {
            self.interrupt.check()?;
            self.validate_cell(*kernel, payload_root, used.as_deref_mut())
                .map_err(|e| self.interrupted_or(e.in_version_matrix(kernel.major, kernel.minor)))?;
        }

        Ok(cells.len())
    }

    fn validate_cell(&self, kernel: KernelVersion, payload_root: &Path, mut used: Option<&mut UsedPaths>) -> Result<()> {
        let ctx = self.context_for(kernel);
        let flags = derive_flags(&ctx);

        // Each group on its own so sources later overwritten in the merge are still checked
        for group in applicable_groups(self.catalog, &ctx) {
            let plan = resolve_group(group, &ctx, &flags);
            cross_validate_against_payload(&plan, payload_root, used.as_deref_mut())?;
        }

        info!("Validating against Darwin {}", kernel);
        let plan = resolve(self.catalog, &ctx);
        self.round_trip_descriptor(kernel, &plan)
    }

    /// Write the plan descriptor, read it back, compare, delete it
    fn round_trip_descriptor(&self, kernel: KernelVersion, plan: &ResolvedPlan) -> Result<()> {
        fs::create_dir_all(&self.config.payload_dir)?;
        let path = self.descriptor_path(kernel);

        fs::write(&path, serde_json::to_string_pretty(plan)?)?;
        let read_back = fs::read_to_string(&path);
        fs::remove_file(&path)?;

        let decoded: ResolvedPlan = serde_json::from_str(&read_back?)?;
        let expected = ResolvedPlan {
            applied_groups: Vec::new(),
            ..plan.clone()
        };
        if decoded != expected {
            return Err(PatchsetError::defect(
                format!("Darwin {}", kernel),
                "plan descriptor did not survive serialization",
            ));
        }

        debug!("Descriptor for Darwin {} round-tripped", kernel);
        Ok(())
    }

    pub fn descriptor_path(&self, kernel: KernelVersion) -> PathBuf {
        self.config
            .payload_dir
            .join(format!("Patchset-{}.{}.json", kernel.major, kernel.minor))
    }

    // ========================================================================
    // Config matrix
    // ========================================================================

    /// Build and validate every hardware profile under each settings
    /// profile. The build output directory is removed afterwards, pass or
    /// fail. Returns the number of builds validated.
    pub fn run_config_matrix(
        &self,
        builder: &dyn ConfigBuilder,
        validator: &dyn ConfigValidator,
        hardware: &[HardwareProfile],
    ) -> Result<usize> {
        let result = self.build_all(builder, validator, hardware);
        self.remove_build_output();
        result
    }

    fn build_all(
        &self,
        builder: &dyn ConfigBuilder,
        validator: &dyn ConfigValidator,
        hardware: &[HardwareProfile],
    ) -> Result<usize> {
        let mut builds = 0;

        for profile in SettingsProfile::iter() {
            let settings = BuildSettings::for_profile(profile);
            info!("Building with {} settings", profile);

            for machine in hardware {
                self.interrupt.check()?;
                info!("Validating model: {} ({})", machine.id, machine.model);

                builder
                    .build(machine, &settings)
                    .and_then(|artifact| validator.validate(&artifact))
                    .map_err(|e| self.interrupted_or(e.in_config_matrix(&machine.id, profile.to_string())))?;

                info!("Validation succeeded for model: {}", machine.id);
                builds += 1;
            }
        }

        Ok(builds)
    }

    fn remove_build_output(&self) {
        let dir = &self.config.build_output_dir;
        match fs::remove_dir_all(dir) {
            Ok(()) => debug!("Removed {}", dir.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!("Failed to remove {}: {}", dir.display(), e),
        }
    }

    // ========================================================================
    // Payload phase
    // ========================================================================

    /// Fetch (only when an attach is needed) and mount the payload store, run the version matrix against it,
    /// then release the mount.
    ///
    /// A failure inside the matrix is returned unchanged; a detach failure
    /// during that unwind is only logged.
    pub fn validate_sys_patch(
        &self,
        fetcher: &dyn ArchiveFetcher,
        disk_image: &dyn DiskImageTool,
    ) -> Result<SysPatchReport> {
        let config = self.config;

        // A borrowed mount never touches the archive
        if !is_mounted(&config.payload_root) && !config.payload_archive.exists() {
            fetcher.fetch(&config.download_url(), &config.payload_archive)?;
        }
        self.interrupt.check()?;

        info!("Validating payload file integrity");
        let mount = MountedImage::acquire(
            disk_image,
            &config.payload_archive,
            &config.payload_root,
            config.shadow(),
        )?;

        // On error `mount` drops here and detaches
        let mut report = self.check_mounted_payload(mount.mountpoint())?;
        report.borrowed_mount = mount.is_borrowed();

        mount.release()?;
        Ok(report)
    }

    fn check_mounted_payload(&self, payload_root: &Path) -> Result<SysPatchReport> {
        let mut used = self.config.verify_unused_files.then(UsedPaths::new);
        let cells = self.run_version_matrix(payload_root, used.as_mut())?;

        let orphans = match used {
            Some(used) if !used.is_empty() => {
                self.interrupt.check()?;
                let orphans = detect_orphans(payload_root, &used)?;
                if !orphans.is_empty() {
                    info!("Unused files found:");
                    for file in &orphans {
                        info!("  {}", file.display());
                    }
                }
                orphans
            }
            _ => BTreeSet::new(),
        };

        Ok(SysPatchReport {
            cells,
            orphans,
            borrowed_mount: false,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{PatchGroup, RangeBound};
    use crate::types::Category;
    use tempfile::TempDir;

    fn config_in(dir: &Path) -> HarnessConfig {
        HarnessConfig {
            payload_dir: dir.to_path_buf(),
            build_output_dir: dir.join("build"),
            supported_majors: vec![22],
            minor_min: 0,
            minor_max: 2,
            ..Default::default()
        }
    }

    fn single_group_catalog() -> PatchCatalog {
        PatchCatalog::new(vec![
            PatchGroup::builder("Test", Category::Miscellaneous)
                .supported(RangeBound::kernel(22, 0), RangeBound::kernel(22, 1))
                .install("/usr/libexec", "tool", "13.0")
                .build(),
        ])
        .unwrap()
    }

    #[test]
    fn test_context_for_uses_pinned_marketing_version() {
        let dir = TempDir::new().unwrap();
        let catalog = single_group_catalog();
        let mut config = config_in(dir.path());

        let harness = ValidationHarness::new(&config, &catalog);
        assert_eq!(harness.context_for(KernelVersion::new(23, 4)).marketing_version, "14.4");

        config.marketing_version = Some("14.6.1".to_string());
        let harness = ValidationHarness::new(&config, &catalog);
        let ctx = harness.context_for(KernelVersion::new(23, 4));
        assert_eq!(ctx.marketing_version, "14.6.1");
        assert_eq!(ctx.legacy_majors, vec![20, 21, 22, 23]);
    }

    #[test]
    fn test_version_matrix_leaves_no_descriptors() {
        let dir = TempDir::new().unwrap();
        let payload = dir.path().join("payload");
        fs::create_dir_all(payload.join("13.0/usr/libexec")).unwrap();
        fs::write(payload.join("13.0/usr/libexec/tool"), "").unwrap();

        let config = config_in(dir.path());
        let catalog = single_group_catalog();
        let harness = ValidationHarness::new(&config, &catalog);

        assert_eq!(harness.run_version_matrix(&payload, None).unwrap(), 3);
        for minor in 0..=2 {
            assert!(!harness.descriptor_path(KernelVersion::new(22, minor)).exists());
        }
    }

    #[test]
    fn test_version_matrix_names_failing_cell() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let catalog = single_group_catalog();
        let harness = ValidationHarness::new(&config, &catalog);

        let err = harness.run_version_matrix(&dir.path().join("empty"), None).unwrap_err();
        assert!(matches!(err, PatchsetError::VersionMatrix { major: 22, minor: 0, .. }));
        assert!(matches!(err.root_cause(), PatchsetError::MissingPayloadFile { .. }));
    }

    #[test]
    fn test_interrupt_stops_matrix() {
        let dir = TempDir::new().unwrap();
        let config = config_in(dir.path());
        let catalog = single_group_catalog();
        let flag = InterruptFlag::new();
        flag.trigger();

        let harness = ValidationHarness::new(&config, &catalog).with_interrupt(flag);
        let err = harness.run_version_matrix(dir.path(), None).unwrap_err();
        assert!(matches!(err, PatchsetError::Interrupted));
    }

    #[test]
    fn test_hardware_profiles_order() {
        let dir = TempDir::new().unwrap();
        let config = HarnessConfig {
            predefined_models: vec!["iMac7,1".to_string()],
            ..config_in(dir.path())
        };
        let catalog = single_group_catalog();
        let profiles = ValidationHarness::new(&config, &catalog).hardware_profiles();

        assert_eq!(profiles[0], HardwareProfile::predefined("iMac7,1"));
        assert_eq!(profiles.len(), 1 + HardwareProfile::default_dumps().len());
    }
}
