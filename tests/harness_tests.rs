// Validation harness tests against fake external tools
//
// Payload stores are synthetic trees under a TempDir. The fake disk image
// tool "mounts" by writing the payload files into the mountpoint, so the
// mount lifecycle can be checked from the filesystem and the call log.

use std::cell::RefCell;
use std::fs;
use std::path::{Path, PathBuf};

use patchset::catalog::{PatchCatalog, PatchGroup, Predicate, RangeBound};
use patchset::config::HarnessConfig;
use patchset::error::{PatchsetError, Result};
use patchset::logic::flags::Capability;
use patchset::tools::{
    ArchiveFetcher, BuildSettings, ConfigBuilder, ConfigValidator, DiskImageTool, HardwareProfile,
};
use patchset::types::{Category, KextVariant, SettingsProfile};
use patchset::validation::{Toolset, ValidationHarness};
use tempfile::TempDir;

// =============================================================================
// Fakes
// =============================================================================

const PAYLOAD_FILES: &[&str] = &[
    "10.13.6/usr/libexec/resetpassword",
    "12.5/System/Library/Extensions/AppleIntelSKLGraphics.kext/Contents/Info.plist",
    "12.5-23/System/Library/Extensions/AppleIntelSKLGraphics.kext/Contents/Info.plist",
    ".signed",
];

#[derive(Default)]
struct FakeDiskImage {
    calls: RefCell<Vec<String>>,
    extra_files: Vec<&'static str>,
    fail_attach: bool,
    fail_detach: bool,
}

impl FakeDiskImage {
    fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }
}

impl DiskImageTool for FakeDiskImage {
    fn attach(&self, _image: &Path, mountpoint: &Path, shadow: Option<&Path>) -> Result<()> {
        self.calls.borrow_mut().push("attach".to_string());
        if self.fail_attach {
            return Err(PatchsetError::ExternalToolFailure {
                tool: "hdiutil attach".to_string(),
                exit_code: Some(1),
                stdout: String::new(),
                stderr: "hdiutil: attach failed - Authentication error".to_string(),
            });
        }

        for relative in PAYLOAD_FILES.iter().chain(&self.extra_files) {
            let path = mountpoint.join(relative);
            fs::create_dir_all(path.parent().unwrap())?;
            fs::write(path, "")?;
        }
        if let Some(shadow) = shadow {
            fs::write(shadow, "overlay")?;
        }
        Ok(())
    }

    fn detach(&self, mountpoint: &Path) -> Result<()> {
        self.calls.borrow_mut().push("detach".to_string());
        if self.fail_detach {
            return Err(PatchsetError::ExternalToolFailure {
                tool: "hdiutil detach".to_string(),
                exit_code: Some(16),
                stdout: String::new(),
                stderr: "resource busy".to_string(),
            });
        }
        fs::remove_dir_all(mountpoint)?;
        fs::create_dir_all(mountpoint)?;
        Ok(())
    }
}

#[derive(Default)]
struct FakeFetcher {
    fetched: RefCell<Vec<String>>,
    fail: bool,
}

impl ArchiveFetcher for FakeFetcher {
    fn fetch(&self, url: &str, destination: &Path) -> Result<()> {
        self.fetched.borrow_mut().push(url.to_string());
        if self.fail {
            return Err(PatchsetError::download(url, "http status 404"));
        }
        fs::create_dir_all(destination.parent().unwrap())?;
        fs::write(destination, "dmg")?;
        Ok(())
    }
}

/// Writes `<output>/<id>-<profile>.plist` and records every build
struct FakeBuilder {
    output_dir: PathBuf,
    builds: RefCell<Vec<(String, BuildSettings)>>,
}

impl ConfigBuilder for FakeBuilder {
    fn build(&self, hardware: &HardwareProfile, settings: &BuildSettings) -> Result<PathBuf> {
        self.builds
            .borrow_mut()
            .push((hardware.id.clone(), settings.clone()));
        fs::create_dir_all(&self.output_dir)?;
        let artifact = self
            .output_dir
            .join(format!("{}-{}.plist", hardware.id, settings.profile));
        fs::write(&artifact, "<plist/>")?;
        Ok(artifact)
    }
}

/// Rejects artifacts whose name contains `reject`
struct FakeValidator {
    reject: Option<&'static str>,
}

impl ConfigValidator for FakeValidator {
    fn validate(&self, artifact: &Path) -> Result<()> {
        let name = artifact.file_name().unwrap().to_string_lossy();
        match self.reject {
            Some(needle) if name.contains(needle) => Err(PatchsetError::ExternalToolFailure {
                tool: "ocvalidate".to_string(),
                exit_code: Some(3),
                stdout: "Checking config.plist".to_string(),
                stderr: "Booter->Quirks: invalid value".to_string(),
            }),
            _ => Ok(()),
        }
    }
}

// =============================================================================
// Fixtures
// =============================================================================

fn test_catalog() -> PatchCatalog {
    PatchCatalog::new(vec![
        PatchGroup::builder("Reset Password", Category::Miscellaneous)
            .supported(RangeBound::kernel(22, 0), RangeBound::kernel(23, 99))
            .install("/usr/libexec", "resetpassword", "10.13.6")
            .build(),
        PatchGroup::builder("Intel Skylake", Category::Graphics)
            .supported(RangeBound::kernel(22, 0), RangeBound::kernel(23, 99))
            .install_either(
                Capability::SinceSonoma,
                "/System/Library/Extensions",
                "AppleIntelSKLGraphics.kext",
                patchset::TagSource::per_major("12.5"),
                "12.5",
            )
            .build(),
        PatchGroup::builder("Unused", Category::Miscellaneous)
            .supported(RangeBound::kernel(22, 0), RangeBound::kernel(23, 99))
            .install_if(
                Predicate::When(Capability::Since14_4),
                "/usr/libexec",
                "never-checked",
                "99.0",
            )
            .build(),
    ])
    .unwrap()
}

fn test_config(dir: &Path) -> HarnessConfig {
    let payload_dir = dir.join("payloads");
    HarnessConfig {
        payload_archive: payload_dir.join("Universal-Binaries.dmg"),
        payload_root: payload_dir.join("Universal-Binaries"),
        shadow_file: payload_dir.join("Universal-Binaries_overlay"),
        payload_dir,
        build_output_dir: dir.join("build"),
        supported_majors: vec![22, 23],
        legacy_majors: vec![22, 23],
        minor_min: 0,
        minor_max: 3,
        ..Default::default()
    }
}

fn with_archive(config: &HarnessConfig) {
    fs::create_dir_all(&config.payload_dir).unwrap();
    fs::write(&config.payload_archive, "dmg").unwrap();
}

// =============================================================================
// Payload phase
// =============================================================================

#[test]
fn test_sys_patch_mounts_validates_and_detaches() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage::default();
    let fetcher = FakeFetcher::default();

    let report = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&fetcher, &disk)
        .unwrap();

    assert_eq!(report.cells, 8);
    assert!(!report.borrowed_mount);
    assert!(report.orphans.is_empty());
    assert_eq!(disk.calls(), vec!["attach", "detach"]);
    assert!(fetcher.fetched.borrow().is_empty());
    assert!(!config.shadow_file.exists());
    assert!(fs::read_dir(&config.payload_dir).unwrap().all(|e| {
        let name = e.unwrap().file_name();
        !name.to_string_lossy().ends_with(".json")
    }));
}

#[test]
fn test_missing_payload_file_still_detaches() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    // 14.4 pulls in the entry with no payload behind it
    config.marketing_version = Some("14.4".to_string());
    config.supported_majors = vec![23];
    config.minor_min = 4;
    config.minor_max = 4;
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage::default();

    let err = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&FakeFetcher::default(), &disk)
        .unwrap_err();

    assert!(matches!(err, PatchsetError::VersionMatrix { major: 23, minor: 4, .. }));
    match err.root_cause() {
        PatchsetError::MissingPayloadFile { path } => {
            assert_eq!(path, &config.payload_root.join("99.0/usr/libexec/never-checked"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(disk.calls(), vec!["attach", "detach"]);
    assert!(!config.shadow_file.exists());
}

#[test]
fn test_detach_failure_does_not_mask_validation_failure() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.marketing_version = Some("14.4".to_string());
    config.supported_majors = vec![23];
    config.minor_min = 4;
    config.minor_max = 4;
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage {
        fail_detach: true,
        ..Default::default()
    };

    let err = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&FakeFetcher::default(), &disk)
        .unwrap_err();

    assert!(matches!(err.root_cause(), PatchsetError::MissingPayloadFile { .. }));
    assert_eq!(disk.calls(), vec!["attach", "detach"]);
}

#[test]
fn test_detach_failure_after_success_is_reported() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage {
        fail_detach: true,
        ..Default::default()
    };

    let err = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&FakeFetcher::default(), &disk)
        .unwrap_err();

    assert!(matches!(err, PatchsetError::ExternalToolFailure { exit_code: Some(16), .. }));
    assert!(!config.shadow_file.exists());
}

#[test]
fn test_attach_failure_is_fatal() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage {
        fail_attach: true,
        ..Default::default()
    };

    let err = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&FakeFetcher::default(), &disk)
        .unwrap_err();

    match err {
        PatchsetError::ExternalToolFailure { stderr, .. } => assert!(stderr.contains("Authentication")),
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(disk.calls(), vec!["attach"]);
}

#[test]
fn test_borrowed_mount_is_left_mounted() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    with_archive(&config);
    for relative in PAYLOAD_FILES {
        let path = config.payload_root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    let catalog = test_catalog();
    let disk = FakeDiskImage::default();

    let report = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&FakeFetcher::default(), &disk)
        .unwrap();

    assert!(report.borrowed_mount);
    assert!(disk.calls().is_empty());
    assert!(config.payload_root.join(".signed").exists());
}

#[test]
fn test_borrowed_mount_needs_no_archive() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    for relative in PAYLOAD_FILES {
        let path = config.payload_root.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, "").unwrap();
    }
    let catalog = test_catalog();
    let disk = FakeDiskImage::default();
    let fetcher = FakeFetcher {
        fail: true,
        ..Default::default()
    };

    let report = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&fetcher, &disk)
        .unwrap();

    assert!(report.borrowed_mount);
    assert_eq!(report.cells, 8);
    assert!(fetcher.fetched.borrow().is_empty());
    assert!(!config.payload_archive.exists());
    assert!(disk.calls().is_empty());
}

#[test]
fn test_archive_downloaded_when_missing() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let catalog = test_catalog();
    let fetcher = FakeFetcher::default();

    ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&fetcher, &FakeDiskImage::default())
        .unwrap();

    assert_eq!(*fetcher.fetched.borrow(), vec![config.download_url()]);
    assert!(config.payload_archive.exists());
}

#[test]
fn test_download_failure_is_fatal_before_mounting() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let catalog = test_catalog();
    let disk = FakeDiskImage::default();
    let fetcher = FakeFetcher {
        fail: true,
        ..Default::default()
    };

    let err = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&fetcher, &disk)
        .unwrap_err();

    assert!(matches!(err, PatchsetError::DownloadFailure { .. }));
    assert!(disk.calls().is_empty());
}

#[test]
fn test_orphans_reported_when_tracking_usage() {
    let dir = TempDir::new().unwrap();
    let mut config = test_config(dir.path());
    config.verify_unused_files = true;
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage {
        extra_files: vec!["11.7.10/usr/libexec/airportd", ".DS_Store"],
        ..Default::default()
    };

    let report = ValidationHarness::new(&config, &catalog)
        .validate_sys_patch(&FakeFetcher::default(), &disk)
        .unwrap();

    assert_eq!(
        report.orphans.into_iter().collect::<Vec<_>>(),
        vec![PathBuf::from("11.7.10/usr/libexec/airportd")]
    );
}

// =============================================================================
// Config matrix
// =============================================================================

#[test]
fn test_config_matrix_covers_both_settings_profiles() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let catalog = test_catalog();
    let builder = FakeBuilder {
        output_dir: config.build_output_dir.clone(),
        builds: RefCell::new(Vec::new()),
    };
    let hardware = vec![
        HardwareProfile::predefined("iMac12,2"),
        HardwareProfile::dumped("MacPro31_Stock", "MacPro3,1"),
    ];

    let count = ValidationHarness::new(&config, &catalog)
        .run_config_matrix(&builder, &FakeValidator { reject: None }, &hardware)
        .unwrap();

    assert_eq!(count, 4);
    let builds = builder.builds.borrow();
    let order: Vec<(&str, SettingsProfile)> = builds
        .iter()
        .map(|(id, settings)| (id.as_str(), settings.profile))
        .collect();
    assert_eq!(
        order,
        vec![
            ("iMac12,2", SettingsProfile::Default),
            ("MacPro31_Stock", SettingsProfile::Default),
            ("iMac12,2", SettingsProfile::Flipped),
            ("MacPro31_Stock", SettingsProfile::Flipped),
        ]
    );
    assert_eq!(builds[2].1.kext_variant, KextVariant::Debug);
    assert!(!config.build_output_dir.exists());
}

#[test]
fn test_config_matrix_failure_carries_validator_output() {
    let dir = TempDir::new().unwrap();
    let config = test_config(dir.path());
    let catalog = test_catalog();
    let builder = FakeBuilder {
        output_dir: config.build_output_dir.clone(),
        builds: RefCell::new(Vec::new()),
    };
    let hardware = vec![HardwareProfile::dumped("iMac81_Stock", "iMac8,1")];

    let err = ValidationHarness::new(&config, &catalog)
        .run_config_matrix(&builder, &FakeValidator { reject: Some("flipped") }, &hardware)
        .unwrap_err();

    match &err {
        PatchsetError::ConfigMatrix { model, settings, .. } => {
            assert_eq!(model, "iMac81_Stock");
            assert_eq!(settings, "flipped");
        }
        other => panic!("unexpected error: {other}"),
    }
    match err.root_cause() {
        PatchsetError::ExternalToolFailure { stdout, stderr, .. } => {
            assert_eq!(stdout, "Checking config.plist");
            assert!(stderr.contains("Booter->Quirks"));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert!(!config.build_output_dir.exists());
}

#[test]
fn test_full_run() {
    let dir = TempDir::new().unwrap();
    let config = HarnessConfig {
        predefined_models: vec!["MacBookPro11,3".to_string()],
        ..test_config(dir.path())
    };
    with_archive(&config);
    let catalog = test_catalog();
    let disk = FakeDiskImage::default();
    let fetcher = FakeFetcher::default();
    let builder = FakeBuilder {
        output_dir: config.build_output_dir.clone(),
        builds: RefCell::new(Vec::new()),
    };
    let validator = FakeValidator { reject: None };

    let tools = Toolset {
        fetcher: &fetcher,
        disk_image: &disk,
        builder: &builder,
        validator: &validator,
    };
    let report = ValidationHarness::new(&config, &catalog).run(&tools).unwrap();

    assert_eq!(report.cells, 8);
    assert_eq!(
        builder.builds.borrow().len(),
        2 * (1 + HardwareProfile::default_dumps().len())
    );
    assert_eq!(disk.calls(), vec!["attach", "detach"]);
}
