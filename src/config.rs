//! Harness configuration file handling.
//!
//! Every path and external tool the validation harness touches is named here,
//! so a CI job can point the harness at its own checkout with one JSON file.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::tools::SUPPORTED_MODELS;
use crate::types::darwin;
use crate::version::KernelVersion;

/// Validation harness configuration that can be saved/loaded
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    // Payload store
    pub payload_dir: PathBuf,
    pub payload_archive: PathBuf,
    pub payload_root: PathBuf,
    pub shadow_file: PathBuf,
    pub use_shadow: bool,
    pub image_passphrase: String,

    // Archive download
    pub support_pkg_version: String,
    pub download_url_template: String, // `{version}` is substituted

    // External tools
    pub hdiutil_path: PathBuf,
    pub validator_path: PathBuf,
    pub builder_program: PathBuf,
    pub builder_args: Vec<String>,
    pub build_output_dir: PathBuf,

    // Version matrix
    pub supported_majors: Vec<u32>,
    pub legacy_majors: Vec<u32>,
    pub minor_min: u32,
    pub minor_max: u32,
    pub marketing_version: Option<String>,

    // Config matrix
    pub predefined_models: Vec<String>,

    pub verify_unused_files: bool,
}

impl Default for HarnessConfig {
    fn default() -> Self {
        let payload_dir = PathBuf::from("payloads");
        Self {
            payload_archive: payload_dir.join("Universal-Binaries.dmg"),
            payload_root: payload_dir.join("Universal-Binaries"),
            shadow_file: payload_dir.join("Universal-Binaries_overlay"),
            validator_path: payload_dir.join("ocvalidate"),
            payload_dir,
            use_shadow: true,
            image_passphrase: "password".to_string(),
            support_pkg_version: "1.4.9".to_string(),
            download_url_template:
                "https://github.com/dortania/PatcherSupportPkg/releases/download/{version}/Universal-Binaries.dmg"
                    .to_string(),
            hdiutil_path: PathBuf::from("/usr/bin/hdiutil"),
            builder_program: PathBuf::from("opencore-build"),
            builder_args: Vec::new(),
            build_output_dir: PathBuf::from("build"),
            supported_majors: vec![darwin::BIG_SUR, darwin::MONTEREY, darwin::VENTURA, darwin::SONOMA],
            legacy_majors: vec![darwin::BIG_SUR, darwin::MONTEREY, darwin::VENTURA, darwin::SONOMA],
            minor_min: 0,
            minor_max: 9,
            marketing_version: None,
            predefined_models: SUPPORTED_MODELS.iter().map(ToString::to_string).collect(),
            verify_unused_files: false,
        }
    }
}

impl HarnessConfig {
    pub fn new() -> Self {
        Self::default()
    }

    /// Save configuration to a JSON file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let json = serde_json::to_string_pretty(self)
            .context("Failed to serialize configuration to JSON")?;

        fs::write(&path, json)
            .with_context(|| format!("Failed to write configuration to {:?}", path.as_ref()))?;

        Ok(())
    }

    /// Load configuration from a JSON file. Missing fields take their defaults.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read configuration from {:?}", path.as_ref()))?;

        let config: Self =
            serde_json::from_str(&content).context("Failed to parse configuration JSON")?;

        Ok(config)
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.supported_majors.is_empty() {
            anyhow::bail!("At least one supported kernel major must be given");
        }

        if self.legacy_majors.is_empty() {
            anyhow::bail!("Legacy kernel majors must not be empty");
        }
        if self.legacy_majors.windows(2).any(|w| w[0] >= w[1]) {
            anyhow::bail!(
                "Legacy kernel majors must be strictly ascending, got {:?}",
                self.legacy_majors
            );
        }

        if self.minor_min > self.minor_max {
            anyhow::bail!(
                "Minor range is empty: {} > {}",
                self.minor_min,
                self.minor_max
            );
        }
        // Matrix minors stay single-digit
        if self.minor_max > 9 {
            anyhow::bail!("Maximum kernel minor must be at most 9, got {}", self.minor_max);
        }

        if !self.download_url_template.contains("{version}") {
            anyhow::bail!("Download URL template must contain {{version}}");
        }

        if self.support_pkg_version.trim().is_empty() {
            anyhow::bail!("Support package version must be specified");
        }

        Ok(())
    }

    /// Download URL for the configured support package release
    pub fn download_url(&self) -> String {
        self.download_url_template
            .replace("{version}", &self.support_pkg_version)
    }

    /// Every `(major, minor)` cell of the version matrix, in run order
    pub fn version_matrix(&self) -> Vec<KernelVersion> {
        self.supported_majors
            .iter()
            .flat_map(|&major| {
                (self.minor_min..=self.minor_max).map(move |minor| KernelVersion::new(major, minor))
            })
            .collect()
    }

    /// Shadow overlay path, if attaching through one
    pub fn shadow(&self) -> Option<&Path> {
        self.use_shadow.then_some(self.shadow_file.as_path())
    }
}
