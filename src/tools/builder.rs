//! External config builder and validator
//!
//! The harness never looks inside a build. It asks a builder for an artifact
//! for one hardware profile and one settings profile, then hands the artifact
//! path to a validator that answers with its exit code.

use crate::error::{PatchsetError, Result};
use crate::tool_runner::run_tool;
use crate::tool_traits::ToolInvocation;
use crate::types::{KextVariant, SerialSettings, SettingsProfile};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Produces a build artifact for one matrix cell.
pub trait ConfigBuilder {
    /// Build for `hardware` with `settings`, returning the artifact path.
    fn build(&self, hardware: &HardwareProfile, settings: &BuildSettings) -> Result<PathBuf>;
}

/// Checks a build artifact. A non-zero exit is `ExternalToolFailure`.
pub trait ConfigValidator {
    fn validate(&self, artifact: &Path) -> Result<()>;
}

// ============================================================================
// Hardware profiles
// ============================================================================

/// Model identifiers the patcher supports, built with stock hardware
pub const SUPPORTED_MODELS: &[&str] = &[
    // MacBook
    "MacBook5,1", "MacBook5,2", "MacBook6,1", "MacBook7,1", "MacBook8,1", "MacBook9,1", "MacBook10,1",
    // MacBook Air
    "MacBookAir2,1", "MacBookAir3,1", "MacBookAir3,2", "MacBookAir4,1", "MacBookAir4,2",
    "MacBookAir5,1", "MacBookAir5,2", "MacBookAir6,1", "MacBookAir6,2", "MacBookAir7,1",
    "MacBookAir7,2",
    // MacBook Pro
    "MacBookPro4,1", "MacBookPro5,1", "MacBookPro5,2", "MacBookPro5,3", "MacBookPro5,4",
    "MacBookPro5,5", "MacBookPro6,1", "MacBookPro6,2", "MacBookPro7,1", "MacBookPro8,1",
    "MacBookPro8,2", "MacBookPro8,3", "MacBookPro9,1", "MacBookPro9,2", "MacBookPro10,1",
    "MacBookPro10,2", "MacBookPro11,1", "MacBookPro11,2", "MacBookPro11,3", "MacBookPro11,4",
    "MacBookPro11,5", "MacBookPro12,1", "MacBookPro13,1", "MacBookPro13,2", "MacBookPro13,3",
    "MacBookPro14,1", "MacBookPro14,2", "MacBookPro14,3",
    // Mac mini
    "Macmini3,1", "Macmini4,1", "Macmini5,1", "Macmini5,2", "Macmini5,3", "Macmini6,1", "Macmini6,2",
    "Macmini7,1",
    // iMac
    "iMac7,1", "iMac8,1", "iMac9,1", "iMac10,1", "iMac11,1", "iMac11,2", "iMac11,3", "iMac12,1",
    "iMac12,2", "iMac13,1", "iMac13,2", "iMac13,3", "iMac14,1", "iMac14,2", "iMac14,3", "iMac14,4",
    "iMac15,1", "iMac16,1", "iMac16,2", "iMac17,1", "iMac18,1", "iMac18,2", "iMac18,3",
    // Mac Pro and Xserve
    "MacPro3,1", "MacPro4,1", "MacPro5,1", "MacPro6,1", "Xserve2,1", "Xserve3,1",
];

/// A machine to build for: either a bare model identifier or a dumped
/// hardware description known to the builder by `id`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HardwareProfile {
    pub id: String,
    pub model: String,
}

impl HardwareProfile {
    /// A predefined model with stock hardware
    pub fn predefined(model: impl Into<String>) -> Self {
        let model = model.into();
        Self {
            id: model.clone(),
            model,
        }
    }

    pub fn dumped(id: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            model: model.into(),
        }
    }

    /// Dumped machines covering every GPU generation the catalog patches
    pub fn default_dumps() -> Vec<Self> {
        [
            ("MacBookPro92_Stock", "MacBookPro9,2"),
            ("MacBookPro111_Stock", "MacBookPro11,1"),
            ("MacBookPro133_Stock", "MacBookPro13,3"),
            ("Macmini52_Stock", "Macmini5,2"),
            ("Macmini61_Stock", "Macmini6,1"),
            ("Macmini71_Stock", "Macmini7,1"),
            ("iMac81_Stock", "iMac8,1"),
            ("iMac112_Stock", "iMac11,2"),
            ("iMac122_Upgraded", "iMac12,2"),
            ("iMac122_Upgraded_Nvidia", "iMac12,2"),
            ("iMac151_Stock", "iMac15,1"),
            ("MacPro31_Stock", "MacPro3,1"),
            ("MacPro31_Upgrade", "MacPro3,1"),
            ("MacPro31_Modern_AMD", "MacPro3,1"),
            ("MacPro31_Modern_Kepler", "MacPro3,1"),
            ("MacPro41_Upgrade", "MacPro4,1"),
            ("MacPro41_Modern_AMD", "MacPro4,1"),
            ("MacPro41_51_Flashed_Modern_AMD", "MacPro5,1"),
            ("MacPro41_51_Flashed_NVIDIA_WEB_DRIVERS", "MacPro5,1"),
        ]
        .into_iter()
        .map(|(id, model)| Self::dumped(id, model))
        .collect()
    }
}

// ============================================================================
// Build settings
// ============================================================================

/// Global build toggles handed to the builder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSettings {
    pub profile: SettingsProfile,
    pub verbose_debug: bool,
    pub opencore_debug: bool,
    pub kext_debug: bool,
    pub kext_variant: KextVariant,
    pub show_picker: bool,
    pub sip_enabled: bool,
    pub secure_boot: bool,
    pub firewire_boot: bool,
    pub nvme_boot: bool,
    pub wake_on_wlan: bool,
    pub disable_thunderbolt: bool,
    pub force_surplus: bool,
    pub software_demux: bool,
    pub serial_settings: SerialSettings,
}

impl Default for BuildSettings {
    fn default() -> Self {
        Self {
            profile: SettingsProfile::Default,
            verbose_debug: false,
            opencore_debug: false,
            kext_debug: false,
            kext_variant: KextVariant::Release,
            show_picker: true,
            sip_enabled: true,
            secure_boot: false,
            firewire_boot: false,
            nvme_boot: false,
            wake_on_wlan: false,
            disable_thunderbolt: false,
            force_surplus: false,
            software_demux: false,
            serial_settings: SerialSettings::None,
        }
    }
}

impl BuildSettings {
    /// Every toggle flipped away from its default
    pub fn maximally_flipped() -> Self {
        Self {
            profile: SettingsProfile::Flipped,
            verbose_debug: true,
            opencore_debug: true,
            kext_debug: true,
            kext_variant: KextVariant::Debug,
            show_picker: false,
            sip_enabled: false,
            secure_boot: true,
            firewire_boot: true,
            nvme_boot: true,
            wake_on_wlan: true,
            disable_thunderbolt: true,
            force_surplus: true,
            software_demux: true,
            serial_settings: SerialSettings::Minimal,
        }
    }

    pub fn for_profile(profile: SettingsProfile) -> Self {
        match profile {
            SettingsProfile::Default => Self::default(),
            SettingsProfile::Flipped => Self::maximally_flipped(),
        }
    }

    /// Environment contract of the builder
    pub fn to_env_vars(&self) -> Vec<(String, String)> {
        let flag = |b: bool| if b { "1" } else { "0" }.to_string();

        vec![
            ("PATCHSET_SETTINGS_PROFILE".to_string(), self.profile.to_string()),
            ("PATCHSET_VERBOSE_DEBUG".to_string(), flag(self.verbose_debug)),
            ("PATCHSET_OPENCORE_DEBUG".to_string(), flag(self.opencore_debug)),
            ("PATCHSET_KEXT_DEBUG".to_string(), flag(self.kext_debug)),
            ("PATCHSET_KEXT_VARIANT".to_string(), self.kext_variant.to_string()),
            ("PATCHSET_SHOW_PICKER".to_string(), flag(self.show_picker)),
            ("PATCHSET_SIP_ENABLED".to_string(), flag(self.sip_enabled)),
            ("PATCHSET_SECURE_BOOT".to_string(), flag(self.secure_boot)),
            ("PATCHSET_FIREWIRE_BOOT".to_string(), flag(self.firewire_boot)),
            ("PATCHSET_NVME_BOOT".to_string(), flag(self.nvme_boot)),
            ("PATCHSET_WAKE_ON_WLAN".to_string(), flag(self.wake_on_wlan)),
            ("PATCHSET_DISABLE_THUNDERBOLT".to_string(), flag(self.disable_thunderbolt)),
            ("PATCHSET_FORCE_SURPLUS".to_string(), flag(self.force_surplus)),
            ("PATCHSET_SOFTWARE_DEMUX".to_string(), flag(self.software_demux)),
            ("PATCHSET_SERIAL_SETTINGS".to_string(), self.serial_settings.to_string()),
        ]
    }
}

// ============================================================================
// Command-backed implementations
// ============================================================================

/// Builder run as an external command:
/// `<program> <args...> --model <model> --profile <id> --output <dir>`
/// with settings passed through the environment.
#[derive(Debug, Clone)]
pub struct CommandConfigBuilder {
    pub program: PathBuf,
    pub args: Vec<String>,
    pub output_dir: PathBuf,
}

/// Artifact location inside the builder output
pub fn artifact_path(output_dir: &Path) -> PathBuf {
    output_dir.join("EFI").join("OC").join("config.plist")
}

pub struct BuildArgs<'a> {
    pub program: &'a Path,
    pub extra_args: &'a [String],
    pub hardware: &'a HardwareProfile,
    pub settings: &'a BuildSettings,
    pub output_dir: &'a Path,
}

impl ToolInvocation for BuildArgs<'_> {
    fn program(&self) -> &Path {
        self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        let mut args = self.extra_args.to_vec();
        args.extend([
            "--model".to_string(),
            self.hardware.model.clone(),
            "--profile".to_string(),
            self.hardware.id.clone(),
            "--output".to_string(),
            self.output_dir.display().to_string(),
        ]);
        args
    }

    fn get_env_vars(&self) -> Vec<(String, String)> {
        self.settings.to_env_vars()
    }

    fn tool_name(&self) -> String {
        format!("config builder ({})", self.hardware.id)
    }
}

impl ConfigBuilder for CommandConfigBuilder {
    fn build(&self, hardware: &HardwareProfile, settings: &BuildSettings) -> Result<PathBuf> {
        // The output directory is shared by every build in the matrix
        let artifact = artifact_path(&self.output_dir);
        match fs::remove_file(&artifact) {
            Ok(()) => debug!("Removed previous artifact {}", artifact.display()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        let args = BuildArgs {
            program: &self.program,
            extra_args: &self.args,
            hardware,
            settings,
            output_dir: &self.output_dir,
        };
        let output = run_tool(&args)?.ensure_success()?;

        if !artifact.is_file() {
            return Err(PatchsetError::ExternalToolFailure {
                tool: output.tool,
                exit_code: output.exit_code,
                stdout: output.stdout,
                stderr: format!("no build artifact at {}", artifact.display()),
            });
        }
        Ok(artifact)
    }
}

/// `ocvalidate <artifact>`
#[derive(Debug, Clone)]
pub struct OcValidate {
    pub program: PathBuf,
}

pub struct ValidateArgs<'a> {
    pub program: &'a Path,
    pub artifact: &'a Path,
}

impl ToolInvocation for ValidateArgs<'_> {
    fn program(&self) -> &Path {
        self.program
    }

    fn to_cli_args(&self) -> Vec<String> {
        vec![self.artifact.display().to_string()]
    }

    fn tool_name(&self) -> String {
        "ocvalidate".to_string()
    }
}

impl ConfigValidator for OcValidate {
    fn validate(&self, artifact: &Path) -> Result<()> {
        run_tool(&ValidateArgs {
            program: &self.program,
            artifact,
        })?
        .ensure_success()?;
        Ok(())
    }
}
