//! Shared enums and Darwin kernel constants
//!
//! String-facing enums derive strum so they round-trip through the CLI,
//! the harness config file and log output without hand-written tables.

use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};

/// XNU kernel major versions of the macOS releases the catalog refers to.
pub mod darwin {
    pub const SIERRA: u32 = 16;
    pub const HIGH_SIERRA: u32 = 17;
    pub const MOJAVE: u32 = 18;
    pub const CATALINA: u32 = 19;
    pub const BIG_SUR: u32 = 20;
    pub const MONTEREY: u32 = 21;
    pub const VENTURA: u32 = 22;
    pub const SONOMA: u32 = 23;
    /// Open upper bound used by groups that have no known end of life
    pub const MAX_OS: u32 = 99;
}

/// Display category of a patch group.
///
/// Pure namespacing: categories never influence resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum Category {
    Graphics,
    Audio,
    Networking,
    Brightness,
    Miscellaneous,
}

/// Framebuffer families whose payload directory depends on the target release.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, EnumIter)]
#[strum(serialize_all = "kebab-case")]
pub enum FramebufferFamily {
    /// AppleIntelFramebufferCapri.kext, AppleIntelHD4000Graphics.kext
    IvyBridge,
    /// GeForce.kext
    KeplerGeforce,
    /// Framebuffers last shipped in Monterey (Haswell, Broadwell, Skylake, AMD GCN/Polaris/Vega)
    MontereyCommon,
}

/// Global settings profile used by the config matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "lowercase")]
pub enum SettingsProfile {
    /// Stock settings as shipped
    #[default]
    Default,
    /// Every boolean toggle flipped from its default
    Flipped,
}

/// Kext build variant requested from the config builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
#[strum(serialize_all = "UPPERCASE")]
pub enum KextVariant {
    #[default]
    Release,
    Debug,
}

/// Serial output level requested from the config builder
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[derive(Display, EnumString, EnumIter)]
pub enum SerialSettings {
    #[default]
    None,
    Minimal,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;
    use strum::IntoEnumIterator;

    #[test]
    fn test_release_majors_are_ordered() {
        let majors = [
            darwin::SIERRA,
            darwin::HIGH_SIERRA,
            darwin::MOJAVE,
            darwin::CATALINA,
            darwin::BIG_SUR,
            darwin::MONTEREY,
            darwin::VENTURA,
            darwin::SONOMA,
            darwin::MAX_OS,
        ];
        assert!(majors.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn test_category_parse() {
        assert_eq!(Category::from_str("Graphics").unwrap(), Category::Graphics);
        assert_eq!(Category::iter().count(), 5);
    }

    #[test]
    fn test_framebuffer_family_display() {
        assert_eq!(FramebufferFamily::IvyBridge.to_string(), "ivy-bridge");
        assert_eq!(FramebufferFamily::MontereyCommon.to_string(), "monterey-common");
    }

    #[test]
    fn test_settings_display() {
        assert_eq!(SettingsProfile::Flipped.to_string(), "flipped");
        assert_eq!(KextVariant::Debug.to_string(), "DEBUG");
        assert_eq!(SerialSettings::Minimal.to_string(), "Minimal");
    }
}
