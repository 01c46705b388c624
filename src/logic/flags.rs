//! Capability flags derived from a `VersionContext`.
//!
//! Every conditional catalog entry is gated on one of these facts. They are
//! recomputed for each context and never cached across contexts.

use crate::types::darwin;
use crate::version::{DottedVersion, VersionContext, kernel};
use strum::{Display, EnumIter};

/// A boolean fact about the target OS version.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumIter)]
pub enum Capability {
    /// airportd sandbox regression shipped in 12.7.4, 13.6.5 and 14.4
    LegacyWifiCve,
    SinceMonterey,
    SinceVentura,
    SinceSonoma,
    ExactlyMonterey,
    ExactlyVentura,
    /// Darwin 21.1
    Since12_0Beta7,
    /// Darwin 21.5
    Since12_4,
    /// Darwin 21.6
    Since12_5,
    /// Darwin 22.4
    Since13_3,
    /// Darwin 23.2
    Since14_2,
    /// Darwin 23.4
    Since14_4,
}

/// Derived facts for one `VersionContext`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CapabilityFlags {
    pub affected_by_legacy_wifi_cve: bool,
    pub since_monterey: bool,
    pub since_ventura: bool,
    pub since_sonoma: bool,
    pub exactly_monterey: bool,
    pub exactly_ventura: bool,
    pub since_12_0_beta7: bool,
    pub since_12_4: bool,
    pub since_12_5: bool,
    pub since_13_3: bool,
    pub since_14_2: bool,
    pub since_14_4: bool,
}

impl CapabilityFlags {
    /// Whether `capability` holds for the context these flags were derived from.
    pub fn holds(&self, capability: Capability) -> bool {
        match capability {
            Capability::LegacyWifiCve => self.affected_by_legacy_wifi_cve,
            Capability::SinceMonterey => self.since_monterey,
            Capability::SinceVentura => self.since_ventura,
            Capability::SinceSonoma => self.since_sonoma,
            Capability::ExactlyMonterey => self.exactly_monterey,
            Capability::ExactlyVentura => self.exactly_ventura,
            Capability::Since12_0Beta7 => self.since_12_0_beta7,
            Capability::Since12_4 => self.since_12_4,
            Capability::Since12_5 => self.since_12_5,
            Capability::Since13_3 => self.since_13_3,
            Capability::Since14_2 => self.since_14_2,
            Capability::Since14_4 => self.since_14_4,
        }
    }
}

/// Compute every capability flag for `ctx`.
pub fn derive_flags(ctx: &VersionContext) -> CapabilityFlags {
    let major = ctx.kernel_major;
    let kernel = ctx.kernel();

    CapabilityFlags {
        affected_by_legacy_wifi_cve: is_affected_by_legacy_wifi_cve(major, &ctx.marketing_version),
        since_monterey: major >= darwin::MONTEREY,
        since_ventura: major >= darwin::VENTURA,
        since_sonoma: major >= darwin::SONOMA,
        exactly_monterey: major == darwin::MONTEREY,
        exactly_ventura: major == darwin::VENTURA,
        since_12_0_beta7: kernel >= kernel::MACOS_12_0_B7,
        since_12_4: kernel >= kernel::MACOS_12_4,
        since_12_5: kernel >= kernel::MACOS_12_5,
        since_13_3: kernel >= kernel::MACOS_13_3,
        since_14_2: kernel >= kernel::MACOS_14_2,
        since_14_4: kernel >= kernel::MACOS_14_4,
    }
}

/// First marketing release of each kernel major that carries the airportd fix.
const LEGACY_WIFI_CVE_FLOORS: &[(u32, &str)] = &[
    (darwin::MONTEREY, "12.7.4"),
    (darwin::VENTURA, "13.6.5"),
    (darwin::SONOMA, "14.4"),
];

/// Whether the target carries the airportd change that breaks the stock
/// legacy wireless binary.
///
/// Majors newer than Sonoma are always affected: no forward release ever
/// reverted the change. A marketing version that does not parse is treated
/// as not affected.
pub fn is_affected_by_legacy_wifi_cve(kernel_major: u32, marketing_version: &str) -> bool {
    if kernel_major > darwin::SONOMA {
        return true;
    }

    let Some(floor) = LEGACY_WIFI_CVE_FLOORS
        .iter()
        .find(|(major, _)| *major == kernel_major)
        .and_then(|(_, floor)| DottedVersion::parse(floor))
    else {
        return false;
    };

    DottedVersion::parse(marketing_version).is_some_and(|version| version >= floor)
}
