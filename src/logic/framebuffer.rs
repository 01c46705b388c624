//! Framebuffer source-tag ladder
//!
//! Several framebuffer kexts ship in three payload variants: the stock
//! historical build, a Sonoma rebuild, and a second rebuild for 14.4 and
//! newer. Each family names its own tags but shares the thresholds.

use crate::plan::SourceTag;
use crate::types::{FramebufferFamily, darwin};
use crate::version::{VersionContext, kernel};

/// Tag literals of one family, oldest tier first.
struct Ladder {
    base: &'static str,
    sonoma: &'static str,
    sonoma_14_4: &'static str,
}

fn ladder(family: FramebufferFamily) -> Ladder {
    match family {
        FramebufferFamily::IvyBridge => Ladder {
            base: "11.7.10",
            sonoma: "11.7.10-23",
            sonoma_14_4: "11.7.10-23.4",
        },
        FramebufferFamily::KeplerGeforce => Ladder {
            base: "12.0 Beta 6",
            sonoma: "12.0 Beta 6-23",
            sonoma_14_4: "12.0 Beta 6-23.4",
        },
        FramebufferFamily::MontereyCommon => Ladder {
            base: "12.5",
            sonoma: "12.5-23",
            sonoma_14_4: "12.5-23.4",
        },
    }
}

/// Pick the payload tag for `family` on the target in `ctx`.
///
/// Pre-Sonoma majors get the base tag. Sonoma below kernel 23.4 gets the
/// `-23` rebuild, and 23.4 onward gets the `-23.4` rebuild. Newer majors
/// stay on the last tier.
pub fn resolve_framebuffer_tag(family: FramebufferFamily, ctx: &VersionContext) -> SourceTag {
    let tags = ladder(family);

    let tag = if ctx.kernel_major < darwin::SONOMA {
        tags.base
    } else if ctx.kernel() < kernel::MACOS_14_4 {
        tags.sonoma
    } else {
        tags.sonoma_14_4
    };

    SourceTag::from(tag)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ctx(major: u32, minor: u32) -> VersionContext {
        VersionContext::new(major, minor, "", [20, 21, 22, 23])
    }

    #[test]
    fn test_ivy_bridge_ladder() {
        let family = FramebufferFamily::IvyBridge;
        assert_eq!(resolve_framebuffer_tag(family, &ctx(21, 0)).as_str(), "11.7.10");
        assert_eq!(resolve_framebuffer_tag(family, &ctx(23, 1)).as_str(), "11.7.10-23");
        assert_eq!(resolve_framebuffer_tag(family, &ctx(23, 4)).as_str(), "11.7.10-23.4");
    }

    #[test]
    fn test_kepler_ladder() {
        let family = FramebufferFamily::KeplerGeforce;
        assert_eq!(resolve_framebuffer_tag(family, &ctx(22, 9)).as_str(), "12.0 Beta 6");
        assert_eq!(resolve_framebuffer_tag(family, &ctx(23, 3)).as_str(), "12.0 Beta 6-23");
        assert_eq!(resolve_framebuffer_tag(family, &ctx(23, 6)).as_str(), "12.0 Beta 6-23.4");
    }

    #[test]
    fn test_monterey_common_ladder() {
        let family = FramebufferFamily::MontereyCommon;
        assert_eq!(resolve_framebuffer_tag(family, &ctx(20, 0)).as_str(), "12.5");
        assert_eq!(resolve_framebuffer_tag(family, &ctx(23, 0)).as_str(), "12.5-23");
        assert_eq!(resolve_framebuffer_tag(family, &ctx(24, 0)).as_str(), "12.5-23.4");
    }
}
