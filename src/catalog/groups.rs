//! Standard legacy-hardware catalog
//!
//! Declaration order matters: it is the merge order of the resolver.

use super::{PatchGroup, PatchGroupBuilder, Predicate, RangeBound, TagSource};
use crate::logic::flags::Capability;
use crate::types::{Category, FramebufferFamily, darwin};

const EXTENSIONS: &str = "/System/Library/Extensions";
const FRAMEWORKS: &str = "/System/Library/Frameworks";
const PRIVATE_FRAMEWORKS: &str = "/System/Library/PrivateFrameworks";
const LIBEXEC: &str = "/usr/libexec";
const SKYLIGHT_PLUGINS: &str = "/Library/Application Support/SkyLightPlugins";
const GRAPHICS_CONTROL_PLUGINS: &str =
    "/System/Library/Extensions/AppleGraphicsControl.kext/Contents/PlugIns";

const GLOBAL_DEFAULTS: &str = "/usr/bin/defaults write /Library/Preferences/.GlobalPreferences.plist";
const WEB_DRIVER: &str = "WebDriver-387.10.10.10.40.140";

const MONTEREY_FB: FramebufferFamily = FramebufferFamily::MontereyCommon;

// ============================================================================
// Shared Fragments
// ============================================================================

/// Bound to the non-metal majors of the context
fn non_metal(b: PatchGroupBuilder) -> PatchGroupBuilder {
    b.supported(
        RangeBound::OldestLegacy { minor: 0 },
        RangeBound::NewestLegacy { minor: 99 },
    )
}

/// From `major.minor` with no upper end
fn since(major: u32, minor: u32) -> impl FnOnce(PatchGroupBuilder) -> PatchGroupBuilder {
    move |b| b.supported(RangeBound::kernel(major, minor), RangeBound::kernel(darwin::MAX_OS, 99))
}

/// Exactly one major release
fn only(major: u32) -> impl FnOnce(PatchGroupBuilder) -> PatchGroupBuilder {
    move |b| b.supported(RangeBound::kernel(major, 0), RangeBound::kernel(major, 99))
}

fn when(capability: Capability) -> Predicate {
    Predicate::When(capability)
}

fn unless(capability: Capability) -> Predicate {
    Predicate::Unless(capability)
}

fn graphics(name: &str) -> PatchGroupBuilder {
    PatchGroup::builder(name, Category::Graphics)
}

/// Every group, in merge order
pub fn standard_groups() -> Vec<PatchGroup> {
    let mut groups = graphics_groups();
    groups.extend(audio_groups());
    groups.extend(networking_groups());
    groups.extend(brightness_groups());
    groups.extend(miscellaneous_groups());
    groups
}

// ============================================================================
// Graphics
// ============================================================================

fn graphics_groups() -> Vec<PatchGroup> {
    let mut groups = non_metal_groups();
    groups.extend(metal_groups());
    groups.extend(gva_and_opencl_groups());
    groups.extend(nvidia_groups());
    groups.extend(amd_groups());
    groups.extend(intel_groups());
    groups
}

fn non_metal_groups() -> Vec<PatchGroup> {
    vec![
        graphics("Non-Metal Common")
            .with(non_metal)
            .install(EXTENSIONS, "IOSurface.kext", "10.15.7")
            .install(FRAMEWORKS, "OpenGL.framework", "10.14.3")
            .install(FRAMEWORKS, "CoreDisplay.framework", TagSource::per_major("10.14.4"))
            .install(FRAMEWORKS, "IOSurface.framework", TagSource::per_major("10.15.7"))
            .install(FRAMEWORKS, "QuartzCore.framework", TagSource::per_major("10.15.7"))
            .install(PRIVATE_FRAMEWORKS, "GPUSupport.framework", "10.14.3")
            .install(PRIVATE_FRAMEWORKS, "SkyLight.framework", TagSource::per_major("10.14.6"))
            .install_if(when(Capability::SinceSonoma), PRIVATE_FRAMEWORKS, "FaceCore.framework", "13.5")
            .install_if(when(Capability::SinceMonterey), "/System/Applications", "Photo Booth.app", "11.7.9")
            .remove(
                EXTENSIONS,
                &[
                    "AMDRadeonX4000.kext",
                    "AMDRadeonX4000HWServices.kext",
                    "AMDRadeonX5000.kext",
                    "AMDRadeonX5000HWServices.kext",
                    "AMDRadeonX6000.kext",
                    "AMDRadeonX6000Framebuffer.kext",
                    "AMDRadeonX6000HWServices.kext",
                    "AppleIntelBDWGraphics.kext",
                    "AppleIntelBDWGraphicsFramebuffer.kext",
                    "AppleIntelCFLGraphicsFramebuffer.kext",
                    "AppleIntelHD4000Graphics.kext",
                    "AppleIntelHD5000Graphics.kext",
                    "AppleIntelICLGraphics.kext",
                    "AppleIntelICLLPGraphicsFramebuffer.kext",
                    "AppleIntelKBLGraphics.kext",
                    "AppleIntelKBLGraphicsFramebuffer.kext",
                    "AppleIntelSKLGraphics.kext",
                    "AppleIntelSKLGraphicsFramebuffer.kext",
                    "AppleIntelFramebufferAzul.kext",
                    "AppleIntelFramebufferCapri.kext",
                    "AppleParavirtGPU.kext",
                    "GeForce.kext",
                    "IOAcceleratorFamily2.kext",
                    "IOGPUFamily.kext",
                    "AppleAfterburner.kext",
                ],
            )
            .install_user_if(when(Capability::SinceMonterey), SKYLIGHT_PLUGINS, "DropboxHack.dylib", "SkyLightPlugins")
            .install_user_if(when(Capability::SinceMonterey), SKYLIGHT_PLUGINS, "DropboxHack.txt", "SkyLightPlugins")
            // "When Space Allows" clock option arrived in 12.4
            .process_if(when(Capability::Since12_4), &format!("{} ShowDate -int 1", GLOBAL_DEFAULTS), true)
            .process(
                &format!("{} InternalDebugUseGPUProcessForCanvasRenderingEnabled -bool false", GLOBAL_DEFAULTS),
                true,
            )
            .process(
                &format!("{} WebKitExperimentalUseGPUProcessForCanvasRenderingEnabled -bool false", GLOBAL_DEFAULTS),
                true,
            )
            .process_if(
                when(Capability::SinceSonoma),
                &format!("{} WebKitPreferences.acceleratedDrawingEnabled -bool false", GLOBAL_DEFAULTS),
                true,
            )
            .process_if(
                when(Capability::SinceSonoma),
                &format!("{} NSEnableAppKitMenus -bool false", GLOBAL_DEFAULTS),
                true,
            )
            .process_if(
                when(Capability::SinceSonoma),
                &format!("{} NSZoomButtonShowMenu -bool false", GLOBAL_DEFAULTS),
                true,
            )
            .build(),
        // TeraScale 2 and the web drivers need the High Sierra IOAccelerator structs
        graphics("Non-Metal IOAccelerator Common")
            .with(non_metal)
            .install(EXTENSIONS, "IOAcceleratorFamily2.kext", "10.13.6")
            .install(EXTENSIONS, "IOSurface.kext", "10.14.6")
            .install(FRAMEWORKS, "IOSurface.framework", TagSource::per_major("10.14.6"))
            .install(FRAMEWORKS, "OpenCL.framework", "10.13.6")
            .install(PRIVATE_FRAMEWORKS, "GPUSupport.framework", "10.13.6")
            .install(PRIVATE_FRAMEWORKS, "IOAccelerator.framework", TagSource::per_major("10.13.6"))
            .remove(EXTENSIONS, &["AppleCameraInterface.kext"])
            .build(),
        graphics("Non-Metal CoreDisplay Common")
            .with(non_metal)
            .install(FRAMEWORKS, "CoreDisplay.framework", TagSource::per_major("10.13.6"))
            .build(),
        // Development only: forces High Sierra Metal kexts into non-Metal mode
        graphics("Non-Metal Enforcement")
            .with(non_metal)
            .process("/usr/bin/defaults write /Library/Preferences/com.apple.CoreDisplay useMetal -boolean no", true)
            .process("/usr/bin/defaults write /Library/Preferences/com.apple.CoreDisplay useIOP -boolean no", true)
            .build(),
        graphics("Revert Non-Metal ColorSync Workaround")
            .with(only(darwin::VENTURA))
            .remove(
                "/System/Library/Frameworks/ColorSync.framework/Versions/A",
                &["ColorSync", "ColorSyncOld.dylib"],
            )
            .build(),
    ]
}

fn metal_groups() -> Vec<PatchGroup> {
    vec![
        graphics("Metal Common")
            .with(since(darwin::VENTURA, 0))
            .install(FRAMEWORKS, "Metal.framework", "12.5")
            .install(FRAMEWORKS, "MetalPerformanceShaders.framework", "12.5")
            .build(),
        // Kepler on Ventura needs the stock Metal back
        graphics("Revert Metal Downgrade")
            .with(only(darwin::VENTURA))
            .remove("/System/Library/Frameworks/Metal.framework/Versions/A/", &["Metal", "MetalOld.dylib"])
            .remove(
                "/System/Library/Frameworks/MetalPerformanceShaders.framework/Versions/A/Frameworks/MPSCore.framework/Versions/A",
                &["MPSCore"],
            )
            .build(),
        // Monterey WebKit sandbox profile fails to render on these GPUs
        graphics("WebKit Monterey Common")
            .with(only(darwin::MONTEREY))
            .install(FRAMEWORKS, "WebKit.framework", "11.6")
            .install_user("/Library/Apple/System/Library/StagedFrameworks/Safari", "WebKit.framework", "11.6")
            .build(),
        // Ivy Bridge, Haswell and Kepler compile Metal for the 3802 family
        graphics("Metal 3802 Common")
            .with(since(darwin::VENTURA, 0))
            .install(FRAMEWORKS, "Metal.framework", TagSource::per_major("12.5-3802"))
            .install(PRIVATE_FRAMEWORKS, "MTLCompiler.framework", "12.5-3802")
            .install(PRIVATE_FRAMEWORKS, "GPUCompiler.framework", "12.5-3802")
            .install("/System/Library/Sandbox/Profiles", "com.apple.mtlcompilerservice.sb", "12.5-3802")
            .build(),
        // 13.3 broke 3802 again; 14.2 broke the compiler once more
        graphics("Metal 3802 Common Extended")
            .with(since(darwin::VENTURA, 4))
            .install(FRAMEWORKS, "Metal.framework", TagSource::per_major("13.2.1"))
            .install_if(when(Capability::SinceSonoma), FRAMEWORKS, "CoreImage.framework", "14.0 Beta 3")
            .install_if(when(Capability::ExactlyVentura), PRIVATE_FRAMEWORKS, "MTLCompiler.framework", "13.2.1")
            .install_if(when(Capability::ExactlyVentura), PRIVATE_FRAMEWORKS, "GPUCompiler.framework", "13.2.1")
            .install_either(
                Capability::ExactlyVentura,
                PRIVATE_FRAMEWORKS,
                "RenderBox.framework",
                "13.2.1-3802",
                "14.0-3802",
            )
            .install_if(when(Capability::Since14_2), PRIVATE_FRAMEWORKS, "MTLCompiler.framework", "14.2 Beta 1")
            .install_if(when(Capability::Since14_2), PRIVATE_FRAMEWORKS, "GPUCompiler.framework", "14.2 Beta 1")
            .build(),
    ]
}

fn gva_and_opencl_groups() -> Vec<PatchGroup> {
    vec![
        graphics("Revert GVA Downgrade")
            .with(since(darwin::VENTURA, 0))
            .remove("/System/Library/PrivateFrameworks/AppleGVA.framework/Versions/A/", &["AppleGVA"])
            .remove("/System/Library/PrivateFrameworks/AppleGVACore.framework/Versions/A/", &["AppleGVACore"])
            .build(),
        graphics("Catalina GVA")
            .with(since(darwin::MONTEREY, 0))
            .install(PRIVATE_FRAMEWORKS, "AppleGVA.framework", "11.7.10")
            .install(PRIVATE_FRAMEWORKS, "AppleGVACore.framework", "11.7.10")
            .build(),
        graphics("Monterey GVA")
            .with(since(darwin::VENTURA, 0))
            .install(PRIVATE_FRAMEWORKS, "AppleGVA.framework", "12.5")
            .install(PRIVATE_FRAMEWORKS, "AppleGVACore.framework", "12.5")
            .build(),
        graphics("High Sierra GVA")
            .supported(RangeBound::OldestLegacy { minor: 0 }, RangeBound::kernel(darwin::MAX_OS, 99))
            .install(PRIVATE_FRAMEWORKS, "AppleGVA.framework", "10.13.6")
            .install(PRIVATE_FRAMEWORKS, "AppleGVACore.framework", "10.15.7")
            .build(),
        graphics("Big Sur OpenCL")
            .with(since(darwin::MONTEREY, 0))
            .install(FRAMEWORKS, "OpenCL.framework", "11.6")
            .build(),
        graphics("Monterey OpenCL")
            .with(since(darwin::VENTURA, 0))
            .install(FRAMEWORKS, "OpenCL.framework", "12.5")
            .build(),
        // Ventura compilers use AVX2.0
        graphics("AMD OpenCL")
            .with(since(darwin::VENTURA, 0))
            .install(FRAMEWORKS, "OpenCL.framework", "12.5 non-AVX2.0")
            .install(FRAMEWORKS, "OpenGL.framework", "12.5 non-AVX2.0")
            .build(),
    ]
}

fn nvidia_groups() -> Vec<PatchGroup> {
    vec![
        graphics("Nvidia Tesla")
            .display_name("Graphics: Nvidia Tesla")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "GeForceGA.bundle", "10.13.6")
            .install(EXTENSIONS, "GeForceTesla.kext", "10.13.6")
            .install(EXTENSIONS, "GeForceTeslaGLDriver.bundle", "10.13.6")
            .install(EXTENSIONS, "GeForceTeslaVADriver.bundle", "10.13.6")
            .install(EXTENSIONS, "NVDANV50HalTesla.kext", "10.13.6")
            .install(EXTENSIONS, "NVDAResmanTesla.kext", "10.13.6")
            // NVDAStartup left the OS in 12.0 Beta 7
            .install_if(when(Capability::Since12_0Beta7), EXTENSIONS, "NVDAStartup.kext", "12.0 Beta 6")
            .build(),
        graphics("Nvidia Kepler")
            .display_name("Graphics: Nvidia Kepler")
            .with(since(darwin::MONTEREY, 1))
            .install(EXTENSIONS, "GeForce.kext", FramebufferFamily::KeplerGeforce)
            .install(EXTENSIONS, "NVDAGF100Hal.kext", "12.0 Beta 6")
            .install(EXTENSIONS, "NVDAGK100Hal.kext", "12.0 Beta 6")
            .install(EXTENSIONS, "NVDAResman.kext", "12.0 Beta 6")
            .install(EXTENSIONS, "NVDAStartup.kext", "12.0 Beta 6")
            .install(EXTENSIONS, "GeForceAIRPlugin.bundle", "11.0 Beta 3")
            .install(EXTENSIONS, "GeForceGLDriver.bundle", "11.0 Beta 3")
            .install_either(
                Capability::SinceVentura,
                EXTENSIONS,
                "GeForceMTLDriver.bundle",
                "11.0 Beta 3-22",
                "11.0 Beta 3",
            )
            .install(EXTENSIONS, "GeForceVADriver.bundle", "12.0 Beta 6")
            .install_if(
                Predicate::AllOf(vec![when(Capability::Since12_5), unless(Capability::SinceVentura)]),
                FRAMEWORKS,
                "Metal.framework",
                "12.5 Beta 2",
            )
            .install(PRIVATE_FRAMEWORKS, "GPUCompiler.framework", "11.6")
            .build(),
        graphics("Nvidia Web Drivers")
            .display_name("Graphics: Nvidia Web Drivers")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "GeForceAIRPluginWeb.bundle", WEB_DRIVER)
            .install(EXTENSIONS, "GeForceGLDriverWeb.bundle", WEB_DRIVER)
            .install(EXTENSIONS, "GeForceMTLDriverWeb.bundle", WEB_DRIVER)
            .install(EXTENSIONS, "GeForceVADriverWeb.bundle", WEB_DRIVER)
            .install(EXTENSIONS, "GeForceTeslaGAWeb.bundle", WEB_DRIVER)
            .install(EXTENSIONS, "GeForceTeslaGLDriverWeb.bundle", WEB_DRIVER)
            .install(EXTENSIONS, "GeForceTeslaVADriverWeb.bundle", WEB_DRIVER)
            // Missing OpenCL compiler files
            .install_if(when(Capability::SinceMonterey), PRIVATE_FRAMEWORKS, "GPUCompiler.framework", "11.6")
            .install_user("/Library/Extensions", "GeForceWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAGF100HalWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAGK100HalWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAGM100HalWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAGP100HalWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAResmanWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAStartupWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "GeForceTeslaWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDANV50HalTeslaWeb.kext", WEB_DRIVER)
            .install_user("/Library/Extensions", "NVDAResmanTeslaWeb.kext", WEB_DRIVER)
            // Stock NVDAStartup matches before the web driver kexts load
            .remove(EXTENSIONS, &["NVDAStartup.kext"])
            .build(),
    ]
}

fn amd_groups() -> Vec<PatchGroup> {
    vec![
        graphics("AMD TeraScale Common")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "AMDFramebuffer.kext", "10.13.6")
            .install(EXTENSIONS, "AMDLegacyFramebuffer.kext", "10.13.6")
            .install(EXTENSIONS, "AMDLegacySupport.kext", "10.13.6")
            .install(EXTENSIONS, "AMDShared.bundle", "10.13.6")
            .install(EXTENSIONS, "AMDSupport.kext", "10.13.6")
            .remove(
                EXTENSIONS,
                &[
                    "AMD7000Controller.kext",
                    "AMD8000Controller.kext",
                    "AMD9000Controller.kext",
                    "AMD9500Controller.kext",
                    "AMD10000Controller.kext",
                ],
            )
            .build(),
        graphics("AMD TeraScale 1")
            .display_name("Graphics: AMD TeraScale 1")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "AMD2400Controller.kext", "10.13.6")
            .install(EXTENSIONS, "AMD2600Controller.kext", "10.13.6")
            .install(EXTENSIONS, "AMD3800Controller.kext", "10.13.6")
            .install(EXTENSIONS, "AMD4600Controller.kext", "10.13.6")
            .install(EXTENSIONS, "AMD4800Controller.kext", "10.13.6")
            .install_either(Capability::SinceVentura, EXTENSIONS, "ATIRadeonX2000.kext", "10.13.6 TS1", "10.13.6")
            .install(EXTENSIONS, "ATIRadeonX2000GA.plugin", "10.13.6")
            .install(EXTENSIONS, "ATIRadeonX2000GLDriver.bundle", "10.13.6")
            .install(EXTENSIONS, "ATIRadeonX2000VADriver.bundle", "10.13.6")
            // Leftovers from when TeraScale 1 and 2 shared one patch set
            .remove(
                EXTENSIONS,
                &[
                    "AMD5000Controller.kext",
                    "AMD6000Controller.kext",
                    "AMDRadeonVADriver.bundle",
                    "AMDRadeonVADriver2.bundle",
                    "AMDRadeonX3000.kext",
                    "AMDRadeonX3000GLDriver.bundle",
                ],
            )
            .build(),
        graphics("AMD TeraScale 2")
            .display_name("Graphics: AMD TeraScale 2")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "AMD5000Controller.kext", "10.13.6")
            .install(EXTENSIONS, "AMD6000Controller.kext", "10.13.6")
            .install(EXTENSIONS, "AMDRadeonVADriver.bundle", "10.13.6")
            .install(EXTENSIONS, "AMDRadeonVADriver2.bundle", "10.13.6")
            .install(EXTENSIONS, "AMDRadeonX3000.kext", "10.13.6")
            .install(EXTENSIONS, "AMDRadeonX3000GLDriver.bundle", "10.13.6")
            .build(),
        graphics("AMD Legacy GCN")
            .display_name("Graphics: AMD Legacy GCN")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AMD7000Controller.kext", "12.5")
            .install(EXTENSIONS, "AMD8000Controller.kext", "12.5")
            .install(EXTENSIONS, "AMD9000Controller.kext", "12.5")
            .install(EXTENSIONS, "AMD9500Controller.kext", "12.5")
            .install(EXTENSIONS, "AMD10000Controller.kext", "12.5")
            .install(EXTENSIONS, "AMDRadeonX4000.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AMDRadeonX4000HWServices.kext", "12.5")
            .install_either(Capability::Since13_3, EXTENSIONS, "AMDFramebuffer.kext", "12.5-GCN", "12.5")
            .install(EXTENSIONS, "AMDSupport.kext", "12.5")
            .install(EXTENSIONS, "AMDRadeonVADriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDRadeonVADriver2.bundle", "12.5")
            .install(EXTENSIONS, "AMDRadeonX4000GLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDMTLBronzeDriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDShared.bundle", "12.5")
            .build(),
        // 2017 dGPUs that stopped working with the Sonoma framebuffer
        graphics("AMD Legacy GCN v2")
            .display_name("Graphics: AMD Legacy GCN (2017)")
            .with(since(darwin::SONOMA, 0))
            .install(EXTENSIONS, "AMD9500Controller.kext", "13.5.2")
            .install(EXTENSIONS, "AMD10000Controller.kext", "13.5.2")
            .install(EXTENSIONS, "AMDRadeonX4000.kext", "13.5.2")
            .install(EXTENSIONS, "AMDRadeonX4000HWServices.kext", "13.5.2")
            .install(EXTENSIONS, "AMDFramebuffer.kext", "13.5.2")
            .install(EXTENSIONS, "AMDSupport.kext", "13.5.2")
            .install(EXTENSIONS, "AMDRadeonVADriver.bundle", "13.5.2")
            .install(EXTENSIONS, "AMDRadeonVADriver2.bundle", "13.5.2")
            .install(EXTENSIONS, "AMDRadeonX4000GLDriver.bundle", "13.5.2")
            .install(EXTENSIONS, "AMDMTLBronzeDriver.bundle", "13.5.2")
            .install(EXTENSIONS, "AMDShared.bundle", "13.5.2")
            .build(),
        // Polaris on hosts without AVX2.0
        graphics("AMD Legacy Polaris")
            .display_name("Graphics: AMD Legacy Polaris")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AMDRadeonX4000.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AMDRadeonX4000HWServices.kext", "12.5")
            .install(EXTENSIONS, "AMDRadeonVADriver2.bundle", "12.5")
            .install(EXTENSIONS, "AMDRadeonX4000GLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDMTLBronzeDriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDShared.bundle", "12.5")
            .build(),
        graphics("AMD Legacy Vega")
            .display_name("Graphics: AMD Legacy Vega")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AMDRadeonX5000.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AMDRadeonVADriver2.bundle", "12.5")
            .install(EXTENSIONS, "AMDRadeonX5000GLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDRadeonX5000MTLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AMDRadeonX5000Shared.bundle", "12.5")
            .install(EXTENSIONS, "AMDShared.bundle", "12.5")
            .build(),
        // Mixed GCN 1-3 and Vega systems, installed alongside AMD Legacy GCN
        graphics("AMD Legacy Vega Extended")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AMDRadeonX5000HWServices.kext", "12.5")
            .build(),
    ]
}

fn intel_groups() -> Vec<PatchGroup> {
    vec![
        graphics("Intel Ironlake")
            .display_name("Graphics: Intel Ironlake")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "AppleIntelHDGraphics.kext", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHDGraphicsFB.kext", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHDGraphicsGA.plugin", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHDGraphicsGLDriver.bundle", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHDGraphicsVADriver.bundle", "10.13.6")
            .build(),
        graphics("Intel Sandy Bridge")
            .display_name("Graphics: Intel Sandy Bridge")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "AppleIntelHD3000Graphics.kext", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHD3000GraphicsGA.plugin", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHD3000GraphicsGLDriver.bundle", "10.13.6")
            .install(EXTENSIONS, "AppleIntelHD3000GraphicsVADriver.bundle", "10.13.6")
            .install(EXTENSIONS, "AppleIntelSNBGraphicsFB.kext", "10.13.6")
            .install(EXTENSIONS, "AppleIntelSNBVA.bundle", "10.13.6")
            .build(),
        graphics("Intel Ivy Bridge")
            .display_name("Graphics: Intel Ivy Bridge")
            .with(since(darwin::MONTEREY, 0))
            .install(EXTENSIONS, "AppleIntelHD4000GraphicsGLDriver.bundle", "11.7.10")
            .install_either(
                Capability::SinceVentura,
                EXTENSIONS,
                "AppleIntelHD4000GraphicsMTLDriver.bundle",
                "11.7.10-22",
                "11.7.10",
            )
            .install(EXTENSIONS, "AppleIntelHD4000GraphicsVADriver.bundle", "11.7.10")
            .install(EXTENSIONS, "AppleIntelFramebufferCapri.kext", FramebufferFamily::IvyBridge)
            .install(EXTENSIONS, "AppleIntelHD4000Graphics.kext", FramebufferFamily::IvyBridge)
            .install(EXTENSIONS, "AppleIntelIVBVA.bundle", "11.7.10")
            // libIGIL-Metal.dylib comes from 11.0 Beta 6
            .install(EXTENSIONS, "AppleIntelGraphicsShared.bundle", "11.7.10")
            .build(),
        graphics("Intel Haswell")
            .display_name("Graphics: Intel Haswell")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AppleIntelFramebufferAzul.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AppleIntelHD5000Graphics.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AppleIntelHD5000GraphicsGLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelHD5000GraphicsMTLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelHD5000GraphicsVADriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelHSWVA.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelGraphicsShared.bundle", "12.5")
            .build(),
        graphics("Intel Broadwell")
            .display_name("Graphics: Intel Broadwell")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AppleIntelBDWGraphics.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AppleIntelBDWGraphicsFramebuffer.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AppleIntelBDWGraphicsGLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelBDWGraphicsMTLDriver.bundle", "12.5-22")
            .install(EXTENSIONS, "AppleIntelBDWGraphicsVADriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelBDWGraphicsVAME.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelGraphicsShared.bundle", "12.5")
            .build(),
        graphics("Intel Skylake")
            .display_name("Graphics: Intel Skylake")
            .with(since(darwin::VENTURA, 0))
            .install(EXTENSIONS, "AppleIntelSKLGraphics.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AppleIntelSKLGraphicsFramebuffer.kext", MONTEREY_FB)
            .install(EXTENSIONS, "AppleIntelSKLGraphicsGLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelSKLGraphicsMTLDriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelSKLGraphicsVADriver.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelSKLGraphicsVAME.bundle", "12.5")
            .install(EXTENSIONS, "AppleIntelGraphicsShared.bundle", "12.5")
            .build(),
    ]
}

// ============================================================================
// Audio, Networking, Brightness
// ============================================================================

fn audio_groups() -> Vec<PatchGroup> {
    vec![
        // iMac7,1 and iMac8,1 Realtek HD Audio
        PatchGroup::builder("Legacy Realtek", Category::Audio)
            .display_name("Audio: Legacy Realtek")
            .with(since(darwin::SIERRA, 0))
            .install(EXTENSIONS, "AppleHDA.kext", "10.11.6")
            .install(EXTENSIONS, "IOAudioFamily.kext", "10.11.6")
            .remove(
                EXTENSIONS,
                &[
                    "AppleVirtIO.kext",
                    "AppleVirtualGraphics.kext",
                    "AppleVirtualPlatform.kext",
                    "ApplePVPanic.kext",
                    "AppleVirtIOStorage.kext",
                ],
            )
            .build(),
        // Mac Pros with non-UGA/GOP GPUs
        PatchGroup::builder("Legacy Non-GOP", Category::Audio)
            .display_name("Audio: Legacy non-GOP")
            .with(since(darwin::MOJAVE, 0))
            .install(EXTENSIONS, "AppleHDA.kext", "10.13.6")
            .build(),
    ]
}

fn networking_groups() -> Vec<PatchGroup> {
    vec![
        PatchGroup::builder("Legacy Wireless", Category::Networking)
            .display_name("Networking: Legacy Wireless")
            .with(since(darwin::MONTEREY, 0))
            .install_either(Capability::LegacyWifiCve, LIBEXEC, "airportd", "11.7.10-Sandbox", "11.7.10")
            .install("/System/Library/CoreServices", "WiFiAgent.app", "11.7.10")
            .install_user_if(when(Capability::ExactlyMonterey), SKYLIGHT_PLUGINS, "CoreWLAN.dylib", "SkyLightPlugins")
            .install_user_if(when(Capability::ExactlyMonterey), SKYLIGHT_PLUGINS, "CoreWLAN.txt", "SkyLightPlugins")
            .build(),
        PatchGroup::builder("Legacy Wireless Extended", Category::Networking)
            .with(since(darwin::VENTURA, 0))
            .install(LIBEXEC, "wps", "12.7.2")
            .install(LIBEXEC, "wifip2pd", "12.7.2")
            .install(FRAMEWORKS, "CoreWLAN.framework", "12.7.2")
            .install(PRIVATE_FRAMEWORKS, "CoreWiFi.framework", "12.7.2")
            .install(PRIVATE_FRAMEWORKS, "IO80211.framework", "12.7.2")
            .install(PRIVATE_FRAMEWORKS, "WiFiPeerToPeer.framework", "12.7.2")
            .build(),
        // BCM943324, BCM94331, BCM94360, BCM943602
        PatchGroup::builder("Modern Wireless", Category::Networking)
            .display_name("Networking: Modern Wireless")
            .with(since(darwin::SONOMA, 0))
            .install(LIBEXEC, "airportd", "13.6.5")
            .install(LIBEXEC, "wifip2pd", "13.6.5")
            .install(FRAMEWORKS, "CoreWLAN.framework", TagSource::per_major("13.6.5"))
            .install(PRIVATE_FRAMEWORKS, "CoreWiFi.framework", TagSource::per_major("13.6.5"))
            .install(PRIVATE_FRAMEWORKS, "IO80211.framework", TagSource::per_major("13.6.5"))
            .install(PRIVATE_FRAMEWORKS, "WiFiPeerToPeer.framework", TagSource::per_major("13.6.5"))
            .build(),
    ]
}

fn brightness_groups() -> Vec<PatchGroup> {
    vec![
        PatchGroup::builder("Legacy Backlight Control", Category::Brightness)
            .display_name("Brightness: Legacy Backlight Control")
            .with(since(darwin::HIGH_SIERRA, 0))
            .install(EXTENSIONS, "AppleBacklight.kext", "10.12.6")
            .install(EXTENSIONS, "AppleBacklightExpert.kext", "10.12.6")
            .install(PRIVATE_FRAMEWORKS, "DisplayServices.framework", "10.12.6")
            .remove(GRAPHICS_CONTROL_PLUGINS, &["AGDCBacklightControl.kext"])
            .build(),
    ]
}

// ============================================================================
// Miscellaneous
// ============================================================================

fn miscellaneous_groups() -> Vec<PatchGroup> {
    let misc = |name: &str| PatchGroup::builder(name, Category::Miscellaneous);

    vec![
        misc("Legacy GMUX")
            .display_name("Miscellaneous: Legacy GMUX")
            .with(since(darwin::HIGH_SIERRA, 0))
            .install(GRAPHICS_CONTROL_PLUGINS, "AppleMuxControl.kext", "10.12.6")
            .remove(EXTENSIONS, &["AppleBacklight.kext"])
            .remove(GRAPHICS_CONTROL_PLUGINS, &["AGDCBacklightControl.kext", "AppleMuxControl.kext"])
            .build(),
        misc("Legacy Keyboard Backlight")
            .display_name("Miscellaneous: Legacy Keyboard Backlight")
            .with(non_metal)
            .process(&format!("{} Moraea_BacklightHack -bool true", GLOBAL_DEFAULTS), true)
            .build(),
        misc("Legacy USB 1.1")
            .display_name("Miscellaneous: Legacy USB 1.1")
            .with(since(darwin::VENTURA, 0))
            .install_either(Capability::Since14_4, EXTENSIONS, "IOUSBHostFamily.kext", "12.6.2-23.4", "12.6.2")
            .build(),
        // UHCI/OHCI injection panics on 14.1 and newer
        misc("Legacy USB 1.1 Extended")
            .with(since(darwin::SONOMA, 1))
            .install("/System/Library/Extensions/IOUSBHostFamily.kext/Contents/PlugIns", "AppleUSBOHCI.kext", "12.6.2-USB")
            .install("/System/Library/Extensions/IOUSBHostFamily.kext/Contents/PlugIns", "AppleUSBOHCIPCI.kext", "12.6.2-USB")
            .install("/System/Library/Extensions/IOUSBHostFamily.kext/Contents/PlugIns", "AppleUSBUHCI.kext", "12.6.2-USB")
            .install("/System/Library/Extensions/IOUSBHostFamily.kext/Contents/PlugIns", "AppleUSBUHCIPCI.kext", "12.6.2-USB")
            .build(),
        // Since 14.1 the camera daemon only loads from the system volume
        misc("PCIe FaceTime Camera")
            .display_name("Miscellaneous: PCIe FaceTime Camera")
            .with(since(darwin::SONOMA, 0))
            .install(
                "/System/Library/Frameworks/CoreMediaIO.framework/Versions/A/Resources",
                "AppleCamera.plugin",
                "14.0 Beta 1",
            )
            .install("/System/Library/LaunchDaemons", "com.apple.cmio.AppleCameraAssistant.plist", "14.0 Beta 1")
            .remove_user("/Library/CoreMediaIO/Plug-Ins/DAL", &["AppleCamera.plugin"])
            .remove_user("/Library/LaunchDaemons", &["com.apple.cmio.AppleCameraAssistant.plist"])
            .build(),
        misc("T1 Security Chip")
            .display_name("Miscellaneous: T1 Security Chip")
            .with(since(darwin::SONOMA, 0))
            // Password authentication
            .install(FRAMEWORKS, "LocalAuthentication.framework", TagSource::per_major("13.6"))
            // biometrickitd
            .install(PRIVATE_FRAMEWORKS, "EmbeddedOSInstall.framework", "13.6")
            // Apple Pay
            .install("/usr/lib", "libNFC_Comet.dylib", "13.6")
            .install("/usr/lib", "libNFC_HAL.dylib", "13.6")
            .install("/usr/lib", "libnfshared.dylib", "13.6")
            .install("/usr/lib", "libnfshared.dylibOld.dylib", "13.6")
            .install("/usr/lib", "libnfstorage.dylib", "13.6")
            .install("/usr/lib", "libnfrestore.dylib", "13.6")
            .install("/usr/lib", "libPN548_API.dylib", "13.6")
            .install(LIBEXEC, "biometrickitd", "13.6")
            .install(LIBEXEC, "nfcd", "13.6")
            .install(LIBEXEC, "nfrestore_service", "13.6")
            .install("/usr/standalone/firmware/nfrestore/firmware/fw", "PN549_FW_02_01_5A_rev88207.bin", "13.6")
            .install("/usr/standalone/firmware/nfrestore/firmware/fw", "SN100V_FW_A3_01_01_81_rev127208.bin", "13.6")
            .install("/usr/standalone/firmware/nfrestore/firmware/fw", "SN200V_FW_B1_02_01_86_rev127266.bin", "13.6")
            .install("/usr/standalone/firmware/nfrestore/firmware/fw", "SN300V_FW_B0_02_01_22_rev129172.bin", "13.6")
            .build(),
    ]
}
