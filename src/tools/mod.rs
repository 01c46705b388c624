//! External collaborators of the validation harness.
//!
//! Each collaborator is a trait so the harness can be driven by fakes in
//! tests; the command-backed implementations all go through `run_tool`.

pub mod builder;
pub mod disk_image;
pub mod fetch;

pub use builder::{
    BuildSettings, CommandConfigBuilder, ConfigBuilder, ConfigValidator, HardwareProfile, OcValidate,
    SUPPORTED_MODELS,
};
pub use disk_image::{DiskImageTool, Hdiutil, MountedImage, is_mounted};
pub use fetch::{ArchiveFetcher, HttpFetcher};
