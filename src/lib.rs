//! Legacy Patch Set Library
//!
//! This library resolves which legacy-hardware compatibility files a target
//! macOS version needs, and validates every resolved plan against the payload
//! store and an external config builder before release.

pub mod catalog;
pub mod cli;
pub mod config;
pub mod error;
pub mod interrupt;
pub mod logic;
pub mod plan;
pub mod process_guard;
pub mod sanity;
pub mod tool_runner;
pub mod tool_traits;
pub mod tools;
pub mod types;
pub mod validation;
pub mod version;

// Re-export main types for convenience
pub use catalog::{PatchCatalog, PatchGroup, PatchGroupBuilder, Predicate, RangeBound, TagSource};
pub use config::HarnessConfig;
pub use error::{PatchsetError, Result};
pub use logic::flags::{Capability, CapabilityFlags, derive_flags};
pub use logic::framebuffer::resolve_framebuffer_tag;
pub use logic::resolver::{resolve, resolve_with};
pub use plan::{ResolvedPlan, SourceTag};
pub use process_guard::{ChildRegistry, CommandProcessGroup};
pub use tool_runner::{ToolOutput, run_tool};
pub use tool_traits::ToolInvocation;
pub use types::{Category, FramebufferFamily, KextVariant, SerialSettings, SettingsProfile};
pub use validation::{ValidationHarness, cross_validate_against_payload, detect_orphans};
pub use version::{KernelVersion, VersionContext};
