//! Logic modules: pure evaluation of the catalog for a target OS version.
//!
//! # Modules
//!
//! - `flags` - capability flags derived from a `VersionContext`
//! - `framebuffer` - three-tier framebuffer source-tag ladder
//! - `resolver` - catalog evaluation and plan merging

pub mod flags;
pub mod framebuffer;
pub mod resolver;
