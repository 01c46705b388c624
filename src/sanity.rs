//! Pre-flight sanity checks for a validation run
//!
//! This module verifies the external tools before any matrix starts:
//! - The disk image utility used to mount the payload store
//! - The config validator
//! - The config builder
//!
//! If any check fails, the program exits with a clear error message
//! before anything is downloaded or mounted.

use crate::config::HarnessConfig;
use crate::process_guard::CommandProcessGroup;
use std::path::Path;
use std::process::Command;
use tracing::{debug, info, warn};

/// Result of environment verification
#[derive(Debug)]
pub struct SanityCheckResult {
    /// (role, program) pairs that could not be found
    pub missing_binaries: Vec<(String, String)>,
}

impl SanityCheckResult {
    /// Returns true if all checks passed
    pub fn is_ok(&self) -> bool {
        self.missing_binaries.is_empty()
    }
}

/// Check if a program is runnable: an existing file when given as a path,
/// otherwise something `which` finds in PATH
fn binary_exists(program: &Path) -> bool {
    if program.components().count() > 1 {
        return program.is_file();
    }

    Command::new("which")
        .arg(program)
        .in_new_process_group()
        .output()
        .map(|output| output.status.success())
        .unwrap_or(false)
}

/// Perform the sanity checks for the phases about to run
pub fn verify_environment(config: &HarnessConfig, payload: bool, builds: bool) -> SanityCheckResult {
    let mut required = Vec::new();
    if payload {
        required.push(("disk image utility", &config.hdiutil_path));
    }
    if builds {
        required.push(("config validator", &config.validator_path));
        required.push(("config builder", &config.builder_program));
    }

    let missing_binaries = required
        .into_iter()
        .filter(|(_, program)| !binary_exists(program))
        .map(|(role, program)| (role.to_string(), program.display().to_string()))
        .collect();

    SanityCheckResult { missing_binaries }
}

/// Print a pretty error message to stderr and exit
pub fn print_error_and_exit(result: &SanityCheckResult) -> ! {
    eprintln!();
    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║              patchset - Pre-flight Check Failed                  ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    eprintln!("❌ ERROR: Missing required tools");
    eprintln!();
    for (role, program) in &result.missing_binaries {
        eprintln!("   • {} ({})", role, program);
    }
    eprintln!();
    eprintln!("   Solution: install the tools or point the harness config at them");
    eprintln!("     (hdiutil_path, validator_path, builder_program)");
    eprintln!();

    eprintln!("╔══════════════════════════════════════════════════════════════════╗");
    eprintln!("║  Fix the above issues and try again.                             ║");
    eprintln!("╚══════════════════════════════════════════════════════════════════╝");
    eprintln!();

    std::process::exit(1);
}

/// Skip the checks entirely (for running against fake tools)
/// Set PATCHSET_SKIP_PREFLIGHT=1 to skip
pub fn should_skip_preflight() -> bool {
    std::env::var("PATCHSET_SKIP_PREFLIGHT")
        .map(|v| v == "1" || v.to_lowercase() == "true")
        .unwrap_or(false)
}

/// Verify the environment and exit if checks fail.
/// Call this before starting a validation run.
pub fn run_preflight_checks(config: &HarnessConfig, payload: bool, builds: bool) {
    if should_skip_preflight() {
        warn!("Pre-flight checks skipped (PATCHSET_SKIP_PREFLIGHT=1)");
        return;
    }

    debug!("Running pre-flight sanity checks...");
    let result = verify_environment(config, payload, builds);

    if !result.is_ok() {
        print_error_and_exit(&result);
    }

    info!("Pre-flight checks passed");
}
