use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// patchset - legacy hardware patch set resolver and release validator
#[derive(Parser)]
#[command(name = "patchset")]
#[command(about = "Resolve and validate legacy hardware patch sets")]
#[command(version)]
pub struct Cli {
    /// Log filter (overridden by RUST_LOG)
    #[arg(long, global = true, default_value = "info")]
    pub log_level: String,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Resolve the plan for one target OS version and print it as JSON
    Resolve {
        /// Kernel major version (e.g. 23 for macOS 14)
        #[arg(long)]
        major: u32,
        /// Kernel minor version
        #[arg(long, default_value_t = 0)]
        minor: u32,
        /// Marketing version (e.g. 14.4.1); approximated from the kernel when absent
        #[arg(long)]
        marketing_version: Option<String>,
        /// Kernel majors with non-metal support (comma-separated)
        #[arg(long, value_delimiter = ',', default_values_t = [20, 21, 22, 23])]
        legacy_majors: Vec<u32>,
        /// Only resolve these groups (by name, repeatable)
        #[arg(short, long)]
        group: Vec<String>,
        /// Print a summary instead of JSON
        #[arg(long)]
        summary: bool,
    },
    /// List the patch groups in the catalog
    Groups {
        /// Only list one category (Graphics, Audio, Networking, Brightness, Miscellaneous)
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Run the validation harness
    Validate {
        /// Harness configuration file (JSON); defaults are used when absent
        #[arg(short, long)]
        config: Option<PathBuf>,
        /// Skip the config builder matrix
        #[arg(long)]
        skip_configs: bool,
        /// Skip the payload version matrix
        #[arg(long)]
        skip_payload: bool,
        /// Report payload files no plan references (slow)
        #[arg(long)]
        verify_unused_files: bool,
        /// Write the effective configuration to this file and exit
        #[arg(long)]
        save_config: Option<PathBuf>,
    },
}

impl Cli {
    pub fn parse_args() -> Self {
        <Self as clap::Parser>::parse()
    }
}
