//! patchset - Main entry point
//!
//! Resolves patch plans for a target OS version and runs the release
//! validation harness.

use anyhow::{Context, Result};
use std::collections::BTreeSet;
use std::path::PathBuf;
use std::str::FromStr;
use tracing::{debug, error, info, warn};
use tracing_subscriber::{EnvFilter, fmt, prelude::*};

use patchset::catalog::PatchCatalog;
use patchset::cli::{Cli, Commands};
use patchset::config::HarnessConfig;
use patchset::error::PatchsetError;
use patchset::interrupt::{InterruptFlag, install_handlers};
use patchset::logic::resolver::{resolve, resolve_with};
use patchset::sanity;
use patchset::tools::{CommandConfigBuilder, Hdiutil, HttpFetcher, OcValidate};
use patchset::types::Category;
use patchset::validation::ValidationHarness;
use patchset::version::{KernelVersion, VersionContext, approximate_marketing_version};

/// Initialize tracing; RUST_LOG takes precedence over `--log-level`
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().with_target(false))
        .init();
}

fn main() -> Result<()> {
    let cli = Cli::parse_args();
    init_tracing(&cli.log_level);
    debug!("CLI arguments parsed");

    match cli.command {
        Commands::Resolve {
            major,
            minor,
            marketing_version,
            legacy_majors,
            group,
            summary,
        } => {
            let marketing = marketing_version
                .unwrap_or_else(|| approximate_marketing_version(KernelVersion::new(major, minor)));
            let ctx = VersionContext::new(major, minor, marketing, legacy_majors);
            run_resolve(&ctx, &group, summary)
        }
        Commands::Groups { category } => run_groups(category.as_deref()),
        Commands::Validate {
            config,
            skip_configs,
            skip_payload,
            verify_unused_files,
            save_config,
        } => {
            let mut harness_config = match config {
                Some(path) => {
                    info!("Loading harness configuration: {:?}", path);
                    HarnessConfig::load_from_file(&path)?
                }
                None => HarnessConfig::default(),
            };
            harness_config.verify_unused_files |= verify_unused_files;

            if let Some(path) = save_config {
                return save_and_exit(&harness_config, path);
            }

            run_validate(&harness_config, !skip_configs, !skip_payload)
        }
    }
}

/// Resolve one context and print the plan
fn run_resolve(ctx: &VersionContext, groups: &[String], summary: bool) -> Result<()> {
    let catalog = PatchCatalog::standard().context("Standard catalog is malformed")?;

    for name in groups {
        if catalog.get(name).is_none() {
            anyhow::bail!("Unknown patch group: {}", name);
        }
    }

    info!("Resolving for {}", ctx);
    let plan = if groups.is_empty() {
        resolve(&catalog, ctx)
    } else {
        let selected: BTreeSet<&str> = groups.iter().map(String::as_str).collect();
        resolve_with(&catalog, ctx, |group| selected.contains(group.name.as_str()))
    };

    if summary {
        println!("{}", plan.summary());
    } else {
        println!("{}", serde_json::to_string_pretty(&plan)?);
    }
    Ok(())
}

/// List catalog groups, optionally one category
fn run_groups(category: Option<&str>) -> Result<()> {
    let catalog = PatchCatalog::standard().context("Standard catalog is malformed")?;

    let category = category
        .map(|c| Category::from_str(c).map_err(|_| anyhow::anyhow!("Unknown category: {}", c)))
        .transpose()?;

    for group in catalog.groups() {
        if category.is_some_and(|c| c != group.category) {
            continue;
        }
        println!(
            "{:<40} {:<14} {} .. {}",
            group.name, group.category, group.min, group.max
        );
    }
    Ok(())
}

fn save_and_exit(config: &HarnessConfig, path: PathBuf) -> Result<()> {
    config.save_to_file(&path)?;
    info!("Configuration saved to {:?}", path);
    println!("✓ Configuration saved to {:?}", path);
    Ok(())
}

/// Run the requested harness phases
fn run_validate(config: &HarnessConfig, builds: bool, payload: bool) -> Result<()> {
    config.validate().context("Harness configuration is invalid")?;
    sanity::run_preflight_checks(config, payload, builds);

    let interrupt = InterruptFlag::new();
    if let Err(e) = install_handlers(&interrupt) {
        warn!("Failed to initialize signal handlers: {}", e);
    }

    let catalog = PatchCatalog::standard().context("Standard catalog is malformed")?;
    let harness = ValidationHarness::new(config, &catalog).with_interrupt(interrupt);

    let result = run_phases(&harness, config, builds, payload);
    if let Err(e) = &result {
        if matches!(e.root_cause(), PatchsetError::Interrupted) {
            warn!("Validation interrupted");
            std::process::exit(130);
        }
        error!("Validation failed: {}", e);
    }
    result?;

    println!("✓ Validation passed");
    Ok(())
}

fn run_phases(
    harness: &ValidationHarness<'_>,
    config: &HarnessConfig,
    builds: bool,
    payload: bool,
) -> patchset::error::Result<()> {
    if builds {
        let builder = CommandConfigBuilder {
            program: config.builder_program.clone(),
            args: config.builder_args.clone(),
            output_dir: config.build_output_dir.clone(),
        };
        let validator = OcValidate {
            program: config.validator_path.clone(),
        };
        let count = harness.run_config_matrix(&builder, &validator, &harness.hardware_profiles())?;
        info!("Config matrix passed ({} builds)", count);
    }

    if payload {
        let fetcher = HttpFetcher::new();
        let hdiutil = Hdiutil::new(config.hdiutil_path.clone(), config.image_passphrase.clone());
        let report = harness.validate_sys_patch(&fetcher, &hdiutil)?;
        info!(
            "Version matrix passed ({} cells, {} unused payload files)",
            report.cells,
            report.orphans.len()
        );
    }

    Ok(())
}
