//! opa-pvp CLI binary entry point.
//! Delegates to library modules for generate/results/normalize and prints results.

use clap::Parser;
use opa_pvp::cli::{Cli, CommonArgs, Commands};
use opa_pvp::compose::Composer;
use opa_pvp::config::{self, CliOverrides, Effective, SourceMode};
use opa_pvp::loader::ResultIndex;
use opa_pvp::models::catalog::Catalog;
use opa_pvp::observe::{DirectReader, ObservationMapper};
use opa_pvp::{normalize, output, utils, Result};
use std::path::Path;
use tracing::debug;

fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose);
    match run(cli.cmd) {
        Ok(code) => std::process::exit(code),
        Err(e) => {
            eprintln!("{} {}", utils::error_prefix(), e);
            std::process::exit(2);
        }
    }
}

fn run(cmd: Commands) -> Result<i32> {
    match cmd {
        Commands::Version => {
            println!("{}", env!("CARGO_PKG_VERSION"));
            Ok(0)
        }
        Commands::Results {
            common,
            policy_results,
            source,
            verdict,
            omit_empty,
            fail_on_violation,
        } => {
            let eff = effective(
                &common,
                CliOverrides {
                    policy_results,
                    source,
                    verdict,
                    emit_empty: if omit_empty { Some(false) } else { None },
                    ..CliOverrides::default()
                },
            )?;
            let catalog = Catalog::from_file(eff.require(&eff.catalog, "catalog")?)?;
            let results_dir = eff.require(&eff.policy_results, "policy-results")?;
            let mapper = ObservationMapper::new(eff.verdict, eff.emit_empty);
            debug!(source = ?eff.source, verdict = ?eff.verdict, "collecting results");
            let res = match eff.source {
                SourceMode::Index => {
                    let index = ResultIndex::load_from_directory(results_dir)?;
                    mapper.get_results(&catalog, &index)?
                }
                SourceMode::Direct => mapper.get_results(&catalog, &DirectReader::new(results_dir))?,
            };
            output::print_results(&res, &eff.output);
            let sm = res.summary();
            Ok(if fail_on_violation && sm.fail + sm.error > 0 { 1 } else { 0 })
        }
        Commands::Generate {
            common,
            policy_templates,
            policy_output,
            bundle,
            bundle_revision,
        } => {
            let eff = effective(
                &common,
                CliOverrides {
                    policy_templates,
                    policy_output,
                    bundle,
                    bundle_revision,
                    ..CliOverrides::default()
                },
            )?;
            let catalog = Catalog::from_file(eff.require(&eff.catalog, "catalog")?)?;
            let composer = Composer::new(
                eff.require(&eff.policy_templates, "policy-templates")?,
                eff.require(&eff.policy_output, "policy-output")?,
            );
            let report = composer.generate_policy_set(&catalog)?;
            output::print_generate(&report, &eff.root, &eff.output);
            if let Some(bundle) = eff.bundle.as_deref() {
                if eff.output != "json" {
                    eprintln!(
                        "{} Creating policy bundle at {}",
                        utils::info_prefix(),
                        bundle.display()
                    );
                }
                composer.bundle(bundle, eff.bundle_revision.as_deref())?;
            }
            Ok(0)
        }
        Commands::Normalize { file, output: mode } => {
            let path = Path::new(&file);
            let data = std::fs::read_to_string(path).map_err(|e| opa_pvp::Error::io(path, e))?;
            let doc: serde_json::Value =
                serde_json::from_str(&data).map_err(|source| opa_pvp::Error::Parse {
                    file: file.clone(),
                    source,
                })?;
            let results = normalize(&doc);
            output::print_normalized(&results, mode.as_deref().unwrap_or("human"));
            Ok(0)
        }
    }
}

/// Resolve config for a subcommand and validate configured directories.
fn effective(common: &CommonArgs, overrides: CliOverrides) -> Result<Effective> {
    let eff = config::resolve_effective(&CliOverrides {
        root: common.root.clone(),
        catalog: common.catalog.clone(),
        output: common.output.clone(),
        ..overrides
    })?;
    // Friendly note if no config was found
    if !eff.config_found && eff.output != "json" {
        eprintln!(
            "{} No opa-pvp.toml found; using CLI flags and defaults.",
            utils::note_prefix()
        );
    }
    eff.validate()?;
    Ok(eff)
}

fn init_tracing(verbose: bool) {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

    let filter = if verbose {
        EnvFilter::new("opa_pvp=debug")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("opa_pvp=warn"))
    };

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}
