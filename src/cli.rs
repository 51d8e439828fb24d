//! CLI argument parsing via `clap`.

use clap::{Args, Parser, Subcommand};

#[derive(Parser)]
#[command(
    name = "opa-pvp",
    version,
    about = "Turn OPA decisions into compliance observations",
    long_about = "opa-pvp — normalize OPA policy decisions, index them by check, and report pass/fail/error observations.\n\nConfiguration precedence: CLI > opa-pvp.toml > defaults.",
    after_help = "Examples:\n  opa-pvp results --catalog catalog.toml --policy-results out/results\n  opa-pvp results --source direct --output json\n  opa-pvp generate --policy-templates policies --policy-output out/policy --bundle out/bundle.tar.gz\n  opa-pvp normalize out/results/branch_protection.json",
    arg_required_else_help = true
)]
/// Top-level CLI options and subcommands.
pub struct Cli {
    #[arg(long, short, global = true, action = clap::ArgAction::SetTrue, help = "Enable debug logging")]
    pub verbose: bool,
    #[command(subcommand)]
    pub cmd: Commands,
}

#[derive(Args, Clone, Default)]
/// Options shared by every config-aware subcommand.
pub struct CommonArgs {
    #[arg(long, help = "Working root holding opa-pvp.toml (default: current dir)")]
    pub root: Option<String>,
    #[arg(long, help = "Catalog of rules and checks (toml|yaml|json)")]
    pub catalog: Option<String>,
    #[arg(long, help = "Output mode: human|json (default: human)")]
    pub output: Option<String>,
}

#[derive(Subcommand)]
/// Supported subcommands.
pub enum Commands {
    /// Show version
    #[command(about = "Show version", long_about = "Print the current opa-pvp version.")]
    Version,
    /// Report observations for every catalog check
    #[command(
        about = "Report check observations",
        long_about = "Load decision documents, map each catalog check to an observation, and print the result set.",
        after_help = "Examples:\n  opa-pvp results --catalog catalog.toml --policy-results results\n  opa-pvp results --verdict literal --output json"
    )]
    Results {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, help = "Directory of OPA decision documents")]
        policy_results: Option<String>,
        #[arg(long, help = "Results lookup: index|direct (default: index)")]
        source: Option<String>,
        #[arg(long, help = "Verdict policy: corrected|literal (default: corrected)")]
        verdict: Option<String>,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Skip checks that have no results")]
        omit_empty: bool,
        #[arg(long, action = clap::ArgAction::SetTrue, help = "Exit non-zero when any subject fails or errors")]
        fail_on_violation: bool,
    },
    /// Copy check templates and write parameters, optionally bundling
    #[command(
        about = "Generate policy set",
        long_about = "Copy {check}.rego templates for every catalog check into the output dir, write data.json with rule parameters, and optionally run `opa build`.",
        after_help = "Examples:\n  opa-pvp generate --catalog catalog.toml --policy-templates policies --policy-output out\n  opa-pvp generate --bundle bundle.tar.gz --bundle-revision v1"
    )]
    Generate {
        #[command(flatten)]
        common: CommonArgs,
        #[arg(long, help = "Directory of {check}.rego templates")]
        policy_templates: Option<String>,
        #[arg(long, help = "Directory receiving the generated policy set")]
        policy_output: Option<String>,
        #[arg(long, help = "Bundle archive to build with opa")]
        bundle: Option<String>,
        #[arg(long, help = "Revision recorded in the bundle manifest")]
        bundle_revision: Option<String>,
    },
    /// Print normalized results for one decision document
    #[command(
        about = "Normalize a decision document",
        long_about = "Parse one OPA decision document and print the normalized results it yields."
    )]
    Normalize {
        #[arg(help = "Path to a decision document (.json)")]
        file: String,
        #[arg(long, help = "Output mode: human|json (default: human)")]
        output: Option<String>,
    },
}
