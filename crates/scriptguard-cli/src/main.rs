mod display;

use anyhow::{Context, Result};
use clap::{CommandFactory, Parser, Subcommand, ValueEnum};
use clap_complete::Shell;
use scriptguard_core::discovery::discover_workflow_files;
use scriptguard_core::parser::github::GitHubActionsParser;
use scriptguard_core::policy::{self, TrustPolicy};
use scriptguard_core::sarif;
use scriptguard_core::scanner;
use scriptguard_core::security::injection::DuplicatePolicy;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(
    name = "scriptguard",
    version,
    about = "scriptguard: CI/CD script-injection detector",
    long_about = "Scan GitHub Actions workflows for attacker-controlled expressions interpolated into run scripts.\n\nIssue titles, comment bodies, commit messages and fork branch names must never reach a shell unquoted."
)]
struct Cli {
    /// Enable debug logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum OutputFormat {
    Text,
    Json,
    Sarif,
}

#[derive(Subcommand)]
enum Commands {
    /// Scan workflow files for script injection
    Scan {
        /// Workflow file, workflows directory, or repository root
        #[arg(default_value = ".github/workflows/")]
        path: PathBuf,

        /// Output format
        #[arg(short, long, value_enum, default_value = "text")]
        format: OutputFormat,

        /// Trust policy file (defaults to the nearest .scriptguard/policy.toml above PATH)
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Report each identical expression once per step
        #[arg(long)]
        dedupe: bool,

        /// Exit non-zero when any workflow could not be analyzed
        #[arg(long)]
        fail_on_review: bool,
    },

    /// List every templated expression in a workflow with its trust verdict
    Expressions {
        /// Path to the workflow file
        path: PathBuf,

        /// Trust policy file
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Show the active trust rules in evaluation order
    Rules {
        /// Trust policy file
        #[arg(long)]
        policy: Option<PathBuf>,
    },

    /// Generate shell completion scripts
    Completions {
        /// Target shell
        shell: Shell,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_filter = if cli.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter)).init();

    match cli.command {
        Commands::Scan {
            path,
            format,
            policy,
            dedupe,
            fail_on_review,
        } => cmd_scan(&path, format, policy.as_deref(), dedupe, fail_on_review),
        Commands::Expressions { path, policy } => cmd_expressions(&path, policy.as_deref()),
        Commands::Rules { policy } => cmd_rules(policy.as_deref()),
        Commands::Completions { shell } => {
            clap_complete::generate(shell, &mut Cli::command(), "scriptguard", &mut std::io::stdout());
            Ok(())
        }
    }
}

/// Explicit `--policy`, else the nearest `.scriptguard/policy.toml` above `start`.
fn load_policy(policy: Option<&Path>, start: &Path) -> Result<TrustPolicy> {
    policy::resolve_policy(policy, start).context("Failed to load trust policy")
}

fn cmd_scan(
    path: &Path,
    format: OutputFormat,
    policy: Option<&Path>,
    dedupe: bool,
    fail_on_review: bool,
) -> Result<()> {
    let policy = load_policy(policy, path)?;
    let classifier = policy.build_classifier()?;
    let mut options = policy.analysis_options()?;
    if dedupe {
        options.duplicates = DuplicatePolicy::Collapse;
    }

    let files = discover_workflow_files(path)
        .with_context(|| format!("Failed to discover workflow files at '{}'", path.display()))?;
    if files.is_empty() {
        log::info!("no workflow files found at '{}'", path.display());
    }

    let report = scanner::scan_files(&files, &classifier, &options);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
        OutputFormat::Sarif => println!("{}", serde_json::to_string_pretty(&sarif::to_sarif(&report))?),
        OutputFormat::Text => display::print_repository_report(&report),
    }

    let code = report.exit_code(fail_on_review);
    if code != 0 {
        std::process::exit(code);
    }
    Ok(())
}

fn cmd_expressions(path: &Path, policy: Option<&Path>) -> Result<()> {
    if !path.is_file() {
        anyhow::bail!("'{}' is not a file. Expressions requires a single workflow file.", path.display());
    }

    let policy = load_policy(policy, path)?;
    let classifier = policy.build_classifier()?;
    let options = policy.analysis_options()?;

    let doc = GitHubActionsParser::parse_file(path)
        .with_context(|| format!("Failed to parse {}", path.display()))?;
    let findings =
        scriptguard_core::security::injection::classify_document(&doc, &classifier, &options.delimiters);

    display::print_expressions(&doc, &findings);
    Ok(())
}

fn cmd_rules(policy: Option<&Path>) -> Result<()> {
    let cwd = std::env::current_dir().context("Failed to read current directory")?;
    let policy = load_policy(policy, &cwd)?;
    let classifier = policy.build_classifier()?;
    display::print_rules(&classifier);
    Ok(())
}
