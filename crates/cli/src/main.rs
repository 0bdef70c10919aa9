// roster - reconcile a local and a national member registry from the command line

mod cleanup;
mod compare;
mod exit_codes;
mod settings;
mod validate;

use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use exit_codes::{EXIT_IO, EXIT_SUCCESS, EXIT_USAGE};

#[derive(Parser)]
#[command(name = "roster")]
#[command(about = "Reconcile a local and a national party-member registry")]
#[command(long_version = long_version())]
#[command(version)]
struct Cli {
    /// Increase log verbosity (-v info, -vv debug). RUST_LOG overrides.
    #[arg(short, long, action = ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compare two registry files and export the discrepancy workbook
    #[command(after_help = "\
Examples:
  roster compare local.xlsx national.xls
  roster compare local.xlsx national.xls --templates ./templates
  roster compare local.csv national.csv --reference-date 2026-06-30 --output diff.xlsx
  roster compare local.xlsx national.xls --json --no-datasets
  roster compare local.xlsx national.xls --strict-exit || echo \"registries differ\"

Exit codes:
  0  success (registries may still differ unless --strict-exit)
  1  discrepancies found (--strict-exit)
  3  input unreadable or workbook not written
  4  invalid config
  5  header does not match the template (--templates)
  6  reconciliation aborted (empty dataset, missing identity column, rejected duplicates)")]
    Compare(compare::CompareArgs),

    /// Check a registry file's header against the standard template
    #[command(after_help = "\
Examples:
  roster validate local.xlsx --schema local --templates ./templates
  roster validate national.xls --schema national --templates ./templates --json")]
    Validate(validate::ValidateArgs),

    /// Inspect or check reconciliation config files
    #[command(subcommand)]
    Config(settings::ConfigCommands),

    /// Remove stale report files and directories
    #[command(after_help = "\
Examples:
  roster cleanup ./reports
  roster cleanup ./reports --max-age-hours 24 --dry-run")]
    Cleanup(cleanup::CleanupArgs),
}

fn long_version() -> &'static str {
    concat!(
        env!("CARGO_PKG_VERSION"),
        " (", env!("GIT_COMMIT_HASH"), ")",
        "\nengine:  roster-recon ", env!("CARGO_PKG_VERSION"),
    )
}

fn init_logging(verbose: u8) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .format_timestamp(None)
        .format_target(false)
        .init();
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Compare(args) => compare::cmd_compare(args),
        Commands::Validate(args) => validate::cmd_validate(args),
        Commands::Config(cmd) => settings::cmd_config(cmd),
        Commands::Cleanup(args) => cleanup::cmd_cleanup(args),
    };

    match result {
        Ok(()) => ExitCode::from(EXIT_SUCCESS),
        Err(CliError { code, message, hint }) => {
            if !message.is_empty() {
                eprintln!("error: {}", message);
            }
            if let Some(hint) = hint {
                eprintln!("hint:  {}", hint);
            }
            ExitCode::from(code)
        }
    }
}

#[derive(Debug)]
pub struct CliError {
    pub code: u8,
    pub message: String,
    pub hint: Option<String>,
}

impl CliError {
    pub fn new(code: u8, msg: impl Into<String>) -> Self {
        Self { code, message: msg.into(), hint: None }
    }

    pub fn args(msg: impl Into<String>) -> Self {
        Self::new(EXIT_USAGE, msg)
    }

    pub fn io(msg: impl Into<String>) -> Self {
        Self::new(EXIT_IO, msg)
    }

    /// Create error from an engine error with the matching exit code.
    pub fn recon(err: roster_recon::ReconError) -> Self {
        let code = exit_codes::recon_exit_code(&err);
        let hint = match &err {
            roster_recon::ReconError::MissingColumn { .. } => {
                Some("check the `fields` table of the config against the file header".to_string())
            }
            roster_recon::ReconError::DuplicateKeys { .. } => {
                Some("set `duplicates = \"keep\"` or \"first\" to reconcile anyway".to_string())
            }
            _ => None,
        };
        Self { code, message: err.to_string(), hint }
    }

    /// Add a hint to an existing error.
    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }
}
