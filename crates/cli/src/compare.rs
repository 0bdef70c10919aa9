//! `roster compare`: config-driven reconciliation of two registry files.

use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use clap::Args;
use roster_io::export::{default_file_name, write_report, ExportOptions};
use roster_io::ingest::load_dataset;
use roster_recon::{ReconReport, SchemaKind};
use serde::Serialize;

use crate::exit_codes::EXIT_DISCREPANCIES;
use crate::{settings, validate, CliError};

#[derive(Args)]
pub struct CompareArgs {
    /// Local (单机) registry file
    pub local: PathBuf,

    /// National (全国) registry file
    pub national: PathBuf,

    /// Config file (defaults to the user config, then the built-in table)
    #[arg(long, env = "ROSTER_CONFIG")]
    pub config: Option<PathBuf>,

    /// Override the config's reference date (YYYY-MM-DD)
    #[arg(long, value_name = "DATE")]
    pub reference_date: Option<NaiveDate>,

    /// Worksheet of the local file (defaults to the first)
    #[arg(long)]
    pub local_sheet: Option<String>,

    /// Worksheet of the national file (defaults to the first)
    #[arg(long)]
    pub national_sheet: Option<String>,

    /// Check both headers against 单机模板/全国模板 in this directory first
    #[arg(long, value_name = "DIR", env = "ROSTER_TEMPLATES")]
    pub templates: Option<PathBuf>,

    /// Workbook to write
    #[arg(long, short = 'o', conflicts_with = "out_dir")]
    pub output: Option<PathBuf>,

    /// Directory for a timestamped workbook (比对结果_<time>.xlsx)
    #[arg(long, value_name = "DIR")]
    pub out_dir: Option<PathBuf>,

    /// Output JSON to stdout in addition to the human summary
    #[arg(long)]
    pub json: bool,

    /// Write JSON output to file
    #[arg(long, value_name = "FILE")]
    pub json_output: Option<PathBuf>,

    /// Leave the enriched datasets out of the workbook
    #[arg(long)]
    pub no_datasets: bool,

    /// Exit 1 when the registries differ
    #[arg(long)]
    pub strict_exit: bool,
}

/// Machine-readable result: where the workbook went plus the full report.
#[derive(Serialize)]
struct CompareOutput<'a> {
    workbook: String,
    sheets: &'a [String],
    #[serde(flatten)]
    report: &'a ReconReport,
}

pub fn cmd_compare(args: CompareArgs) -> Result<(), CliError> {
    let (mut config, source) = settings::resolve_config(args.config.as_deref())?;
    if let Some(date) = args.reference_date {
        config = config.with_reference_date(date);
    }
    log::info!("config '{}' from {}", config.name, source);

    if let Some(dir) = &args.templates {
        let validator = validate::load_templates(dir)?;
        for (schema, file, sheet) in [
            (SchemaKind::Local, &args.local, &args.local_sheet),
            (SchemaKind::National, &args.national, &args.national_sheet),
        ] {
            let check = validator
                .validate_file(schema, file, sheet.as_deref())
                .map_err(CliError::io)?;
            if !check.valid {
                return Err(validate::template_error(file, &check));
            }
        }
    }

    let local = load_dataset(&args.local, args.local_sheet.as_deref(), &config.schemas.local.label)
        .map_err(CliError::io)?;
    let national = load_dataset(&args.national, args.national_sheet.as_deref(), &config.schemas.national.label)
        .map_err(CliError::io)?;

    let report = roster_recon::run(&config, local, national).map_err(CliError::recon)?;

    let workbook_path = output_path(args.output.as_deref(), args.out_dir.as_deref())?;
    let options = ExportOptions { include_datasets: !args.no_datasets };
    let export = write_report(&report, &workbook_path, &options).map_err(CliError::io)?;

    if args.json || args.json_output.is_some() {
        let output = CompareOutput {
            workbook: workbook_path.display().to_string(),
            sheets: &export.sheets,
            report: &report,
        };
        let json_str = serde_json::to_string_pretty(&output)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        if let Some(path) = &args.json_output {
            std::fs::write(path, &json_str)
                .map_err(|e| CliError::io(format!("cannot write output: {e}")))?;
            eprintln!("wrote {}", path.display());
        }
        if args.json {
            println!("{json_str}");
        }
    }

    print_summary(&report);
    eprintln!("wrote {} ({} sheets)", workbook_path.display(), export.sheets.len());

    if args.strict_exit && report.summary.has_discrepancies() {
        return Err(CliError::new(EXIT_DISCREPANCIES, "registries differ (--strict-exit)"));
    }
    Ok(())
}

fn output_path(output: Option<&Path>, out_dir: Option<&Path>) -> Result<PathBuf, CliError> {
    if let Some(path) = output {
        return Ok(path.to_path_buf());
    }
    let dir = out_dir.unwrap_or_else(|| Path::new("."));
    std::fs::create_dir_all(dir)
        .map_err(|e| CliError::io(format!("cannot create '{}': {e}", dir.display())))?;
    Ok(dir.join(default_file_name(chrono::Local::now().naive_local())))
}

fn print_summary(report: &ReconReport) {
    let s = &report.summary;
    let local = &report.local.label;
    let national = &report.national.label;
    eprintln!(
        "{local} {} row(s), {national} {} row(s): {} matched key(s), {} only in {local}, {} only in {national}",
        s.local_rows, s.national_rows, s.matched_keys, s.local_extra, s.national_extra,
    );
    for diff in &report.field_diffs {
        if diff.is_skipped() {
            eprintln!("  {:<8} skipped (column not present)", diff.label);
        } else if !diff.rows.is_empty() {
            eprintln!("  {:<8} {} difference(s)", diff.label, diff.rows.len());
        }
    }
    if s.duplicate_keys > 0 {
        eprintln!("warning: {} duplicate identity key(s)", s.duplicate_keys);
    }
}
