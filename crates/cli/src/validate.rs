//! `roster validate`: header check of one registry file against its template.

use std::path::{Path, PathBuf};

use clap::Args;
use roster_io::template::{TemplateCheck, TemplateValidator};
use roster_recon::SchemaKind;

use crate::exit_codes::{EXIT_IO, EXIT_TEMPLATE_MISMATCH};
use crate::CliError;

#[derive(Args)]
pub struct ValidateArgs {
    /// Registry file to check (.xls, .xlsx, .csv, ...)
    pub file: PathBuf,

    /// Which template applies: local or national
    #[arg(long)]
    pub schema: SchemaKind,

    /// Directory holding 单机模板.xls and 全国模板.xls
    #[arg(long, env = "ROSTER_TEMPLATES")]
    pub templates: PathBuf,

    /// Worksheet to read (defaults to the first)
    #[arg(long)]
    pub sheet: Option<String>,

    /// Print the check result as JSON on stdout
    #[arg(long)]
    pub json: bool,
}

pub fn cmd_validate(args: ValidateArgs) -> Result<(), CliError> {
    let validator = load_templates(&args.templates)?;
    let check = validator
        .validate_file(args.schema, &args.file, args.sheet.as_deref())
        .map_err(CliError::io)?;

    if args.json {
        let json = serde_json::to_string_pretty(&check)
            .map_err(|e| CliError::io(format!("JSON serialization error: {e}")))?;
        println!("{json}");
    } else {
        print_check(&args.file, &check);
    }

    if check.valid {
        Ok(())
    } else {
        Err(template_error(&args.file, &check))
    }
}

pub fn load_templates(dir: &Path) -> Result<TemplateValidator, CliError> {
    TemplateValidator::load(dir).map_err(|e| {
        CliError::new(EXIT_IO, e).with_hint("the directory must contain 单机模板.xls and 全国模板.xls")
    })
}

pub fn template_error(file: &Path, check: &TemplateCheck) -> CliError {
    CliError::new(EXIT_TEMPLATE_MISMATCH, format!("'{}': {}", file.display(), check.describe()))
        .with_hint(format!("run `roster validate {} --schema {}` for column details", file.display(), check.schema))
}

fn print_check(file: &Path, check: &TemplateCheck) {
    if check.valid {
        eprintln!("{}: {}", file.display(), check.describe());
        return;
    }
    eprintln!("{}:", file.display());
    for detail in &check.column_details {
        eprintln!("  {:>4}  expected {:<12} found {}", detail.position, detail.expected, detail.actual);
    }
}
