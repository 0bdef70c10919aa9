//! Multi-sheet Excel rendering of a reconciliation report.

use std::collections::HashSet;
use std::path::Path;

use chrono::NaiveDateTime;
use roster_recon::model::{FieldDiff, Section};
use roster_recon::{Cell, Dataset, ReconReport};
use rust_xlsxwriter::{Color, Format, FormatAlign, Workbook, Worksheet};
use serde::Serialize;

/// Fixed header of every field-diff sheet.
pub const DIFF_HEADER: [&str; 4] = ["姓名", "身份证号", "单机表信息", "全国表信息"];

const MAX_SHEET_NAME: usize = 31;
const HEADER_FILL: u32 = 0xD9E1F2;
const COLUMN_WIDTH: f64 = 15.0;
const WIDE_COLUMNS: u16 = 11;
const EXCEL_MAX_EXACT: f64 = 1e15;

#[derive(Debug, Clone)]
pub struct ExportOptions {
    /// Append the enriched local and national datasets as two extra sheets.
    pub include_datasets: bool,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self { include_datasets: true }
    }
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct ExportResult {
    pub sheets: Vec<String>,
    pub rows_written: usize,
}

/// `比对结果_<timestamp>.xlsx`
pub fn default_file_name(now: NaiveDateTime) -> String {
    format!("比对结果_{}.xlsx", now.format("%Y%m%d%H%M%S"))
}

/// Excel-safe sheet name: forbidden characters removed, at most 31 characters.
pub fn sanitize_sheet_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .filter(|c| !matches!(c, '[' | ']' | ':' | '*' | '?' | '/' | '\\'))
        .collect();
    let trimmed = cleaned.trim_matches('\'');
    let truncated: String = trimmed.chars().take(MAX_SHEET_NAME).collect();
    if truncated.trim().is_empty() {
        "Sheet".to_string()
    } else {
        truncated
    }
}

/// Sanitized names, made unique (Excel compares case-insensitively).
struct SheetNames {
    used: HashSet<String>,
}

impl SheetNames {
    fn new() -> Self {
        Self { used: HashSet::new() }
    }

    fn claim(&mut self, wanted: &str) -> String {
        let base = sanitize_sheet_name(wanted);
        let mut name = base.clone();
        let mut n = 2;
        while !self.used.insert(name.to_lowercase()) {
            let suffix = format!("({n})");
            let room = MAX_SHEET_NAME - suffix.chars().count();
            name = format!("{}{}", base.chars().take(room).collect::<String>(), suffix);
            n += 1;
        }
        name
    }
}

pub fn write_report(report: &ReconReport, path: &Path, options: &ExportOptions) -> Result<ExportResult, String> {
    let mut workbook = Workbook::new();
    let mut names = SheetNames::new();
    let mut result = ExportResult::default();

    let header_format = Format::new()
        .set_bold()
        .set_align(FormatAlign::Center)
        .set_align(FormatAlign::VerticalCenter)
        .set_background_color(Color::RGB(HEADER_FILL));

    let mut keys = vec![
        ReconReport::LOCAL_EXTRA.to_string(),
        ReconReport::NATIONAL_EXTRA.to_string(),
    ];
    keys.extend(report.field_diffs.iter().map(|d| ReconReport::diff_key(&d.attribute)));
    if options.include_datasets {
        keys.push(ReconReport::LOCAL_PREPROCESSED.to_string());
        keys.push(ReconReport::NATIONAL_PREPROCESSED.to_string());
    }

    for key in &keys {
        let Some(section) = report.section(key) else {
            continue;
        };
        let title = match (key.as_str(), section) {
            (ReconReport::LOCAL_EXTRA | ReconReport::NATIONAL_EXTRA, Section::Records(ds)) => {
                format!("{}多出人员", ds.label)
            }
            (_, Section::Records(ds)) => format!("{}预处理数据", ds.label),
            (_, Section::Diff(diff)) => format!("{}差异", diff.label),
        };
        let name = names.claim(&title);

        let worksheet = workbook
            .add_worksheet()
            .set_name(&name)
            .map_err(|e| format!("Failed to create sheet '{}': {}", name, e))?;

        let rows = match section {
            Section::Records(ds) => write_records(worksheet, ds, &header_format)?,
            Section::Diff(diff) => write_diff(worksheet, diff, &header_format)?,
        };

        for col in 0..WIDE_COLUMNS {
            worksheet
                .set_column_width(col, COLUMN_WIDTH)
                .map_err(|e| format!("Failed to set column {} width: {}", col, e))?;
        }

        log::debug!("sheet '{}': {} row(s)", name, rows);
        result.rows_written += rows;
        result.sheets.push(name);
    }

    workbook
        .save(path)
        .map_err(|e| format!("Failed to save XLSX file '{}': {}", path.display(), e))?;

    log::info!(
        "exported {} sheet(s), {} row(s) to '{}'",
        result.sheets.len(),
        result.rows_written,
        path.display()
    );
    Ok(result)
}

fn write_header(worksheet: &mut Worksheet, header: &[&str], format: &Format) -> Result<(), String> {
    for (col, title) in header.iter().enumerate() {
        worksheet
            .write_string_with_format(0, col as u16, *title, format)
            .map_err(|e| format!("Failed to write header '{}': {}", title, e))?;
    }
    Ok(())
}

fn write_records(worksheet: &mut Worksheet, dataset: &Dataset, header_format: &Format) -> Result<usize, String> {
    let header: Vec<&str> = dataset.columns.iter().map(String::as_str).collect();
    write_header(worksheet, &header, header_format)?;

    for (i, row) in dataset.rows.iter().enumerate() {
        for (col, cell) in row.iter().enumerate() {
            write_cell(worksheet, i as u32 + 1, col as u16, cell)?;
        }
    }
    Ok(dataset.len())
}

fn write_diff(worksheet: &mut Worksheet, diff: &FieldDiff, header_format: &Format) -> Result<usize, String> {
    write_header(worksheet, &DIFF_HEADER, header_format)?;

    for (i, row) in diff.rows.iter().enumerate() {
        let r = i as u32 + 1;
        write_cell(worksheet, r, 0, &row.name)?;
        write_cell(worksheet, r, 1, &Cell::text(row.identity.as_str()))?;
        write_cell(worksheet, r, 2, &row.local_value)?;
        write_cell(worksheet, r, 3, &row.national_value)?;
    }
    Ok(diff.rows.len())
}

fn write_cell(worksheet: &mut Worksheet, row: u32, col: u16, cell: &Cell) -> Result<(), String> {
    let written = match cell {
        Cell::Empty => return Ok(()),
        Cell::Text(s) => worksheet.write_string(row, col, s),
        // Long integers (IDs stored as numbers) would lose digits as doubles.
        Cell::Int(n) if (*n as f64).abs() >= EXCEL_MAX_EXACT => worksheet.write_string(row, col, n.to_string()),
        Cell::Int(n) => worksheet.write_number(row, col, *n as f64),
        Cell::Float(n) => worksheet.write_number(row, col, *n),
        Cell::Bool(b) => worksheet.write_boolean(row, col, *b),
        Cell::Date(_) => worksheet.write_string(row, col, cell.to_string()),
    };
    written
        .map(|_| ())
        .map_err(|e| format!("Failed to write cell ({}, {}): {}", row, col, e))
}
