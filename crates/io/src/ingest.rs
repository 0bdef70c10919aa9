//! Turn an uploaded registry file into a `Dataset`.

use std::collections::HashMap;
use std::path::Path;

use roster_recon::{Cell, Dataset};

use crate::MAX_INPUT_BYTES;

pub const SPREADSHEET_EXTENSIONS: &[&str] = &["xls", "xlsx", "xlsm", "xlsb", "ods"];
pub const TEXT_EXTENSIONS: &[&str] = &["csv", "tsv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputFormat {
    Spreadsheet,
    Delimited,
}

/// Classify `path` by extension, rejecting anything not accepted for upload.
pub fn detect_format(path: &Path) -> Result<InputFormat, String> {
    let ext = path
        .extension()
        .and_then(|e| e.to_str())
        .map(|e| e.to_ascii_lowercase())
        .unwrap_or_default();

    if SPREADSHEET_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputFormat::Spreadsheet)
    } else if TEXT_EXTENSIONS.contains(&ext.as_str()) {
        Ok(InputFormat::Delimited)
    } else {
        let allowed: Vec<String> = SPREADSHEET_EXTENSIONS
            .iter()
            .chain(TEXT_EXTENSIONS)
            .map(|e| format!(".{e}"))
            .collect();
        Err(format!(
            "Unsupported file type '{}': expected one of {}",
            path.display(),
            allowed.join(", ")
        ))
    }
}

fn check_size(path: &Path) -> Result<(), String> {
    let meta = std::fs::metadata(path)
        .map_err(|e| format!("Cannot read '{}': {}", path.display(), e))?;
    if meta.len() > MAX_INPUT_BYTES {
        return Err(format!(
            "'{}' is {:.1} MB; the limit is {} MB",
            path.display(),
            meta.len() as f64 / (1024.0 * 1024.0),
            MAX_INPUT_BYTES / (1024 * 1024)
        ));
    }
    Ok(())
}

/// Raw grid of a supported file, header row first.
pub fn read_grid(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>, String> {
    let format = detect_format(path)?;
    check_size(path)?;
    match format {
        InputFormat::Spreadsheet => crate::xlsx::import(path, sheet),
        InputFormat::Delimited => {
            if let Some(name) = sheet {
                log::warn!("sheet '{}' ignored for delimited file '{}'", name, path.display());
            }
            crate::csv::import(path)
        }
    }
}

/// Header row of a supported file, normalized the same way `load_dataset` does.
pub fn read_header(path: &Path, sheet: Option<&str>) -> Result<Vec<String>, String> {
    let grid = read_grid(path, sheet)?;
    let first = grid
        .into_iter()
        .find(|row| !row_is_blank(row))
        .ok_or_else(|| format!("'{}' has no header row", path.display()))?;
    Ok(header_names(&first, 0))
}

/// Load a registry file: first non-blank row is the header, blank rows are dropped.
pub fn load_dataset(path: &Path, sheet: Option<&str>, label: &str) -> Result<Dataset, String> {
    let grid = read_grid(path, sheet)?;
    let dataset = grid_to_dataset(label, grid)
        .map_err(|e| format!("'{}': {}", path.display(), e))?;
    log::info!(
        "loaded {} row(s) x {} column(s) from '{}'",
        dataset.len(),
        dataset.columns.len(),
        path.display()
    );
    Ok(dataset)
}

pub fn grid_to_dataset(label: &str, grid: Vec<Vec<Cell>>) -> Result<Dataset, String> {
    let mut rows = grid.into_iter().filter(|row| !row_is_blank(row));
    let header = rows.next().ok_or_else(|| "file has no header row".to_string())?;

    let body: Vec<Vec<Cell>> = rows.collect();
    let width = body.iter().map(Vec::len).fold(header.len(), usize::max);

    let mut dataset = Dataset::new(label, header_names(&header, width));
    for row in body {
        dataset.push_row(row);
    }
    Ok(dataset)
}

fn row_is_blank(row: &[Cell]) -> bool {
    row.iter().all(|c| match c {
        Cell::Text(s) => s.trim().is_empty(),
        other => other.is_empty(),
    })
}

/// Trimmed header names, at least `width` of them.
///
/// Blank names become `Unnamed: <index>`; repeated names get a `.1`, `.2`
/// suffix so every column stays addressable.
fn header_names(header: &[Cell], width: usize) -> Vec<String> {
    let mut seen: HashMap<String, usize> = HashMap::new();
    (0..header.len().max(width))
        .map(|i| {
            let raw = header.get(i).map(|c| c.to_string()).unwrap_or_default();
            let name = match raw.trim() {
                "" => format!("Unnamed: {i}"),
                trimmed => trimmed.to_string(),
            };
            let count = seen.entry(name.clone()).or_insert(0);
            let unique = if *count == 0 { name } else { format!("{name}.{count}") };
            *count += 1;
            unique
        })
        .collect()
}
