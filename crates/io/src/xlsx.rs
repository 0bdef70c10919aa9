// Excel import (xls, xlsx, xlsm, xlsb, ods)

use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader, Sheets};
use chrono::NaiveDate;
use roster_recon::Cell;

/// Largest float still written back as a whole number.
const MAX_EXACT_INT: f64 = 1e15;

/// Read one worksheet into a grid of cells (header row included).
///
/// Without `sheet` the first worksheet is used. Columns keep their absolute
/// position: a used range starting at column C gets two leading empty cells.
pub fn import(path: &Path, sheet: Option<&str>) -> Result<Vec<Vec<Cell>>, String> {
    let mut workbook: Sheets<_> = open_workbook_auto(path)
        .map_err(|e| format!("Failed to open Excel file '{}': {}", path.display(), e))?;

    let sheet_names: Vec<String> = workbook.sheet_names().to_vec();
    let sheet_name = match sheet {
        Some(wanted) => sheet_names
            .iter()
            .find(|n| n.as_str() == wanted)
            .cloned()
            .ok_or_else(|| {
                format!(
                    "Sheet '{}' not found in '{}' (available: {})",
                    wanted,
                    path.display(),
                    sheet_names.join(", ")
                )
            })?,
        None => sheet_names
            .first()
            .cloned()
            .ok_or_else(|| format!("Excel file '{}' contains no sheets", path.display()))?,
    };

    let range = workbook
        .worksheet_range(&sheet_name)
        .map_err(|e| format!("Failed to read sheet '{}': {}", sheet_name, e))?;

    let (_, start_col) = range.start().unwrap_or((0, 0));
    let lead = start_col as usize;

    let grid = range
        .rows()
        .map(|row| {
            let mut cells = vec![Cell::Empty; lead];
            cells.extend(row.iter().map(data_to_cell));
            cells
        })
        .collect();

    log::debug!("read sheet '{}' from '{}'", sheet_name, path.display());
    Ok(grid)
}

/// Convert a calamine value into a roster cell.
pub fn data_to_cell(data: &Data) -> Cell {
    match data {
        Data::Empty => Cell::Empty,
        Data::String(s) => Cell::text(s.as_str()),
        Data::Float(n) => {
            // Integers without decimals
            if n.fract() == 0.0 && n.abs() < MAX_EXACT_INT {
                Cell::Int(*n as i64)
            } else {
                Cell::Float(*n)
            }
        }
        Data::Int(n) => Cell::Int(*n),
        Data::Bool(b) => Cell::Bool(*b),
        Data::Error(e) => Cell::Text(format!("#{:?}", e)),
        Data::DateTime(dt) => {
            // 1900 date system assumed; calamine does not expose the 1904 flag.
            let serial = dt.as_f64();
            serial_to_date(serial)
                .map(Cell::Date)
                .unwrap_or(Cell::Float(serial))
        }
        Data::DateTimeIso(s) => s
            .get(..10)
            .and_then(|d| NaiveDate::parse_from_str(d, "%Y-%m-%d").ok())
            .map(Cell::Date)
            .unwrap_or_else(|| Cell::text(s.as_str())),
        Data::DurationIso(s) => Cell::text(s.as_str()),
    }
}

/// Day part of an Excel serial. Pure times (serial < 1) have no date.
fn serial_to_date(serial: f64) -> Option<NaiveDate> {
    if !(1.0..2_958_466.0).contains(&serial) {
        return None;
    }
    let epoch = NaiveDate::from_ymd_opt(1899, 12, 30)?;
    epoch.checked_add_days(chrono::Days::new(serial.floor() as u64))
}

/// Convert column index to Excel column letter (0 = A, 25 = Z, 26 = AA, etc.)
pub fn col_to_letter(col: usize) -> String {
    let mut result = String::new();
    let mut n = col;
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}
