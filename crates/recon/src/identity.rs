//! Identity-key canonicalization.

use crate::error::ReconError;
use crate::model::{Cell, Dataset};

/// Canonical form of an identity cell: trimmed and uppercased text.
///
/// No format validation happens here. Malformed keys simply fail to match.
pub fn normalize_identity(cell: &Cell) -> String {
    cell.to_string().trim().to_uppercase()
}

/// Rewrite `column` of `dataset` with normalized identity text, in place.
///
/// Returns the column index. A missing identity column is fatal.
pub fn normalize_dataset_identities(dataset: &mut Dataset, column: &str) -> Result<usize, ReconError> {
    let idx = dataset
        .column_index(column)
        .ok_or_else(|| ReconError::MissingColumn {
            dataset: dataset.label.clone(),
            column: column.into(),
        })?;

    for row in &mut dataset.rows {
        if row.len() <= idx {
            row.resize(idx + 1, Cell::Empty);
        }
        let normalized = normalize_identity(&row[idx]);
        row[idx] = Cell::text(normalized);
    }

    Ok(idx)
}

/// Normalized key of every row, in row order. Empty keys stay empty.
pub fn identity_keys(dataset: &Dataset, idx: usize) -> Vec<String> {
    (0..dataset.len())
        .map(|row| normalize_identity(dataset.cell(row, idx)))
        .collect()
}
