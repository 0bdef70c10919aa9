use std::fmt;

use chrono::NaiveDate;
use serde::{Serialize, Serializer};

// ---------------------------------------------------------------------------
// Cells
// ---------------------------------------------------------------------------

/// A single spreadsheet value.
///
/// Equality is exact and never coerces between variants: `Text("1")` and
/// `Int(1)` differ, as do `Text("2020-01-01")` and a `Date` of the same day.
/// `Empty` is the missing-value sentinel.
#[derive(Debug, Clone, PartialEq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Text(String),
    Int(i64),
    Float(f64),
    Bool(bool),
    Date(NaiveDate),
}

impl Cell {
    pub fn text(s: impl Into<String>) -> Self {
        let s = s.into();
        if s.is_empty() {
            Cell::Empty
        } else {
            Cell::Text(s)
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, Cell::Empty)
    }
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Empty => Ok(()),
            Cell::Text(s) => f.write_str(s),
            Cell::Int(n) => write!(f, "{n}"),
            Cell::Float(n) => write!(f, "{n}"),
            Cell::Bool(b) => f.write_str(if *b { "TRUE" } else { "FALSE" }),
            Cell::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
        }
    }
}

impl Serialize for Cell {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            Cell::Empty => serializer.serialize_none(),
            Cell::Text(s) => serializer.serialize_str(s),
            Cell::Int(n) => serializer.serialize_i64(*n),
            Cell::Float(n) => serializer.serialize_f64(*n),
            Cell::Bool(b) => serializer.serialize_bool(*b),
            Cell::Date(d) => serializer.collect_str(&d.format("%Y-%m-%d")),
        }
    }
}

// ---------------------------------------------------------------------------
// Datasets
// ---------------------------------------------------------------------------

/// One registry: ordered records sharing a header.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Dataset {
    pub label: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Dataset {
    pub fn new(label: impl Into<String>, columns: Vec<String>) -> Self {
        Self {
            label: label.into(),
            columns,
            rows: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Cell at `(row, col)`; short rows read as `Empty`.
    pub fn cell(&self, row: usize, col: usize) -> &Cell {
        const EMPTY: &Cell = &Cell::Empty;
        self.rows
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(EMPTY)
    }

    pub fn push_row(&mut self, mut row: Vec<Cell>) {
        row.resize(self.columns.len(), Cell::Empty);
        self.rows.push(row);
    }

    /// Replace the column named `name` in place, or append it when absent.
    ///
    /// `values` must hold one cell per row.
    pub fn set_column(&mut self, name: &str, values: Vec<Cell>) {
        debug_assert_eq!(values.len(), self.rows.len());
        let idx = match self.column_index(name) {
            Some(i) => i,
            None => {
                self.columns.push(name.to_string());
                self.columns.len() - 1
            }
        };
        let width = self.columns.len();
        for (row, value) in self.rows.iter_mut().zip(values) {
            if row.len() < width {
                row.resize(width, Cell::Empty);
            }
            row[idx] = value;
        }
    }

    /// New dataset with the same header holding the rows at `indices`, in order.
    pub fn subset(&self, label: impl Into<String>, indices: &[usize]) -> Dataset {
        Dataset {
            label: label.into(),
            columns: self.columns.clone(),
            rows: indices.iter().filter_map(|&i| self.rows.get(i).cloned()).collect(),
        }
    }
}

// ---------------------------------------------------------------------------
// Existence + join
// ---------------------------------------------------------------------------

/// Row indices present in one dataset's key set but absent from the other's.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ExistenceDiff {
    pub only_in_local: Vec<usize>,
    pub only_in_national: Vec<usize>,
}

/// One joined record pair: (local row index, national row index).
pub type JoinedPair = (usize, usize);

// ---------------------------------------------------------------------------
// Field diffs
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiffRow {
    pub name: Cell,
    pub identity: String,
    pub local_value: Cell,
    pub national_value: Cell,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DiffStatus {
    Compared,
    /// Column absent from one or both datasets; no rows produced.
    Skipped { missing: Vec<String> },
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FieldDiff {
    pub attribute: String,
    pub label: String,
    pub local_column: String,
    pub national_column: String,
    pub status: DiffStatus,
    pub rows: Vec<FieldDiffRow>,
}

impl FieldDiff {
    pub fn is_skipped(&self) -> bool {
        matches!(self.status, DiffStatus::Skipped { .. })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DuplicateKey {
    pub dataset: String,
    pub key: String,
    pub count: usize,
}

// ---------------------------------------------------------------------------
// Summary + Output
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct ReconSummary {
    pub local_rows: usize,
    pub national_rows: usize,
    pub matched_keys: usize,
    pub joined_pairs: usize,
    pub local_extra: usize,
    pub national_extra: usize,
    pub field_mismatches: usize,
    pub skipped_fields: usize,
    pub duplicate_keys: usize,
}

impl ReconSummary {
    /// True when the registries disagree in any way.
    pub fn has_discrepancies(&self) -> bool {
        self.local_extra > 0 || self.national_extra > 0 || self.field_mismatches > 0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconMeta {
    pub config_name: String,
    pub reference_date: NaiveDate,
    pub engine_version: String,
    pub run_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReconReport {
    pub meta: ReconMeta,
    pub summary: ReconSummary,
    pub local_extra: Dataset,
    pub national_extra: Dataset,
    pub field_diffs: Vec<FieldDiff>,
    pub duplicates: Vec<DuplicateKey>,
    pub local: Dataset,
    pub national: Dataset,
}

/// A report section addressed by key.
#[derive(Debug, Clone, Copy)]
pub enum Section<'a> {
    Records(&'a Dataset),
    Diff(&'a FieldDiff),
}

impl ReconReport {
    pub const LOCAL_EXTRA: &'static str = "local_extra";
    pub const NATIONAL_EXTRA: &'static str = "national_extra";
    pub const LOCAL_PREPROCESSED: &'static str = "local_preprocessed";
    pub const NATIONAL_PREPROCESSED: &'static str = "national_preprocessed";

    pub fn diff_key(attribute: &str) -> String {
        format!("diff_{attribute}")
    }

    /// Section keys in export order.
    pub fn section_keys(&self) -> Vec<String> {
        let mut keys = vec![Self::LOCAL_EXTRA.to_string(), Self::NATIONAL_EXTRA.to_string()];
        keys.extend(self.field_diffs.iter().map(|d| Self::diff_key(&d.attribute)));
        keys.push(Self::LOCAL_PREPROCESSED.to_string());
        keys.push(Self::NATIONAL_PREPROCESSED.to_string());
        keys
    }

    pub fn section(&self, key: &str) -> Option<Section<'_>> {
        match key {
            Self::LOCAL_EXTRA => Some(Section::Records(&self.local_extra)),
            Self::NATIONAL_EXTRA => Some(Section::Records(&self.national_extra)),
            Self::LOCAL_PREPROCESSED => Some(Section::Records(&self.local)),
            Self::NATIONAL_PREPROCESSED => Some(Section::Records(&self.national)),
            other => {
                let attribute = other.strip_prefix("diff_")?;
                self.field_diff(attribute).map(Section::Diff)
            }
        }
    }

    pub fn field_diff(&self, attribute: &str) -> Option<&FieldDiff> {
        self.field_diffs.iter().find(|d| d.attribute == attribute)
    }
}
