//! Header checks against the two standard registry templates.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use roster_recon::SchemaKind;
use serde::Serialize;

use crate::ingest::read_header;
use crate::xlsx::col_to_letter;

pub const LOCAL_TEMPLATE: &str = "单机模板";
pub const NATIONAL_TEMPLATE: &str = "全国模板";

/// Placeholder for a position that exists on one side only.
pub const ABSENT: &str = "(none)";

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDetail {
    /// Spreadsheet column letter (A, B, ..., AA).
    pub position: String,
    pub expected: String,
    pub actual: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TemplateCheck {
    pub schema: SchemaKind,
    pub valid: bool,
    pub missing_columns: Vec<String>,
    pub extra_columns: Vec<String>,
    pub order_mismatch: bool,
    pub column_details: Vec<ColumnDetail>,
}

impl TemplateCheck {
    /// One-line summary for logs and error messages.
    pub fn describe(&self) -> String {
        if self.valid {
            return format!("{} header matches the template", self.schema);
        }
        let mut parts = Vec::new();
        if !self.missing_columns.is_empty() {
            parts.push(format!("missing columns: {}", self.missing_columns.join(", ")));
        }
        if !self.extra_columns.is_empty() {
            parts.push(format!("unexpected columns: {}", self.extra_columns.join(", ")));
        }
        if self.order_mismatch {
            parts.push("column order differs".to_string());
        }
        format!("{} header does not match the template ({})", self.schema, parts.join("; "))
    }
}

/// Expected header of each registry, loaded once and passed by reference.
#[derive(Debug, Clone)]
pub struct TemplateValidator {
    local: Vec<String>,
    national: Vec<String>,
}

impl TemplateValidator {
    /// Read `单机模板` and `全国模板` (`.xls`, else `.xlsx`) from `dir`.
    pub fn load(dir: &Path) -> Result<Self, String> {
        let local = read_header(&template_path(dir, LOCAL_TEMPLATE)?, None)?;
        let national = read_header(&template_path(dir, NATIONAL_TEMPLATE)?, None)?;
        log::info!(
            "loaded templates from '{}': {} local column(s), {} national column(s)",
            dir.display(),
            local.len(),
            national.len()
        );
        Ok(Self { local, national })
    }

    pub fn from_columns(local: Vec<String>, national: Vec<String>) -> Self {
        Self { local, national }
    }

    pub fn columns(&self, schema: SchemaKind) -> &[String] {
        match schema {
            SchemaKind::Local => &self.local,
            SchemaKind::National => &self.national,
        }
    }

    pub fn validate_headers(&self, schema: SchemaKind, uploaded: &[String]) -> TemplateCheck {
        let template = self.columns(schema);
        let template_set: HashSet<&str> = template.iter().map(String::as_str).collect();
        let uploaded_set: HashSet<&str> = uploaded.iter().map(String::as_str).collect();

        let missing_columns: Vec<String> = template
            .iter()
            .filter(|c| !uploaded_set.contains(c.as_str()))
            .cloned()
            .collect();
        let extra_columns: Vec<String> = uploaded
            .iter()
            .filter(|c| !template_set.contains(c.as_str()))
            .cloned()
            .collect();

        let same_set = missing_columns.is_empty() && extra_columns.is_empty();
        let order_mismatch = same_set && template != uploaded;

        let column_details = if same_set {
            template
                .iter()
                .zip(uploaded)
                .enumerate()
                .filter(|(_, (e, a))| e != a)
                .map(|(i, (e, a))| ColumnDetail {
                    position: col_to_letter(i),
                    expected: e.clone(),
                    actual: a.clone(),
                })
                .collect()
        } else {
            (0..template.len().max(uploaded.len()))
                .filter_map(|i| {
                    let expected = template.get(i).map(String::as_str).unwrap_or(ABSENT);
                    let actual = uploaded.get(i).map(String::as_str).unwrap_or(ABSENT);
                    (expected != actual).then(|| ColumnDetail {
                        position: col_to_letter(i),
                        expected: expected.to_string(),
                        actual: actual.to_string(),
                    })
                })
                .collect()
        };

        let check = TemplateCheck {
            schema,
            valid: same_set && !order_mismatch,
            missing_columns,
            extra_columns,
            order_mismatch,
            column_details,
        };
        if !check.valid {
            log::warn!("{}", check.describe());
        }
        check
    }

    pub fn validate_file(&self, schema: SchemaKind, path: &Path, sheet: Option<&str>) -> Result<TemplateCheck, String> {
        let header = read_header(path, sheet)?;
        Ok(self.validate_headers(schema, &header))
    }
}

fn template_path(dir: &Path, stem: &str) -> Result<PathBuf, String> {
    ["xls", "xlsx"]
        .iter()
        .map(|ext| dir.join(format!("{stem}.{ext}")))
        .find(|p| p.is_file())
        .ok_or_else(|| format!("Template '{stem}.xls' not found in '{}'", dir.display()))
}
