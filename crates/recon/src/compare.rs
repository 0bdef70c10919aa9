//! Field-level differ over joined record pairs.

use crate::config::{FieldMapping, FieldRole, MissingPolicy, ReconConfig, SchemaKind};
use crate::model::{Cell, Dataset, DiffStatus, FieldDiff, FieldDiffRow, JoinedPair};

/// Exact comparison with explicit handling of missing values.
pub fn values_differ(local: &Cell, national: &Cell, policy: MissingPolicy) -> bool {
    match (local.is_empty(), national.is_empty()) {
        (true, true) => policy == MissingPolicy::Differ,
        _ => local != national,
    }
}

/// Shared inputs for every attribute of one run.
pub struct JoinView<'a> {
    pub local: &'a Dataset,
    pub national: &'a Dataset,
    pub pairs: &'a [JoinedPair],
    /// Normalized identity per local row.
    pub local_keys: &'a [String],
    /// Local column carrying the display name.
    pub name_col: Option<usize>,
}

pub fn diff_field(view: &JoinView<'_>, field: &FieldMapping, policy: MissingPolicy) -> FieldDiff {
    let local_column = field.column(SchemaKind::Local);
    let national_column = field.column(SchemaKind::National);

    let mut diff = FieldDiff {
        attribute: field.attribute.clone(),
        label: field.label().to_string(),
        local_column: local_column.to_string(),
        national_column: national_column.to_string(),
        status: DiffStatus::Compared,
        rows: Vec::new(),
    };

    let local_idx = view.local.column_index(local_column);
    let national_idx = view.national.column_index(national_column);

    let (li, ni) = match (local_idx, national_idx) {
        (Some(li), Some(ni)) => (li, ni),
        _ => {
            let mut missing = Vec::new();
            if local_idx.is_none() {
                missing.push(format!("{}.{local_column}", view.local.label));
            }
            if national_idx.is_none() {
                missing.push(format!("{}.{national_column}", view.national.label));
            }
            log::warn!(
                "attribute '{}' skipped: column(s) not found: {}",
                field.attribute,
                missing.join(", ")
            );
            diff.status = DiffStatus::Skipped { missing };
            return diff;
        }
    };

    for &(lr, nr) in view.pairs {
        let local_value = view.local.cell(lr, li);
        let national_value = view.national.cell(nr, ni);
        if !values_differ(local_value, national_value, policy) {
            continue;
        }
        diff.rows.push(FieldDiffRow {
            name: view
                .name_col
                .map(|c| view.local.cell(lr, c).clone())
                .unwrap_or_default(),
            identity: view.local_keys.get(lr).cloned().unwrap_or_default(),
            local_value: local_value.clone(),
            national_value: national_value.clone(),
        });
    }

    log::debug!("attribute '{}': {} difference(s)", field.attribute, diff.rows.len());
    diff
}

/// One diff per compared attribute, in table order.
pub fn diff_fields(config: &ReconConfig, view: &JoinView<'_>) -> Vec<FieldDiff> {
    config
        .compared_fields()
        .map(|field| diff_field(view, field, config.missing_values))
        .collect()
}

/// Local column index of the name-role field, if configured and present.
pub fn name_column(config: &ReconConfig, local: &Dataset) -> Option<usize> {
    config
        .role_field(FieldRole::Name)
        .and_then(|f| local.column_index(f.column(SchemaKind::Local)))
}
