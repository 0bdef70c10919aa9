use crate::model::{Dataset, DuplicateKey, ExistenceDiff, FieldDiff, ReconSummary};

/// Counts gathered from one run, before assembly into the report.
pub struct RunCounts<'a> {
    pub local: &'a Dataset,
    pub national: &'a Dataset,
    pub existence: &'a ExistenceDiff,
    pub matched_keys: usize,
    pub joined_pairs: usize,
    pub field_diffs: &'a [FieldDiff],
    pub duplicates: &'a [DuplicateKey],
}

/// Compute summary statistics for a finished run.
pub fn compute_summary(counts: &RunCounts<'_>) -> ReconSummary {
    ReconSummary {
        local_rows: counts.local.len(),
        national_rows: counts.national.len(),
        matched_keys: counts.matched_keys,
        joined_pairs: counts.joined_pairs,
        local_extra: counts.existence.only_in_local.len(),
        national_extra: counts.existence.only_in_national.len(),
        field_mismatches: counts.field_diffs.iter().map(|d| d.rows.len()).sum(),
        skipped_fields: counts.field_diffs.iter().filter(|d| d.is_skipped()).count(),
        duplicate_keys: counts.duplicates.len(),
    }
}
