use crate::aggregate::apply_duplicate_policy;
use crate::compare::{diff_fields, name_column, JoinView};
use crate::config::{ReconConfig, SchemaKind};
use crate::derived::enrich;
use crate::error::ReconError;
use crate::evidence::{compute_summary, RunCounts};
use crate::identity::{identity_keys, normalize_dataset_identities};
use crate::matcher::{existence_diff, inner_join, matched_key_count};
use crate::model::{Dataset, ReconMeta, ReconReport};

/// Reconcile the two registries per config.
///
/// Steps run in a fixed order: normalize and enrich local, normalize and
/// enrich national, duplicate policy, existence diff, join, field diff. The
/// datasets are consumed and handed back, enriched, inside the report.
pub fn run(config: &ReconConfig, mut local: Dataset, mut national: Dataset) -> Result<ReconReport, ReconError> {
    local.label = config.schemas.local.label.clone();
    national.label = config.schemas.national.label.clone();

    for ds in [&local, &national] {
        if ds.is_empty() {
            return Err(ReconError::EmptyDataset {
                dataset: ds.label.clone(),
            });
        }
    }

    let local_idx = prepare(&mut local, SchemaKind::Local, config)?;
    let national_idx = prepare(&mut national, SchemaKind::National, config)?;

    let mut local_keys = identity_keys(&local, local_idx);
    let mut national_keys = identity_keys(&national, national_idx);

    let mut duplicates = apply_duplicate_policy(&mut local, &mut local_keys, config.duplicates)?;
    duplicates.extend(apply_duplicate_policy(
        &mut national,
        &mut national_keys,
        config.duplicates,
    )?);

    let existence = existence_diff(&local_keys, &national_keys);
    let pairs = inner_join(&local_keys, &national_keys);
    let matched_keys = matched_key_count(&local_keys, &national_keys);

    let field_diffs = diff_fields(
        config,
        &JoinView {
            local: &local,
            national: &national,
            pairs: &pairs,
            local_keys: &local_keys,
            name_col: name_column(config, &local),
        },
    );

    let summary = compute_summary(&RunCounts {
        local: &local,
        national: &national,
        existence: &existence,
        matched_keys,
        joined_pairs: pairs.len(),
        field_diffs: &field_diffs,
        duplicates: &duplicates,
    });

    log::info!(
        "reconciled {} {} row(s) against {} {} row(s): {} matched key(s), {} + {} extra, {} field difference(s)",
        summary.local_rows,
        local.label,
        summary.national_rows,
        national.label,
        summary.matched_keys,
        summary.local_extra,
        summary.national_extra,
        summary.field_mismatches
    );

    let local_extra = local.subset(local.label.clone(), &existence.only_in_local);
    let national_extra = national.subset(national.label.clone(), &existence.only_in_national);

    Ok(ReconReport {
        meta: ReconMeta {
            config_name: config.name.clone(),
            reference_date: config.reference_date,
            engine_version: env!("CARGO_PKG_VERSION").to_string(),
            run_at: chrono::Utc::now().to_rfc3339(),
        },
        summary,
        local_extra,
        national_extra,
        field_diffs,
        duplicates,
        local,
        national,
    })
}

/// Normalize identities and add derived columns. Returns the identity column index.
fn prepare(dataset: &mut Dataset, schema: SchemaKind, config: &ReconConfig) -> Result<usize, ReconError> {
    let column = config.identity_column(schema)?;
    let idx = normalize_dataset_identities(dataset, column)?;
    let stats = enrich(dataset, schema, config)?;
    log::debug!("dataset '{}' enriched: {stats:?}", dataset.label);
    Ok(idx)
}
