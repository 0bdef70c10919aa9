use std::collections::HashMap;

use crate::config::DuplicatePolicy;
use crate::error::ReconError;
use crate::model::{Dataset, DuplicateKey};

/// Identity keys occurring more than once, in order of first occurrence.
///
/// The empty key counts like any other: blank identities match each other.
pub fn find_duplicates(label: &str, keys: &[String]) -> Vec<DuplicateKey> {
    let mut counts: HashMap<&str, usize> = HashMap::new();
    let mut order: Vec<&str> = Vec::new();

    for key in keys {
        let count = counts.entry(key.as_str()).or_insert(0);
        if *count == 0 {
            order.push(key.as_str());
        }
        *count += 1;
    }

    order
        .into_iter()
        .filter_map(|key| {
            let count = counts[key];
            (count > 1).then(|| DuplicateKey {
                dataset: label.to_string(),
                key: key.to_string(),
                count,
            })
        })
        .collect()
}

/// Apply the duplicate policy to `dataset` in place.
///
/// `keys` holds the normalized identity of every row and is updated
/// alongside the dataset. Returns the duplicates found before any row was
/// dropped.
pub fn apply_duplicate_policy(
    dataset: &mut Dataset,
    keys: &mut Vec<String>,
    policy: DuplicatePolicy,
) -> Result<Vec<DuplicateKey>, ReconError> {
    let duplicates = find_duplicates(&dataset.label, keys);
    if duplicates.is_empty() {
        return Ok(duplicates);
    }

    let extra_rows: usize = duplicates.iter().map(|d| d.count - 1).sum();
    match policy {
        DuplicatePolicy::Keep => {
            log::warn!(
                "dataset '{}': {} identity key(s) repeat ({} extra row(s)); every combination will be compared",
                dataset.label,
                duplicates.len(),
                extra_rows
            );
        }
        DuplicatePolicy::First => {
            let mut seen = std::collections::HashSet::new();
            let keep: Vec<bool> = keys
                .iter()
                .map(|k| seen.insert(k.clone()))
                .collect();

            let mut flags = keep.iter();
            dataset.rows.retain(|_| flags.next().copied().unwrap_or(true));
            let mut flags = keep.iter();
            keys.retain(|_| flags.next().copied().unwrap_or(true));

            log::warn!(
                "dataset '{}': dropped {} row(s) with repeated identity keys, keeping the first of each",
                dataset.label,
                extra_rows
            );
        }
        DuplicatePolicy::Reject => {
            return Err(ReconError::DuplicateKeys {
                dataset: dataset.label.clone(),
                keys: duplicates.into_iter().map(|d| d.key).collect(),
            });
        }
    }

    Ok(duplicates)
}
