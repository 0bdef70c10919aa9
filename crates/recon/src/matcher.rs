use std::collections::{HashMap, HashSet};

use crate::model::{ExistenceDiff, JoinedPair};

fn key_set(keys: &[String]) -> HashSet<&str> {
    keys.iter().map(String::as_str).collect()
}

/// Rows whose identity key is absent from the other side's key set.
///
/// Both inputs hold one normalized key per row and keys compare by exact
/// string equality, the empty key included. Row order is kept.
pub fn existence_diff(local_keys: &[String], national_keys: &[String]) -> ExistenceDiff {
    let local_set = key_set(local_keys);
    let national_set = key_set(national_keys);

    let only = |keys: &[String], other: &HashSet<&str>| -> Vec<usize> {
        keys.iter()
            .enumerate()
            .filter(|(_, k)| !other.contains(k.as_str()))
            .map(|(i, _)| i)
            .collect()
    };

    ExistenceDiff {
        only_in_local: only(local_keys, &national_set),
        only_in_national: only(national_keys, &local_set),
    }
}

/// Inner join on identity key.
///
/// Pairs come out in local row order, then national row order within a key,
/// so a key repeated `m` times locally and `n` times nationally yields
/// `m * n` pairs.
pub fn inner_join(local_keys: &[String], national_keys: &[String]) -> Vec<JoinedPair> {
    let mut national_index: HashMap<&str, Vec<usize>> = HashMap::new();
    for (i, key) in national_keys.iter().enumerate() {
        national_index.entry(key.as_str()).or_default().push(i);
    }

    let mut pairs = Vec::new();
    for (li, key) in local_keys.iter().enumerate() {
        if let Some(rows) = national_index.get(key.as_str()) {
            pairs.extend(rows.iter().map(|&ni| (li, ni)));
        }
    }
    pairs
}

/// Number of distinct keys present on both sides.
pub fn matched_key_count(local_keys: &[String], national_keys: &[String]) -> usize {
    let national_set = key_set(national_keys);
    key_set(local_keys)
        .iter()
        .filter(|k| national_set.contains(*k))
        .count()
}
