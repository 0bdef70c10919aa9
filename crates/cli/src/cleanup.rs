//! `roster cleanup`: prune report output older than a cutoff.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

use clap::Args;

use crate::CliError;

#[derive(Args)]
pub struct CleanupArgs {
    /// Directory whose entries are pruned (not the directory itself)
    pub dir: PathBuf,

    /// Remove entries last modified more than this many hours ago
    #[arg(long, default_value = "1")]
    pub max_age_hours: u64,

    /// List what would be removed without deleting anything
    #[arg(long)]
    pub dry_run: bool,
}

pub fn cmd_cleanup(args: CleanupArgs) -> Result<(), CliError> {
    if !args.dir.is_dir() {
        return Err(CliError::args(format!("'{}' is not a directory", args.dir.display())));
    }
    let max_age = Duration::from_secs(args.max_age_hours.saturating_mul(3600));
    let stale = stale_entries(&args.dir, max_age, SystemTime::now())?;

    let mut removed = 0usize;
    for path in &stale {
        if args.dry_run {
            println!("{}", path.display());
            continue;
        }
        let result = if path.is_dir() {
            std::fs::remove_dir_all(path)
        } else {
            std::fs::remove_file(path)
        };
        match result {
            Ok(()) => {
                log::info!("removed '{}'", path.display());
                removed += 1;
            }
            Err(e) => log::warn!("cannot remove '{}': {}", path.display(), e),
        }
    }

    if args.dry_run {
        eprintln!("{} entr(ies) older than {}h (dry run)", stale.len(), args.max_age_hours);
    } else {
        eprintln!("removed {} of {} entr(ies) older than {}h", removed, stale.len(), args.max_age_hours);
    }
    Ok(())
}

/// Direct children of `dir` whose modification time is more than `max_age` before `now`.
fn stale_entries(dir: &Path, max_age: Duration, now: SystemTime) -> Result<Vec<PathBuf>, CliError> {
    let entries = std::fs::read_dir(dir)
        .map_err(|e| CliError::io(format!("cannot read '{}': {e}", dir.display())))?;

    let mut stale = Vec::new();
    for entry in entries {
        let entry = entry.map_err(|e| CliError::io(format!("cannot read '{}': {e}", dir.display())))?;
        let path = entry.path();
        let modified = match entry.metadata().and_then(|m| m.modified()) {
            Ok(t) => t,
            Err(e) => {
                log::warn!("skipping '{}': {}", path.display(), e);
                continue;
            }
        };
        // Entries stamped in the future have age zero.
        let age = now.duration_since(modified).unwrap_or_default();
        if age > max_age {
            stale.push(path);
        }
    }
    stale.sort();
    Ok(stale)
}
