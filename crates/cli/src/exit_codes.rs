//! CLI Exit Code Registry
//!
//! This is the single source of truth for all CLI exit codes.
//! Exit codes are part of the shell contract; scripts rely on them.
//!
//! # Exit Codes
//!
//! | Code | Domain    | Description                                         |
//! |------|-----------|-----------------------------------------------------|
//! | 0    | Universal | Success                                             |
//! | 1    | compare   | Registries differ (only with `--strict-exit`)       |
//! | 2    | Universal | CLI usage error (bad args, bad date, unknown schema)|
//! | 3    | Universal | I/O error (unreadable input, unwritable workbook)   |
//! | 4    | config    | Config file does not parse or validate              |
//! | 5    | template  | Uploaded header does not match the template         |
//! | 6    | compare   | Fatal reconciliation error (no report produced)     |
//!
//! # Adding New Exit Codes
//!
//! 1. Add the constant
//! 2. Document what triggers it
//! 3. Update the table above
//! 4. Wire it into the relevant command's error handling

use roster_recon::ReconError;

// =============================================================================
// Universal (0-3)
// =============================================================================

/// Success - command completed without errors.
pub const EXIT_SUCCESS: u8 = 0;

/// Usage error - bad arguments, missing required options.
pub const EXIT_USAGE: u8 = 2;

/// Input could not be read or output could not be written.
pub const EXIT_IO: u8 = 3;

// =============================================================================
// Reconciliation (1, 4-6)
// =============================================================================

/// Discrepancies found and `--strict-exit` was given.
/// Like `diff(1)`, exit 1 means "inputs differ."
pub const EXIT_DISCREPANCIES: u8 = 1;

/// Config file rejected (TOML syntax, unknown key, validation rule).
pub const EXIT_CONFIG: u8 = 4;

/// Template validation failed for one of the inputs.
pub const EXIT_TEMPLATE_MISMATCH: u8 = 5;

/// Engine aborted: empty dataset, missing identity column, rejected duplicates.
pub const EXIT_RECON_FATAL: u8 = 6;

/// Map an engine error to its exit code.
pub fn recon_exit_code(err: &ReconError) -> u8 {
    match err {
        ReconError::ConfigParse(_) | ReconError::ConfigValidation(_) => EXIT_CONFIG,
        ReconError::EmptyDataset { .. }
        | ReconError::MissingColumn { .. }
        | ReconError::DuplicateKeys { .. } => EXIT_RECON_FATAL,
    }
}
