// File I/O for roster reconciliation: ingestion, template checks, report export

pub mod csv;
pub mod export;
pub mod ingest;
pub mod template;
pub mod xlsx;

/// Uploads larger than this are refused before parsing.
pub const MAX_INPUT_BYTES: u64 = 10 * 1024 * 1024;
