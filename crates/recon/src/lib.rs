//! `roster-recon`: reconciliation of a local and a national member registry.
//!
//! Pure engine crate: receives two in-memory datasets, returns the report
//! (existence diffs, per-attribute field diffs, enriched datasets).
//! No CLI or IO dependencies.

pub mod aggregate;
pub mod classify;
pub mod compare;
pub mod config;
pub mod derived;
pub mod engine;
pub mod error;
pub mod evidence;
pub mod identity;
pub mod matcher;
pub mod model;

pub use config::{ReconConfig, SchemaKind};
pub use engine::run;
pub use error::ReconError;
pub use model::{Cell, Dataset, ReconReport, ReconSummary};
