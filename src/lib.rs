// src/lib.rs
pub mod consolidation;
pub mod error;
pub mod models;
pub mod reports;
pub mod source;
pub mod table;
pub mod utils;

pub use consolidation::{consolidate, Consolidator};
pub use error::ConsolidationError;
pub use models::{ConsolidationResult, GroupFailure, Record, RecordId};
