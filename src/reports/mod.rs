pub mod decision_log;
pub mod duplicates;
pub mod existence;

pub use decision_log::{summarize, write_decision_log, DecisionSummary};
pub use duplicates::{duplicate_report_rows, find_duplicate_keys, DuplicateKey};
pub use existence::{verify_existence, ExistenceReport, ExistenceStatus};
