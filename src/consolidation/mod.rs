pub mod backfill;
pub mod completeness;
pub mod grouping;
pub mod orchestrator;
pub mod selection;

pub use backfill::{backfill, backfill_from_all};
pub use completeness::completeness;
pub use grouping::{group, group_indices};
pub use orchestrator::{consolidate, Consolidator};
pub use selection::{compare_for_survival, select_survivor};
