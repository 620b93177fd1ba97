//! Weekly digest pipeline: ISO-week calculus, article identity and
//! deduplication, week filtering, per-week grouping and merging into
//! persisted digest state.
//!
//! Everything here is pure. The reference instant `now` is always passed in
//! by the caller and nothing reads the system clock.

mod assembly;
mod filter;
mod grouping;
mod identity;
mod week;

pub use assembly::{merge_articles, select_current_digest, with_generated_content};
pub(crate) use assembly::absorb_digest;
pub use filter::{
    filter_current_week, filter_specific_week, is_current_week, is_stale, sort_newest_first,
    DEFAULT_RETENTION_DAYS, MAX_RETENTION_DAYS,
};
pub use grouping::{group_by_week, group_by_week_with, DigestMap, Grouped, GroupingOptions};
pub use identity::{deduplicate, deduplicate_with, identity_of, DedupPolicy};
pub use week::{week_date_range, week_end, week_number, week_start, WeekId};
