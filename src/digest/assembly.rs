use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::error::{AppError, Result};
use crate::models::{RawArticle, WeeklyDigest};

use super::grouping::{bucket, finalize, placement, DigestMap, Grouped, GroupingOptions};

/// Merge newly fetched articles into a snapshot of existing digests.
///
/// The caller's map is left untouched; the returned map carries the update.
/// Articles are appended to their week buckets after the existing items, and
/// every touched bucket is then re-deduplicated and re-sorted once, so
/// existing items win over later duplicates.
pub fn merge_articles<I>(existing: &DigestMap, new_articles: I, now: DateTime<Utc>) -> Grouped
where
    I: IntoIterator<Item = RawArticle>,
{
    let options = GroupingOptions::default();
    let mut merged = Grouped {
        digests: existing.clone(),
        rejected: 0,
    };
    let mut touched = BTreeSet::new();
    let mut added = 0usize;

    for article in new_articles {
        let Some(week) = placement(&article, now, options) else {
            merged.rejected += 1;
            continue;
        };
        bucket(&mut merged.digests, &week, now).items.push(article);
        touched.insert(week.key());
        added += 1;
    }

    for key in &touched {
        if let Some(digest) = merged.digests.get_mut(key) {
            finalize(digest, options.dedup);
        }
    }

    debug!(
        placed = added,
        rejected = merged.rejected,
        buckets = merged.digests.len(),
        "Merged articles into digests"
    );
    merged
}

/// Fold `other` into `target` when both describe the same week. `target`
/// keeps its creation time and any generated content; items are combined
/// under the usual dedup and sort rules.
pub(crate) fn absorb_digest(target: &mut WeeklyDigest, other: WeeklyDigest) {
    target.items.extend(other.items);
    if target.generated_content.is_none() {
        target.generated_content = other.generated_content;
    }
    finalize(target, GroupingOptions::default().dedup);
}

/// The most recent week with any data: the digest whose key sorts last.
pub fn select_current_digest(digests: &DigestMap) -> Option<&WeeklyDigest> {
    digests.values().next_back()
}

/// Copy of `digests` with the newsletter body attached to the digest at `key`.
pub fn with_generated_content(digests: &DigestMap, key: &str, content: String) -> Result<DigestMap> {
    let mut updated = digests.clone();
    let digest = updated
        .get_mut(key)
        .ok_or_else(|| AppError::InvalidInput(format!("no digest for week {}", key)))?;
    digest.generated_content = Some(content);
    Ok(updated)
}
