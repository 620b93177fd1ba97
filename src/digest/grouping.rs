use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use crate::models::{RawArticle, WeeklyDigest};

use super::filter::sort_newest_first;
use super::identity::{deduplicate_with, identity_of, DedupPolicy};
use super::week::WeekId;

/// Digests keyed by week key. Keys are zero-padded, so iteration order is
/// chronological.
pub type DigestMap = BTreeMap<String, WeeklyDigest>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GroupingOptions {
    /// When false, undated articles are bucketed into the week of `now`.
    pub reject_invalid_dates: bool,
    pub dedup: DedupPolicy,
}

impl Default for GroupingOptions {
    fn default() -> Self {
        Self {
            reject_invalid_dates: true,
            dedup: DedupPolicy::LinkOrTitle,
        }
    }
}

/// Result of placing articles into week buckets.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Grouped {
    pub digests: DigestMap,
    /// Articles skipped for a missing/invalid timestamp or missing identity.
    pub rejected: usize,
}

impl Grouped {
    /// All retained items, bucket by bucket.
    pub fn items(&self) -> impl Iterator<Item = &RawArticle> {
        self.digests.values().flat_map(|digest| digest.items.iter())
    }
}

pub fn group_by_week<I>(articles: I, now: DateTime<Utc>) -> Grouped
where
    I: IntoIterator<Item = RawArticle>,
{
    group_by_week_with(articles, now, GroupingOptions::default())
}

pub fn group_by_week_with<I>(articles: I, now: DateTime<Utc>, options: GroupingOptions) -> Grouped
where
    I: IntoIterator<Item = RawArticle>,
{
    let mut grouped = Grouped::default();

    for article in articles {
        let Some(week) = placement(&article, now, options) else {
            grouped.rejected += 1;
            continue;
        };
        bucket(&mut grouped.digests, &week, now).items.push(article);
    }

    for digest in grouped.digests.values_mut() {
        finalize(digest, options.dedup);
    }

    if grouped.rejected > 0 {
        info!(rejected = grouped.rejected, "Skipped articles without a valid date or identity");
    }
    debug!(buckets = grouped.digests.len(), "Grouped articles by week");

    grouped
}

/// The week an article belongs to, or `None` when it cannot be placed.
pub(super) fn placement(
    article: &RawArticle,
    now: DateTime<Utc>,
    options: GroupingOptions,
) -> Option<WeekId> {
    identity_of(article)?;
    match article.published() {
        Some(at) => Some(WeekId::of(at)),
        None if !options.reject_invalid_dates => Some(WeekId::of(now)),
        None => None,
    }
}

pub(super) fn bucket<'a>(
    digests: &'a mut DigestMap,
    week: &WeekId,
    now: DateTime<Utc>,
) -> &'a mut WeeklyDigest {
    digests
        .entry(week.key())
        .or_insert_with(|| WeeklyDigest::new(week, now))
}

/// Dedup in insertion order, sort newest first, then recompute display text.
pub(super) fn finalize(digest: &mut WeeklyDigest, policy: DedupPolicy) {
    let items = std::mem::take(&mut digest.items);
    digest.items = deduplicate_with(items, policy);
    sort_newest_first(&mut digest.items);
    digest.refresh_display();
}
