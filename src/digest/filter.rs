use chrono::{DateTime, Duration, Utc};

use crate::error::Result;
use crate::models::RawArticle;

use super::week::WeekId;

/// Articles older than this many days are candidates for archival cleanup.
pub const DEFAULT_RETENTION_DAYS: u32 = 28;

/// Upper bound accepted for a configured retention window (100 years).
pub const MAX_RETENTION_DAYS: u32 = 36_500;

/// Whether the article was published in the same ISO week as `now`.
///
/// Articles whose timestamp is missing or unparsable are rejected rather
/// than assumed to be recent.
pub fn is_current_week(article: &RawArticle, now: DateTime<Utc>) -> bool {
    in_week(article, &WeekId::of(now))
}

fn in_week(article: &RawArticle, week: &WeekId) -> bool {
    article
        .published()
        .is_some_and(|at| WeekId::of(at).key() == week.key() && week.contains(at))
}

pub fn filter_current_week(articles: &[RawArticle], now: DateTime<Utc>) -> Vec<RawArticle> {
    filter_week(articles, &WeekId::of(now))
}

pub fn filter_specific_week(
    articles: &[RawArticle],
    week_number: u32,
    year: i32,
) -> Result<Vec<RawArticle>> {
    let week = WeekId::new(week_number, year)?;
    Ok(filter_week(articles, &week))
}

fn filter_week(articles: &[RawArticle], week: &WeekId) -> Vec<RawArticle> {
    let mut matching: Vec<RawArticle> = articles
        .iter()
        .filter(|article| in_week(article, week))
        .cloned()
        .collect();
    sort_newest_first(&mut matching);

    tracing::debug!(
        week = %week,
        matched = matching.len(),
        total = articles.len(),
        "Filtered articles by week"
    );
    matching
}

/// True iff the article has a valid timestamp strictly before
/// `now - retention_days`. A cutoff before the representable range means
/// nothing is stale.
pub fn is_stale(article: &RawArticle, now: DateTime<Utc>, retention_days: u32) -> bool {
    let Some(cutoff) = Duration::try_days(i64::from(retention_days))
        .and_then(|window| now.checked_sub_signed(window))
    else {
        return false;
    };
    article.published().is_some_and(|at| at < cutoff)
}

/// Stable sort by publication time, newest first; undated articles go last.
pub fn sort_newest_first(articles: &mut [RawArticle]) {
    articles.sort_by_key(|article| std::cmp::Reverse(article.published()));
}
