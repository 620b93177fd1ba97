use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::WeeklyDigest;

/// A newsletter as stored in the archive, one row per ISO week.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArchivedNewsletter {
    pub id: i64,
    pub week_number: u32,
    pub year: i32,
    pub date_range: String,
    pub title: String,
    pub content: String,
    pub item_count: usize,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Insert-or-update payload for the archive, keyed by (week_number, year).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewNewsletter {
    pub week_number: u32,
    pub year: i32,
    pub date_range: String,
    pub title: String,
    pub content: String,
    pub item_count: usize,
}

impl NewNewsletter {
    /// `None` until the digest has generated content.
    pub fn from_digest(digest: &WeeklyDigest) -> Option<Self> {
        let content = digest.generated_content.as_ref()?;
        Some(Self {
            week_number: digest.week_number,
            year: digest.year,
            date_range: digest.date_range.clone(),
            title: digest.title.clone(),
            content: content.clone(),
            item_count: digest.items.len(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum GenerationStatus {
    #[default]
    NotGenerated,
    Generated,
    Failed,
    NoApiKey,
    NoDigest,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::digest::WeekId;
    use crate::models::RawArticle;
    use chrono::TimeZone;

    #[test]
    fn test_from_digest_requires_content() {
        let now = Utc.with_ymd_and_hms(2026, 3, 4, 10, 0, 0).unwrap();
        let mut digest = WeeklyDigest::new(&WeekId::of(now), now);
        assert!(NewNewsletter::from_digest(&digest).is_none());

        digest.items.push(RawArticle::new("A", "https://x/a").published_on(now));
        digest.generated_content = Some("Body".to_string());
        let entry = NewNewsletter::from_digest(&digest).unwrap();
        assert_eq!(entry.week_number, 10);
        assert_eq!(entry.year, 2026);
        assert_eq!(entry.item_count, 1);
        assert_eq!(entry.content, "Body");
        assert_eq!(entry.date_range, "02.03.2026–08.03.2026");
    }
}
