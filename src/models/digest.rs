use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::digest::WeekId;

use super::RawArticle;

/// Per-week bucket of deduplicated articles, keyed by `"{year}-W{week:02}"`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeeklyDigest {
    pub id: String,
    pub week_number: u32,
    pub year: i32,
    pub date_range: String,
    pub title: String,
    pub summary: String,
    pub items: Vec<RawArticle>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub generated_content: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl WeeklyDigest {
    pub fn new(week: &WeekId, now: DateTime<Utc>) -> Self {
        Self {
            id: week.key(),
            week_number: week.week(),
            year: week.year(),
            date_range: week.date_range(),
            title: digest_title(week.week(), week.year()),
            summary: digest_summary(0, week.week()),
            items: Vec::new(),
            generated_content: None,
            created_at: now,
        }
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    pub fn refresh_display(&mut self) {
        self.title = digest_title(self.week_number, self.year);
        self.summary = digest_summary(self.items.len(), self.week_number);
    }
}

pub fn digest_title(week_number: u32, year: i32) -> String {
    format!("AI News Weekly – Week {}/{}", week_number, year)
}

pub fn digest_summary(count: usize, week_number: u32) -> String {
    let noun = if count == 1 { "article" } else { "articles" };
    format!("{} {} from week {}", count, noun, week_number)
}
