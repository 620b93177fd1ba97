use chrono::{DateTime, NaiveDate, NaiveDateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Publication timestamp as delivered by a source: either free text or
/// Unix-epoch milliseconds. Kept in its original shape so persisted state
/// round-trips unchanged; parsing happens on demand.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PublishedAt {
    Millis(i64),
    Text(String),
}

impl PublishedAt {
    /// Resolve to an instant, or `None` when the value is not a valid point in time.
    pub fn parse(&self) -> Option<DateTime<Utc>> {
        match self {
            PublishedAt::Millis(ms) => DateTime::from_timestamp_millis(*ms),
            PublishedAt::Text(s) => parse_datetime(s),
        }
    }
}

impl From<DateTime<Utc>> for PublishedAt {
    fn from(dt: DateTime<Utc>) -> Self {
        PublishedAt::Text(dt.to_rfc3339_opts(SecondsFormat::Millis, true))
    }
}

pub(crate) fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
    let s = s.trim();
    if s.is_empty() {
        return None;
    }
    // RFC3339 (e.g., "2026-01-11T12:34:56+00:00")
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // RSS pubDate (e.g., "Sun, 11 Jan 2026 12:34:56 GMT")
    if let Ok(dt) = DateTime::parse_from_rfc2822(s) {
        return Some(dt.with_timezone(&Utc));
    }
    // SQLite datetime format (e.g., "2026-01-11 12:34:56")
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S") {
        return Some(naive.and_utc());
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(s, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    if let Ok(date) = NaiveDate::parse_from_str(s, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0).map(|naive| naive.and_utc());
    }
    None
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RawArticle {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guid: Option<String>,
    #[serde(default)]
    pub published_at: Option<PublishedAt>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub content: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_url: Option<String>,
}

impl RawArticle {
    pub fn new(title: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            link: link.into(),
            guid: None,
            published_at: None,
            description: None,
            content: None,
            categories: Vec::new(),
            source_name: None,
            image_url: None,
        }
    }

    pub fn published_on(mut self, at: DateTime<Utc>) -> Self {
        self.published_at = Some(at.into());
        self
    }

    pub fn with_guid(mut self, guid: impl Into<String>) -> Self {
        self.guid = Some(guid.into());
        self
    }

    pub fn published(&self) -> Option<DateTime<Utc>> {
        self.published_at.as_ref().and_then(PublishedAt::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_parses_common_timestamp_shapes() {
        let expected = Utc.with_ymd_and_hms(2026, 1, 11, 12, 34, 56).unwrap();
        for text in [
            "2026-01-11T12:34:56Z",
            "2026-01-11T13:34:56+01:00",
            "Sun, 11 Jan 2026 12:34:56 GMT",
            "2026-01-11 12:34:56",
            "2026-01-11T12:34:56",
        ] {
            let parsed = PublishedAt::Text(text.to_string()).parse();
            assert_eq!(parsed, Some(expected), "failed on {text}");
        }
    }

    #[test]
    fn test_bare_date_is_utc_midnight() {
        let parsed = PublishedAt::Text("2026-03-02".to_string()).parse();
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2026, 3, 2, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_epoch_millis() {
        let parsed = PublishedAt::Millis(1_767_225_600_000).parse();
        assert_eq!(parsed, Some(Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap()));
    }

    #[test]
    fn test_garbage_is_invalid() {
        assert_eq!(PublishedAt::Text("not-a-date".to_string()).parse(), None);
        assert_eq!(PublishedAt::Text("   ".to_string()).parse(), None);
        assert_eq!(RawArticle::new("t", "l").published(), None);
    }

    #[test]
    fn test_deserializes_camel_case_and_null_timestamp() {
        let json = r#"{
            "title": "Agents everywhere",
            "link": "https://example.com/a",
            "publishedAt": null,
            "sourceName": "Example",
            "categories": ["ai", "ai"]
        }"#;
        let article: RawArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.source_name.as_deref(), Some("Example"));
        assert_eq!(article.published_at, None);
        assert_eq!(article.categories.len(), 2);
    }

    #[test]
    fn test_numeric_timestamp_round_trips() {
        let json = r#"{"title":"t","link":"l","publishedAt":1767225600000}"#;
        let article: RawArticle = serde_json::from_str(json).unwrap();
        assert_eq!(article.published_at, Some(PublishedAt::Millis(1_767_225_600_000)));
        let back = serde_json::to_string(&article).unwrap();
        assert!(back.contains("\"publishedAt\":1767225600000"));
    }

    #[test]
    fn test_datetime_conversion_uses_millis_precision() {
        let at = Utc.with_ymd_and_hms(2026, 1, 5, 0, 0, 0).unwrap();
        assert_eq!(
            PublishedAt::from(at),
            PublishedAt::Text("2026-01-05T00:00:00.000Z".to_string())
        );
    }
}
