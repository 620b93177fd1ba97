use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::sync::OnceLock;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Subscriber {
    pub id: i64,
    pub email: String,
    pub is_active: bool,
    pub subscribed_at: DateTime<Utc>,
}

static EMAIL_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Shape check only; deliverability is the mail provider's problem.
pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE
        .get_or_init(|| Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").ok())
        .as_ref()
        .is_some_and(|re| re.is_match(email.trim()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_email_shape() {
        assert!(is_valid_email("reader@example.com"));
        assert!(is_valid_email("  reader@news.example.org "));
        assert!(!is_valid_email("reader@example"));
        assert!(!is_valid_email("reader example.com"));
        assert!(!is_valid_email(""));
    }
}
