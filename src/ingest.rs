use std::sync::OnceLock;

use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, Result};
use crate::models::RawArticle;

static IMAGE_RE: OnceLock<Option<Regex>> = OnceLock::new();

/// Accepts http(s) URLs whose path ends in a known image extension,
/// optionally followed by a query string or fragment.
pub fn is_valid_image_url(url: &str) -> bool {
    let url = url.trim();
    if url.is_empty() {
        return false;
    }
    IMAGE_RE
        .get_or_init(|| {
            Regex::new(r"(?i)^https?://[^\s]+\.(jpe?g|png|gif|webp|svg)([?#][^\s]*)?$").ok()
        })
        .as_ref()
        .is_some_and(|re| re.is_match(url))
}

/// Parse a JSON batch of article records.
///
/// The top level must be an array. Elements that do not have the shape of
/// an article are dropped and logged, not treated as errors.
pub fn parse_articles(json: &str) -> Result<Vec<RawArticle>> {
    let value: Value = serde_json::from_str(json)?;
    let Value::Array(records) = value else {
        return Err(AppError::InvalidInput(format!(
            "expected a JSON array of articles, got {}",
            kind_of(&value)
        )));
    };

    let total = records.len();
    let articles: Vec<RawArticle> = records
        .into_iter()
        .filter_map(|record| match serde_json::from_value(record) {
            Ok(article) => Some(article),
            Err(e) => {
                tracing::debug!("Dropping malformed article record: {}", e);
                None
            }
        })
        .collect();

    if articles.len() < total {
        tracing::warn!(
            dropped = total - articles.len(),
            total,
            "Some article records could not be read"
        );
    }
    Ok(articles)
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Clean an incoming article, or reject it when it has no title.
///
/// Trims text fields, turns blank optionals into `None`, drops image URLs
/// that do not look like images and removes repeated categories.
pub fn sanitize(mut article: RawArticle) -> Option<RawArticle> {
    article.title = article.title.trim().to_string();
    if article.title.is_empty() {
        return None;
    }
    article.link = article.link.trim().to_string();

    article.guid = non_blank(article.guid);
    article.description = non_blank(article.description);
    article.content = non_blank(article.content);
    article.source_name = non_blank(article.source_name);
    article.image_url = non_blank(article.image_url).filter(|url| is_valid_image_url(url));

    let mut categories: Vec<String> = Vec::with_capacity(article.categories.len());
    for category in article.categories.drain(..) {
        let category = category.trim().to_string();
        if !category.is_empty() && !categories.contains(&category) {
            categories.push(category);
        }
    }
    article.categories = categories;

    Some(article)
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
