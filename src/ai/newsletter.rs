use std::fmt::Write;

use crate::error::{AppError, Result};
use crate::models::{RawArticle, WeeklyDigest};

use super::TextGenerator;

const MAX_DESCRIPTION_CHARS: usize = 600;

/// The newest `max` items of a digest. Items are already sorted newest first.
pub fn select_items(digest: &WeeklyDigest, max: usize) -> Vec<RawArticle> {
    digest.items.iter().take(max).cloned().collect()
}

pub fn build_prompt(
    digest: &WeeklyDigest,
    items: &[RawArticle],
    reference_link: Option<&str>,
) -> String {
    let mut prompt = format!(
        "Write this week's newsletter: {} ({}).\n\nArticles:\n",
        digest.title, digest.date_range
    );

    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(prompt, "\n{}. {}", i + 1, item.title);
        let _ = writeln!(prompt, "   Link: {}", item.link);
        if let Some(source) = &item.source_name {
            let _ = writeln!(prompt, "   Source: {}", source);
        }
        if !item.categories.is_empty() {
            let _ = writeln!(prompt, "   Topics: {}", item.categories.join(", "));
        }
        if let Some(text) = item.description.as_ref().or(item.content.as_ref()) {
            let _ = writeln!(prompt, "   Summary: {}", truncate(text, MAX_DESCRIPTION_CHARS));
        }
    }

    if let Some(link) = reference_link.map(str::trim).filter(|l| !l.is_empty()) {
        let _ = write!(
            prompt,
            "\nAlso reference this link as further reading where it fits: {}\n",
            link
        );
    }

    prompt
}

fn truncate(text: &str, max_chars: usize) -> String {
    let text = text.trim();
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &text[..idx]),
        None => text.to_string(),
    }
}

/// Ask the generator for a newsletter body covering `items`.
///
/// An empty selection is rejected up front; an empty reply is a failure.
pub async fn generate_newsletter<G: TextGenerator>(
    generator: &G,
    digest: &WeeklyDigest,
    items: &[RawArticle],
    reference_link: Option<&str>,
) -> Result<String> {
    if items.is_empty() {
        return Err(AppError::InvalidInput(format!(
            "no articles selected for {}",
            digest.id
        )));
    }

    let prompt = build_prompt(digest, items, reference_link);
    tracing::debug!(
        week = %digest.id,
        items = items.len(),
        model = generator.model_version(),
        "Generating newsletter"
    );

    let body = generator.generate_text(&prompt).await?;
    let body = body.trim();
    if body.is_empty() {
        return Err(AppError::Generation(format!(
            "empty newsletter returned for {}",
            digest.id
        )));
    }
    Ok(body.to_string())
}
