use std::collections::HashSet;

use tracing::debug;

use crate::models::RawArticle;

/// How two articles are recognised as the same one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Same GUID, or same link when no GUID is present. Articles with
    /// neither are dropped.
    #[default]
    Identity,
    /// Same link or same title, both compared case-insensitively. Catches
    /// stories re-published under a different URL.
    LinkOrTitle,
}

/// The article's GUID when non-empty, otherwise its link. `None` means the
/// article has no usable identity.
pub fn identity_of(article: &RawArticle) -> Option<&str> {
    article
        .guid
        .as_deref()
        .map(str::trim)
        .filter(|guid| !guid.is_empty())
        .or_else(|| Some(article.link.trim()).filter(|link| !link.is_empty()))
}

/// Keep the first article seen for each identity, in input order.
pub fn deduplicate(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    deduplicate_with(articles, DedupPolicy::Identity)
}

pub fn deduplicate_with(articles: Vec<RawArticle>, policy: DedupPolicy) -> Vec<RawArticle> {
    let before = articles.len();
    let kept = match policy {
        DedupPolicy::Identity => by_identity(articles),
        DedupPolicy::LinkOrTitle => by_link_or_title(articles),
    };
    if kept.len() < before {
        debug!(
            ?policy,
            dropped = before - kept.len(),
            kept = kept.len(),
            "Deduplicated articles"
        );
    }
    kept
}

fn by_identity(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let mut seen = HashSet::new();
    articles
        .into_iter()
        .filter(|article| match identity_of(article) {
            Some(id) => seen.insert(id.to_string()),
            None => false,
        })
        .collect()
}

// An article is dropped when its link or title matches an article already
// kept. Empty links and titles never match.
fn by_link_or_title(articles: Vec<RawArticle>) -> Vec<RawArticle> {
    let mut links = HashSet::new();
    let mut titles = HashSet::new();
    let mut kept = Vec::with_capacity(articles.len());

    for article in articles {
        let link = normalized(&article.link);
        let title = normalized(&article.title);

        let duplicate = link.as_ref().is_some_and(|l| links.contains(l))
            || title.as_ref().is_some_and(|t| titles.contains(t));
        if duplicate {
            continue;
        }

        links.extend(link);
        titles.extend(title);
        kept.push(article);
    }

    kept
}

fn normalized(s: &str) -> Option<String> {
    let s = s.trim();
    (!s.is_empty()).then(|| s.to_lowercase())
}
