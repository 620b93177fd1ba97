use std::path::Path;

use opml::{Outline, OPML};

use crate::config::FeedSource;
use crate::error::Result;

pub fn parse_opml_file(path: &Path) -> Result<Vec<FeedSource>> {
    let content = std::fs::read_to_string(path)?;
    parse_opml(&content)
}

/// Collect every outline with an `xmlUrl`, descending into folders.
pub fn parse_opml(content: &str) -> Result<Vec<FeedSource>> {
    let document = OPML::from_str(content)?;
    let mut sources = Vec::new();
    collect(&document.body.outlines, &mut sources);
    Ok(sources)
}

fn collect(outlines: &[Outline], sources: &mut Vec<FeedSource>) {
    for outline in outlines {
        if let Some(url) = outline.xml_url.as_deref().map(str::trim).filter(|u| !u.is_empty()) {
            let name = outline
                .title
                .clone()
                .filter(|t| !t.trim().is_empty())
                .unwrap_or_else(|| outline.text.clone());
            if !sources.iter().any(|s| s.url == url) {
                sources.push(FeedSource {
                    name,
                    url: url.to_string(),
                });
            }
        }
        collect(&outline.outlines, sources);
    }
}
