mod fetcher;
mod sources;

pub use fetcher::{article_from_entry, FeedFetcher};
pub use sources::{parse_opml, parse_opml_file};
