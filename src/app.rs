use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};

use crate::ai::{generate_newsletter, select_items, ClaudeGenerator, TextGenerator};
use crate::config::{Config, FeedSource};
use crate::db::Repository;
use crate::digest::{
    filter_current_week, identity_of, is_stale, merge_articles, select_current_digest,
    with_generated_content, DigestMap,
};
use crate::error::Result;
use crate::feed::{parse_opml_file, FeedFetcher};
use crate::ingest::sanitize;
use crate::models::{ArchivedNewsletter, GenerationStatus, NewNewsletter, RawArticle};
use crate::state::{load_digests, save_digests};

/// Outcome of one refresh run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RefreshReport {
    pub fetched: usize,
    pub accepted: usize,
    pub new_articles: usize,
    pub rejected: usize,
    pub digests: usize,
}

pub struct App<G = ClaudeGenerator> {
    config: Config,
    state_path: PathBuf,
    pub repository: Repository,
    fetcher: FeedFetcher,
    generator: Option<G>,
}

impl App<ClaudeGenerator> {
    pub async fn new(config: Config) -> Result<Self> {
        let generator = match &config.api_key {
            Some(key) => Some(ClaudeGenerator::new(key.clone(), config.model.clone())?),
            None => None,
        };
        Self::with_generator(config, generator).await
    }
}

impl<G: TextGenerator> App<G> {
    pub async fn with_generator(config: Config, generator: Option<G>) -> Result<Self> {
        config.validate()?;
        let repository = Repository::new(&config.db_path).await?;
        let fetcher = FeedFetcher::new(config.cors_proxies.clone())?;
        let state_path = PathBuf::from(&config.state_path);

        Ok(Self {
            config,
            state_path,
            repository,
            fetcher,
            generator,
        })
    }

    pub fn digests(&self) -> Result<DigestMap> {
        load_digests(&self.state_path)
    }

    /// Configured feeds plus those imported into the database.
    pub async fn sources(&self) -> Result<Vec<FeedSource>> {
        let mut sources = self.config.feeds.clone();
        for source in self.repository.get_feed_sources().await? {
            if !sources.iter().any(|s| s.url == source.url) {
                sources.push(source);
            }
        }
        Ok(sources)
    }

    /// Fetch every source and fold the results into the digest state.
    pub async fn refresh(&self) -> Result<RefreshReport> {
        let sources = self.sources().await?;
        let fetched = self.fetcher.refresh_all(&sources).await;
        self.ingest(fetched, Utc::now()).await
    }

    /// Store incoming articles, then rebuild the affected digests from
    /// everything in the raw archive.
    pub async fn ingest(&self, incoming: Vec<RawArticle>, now: DateTime<Utc>) -> Result<RefreshReport> {
        let fetched = incoming.len();
        let accepted: Vec<RawArticle> = incoming.into_iter().filter_map(sanitize).collect();
        let accepted_count = accepted.len();
        let new_articles = self.repository.store_raw_articles(accepted).await?;

        let stored = self.repository.load_raw_articles().await?;
        let existing = self.digests()?;
        let merged = merge_articles(&existing, stored, now);
        save_digests(&self.state_path, &merged.digests)?;

        let report = RefreshReport {
            fetched,
            accepted: accepted_count,
            new_articles,
            rejected: merged.rejected,
            digests: merged.digests.len(),
        };
        tracing::info!(?report, "Refresh complete");
        Ok(report)
    }

    pub async fn current_week_articles(&self, now: DateTime<Utc>) -> Result<Vec<RawArticle>> {
        let stored = self.repository.load_raw_articles().await?;
        Ok(filter_current_week(&stored, now))
    }

    /// Draft the newsletter for the most recent digest and archive it.
    pub async fn generate(&self, reference_link: Option<&str>) -> Result<GenerationStatus> {
        let Some(generator) = &self.generator else {
            tracing::warn!("No API key configured; skipping newsletter generation");
            return Ok(GenerationStatus::NoApiKey);
        };

        let digests = self.digests()?;
        let Some(digest) = select_current_digest(&digests) else {
            return Ok(GenerationStatus::NoDigest);
        };

        let items = select_items(digest, self.config.max_newsletter_items);
        let reference_link = reference_link.or(self.config.reference_link.as_deref());

        let body = match generate_newsletter(generator, digest, &items, reference_link).await {
            Ok(body) => body,
            Err(e) => {
                tracing::error!("Failed to generate newsletter for {}: {}", digest.id, e);
                return Ok(GenerationStatus::Failed);
            }
        };

        let key = digest.id.clone();
        let updated = with_generated_content(&digests, &key, body)?;
        save_digests(&self.state_path, &updated)?;

        if let Some(entry) = updated.get(&key).and_then(NewNewsletter::from_digest) {
            self.repository.upsert_newsletter(entry).await?;
            tracing::info!("Archived newsletter for {}", key);
        }

        Ok(GenerationStatus::Generated)
    }

    pub async fn archive(&self) -> Result<Vec<ArchivedNewsletter>> {
        self.repository.list_newsletters().await
    }

    /// Remove raw articles past the retention horizon; returns how many went.
    pub async fn cleanup(&self, now: DateTime<Utc>) -> Result<usize> {
        let stale: Vec<String> = self
            .repository
            .load_raw_articles()
            .await?
            .iter()
            .filter(|article| is_stale(article, now, self.config.retention_days))
            .filter_map(|article| identity_of(article).map(String::from))
            .collect();

        if stale.is_empty() {
            return Ok(0);
        }
        let deleted = self.repository.delete_raw_articles(stale).await?;
        tracing::info!("Removed {} stale articles", deleted);
        Ok(deleted)
    }

    pub async fn import_opml(&self, path: &Path) -> Result<usize> {
        let sources = parse_opml_file(path)?;
        let mut added = 0;

        for source in sources {
            match self.repository.insert_feed_source(source).await {
                Ok(true) => added += 1,
                Ok(false) => {}
                Err(e) => {
                    tracing::warn!("Failed to insert feed source: {}", e);
                }
            }
        }

        Ok(added)
    }

    pub async fn subscribe(&self, email: &str) -> Result<()> {
        self.repository.subscribe(email).await
    }

    pub async fn unsubscribe(&self, email: &str) -> Result<bool> {
        self.repository.unsubscribe(email).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AppError;
    use chrono::{Duration, TimeZone};
    use std::io::Write;
    use tempfile::TempDir;

    struct StubGenerator(String);

    impl TextGenerator for StubGenerator {
        async fn generate_text(&self, _prompt: &str) -> Result<String> {
            if self.0.is_empty() {
                return Err(AppError::Generation("stub failure".to_string()));
            }
            Ok(self.0.clone())
        }

        fn model_version(&self) -> &str {
            "stub"
        }
    }

    fn config(dir: &TempDir) -> Config {
        Config {
            db_path: dir.path().join("digest.db").to_string_lossy().to_string(),
            state_path: dir.path().join("digests.json").to_string_lossy().to_string(),
            ..Config::default()
        }
    }

    async fn app(dir: &TempDir, reply: Option<&str>) -> App<StubGenerator> {
        let generator = reply.map(|r| StubGenerator(r.to_string()));
        App::with_generator(config(dir), generator).await.unwrap()
    }

    fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 1, 14, 12, 0, 0).unwrap()
    }

    fn article(title: &str, link: &str, at: DateTime<Utc>) -> RawArticle {
        RawArticle::new(title, link).published_on(at)
    }

    #[tokio::test]
    async fn test_ingest_builds_and_persists_digests() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None).await;

        let report = app
            .ingest(
                vec![
                    article("A", "https://x/a", now()),
                    article("  ", "https://x/blank", now()),
                    RawArticle::new("Undated", "https://x/u"),
                    article("Last week", "https://x/old", now() - Duration::days(7)),
                ],
                now(),
            )
            .await
            .unwrap();

        assert_eq!(report.fetched, 4);
        assert_eq!(report.accepted, 3);
        assert_eq!(report.new_articles, 3);
        assert_eq!(report.rejected, 1);
        assert_eq!(report.digests, 2);

        let digests = app.digests().unwrap();
        assert!(digests.contains_key("2026-W02"));
        assert_eq!(digests["2026-W03"].items.len(), 1);
    }

    #[tokio::test]
    async fn test_repeated_ingest_does_not_duplicate() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None).await;
        let batch = vec![article("A", "https://x/a", now())];

        app.ingest(batch.clone(), now()).await.unwrap();
        let second = app.ingest(batch, now()).await.unwrap();

        assert_eq!(second.new_articles, 0);
        assert_eq!(app.digests().unwrap()["2026-W03"].items.len(), 1);
    }

    #[tokio::test]
    async fn test_generate_without_key() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None).await;
        assert_eq!(app.generate(None).await.unwrap(), GenerationStatus::NoApiKey);
    }

    #[tokio::test]
    async fn test_generate_without_digests() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Some("Body")).await;
        assert_eq!(app.generate(None).await.unwrap(), GenerationStatus::NoDigest);
    }

    #[tokio::test]
    async fn test_generate_attaches_and_archives() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Some("This week in AI")).await;
        app.ingest(
            vec![
                article("A", "https://x/a", now()),
                article("B", "https://x/b", now() - Duration::hours(3)),
            ],
            now(),
        )
        .await
        .unwrap();

        let status = app.generate(Some("https://ref.example.com")).await.unwrap();
        assert_eq!(status, GenerationStatus::Generated);

        let digests = app.digests().unwrap();
        assert_eq!(
            digests["2026-W03"].generated_content.as_deref(),
            Some("This week in AI")
        );

        let archived = app.repository.get_newsletter(3, 2026).await.unwrap().unwrap();
        assert_eq!(archived.content, "This week in AI");
        assert_eq!(archived.item_count, 2);
        assert_eq!(app.archive().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_generation_failure_is_reported_not_raised() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, Some("")).await;
        app.ingest(vec![article("A", "https://x/a", now())], now())
            .await
            .unwrap();

        assert_eq!(app.generate(None).await.unwrap(), GenerationStatus::Failed);
        assert!(app.archive().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_cleanup_removes_only_stale_articles() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None).await;
        app.ingest(
            vec![
                article("Fresh", "https://x/fresh", now() - Duration::days(2)),
                article("Stale", "https://x/stale", now() - Duration::days(40)),
                RawArticle::new("Undated", "https://x/u"),
            ],
            now(),
        )
        .await
        .unwrap();

        assert_eq!(app.cleanup(now()).await.unwrap(), 1);
        let left: Vec<_> = app
            .repository
            .load_raw_articles()
            .await
            .unwrap()
            .into_iter()
            .map(|a| a.title)
            .collect();
        assert_eq!(left, vec!["Fresh", "Undated"]);
        assert_eq!(app.cleanup(now()).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_current_week_articles() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None).await;
        app.ingest(
            vec![
                article("This week", "https://x/now", now()),
                article("Older", "https://x/old", now() - Duration::days(10)),
            ],
            now(),
        )
        .await
        .unwrap();

        let current = app.current_week_articles(now()).await.unwrap();
        assert_eq!(current.len(), 1);
        assert_eq!(current[0].title, "This week");
    }

    #[tokio::test]
    async fn test_import_opml_and_sources() {
        let dir = TempDir::new().unwrap();
        let mut cfg = config(&dir);
        cfg.feeds = vec![FeedSource {
            name: "Configured".to_string(),
            url: "https://configured.example.com/rss".to_string(),
        }];
        let app: App<StubGenerator> = App::with_generator(cfg, None).await.unwrap();

        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(
            file,
            r#"<?xml version="1.0"?>
<opml version="2.0"><head><title>t</title></head><body>
<outline text="Imported" type="rss" xmlUrl="https://imported.example.com/rss"/>
<outline text="Configured again" type="rss" xmlUrl="https://configured.example.com/rss"/>
</body></opml>"#
        )
        .unwrap();

        assert_eq!(app.import_opml(file.path()).await.unwrap(), 2);
        assert_eq!(app.import_opml(file.path()).await.unwrap(), 0);

        let urls: Vec<_> = app.sources().await.unwrap().into_iter().map(|s| s.url).collect();
        assert_eq!(
            urls,
            vec![
                "https://configured.example.com/rss".to_string(),
                "https://imported.example.com/rss".to_string(),
            ]
        );
    }

    #[tokio::test]
    async fn test_subscribe_through_app() {
        let dir = TempDir::new().unwrap();
        let app = app(&dir, None).await;
        app.subscribe("reader@example.com").await.unwrap();
        assert!(app.unsubscribe("reader@example.com").await.unwrap());
    }
}
