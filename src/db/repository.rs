use chrono::{SecondsFormat, Utc};
use rusqlite::{params, OptionalExtension, Row};
use tokio_rusqlite::Connection;

use crate::config::FeedSource;
use crate::digest::identity_of;
use crate::error::{AppError, Result};
use crate::models::{
    is_valid_email, parse_datetime, ArchivedNewsletter, NewNewsletter, RawArticle, Subscriber,
};

use super::schema::SCHEMA;

pub struct Repository {
    conn: Connection,
}

struct RawArticleRow {
    identity: String,
    title: String,
    link: String,
    published_at: Option<String>,
    payload: String,
}

impl Repository {
    pub async fn new(db_path: &str) -> Result<Self> {
        let conn = Connection::open(db_path).await?;

        conn.call(|conn| {
            conn.execute_batch(SCHEMA)?;
            Ok(())
        })
        .await?;

        Ok(Self { conn })
    }

    // Feed source operations

    pub async fn insert_feed_source(&self, source: FeedSource) -> Result<bool> {
        let inserted = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "INSERT OR IGNORE INTO feed_sources (name, url) VALUES (?1, ?2)",
                    params![source.name, source.url],
                )?;
                Ok(changed > 0)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn get_feed_sources(&self) -> Result<Vec<FeedSource>> {
        let sources = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare("SELECT name, url FROM feed_sources ORDER BY name")?;
                let sources = stmt
                    .query_map([], |row| {
                        Ok(FeedSource {
                            name: row.get(0)?,
                            url: row.get(1)?,
                        })
                    })?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(sources)
            })
            .await?;
        Ok(sources)
    }

    // Raw article archive

    /// Store articles not seen before; returns how many were new.
    /// Articles without an identity cannot be keyed and are skipped.
    pub async fn store_raw_articles(&self, articles: Vec<RawArticle>) -> Result<usize> {
        let total = articles.len();
        let mut rows = Vec::with_capacity(total);
        for article in &articles {
            let Some(identity) = identity_of(article) else {
                continue;
            };
            rows.push(RawArticleRow {
                identity: identity.to_string(),
                title: article.title.clone(),
                link: article.link.clone(),
                published_at: article
                    .published()
                    .map(|dt| dt.to_rfc3339_opts(SecondsFormat::Millis, true)),
                payload: serde_json::to_string(article)?,
            });
        }
        if rows.len() < total {
            tracing::debug!("Skipped {} articles without identity", total - rows.len());
        }

        let inserted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut inserted = 0;
                {
                    let mut stmt = tx.prepare(
                        r#"INSERT OR IGNORE INTO raw_articles (identity, title, link, published_at, payload)
                           VALUES (?1, ?2, ?3, ?4, ?5)"#,
                    )?;
                    for row in rows {
                        inserted += stmt.execute(params![
                            row.identity,
                            row.title,
                            row.link,
                            row.published_at,
                            row.payload,
                        ])?;
                    }
                }
                tx.commit()?;
                Ok(inserted)
            })
            .await?;
        Ok(inserted)
    }

    pub async fn load_raw_articles(&self) -> Result<Vec<RawArticle>> {
        let payloads = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    "SELECT payload FROM raw_articles ORDER BY published_at DESC NULLS LAST, id",
                )?;
                let payloads = stmt
                    .query_map([], |row| row.get::<_, String>(0))?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(payloads)
            })
            .await?;

        let articles = payloads
            .into_iter()
            .filter_map(|payload| match serde_json::from_str(&payload) {
                Ok(article) => Some(article),
                Err(e) => {
                    tracing::warn!("Unreadable stored article: {}", e);
                    None
                }
            })
            .collect();
        Ok(articles)
    }

    pub async fn delete_raw_articles(&self, identities: Vec<String>) -> Result<usize> {
        let deleted = self
            .conn
            .call(move |conn| {
                let tx = conn.transaction()?;
                let mut deleted = 0;
                {
                    let mut stmt = tx.prepare("DELETE FROM raw_articles WHERE identity = ?1")?;
                    for identity in identities {
                        deleted += stmt.execute(params![identity])?;
                    }
                }
                tx.commit()?;
                Ok(deleted)
            })
            .await?;
        Ok(deleted)
    }

    // Newsletter archive

    pub async fn upsert_newsletter(&self, newsletter: NewNewsletter) -> Result<()> {
        let item_count = i64::try_from(newsletter.item_count).unwrap_or(i64::MAX);
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO newsletters (week_number, year, date_range, title, content, item_count)
                       VALUES (?1, ?2, ?3, ?4, ?5, ?6)
                       ON CONFLICT(week_number, year) DO UPDATE SET
                           date_range = excluded.date_range,
                           title = excluded.title,
                           content = excluded.content,
                           item_count = excluded.item_count,
                           updated_at = datetime('now')"#,
                    params![
                        newsletter.week_number,
                        newsletter.year,
                        newsletter.date_range,
                        newsletter.title,
                        newsletter.content,
                        item_count,
                    ],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    pub async fn get_newsletter(
        &self,
        week_number: u32,
        year: i32,
    ) -> Result<Option<ArchivedNewsletter>> {
        let newsletter = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, week_number, year, date_range, title, content, item_count, created_at, updated_at
                       FROM newsletters WHERE week_number = ?1 AND year = ?2"#,
                )?;
                let newsletter = stmt
                    .query_row(params![week_number, year], newsletter_from_row)
                    .optional()?;
                Ok(newsletter)
            })
            .await?;
        Ok(newsletter)
    }

    pub async fn list_newsletters(&self) -> Result<Vec<ArchivedNewsletter>> {
        let newsletters = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, week_number, year, date_range, title, content, item_count, created_at, updated_at
                       FROM newsletters ORDER BY year DESC, week_number DESC"#,
                )?;
                let newsletters = stmt
                    .query_map([], newsletter_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(newsletters)
            })
            .await?;
        Ok(newsletters)
    }

    // Subscribers

    /// Subscribe, or reactivate a previous subscription.
    pub async fn subscribe(&self, email: &str) -> Result<()> {
        let email = email.trim().to_lowercase();
        if !is_valid_email(&email) {
            return Err(AppError::InvalidInput(format!(
                "not an email address: {:?}",
                email
            )));
        }
        self.conn
            .call(move |conn| {
                conn.execute(
                    r#"INSERT INTO subscribers (email) VALUES (?1)
                       ON CONFLICT(email) DO UPDATE SET
                           is_active = 1,
                           subscribed_at = CASE WHEN is_active = 1 THEN subscribed_at ELSE datetime('now') END"#,
                    params![email],
                )?;
                Ok(())
            })
            .await?;
        Ok(())
    }

    /// Returns false when no active subscription matched.
    pub async fn unsubscribe(&self, email: &str) -> Result<bool> {
        let email = email.trim().to_lowercase();
        let changed = self
            .conn
            .call(move |conn| {
                let changed = conn.execute(
                    "UPDATE subscribers SET is_active = 0 WHERE email = ?1 AND is_active = 1",
                    params![email],
                )?;
                Ok(changed)
            })
            .await?;
        Ok(changed > 0)
    }

    pub async fn active_subscribers(&self) -> Result<Vec<Subscriber>> {
        let subscribers = self
            .conn
            .call(|conn| {
                let mut stmt = conn.prepare(
                    r#"SELECT id, email, is_active, subscribed_at FROM subscribers
                       WHERE is_active = 1 ORDER BY subscribed_at, id"#,
                )?;
                let subscribers = stmt
                    .query_map([], subscriber_from_row)?
                    .collect::<std::result::Result<Vec<_>, _>>()?;
                Ok(subscribers)
            })
            .await?;
        Ok(subscribers)
    }
}

fn timestamp(row: &Row, idx: usize) -> rusqlite::Result<chrono::DateTime<Utc>> {
    Ok(row
        .get::<_, String>(idx)
        .ok()
        .and_then(|s| parse_datetime(&s))
        .unwrap_or_else(Utc::now))
}

fn newsletter_from_row(row: &Row) -> rusqlite::Result<ArchivedNewsletter> {
    Ok(ArchivedNewsletter {
        id: row.get(0)?,
        week_number: row.get(1)?,
        year: row.get(2)?,
        date_range: row.get(3)?,
        title: row.get(4)?,
        content: row.get(5)?,
        item_count: usize::try_from(row.get::<_, i64>(6)?).unwrap_or(0),
        created_at: timestamp(row, 7)?,
        updated_at: timestamp(row, 8)?,
    })
}

fn subscriber_from_row(row: &Row) -> rusqlite::Result<Subscriber> {
    Ok(Subscriber {
        id: row.get(0)?,
        email: row.get(1)?,
        is_active: row.get::<_, i64>(2)? != 0,
        subscribed_at: timestamp(row, 3)?,
    })
}
