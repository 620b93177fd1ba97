use std::path::PathBuf;

use chrono::Utc;

use weekly_digest::app::App;
use weekly_digest::config::Config;
use weekly_digest::digest::select_current_digest;
use weekly_digest::error::{AppError, Result};
use weekly_digest::models::GenerationStatus;

const USAGE: &str = "Usage: weekly-digest <command>

Commands:
  --refresh                 Fetch all feeds and update the weekly digests
  --current                 List this week's articles
  --generate [link]         Draft the newsletter for the latest week
  --archive                 List archived newsletters
  --cleanup                 Remove articles past the retention horizon
  --import <file.opml>      Import feed sources from OPML
  --subscribe <email>       Add a subscriber
  --unsubscribe <email>     Deactivate a subscriber";

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging (only show warnings and errors by default)
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    // Parse command line arguments
    let args: Vec<String> = std::env::args().collect();
    let command = args.get(1).map(String::as_str);
    let value = args.get(2).map(String::as_str);

    if matches!(command, None | Some("--help") | Some("-h")) {
        println!("{}", USAGE);
        return Ok(());
    }

    // Load configuration
    let config = Config::load()?;
    let app = App::new(config).await?;

    match (command, value) {
        (Some("--refresh"), _) => {
            let report = app.refresh().await?;
            println!(
                "Fetched {} articles ({} new), {} weekly digests",
                report.fetched, report.new_articles, report.digests
            );
            if let Some(digest) = select_current_digest(&app.digests()?) {
                println!("{} ({}): {}", digest.title, digest.date_range, digest.summary);
            }
        }

        (Some("--current"), _) => {
            for article in app.current_week_articles(Utc::now()).await? {
                let source = article.source_name.as_deref().unwrap_or("-");
                println!("[{}] {}\n    {}", source, article.title, article.link);
            }
        }

        (Some("--generate"), link) => match app.generate(link).await? {
            GenerationStatus::Generated => println!("Newsletter generated and archived"),
            GenerationStatus::NoApiKey => println!("No API key configured (set ANTHROPIC_API_KEY)"),
            GenerationStatus::NoDigest => println!("No digests yet; run --refresh first"),
            GenerationStatus::Failed | GenerationStatus::NotGenerated => {
                println!("Newsletter generation failed")
            }
        },

        (Some("--archive"), _) => {
            for newsletter in app.archive().await? {
                println!(
                    "{}-W{:02}  {}  {} ({} articles)",
                    newsletter.year,
                    newsletter.week_number,
                    newsletter.date_range,
                    newsletter.title,
                    newsletter.item_count
                );
            }
        }

        (Some("--cleanup"), _) => {
            let removed = app.cleanup(Utc::now()).await?;
            println!("Removed {} stale articles", removed);
        }

        (Some("--import"), Some(path)) => {
            let path = PathBuf::from(path);
            let added = app.import_opml(&path).await?;
            println!("Imported {} feeds from {:?}", added, path);
        }

        (Some("--subscribe"), Some(email)) => {
            app.subscribe(email).await?;
            println!("Subscribed {}", email);
        }

        (Some("--unsubscribe"), Some(email)) => {
            if app.unsubscribe(email).await? {
                println!("Unsubscribed {}", email);
            } else {
                println!("No active subscription for {}", email);
            }
        }

        _ => {
            eprintln!("{}", USAGE);
            return Err(AppError::InvalidInput(format!(
                "unrecognised arguments: {}",
                args[1..].join(" ")
            )));
        }
    }

    Ok(())
}
