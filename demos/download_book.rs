//! Download one or more books and print the result as JSON.
//!
//! ```bash
//! RUST_LOG=scripture_dl=debug cargo run --example download_book -- KJV Philemon Jude
//! ```

use scripture_dl::{BibleDownloader, Config, Event, JobRequest, run_with_shutdown};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("scripture_dl=info")),
        )
        .init();

    let mut args = std::env::args().skip(1);
    let config = Config::default();
    let translation = args
        .next()
        .unwrap_or_else(|| config.download.default_translation.clone());
    let mut books: Vec<String> = args.collect();
    if books.is_empty() {
        books.push("Philemon".to_string());
    }

    let downloader = BibleDownloader::new(config)?;

    let mut events = downloader.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            if let Event::ChapterRetrying { book, chapter, attempt, error } = &event {
                eprintln!("retrying {book} {chapter} (attempt {attempt}): {error}");
            }
        }
    });

    let request = JobRequest::from_config(&downloader.config(), translation).with_books(books);
    let result = run_with_shutdown(&downloader, &request).await?;

    println!("{}", serde_json::to_string_pretty(&result)?);
    if !result.is_complete() {
        eprintln!("{} chapter(s) failed", result.failed.len());
    }
    Ok(())
}
