//! Queue download example
//!
//! This example demonstrates the core functionality of media-dl:
//! - Loading (or creating) the JSON configuration
//! - Creating a queue manager
//! - Reading the update stream
//! - Enqueueing items with different selections
//! - Running the queue with Ctrl+C cancelling the run
//!
//! ```bash
//! cargo run --example queue_download -- https://www.youtube.com/watch?v=dQw4w9WgXcQ
//! ```

use futures::StreamExt;
use media_dl::{Config, Event, ItemSelection, NewItem, Quality, QueueManager, run_with_shutdown};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "media_dl=info".into()),
        )
        .init();

    let urls: Vec<String> = std::env::args().skip(1).collect();
    if urls.is_empty() {
        eprintln!("usage: queue_download <url> [<url>...]");
        return Ok(());
    }

    // Missing or unreadable config falls back to defaults written to disk
    let config = Config::load_or_init("media-dl.json".as_ref()).await;
    let manager = QueueManager::new(config).await?;

    let mut updates = manager.updates().ok_or("update stream already taken")?;
    let printer = tokio::spawn(async move {
        while let Some(event) = updates.next().await {
            match event {
                Event::ItemStarted {
                    position,
                    total,
                    title,
                    ..
                } => {
                    println!("▶ [{}/{}] {}", position, total, title);
                }
                Event::Progress(update) => {
                    println!("  {}", update.summary_line());
                }
                Event::RetryingWithoutCookies { reason, .. } => {
                    println!("  ↻ retrying without browser cookies ({})", reason);
                }
                Event::ItemCompleted { file_path, .. } => {
                    println!("✓ saved {}", file_path.unwrap_or_default());
                }
                Event::ItemFailed { error, .. } => {
                    println!("✗ {}", error);
                }
                Event::ItemSkipped { id } => {
                    println!("⤼ skipped #{}", id);
                }
                Event::RunFinished { summary } => {
                    println!(
                        "done: {} completed, {} failed, {} skipped, {} left pending",
                        summary.completed,
                        summary.failed,
                        summary.skipped,
                        summary.cancelled_remaining
                    );
                    break;
                }
                _ => {}
            }
        }
    });

    // First URL as 1080p mkv, the rest at the default 720p mp4
    for (index, url) in urls.into_iter().enumerate() {
        let item = if index == 0 {
            NewItem::new("", url).with_selection(ItemSelection::video(Quality::Height(1080), "mkv"))
        } else {
            NewItem::new("", url)
        };
        manager.enqueue(item).await?;
    }

    run_with_shutdown(&manager).await?;
    printer.await?;

    Ok(())
}
