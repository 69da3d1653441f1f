//! Submit a batch of recipe photos and watch the queue drain.
//!
//! Usage: cargo run --example basic_ingest -- photo1.jpg photo2.jpg

use std::time::Duration;

use recipe_ingest::{ImageSource, IngestConfig, IngestPipeline, ItemStatus, SubmitContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let paths: Vec<String> = std::env::args().skip(1).collect();
    if paths.is_empty() {
        eprintln!("usage: basic_ingest <image> [<image> ...]");
        std::process::exit(1);
    }

    let mut images = Vec::new();
    for path in &paths {
        let name = std::path::Path::new(path)
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_else(|| path.clone());
        images.push(ImageSource::new(name, std::fs::read(path)?));
    }

    let pipeline = IngestPipeline::new(IngestConfig::new("demo-user"));
    let ids = pipeline.submit_images(
        images,
        SubmitContext {
            collection_id: Some("weeknight".to_string()),
        },
    )?;
    println!("submitted {} item(s)", ids.len());

    // Every item is already visible, before any network work resolved.
    for item in pipeline.queue().list() {
        println!("  {:?}  {}", item.status, item.title);
    }

    let queue = pipeline.queue();
    while queue.processing_count() > 0 {
        tokio::time::sleep(Duration::from_millis(250)).await;
    }

    println!("\nfinished:");
    for item in queue.list() {
        match item.status {
            ItemStatus::Done => {
                println!("  done   {} -> {}", item.title, item.record.id());
                if let Some(link_error) = item.link_error {
                    println!("         (collection link failed: {})", link_error);
                }
            }
            ItemStatus::Error => {
                println!(
                    "  error  {}: {}",
                    item.title,
                    item.error.unwrap_or_default()
                );
            }
            ItemStatus::Processing => unreachable!(),
        }
    }
    Ok(())
}
