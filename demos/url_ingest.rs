//! Ingest a recipe from a web page URL.
//!
//! Usage: cargo run --example url_ingest -- https://example.com/some-recipe

use std::time::Duration;

use recipe_ingest::{IngestConfig, IngestPipeline, ItemStatus, SubmitContext};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt::init();

    let url = match std::env::args().nth(1) {
        Some(url) => url,
        None => {
            eprintln!("usage: url_ingest <url>");
            std::process::exit(1);
        }
    };

    let pipeline = IngestPipeline::new(IngestConfig::new("demo-user"));
    let id = pipeline.submit_url(&url, SubmitContext::default())?;

    let queue = pipeline.queue();
    let item = loop {
        match queue.get(&id) {
            Some(item) if item.status != ItemStatus::Processing => break item,
            _ => tokio::time::sleep(Duration::from_millis(250)).await,
        }
    };

    match item.status {
        ItemStatus::Done => {
            println!("persisted as {}: {}", item.record.id(), item.title);
            if let Some(draft) = item.draft {
                println!("  {} ingredient(s), {} step(s)", draft.ingredients.len(), draft.steps.len());
            }
        }
        ItemStatus::Error => {
            println!("failed: {}", item.error.unwrap_or_default());
        }
        ItemStatus::Processing => unreachable!(),
    }
    Ok(())
}
