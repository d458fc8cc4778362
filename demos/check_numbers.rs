//! Check a batch of phone numbers end to end
//!
//! This example demonstrates the full job lifecycle:
//! - Loading configuration from `.env` / the environment
//! - Writing the numbers to a newline-separated input file
//! - Subscribing to lifecycle events
//! - Submitting, polling every 5 seconds, and downloading the result spreadsheet
//!
//! ```bash
//! WHATSAPP_API_KEY=... cargo run --example check_numbers
//! RUST_LOG=numcheck=debug cargo run --example check_numbers -- numbers.txt
//! ```

use numcheck::{Config, Event, InputBatch, JobClient, Outcome};
use std::path::PathBuf;
use std::time::Duration;
use tracing_subscriber::EnvFilter;

const INPUT_FILE: &str = "input.txt";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("numcheck=info")),
        )
        .init();
    dotenvy::dotenv().ok();

    let config = Config::from_env()?;
    let client = JobClient::new(config)?;

    // Numbers come from a file given on the command line, or a built-in sample
    let (batch, input_path, created_input) = match std::env::args().nth(1) {
        Some(path) => {
            let path = PathBuf::from(path);
            (InputBatch::from_file(&path).await?, path, false)
        }
        None => {
            let batch = InputBatch::new(["+1234567890", "+9876543210", "+1122334455"])?;
            let path = PathBuf::from(INPUT_FILE);
            batch.write_to_file(&path).await?;
            println!("Created input file: {}", path.display());
            (batch, path, true)
        }
    };
    println!("Checking {} numbers from {}", batch.len(), input_path.display());

    let mut events = client.subscribe();
    tokio::spawn(async move {
        while let Ok(event) = events.recv().await {
            match event {
                Event::Submitted { task } => {
                    println!("✓ Task ID: {}", task.task_id);
                    println!("  Initial status: {}", task.status);
                }
                Event::StatusChanged { task } => {
                    println!(
                        "… {} ({}/{} checked, {:.0}%)",
                        task.status,
                        task.success.saturating_add(task.failure),
                        task.total,
                        task.progress() * 100.0
                    );
                }
                Event::Downloading { url, .. } => {
                    println!("⬇ Downloading results from {}", url);
                }
                Event::Downloaded { path, bytes, .. } => {
                    println!("✓ Saved {} bytes to {}", bytes, path.display());
                }
                Event::Failed { stage, error } => {
                    println!("✗ {} failed [{}]: {}", stage, error.code, error.message);
                }
            }
        }
    });

    let outcome = client.run(&batch, Duration::from_secs(5), None).await;

    if created_input {
        if tokio::fs::remove_file(&input_path).await.is_ok() {
            println!("Cleaned up temporary files");
        }
    }

    match outcome {
        Outcome::Completed {
            task,
            artifact: Some(path),
        } => {
            println!("Task {} completed, results saved to {}", task.task_id, path.display());
            Ok(())
        }
        Outcome::Completed {
            task,
            artifact: None,
        } => {
            println!("Task {} completed without a result file", task.task_id);
            Ok(())
        }
        Outcome::Failed(reason) => Err(reason.into()),
    }
}
