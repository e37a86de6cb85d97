//! Interactive support-desk chat over the music-store dataset.
//!
//! Requires `OPENROUTER_API_KEY`. Point `TUNEDESK_DB` at a local SQLite
//! file or SQL dump to skip the dataset download.

use anyhow::Result;
use std::io::{self, BufRead, Write};
use std::sync::Arc;
use tunedesk::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "tunedesk=info".into()),
        )
        .init();

    println!("Loading the music-store dataset...");
    let store = CatalogStore::load(&CatalogConfig::from_env()).await?;

    let client = Arc::new(OpenRouterClient::from_env()?);
    let model = ModelConfig::new(client.config().default_model.clone());
    let memory = Arc::new(PreferenceStore::new());
    let mut session = Session::new(client, model, store, memory)?;

    println!();
    println!("Welcome to the music store support desk. Some things to try:");
    println!("  - What was my most recent purchase?");
    println!("  - Do you have any albums by the Rolling Stones?");
    println!("  - I love rock music! What do you recommend?");
    println!("Type 'reset' to start over, or 'quit' to exit.");
    println!();

    let stdin = io::stdin();
    loop {
        print_status(&session);
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if stdin.lock().read_line(&mut line)? == 0 {
            break;
        }
        let input = line.trim();
        if input.is_empty() {
            continue;
        }
        match input {
            "quit" | "exit" => break,
            "reset" => {
                session.reset();
                println!("Session cleared.\n");
                continue;
            }
            _ => {}
        }

        match session.handle_turn(input).await {
            Ok(outcome) => println!("\n{}\n", outcome.reply()),
            Err(e) => {
                tracing::error!(error = %e, "turn failed");
                println!("\n{}\n", e.user_message());
            }
        }
    }

    println!("Goodbye!");
    Ok(())
}

fn print_status(session: &Session) {
    let identity = match session.customer() {
        Some(customer) => format!("customer {}", customer),
        None => "unverified".to_string(),
    };
    let phase = match session.phase() {
        SessionPhase::Ready => "ready",
        SessionPhase::AwaitingIdentifier { .. } => "awaiting identifier",
    };
    println!("[{} | {}]", identity, phase);
}
