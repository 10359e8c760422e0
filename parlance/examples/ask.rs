//! One question, one answer, nothing kept on disk.
//!
//! # Usage
//!
//! ```bash
//! export GEMINI_API_KEY=...
//! cargo run --example ask -- "What is the capital of Brazil?"
//! ```

use anyhow::Context;
use parlance::prelude::*;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .init();

    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY not set")?;
    let question = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Explain Rust ownership in one sentence.".to_string());

    let chat = ChatBuilder::new()
        .api_key(api_key)
        .in_memory()
        .build()
        .await?;

    println!("Q: {question}");
    match chat.ask(question.as_str()).await {
        Ok(answer) => println!("A: {answer}"),
        Err(e) => eprintln!("Error: {e:#}"),
    }

    let snapshot = chat.session().snapshot();
    if let Some(notice) = snapshot.notice {
        println!("({notice})");
    }

    chat.shutdown().await
}
