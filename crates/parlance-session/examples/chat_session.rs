use anyhow::{Context, Result};
use parlance_llm::GeminiClient;
use parlance_persist::PersistClient;
use parlance_session::SessionBuilder;
use std::io::Write;
use std::sync::Arc;

/// Sends one message through an in-memory session and prints the reply as
/// it is revealed.
///
///     GEMINI_API_KEY=... cargo run -p parlance-session --example chat_session -- "Hello"
#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("GEMINI_API_KEY").context("GEMINI_API_KEY must be set")?;
    let prompt = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "Say hello in three languages.".to_string());

    let session = SessionBuilder::new()
        .client(Arc::new(GeminiClient::new()?))
        .persist(PersistClient::builder().in_memory().build()?)
        .spawn()
        .await?;
    session.set_api_key(api_key).await?;

    println!("You: {prompt}");
    print!("Gemini: ");

    let mut updates = session.subscribe();
    session.send_message(prompt).await?;

    let mut shown = 0;
    loop {
        let snapshot = updates.borrow_and_update().clone();
        let reply = snapshot.last_reply().unwrap_or_default();
        if reply.len() > shown && reply.is_char_boundary(shown) {
            print!("{}", &reply[shown..]);
            std::io::stdout().flush()?;
            shown = reply.len();
        }
        if !snapshot.is_sending {
            if let Some(error) = snapshot.error_message {
                println!("\nError: {error}");
            }
            if let Some(notice) = snapshot.notice {
                println!("\n({notice})");
            }
            break;
        }
        if updates.changed().await.is_err() {
            break;
        }
    }

    println!();
    session.shutdown().await?;
    Ok(())
}
