use anyhow::Result;
use futures::StreamExt;
use parlance_llm::{
    Content, GeminiClient, GenerateRequest, GenerationClient, SafetyPreset, DEFAULT_MODEL,
};
use std::io::Write;

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("GEMINI_API_KEY")?;
    let client = GeminiClient::new()?;

    let request = GenerateRequest::new(
        api_key,
        DEFAULT_MODEL,
        vec![Content::user("Write a haiku about the sea.")],
    )
    .with_system_prompt(Some("Answer in English.".to_string()))
    .with_safety(SafetyPreset::Balanced);

    println!("Streaming response:\n");

    // Each item is the whole reply so far; print only what is new
    let mut stream = client.stream_generate_reply(&request).await?;
    let mut printed = 0;
    while let Some(text) = stream.next().await {
        let text = text?;
        print!("{}", &text[printed..]);
        std::io::stdout().flush()?;
        printed = text.len();
    }

    println!("\n\nDone.");
    Ok(())
}
