use anyhow::Result;
use parlance_llm::{Content, GeminiClient, GenerateRequest, GenerationClient, DEFAULT_MODEL};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("GEMINI_API_KEY")?;
    let client = GeminiClient::new()?;

    let request = GenerateRequest::new(
        api_key,
        DEFAULT_MODEL,
        vec![Content::user("What is the capital of France?")],
    );

    let reply = client.generate_reply(&request).await?;
    println!("Response: {}", reply);

    Ok(())
}
