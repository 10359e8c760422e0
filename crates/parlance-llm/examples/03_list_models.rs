use anyhow::Result;
use parlance_llm::{GeminiClient, GenerationClient, DEFAULT_MODEL};

#[tokio::main]
async fn main() -> Result<()> {
    let api_key = std::env::var("GEMINI_API_KEY")?;
    let client = GeminiClient::new()?;

    let models = client.list_generate_content_models(&api_key, true).await?;
    println!("{} streaming models:", models.len());
    for model in &models {
        println!("  {}", model);
    }

    let resolution = client
        .resolve_model_and_available_models(&api_key, DEFAULT_MODEL)
        .await?;
    println!("\nResolved model: {}", resolution.model);

    Ok(())
}
