// Gemini REST client (HTTP direct, no SDK)

use async_trait::async_trait;
use futures::TryStreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::{Response, Url};
use std::collections::BTreeSet;

use crate::buffer_utils::parse_sse_text_stream;
use crate::config::ClientConfig;
use crate::error::{GenerationError, Result};
use crate::streaming::TextStream;
use crate::traits::{GenerateRequest, GenerationClient};
use crate::types::{strip_model_prefix, GenerateContentBody, GenerateContentResponse, ModelListResponse};

const GENERATE_METHOD: &str = "generateContent";
const STREAM_METHOD: &str = "streamGenerateContent";
const MODEL_PAGE_SIZE: &str = "1000";

pub struct GeminiClient {
    http_client: reqwest::Client,
    base_url: String,
    max_model_pages: usize,
}

impl GeminiClient {
    /// Client against the public endpoint
    pub fn new() -> Result<Self> {
        Self::with_config(ClientConfig::default())
    }

    pub fn with_config(config: ClientConfig) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http_client = reqwest::Client::builder()
            .default_headers(headers)
            .build()
            .map_err(GenerationError::transport)?;

        Ok(Self {
            http_client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            max_model_pages: config.max_model_pages.max(1),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Build `{base}/{path}?{query}`; the key only ever travels in the query
    fn endpoint(&self, path: &str, query: &[(&str, &str)]) -> Result<Url> {
        let raw = format!("{}/{}", self.base_url, path);
        Url::parse_with_params(&raw, query)
            .map_err(|e| GenerationError::InvalidRequest(format!("{raw}: {e}")))
    }

    fn generate_url(&self, request: &GenerateRequest, method: &str, streaming: bool) -> Result<Url> {
        let api_key = require_api_key(&request.api_key)?;
        let model = model_path(&request.model)?;
        let path = format!("{model}:{method}");

        if streaming {
            self.endpoint(&path, &[("key", api_key), ("alt", "sse")])
        } else {
            self.endpoint(&path, &[("key", api_key)])
        }
    }

    async fn post(&self, url: Url, body: &GenerateContentBody, streaming: bool) -> Result<Response> {
        let mut builder = self.http_client.post(url).json(body);
        if streaming {
            builder = builder.header(ACCEPT, "text/event-stream");
        }

        let response = builder
            .send()
            .await
            .map_err(|e| GenerationError::transport(e.without_url()))?;

        check_status(response).await
    }

    async fn fetch_model_page(&self, api_key: &str, page_token: Option<&str>) -> Result<ModelListResponse> {
        let mut query = vec![("key", api_key), ("pageSize", MODEL_PAGE_SIZE)];
        if let Some(token) = page_token {
            query.push(("pageToken", token));
        }
        let url = self.endpoint("models", &query)?;

        let response = self
            .http_client
            .get(url)
            .send()
            .await
            .map_err(|e| GenerationError::transport(e.without_url()))?;
        let response = check_status(response).await?;

        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::transport(e.without_url()))?;
        serde_json::from_slice(&bytes).map_err(|_| GenerationError::InvalidResponse)
    }
}

#[async_trait]
impl GenerationClient for GeminiClient {
    async fn generate_reply(&self, request: &GenerateRequest) -> Result<String> {
        let url = self.generate_url(request, GENERATE_METHOD, false)?;
        tracing::info!(model = %request.model, "Gemini: generateContent");

        let response = self.post(url, &request.body(), false).await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| GenerationError::transport(e.without_url()))?;
        let parsed: GenerateContentResponse =
            serde_json::from_slice(&bytes).map_err(|_| GenerationError::InvalidResponse)?;

        let text = parsed.first_candidate_text("\n").trim().to_string();
        if !text.is_empty() {
            tracing::info!(model = %request.model, chars = text.chars().count(), "Gemini: reply received");
            return Ok(text);
        }

        match parsed.block_reason() {
            Some(reason) => Err(GenerationError::Blocked {
                reason: reason.to_string(),
            }),
            None => Err(GenerationError::EmptyResponse),
        }
    }

    async fn stream_generate_reply(&self, request: &GenerateRequest) -> Result<TextStream> {
        let url = self.generate_url(request, STREAM_METHOD, true)?;
        tracing::info!(model = %request.model, "Gemini: streamGenerateContent");

        let response = self.post(url, &request.body(), true).await?;
        let body = response.bytes_stream().map_err(|e| e.without_url());

        Ok(parse_sse_text_stream(body))
    }

    async fn list_generate_content_models(
        &self,
        api_key: &str,
        require_streaming: bool,
    ) -> Result<Vec<String>> {
        let api_key = require_api_key(api_key)?;
        let mut ids = BTreeSet::new();
        let mut page_token: Option<String> = None;

        for _ in 0..self.max_model_pages {
            let page = self.fetch_model_page(api_key, page_token.as_deref()).await?;

            for model in &page.models {
                let usable = model.supports(GENERATE_METHOD)
                    && (!require_streaming || model.supports(STREAM_METHOD));
                if usable && !model.id().is_empty() {
                    ids.insert(model.id().to_string());
                }
            }

            match page.next_page_token.filter(|t| !t.is_empty()) {
                Some(token) => page_token = Some(token),
                None => break,
            }
        }

        tracing::info!(count = ids.len(), require_streaming, "Gemini: listed models");
        Ok(ids.into_iter().collect())
    }
}

fn require_api_key(api_key: &str) -> Result<&str> {
    let api_key = api_key.trim();
    if api_key.is_empty() {
        return Err(GenerationError::InvalidRequest("missing API key".to_string()));
    }
    Ok(api_key)
}

/// `gemini-2.5-flash` or `models/gemini-2.5-flash` → `models/gemini-2.5-flash`
fn model_path(model: &str) -> Result<String> {
    let id = strip_model_prefix(model);
    let valid = !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '.' | '_'));
    if !valid {
        return Err(GenerationError::InvalidRequest(format!(
            "invalid model name '{}'",
            model.trim()
        )));
    }
    Ok(format!("models/{id}"))
}

async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    tracing::warn!(status = status.as_u16(), "Gemini: API returned an error");
    Err(GenerationError::api(status.as_u16(), body))
}
