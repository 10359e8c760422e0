//! Scripted generation client shared by the session tests

#![allow(dead_code)]

use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use parlance_llm::{GenerateRequest, GenerationClient, GenerationError, Result, TextStream};
use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

/// What one `stream_generate_reply` call does
pub enum StreamScript {
    /// Fail before any body arrives
    Reject(GenerationError),
    /// Yield these items, then end
    Items(Vec<Result<String>>),
    /// Yield these items, then never end
    Stall(Vec<Result<String>>),
    /// Yield each text after waiting its delay, then end
    Paced(Vec<(Duration, String)>),
    /// Like `Paced`, but never end
    PacedStall(Vec<(Duration, String)>),
}

impl StreamScript {
    pub fn chunks(chunks: &[&str]) -> Self {
        Self::Items(chunks.iter().map(|c| Ok(c.to_string())).collect())
    }
}

#[derive(Default)]
pub struct FakeClient {
    streams: Mutex<VecDeque<StreamScript>>,
    replies: Mutex<VecDeque<Result<String>>>,
    models: Mutex<Vec<String>>,
    stream_requests: Mutex<Vec<GenerateRequest>>,
    generate_requests: Mutex<Vec<GenerateRequest>>,
}

impl FakeClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn with_reply(self, reply: Result<String>) -> Self {
        self.replies.lock().unwrap().push_back(reply);
        self
    }

    pub fn with_models(self, models: &[&str]) -> Self {
        *self.models.lock().unwrap() = models.iter().map(|m| m.to_string()).collect();
        self
    }

    pub fn stream_requests(&self) -> Vec<GenerateRequest> {
        self.stream_requests.lock().unwrap().clone()
    }

    pub fn generate_requests(&self) -> Vec<GenerateRequest> {
        self.generate_requests.lock().unwrap().clone()
    }
}

fn paced(items: Vec<(Duration, String)>) -> impl futures::Stream<Item = Result<String>> + Send {
    stream::iter(items).then(|(delay, text)| async move {
        tokio::time::sleep(delay).await;
        Ok(text)
    })
}

fn unscripted() -> GenerationError {
    GenerationError::InvalidRequest("unscripted call".to_string())
}

#[async_trait]
impl GenerationClient for FakeClient {
    async fn generate_reply(&self, request: &GenerateRequest) -> Result<String> {
        self.generate_requests.lock().unwrap().push(request.clone());
        let next = self.replies.lock().unwrap().pop_front();
        next.unwrap_or_else(|| Err(unscripted()))
    }

    async fn stream_generate_reply(&self, request: &GenerateRequest) -> Result<TextStream> {
        self.stream_requests.lock().unwrap().push(request.clone());
        let next = self.streams.lock().unwrap().pop_front();
        match next {
            None => Err(unscripted()),
            Some(StreamScript::Reject(err)) => Err(err),
            Some(StreamScript::Items(items)) => Ok(Box::pin(stream::iter(items))),
            Some(StreamScript::Stall(items)) => {
                Ok(Box::pin(stream::iter(items).chain(stream::pending())))
            }
            Some(StreamScript::Paced(items)) => Ok(Box::pin(paced(items))),
            Some(StreamScript::PacedStall(items)) => {
                Ok(Box::pin(paced(items).chain(stream::pending())))
            }
        }
    }

    async fn list_generate_content_models(
        &self,
        _api_key: &str,
        _require_streaming: bool,
    ) -> Result<Vec<String>> {
        Ok(self.models.lock().unwrap().clone())
    }
}
