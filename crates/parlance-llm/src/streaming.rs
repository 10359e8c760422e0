use futures::Stream;
use serde_json::Value;
use std::pin::Pin;

use crate::error::Result;
use crate::types::GenerateContentResponse;

/// Successive cumulative reply texts, each one extending the previous
pub type TextStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// What one decoded JSON payload contributed to the reply
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StreamChunk {
    /// One entry per response object (a payload may be an array of them)
    pub texts: Vec<String>,
    pub block_reason: Option<String>,
    pub finish_reason: Option<String>,
}

impl StreamChunk {
    pub fn from_value(value: Value) -> Self {
        let mut chunk = StreamChunk::default();
        match value {
            Value::Array(items) => {
                for item in items {
                    chunk.absorb(item);
                }
            }
            other => chunk.absorb(other),
        }
        chunk
    }

    fn absorb(&mut self, value: Value) {
        let Ok(response) = serde_json::from_value::<GenerateContentResponse>(value) else {
            return;
        };

        let text = response.first_candidate_text("");
        if !text.is_empty() {
            self.texts.push(text);
        }
        if let Some(reason) = response.block_reason() {
            self.block_reason = Some(reason.to_string());
        }
        if let Some(reason) = response.finish_reason() {
            self.finish_reason = Some(reason.to_string());
        }
    }

    pub fn has_text(&self) -> bool {
        !self.texts.is_empty()
    }
}
