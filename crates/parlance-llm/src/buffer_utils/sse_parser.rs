use futures::{Stream, StreamExt};
use serde_json::Value;

use super::buffering::CircularLineBuffer;
use crate::error::{GenerationError, Result};
use crate::merge::{merge_all, merge_text};
use crate::streaming::{StreamChunk, TextStream};

const DONE_MARKER: &str = "[DONE]";

/// Incremental SSE decoder that turns body lines into one growing reply text.
///
/// Tolerates providers that forget the blank line between events: after
/// every `data:` line the pending buffer is decoded eagerly and cleared on
/// success, so a later blank line finds nothing left to re-decode.
#[derive(Debug, Default)]
pub struct SseTextDecoder {
    event_lines: Vec<String>,
    text: String,
    fragments: usize,
    block_reason: Option<String>,
    finish_reason: Option<String>,
    done: bool,
}

impl SseTextDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cumulative text decoded so far
    pub fn text(&self) -> &str {
        &self.text
    }

    /// `[DONE]` has been seen
    pub fn is_done(&self) -> bool {
        self.done
    }

    pub fn finish_reason(&self) -> Option<&str> {
        self.finish_reason.as_deref()
    }

    /// Feed one body line (without its line ending).
    ///
    /// Returns the cumulative text when this line made it grow.
    pub fn push_line(&mut self, line: &str) -> Option<String> {
        if self.done {
            return None;
        }

        let before = self.text.len();
        let line = line.trim_end_matches('\r');

        if line.is_empty() {
            self.flush_event();
        } else if line.starts_with(':') {
            return None;
        } else if let Some(payload) = line.strip_prefix("data:") {
            let payload = payload.strip_prefix(' ').unwrap_or(payload);
            if payload.trim() == DONE_MARKER {
                tracing::debug!("SSE: done marker received");
                self.done = true;
                return None;
            }
            self.event_lines.push(payload.to_string());
            self.try_eager_decode();
        } else {
            // event:, id:, retry: carry nothing we render
            return None;
        }

        self.grown_since(before)
    }

    /// Flush whatever is still buffered once the body has ended.
    ///
    /// Fails when the whole stream produced no text at all.
    pub fn finish(&mut self) -> Result<Option<String>> {
        let before = self.text.len();
        self.flush_event();

        if self.fragments == 0 {
            return Err(match self.block_reason.take() {
                Some(reason) => GenerationError::Blocked { reason },
                None => GenerationError::EmptyResponse,
            });
        }

        Ok(self.grown_since(before))
    }

    fn grown_since(&self, before: usize) -> Option<String> {
        // Merging never shrinks the text, so growth is the only change
        (self.text.len() > before).then(|| self.text.clone())
    }

    fn try_eager_decode(&mut self) {
        if let Some(value) = decode_joined(&self.event_lines) {
            self.event_lines.clear();
            self.apply(StreamChunk::from_value(value));
        }
    }

    fn flush_event(&mut self) {
        if self.event_lines.is_empty() {
            return;
        }

        let lines = std::mem::take(&mut self.event_lines);
        if let Some(value) = decode_joined(&lines) {
            self.apply(StreamChunk::from_value(value));
            return;
        }

        // Malformed event: salvage every line that decodes on its own
        let chunks: Vec<StreamChunk> = lines
            .iter()
            .filter_map(|line| serde_json::from_str::<Value>(line).ok())
            .map(StreamChunk::from_value)
            .collect();
        for chunk in &chunks {
            self.note_reasons(chunk);
        }
        let recovered = merge_all(chunks.iter().flat_map(|c| c.texts.iter().map(String::as_str)));

        if recovered.is_empty() {
            tracing::debug!(lines = lines.len(), "SSE: dropping undecodable event");
        } else {
            tracing::debug!(lines = lines.len(), "SSE: recovered text from malformed event");
            self.fragments += 1;
            self.text = merge_text(&self.text, &recovered);
        }
    }

    fn apply(&mut self, chunk: StreamChunk) {
        self.note_reasons(&chunk);
        for text in &chunk.texts {
            self.fragments += 1;
            self.text = merge_text(&self.text, text);
        }
    }

    fn note_reasons(&mut self, chunk: &StreamChunk) {
        if let Some(reason) = &chunk.block_reason {
            self.block_reason = Some(reason.clone());
        }
        if let Some(reason) = &chunk.finish_reason {
            self.finish_reason = Some(reason.clone());
        }
    }
}

/// Decode a buffered event as one JSON value.
///
/// SSE joins multi-line data with newlines; providers that split a JSON
/// document mid-token need the lines glued back without them.
fn decode_joined(lines: &[String]) -> Option<Value> {
    if lines.is_empty() {
        return None;
    }
    if let Ok(value) = serde_json::from_str(&lines.join("\n")) {
        return Some(value);
    }
    if lines.len() > 1 {
        return serde_json::from_str(&lines.concat()).ok();
    }
    None
}

/// Turn a chunked SSE body into a stream of cumulative reply texts.
///
/// A transport error ends the stream with `GenerationError::Transport`; a
/// body with no text ends it with `EmptyResponse` (or `Blocked`).
pub fn parse_sse_text_stream<S, B, E>(body: S) -> TextStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    Box::pin(async_stream::stream! {
        let mut body = Box::pin(body);
        let mut buffer = CircularLineBuffer::with_capacity(8192);
        let mut decoder = SseTextDecoder::new();
        let mut failed = false;

        'read: while let Some(chunk_result) = body.next().await {
            match chunk_result {
                Ok(bytes) => {
                    buffer.extend(bytes.as_ref());

                    while let Some(line) = buffer.next_line() {
                        if let Some(text) = decoder.push_line(&line) {
                            yield Ok(text);
                        }
                        if decoder.is_done() {
                            break 'read;
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!("SSE: body stream failed: {}", e);
                    yield Err(GenerationError::transport(e));
                    failed = true;
                    break;
                }
            }
        }

        if !failed {
            if !decoder.is_done() {
                if let Some(line) = buffer.take_remaining() {
                    if let Some(text) = decoder.push_line(&line) {
                        yield Ok(text);
                    }
                }
            }

            match decoder.finish() {
                Ok(Some(text)) => yield Ok(text),
                Ok(None) => {}
                Err(e) => yield Err(e),
            }

            if let Some(reason) = decoder.finish_reason() {
                tracing::debug!(finish_reason = %reason, "SSE: stream finished");
            }
        }
    })
}
