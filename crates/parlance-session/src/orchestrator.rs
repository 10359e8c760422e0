//! Recovery around one send: streaming with a non-streaming fallback, a
//! retry without the system prompt for models that reject it, and model
//! re-resolution when the selected model is gone.

use futures::StreamExt;
use parlance_llm::{GenerateRequest, GenerationClient, GenerationError, Result, TextStream};
use std::future::Future;
use std::sync::Arc;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::pacing::{animate, RateEstimator};

pub const PROMPT_DROPPED_NOTICE: &str =
    "This model does not accept a system prompt, so the reply was generated without it.";

/// Receives every intermediate rendering of the reply
pub trait ReplySink: Send {
    fn render(&mut self, text: &str);
}

impl<F> ReplySink for F
where
    F: FnMut(&str) + Send,
{
    fn render(&mut self, text: &str) {
        self(text)
    }
}

/// What had to change for a send to succeed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SendReport {
    pub requested_model: String,
    pub model_used: String,
    pub prompt_dropped: bool,
    /// Present when the model list was fetched during recovery
    pub available_models: Option<Vec<String>>,
    /// The full reply text
    pub text: String,
}

impl SendReport {
    pub fn model_substituted(&self) -> bool {
        self.model_used != self.requested_model
    }

    /// User-facing explanation of any recovery that happened
    pub fn notice(&self) -> Option<String> {
        let mut parts = Vec::new();
        if self.model_substituted() {
            parts.push(format!(
                "Model {} is not available for this API key; switched to {}.",
                self.requested_model, self.model_used
            ));
        }
        if self.prompt_dropped {
            parts.push(PROMPT_DROPPED_NOTICE.to_string());
        }
        if parts.is_empty() {
            None
        } else {
            Some(parts.join(" "))
        }
    }
}

/// Run `fut` unless `cancel` fires first
async fn or_cancelled<T, F>(cancel: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        _ = cancel.cancelled() => Err(GenerationError::Cancelled),
        result = fut => result,
    }
}

pub struct Orchestrator {
    client: Arc<dyn GenerationClient>,
    full_reply_rate: f64,
}

impl Orchestrator {
    pub fn new(client: Arc<dyn GenerationClient>, full_reply_rate: f64) -> Self {
        Self {
            client,
            full_reply_rate,
        }
    }

    /// Generate a reply for `request`, rendering it into `sink` as it arrives.
    ///
    /// Cancellation yields `GenerationError::Cancelled`; whatever was
    /// rendered by then stays rendered.
    pub async fn send<S>(
        &self,
        request: GenerateRequest,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<SendReport>
    where
        S: ReplySink,
    {
        let prompt = request.system_prompt.clone();
        let mut request = request.with_system_prompt(prompt);
        let mut rendered = String::new();
        let mut report = SendReport {
            requested_model: request.model.clone(),
            model_used: request.model.clone(),
            prompt_dropped: false,
            available_models: None,
            text: String::new(),
        };

        let first = self
            .attempt_with_prompt_drop(&mut request, &mut report, &mut rendered, sink, cancel)
            .await;

        match first {
            Err(err) if err.is_model_not_found() => {
                tracing::warn!(model = %request.model, "Model not found, resolving a replacement");
                let resolution = or_cancelled(
                    cancel,
                    self.client
                        .resolve_model_and_available_models(&request.api_key, &request.model),
                )
                .await?;

                report.available_models = Some(resolution.available);
                if resolution.model == request.model {
                    return Err(err);
                }

                tracing::info!(from = %request.model, to = %resolution.model, "Retrying with resolved model");
                report.model_used = resolution.model.clone();
                request.model = resolution.model;
                self.attempt_with_prompt_drop(&mut request, &mut report, &mut rendered, sink, cancel)
                    .await?;
            }
            other => other?,
        }

        report.text = rendered;
        Ok(report)
    }

    /// One attempt, repeated once without the system prompt if the model
    /// rejects it
    async fn attempt_with_prompt_drop<S>(
        &self,
        request: &mut GenerateRequest,
        report: &mut SendReport,
        rendered: &mut String,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: ReplySink,
    {
        match self.attempt(request, rendered, sink, cancel).await {
            Err(err) if err.is_system_prompt_unsupported() && request.has_system_prompt() => {
                tracing::warn!(model = %request.model, "System prompt rejected, retrying without it");
                request.system_prompt = None;
                report.prompt_dropped = true;
                self.attempt(request, rendered, sink, cancel).await
            }
            other => other,
        }
    }

    /// Stream the reply; on a transport-level failure fetch it whole instead
    async fn attempt<S>(
        &self,
        request: &GenerateRequest,
        rendered: &mut String,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: ReplySink,
    {
        let fallback_reason = match or_cancelled(cancel, self.client.stream_generate_reply(request)).await {
            Ok(stream) => match self.follow_stream(stream, rendered, sink, cancel).await {
                Err(err) if err.should_fall_back() => err,
                other => return other,
            },
            Err(err) if err.should_fall_back() => err,
            Err(err) => return Err(err),
        };

        tracing::warn!(model = %request.model, error = %fallback_reason, "Streaming failed, falling back to a full reply");
        let reply = or_cancelled(cancel, self.client.generate_reply(request)).await?;

        if animate(rendered, &reply, self.full_reply_rate, cancel, |t| sink.render(t)).await {
            Ok(())
        } else {
            Err(GenerationError::Cancelled)
        }
    }

    /// Reveal a stream while it is still being read.
    ///
    /// Arrivals are timestamped as they are received, and each one
    /// re-targets the animator at the updated rate.
    async fn follow_stream<S>(
        &self,
        mut stream: TextStream,
        rendered: &mut String,
        sink: &mut S,
        cancel: &CancellationToken,
    ) -> Result<()>
    where
        S: ReplySink,
    {
        let mut estimator = RateEstimator::new();
        let mut target = String::new();
        let mut target_chars = 0;

        loop {
            let catching_up = *rendered != target;

            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(GenerationError::Cancelled),
                next = stream.next() => match next {
                    Some(Ok(text)) => {
                        let chars = text.chars().count();
                        estimator.observe(target_chars, chars, Instant::now());
                        target_chars = chars;
                        target = text;
                    }
                    Some(Err(err)) => return Err(err),
                    None => break,
                },
                done = animate(rendered, &target, estimator.rate(), cancel, |t| sink.render(t)), if catching_up => {
                    if !done {
                        return Err(GenerationError::Cancelled);
                    }
                }
            }
        }

        if animate(rendered, &target, estimator.rate(), cancel, |t| sink.render(t)).await {
            Ok(())
        } else {
            Err(GenerationError::Cancelled)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(requested: &str, used: &str, dropped: bool) -> SendReport {
        SendReport {
            requested_model: requested.to_string(),
            model_used: used.to_string(),
            prompt_dropped: dropped,
            available_models: None,
            text: String::new(),
        }
    }

    #[test]
    fn test_notice_names_both_models() {
        let notice = report("gemini-1.0-pro", "gemini-2.5-flash", false).notice().unwrap();
        assert!(notice.contains("gemini-1.0-pro"));
        assert!(notice.contains("gemini-2.5-flash"));
    }

    #[test]
    fn test_notice_for_prompt_drop() {
        assert_eq!(
            report("m", "m", true).notice().as_deref(),
            Some(PROMPT_DROPPED_NOTICE)
        );
        assert_eq!(report("m", "m", false).notice(), None);
    }

    #[test]
    fn test_closures_are_sinks() {
        let mut seen = Vec::new();
        {
            let mut sink = |t: &str| seen.push(t.to_string());
            sink.render("a");
        }
        assert_eq!(seen, vec!["a"]);
    }
}
