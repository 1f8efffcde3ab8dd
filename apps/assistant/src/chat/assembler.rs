//! Streaming Response Assembler.
//!
//! Issues a streaming completion and exposes the growing reply as a
//! pull-based sequence of events. Transient failures restart the whole
//! request after a fixed backoff; text from a failed attempt is discarded,
//! never resumed.

use std::sync::Arc;
use std::time::Duration;

use futures::StreamExt;
use tracing::{debug, error, warn};

use crate::llm_client::{
    ChatMessage, CompletionBackend, CompletionRequest, FragmentStream, LlmError,
};

const DEFAULT_MAX_ATTEMPTS: u32 = 3;
const DEFAULT_BACKOFF: Duration = Duration::from_secs(2);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts, including the first.
    pub max_attempts: u32,
    /// Fixed wait between attempts.
    pub backoff: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_attempts: DEFAULT_MAX_ATTEMPTS,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// How an assembly ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AssemblyStatus {
    /// The stream closed normally.
    Completed,
    /// Every attempt failed with a transient error.
    Exhausted { attempts: u32, error: String },
    /// A non-retryable error; no further attempts were made.
    Fatal { error: String },
    /// The backend answered without a stream. Not retried.
    MissingStream,
}

/// Terminal result. `text` is the accumulator at the moment the assembly ended,
/// which is partial for every status except `Completed`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssemblyOutcome {
    pub text: String,
    pub status: AssemblyStatus,
}

impl AssemblyOutcome {
    #[cfg(test)]
    pub fn is_completed(&self) -> bool {
        self.status == AssemblyStatus::Completed
    }
}

#[derive(Debug)]
pub enum AssemblyEvent {
    /// Accumulated text after one more fragment.
    Partial(String),
    /// An attempt failed and another will follow after the backoff.
    Retrying { attempt: u32, max_attempts: u32 },
    /// Emitted exactly once; the sequence ends after it.
    Finished(AssemblyOutcome),
}

/// Builds streaming chat requests for one model configuration.
pub struct StreamingAssembler {
    backend: Arc<dyn CompletionBackend>,
    model: String,
    max_tokens: u32,
    policy: RetryPolicy,
}

impl StreamingAssembler {
    pub fn new(
        backend: Arc<dyn CompletionBackend>,
        model: String,
        max_tokens: u32,
        policy: RetryPolicy,
    ) -> Self {
        Self {
            backend,
            model,
            max_tokens,
            policy,
        }
    }

    /// Starts an assembly for the given context. Nothing is sent until the
    /// first `next_event` call.
    pub fn respond(&self, context: Vec<ChatMessage>) -> ResponseAssembly {
        ResponseAssembly {
            backend: self.backend.clone(),
            request: CompletionRequest {
                model: self.model.clone(),
                messages: context,
                max_tokens: self.max_tokens,
            },
            policy: self.policy,
            attempts: 0,
            accumulator: String::new(),
            stream: None,
            backoff_pending: false,
            outcome: None,
        }
    }
}

/// One in-flight chat response.
pub struct ResponseAssembly {
    backend: Arc<dyn CompletionBackend>,
    request: CompletionRequest,
    policy: RetryPolicy,
    attempts: u32,
    accumulator: String,
    stream: Option<FragmentStream>,
    backoff_pending: bool,
    outcome: Option<AssemblyOutcome>,
}

impl ResponseAssembly {
    #[cfg(test)]
    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// Pulls the next event, issuing or re-issuing the request as needed.
    /// Returns `None` once `Finished` has been produced.
    pub async fn next_event(&mut self) -> Option<AssemblyEvent> {
        if self.outcome.is_some() {
            return None;
        }

        let mut stream = match self.stream.take() {
            Some(stream) => stream,
            None => match self.open().await {
                Ok(stream) => stream,
                Err(event) => return Some(event),
            },
        };

        match stream.next().await {
            Some(Ok(fragment)) => {
                self.stream = Some(stream);
                self.accumulator.push_str(fragment.text());
                Some(AssemblyEvent::Partial(self.accumulator.clone()))
            }
            Some(Err(e)) => Some(self.fail(e)),
            None => {
                debug!(
                    "Stream completed after {} attempt(s), {} chars",
                    self.attempts,
                    self.accumulator.len()
                );
                Some(self.conclude(AssemblyStatus::Completed))
            }
        }
    }

    /// Drives the assembly to its end and returns the outcome.
    #[cfg(test)]
    pub async fn finish(mut self) -> AssemblyOutcome {
        loop {
            if let Some(outcome) = self.outcome.take() {
                return outcome;
            }
            self.next_event().await;
        }
    }

    async fn open(&mut self) -> Result<FragmentStream, AssemblyEvent> {
        if self.backoff_pending {
            tokio::time::sleep(self.policy.backoff).await;
            self.backoff_pending = false;
            self.accumulator.clear();
        }

        self.attempts += 1;
        debug!(
            "Opening chat stream (model: {}, attempt {}/{}, {} messages)",
            self.request.model,
            self.attempts,
            self.policy.max_attempts,
            self.request.messages.len()
        );

        match self.backend.stream(&self.request).await {
            Ok(Some(stream)) => Ok(stream),
            Ok(None) => {
                error!("Failed to get assistant response: backend returned no stream");
                Err(self.conclude(AssemblyStatus::MissingStream))
            }
            Err(e) => Err(self.fail(e)),
        }
    }

    fn fail(&mut self, error: LlmError) -> AssemblyEvent {
        if !error.is_transient() {
            error!("Chat request failed with a non-retryable error: {error}");
            return self.conclude(AssemblyStatus::Fatal {
                error: error.to_string(),
            });
        }

        if self.attempts >= self.policy.max_attempts {
            error!(
                "Connection failed after {} attempts: {}",
                self.attempts, error
            );
            return self.conclude(AssemblyStatus::Exhausted {
                attempts: self.attempts,
                error: error.to_string(),
            });
        }

        warn!(
            "Chat attempt {}/{} failed, retrying after {}ms: {}",
            self.attempts,
            self.policy.max_attempts,
            self.policy.backoff.as_millis(),
            error
        );
        self.backoff_pending = true;
        AssemblyEvent::Retrying {
            attempt: self.attempts,
            max_attempts: self.policy.max_attempts,
        }
    }

    fn conclude(&mut self, status: AssemblyStatus) -> AssemblyEvent {
        let outcome = AssemblyOutcome {
            text: self.accumulator.clone(),
            status,
        };
        self.outcome = Some(outcome.clone());
        AssemblyEvent::Finished(outcome)
    }
}
