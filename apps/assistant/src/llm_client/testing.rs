//! Scripted in-memory backend for tests. Records every request it receives
//! and replays scripted results in order.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use bytes::Bytes;

use super::sse::decode_fragments;
use super::{CompletionBackend, CompletionRequest, Fragment, FragmentStream, LlmError};

pub enum StreamScript {
    /// Opens successfully and yields these items in order.
    Items(Vec<Result<Fragment, LlmError>>),
    /// Fails while opening the stream.
    OpenError(LlmError),
    /// Opens without an error but hands back no stream.
    Absent,
    /// Opens successfully and decodes this raw event-stream body.
    Sse(String),
}

/// Stream that yields one fragment per text part, then ends cleanly.
pub fn fragments(parts: &[&str]) -> StreamScript {
    StreamScript::Items(
        parts
            .iter()
            .map(|p| {
                Ok(Fragment {
                    delta: Some(p.to_string()),
                })
            })
            .collect(),
    )
}

/// Stream that yields the given parts, then fails mid-stream.
pub fn fragments_then_error(parts: &[&str], error: LlmError) -> StreamScript {
    let mut items: Vec<Result<Fragment, LlmError>> = parts
        .iter()
        .map(|p| {
            Ok(Fragment {
                delta: Some(p.to_string()),
            })
        })
        .collect();
    items.push(Err(error));
    StreamScript::Items(items)
}

pub fn transport(message: &str) -> LlmError {
    LlmError::Transport(message.to_string())
}

#[derive(Default)]
pub struct ScriptedBackend {
    completions: Mutex<VecDeque<Result<String, LlmError>>>,
    streams: Mutex<VecDeque<StreamScript>>,
    complete_requests: Mutex<Vec<CompletionRequest>>,
    stream_requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_completion(self, result: Result<String, LlmError>) -> Self {
        self.completions.lock().unwrap().push_back(result);
        self
    }

    pub fn with_stream(self, script: StreamScript) -> Self {
        self.streams.lock().unwrap().push_back(script);
        self
    }

    pub fn complete_calls(&self) -> usize {
        self.complete_requests.lock().unwrap().len()
    }

    pub fn stream_calls(&self) -> usize {
        self.stream_requests.lock().unwrap().len()
    }

    pub fn complete_requests(&self) -> Vec<CompletionRequest> {
        self.complete_requests.lock().unwrap().clone()
    }

    pub fn stream_requests(&self) -> Vec<CompletionRequest> {
        self.stream_requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl CompletionBackend for ScriptedBackend {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, LlmError> {
        self.complete_requests.lock().unwrap().push(request.clone());
        self.completions
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(transport("no scripted completion")))
    }

    async fn stream(
        &self,
        request: &CompletionRequest,
    ) -> Result<Option<FragmentStream>, LlmError> {
        self.stream_requests.lock().unwrap().push(request.clone());
        let script = self.streams.lock().unwrap().pop_front();
        match script {
            Some(StreamScript::Items(items)) => {
                let stream: FragmentStream = Box::pin(futures::stream::iter(items));
                Ok(Some(stream))
            }
            Some(StreamScript::OpenError(e)) => Err(e),
            Some(StreamScript::Absent) => Ok(None),
            Some(StreamScript::Sse(body)) => {
                let chunks = futures::stream::iter(vec![Ok(Bytes::from(body))]);
                let stream: FragmentStream = Box::pin(decode_fragments(chunks));
                Ok(Some(stream))
            }
            None => Err(transport("no scripted stream")),
        }
    }
}
