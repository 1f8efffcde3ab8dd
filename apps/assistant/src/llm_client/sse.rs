//! Decodes the server-sent-event body of a streaming chat completion into fragments.
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```

use std::collections::VecDeque;
use std::pin::Pin;

use bytes::Bytes;
use futures::{Stream, StreamExt};
use serde::Deserialize;

use super::{Fragment, LlmError};

#[derive(Debug, Deserialize)]
struct ChunkEvent {
    #[serde(default)]
    choices: Vec<ChunkChoice>,
    #[serde(default)]
    error: Option<ChunkError>,
}

/// In-band failure sent as a `data:` event before the server closes the stream.
#[derive(Debug, Deserialize)]
struct ChunkError {
    #[serde(default)]
    message: String,
}

#[derive(Debug, Deserialize)]
struct ChunkChoice {
    #[serde(default)]
    delta: Option<ChunkDelta>,
}

#[derive(Debug, Deserialize)]
struct ChunkDelta {
    #[serde(default)]
    content: Option<String>,
}

struct DecoderState {
    inner: Pin<Box<dyn Stream<Item = Result<Bytes, LlmError>> + Send>>,
    // Raw bytes so a multi-byte character split across chunks survives.
    buffer: Vec<u8>,
    pending: VecDeque<Result<Fragment, LlmError>>,
    finished: bool,
}

impl DecoderState {
    fn drain_lines(&mut self) {
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            if let Some(item) = parse_line(&String::from_utf8_lossy(&line)) {
                self.pending.push_back(item);
            }
        }
    }
}

/// Turns a raw byte stream into a stream of fragments.
///
/// The first transport error is yielded and ends the stream; nothing is
/// resumed after it.
pub fn decode_fragments<S>(byte_stream: S) -> impl Stream<Item = Result<Fragment, LlmError>> + Send
where
    S: Stream<Item = Result<Bytes, LlmError>> + Send + 'static,
{
    let state = DecoderState {
        inner: Box::pin(byte_stream),
        buffer: Vec::new(),
        pending: VecDeque::new(),
        finished: false,
    };

    futures::stream::unfold(state, |mut state| async move {
        loop {
            if let Some(item) = state.pending.pop_front() {
                return Some((item, state));
            }
            if state.finished {
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    state.buffer.extend_from_slice(&chunk);
                    state.drain_lines();
                }
                Some(Err(e)) => {
                    state.finished = true;
                    return Some((Err(e), state));
                }
                None => {
                    state.finished = true;
                    let rest = std::mem::take(&mut state.buffer);
                    if let Some(item) = parse_line(&String::from_utf8_lossy(&rest)) {
                        state.pending.push_back(item);
                    }
                }
            }
        }
    })
}

/// Parses one SSE line.
///
/// Returns `None` for blank lines, comments, `[DONE]` and non-data fields.
/// An `error` event becomes `LlmError::Stream`.
fn parse_line(line: &str) -> Option<Result<Fragment, LlmError>> {
    let trimmed = line.trim();
    if trimmed.is_empty() || trimmed.starts_with(':') {
        return None;
    }

    let data = trimmed.strip_prefix("data:")?.trim_start();
    if data == "[DONE]" {
        return None;
    }

    match serde_json::from_str::<ChunkEvent>(data) {
        Ok(ChunkEvent {
            error: Some(error), ..
        }) => Some(Err(LlmError::Stream(error.message))),
        Ok(event) => Some(Ok(Fragment {
            delta: event
                .choices
                .into_iter()
                .next()
                .and_then(|c| c.delta)
                .and_then(|d| d.content),
        })),
        Err(e) => Some(Err(LlmError::Parse(e))),
    }
}
