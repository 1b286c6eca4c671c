//! Replay a finished chat completion as a sequence of streaming chunks.
//!
//! The upstream is never asked to stream, so by the time a streaming client gets its
//! first byte the whole answer is already known. The [`StreamEmulator`] slices the
//! answer into fixed-size windows and emits one `chat.completion.chunk` per window,
//! pausing briefly between them, then a terminal chunk and the `[DONE]` sentinel.
//!
//! Dropping the stream (which axum does when the client goes away) stops emission at
//! the next suspension point; nothing is written after that.

use std::time::Duration;

use futures::stream::Stream;

use super::openai_types::{ChatCompletionChunk, ChatCompletionResponse, ChunkChoice, ChunkDelta};
use super::response::new_completion_id;

pub const DEFAULT_CHUNK_CHARS: usize = 40;
pub const DEFAULT_CHUNK_DELAY: Duration = Duration::from_millis(10);

/// End-of-stream marker sent as the final `data:` payload.
pub const DONE_SENTINEL: &str = "[DONE]";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StreamSettings {
    /// Window size in characters (Unicode scalar values).
    pub chunk_chars: usize,
    pub chunk_delay: Duration,
}

impl Default for StreamSettings {
    fn default() -> Self {
        Self {
            chunk_chars: DEFAULT_CHUNK_CHARS,
            chunk_delay: DEFAULT_CHUNK_DELAY,
        }
    }
}

/// One server-sent event payload.
#[derive(Debug, Clone)]
pub enum StreamFrame {
    Chunk(ChatCompletionChunk),
    Done,
}

impl StreamFrame {
    /// The `data:` payload for this frame.
    pub fn data(&self) -> String {
        match self {
            StreamFrame::Chunk(chunk) => {
                serde_json::to_string(chunk).unwrap_or_else(|_| "{}".to_string())
            }
            StreamFrame::Done => DONE_SENTINEL.to_string(),
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, StreamFrame::Done)
    }
}

/// Turns a complete response into its chunked replay.
///
/// Usage:
///   let emulator = StreamEmulator::new(&response, "gpt-4o", settings);
///   let frames = emulator.into_stream();
///   // send each frame as `data: {frame.data()}`
#[derive(Debug)]
pub struct StreamEmulator {
    id: String,
    created: i64,
    model: String,
    windows: Vec<String>,
    delay: Duration,
}

impl StreamEmulator {
    pub fn new(resp: &ChatCompletionResponse, requested_model: &str, settings: StreamSettings) -> Self {
        let content = resp
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .unwrap_or("");

        let id = if resp.id.is_empty() {
            new_completion_id()
        } else {
            resp.id.clone()
        };

        let created = if resp.created > 0 {
            resp.created
        } else {
            chrono::Utc::now().timestamp()
        };

        let model = if requested_model.is_empty() {
            resp.model.clone()
        } else {
            requested_model.to_string()
        };

        Self {
            id,
            created,
            model,
            windows: split_windows(content, settings.chunk_chars),
            delay: settings.chunk_delay,
        }
    }

    /// Number of content-bearing chunks this replay will emit.
    pub fn content_chunks(&self) -> usize {
        self.windows.len()
    }

    /// Every frame in emission order, without pacing.
    pub fn frames(&self) -> Vec<StreamFrame> {
        let mut frames: Vec<StreamFrame> = self
            .windows
            .iter()
            .map(|w| StreamFrame::Chunk(self.content_chunk(w)))
            .collect();
        frames.push(StreamFrame::Chunk(self.finish_chunk()));
        frames.push(StreamFrame::Done);
        frames
    }

    /// Paced replay: a short sleep follows every content chunk.
    pub fn into_stream(self) -> impl Stream<Item = StreamFrame> + Send + 'static {
        async_stream::stream! {
            for window in &self.windows {
                yield StreamFrame::Chunk(self.content_chunk(window));
                if !self.delay.is_zero() {
                    tokio::time::sleep(self.delay).await;
                }
            }
            yield StreamFrame::Chunk(self.finish_chunk());
            yield StreamFrame::Done;
        }
    }

    fn content_chunk(&self, window: &str) -> ChatCompletionChunk {
        self.chunk(
            ChunkDelta {
                content: Some(window.to_string()),
            },
            None,
        )
    }

    fn finish_chunk(&self) -> ChatCompletionChunk {
        self.chunk(ChunkDelta::default(), Some("stop".to_string()))
    }

    fn chunk(&self, delta: ChunkDelta, finish_reason: Option<String>) -> ChatCompletionChunk {
        ChatCompletionChunk {
            id: self.id.clone(),
            object: "chat.completion.chunk".to_string(),
            created: self.created,
            model: self.model.clone(),
            choices: vec![ChunkChoice {
                index: 0,
                delta,
                finish_reason,
            }],
        }
    }
}

fn split_windows(text: &str, size: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars
        .chunks(size.max(1))
        .map(|w| w.iter().collect())
        .collect()
}
