//! SSE decoding for streaming chat completions.
//!
//! Maps an event-per-line byte stream (`data: <json-delta>` lines,
//! terminated by `data: [DONE]` or stream closure) to the
//! provider-agnostic [`StreamEvent`] enum.
//!
//! Malformed individual events are logged and skipped without aborting
//! the stream. A transport failure mid-stream yields exactly one `Err`
//! item and then the stream ends.

use eventsource_stream::Eventsource;
use futures_util::{Stream, StreamExt};

use calmleaf_types::llm::{LlmError, StreamEvent};

use super::wire::StreamChunk;

/// Terminal marker sent as the final `data:` event.
const DONE_MARKER: &str = "[DONE]";

/// Decode an SSE byte stream into [`StreamEvent`]s.
///
/// Reasoning deltas are emitted as distinct events; they never merge into
/// text content. [`StreamEvent::Done`] is emitted on the `[DONE]` marker
/// or natural stream closure.
pub(crate) fn decode_sse<S, B, E>(
    body: S,
) -> impl Stream<Item = Result<StreamEvent, LlmError>> + Send + 'static
where
    S: Stream<Item = Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: std::fmt::Display + std::fmt::Debug + Send + 'static,
{
    async_stream::try_stream! {
        let source = body.eventsource();
        let mut source = std::pin::pin!(source);

        while let Some(event) = source.next().await {
            match event {
                Ok(event) => {
                    let data = event.data.trim();
                    if data == DONE_MARKER {
                        break;
                    }
                    match serde_json::from_str::<StreamChunk>(data) {
                        Ok(chunk) => {
                            for choice in chunk.choices {
                                if let Some(text) = choice.delta.reasoning_content {
                                    if !text.is_empty() {
                                        yield StreamEvent::ReasoningDelta { text };
                                    }
                                }
                                if let Some(text) = choice.delta.content {
                                    if !text.is_empty() {
                                        yield StreamEvent::TextDelta { text };
                                    }
                                }
                            }
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "skipping malformed stream event");
                        }
                    }
                }
                Err(e) => {
                    Err(LlmError::Stream(e.to_string()))?;
                }
            }
        }

        yield StreamEvent::Done;
    }
}
