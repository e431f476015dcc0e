//! Incremental decoder for streamed chat-completion bodies.
//!
//! The body is a sequence of newline-terminated records, each optionally
//! prefixed with `data:` and carrying one JSON object. There are no `event:`
//! lines and no required terminator record: the stream ends when the
//! transport closes. Chunks may split a record anywhere, including inside a
//! multi-byte character, so pending input is kept as bytes until a full line
//! is available.

use std::collections::VecDeque;

use futures::{Stream, StreamExt};
use serde_json::Value;

use crate::llm::traits::Usage;

const DATA_PREFIX: &str = "data:";
const DONE_SENTINEL: &str = "[DONE]";

/// Final result of one response cycle.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledResponse {
    pub text: String,
    pub usage: Option<Usage>,
}

/// One item of the lazy event sequence produced by [`into_events`].
#[derive(Debug, Clone, PartialEq)]
pub enum DecodeEvent {
    Delta { text: String, assembled: String },
    Complete(AssembledResponse),
}

/// Line-framing state machine for a single streamed response.
///
/// Feed it raw chunks in arrival order with [`feed`](Self::feed); every
/// non-empty `choices[0].delta.content` is appended to the assembled text and
/// handed to the callback before the next line is looked at. Call
/// [`finish`](Self::finish) once the transport signals end of stream.
#[derive(Debug, Default)]
pub struct StreamingChatDecoder {
    pending: Vec<u8>,
    // Prefix of `pending` already known to hold no newline.
    scanned: usize,
    assembled: String,
    usage: Option<Usage>,
}

impl StreamingChatDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Text assembled so far.
    pub fn assembled(&self) -> &str {
        &self.assembled
    }

    /// Bytes received after the last newline.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    pub fn feed<F>(&mut self, chunk: &[u8], mut on_delta: F)
    where
        F: FnMut(&str, &str),
    {
        self.pending.extend_from_slice(chunk);

        let mut start = 0;
        let mut search_from = self.scanned;
        while let Some(offset) = self.pending[search_from..].iter().position(|&b| b == b'\n') {
            let end = search_from + offset;
            let line = String::from_utf8_lossy(&self.pending[start..end]).into_owned();
            start = end + 1;
            search_from = start;
            self.process_line(&line, &mut on_delta);
        }
        self.pending.drain(..start);
        self.scanned = self.pending.len();
    }

    /// Flush the unterminated tail as a last record and return the result.
    pub fn finish<F>(mut self, mut on_delta: F) -> AssembledResponse
    where
        F: FnMut(&str, &str),
    {
        if !self.pending.is_empty() {
            let tail = std::mem::take(&mut self.pending);
            let line = String::from_utf8_lossy(&tail).into_owned();
            self.process_line(&line, &mut on_delta);
        }
        AssembledResponse {
            text: self.assembled,
            usage: self.usage,
        }
    }

    fn process_line<F>(&mut self, line: &str, on_delta: &mut F)
    where
        F: FnMut(&str, &str),
    {
        let line = line.trim();
        if line.is_empty() {
            return;
        }
        let payload = line.strip_prefix(DATA_PREFIX).unwrap_or(line).trim();
        if payload.is_empty() {
            return;
        }
        if payload == DONE_SENTINEL {
            tracing::debug!("stream sent done sentinel");
            return;
        }

        let record: Value = match serde_json::from_str(payload) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!(error = %e, record = payload, "skipping malformed stream record");
                return;
            }
        };

        // With include_usage the last record carries totals and no choices.
        if let Some(usage) = record
            .get("usage")
            .and_then(|u| serde_json::from_value::<Usage>(u.clone()).ok())
        {
            self.usage = Some(usage);
        }

        let content = record
            .get("choices")
            .and_then(|c| c.as_array())
            .and_then(|choices| choices.first())
            .and_then(|choice| choice.get("delta"))
            .and_then(|delta| delta.get("content"))
            .and_then(|content| content.as_str());

        if let Some(delta) = content.filter(|c| !c.is_empty()) {
            self.assembled.push_str(delta);
            on_delta(delta, &self.assembled);
        }
    }
}

/// Drive a decoder over a byte stream, calling `on_delta` for every delta.
///
/// A transport error ends decoding and is returned as-is; no partially
/// assembled text is handed back in that case.
pub async fn decode_stream<S, B, E, F>(mut stream: S, mut on_delta: F) -> Result<AssembledResponse, E>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
    F: FnMut(&str, &str),
{
    let mut decoder = StreamingChatDecoder::new();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk?;
        decoder.feed(chunk.as_ref(), &mut on_delta);
    }
    Ok(decoder.finish(&mut on_delta))
}

struct EventState<S> {
    inner: S,
    decoder: Option<StreamingChatDecoder>,
    queued: VecDeque<DecodeEvent>,
}

/// Turn a byte stream into a lazy, single-pass stream of decode events.
///
/// Yields `Delta` for every content fragment and a final `Complete` when the
/// source ends. A transport error is yielded once and ends the sequence.
pub fn into_events<S, B, E>(stream: S) -> impl Stream<Item = Result<DecodeEvent, E>>
where
    S: Stream<Item = Result<B, E>> + Unpin,
    B: AsRef<[u8]>,
{
    let state = EventState {
        inner: stream,
        decoder: Some(StreamingChatDecoder::new()),
        queued: VecDeque::new(),
    };

    futures::stream::unfold(state, |mut st| async move {
        loop {
            if let Some(event) = st.queued.pop_front() {
                return Some((Ok(event), st));
            }
            let Some(decoder) = st.decoder.as_mut() else {
                return None;
            };
            match st.inner.next().await {
                Some(Ok(chunk)) => {
                    let queued = &mut st.queued;
                    decoder.feed(chunk.as_ref(), |text, assembled| {
                        queued.push_back(DecodeEvent::Delta {
                            text: text.to_string(),
                            assembled: assembled.to_string(),
                        });
                    });
                }
                Some(Err(e)) => {
                    st.decoder = None;
                    return Some((Err(e), st));
                }
                None => {
                    let Some(decoder) = st.decoder.take() else {
                        return None;
                    };
                    let queued = &mut st.queued;
                    let response = decoder.finish(|text, assembled| {
                        queued.push_back(DecodeEvent::Delta {
                            text: text.to_string(),
                            assembled: assembled.to_string(),
                        });
                    });
                    queued.push_back(DecodeEvent::Complete(response));
                }
            }
        }
    })
}
