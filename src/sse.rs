//! Server-Sent Events decoding for streaming chat completions.
//!
//! The completions endpoint answers with an event stream of this shape:
//!
//! ```text
//! data: {"choices":[{"delta":{"content":"Hel"}}]}
//!
//! data: {"choices":[{"delta":{"content":"lo"}}]}
//!
//! data: [DONE]
//! ```
//!
//! Decoding happens in three layers:
//!
//! ```text
//! Raw HTTP byte chunks
//!     │
//!     │ LineSplitter::push()      (buffers partial lines across chunks)
//!     ▼
//! Complete lines
//!     │
//!     │ decode_line()             (data: filter, [DONE], JSON delta)
//!     ▼
//! Frame::Delta / Frame::Skip / Frame::Done
//!     │
//!     │ decode_stream()
//!     ▼
//! DeltaStream (Stream<Item = Result<String>>)
//! ```
//!
//! # Frame rules
//!
//! - Lines that do not start with `data:` are ignored (blank separators,
//!   `:` comments, `event:`/`id:` fields).
//! - The payload after `data:` is trimmed. `[DONE]` ends the stream; nothing
//!   after it is read.
//! - Payloads that are not a valid delta chunk are skipped, not fatal. Some
//!   servers send keep-alive frames that are not JSON.
//! - Only non-empty `choices[0].delta.content` values are emitted.
//! - A transport that closes without `[DONE]` is a normal end of stream.

use crate::types::ChatStreamChunk;
use crate::{Error, Result};
use futures::stream::{self, Stream, StreamExt};
use std::collections::VecDeque;
use std::pin::Pin;

/// Payload that marks the end of a completion stream
pub const DONE_SENTINEL: &str = "[DONE]";

/// A pinned, boxed stream of text deltas in arrival order.
///
/// Each item is either a non-empty text fragment or a transport error. The
/// stream ends after `[DONE]` or when the connection closes.
pub type DeltaStream = Pin<Box<dyn Stream<Item = Result<String>> + Send>>;

/// Result of decoding one line of the event stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    /// Nothing to emit for this line
    Skip,
    /// A non-empty text increment
    Delta(String),
    /// The `[DONE]` sentinel
    Done,
}

/// Decode a single event-stream line.
pub fn decode_line(line: &str) -> Frame {
    let Some(payload) = line.strip_prefix("data:") else {
        return Frame::Skip;
    };

    let payload = payload.trim();
    if payload == DONE_SENTINEL {
        return Frame::Done;
    }

    match serde_json::from_str::<ChatStreamChunk>(payload) {
        Ok(chunk) => match chunk.text_delta() {
            Some(text) => Frame::Delta(text.to_string()),
            None => Frame::Skip,
        },
        Err(e) => {
            log::trace!("skipping undecodable stream frame: {}", e);
            Frame::Skip
        }
    }
}

/// Longest line kept while waiting for its terminator
pub const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a byte stream into lines.
///
/// HTTP chunk boundaries fall anywhere, including inside a line or inside a
/// multi-byte UTF-8 sequence, so bytes are buffered until a line ends. `\n`,
/// `\r\n` and a bare `\r` all end a line, including a `\r\n` pair split
/// across two chunks.
///
/// A line longer than the configured maximum is discarded up to its
/// terminator instead of being buffered.
#[derive(Debug)]
pub struct LineSplitter {
    buffer: Vec<u8>,
    max_line: usize,
    /// Last byte seen was `\r`; a leading `\n` belongs to the same terminator
    after_cr: bool,
    overflowed: bool,
}

impl Default for LineSplitter {
    fn default() -> Self {
        Self::with_max_line(MAX_LINE_BYTES)
    }
}

impl LineSplitter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_max_line(max_line: usize) -> Self {
        Self {
            buffer: Vec::new(),
            max_line,
            after_cr: false,
            overflowed: false,
        }
    }

    /// Append a chunk and return every line it completed.
    pub fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        let mut lines = Vec::new();

        for &byte in chunk {
            if std::mem::take(&mut self.after_cr) && byte == b'\n' {
                continue;
            }

            match byte {
                b'\n' => self.end_line(&mut lines),
                b'\r' => {
                    self.end_line(&mut lines);
                    self.after_cr = true;
                }
                _ if self.overflowed => {}
                _ if self.buffer.len() >= self.max_line => {
                    log::warn!(
                        "discarding stream line longer than {} bytes",
                        self.max_line
                    );
                    self.buffer.clear();
                    self.overflowed = true;
                }
                _ => self.buffer.push(byte),
            }
        }

        lines
    }

    /// Return the unterminated tail, if any, once the transport has ended.
    pub fn finish(&mut self) -> Option<String> {
        self.after_cr = false;
        if std::mem::take(&mut self.overflowed) || self.buffer.is_empty() {
            self.buffer.clear();
            None
        } else {
            let rest = std::mem::take(&mut self.buffer);
            Some(String::from_utf8_lossy(&rest).into_owned())
        }
    }

    fn end_line(&mut self, lines: &mut Vec<String>) {
        let line = std::mem::take(&mut self.buffer);
        if !std::mem::take(&mut self.overflowed) {
            lines.push(String::from_utf8_lossy(&line).into_owned());
        }
    }
}

struct DecoderState<S> {
    inner: Pin<Box<S>>,
    lines: LineSplitter,
    pending: VecDeque<String>,
    eof: bool,
}

/// Turn a raw byte stream into a [`DeltaStream`].
///
/// Works on any chunked byte source; the client feeds it
/// `reqwest::Response::bytes_stream()`.
pub fn decode_stream<S, B, E>(bytes: S) -> DeltaStream
where
    S: Stream<Item = std::result::Result<B, E>> + Send + 'static,
    B: AsRef<[u8]> + Send + 'static,
    E: Into<Error> + Send + 'static,
{
    let state = DecoderState {
        inner: Box::pin(bytes),
        lines: LineSplitter::new(),
        pending: VecDeque::new(),
        eof: false,
    };

    let deltas = stream::unfold(Some(state), |state| async move {
        // None means [DONE] was seen or the transport failed
        let mut state = state?;

        loop {
            if let Some(line) = state.pending.pop_front() {
                match decode_line(&line) {
                    Frame::Skip => continue,
                    Frame::Delta(text) => return Some((Ok(text), Some(state))),
                    Frame::Done => {
                        log::debug!("completion stream finished with {}", DONE_SENTINEL);
                        return None;
                    }
                }
            }

            if state.eof {
                log::debug!("completion stream closed without {}", DONE_SENTINEL);
                return None;
            }

            match state.inner.next().await {
                Some(Ok(chunk)) => {
                    let lines = state.lines.push(chunk.as_ref());
                    state.pending.extend(lines);
                }
                Some(Err(e)) => return Some((Err(e.into()), None)),
                None => {
                    state.eof = true;
                    if let Some(rest) = state.lines.finish() {
                        state.pending.push_back(rest);
                    }
                }
            }
        }
    });

    Box::pin(deltas)
}

/// Drive `deltas` to completion, handing each fragment to `on_delta` in order.
///
/// Returns the number of fragments delivered.
pub async fn forward_deltas<F>(mut deltas: DeltaStream, mut on_delta: F) -> Result<usize>
where
    F: FnMut(&str),
{
    let mut delivered = 0;
    while let Some(delta) = deltas.next().await {
        on_delta(&delta?);
        delivered += 1;
    }
    Ok(delivered)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chunked(chunks: Vec<&'static str>) -> DeltaStream {
        decode_stream(stream::iter(chunks.into_iter().map(Ok::<_, Error>)))
    }

    async fn collect(deltas: DeltaStream) -> Vec<String> {
        let mut out = Vec::new();
        forward_deltas(deltas, |d| out.push(d.to_string()))
            .await
            .unwrap();
        out
    }

    #[test]
    fn test_decode_line_filters_non_data() {
        assert_eq!(decode_line(""), Frame::Skip);
        assert_eq!(decode_line(": keep-alive"), Frame::Skip);
        assert_eq!(decode_line("event: message"), Frame::Skip);
        assert_eq!(decode_line("id: 7"), Frame::Skip);
    }

    #[test]
    fn test_decode_line_done_with_and_without_space() {
        assert_eq!(decode_line("data: [DONE]"), Frame::Done);
        assert_eq!(decode_line("data:[DONE]"), Frame::Done);
        assert_eq!(decode_line("data:  [DONE]  "), Frame::Done);
    }

    #[test]
    fn test_decode_line_delta() {
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"content":"Hel"}}]}"#),
            Frame::Delta("Hel".to_string())
        );
        assert_eq!(
            decode_line(r#"data:{"choices":[{"delta":{"content":" lo "}}]}"#),
            Frame::Delta(" lo ".to_string())
        );
    }

    #[test]
    fn test_decode_line_skips_noise() {
        assert_eq!(decode_line("data: not-json"), Frame::Skip);
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{"content":""}}]}"#),
            Frame::Skip
        );
        assert_eq!(
            decode_line(r#"data: {"choices":[{"delta":{}}]}"#),
            Frame::Skip
        );
    }

    #[test]
    fn test_line_splitter_across_chunks() {
        let mut lines = LineSplitter::new();
        assert!(lines.push(b"data: {\"a\"").is_empty());
        assert_eq!(lines.push(b":1}\r\n\r\nda"), vec!["data: {\"a\":1}", ""]);
        assert_eq!(lines.push(b"ta: x\n"), vec!["data: x"]);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_splitter_bare_cr() {
        let mut lines = LineSplitter::new();
        assert_eq!(lines.push(b"data: a\r\rdata: b\r"), vec!["data: a", "", "data: b"]);
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_splitter_crlf_split_across_chunks() {
        let mut lines = LineSplitter::new();
        assert_eq!(lines.push(b"data: a\r"), vec!["data: a"]);
        // The \n completes the same terminator, not a new empty line
        assert_eq!(lines.push(b"\ndata: b\r\n"), vec!["data: b"]);
        assert_eq!(lines.push(b"\r"), vec![""]);
        assert_eq!(lines.push(b"\n\n"), vec![""]);
    }

    #[test]
    fn test_line_splitter_discards_overlong_line() {
        let mut lines = LineSplitter::with_max_line(8);
        assert!(lines.push(b"data: 0123").is_empty());
        assert!(lines.push(b"456789").is_empty());
        assert_eq!(lines.push(b"abc\ndata: ok\n"), vec!["data: ok"]);

        assert!(lines.push(b"data: 0123456789").is_empty());
        assert_eq!(lines.finish(), None);
    }

    #[test]
    fn test_line_splitter_line_at_limit_is_kept() {
        let mut lines = LineSplitter::with_max_line(7);
        assert_eq!(lines.push(b"data: x\n"), vec!["data: x"]);
    }

    #[test]
    fn test_line_splitter_split_utf8() {
        let bytes = "data: héllo\n".as_bytes();
        // 'é' is two bytes; cut between them
        let cut = "data: h".len() + 1;
        let mut lines = LineSplitter::new();
        assert!(lines.push(&bytes[..cut]).is_empty());
        assert_eq!(lines.push(&bytes[cut..]), vec!["data: héllo"]);
    }

    #[test]
    fn test_line_splitter_finish_returns_tail() {
        let mut lines = LineSplitter::new();
        assert!(lines.push(b"data: [DONE]").is_empty());
        assert_eq!(lines.finish().as_deref(), Some("data: [DONE]"));
        assert_eq!(lines.finish(), None);
    }

    #[tokio::test]
    async fn test_deltas_in_order_then_stop_at_done() {
        let deltas = chunked(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\n",
            "data: [DONE]\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ignored\"}}]}\n",
        ]);

        assert_eq!(collect(deltas).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_malformed_frame_does_not_abort() {
        let deltas = chunked(vec![
            "data: not-json\n\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n\n",
            "data: [DONE]\n\n",
        ]);

        assert_eq!(collect(deltas).await, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_empty_content_not_forwarded() {
        let deltas = chunked(vec![
            "data: {\"choices\":[{\"delta\":{\"role\":\"assistant\",\"content\":\"\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"x\"}}]}\n",
        ]);

        let mut calls = 0;
        let delivered = forward_deltas(deltas, |d| {
            assert_eq!(d, "x");
            calls += 1;
        })
        .await
        .unwrap();

        assert_eq!(calls, 1);
        assert_eq!(delivered, 1);
    }

    #[tokio::test]
    async fn test_stream_closed_without_done() {
        let deltas = chunked(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n",
            "data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}",
        ]);

        assert_eq!(collect(deltas).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_frame_split_across_chunks() {
        let deltas = chunked(vec![
            "data: {\"choices\":[{\"del",
            "ta\":{\"content\":\"Hi\"}}]}\r\n\r\ndata: [DO",
            "NE]\r\n\r\n",
        ]);

        assert_eq!(collect(deltas).await, vec!["Hi"]);
    }

    #[tokio::test]
    async fn test_cr_only_line_endings() {
        let deltas = chunked(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"Hel\"}}]}\r\r",
            "data: {\"choices\":[{\"delta\":{\"content\":\"lo\"}}]}\r\r",
            "data: [DONE]\r\r",
        ]);

        assert_eq!(collect(deltas).await, vec!["Hel", "lo"]);
    }

    #[tokio::test]
    async fn test_crlf_split_between_chunks() {
        let deltas = chunked(vec![
            "data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\r",
            "\n\r",
            "\ndata: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\r",
            "\n\r\ndata: [DONE]\r\n",
        ]);

        assert_eq!(collect(deltas).await, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn test_overlong_frame_skipped() {
        let big = format!(
            "data: {{\"choices\":[{{\"delta\":{{\"content\":\"{}\"}}}}]}}\n",
            "x".repeat(MAX_LINE_BYTES)
        );
        let chunks: Vec<std::result::Result<String, Error>> = vec![
            Ok(big),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"ok\"}}]}\n".to_string()),
        ];

        assert_eq!(collect(decode_stream(stream::iter(chunks))).await, vec!["ok"]);
    }

    #[tokio::test]
    async fn test_transport_error_propagates() {
        let chunks: Vec<std::result::Result<&'static str, Error>> = vec![
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"a\"}}]}\n"),
            Err(Error::InvalidResponse),
            Ok("data: {\"choices\":[{\"delta\":{\"content\":\"b\"}}]}\n"),
        ];
        let mut deltas = decode_stream(stream::iter(chunks));

        assert_eq!(deltas.next().await.unwrap().unwrap(), "a");
        assert!(matches!(
            deltas.next().await,
            Some(Err(Error::InvalidResponse))
        ));
        assert!(deltas.next().await.is_none());
    }
}
