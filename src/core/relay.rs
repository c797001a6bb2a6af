//! Streams a generation from the upstream service to a client, chunk by chunk.

use crate::core::error::UpstreamError;
use crate::core::traits::{ByteStream, GenerationRequest, InferenceBackend, StreamChunk, TextSink};
use async_stream::stream;
use futures_util::{Stream, StreamExt};
use log::{debug, warn};
use std::pin::pin;

/// Why a relay stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelayEnd {
    /// Upstream sent a record with `done: true`.
    Done,
    /// The body ended without a `done` record.
    StreamEnded,
    /// Reading the body failed midway.
    ReadError,
    /// The client stopped accepting messages.
    ClientDisconnected,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelayOutcome {
    /// Everything that was forwarded to the client, in order.
    pub full_text: String,
    pub chunks: usize,
    pub end: RelayEnd,
}

/// Relays one streaming generation of `prompt` against `model` into `sink`.
///
/// Only failures to open the stream are returned as errors. Once streaming has begun the
/// outcome always carries whatever text reached the client.
pub async fn relay<B, K>(
    backend: &B,
    model: &str,
    prompt: &str,
    sink: &mut K,
) -> Result<RelayOutcome, UpstreamError>
where
    B: InferenceBackend + ?Sized,
    K: TextSink + ?Sized,
{
    let request = GenerationRequest {
        model: model.to_owned(),
        prompt: prompt.to_owned(),
        stream: true,
    };
    let body = backend.generate_stream(request).await?;
    let mut lines = pin!(ndjson_lines(body));

    let mut outcome = RelayOutcome {
        full_text: String::new(),
        chunks: 0,
        end: RelayEnd::StreamEnded,
    };

    while let Some(line) = lines.next().await {
        let line = match line {
            Ok(line) => line,
            Err(e) => {
                warn!("Error reading Ollama stream: {e}");
                outcome.end = RelayEnd::ReadError;
                break;
            }
        };

        let chunk: StreamChunk = match serde_json::from_str(&line) {
            Ok(chunk) => chunk,
            Err(e) => {
                warn!("Skipping unparsable Ollama stream line: {e}");
                continue;
            }
        };

        if !chunk.text.is_empty() {
            if sink.send_text(&chunk.text).await.is_err() {
                warn!("Client went away, stopping relay");
                outcome.end = RelayEnd::ClientDisconnected;
                break;
            }
            outcome.full_text.push_str(&chunk.text);
            outcome.chunks += 1;
        }

        if chunk.done {
            outcome.end = RelayEnd::Done;
            break;
        }
    }

    debug!(
        "Relay finished after {} chunks ({:?})",
        outcome.chunks, outcome.end
    );
    Ok(outcome)
}

/// Longest stream record kept in memory; anything longer is dropped.
const MAX_LINE_BYTES: usize = 1024 * 1024;

/// Splits a raw body into lines, buffering partial lines across network chunks.
///
/// Splitting happens on bytes so a multi-byte character cut between two chunks survives. Blank
/// lines are dropped and a final line without a trailing newline is still emitted.
pub fn ndjson_lines(body: ByteStream) -> impl Stream<Item = Result<String, UpstreamError>> {
    split_lines(body, MAX_LINE_BYTES)
}

fn split_lines(
    body: ByteStream,
    max_line: usize,
) -> impl Stream<Item = Result<String, UpstreamError>> {
    stream! {
        let mut body = body;
        let mut buffer: Vec<u8> = Vec::new();
        // Bytes of `buffer` already known to hold no newline.
        let mut scanned = 0;
        let mut oversized = false;

        while let Some(chunk) = body.next().await {
            let chunk = match chunk {
                Ok(chunk) => chunk,
                Err(e) => {
                    yield Err(e);
                    return;
                }
            };
            buffer.extend_from_slice(&chunk);

            while let Some(offset) = buffer[scanned..].iter().position(|b| *b == b'\n') {
                let line: Vec<u8> = buffer.drain(..=scanned + offset).collect();
                scanned = 0;
                if oversized {
                    // Tail of a line that was already dropped.
                    oversized = false;
                    continue;
                }
                if let Some(line) = decode_line(&line) {
                    yield Ok(line);
                }
            }
            scanned = buffer.len();

            if buffer.len() > max_line {
                warn!("Dropping Ollama stream line longer than {max_line} bytes");
                buffer.clear();
                scanned = 0;
                oversized = true;
            }
        }

        if !oversized {
            if let Some(line) = decode_line(&buffer) {
                yield Ok(line);
            }
        }
    }
}

/// Invalid UTF-8 is replaced rather than rejected; the JSON decoder decides what to skip.
fn decode_line(raw: &[u8]) -> Option<String> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() {
        None
    } else {
        Some(text.to_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use futures_util::stream;

    fn body(parts: Vec<&'static [u8]>) -> ByteStream {
        let parts: Vec<Result<Bytes, UpstreamError>> = parts
            .into_iter()
            .map(|p| Ok(Bytes::from_static(p)))
            .collect();
        stream::iter(parts).boxed()
    }

    async fn collect(body: ByteStream) -> Vec<Result<String, UpstreamError>> {
        ndjson_lines(body).collect().await
    }

    #[tokio::test]
    async fn test_lines_are_reassembled_across_chunks() {
        let lines = collect(body(vec![&b"{\"a\":"[..], &b"1}\n{\"b\""[..], &b":2}\n"[..]])).await;
        assert_eq!(
            lines,
            vec![Ok("{\"a\":1}".to_string()), Ok("{\"b\":2}".to_string())]
        );
    }

    #[tokio::test]
    async fn test_trailing_line_without_newline_is_emitted() {
        let lines = collect(body(vec![&b"first\nsecond"[..]])).await;
        assert_eq!(lines, vec![Ok("first".to_string()), Ok("second".to_string())]);
    }

    #[tokio::test]
    async fn test_blank_lines_and_crlf_are_ignored() {
        let lines = collect(body(vec![&b"one\r\n\r\n\n"[..], &b"two\r\n"[..]])).await;
        assert_eq!(lines, vec![Ok("one".to_string()), Ok("two".to_string())]);
    }

    #[tokio::test]
    async fn test_multibyte_character_split_between_chunks() {
        let text: &'static [u8] = "h\u{e9}llo\n".as_bytes();
        // Split inside the two-byte 'é'.
        let lines = collect(body(vec![&text[..2], &text[2..]])).await;
        assert_eq!(lines, vec![Ok("h\u{e9}llo".to_string())]);
    }

    #[tokio::test]
    async fn test_read_error_is_yielded_and_ends_lines() {
        let parts: Vec<Result<Bytes, UpstreamError>> = vec![
            Ok(Bytes::from_static(b"ok\n")),
            Err(UpstreamError::Transport("reset".into())),
            Ok(Bytes::from_static(b"never\n")),
        ];
        let lines = collect(stream::iter(parts).boxed()).await;
        assert_eq!(
            lines,
            vec![
                Ok("ok".to_string()),
                Err(UpstreamError::Transport("reset".into()))
            ]
        );
    }

    #[tokio::test]
    async fn test_oversized_line_is_dropped_and_stream_continues() {
        let lines: Vec<_> = split_lines(
            body(vec![
                &b"short\n0123"[..],
                &b"456789"[..],
                &b"abc\nnext\n"[..],
            ]),
            8,
        )
        .collect()
        .await;
        assert_eq!(lines, vec![Ok("short".to_string()), Ok("next".to_string())]);
    }

    #[tokio::test]
    async fn test_oversized_trailing_line_is_not_emitted() {
        let lines: Vec<_> = split_lines(body(vec![&b"ok\n"[..], &b"0123456789"[..]]), 4)
            .collect()
            .await;
        assert_eq!(lines, vec![Ok("ok".to_string())]);
    }

    #[tokio::test]
    async fn test_long_line_in_many_small_chunks() {
        let record = format!("{{\"response\":\"{}\",\"done\":true}}\n", "x".repeat(4096));
        let bytes = Bytes::from(record.clone());
        let parts: Vec<Result<Bytes, UpstreamError>> = (0..bytes.len())
            .step_by(7)
            .map(|i| Ok(bytes.slice(i..(i + 7).min(bytes.len()))))
            .collect();

        let lines = collect(stream::iter(parts).boxed()).await;
        assert_eq!(lines, vec![Ok(record.trim_end().to_string())]);
    }
}
