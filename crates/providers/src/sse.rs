//! Shared plumbing for OpenAI-style streaming responses.
//!
//! Both adapters speak `text/event-stream` with `data: {...}` frames and a
//! `data: [DONE]` terminator. This module owns status mapping, line
//! buffering, and the reader task that feeds a [`TokenStream`].

use futures::StreamExt;
use streamgate_core::error::ProviderError;
use streamgate_core::provider::TokenStream;
use tracing::{debug, trace, warn};

/// Upstream error bodies are cut to this many characters before they reach
/// a client. The full body is logged.
pub const MAX_ERROR_BODY_CHARS: usize = 200;

/// One decoded SSE frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SseFrame {
    /// Payload of a `data:` line.
    Data(String),
    /// `data: [DONE]`
    Done,
}

/// Incremental line decoder. Bytes are buffered until a full line arrives, so
/// UTF-8 sequences split across network chunks survive intact.
#[derive(Debug, Default)]
pub struct SseDecoder {
    buffer: Vec<u8>,
}

impl SseDecoder {
    /// Feed raw bytes; returns every complete frame they finish.
    pub fn push(&mut self, bytes: &[u8]) -> Vec<SseFrame> {
        self.buffer.extend_from_slice(bytes);
        let mut frames = Vec::new();

        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=line_end).collect();
            if let Some(frame) = Self::decode_line(&line) {
                frames.push(frame);
            }
        }

        frames
    }

    /// Flush a final line that arrived without a trailing newline.
    pub fn finish(&mut self) -> Option<SseFrame> {
        let rest = std::mem::take(&mut self.buffer);
        Self::decode_line(&rest)
    }

    fn decode_line(raw: &[u8]) -> Option<SseFrame> {
        let line = String::from_utf8_lossy(raw);
        let line = line.trim_end_matches(['\n', '\r']);

        // Skip empty lines, SSE comments and non-data fields
        if line.is_empty() || line.starts_with(':') {
            return None;
        }
        let data = line.strip_prefix("data:")?.trim();

        if data == "[DONE]" {
            Some(SseFrame::Done)
        } else if data.is_empty() {
            None
        } else {
            Some(SseFrame::Data(data.to_string()))
        }
    }
}

/// What an adapter made of one `data:` payload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Piece {
    Token(String),
    Skip,
    /// Upstream reported an error inside the stream.
    Failed(String),
}

/// Map a non-success HTTP status to a [`ProviderError`].
pub async fn check_status(response: reqwest::Response) -> Result<reqwest::Response, ProviderError> {
    let status = response.status().as_u16();

    if response.status().is_success() {
        return Ok(response);
    }

    if status == 429 {
        let retry_after_secs = response
            .headers()
            .get("retry-after")
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.trim().parse().ok())
            .unwrap_or(5);
        return Err(ProviderError::RateLimited { retry_after_secs });
    }

    if status == 401 || status == 403 {
        return Err(ProviderError::AuthenticationFailed(
            "Invalid API key or insufficient permissions".into(),
        ));
    }

    let error_body = response.text().await.unwrap_or_default();
    warn!(status, body = %error_body, "Provider returned error");
    Err(ProviderError::ApiError {
        status_code: status,
        message: truncate_body(&error_body),
    })
}

/// Shorten an upstream error body for display, on a char boundary.
pub fn truncate_body(body: &str) -> String {
    let body = body.trim();
    match body.char_indices().nth(MAX_ERROR_BODY_CHARS) {
        Some((cut, _)) => format!("{}...", &body[..cut]),
        None => body.to_string(),
    }
}

/// Convert a `reqwest` send failure.
pub fn send_error(e: reqwest::Error) -> ProviderError {
    ProviderError::transport(e.to_string(), e.is_timeout())
}

/// Spawn the reader task for a successful streaming response.
///
/// The task ends on `[DONE]`, on end of body, on the first error, or as soon
/// as the receiver is dropped. Dropping the task drops the HTTP response.
///
/// A body that ends without a single recognizable frame is reported as an
/// `ApiError`; one that ends after frames but before `[DONE]` as
/// `StreamInterrupted`.
pub fn spawn_reader<F>(response: reqwest::Response, provider: &'static str, parse: F) -> TokenStream
where
    F: Fn(&str) -> Result<Piece, serde_json::Error> + Send + 'static,
{
    let (tx, rx) = tokio::sync::mpsc::channel(64);
    let status_code = response.status().as_u16();

    tokio::spawn(async move {
        let mut byte_stream = response.bytes_stream();
        let mut decoder = SseDecoder::default();
        let mut tokens = 0usize;
        let mut recognized = 0usize;

        loop {
            let next = tokio::select! {
                _ = tx.closed() => {
                    debug!(provider, "Token receiver dropped, closing upstream stream");
                    return;
                }
                next = byte_stream.next() => next,
            };

            let (frames, body_ended) = match next {
                Some(Ok(bytes)) => (decoder.push(&bytes), false),
                Some(Err(e)) => {
                    let _ = tx
                        .send(Err(ProviderError::StreamInterrupted(e.to_string())))
                        .await;
                    return;
                }
                None => (decoder.finish().into_iter().collect(), true),
            };

            for frame in frames {
                let data = match frame {
                    SseFrame::Done => {
                        debug!(provider, tokens, "Upstream stream finished");
                        return;
                    }
                    SseFrame::Data(data) => data,
                };

                let piece = parse(&data);
                if piece.is_ok() {
                    recognized += 1;
                }
                match piece {
                    Ok(Piece::Token(token)) => {
                        if token.is_empty() {
                            continue;
                        }
                        tokens += 1;
                        if tx.send(Ok(token)).await.is_err() {
                            debug!(provider, "Token receiver dropped, closing upstream stream");
                            return;
                        }
                    }
                    Ok(Piece::Skip) => {}
                    Ok(Piece::Failed(message)) => {
                        let _ = tx
                            .send(Err(ProviderError::ApiError {
                                status_code,
                                message: truncate_body(&message),
                            }))
                            .await;
                        return;
                    }
                    Err(e) => {
                        trace!(provider, data = %data, error = %e, "Ignoring unparseable SSE chunk");
                    }
                }
            }

            if body_ended {
                let error = if recognized == 0 {
                    warn!(provider, status_code, "Upstream body held no stream frames");
                    ProviderError::ApiError {
                        status_code,
                        message: "malformed upstream response".into(),
                    }
                } else {
                    warn!(provider, tokens, "Upstream body ended without [DONE]");
                    ProviderError::StreamInterrupted("upstream body ended without [DONE]".into())
                };
                let _ = tx.send(Err(error)).await;
                return;
            }
        }
    });

    rx
}
