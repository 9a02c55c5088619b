//! Event decoding: raw transport bytes to typed agent events
//!
//! The run stream is `text/event-stream`. [`SseParser`] reassembles `data:`
//! payloads from arbitrarily split chunks, and [`decode_frame`] turns each
//! payload into an [`AgentEvent`] or discards it. Keepalive pings and
//! garbled frames are dropped silently; nothing is carried between frames.

use prophet_web_sdk::AgentEvent;

/// Decode one frame, discarding anything that is not a known event
pub fn decode_frame(frame: &str) -> Option<AgentEvent> {
    let event = AgentEvent::decode(frame);
    if event.is_none() {
        tracing::trace!(frame_len = frame.len(), "discarding non-event frame");
    }
    event
}

/// Incremental `text/event-stream` parser.
///
/// Only `data:` fields are kept; `event:`, `id:`, `retry:` and comment lines
/// are ignored. Multi-line data is joined with `\n`, and a blank line ends a
/// frame.
#[derive(Debug, Default)]
pub struct SseParser {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a chunk of the response body; returns every frame it completed
    pub fn feed(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut frames = Vec::new();
        while let Some(line_end) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=line_end).collect();
            let line = String::from_utf8_lossy(&raw);
            let line = line.trim_end_matches(|c| c == '\n' || c == '\r');

            if line.is_empty() {
                if let Some(frame) = self.take_frame() {
                    frames.push(frame);
                }
                continue;
            }
            if line.starts_with(':') {
                continue;
            }

            let (field, value) = match line.split_once(':') {
                Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
                None => (line, ""),
            };
            if field == "data" {
                self.data.push(value.to_string());
            }
        }
        frames
    }

    /// Flush a frame left open when the body ended without a trailing blank line
    pub fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let mut tail = std::mem::take(&mut self.buffer);
            tail.push(b'\n');
            // A complete line is now buffered; feeding it cannot emit a frame
            // because it is not blank.
            let _ = self.feed(&tail);
        }
        self.take_frame()
    }

    fn take_frame(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let frame = self.data.join("\n");
        self.data.clear();
        Some(frame)
    }
}
