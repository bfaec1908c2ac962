//! Incremental `text/event-stream` decoder.
//!
//! Chunks from the HTTP body can split lines (and UTF-8 sequences) at any
//! byte, so the decoder buffers raw bytes and only interprets complete lines.

use std::collections::VecDeque;

use bytes::{Bytes, BytesMut};
use futures::stream::{self, BoxStream, Stream, StreamExt};

use crate::error::TransportError;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

impl SseFrame {
    /// Frames without an explicit event name (or named `message`) are the ones
    /// a browser would hand to `onmessage`.
    pub fn is_message(&self) -> bool {
        matches!(self.event.as_deref(), None | Some("message"))
    }
}

#[derive(Debug, Default)]
pub struct SseDecoder {
    buf: BytesMut,
    // bytes of `buf` already known to hold no newline
    scanned: usize,
    data: String,
    has_data: bool,
    event: Option<String>,
    last_id: Option<String>,
}

impl SseDecoder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed a body chunk and return every frame it completed.
    ///
    /// Fails once a single line grows past
    /// [`manimatic_config::MAX_EVENT_LINE_BYTES`] without a terminator.
    pub fn push(&mut self, chunk: &[u8]) -> Result<Vec<SseFrame>, TransportError> {
        self.buf.extend_from_slice(chunk);
        let mut frames = Vec::new();

        while let Some(offset) = self.buf[self.scanned..].iter().position(|b| *b == b'\n') {
            let pos = self.scanned + offset;
            self.scanned = 0;
            let raw = self.buf.split_to(pos + 1);
            let mut line = &raw[..pos];
            if line.last() == Some(&b'\r') {
                line = &line[..line.len() - 1];
            }
            let line = String::from_utf8_lossy(line);
            if let Some(frame) = self.process_line(&line) {
                frames.push(frame);
            }
        }

        self.scanned = self.buf.len();
        if self.buf.len() > manimatic_config::MAX_EVENT_LINE_BYTES {
            return Err(TransportError::LineTooLong(self.buf.len()));
        }
        Ok(frames)
    }

    fn process_line(&mut self, line: &str) -> Option<SseFrame> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            // comment / keep-alive
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((f, v)) => (f, v.strip_prefix(' ').unwrap_or(v)),
            None => (line, ""),
        };

        match field {
            "data" => {
                if self.has_data {
                    self.data.push('\n');
                }
                self.data.push_str(value);
                self.has_data = true;
            }
            "event" => self.event = Some(value.to_string()),
            "id" if !value.contains('\0') => self.last_id = Some(value.to_string()),
            _ => {}
        }
        None
    }

    fn dispatch(&mut self) -> Option<SseFrame> {
        if !self.has_data {
            self.event = None;
            return None;
        }
        self.has_data = false;
        Some(SseFrame {
            event: self.event.take(),
            data: std::mem::take(&mut self.data),
            id: self.last_id.clone(),
        })
    }
}

pub type SseStream = BoxStream<'static, Result<SseFrame, TransportError>>;

/// Turn a byte stream into a stream of frames.
///
/// The stream ends with exactly one `Err`: the body error, an oversized line,
/// or [`TransportError::Closed`] when the server finished the response. A push
/// channel has no legitimate end, so both are failures for the caller.
pub fn frames<S, E>(body: S) -> SseStream
where
    S: Stream<Item = Result<Bytes, E>> + Send + 'static,
    E: std::fmt::Display + Send + 'static,
{
    struct State<S> {
        body: std::pin::Pin<Box<S>>,
        decoder: SseDecoder,
        pending: VecDeque<SseFrame>,
        done: bool,
    }

    let init = State {
        body: Box::pin(body),
        decoder: SseDecoder::new(),
        pending: VecDeque::new(),
        done: false,
    };

    stream::unfold(init, |mut st| async move {
        loop {
            if let Some(frame) = st.pending.pop_front() {
                return Some((Ok(frame), st));
            }
            if st.done {
                return None;
            }
            match st.body.next().await {
                Some(Ok(chunk)) => match st.decoder.push(&chunk) {
                    Ok(frames) => st.pending.extend(frames),
                    Err(e) => {
                        st.done = true;
                        return Some((Err(e), st));
                    }
                },
                Some(Err(e)) => {
                    st.done = true;
                    return Some((Err(TransportError::Stream(e.to_string())), st));
                }
                None => {
                    st.done = true;
                    return Some((Err(TransportError::Closed), st));
                }
            }
        }
    })
    .boxed()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_frames_across_chunks() {
        let mut dec = SseDecoder::new();
        assert!(dec.push(b"data: {\"a\"").unwrap().is_empty());
        assert!(dec.push(b":1}\n").unwrap().is_empty());
        let frames = dec.push(b"\ndata: second\n\n").unwrap();
        assert_eq!(frames.len(), 2);
        assert_eq!(frames[0].data, "{\"a\":1}");
        assert_eq!(frames[1].data, "second");
        assert!(frames[0].is_message());
    }

    #[test]
    fn joins_multiline_data_and_honours_crlf() {
        let mut dec = SseDecoder::new();
        let frames = dec.push(b"event: ping\r\ndata: one\r\ndata:two\r\n\r\n").unwrap();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, "one\ntwo");
        assert_eq!(frames[0].event.as_deref(), Some("ping"));
        assert!(!frames[0].is_message());
    }

    #[test]
    fn comments_and_empty_blocks_produce_nothing() {
        let mut dec = SseDecoder::new();
        assert!(dec.push(b": keep-alive\n\n\n").unwrap().is_empty());
        let frames = dec.push(b"id: 7\ndata: x\n\n").unwrap();
        assert_eq!(frames[0].id.as_deref(), Some("7"));
    }

    #[test]
    fn long_line_fed_byte_by_byte_decodes_once() {
        let mut dec = SseDecoder::new();
        let payload = "x".repeat(10_000);
        let body = format!("data: {payload}\n\n");
        let mut frames = Vec::new();
        for b in body.as_bytes() {
            frames.extend(dec.push(std::slice::from_ref(b)).unwrap());
        }
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data, payload);
    }

    #[test]
    fn unterminated_line_over_the_cap_fails() {
        let mut dec = SseDecoder::new();
        let chunk = vec![b'x'; 64 * 1024];
        let mut pushed = 0;
        let err = loop {
            match dec.push(&chunk) {
                Ok(frames) => assert!(frames.is_empty()),
                Err(e) => break e,
            }
            pushed += chunk.len();
            assert!(pushed <= manimatic_config::MAX_EVENT_LINE_BYTES);
        };
        assert!(matches!(err, TransportError::LineTooLong(n) if n > manimatic_config::MAX_EVENT_LINE_BYTES));
    }

    #[tokio::test]
    async fn frames_end_with_the_oversized_line_error() {
        let big = Bytes::from(vec![b'x'; manimatic_config::MAX_EVENT_LINE_BYTES + 1]);
        let body = stream::iter(vec![
            Ok::<_, std::io::Error>(Bytes::from_static(b"data: ok\n\n")),
            Ok(big),
            Ok(Bytes::from_static(b"\n\n")),
        ]);
        let items: Vec<_> = frames(body).collect().await;
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].as_ref().map(|f| f.data.as_str()), Ok("ok"));
        assert!(matches!(items[1], Err(TransportError::LineTooLong(_))));
    }
}
