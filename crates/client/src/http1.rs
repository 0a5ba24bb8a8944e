//! Minimal HTTP/1.1 framing for a single request/response over one connection

use std::io;

const HEAD_END: &[u8] = b"\r\n\r\n";
const CRLF: &[u8] = b"\r\n";

/// Serialize a POST. `Host` and `Connection: close` are added unless the
/// caller already supplied them.
pub(crate) fn request_bytes(
    host: &str,
    port: u16,
    path: &str,
    headers: &[String],
    body: &[u8],
) -> Vec<u8> {
    let has = |name: &str| headers.iter().any(|h| header_name_is(h, name));

    let mut head = format!("POST {path} HTTP/1.1\r\n");
    if !has("host") {
        head.push_str(&format!("Host: {host}:{port}\r\n"));
    }
    for header in headers {
        head.push_str(header);
        head.push_str("\r\n");
    }
    if !has("connection") {
        head.push_str("Connection: close\r\n");
    }
    head.push_str("\r\n");

    let mut out = head.into_bytes();
    out.extend_from_slice(body);
    out
}

fn header_name_is(line: &str, name: &str) -> bool {
    line.split_once(':')
        .is_some_and(|(key, _)| key.trim().eq_ignore_ascii_case(name))
}

/// Offset of the blank line ending the response head
pub(crate) fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(HEAD_END.len()).position(|w| w == HEAD_END)
}

fn find_crlf(buf: &[u8]) -> Option<usize> {
    buf.windows(CRLF.len()).position(|w| w == CRLF)
}

fn invalid(msg: impl Into<String>) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.into())
}

/// Status line and headers of a response
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ResponseHead {
    pub code: u16,
    pub headers: Vec<String>,
}

impl ResponseHead {
    /// Parse the bytes before the blank line
    pub fn parse(raw: &[u8]) -> io::Result<Self> {
        let text = String::from_utf8_lossy(raw);
        let mut lines = text.split("\r\n");
        let status_line = lines.next().unwrap_or_default();

        let mut parts = status_line.split_whitespace();
        let version = parts.next().unwrap_or_default();
        if !version.starts_with("HTTP/") {
            return Err(invalid(format!("malformed status line: {status_line}")));
        }
        let code = parts
            .next()
            .and_then(|c| c.parse::<u16>().ok())
            .ok_or_else(|| invalid(format!("malformed status line: {status_line}")))?;

        let headers = lines
            .filter(|line| !line.is_empty())
            .map(str::to_string)
            .collect();
        Ok(Self { code, headers })
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.iter().find_map(|line| {
            let (key, value) = line.split_once(':')?;
            key.trim()
                .eq_ignore_ascii_case(name)
                .then_some(value.trim())
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChunkState {
    Size,
    Data(usize),
    DataEnd,
    Trailers,
    Done,
}

/// Incremental `Transfer-Encoding: chunked` decoder
#[derive(Debug)]
pub(crate) struct ChunkedDecoder {
    state: ChunkState,
    buf: Vec<u8>,
}

impl ChunkedDecoder {
    fn new() -> Self {
        Self {
            state: ChunkState::Size,
            buf: Vec::new(),
        }
    }

    fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        self.buf.extend_from_slice(input);
        let mut pos = 0;

        loop {
            let pending = &self.buf[pos..];
            match self.state {
                ChunkState::Size => {
                    let Some(end) = find_crlf(pending) else { break };
                    let line = String::from_utf8_lossy(&pending[..end]);
                    let digits = line.split(';').next().unwrap_or_default().trim();
                    let size = usize::from_str_radix(digits, 16)
                        .map_err(|_| invalid(format!("bad chunk size: {digits}")))?;
                    pos += end + CRLF.len();
                    self.state = if size == 0 {
                        ChunkState::Trailers
                    } else {
                        ChunkState::Data(size)
                    };
                }
                ChunkState::Data(remaining) => {
                    if pending.is_empty() {
                        break;
                    }
                    let take = remaining.min(pending.len());
                    out.extend_from_slice(&pending[..take]);
                    pos += take;
                    self.state = if take == remaining {
                        ChunkState::DataEnd
                    } else {
                        ChunkState::Data(remaining - take)
                    };
                }
                ChunkState::DataEnd => {
                    if pending.len() < CRLF.len() {
                        break;
                    }
                    pos += CRLF.len();
                    self.state = ChunkState::Size;
                }
                ChunkState::Trailers => {
                    let Some(end) = find_crlf(pending) else { break };
                    pos += end + CRLF.len();
                    if end == 0 {
                        self.state = ChunkState::Done;
                    }
                }
                ChunkState::Done => break,
            }
        }

        self.buf.drain(..pos);
        Ok(())
    }
}

/// How the end of the body is recognized
#[derive(Debug)]
pub(crate) enum BodyDecoder {
    Length { remaining: usize },
    Chunked(ChunkedDecoder),
    UntilClose,
}

impl BodyDecoder {
    pub fn for_head(head: &ResponseHead) -> io::Result<Self> {
        if matches!(head.code, 100..=199 | 204 | 304) {
            return Ok(Self::Length { remaining: 0 });
        }
        if head
            .header("transfer-encoding")
            .is_some_and(|v| v.to_ascii_lowercase().contains("chunked"))
        {
            return Ok(Self::Chunked(ChunkedDecoder::new()));
        }
        match head.header("content-length") {
            Some(value) => value
                .parse()
                .map(|remaining| Self::Length { remaining })
                .map_err(|_| invalid(format!("bad Content-Length: {value}"))),
            None => Ok(Self::UntilClose),
        }
    }

    /// Append decoded body bytes from `input` to `out`
    pub fn feed(&mut self, input: &[u8], out: &mut Vec<u8>) -> io::Result<()> {
        match self {
            Self::Length { remaining } => {
                let take = (*remaining).min(input.len());
                out.extend_from_slice(&input[..take]);
                *remaining -= take;
                Ok(())
            }
            Self::Chunked(decoder) => decoder.feed(input, out),
            Self::UntilClose => {
                out.extend_from_slice(input);
                Ok(())
            }
        }
    }

    pub fn is_complete(&self) -> bool {
        match self {
            Self::Length { remaining } => *remaining == 0,
            Self::Chunked(decoder) => decoder.state == ChunkState::Done,
            Self::UntilClose => false,
        }
    }

    /// The peer closing the connection is the normal end of this body
    pub fn ends_at_close(&self) -> bool {
        matches!(self, Self::UntilClose)
    }
}
