use std::fmt;
use std::io;

/// Connection status as reported by an [`HttpSocket`] after its last poll
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SocketStatus {
    Disconnected,
    Resolving,
    CantResolve,
    Connecting,
    CantConnect,
    /// Connected and idle: ready for a request, or the last body is done
    Connected,
    /// Request written (or being written), response head not yet complete
    Requesting,
    /// Response head received, body bytes may follow
    Body,
    ConnectionError,
}

impl SocketStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            SocketStatus::Disconnected => "disconnected",
            SocketStatus::Resolving => "resolving",
            SocketStatus::CantResolve => "cant_resolve",
            SocketStatus::Connecting => "connecting",
            SocketStatus::CantConnect => "cant_connect",
            SocketStatus::Connected => "connected",
            SocketStatus::Requesting => "requesting",
            SocketStatus::Body => "body",
            SocketStatus::ConnectionError => "connection_error",
        }
    }

    /// True while a connection attempt is still in progress
    pub fn is_pending_connect(self) -> bool {
        matches!(self, SocketStatus::Resolving | SocketStatus::Connecting)
    }
}

impl fmt::Display for SocketStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Non-blocking HTTP/1.1 client socket advanced by explicit polls.
///
/// Nothing here may block for longer than a short bounded step: progress
/// happens in [`HttpSocket::poll`] and [`HttpSocket::read_chunk`], and the
/// caller observes it through [`HttpSocket::status`].
pub trait HttpSocket {
    /// Begin connecting. Errors only when the attempt cannot even start.
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()>;

    /// Advance connection, write and read progress by one step
    fn poll(&mut self) -> io::Result<()>;

    fn status(&self) -> SocketStatus;

    /// Issue a POST. Only valid in [`SocketStatus::Connected`].
    fn post(&mut self, path: &str, headers: &[String], body: &[u8]) -> io::Result<()>;

    /// Response status line and headers have been received
    fn has_response(&self) -> bool;

    fn response_code(&self) -> Option<u16>;

    fn response_headers(&self) -> Vec<String>;

    /// Next available body bytes; empty when none are ready yet
    fn read_chunk(&mut self) -> Vec<u8>;

    /// Drop the connection and all response state
    fn close(&mut self);
}
