use crate::parser::ParseError;
use crate::socket::SocketStatus;
use std::time::Duration;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, ExchangeError>;

/// Terminal outcome of an exchange other than a parsed reply
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExchangeError {
    #[error("a request is already in flight")]
    Busy,

    #[error("failed to connect to {target}: {reason}")]
    Connect { target: String, reason: String },

    #[error("failed to send request: {0}")]
    Send(String),

    #[error("transport error: {0}")]
    Transport(String),

    #[error("request failed with socket status {0}")]
    Status(SocketStatus),

    #[error("timed out after {} seconds (status: {status})", elapsed.as_secs())]
    Timeout {
        elapsed: Duration,
        status: SocketStatus,
    },

    #[error("no response received from the backend")]
    NoResponse,

    #[error("empty response body")]
    EmptyBody { status_code: Option<u16> },

    #[error("failed to parse response: {0}")]
    Parse(#[from] ParseError),
}
