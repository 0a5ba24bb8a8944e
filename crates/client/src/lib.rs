//! # Polyz Client
//!
//! Sends one prompt to the inference backend and turns the reply into text.
//!
//! ## Pieces
//!
//! - [`RequestController`]: poll-driven connect/send/drain lifecycle with
//!   bounded timeouts; one exchange at a time
//! - [`HttpSocket`]: the socket seam the controller drives; [`TcpSocket`] is
//!   the non-blocking std implementation
//! - [`parse_response`]: tolerant extraction of the reply text
//!
//! ## Example
//!
//! ```no_run
//! use polyz_client::{
//!     BackendConfig, ControllerConfig, OutboundRequest, RequestController, TcpSocket, Tick,
//! };
//! use polyz_protocol::PromptRequest;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let backend = BackendConfig::default();
//! let request = OutboundRequest::json(&backend, &PromptRequest::new("Add a jump"))?;
//!
//! let mut controller = RequestController::new(TcpSocket::new(), ControllerConfig::default());
//! controller.start(request)?;
//! loop {
//!     match controller.poll() {
//!         Tick::Done(result) => {
//!             println!("{:?}", result?.response.text());
//!             break;
//!         }
//!         _ => std::thread::sleep(std::time::Duration::from_millis(10)),
//!     }
//! }
//! # Ok(())
//! # }
//! ```

mod clock;
mod config;
mod controller;
mod error;
mod http1;
mod parser;
mod socket;
mod tcp;

pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{BackendConfig, ControllerConfig};
pub use controller::{Completion, OutboundRequest, RequestController, State, Tick};
pub use error::{ExchangeError, Result};
pub use parser::{parse_response, ParseError, ParsedResponse};
pub use socket::{HttpSocket, SocketStatus};
pub use tcp::TcpSocket;
