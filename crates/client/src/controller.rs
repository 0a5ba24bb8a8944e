//! Poll-driven request lifecycle.
//!
//! ```text
//! Idle ──start──> Connecting ──> Connected ──> Sending ──> AwaitingResponse ──> Idle
//!                     │               │           │               │
//!                     └───────────────┴───────────┴───────────────┴──> Idle (failure)
//! ```
//!
//! One exchange at a time. Each [`RequestController::poll`] performs a single
//! bounded step and never sleeps; the host calls it on its own tick.

use crate::clock::{Clock, SystemClock};
use crate::config::{BackendConfig, ControllerConfig};
use crate::error::{ExchangeError, Result};
use crate::parser::{parse_response, ParsedResponse};
use crate::socket::{HttpSocket, SocketStatus};
use polyz_protocol::{json_headers, PromptRequest};
use std::time::Duration;

/// Polls between debug status lines
const STATUS_LOG_EVERY: u64 = 20;

/// Bytes of the raw body echoed at debug level
const BODY_LOG_CHARS: usize = 1000;

/// Externally visible lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum State {
    Idle,
    Connecting,
    Connected,
    Sending,
    AwaitingResponse,
}

/// A fully serialized POST, ready for the socket
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub host: String,
    pub port: u16,
    pub path: String,
    pub headers: Vec<String>,
    pub body: Vec<u8>,
}

impl OutboundRequest {
    /// JSON POST of `request` to the configured backend
    pub fn json(backend: &BackendConfig, request: &PromptRequest) -> serde_json::Result<Self> {
        let body = request.to_body()?;
        Ok(Self {
            host: backend.host.clone(),
            port: backend.port,
            path: backend.path.clone(),
            headers: json_headers(body.len()),
            body,
        })
    }

    fn target(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// A reply that made it all the way through
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Completion {
    pub status_code: Option<u16>,
    pub body_len: usize,
    pub elapsed: Duration,
    pub response: ParsedResponse,
}

/// What one poll produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Tick {
    /// Nothing in flight
    Idle,
    /// Still working
    Pending,
    /// Still working; emitted every `progress_every_polls` while waiting
    Progress { elapsed: Duration },
    /// Terminal outcome. The socket is closed and the controller is idle.
    Done(Result<Completion>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Connecting,
    Connected,
    Sending,
    AwaitingResponse,
}

impl From<Phase> for State {
    fn from(phase: Phase) -> Self {
        match phase {
            Phase::Connecting => State::Connecting,
            Phase::Connected => State::Connected,
            Phase::Sending => State::Sending,
            Phase::AwaitingResponse => State::AwaitingResponse,
        }
    }
}

#[derive(Debug, Default)]
struct Drain {
    /// Entered on the force-drain deadline rather than on a response
    forced: bool,
    head_seen: bool,
    status_code: Option<u16>,
    waiting_polls: u32,
    empty_reads: u32,
    body: Vec<u8>,
}

#[derive(Debug)]
struct InFlight {
    request: OutboundRequest,
    started: Duration,
    phase: Phase,
    polls: u64,
    soft_logged: bool,
    drain: Drain,
}

enum Step {
    Wait,
    Finish(Result<Completion>),
}

/// Drives one request/response exchange over an [`HttpSocket`]
pub struct RequestController<S, C = SystemClock> {
    socket: S,
    clock: C,
    config: ControllerConfig,
    flight: Option<InFlight>,
}

impl<S: HttpSocket> RequestController<S, SystemClock> {
    pub fn new(socket: S, config: ControllerConfig) -> Self {
        Self::with_clock(socket, SystemClock::new(), config)
    }
}

impl<S: HttpSocket, C: Clock> RequestController<S, C> {
    pub fn with_clock(socket: S, clock: C, config: ControllerConfig) -> Self {
        Self {
            socket,
            clock,
            config,
            flight: None,
        }
    }

    pub fn state(&self) -> State {
        self.flight
            .as_ref()
            .map_or(State::Idle, |flight| flight.phase.into())
    }

    pub fn is_busy(&self) -> bool {
        self.flight.is_some()
    }

    /// Time since the in-flight exchange started
    pub fn elapsed(&self) -> Option<Duration> {
        self.flight
            .as_ref()
            .map(|flight| self.clock.now().saturating_sub(flight.started))
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn socket(&self) -> &S {
        &self.socket
    }

    pub fn socket_mut(&mut self) -> &mut S {
        &mut self.socket
    }

    /// Begin an exchange.
    ///
    /// Rejected with [`ExchangeError::Busy`] while another is in flight (the
    /// in-flight one is untouched). A connect call that fails outright is
    /// reported here and leaves the controller idle.
    pub fn start(&mut self, request: OutboundRequest) -> Result<()> {
        if self.flight.is_some() {
            log::warn!("Rejecting request: an exchange is already in flight");
            return Err(ExchangeError::Busy);
        }

        log::info!(
            "Connecting to {}{} ({} byte body)",
            request.target(),
            request.path,
            request.body.len()
        );
        if let Err(e) = self.socket.connect(&request.host, request.port) {
            log::warn!("Connect to {} failed: {e}", request.target());
            self.socket.close();
            return Err(ExchangeError::Connect {
                target: request.target(),
                reason: e.to_string(),
            });
        }

        self.flight = Some(InFlight {
            request,
            started: self.clock.now(),
            phase: Phase::Connecting,
            polls: 0,
            soft_logged: false,
            drain: Drain::default(),
        });
        Ok(())
    }

    /// Abort whatever is in flight. No-op when idle.
    pub fn cancel(&mut self) {
        if self.flight.take().is_some() {
            log::info!("Exchange cancelled");
            self.socket.close();
        }
    }

    /// Advance the exchange by one step
    pub fn poll(&mut self) -> Tick {
        let Some(mut flight) = self.flight.take() else {
            return Tick::Idle;
        };

        if let Err(e) = self.socket.poll() {
            log::warn!("Socket poll failed: {e}");
            return self.finish(Err(ExchangeError::Transport(e.to_string())));
        }

        flight.polls += 1;
        let elapsed = self.clock.now().saturating_sub(flight.started);
        if flight.polls % STATUS_LOG_EVERY == 0 {
            log::debug!(
                "Exchange status after {}s: {:?} / socket {}",
                elapsed.as_secs(),
                flight.phase,
                self.socket.status()
            );
        }

        if elapsed > self.config.hard_timeout() {
            let status = self.socket.status();
            log::warn!(
                "Request timed out after {} seconds (status: {status})",
                elapsed.as_secs()
            );
            return self.finish(Err(ExchangeError::Timeout { elapsed, status }));
        }

        let step = match flight.phase {
            Phase::Connecting => self.step_connecting(&mut flight),
            Phase::Connected => self.step_send(&mut flight),
            Phase::Sending => self.step_sending(&mut flight, elapsed),
            Phase::AwaitingResponse => self.step_drain(&mut flight, elapsed),
        };

        match step {
            Step::Finish(result) => self.finish(result),
            Step::Wait => {
                let waiting = matches!(flight.phase, Phase::Sending | Phase::AwaitingResponse);
                let every = self.config.progress_every_polls;
                let tick = if waiting && every > 0 && flight.polls % every == 0 {
                    Tick::Progress { elapsed }
                } else {
                    Tick::Pending
                };
                self.flight = Some(flight);
                tick
            }
        }
    }

    fn step_connecting(&mut self, flight: &mut InFlight) -> Step {
        match self.socket.status() {
            status if status.is_pending_connect() => Step::Wait,
            SocketStatus::Connected => {
                log::debug!("Connected to {}", flight.request.target());
                flight.phase = Phase::Connected;
                Step::Wait
            }
            status => Step::Finish(Err(ExchangeError::Connect {
                target: flight.request.target(),
                reason: format!("socket status {status}"),
            })),
        }
    }

    fn step_send(&mut self, flight: &mut InFlight) -> Step {
        let request = &flight.request;
        log::debug!(
            "Sending POST {} ({} bytes)",
            request.path,
            request.body.len()
        );
        match self
            .socket
            .post(&request.path, &request.headers, &request.body)
        {
            Ok(()) => {
                flight.phase = Phase::Sending;
                Step::Wait
            }
            Err(e) => Step::Finish(Err(ExchangeError::Send(e.to_string()))),
        }
    }

    fn step_sending(&mut self, flight: &mut InFlight, elapsed: Duration) -> Step {
        if self.socket.has_response() {
            log::debug!("Response detected, reading body");
            flight.phase = Phase::AwaitingResponse;
            return Step::Wait;
        }

        match self.socket.status() {
            SocketStatus::Requesting => {
                if elapsed > self.config.soft_recheck() {
                    if !flight.soft_logged {
                        log::info!(
                            "No response after {} seconds, still waiting",
                            elapsed.as_secs()
                        );
                        flight.soft_logged = true;
                    }
                    if elapsed > self.config.force_drain() {
                        log::warn!(
                            "Still requesting after {} seconds, draining whatever arrives",
                            elapsed.as_secs()
                        );
                        flight.phase = Phase::AwaitingResponse;
                        flight.drain.forced = true;
                    }
                }
                Step::Wait
            }
            SocketStatus::Body | SocketStatus::Connected => {
                flight.phase = Phase::AwaitingResponse;
                Step::Wait
            }
            status => {
                log::warn!("Request failed with socket status {status}");
                Step::Finish(Err(ExchangeError::Status(status)))
            }
        }
    }

    fn step_drain(&mut self, flight: &mut InFlight, elapsed: Duration) -> Step {
        let drain = &mut flight.drain;

        if !self.socket.has_response() {
            drain.waiting_polls += 1;
            if drain.waiting_polls >= self.config.no_response_polls {
                log::warn!("No response after {} extra polls", drain.waiting_polls);
                return Step::Finish(Err(ExchangeError::NoResponse));
            }
            return Step::Wait;
        }

        if !drain.head_seen {
            drain.head_seen = true;
            drain.status_code = self.socket.response_code();
            match drain.status_code {
                Some(code) if (200..300).contains(&code) => {
                    log::info!("Response code: {code}");
                }
                Some(code) => log::warn!("Backend returned status {code}, parsing body anyway"),
                None => log::warn!("Response has no status code"),
            }
            for header in self.socket.response_headers() {
                log::debug!("  {header}");
            }
        }

        let limit = if drain.forced {
            self.config.max_empty_chunks_forced
        } else {
            self.config.max_empty_chunks
        };

        for _ in 0..self.config.drain_burst.max(1) {
            let chunk = self.socket.read_chunk();
            if !chunk.is_empty() {
                log::debug!("Read body chunk of {} bytes", chunk.len());
                drain.body.extend_from_slice(&chunk);
                drain.empty_reads = 0;
                continue;
            }

            let status = self.socket.status();
            if !matches!(status, SocketStatus::Body | SocketStatus::Requesting) {
                return complete(drain, elapsed);
            }
            if drain.body.is_empty() && !drain.forced {
                // headers only so far; the hard timeout bounds this wait
                break;
            }
            drain.empty_reads += 1;
            if drain.empty_reads > limit {
                log::warn!(
                    "Breaking body read after {} empty attempts ({} bytes so far)",
                    drain.empty_reads,
                    drain.body.len()
                );
                return complete(drain, elapsed);
            }
            break;
        }
        Step::Wait
    }

    fn finish(&mut self, result: Result<Completion>) -> Tick {
        self.socket.close();
        self.flight = None;
        match &result {
            Ok(done) => log::info!(
                "Exchange finished in {}s ({} bytes)",
                done.elapsed.as_secs(),
                done.body_len
            ),
            Err(e) => log::warn!("Exchange failed: {e}"),
        }
        Tick::Done(result)
    }
}

fn complete(drain: &mut Drain, elapsed: Duration) -> Step {
    let body = std::mem::take(&mut drain.body);
    if body.is_empty() {
        log::warn!("Empty response body received");
        return Step::Finish(Err(ExchangeError::EmptyBody {
            status_code: drain.status_code,
        }));
    }

    if log::log_enabled!(log::Level::Debug) {
        let text = String::from_utf8_lossy(&body);
        let head: String = text.chars().take(BODY_LOG_CHARS).collect();
        log::debug!("Raw response ({} bytes): {head}", body.len());
    }

    let result = parse_response(&body)
        .map(|response| Completion {
            status_code: drain.status_code,
            body_len: body.len(),
            elapsed,
            response,
        })
        .map_err(ExchangeError::from);
    Step::Finish(result)
}
