use crate::http1::{find_head_end, request_bytes, BodyDecoder, ResponseHead};
use crate::socket::{HttpSocket, SocketStatus};
use socket2::{Domain, Protocol, SockAddr, Socket, Type};
use std::collections::VecDeque;
use std::io::{self, Read, Write};
use std::net::{IpAddr, Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::mpsc::{self, Receiver, TryRecvError};
use std::thread;

const READ_BUF_SIZE: usize = 16 * 1024;

type Resolved = io::Result<Vec<SocketAddr>>;

/// [`HttpSocket`] over a non-blocking [`TcpStream`].
///
/// Host names are looked up on a short-lived resolver thread; IP literals skip
/// the lookup. The TCP handshake is a single non-blocking connect that polls
/// check for completion, so no poll ever waits on the network.
#[derive(Debug)]
pub struct TcpSocket {
    status: SocketStatus,
    host: String,
    port: u16,
    resolver: Option<Receiver<Resolved>>,
    addrs: VecDeque<SocketAddr>,
    /// Handshake in progress
    pending: Option<(Socket, SocketAddr)>,
    stream: Option<TcpStream>,
    outgoing: Vec<u8>,
    written: usize,
    head_buf: Vec<u8>,
    head: Option<ResponseHead>,
    decoder: Option<BodyDecoder>,
    body: Vec<u8>,
}

impl Default for TcpSocket {
    fn default() -> Self {
        Self::new()
    }
}

impl TcpSocket {
    pub fn new() -> Self {
        Self {
            status: SocketStatus::Disconnected,
            host: String::new(),
            port: 0,
            resolver: None,
            addrs: VecDeque::new(),
            pending: None,
            stream: None,
            outgoing: Vec::new(),
            written: 0,
            head_buf: Vec::new(),
            head: None,
            decoder: None,
            body: Vec::new(),
        }
    }

    fn fail(&mut self, e: io::Error) -> io::Result<()> {
        self.status = SocketStatus::ConnectionError;
        self.stream = None;
        Err(e)
    }

    fn reset_response(&mut self) {
        self.head_buf.clear();
        self.head = None;
        self.decoder = None;
        self.body.clear();
    }

    fn spawn_resolver(&mut self) -> io::Result<()> {
        let (tx, rx) = mpsc::channel();
        let host = self.host.clone();
        let port = self.port;
        thread::Builder::new()
            .name("polyz-resolve".to_string())
            .spawn(move || {
                let resolved: Resolved = (host.as_str(), port)
                    .to_socket_addrs()
                    .map(Iterator::collect);
                // receiver is gone when the socket was closed meanwhile
                let _ = tx.send(resolved);
            })?;
        self.resolver = Some(rx);
        Ok(())
    }

    fn check_resolved(&mut self) {
        let resolved = match self.resolver.as_ref().map(Receiver::try_recv) {
            Some(Err(TryRecvError::Empty)) => return,
            Some(Ok(resolved)) => resolved,
            Some(Err(TryRecvError::Disconnected)) | None => Err(io::Error::new(
                io::ErrorKind::Other,
                "resolver exited without an answer",
            )),
        };
        self.resolver = None;

        match resolved {
            Ok(addrs) if !addrs.is_empty() => {
                log::debug!("Resolved {} to {} address(es)", self.host, addrs.len());
                self.addrs = addrs.into();
                self.status = SocketStatus::Connecting;
            }
            Ok(_) => self.status = SocketStatus::CantResolve,
            Err(e) => {
                log::debug!("Could not resolve {}: {e}", self.host);
                self.status = SocketStatus::CantResolve;
            }
        }
    }

    fn advance_connect(&mut self) -> io::Result<()> {
        if let Some((socket, addr)) = self.pending.take() {
            match handshake_done(&socket) {
                Ok(true) => return self.on_connected(socket, addr),
                Ok(false) => {
                    self.pending = Some((socket, addr));
                    return Ok(());
                }
                Err(e) => log::debug!("Connect to {addr} failed: {e}"),
            }
        }

        let Some(addr) = self.addrs.pop_front() else {
            self.status = SocketStatus::CantConnect;
            return Ok(());
        };
        match start_connect(addr) {
            Ok((socket, true)) => self.on_connected(socket, addr),
            Ok((socket, false)) => {
                self.pending = Some((socket, addr));
                Ok(())
            }
            Err(e) => {
                log::debug!("Connect to {addr} failed: {e}");
                if self.addrs.is_empty() {
                    self.status = SocketStatus::CantConnect;
                }
                Ok(())
            }
        }
    }

    fn on_connected(&mut self, socket: Socket, addr: SocketAddr) -> io::Result<()> {
        let stream = TcpStream::from(socket);
        if let Err(e) = stream.set_nodelay(true) {
            log::debug!("Could not disable Nagle on {addr}: {e}");
        }
        log::debug!("Connected to {addr}");
        self.stream = Some(stream);
        self.status = SocketStatus::Connected;
        Ok(())
    }

    fn flush(&mut self) -> io::Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        if let Err(e) = write_pending(stream, &self.outgoing, &mut self.written) {
            return self.fail(e);
        }
        Ok(())
    }

    /// One non-blocking read from the stream
    fn pump(&mut self) -> io::Result<()> {
        let Some(stream) = self.stream.as_mut() else {
            return Ok(());
        };
        let mut buf = [0u8; READ_BUF_SIZE];
        let read = match stream.read(&mut buf) {
            Err(e)
                if matches!(
                    e.kind(),
                    io::ErrorKind::WouldBlock | io::ErrorKind::Interrupted
                ) =>
            {
                return Ok(())
            }
            other => other,
        };

        match read {
            Ok(0) => self.on_eof(),
            Ok(n) => self.on_bytes(&buf[..n]),
            Err(e) => self.fail(e),
        }
    }

    fn on_bytes(&mut self, data: &[u8]) -> io::Result<()> {
        if self.head.is_some() {
            return self.feed(data);
        }

        self.head_buf.extend_from_slice(data);
        let Some(end) = find_head_end(&self.head_buf) else {
            return Ok(());
        };
        let parsed = ResponseHead::parse(&self.head_buf[..end])
            .and_then(|head| BodyDecoder::for_head(&head).map(|decoder| (head, decoder)));
        let (head, decoder) = match parsed {
            Ok(parsed) => parsed,
            Err(e) => return self.fail(e),
        };

        log::debug!("Response head received: {}", head.code);
        let rest = self.head_buf.split_off(end + 4);
        self.head_buf.clear();
        self.head = Some(head);
        self.decoder = Some(decoder);
        self.status = SocketStatus::Body;
        self.feed(&rest)
    }

    fn feed(&mut self, data: &[u8]) -> io::Result<()> {
        let Some(decoder) = self.decoder.as_mut() else {
            return Ok(());
        };
        let complete = decoder
            .feed(data, &mut self.body)
            .map(|()| decoder.is_complete());
        match complete {
            Ok(true) => {
                self.status = SocketStatus::Connected;
                Ok(())
            }
            Ok(false) => Ok(()),
            Err(e) => self.fail(e),
        }
    }

    fn on_eof(&mut self) -> io::Result<()> {
        self.stream = None;
        let Some(decoder) = self.decoder.as_ref() else {
            return self.fail(io::Error::new(
                io::ErrorKind::UnexpectedEof,
                "connection closed before a response arrived",
            ));
        };

        if decoder.ends_at_close() || decoder.is_complete() {
            self.status = SocketStatus::Connected;
        } else {
            log::warn!(
                "Connection closed mid-body after {} bytes",
                self.body.len()
            );
            self.status = SocketStatus::ConnectionError;
        }
        Ok(())
    }
}

/// Open a non-blocking socket and begin the handshake. The flag is true when
/// it completed immediately.
fn start_connect(addr: SocketAddr) -> io::Result<(Socket, bool)> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_nonblocking(true)?;
    match socket.connect(&SockAddr::from(addr)) {
        Ok(()) => Ok((socket, true)),
        Err(e) if connect_in_progress(&e) => Ok((socket, false)),
        Err(e) => Err(e),
    }
}

/// `Ok(false)` while the handshake is still running
fn handshake_done(socket: &Socket) -> io::Result<bool> {
    if let Some(e) = socket.take_error()? {
        return Err(e);
    }
    match socket.peer_addr() {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotConnected => Ok(false),
        Err(e) => Err(e),
    }
}

#[cfg(unix)]
fn connect_in_progress(e: &io::Error) -> bool {
    e.raw_os_error() == Some(libc::EINPROGRESS) || e.kind() == io::ErrorKind::WouldBlock
}

#[cfg(not(unix))]
fn connect_in_progress(e: &io::Error) -> bool {
    e.kind() == io::ErrorKind::WouldBlock
}

fn write_pending(stream: &mut TcpStream, out: &[u8], written: &mut usize) -> io::Result<()> {
    while *written < out.len() {
        match stream.write(&out[*written..]) {
            Ok(0) => {
                return Err(io::Error::new(
                    io::ErrorKind::WriteZero,
                    "connection closed while sending",
                ))
            }
            Ok(n) => *written += n,
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => break,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

impl HttpSocket for TcpSocket {
    fn connect(&mut self, host: &str, port: u16) -> io::Result<()> {
        self.close();
        if host.is_empty() {
            return Err(io::Error::new(io::ErrorKind::InvalidInput, "empty host"));
        }
        self.host = host.to_string();
        self.port = port;

        if let Ok(ip) = host.parse::<IpAddr>() {
            self.addrs.push_back(SocketAddr::new(ip, port));
            self.status = SocketStatus::Connecting;
            return Ok(());
        }
        self.spawn_resolver()?;
        self.status = SocketStatus::Resolving;
        Ok(())
    }

    fn poll(&mut self) -> io::Result<()> {
        match self.status {
            SocketStatus::Resolving => {
                self.check_resolved();
                Ok(())
            }
            SocketStatus::Connecting => self.advance_connect(),
            SocketStatus::Requesting => {
                self.flush()?;
                self.pump()
            }
            SocketStatus::Body => self.pump(),
            _ => Ok(()),
        }
    }

    fn status(&self) -> SocketStatus {
        self.status
    }

    fn post(&mut self, path: &str, headers: &[String], body: &[u8]) -> io::Result<()> {
        if self.status != SocketStatus::Connected || self.stream.is_none() {
            return Err(io::Error::new(
                io::ErrorKind::NotConnected,
                format!("cannot send while {}", self.status),
            ));
        }
        self.reset_response();
        self.outgoing = request_bytes(&self.host, self.port, path, headers, body);
        self.written = 0;
        self.status = SocketStatus::Requesting;
        self.flush()
    }

    fn has_response(&self) -> bool {
        self.head.is_some()
    }

    fn response_code(&self) -> Option<u16> {
        self.head.as_ref().map(|head| head.code)
    }

    fn response_headers(&self) -> Vec<String> {
        self.head
            .as_ref()
            .map(|head| head.headers.clone())
            .unwrap_or_default()
    }

    fn read_chunk(&mut self) -> Vec<u8> {
        if self.body.is_empty() && self.status == SocketStatus::Body {
            if let Err(e) = self.pump() {
                log::debug!("Body read failed: {e}");
            }
        }
        std::mem::take(&mut self.body)
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            let _ = stream.shutdown(Shutdown::Both);
        }
        self.resolver = None;
        self.pending = None;
        self.addrs.clear();
        self.outgoing.clear();
        self.written = 0;
        self.reset_response();
        self.status = SocketStatus::Disconnected;
    }
}
