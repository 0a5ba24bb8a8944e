use polyz_client::{
    BackendConfig, ControllerConfig, ExchangeError, OutboundRequest, RequestController,
    TcpSocket, Tick,
};
use polyz_protocol::PromptRequest;
use pretty_assertions::assert_eq;
use std::io::{Read, Write};
use std::net::TcpListener;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

/// Accept one connection, read the full request, reply with `response`
fn serve_once(response: &'static [u8]) -> (u16, JoinHandle<String>) {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let handle = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        let request = read_request(&mut stream);
        for piece in response.chunks(7) {
            stream.write_all(piece).unwrap();
            stream.flush().unwrap();
            thread::sleep(Duration::from_millis(1));
        }
        request
    });
    (port, handle)
}

fn read_request(stream: &mut std::net::TcpStream) -> String {
    let mut raw = Vec::new();
    let mut buf = [0u8; 1024];
    loop {
        let n = stream.read(&mut buf).unwrap();
        raw.extend_from_slice(&buf[..n]);
        let text = String::from_utf8_lossy(&raw).to_string();
        if let Some(end) = text.find("\r\n\r\n") {
            let length = text[..end]
                .lines()
                .find_map(|l| l.strip_prefix("Content-Length: "))
                .and_then(|v| v.trim().parse::<usize>().ok())
                .unwrap_or(0);
            if raw.len() >= end + 4 + length {
                return text;
            }
        }
        if n == 0 {
            return text;
        }
    }
}

fn exchange(port: u16, prompt: &str) -> polyz_client::Result<polyz_client::Completion> {
    let backend = BackendConfig {
        host: "127.0.0.1".to_string(),
        port,
        ..BackendConfig::default()
    };
    let request = OutboundRequest::json(&backend, &PromptRequest::new(prompt)).unwrap();
    let mut controller = RequestController::new(TcpSocket::new(), ControllerConfig::default());
    controller.start(request)?;

    let deadline = Instant::now() + Duration::from_secs(10);
    while Instant::now() < deadline {
        if let Tick::Done(result) = controller.poll() {
            return result;
        }
        thread::sleep(Duration::from_millis(1));
    }
    panic!("exchange did not finish");
}

#[test]
fn content_length_response() {
    let (port, server) = serve_once(
        b"HTTP/1.1 200 OK\r\nContent-Type: application/json\r\nContent-Length: 45\r\n\r\n{\"content\":\"func _ready():\\n\\tpass\",\"x\":1234}",
    );
    let done = exchange(port, "write ready").unwrap();
    assert_eq!(done.status_code, Some(200));
    assert_eq!(done.response.text(), Some("func _ready():\n\tpass"));

    let request = server.join().unwrap();
    assert!(request.starts_with("POST /api/prompts/godot HTTP/1.1\r\n"));
    assert!(request.contains(&format!("Host: 127.0.0.1:{port}\r\n")));
    assert!(request.contains("Content-Type: application/json\r\n"));
    assert!(request.ends_with(r#"{"prompt":"write ready"}"#));
}

#[test]
fn chunked_response() {
    let (port, server) = serve_once(
        b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\nb\r\n{\"response\"\r\n6\r\n:\"ok\"}\r\n0\r\n\r\n",
    );
    let done = exchange(port, "hi").unwrap();
    assert_eq!(done.response.text(), Some("ok"));
    server.join().unwrap();
}

#[test]
fn body_until_close() {
    let (port, server) = serve_once(b"HTTP/1.0 200 OK\r\n\r\n{\"result\":{\"content\":\"closed\"}}");
    let done = exchange(port, "hi").unwrap();
    assert_eq!(done.response.text(), Some("closed"));
    server.join().unwrap();
}

#[test]
fn error_status_body_is_still_parsed() {
    let (port, server) = serve_once(
        b"HTTP/1.1 500 Internal Server Error\r\nContent-Length: 20\r\n\r\n{\"error\":\"overload\"}",
    );
    let done = exchange(port, "hi").unwrap();
    assert_eq!(done.status_code, Some(500));
    assert_eq!(done.response.text(), None);
    server.join().unwrap();
}

#[test]
fn refused_connection() {
    let port = {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap().port()
    };
    let err = exchange(port, "hi").unwrap_err();
    assert!(matches!(err, ExchangeError::Connect { .. }), "{err:?}");
}

#[test]
fn slow_body_after_early_headers() {
    let listener = TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    let server = thread::spawn(move || {
        let (mut stream, _) = listener.accept().unwrap();
        read_request(&mut stream);
        stream
            .write_all(b"HTTP/1.1 200 OK\r\nTransfer-Encoding: chunked\r\n\r\n")
            .unwrap();
        stream.flush().unwrap();
        thread::sleep(Duration::from_millis(1500));
        stream
            .write_all(b"1e\r\n{\"content\":\"slow but healthy\"}\r\n0\r\n\r\n")
            .unwrap();
    });

    let done = exchange(port, "hi").unwrap();
    assert_eq!(done.response.text(), Some("slow but healthy"));
    server.join().unwrap();
}
