//! Minimal HTTP/1.1 server for HEAD/GET of fixed paths in integration tests.
//!
//! Serves a path → body map registered by the test and counts HEAD/GET hits
//! so idempotence (zero re-downloads) can be asserted. Unknown paths get 404.

use std::collections::HashMap;
use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;

#[derive(Clone, Default)]
pub struct TestServer {
    inner: Arc<Inner>,
}

#[derive(Default)]
struct Inner {
    resources: Mutex<HashMap<String, Vec<u8>>>,
    head_hits: AtomicUsize,
    get_hits: AtomicUsize,
}

/// Starts a server in a background thread. Returns the handle and a base URL
/// without a trailing slash (e.g. "http://127.0.0.1:12345"). The server runs
/// until the process exits.
pub fn start() -> (TestServer, String) {
    let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
    let port = listener.local_addr().unwrap().port();
    let server = TestServer::default();
    let inner = Arc::clone(&server.inner);
    thread::spawn(move || {
        for stream in listener.incoming().flatten() {
            let inner = Arc::clone(&inner);
            thread::spawn(move || handle(stream, &inner));
        }
    });
    (server, format!("http://127.0.0.1:{port}"))
}

impl TestServer {
    /// Register a body under a path like "/yellow_tripdata_2021-11.csv".
    pub fn put(&self, path: &str, body: Vec<u8>) {
        self.inner
            .resources
            .lock()
            .unwrap()
            .insert(path.to_string(), body);
    }

    pub fn head_hits(&self) -> usize {
        self.inner.head_hits.load(Ordering::SeqCst)
    }

    pub fn get_hits(&self) -> usize {
        self.inner.get_hits.load(Ordering::SeqCst)
    }
}

fn handle(mut stream: TcpStream, inner: &Inner) {
    let _ = stream.set_read_timeout(Some(std::time::Duration::from_secs(2)));
    let _ = stream.set_write_timeout(Some(std::time::Duration::from_secs(2)));
    let mut buf = [0u8; 8192];
    let n = match stream.read(&mut buf) {
        Ok(0) => return,
        Ok(n) => n,
        Err(_) => return,
    };
    let request = match std::str::from_utf8(&buf[..n]) {
        Ok(s) => s,
        Err(_) => return,
    };
    let (method, path) = parse_request_line(request);

    let body = inner.resources.lock().unwrap().get(path).cloned();
    let Some(body) = body else {
        let _ = stream.write_all(b"HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n");
        return;
    };

    if method.eq_ignore_ascii_case("HEAD") {
        inner.head_hits.fetch_add(1, Ordering::SeqCst);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes());
        return;
    }
    if method.eq_ignore_ascii_case("GET") {
        inner.get_hits.fetch_add(1, Ordering::SeqCst);
        let response = format!(
            "HTTP/1.1 200 OK\r\nContent-Length: {}\r\nConnection: close\r\n\r\n",
            body.len()
        );
        let _ = stream.write_all(response.as_bytes());
        let _ = stream.write_all(&body);
        return;
    }
    let _ = stream.write_all(b"HTTP/1.1 405 Method Not Allowed\r\nConnection: close\r\n\r\n");
}

/// Returns (method, path) from the request line.
fn parse_request_line(request: &str) -> (&str, &str) {
    let line = request.lines().next().unwrap_or("");
    let mut parts = line.split_whitespace();
    let method = parts.next().unwrap_or("");
    let path = parts.next().unwrap_or("/");
    (method, path)
}
