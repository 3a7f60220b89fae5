//! Scripted HTTP/1.1 server for exercising the sink end to end.
//!
//! The server accepts connections one at a time on an ephemeral loopback
//! port and serves any number of keep-alive requests per connection. Each
//! request is answered with the next scripted [`MockResponse`] (the last one
//! repeats once the script runs out) and reported through
//! [`MockHttpServer::next_request`], tagged with the connection it arrived
//! on.

use std::{
    collections::VecDeque,
    io::{self, BufRead, BufReader, Read, Write},
    net::{SocketAddr, TcpListener, TcpStream},
    sync::{
        Arc,
        atomic::{AtomicUsize, Ordering},
        mpsc,
    },
    thread,
    time::Duration,
};

const READ_TIMEOUT: Duration = Duration::from_secs(5);

/// A request as received by the server.
#[derive(Clone, Debug)]
pub struct CapturedRequest {
    pub method: String,
    pub path: String,
    /// Header names are lower-cased.
    pub headers: Vec<(String, String)>,
    pub body: String,
    /// 1-based index of the connection the request arrived on.
    pub connection: usize,
}

impl CapturedRequest {
    /// Value of header `name`, matched case-insensitively.
    pub fn header(&self, name: &str) -> Option<&str> {
        let name = name.to_ascii_lowercase();
        self.headers
            .iter()
            .find(|(key, _)| *key == name)
            .map(|(_, value)| value.as_str())
    }
}

/// A scripted reply.
#[derive(Clone, Debug)]
pub struct MockResponse {
    status: u16,
    body: String,
}

impl MockResponse {
    /// Reply with `status` and its reason phrase as the body.
    pub fn status(status: u16) -> Self {
        Self {
            status,
            body: status_text(status).to_owned(),
        }
    }

    pub fn with_body(mut self, body: impl Into<String>) -> Self {
        self.body = body.into();
        self
    }
}

fn status_text(code: u16) -> &'static str {
    match code {
        200 => "OK",
        201 => "Created",
        204 => "No Content",
        303 => "See Other",
        400 => "Bad Request",
        401 => "Unauthorized",
        404 => "Not Found",
        429 => "Too Many Requests",
        500 => "Internal Server Error",
        503 => "Service Unavailable",
        _ => "Unknown",
    }
}

struct Script {
    pending: VecDeque<MockResponse>,
    last: MockResponse,
}

impl Script {
    fn new(responses: Vec<MockResponse>) -> Self {
        Self {
            pending: responses.into(),
            last: MockResponse::status(200),
        }
    }

    fn next(&mut self) -> MockResponse {
        if let Some(response) = self.pending.pop_front() {
            self.last = response;
        }
        self.last.clone()
    }
}

/// Handle to a running mock server.
pub struct MockHttpServer {
    addr: SocketAddr,
    requests: mpsc::Receiver<CapturedRequest>,
    connections: Arc<AtomicUsize>,
}

impl MockHttpServer {
    /// Bind an ephemeral loopback port and start serving `responses`.
    pub fn start(responses: Vec<MockResponse>) -> io::Result<Self> {
        let listener = TcpListener::bind(("127.0.0.1", 0))?;
        let addr = listener.local_addr()?;
        let (tx, rx) = mpsc::channel();
        let connections = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&connections);
        thread::spawn(move || serve(listener, Script::new(responses), counter, tx));
        Ok(Self {
            addr,
            requests: rx,
            connections,
        })
    }

    /// Start a server that answers every request with `status`.
    pub fn with_status(status: u16) -> io::Result<Self> {
        Self::start(vec![MockResponse::status(status)])
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// `http://` URL for `path` on this server.
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    /// Wait up to `timeout` for the next captured request.
    pub fn next_request(&self, timeout: Duration) -> Option<CapturedRequest> {
        self.requests.recv_timeout(timeout).ok()
    }

    /// Number of connections accepted so far.
    pub fn connections(&self) -> usize {
        self.connections.load(Ordering::SeqCst)
    }
}

/// Address of a loopback port with nothing listening on it.
pub fn unused_local_addr() -> io::Result<SocketAddr> {
    let listener = TcpListener::bind(("127.0.0.1", 0))?;
    listener.local_addr()
}

fn serve(
    listener: TcpListener,
    mut script: Script,
    connections: Arc<AtomicUsize>,
    tx: mpsc::Sender<CapturedRequest>,
) {
    for stream in listener.incoming() {
        let Ok(stream) = stream else {
            break;
        };
        let id = connections.fetch_add(1, Ordering::SeqCst) + 1;
        if serve_connection(stream, id, &mut script, &tx).is_err() {
            break;
        }
    }
}

/// Serve requests on one connection until the peer closes it.
///
/// Returns `Err` only when the test side has dropped its receiver.
fn serve_connection(
    mut stream: TcpStream,
    id: usize,
    script: &mut Script,
    tx: &mpsc::Sender<CapturedRequest>,
) -> Result<(), mpsc::SendError<CapturedRequest>> {
    let _ = stream.set_read_timeout(Some(READ_TIMEOUT));
    let Ok(read_half) = stream.try_clone() else {
        return Ok(());
    };
    let mut reader = BufReader::new(read_half);
    while let Some(mut captured) = read_http_request(&mut reader) {
        captured.connection = id;
        let response = script.next();
        let reply = format!(
            "HTTP/1.1 {} {}\r\nContent-Type: text/plain\r\nContent-Length: {}\r\n\r\n{}",
            response.status,
            status_text(response.status),
            response.body.len(),
            response.body
        );
        if stream.write_all(reply.as_bytes()).is_err() {
            return Ok(());
        }
        tx.send(captured)?;
    }
    Ok(())
}

/// Parses a single header line into a key-value pair.
fn parse_header_line(line: &str) -> Option<(String, String)> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    line.split_once(':')
        .map(|(key, value)| (key.trim().to_lowercase(), value.trim().to_string()))
}

/// Reads all headers and returns them with the content length.
fn read_headers(reader: &mut BufReader<TcpStream>) -> Option<(Vec<(String, String)>, usize)> {
    let mut headers = Vec::new();
    let mut content_length = 0usize;

    loop {
        let mut line = String::new();
        if reader.read_line(&mut line).ok()? == 0 {
            return None;
        }
        if line.trim().is_empty() {
            break;
        }
        let Some((key, value)) = parse_header_line(&line) else {
            continue;
        };
        if key == "content-length" {
            content_length = value.parse().unwrap_or(0);
        }
        headers.push((key, value));
    }

    Some((headers, content_length))
}

/// Read one request, or `None` once the peer has closed the connection.
fn read_http_request(reader: &mut BufReader<TcpStream>) -> Option<CapturedRequest> {
    let mut request_line = String::new();
    if reader.read_line(&mut request_line).ok()? == 0 {
        return None;
    }
    let mut parts = request_line.split_whitespace();
    let method = parts.next().unwrap_or_default().to_string();
    let path = parts.next().unwrap_or_default().to_string();

    let (headers, content_length) = read_headers(reader)?;
    let mut body = vec![0u8; content_length];
    reader.read_exact(&mut body).ok()?;

    Some(CapturedRequest {
        method,
        path,
        headers,
        body: String::from_utf8_lossy(&body).into_owned(),
        connection: 0,
    })
}
