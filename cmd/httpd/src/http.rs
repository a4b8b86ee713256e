//! Request parsing and response building for the toy HTTP server
//!
//! Single-pass text munging: one request per connection, no keep-alive,
//! no chunked bodies.

use std::fs;
use std::path::Path;

pub const STATUS_OK: &str = "HTTP/1.1 200 OK\r\n";
pub const STATUS_CREATED: &str = "HTTP/1.1 201 Created\r\n\r\n";
pub const STATUS_NOT_FOUND: &str = "HTTP/1.1 404 Not Found\r\n\r\n";
pub const STATUS_INTERNAL_SERVER_ERROR: &str = "HTTP/1.1 500 Internal Server Error\r\n\r\n";
pub const STATUS_METHOD_NOT_ALLOWED: &str = "HTTP/1.1 405 Method Not Allowed\r\n\r\n";

const CONTENT_TYPE_TEXT: &str = "text/plain";
const CONTENT_TYPE_FILE: &str = "application/octet-stream";

/// Parsed request line plus the headers the routes care about
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Request {
    pub method: Option<String>,
    pub path: Option<String>,
    pub version: Option<String>,
    pub host: Option<String>,
    pub user_agent: Option<String>,
    pub accept: Option<String>,
    pub accept_encoding: Option<String>,
    pub content_length: Option<usize>,
    pub body: Vec<u8>,
}

/// Offset just past the blank line ending the header block
pub fn header_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n").map(|i| i + 4)
}

/// Parse a raw request buffer
///
/// Never fails: missing pieces stay `None` and the router answers 500 for
/// a request without a path.
pub fn parse_request(buf: &[u8]) -> Request {
    let (head, body) = match header_end(buf) {
        Some(end) => (&buf[..end], &buf[end..]),
        None => (buf, &[][..]),
    };
    let head = String::from_utf8_lossy(head);
    let mut lines = head.split("\r\n");

    let mut request = Request::default();
    if let Some(line) = lines.next() {
        let mut parts = line.split(' ').filter(|p| !p.is_empty());
        request.method = parts.next().map(str::to_string);
        request.path = parts.next().map(str::to_string);
        request.version = parts.next().map(str::to_string);
    }

    for line in lines {
        let Some((name, value)) = line.split_once(':') else {
            continue;
        };
        let value = value.trim().to_string();
        // First occurrence wins, except Content-Length which takes the last.
        match name.trim().to_ascii_lowercase().as_str() {
            "host" => { request.host.get_or_insert(value); }
            "user-agent" => { request.user_agent.get_or_insert(value); }
            "accept" => { request.accept.get_or_insert(value); }
            "accept-encoding" => { request.accept_encoding.get_or_insert(value); }
            "content-length" => request.content_length = value.parse().ok(),
            _ => {}
        }
    }

    let take = request.content_length.map_or(body.len(), |n| n.min(body.len()));
    request.body = body[..take].to_vec();
    request
}

fn text_response(content_type: &str, body: &[u8]) -> Vec<u8> {
    let mut out = format!(
        "{}Content-Type: {}\r\nContent-Length: {}\r\n\r\n",
        STATUS_OK,
        content_type,
        body.len()
    )
    .into_bytes();
    out.extend_from_slice(body);
    out
}

/// A file name under `/files/` that stays inside the served directory
fn safe_file_name(name: &str) -> Option<&str> {
    let ok = !name.is_empty() && !name.contains('/') && !name.contains('\\') && name != "." && name != "..";
    ok.then_some(name)
}

fn files_route(request: &Request, name: &str, directory: Option<&Path>) -> Vec<u8> {
    let (Some(dir), Some(name)) = (directory, safe_file_name(name)) else {
        return STATUS_NOT_FOUND.as_bytes().to_vec();
    };
    let path = dir.join(name);

    match request.method.as_deref() {
        Some("GET") => match fs::read(&path) {
            Ok(data) => text_response(CONTENT_TYPE_FILE, &data),
            Err(_) => STATUS_NOT_FOUND.as_bytes().to_vec(),
        },
        Some("POST") => match fs::write(&path, &request.body) {
            Ok(()) => STATUS_CREATED.as_bytes().to_vec(),
            Err(_) => STATUS_INTERNAL_SERVER_ERROR.as_bytes().to_vec(),
        },
        _ => STATUS_METHOD_NOT_ALLOWED.as_bytes().to_vec(),
    }
}

/// Route a request to its response bytes
pub fn build_response(request: &Request, directory: Option<&Path>) -> Vec<u8> {
    let Some(path) = request.path.as_deref() else {
        return STATUS_INTERNAL_SERVER_ERROR.as_bytes().to_vec();
    };

    if path == "/" {
        return format!("{}\r\n", STATUS_OK).into_bytes();
    }
    if path.starts_with("/user-agent") {
        let agent = request.user_agent.as_deref().unwrap_or("");
        return text_response(CONTENT_TYPE_TEXT, agent.as_bytes());
    }
    if let Some(rest) = path.strip_prefix("/echo/") {
        return text_response(CONTENT_TYPE_TEXT, rest.as_bytes());
    }
    if let Some(name) = path.strip_prefix("/files/") {
        return files_route(request, name, directory);
    }
    STATUS_NOT_FOUND.as_bytes().to_vec()
}

/// Render control characters as their backslash escapes, for logging raw
/// request buffers on one line
pub fn escape_raw(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\n' => out.push_str("\\n"),
            '\t' => out.push_str("\\t"),
            '\x0B' => out.push_str("\\v"),
            '\x0C' => out.push_str("\\f"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\r' => out.push_str("\\r"),
            c => out.push(c),
        }
    }
    out
}
