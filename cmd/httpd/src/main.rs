//! # tpool HTTP/1.1 toy server
//!
//! One pool job per accepted connection. The accept loop runs on the main
//! thread and only submits; each job reads the request, builds the
//! response and closes the socket.
//!
//! ## Routes
//!
//! | Path              | Response |
//! |-------------------|----------|
//! | `/`               | 200, empty |
//! | `/user-agent`     | 200, the request's User-Agent |
//! | `/echo/{s}`       | 200, `{s}` |
//! | `/files/{name}`   | GET reads, POST writes under `--directory` |
//!
//! ## Usage
//!
//!     cargo run -p tpool-httpd --release -- [--directory /tmp/] [--port 4221] [--workers 4]
//!
//! SIGINT/SIGTERM drain the pool (`wait`) and tear it down.

mod http;

use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpListener, TcpStream};
use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use nix::sys::signal::{self, SigHandler, Signal};
use tpool::{env_get, kdebug, kerror, kinfo, kprintln, kwarn, PoolConfig, ThreadPool};

// ── Configuration ──

const DEFAULT_PORT: u16 = 4221;
const MAX_REQUEST_SIZE: usize = 64 * 1024;
const READ_CHUNK: usize = 4096;
const ACCEPT_IDLE: Duration = Duration::from_millis(10);
const IO_TIMEOUT: Duration = Duration::from_secs(5);

static RUNNING: AtomicBool = AtomicBool::new(true);
static TOTAL_CONNECTIONS: AtomicU64 = AtomicU64::new(0);
static FAILED_SUBMISSIONS: AtomicU64 = AtomicU64::new(0);

struct Options {
    port: u16,
    workers: usize,
    directory: Option<PathBuf>,
}

fn parse_options() -> Options {
    let mut opts = Options {
        port: env_get("HTTPD_PORT", DEFAULT_PORT),
        workers: env_get("TPOOL_NUM_WORKERS", 4),
        directory: None,
    };

    let args: Vec<String> = std::env::args().collect();
    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--directory" | "-d" => {
                i += 1;
                opts.directory = args.get(i).map(PathBuf::from);
            }
            "--port" | "-p" => {
                i += 1;
                if let Some(p) = args.get(i).and_then(|s| s.parse().ok()) { opts.port = p; }
            }
            "--workers" | "-w" => {
                i += 1;
                if let Some(w) = args.get(i).and_then(|s| s.parse().ok()) { opts.workers = w; }
            }
            other => kwarn!("ignoring unknown argument {:?}", other),
        }
        i += 1;
    }
    opts
}

// ── Per-connection job ──

/// Read one request: the header block plus up to Content-Length body bytes
fn read_request(stream: &mut TcpStream) -> io::Result<Vec<u8>> {
    let mut buf = Vec::with_capacity(READ_CHUNK);
    let mut chunk = [0u8; READ_CHUNK];

    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        buf.extend_from_slice(&chunk[..n]);

        if let Some(end) = http::header_end(&buf) {
            let wanted = http::parse_request(&buf[..end]).content_length.unwrap_or(0);
            if buf.len() >= end + wanted {
                break;
            }
        }
        if buf.len() >= MAX_REQUEST_SIZE {
            break;
        }
    }
    Ok(buf)
}

/// Bound both directions so a stalled client cannot hold a worker forever
fn apply_io_timeouts(stream: &TcpStream, timeout: Duration) -> io::Result<()> {
    stream.set_read_timeout(Some(timeout))?;
    stream.set_write_timeout(Some(timeout))
}

fn serve_client((mut stream, peer, directory): (TcpStream, SocketAddr, Arc<Option<PathBuf>>)) {
    if let Err(e) = apply_io_timeouts(&stream, IO_TIMEOUT) {
        kwarn!("dropping {}: could not set socket timeouts: {}", peer, e);
        return;
    }

    let raw = match read_request(&mut stream) {
        Ok(raw) => raw,
        Err(e) => {
            kerror!("receive from {} failed: {}", peer, e);
            return;
        }
    };
    kdebug!("request from {}: {}", peer, http::escape_raw(&String::from_utf8_lossy(&raw)));

    let request = http::parse_request(&raw);
    kdebug!(
        "{} {} {} host={:?} accept={:?} accept-encoding={:?}",
        request.method.as_deref().unwrap_or("-"),
        request.path.as_deref().unwrap_or("-"),
        request.version.as_deref().unwrap_or("-"),
        request.host,
        request.accept,
        request.accept_encoding
    );
    let response = http::build_response(&request, directory.as_ref().as_deref());

    if let Err(e) = stream.write_all(&response) {
        kerror!("send to {} failed: {}", peer, e);
    }
    let _ = stream.shutdown(Shutdown::Both);
}

// ── Accept loop ──

fn accept_loop(listener: &TcpListener, pool: &ThreadPool, directory: &Arc<Option<PathBuf>>) {
    while RUNNING.load(Ordering::Relaxed) {
        match listener.accept() {
            Ok((stream, peer)) => {
                TOTAL_CONNECTIONS.fetch_add(1, Ordering::Relaxed);
                kinfo!("client connected: {}", peer);
                if let Err(e) = stream.set_nonblocking(false) {
                    kerror!("could not configure socket for {}: {}", peer, e);
                    continue;
                }
                if let Err(e) = pool.submit(serve_client, (stream, peer, Arc::clone(directory))) {
                    // The connection is dropped, which closes it.
                    FAILED_SUBMISSIONS.fetch_add(1, Ordering::Relaxed);
                    kerror!("failed to queue connection from {}: {}", peer, e);
                }
            }
            Err(e) if e.kind() == io::ErrorKind::WouldBlock => {
                std::thread::sleep(ACCEPT_IDLE);
            }
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => kerror!("client connection failed: {}", e),
        }
    }
}

extern "C" fn handle_shutdown(_sig: nix::libc::c_int) {
    RUNNING.store(false, Ordering::Relaxed);
}

fn install_signal_handlers() -> nix::Result<()> {
    // Safety: the handler only stores to an atomic, which is
    // async-signal-safe.
    unsafe {
        signal::signal(Signal::SIGINT, SigHandler::Handler(handle_shutdown))?;
        signal::signal(Signal::SIGTERM, SigHandler::Handler(handle_shutdown))?;
        signal::signal(Signal::SIGPIPE, SigHandler::SigIgn)?;
    }
    Ok(())
}

// ── Main ──

fn main() {
    let opts = parse_options();

    if let Err(e) = install_signal_handlers() {
        kwarn!("signal setup failed, Ctrl-C will not drain: {}", e);
    }
    if let Some(dir) = &opts.directory {
        kinfo!("directory path set: {}", dir.display());
    }

    let config = PoolConfig::from_env().num_workers(opts.workers);
    let pool = match ThreadPool::with_config(config) {
        Ok(pool) => pool,
        Err(e) => {
            kerror!("thread pool creation failed: {}", e);
            std::process::exit(1);
        }
    };
    kinfo!("thread pool created: {} threads", pool.num_workers());

    let listener = match TcpListener::bind(("0.0.0.0", opts.port)) {
        Ok(l) => l,
        Err(e) => {
            kerror!("bind failed: {}", e);
            std::process::exit(1);
        }
    };
    if let Err(e) = listener.set_nonblocking(true) {
        kerror!("listener setup failed: {}", e);
        std::process::exit(1);
    }
    kinfo!("server listening: 0.0.0.0:{}", opts.port);

    let directory = Arc::new(opts.directory);
    accept_loop(&listener, &pool, &directory);

    kinfo!("draining {} queued connection(s)...", pool.queued_jobs());
    pool.wait();
    kinfo!("killing threadpool...");
    pool.destroy();

    // Printed regardless of TPOOL_LOG_LEVEL.
    kprintln!(
        "shutdown: {} connections, {} rejected",
        TOTAL_CONNECTIONS.load(Ordering::Relaxed),
        FAILED_SUBMISSIONS.load(Ordering::Relaxed)
    );
}
