use std::io;
use std::io::Read;
use std::net::{SocketAddr, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tracing::{debug, error, warn};

use super::request::HttpRequest;
use crate::engine::Engine;

/// Consecutive `recv()` failures tolerated before the accept loop gives up.
const MAX_RECV_ERRORS: u32 = 5;

/// Embedded HTTP server bootstrap.
///
/// Thin transport glue around an [`Engine`]: accepts connections, parses
/// requests, feeds them through `dispatch`, and writes the response
/// descriptor back. One worker thread per inbound request; all matching and
/// dispatch work stays synchronous inside that thread.
///
/// Starting the listener is an explicit step taken after registration;
/// registering a route never spawns a server.
pub struct HttpServer {
    engine: Arc<Engine>,
}

/// Handle to a running HTTP server.
///
/// Provides methods for waiting until the server is ready, stopping it
/// gracefully, or joining the accept-loop thread.
pub struct ServerHandle {
    addr: SocketAddr,
    server: Arc<tiny_http::Server>,
    running: Arc<AtomicBool>,
    handle: thread::JoinHandle<()>,
}

impl ServerHandle {
    /// The address the listener actually bound (useful with port 0).
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Wait for the server to accept connections.
    ///
    /// Polls the bound address with TCP connects. Useful in tests to ensure
    /// the server is fully started before sending requests.
    ///
    /// # Errors
    ///
    /// Returns `TimedOut` if the server is not ready within ~250ms.
    pub fn wait_ready(&self) -> io::Result<()> {
        for _ in 0..50 {
            if TcpStream::connect(self.addr).is_ok() {
                return Ok(());
            }
            thread::sleep(Duration::from_millis(5));
        }
        Err(io::Error::new(io::ErrorKind::TimedOut, "server not ready"))
    }

    /// Stop accepting connections and wait for the accept loop to finish.
    ///
    /// In-flight request workers are left to complete on their own threads.
    pub fn stop(self) {
        self.running.store(false, Ordering::SeqCst);
        self.server.unblock();
        let _ = self.handle.join();
    }

    /// Block until the accept loop exits.
    ///
    /// # Errors
    ///
    /// Returns an error if the accept-loop thread panicked.
    pub fn join(self) -> thread::Result<()> {
        self.handle.join()
    }
}

impl HttpServer {
    pub fn new(engine: Arc<Engine>) -> Self {
        Self { engine }
    }

    /// Bind the listener and start the accept loop.
    ///
    /// # Errors
    ///
    /// Returns an error if the address is invalid or the port cannot be
    /// bound.
    pub fn start<A: ToSocketAddrs>(self, addr: A) -> io::Result<ServerHandle> {
        let addr = addr
            .to_socket_addrs()?
            .next()
            .ok_or_else(|| io::Error::new(io::ErrorKind::InvalidInput, "invalid address"))?;
        let server = tiny_http::Server::http(addr)
            .map_err(|e| io::Error::new(io::ErrorKind::AddrNotAvailable, e.to_string()))?;
        let bound = server
            .server_addr()
            .to_ip()
            .unwrap_or(addr);
        let server = Arc::new(server);
        let running = Arc::new(AtomicBool::new(true));

        let engine = Arc::clone(&self.engine);
        let loop_server = Arc::clone(&server);
        let loop_running = Arc::clone(&running);
        let handle = thread::spawn(move || {
            debug!(addr = %bound, "accept loop started");
            let mut recv_errors = 0u32;
            while loop_running.load(Ordering::SeqCst) {
                let request = match loop_server.recv() {
                    Ok(request) => request,
                    // recv() also unblocks with an error on shutdown.
                    Err(err) => {
                        if !loop_running.load(Ordering::SeqCst) {
                            break;
                        }
                        recv_errors += 1;
                        if recv_errors >= MAX_RECV_ERRORS {
                            error!(error = %err, "accept loop exiting after repeated recv failures");
                            loop_running.store(false, Ordering::SeqCst);
                            break;
                        }
                        warn!(error = %err, attempts = recv_errors, "accept loop recv failed");
                        thread::sleep(Duration::from_millis(10));
                        continue;
                    }
                };
                recv_errors = 0;
                let engine = Arc::clone(&engine);
                thread::spawn(move || handle_request(&engine, request));
            }
            debug!(addr = %bound, "accept loop stopped");
        });

        Ok(ServerHandle {
            addr: bound,
            server,
            running,
            handle,
        })
    }
}

/// Translate one transport request into the engine's descriptor, dispatch
/// it, and write the resulting response descriptor back.
fn handle_request(engine: &Engine, mut request: tiny_http::Request) {
    let method = request.method().to_string();
    let url = request.url().to_string();

    let mut descriptor = HttpRequest::new(method, url);
    for header in request.headers() {
        descriptor
            .headers
            .insert(header.field.to_string(), header.value.to_string());
    }
    // tiny_http's body reader borrows the request, which we still need for
    // responding, so the transport buffers the stream here, capped at the
    // engine's body limit. Lazy read-once caching remains an engine-level
    // contract.
    let limit = engine.config().body_limit;
    let mut body = Vec::new();
    if let Err(err) = request.as_reader().take(limit).read_to_end(&mut body) {
        error!(error = %err, "failed to read request body from transport");
    }
    descriptor = descriptor.body_bytes(body);

    let response = engine.dispatch(descriptor);

    let mut out = tiny_http::Response::from_data(response.body)
        .with_status_code(tiny_http::StatusCode(response.status));
    for (name, value) in &response.headers {
        if let Ok(header) = tiny_http::Header::from_bytes(name.as_bytes(), value.as_bytes()) {
            out = out.with_header(header);
        }
    }
    if let Err(err) = request.respond(out) {
        error!(error = %err, "failed to write response to transport");
    }
}
