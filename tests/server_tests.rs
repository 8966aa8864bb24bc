//! End-to-end tests through the embedded `tiny_http` bootstrap: a real
//! listener, raw TCP clients, and the full parse → match → dispatch →
//! respond path.

use flint::{halt, Engine, EngineConfig, HttpServer};
use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Install a fmt subscriber so `tracing` output from the engine and the
/// accept loop lands in the captured test output. Safe to call from every
/// test; only the first installation wins.
fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("flint=debug")),
        )
        .with_test_writer()
        .try_init();
}

fn send_raw(addr: std::net::SocketAddr, request: &str) -> (u16, String) {
    let mut stream = TcpStream::connect(addr).expect("connect");
    stream.write_all(request.as_bytes()).expect("write");
    let mut raw = String::new();
    stream.read_to_string(&mut raw).expect("read");
    let status = raw
        .split_whitespace()
        .nth(1)
        .and_then(|s| s.parse().ok())
        .expect("status line");
    let body = raw
        .split_once("\r\n\r\n")
        .map(|(_, b)| b.to_string())
        .unwrap_or_default();
    (status, body)
}

fn demo_engine() -> Arc<Engine> {
    let engine = Arc::new(Engine::new());
    engine
        .before("/admin/*", |req, _res| {
            if req.header("authorization").is_none() {
                return Err(halt(401, "Go away!"));
            }
            Ok(None)
        })
        .unwrap();
    engine
        .get("/hello/:name", |req, _res| {
            Ok(Some(format!("Hello {}!", req.param("name").unwrap_or(""))))
        })
        .unwrap();
    engine
        .post("/echo", |req, _res| Ok(Some(req.body())))
        .unwrap();
    engine
        .after("/hello/*", |_req, res| {
            res.set_header("X-Greeted", "true");
            Ok(None)
        })
        .unwrap();
    engine
}

#[test]
fn test_end_to_end_round_trip() {
    init_tracing();
    let engine = demo_engine();
    let handle = HttpServer::new(Arc::clone(&engine))
        .start("127.0.0.1:0")
        .expect("bind");
    handle.wait_ready().expect("server ready");
    let addr = handle.addr();

    // Route with a bound parameter.
    let (status, body) = send_raw(
        addr,
        "GET /hello/world HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(status, 200);
    assert_eq!(body, "Hello world!");

    // A halted request carries the halt status and body verbatim.
    let (status, body) = send_raw(
        addr,
        "GET /admin/console HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(status, 401);
    assert_eq!(body, "Go away!");

    // Unmatched path.
    let (status, body) = send_raw(
        addr,
        "GET /nowhere HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(status, 404);
    assert_eq!(body, "Not found");

    // Body flows transport → context cache → handler return.
    let (status, body) = send_raw(
        addr,
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 16\r\nConnection: close\r\n\r\nthe body content",
    );
    assert_eq!(status, 200);
    assert_eq!(body, "the body content");

    handle.stop();
}

#[test]
fn test_after_filter_header_reaches_the_wire() {
    init_tracing();
    let engine = demo_engine();
    let handle = HttpServer::new(Arc::clone(&engine))
        .start("127.0.0.1:0")
        .expect("bind");
    handle.wait_ready().expect("server ready");

    let mut stream = TcpStream::connect(handle.addr()).expect("connect");
    stream
        .write_all(b"GET /hello/world HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n")
        .expect("write");
    let mut raw = String::new();
    stream.read_to_string(&mut raw).expect("read");
    let headers = raw.split_once("\r\n\r\n").map(|(h, _)| h).unwrap_or("");
    assert!(
        headers.to_ascii_lowercase().contains("x-greeted: true"),
        "missing after-filter header in: {headers}"
    );

    handle.stop();
}

#[test]
fn test_registrations_after_start_are_visible_to_new_requests() {
    init_tracing();
    let engine = demo_engine();
    let handle = HttpServer::new(Arc::clone(&engine))
        .start("127.0.0.1:0")
        .expect("bind");
    handle.wait_ready().expect("server ready");
    let addr = handle.addr();

    let (status, _) = send_raw(
        addr,
        "GET /late HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(status, 404);

    engine.get("/late", |_req, _res| Ok(Some("late".to_string()))).unwrap();

    let (status, body) = send_raw(
        addr,
        "GET /late HTTP/1.1\r\nHost: localhost\r\nConnection: close\r\n\r\n",
    );
    assert_eq!(status, 200);
    assert_eq!(body, "late");

    handle.stop();
}

#[test]
fn test_body_limit_caps_the_transport_read() {
    init_tracing();
    let engine = Arc::new(Engine::with_config(EngineConfig {
        body_limit: 8,
        ..EngineConfig::default()
    }));
    engine
        .post("/echo", |req, _res| Ok(Some(req.body())))
        .unwrap();
    let handle = HttpServer::new(Arc::clone(&engine))
        .start("127.0.0.1:0")
        .expect("bind");
    handle.wait_ready().expect("server ready");

    // Declared 16 bytes, but only the first 8 are ever buffered.
    let (status, body) = send_raw(
        handle.addr(),
        "POST /echo HTTP/1.1\r\nHost: localhost\r\nContent-Length: 16\r\nConnection: close\r\n\r\nthe body content",
    );
    assert_eq!(status, 200);
    assert_eq!(body, "the body");

    handle.stop();
}
