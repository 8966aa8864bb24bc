//! # Flint
//!
//! **Flint** is an embeddable, Sinatra-style HTTP route matching and
//! request-dispatch engine. Client code registers handlers and filters
//! against (HTTP method, path spec, accept type) triples; the engine
//! matches inbound requests against those registrations, extracts path
//! parameters, negotiates content type, and runs the matched before-filters,
//! handler, and after-filters with well-defined halt and error semantics.
//!
//! ## Architecture
//!
//! The library is organized into several key modules:
//!
//! - **[`registry`]** - Insertion-ordered route table with lock-free
//!   per-request snapshots
//! - **[`router`]** - Path pattern compilation, request matching, and
//!   accept-type negotiation
//! - **[`dispatcher`]** - The filter/handler execution protocol (halt,
//!   fault, and body-visibility semantics)
//! - **[`engine`]** - The public facade tying registration and dispatch
//!   together into an explicit, instance-scoped engine
//! - **[`server`]** - Request/response descriptors, per-request contexts,
//!   and a thread-per-request embedded server built on `tiny_http`
//! - **[`runtime_config`]** - Engine configuration with environment
//!   variable overrides
//!
//! ## Request Handling Flow
//!
//! ```text
//! transport ── HttpRequest ──► Engine::dispatch
//!                                │
//!                                ├─ RequestContext built (headers, cookies,
//!                                │  query params; body stays lazy)
//!                                ├─ Router scans one registry snapshot:
//!                                │  before-filters, first handler, after-
//!                                │  filters, each with its own bindings
//!                                ├─ Dispatcher runs the chain:
//!                                │  RUN_BEFORE* → RUN_HANDLER → RUN_AFTER*
//!                                │  (halt or fault short-circuits)
//!                                └─ FINALIZE ──► HttpResponse ── transport
//! ```
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use flint::{halt, Engine, HttpServer};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let engine = Arc::new(Engine::new());
//!
//! engine.before("/admin/*", |req, _res| {
//!     if req.header("authorization").is_none() {
//!         return Err(halt(401, "Go away!"));
//!     }
//!     Ok(None)
//! })?;
//!
//! engine.get("/hello/:name", |req, _res| {
//!     Ok(Some(format!("Hello {}!", req.param("name").unwrap_or("world"))))
//! })?;
//!
//! engine.after("/hello/*", |_req, res| {
//!     res.set_header("X-Greeted", "true");
//!     Ok(None)
//! })?;
//!
//! // Registration never starts a listener; that is an explicit step.
//! let handle = HttpServer::new(Arc::clone(&engine)).start("127.0.0.1:4567")?;
//! handle.join().ok();
//! # Ok(())
//! # }
//! ```
//!
//! ## Semantics at a Glance
//!
//! - Path specs: `/` separated; `:name` binds one non-empty, percent-decoded
//!   segment; a trailing `*` captures the (possibly empty) remainder.
//! - Registration order is significant: filters run in registration order
//!   and the first-registered matching handler wins.
//! - Each filter/handler execution sees the parameters bound by its *own*
//!   pattern alignment, never a merge of other entries' bindings.
//! - The request body is materialized once and cached, so before-filters,
//!   the handler, and after-filters all observe identical bytes over a
//!   single-pass transport stream.
//! - `dispatch` never fails outward: no match is a 404, `halt(status, body)`
//!   is honored verbatim, and an unhandled error or panic becomes a generic
//!   500 with the detail logged via `tracing`.
//! - Engines are plain values; independent engines coexist in one process.

pub mod dispatcher;
pub mod engine;
pub mod registry;
pub mod router;
pub mod runtime_config;
pub mod server;

pub use dispatcher::{halt, Handler, HandlerResult, Interrupt};
pub use engine::Engine;
pub use registry::{MethodRule, RouteKind};
pub use router::{PatternError, RoutePattern};
pub use runtime_config::EngineConfig;
pub use server::{HttpRequest, HttpResponse, HttpServer, RequestContext, ResponseContext, ServerHandle};
