//! Transport layer: request/response descriptors, per-request contexts, and
//! the embedded HTTP server bootstrap.

pub mod http_server;
pub mod request;
pub mod response;

pub use http_server::{HttpServer, ServerHandle};
pub use request::{parse_cookies, parse_query_params, HttpRequest, RequestContext};
pub use response::{HttpResponse, ResponseContext};
