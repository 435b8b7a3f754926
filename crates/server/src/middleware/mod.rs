//! HTTP middleware and extractors.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS

pub mod actor;
pub mod request_id;

pub use actor::{Actor, OptionalActor, USER_ID_HEADER};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
