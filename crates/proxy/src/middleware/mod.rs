//! HTTP middleware stack for the proxy.
//!
//! # Middleware Order (bottom to top in Router)
//!
//! 1. Sentry layer (capture errors)
//! 2. `TraceLayer` (request tracing)
//! 3. Request ID (add unique ID to each request)
//! 4. CORS (the storefront runs on a different origin)
//! 5. Rate limiting (governor)
//!
//! Authentication is not a layer: routes that need a caller use the
//! [`Caller`]/[`AdminCaller`] extractors so the requirement is visible in the
//! handler signature.

pub mod auth;
pub mod rate_limit;
pub mod request_id;

pub use auth::{AdminCaller, Caller};
pub use rate_limit::api_rate_limiter;
pub use request_id::request_id_middleware;
