//! # pilot-client
//!
//! Typed HTTP client for the Pilot agent service:
//!
//! - [`ApiClient`]: session CRUD, message/status calls, and the per-session
//!   step endpoint
//! - Retrying transport: rate limits and 5xx-class responses are retried
//!   with exponential backoff plus jitter, honoring `Retry-After`
//! - [`stream::SessionEvent`]: live-update SSE stream consumption that stops
//!   at the terminal `done`/`error` event

#![deny(unsafe_code)]

pub mod http;
pub mod sessions;
pub mod stream;

pub use http::ApiClient;
pub use stream::SessionEvent;
