//! HTTP API
//!
//! REST control surface plus an SSE event stream, served by axum.

pub mod handlers;
pub mod server;
pub mod sse;

pub use server::{run, AppContext};
