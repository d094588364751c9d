//! # Segue DJ daemon (segue-dj)
//!
//! AI-driven auto-transition engine for a remote streaming player.
//!
//! **Purpose:** Watch playback position, characterize the current and next
//! tracks via an AI analysis service, plan a transition, and execute a
//! time-accurate equal-power fade/handoff, masking the remote switch gap
//! with procedurally generated bridge percussion.
//!
//! **Architecture:** tokio daemon with an HTTP/SSE control interface;
//! remote playback and AI analysis are consumed through capability traits.

pub mod ai;
pub mod analysis;
pub mod api;
pub mod bridge;
pub mod engine;
pub mod error;
pub mod monitor;
pub mod planner;
pub mod player;
pub mod queue;
pub mod state;

pub use error::{Error, Result};
pub use state::SharedState;
