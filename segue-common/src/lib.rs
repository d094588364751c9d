//! # Segue Common Library
//!
//! Shared code for the Segue AI DJ daemon:
//! - Domain types (Track, TrackAnalysis, TransitionPlan)
//! - Event types (DjEvent enum)
//! - Fade curve definitions and calculations
//! - Configuration loading

pub mod config;
pub mod error;
pub mod events;
pub mod fade;
pub mod types;

pub use error::{Error, Result};
pub use fade::FadeCurve;
