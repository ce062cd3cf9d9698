//! # Middleware
//!
//! - `tracing_layer` — per-request tracing spans.
//!
//! Bearer-token authentication lives in [`crate::auth`].

pub mod tracing_layer;
