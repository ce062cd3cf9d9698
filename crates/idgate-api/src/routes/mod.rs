//! # API Route Modules
//!
//! - `auth` — credential operations (login, register, refresh, logout) and
//!   the caller's identity.
//! - `health` — liveness and provider circuit state.

pub mod auth;
pub mod health;
