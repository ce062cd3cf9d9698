#![deny(missing_docs)]

//! # idgate-core — Foundational Types for the idgate Gateway
//!
//! This crate defines the types every other crate in the workspace shares.
//! It performs no I/O and has no internal crate dependencies — only `serde`,
//! `serde_json`, `thiserror`, `chrono`, and `zeroize` from the ecosystem.
//!
//! ## Design Principles
//!
//! 1. **Credentials are transient.** A [`Credential`] is validated for shape
//!    at construction and holds its password in zeroizing memory. Nothing in
//!    the workspace persists one.
//!
//! 2. **Bundles are immutable.** A [`TokenBundle`] is created once by the
//!    token-exchange client and superseded, never updated, on refresh.
//!
//! 3. **One outcome shape.** Every credential operation returns
//!    [`AuthOutcome`]: either the value or an [`AuthFailure`] carrying an
//!    [`ErrorKind`] and a message that is always safe to show a caller.

pub mod credential;
pub mod error;
pub mod outcome;
pub mod token;

pub use credential::{validate_email, Credential, PasswordPolicy};
pub use error::ValidationError;
pub use outcome::{AuthFailure, AuthOutcome, ErrorKind, RejectionKind};
pub use token::TokenBundle;
