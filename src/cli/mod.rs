//! # CLI Module
//!
//! User-facing commands for gramfollow. Each command is a thin shell over
//! the engine and management layers: it gathers input, builds the real API
//! client, drives the operation, and presents the result.
//!
//! ## Commands
//!
//! - [`login`] - Establishes a session (password or adopted session token)
//!   and caches it for later runs
//! - [`status`] - Probes the cached session for liveness
//! - [`follow_targets`] - Runs a follow batch over a target list
//!
//! ## Architecture
//!
//! ```text
//! CLI Layer (input gathering, output formatting)
//!     ↓
//! Engine Layer (run controller, resolution, follow execution)
//!     ↓
//! Instagram Layer (API client)
//! ```
//!
//! Errors surface here as user-facing messages: per-item problems are
//! reported inline by the engine's sink, fatal conditions terminate the
//! command through the `error!` macro.

mod follow;
mod login;
mod status;

pub use follow::follow_targets;
pub use login::login;
pub use status::status;
