//! trail-server library: HTTP JSON API over `trail-core`.
//!
//! Exposed as a library so the integration tests can drive the router
//! in-process; the `trail` binary in `main.rs` is a thin CLI shell.

pub mod seed;
pub mod serve;
