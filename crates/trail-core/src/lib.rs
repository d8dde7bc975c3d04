//! trail-core library.
//!
//! Domain model, SQLite store, audit-trail subsystem, and visibility
//! scoping for the trail workflow backend.
//!
//! # Conventions
//!
//! - **Errors**: Use `anyhow::Result` with `.context()` at call sites;
//!   `error::ErrorCode` provides machine-readable codes for the API layer.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `error!`, `debug!`, `trace!`).

pub mod audit;
pub mod clock;
pub mod config;
pub mod db;
pub mod error;
pub mod history;
pub mod model;
pub mod page;
pub mod scope;
pub mod service;
