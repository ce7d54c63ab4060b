//! Spraycast is a webhook broadcast reverse proxy.
//!
//! It accepts one inbound HTTP request and replicates it to every backend
//! origin in a dynamically maintained set, without merging or relaying the
//! backend responses back to the caller. The intended use is fanning out
//! webhook-style events (CI triggers and the like) to several independent
//! receivers that should all observe the same payload.
//!
//! # Architecture
//!
//! - [`cli`] -- Command-line argument parsing with clap derive macros.
//! - [`cmd`] -- Subcommand dispatch and execution (run, health).
//! - [`error`] -- Unified error types using `thiserror`.
//! - [`logging`] -- Structured tracing setup with JSON and pretty-print output.
//! - [`metrics`] -- The [`MetricsSink`](metrics::MetricsSink) collaborator
//!   trait and its in-memory implementation.
//! - [`proxy`] -- Core broadcast engine: body capture, webhook signature
//!   verification, the backend registry, and concurrent fan-out.
//! - [`server`] -- Axum router setup, the outbound HTTP client, and
//!   graceful shutdown.

// Binary crate — public functions are internal, not consumed by external users.
#![allow(clippy::missing_errors_doc)]

pub mod cli;
pub mod cmd;
pub mod error;
pub mod logging;
pub mod metrics;
pub mod proxy;
pub mod server;
