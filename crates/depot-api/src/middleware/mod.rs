//! # Middleware Modules
//!
//! Tower middleware layers for the repository server.

pub mod metrics;
pub mod tracing_layer;
