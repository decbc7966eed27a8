//! # Route Modules
//!
//! Repository routes are served by a single fallback handler so that they
//! can live under any context path; health checks are mounted in
//! [`crate::app`].

pub mod files;
pub mod settings;
