//! services/api/src/lib.rs
//!
//! The HTTP service for the start page: configuration, port adapters and the
//! axum router. The binaries in `src/bin` only wire these together.

pub mod adapters;
pub mod config;
pub mod error;
pub mod web;
