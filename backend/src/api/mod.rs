//! HTTP API module.
//!
//! This module provides the HTTP server, upload plumbing and API types for the
//! matrix backend.

pub mod logs;
pub mod server;
pub mod types;
pub mod upload;

pub use logs::*;
pub use server::{router, serve, start_server};
pub use types::*;
