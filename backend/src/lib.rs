//! # Matrix API - validate-and-reduce service for CSV square matrices
//!
//! Uploads a CSV matrix, checks it is a non-empty square grid of integers,
//! and answers with one of five results.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────┐     ┌─────────────┐     ┌─────────────┐     ┌─────────────┐
//! │  CSV upload │────▶│   Parser    │────▶│   Service   │────▶│ Text result │
//! │ (multipart) │     │ (validate)  │     │ (fold/echo) │     │             │
//! └─────────────┘     └─────────────┘     └─────────────┘     └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use matrix_api::{MatrixProcessor, StreamingMatrixService};
//!
//! #[tokio::main]
//! async fn main() {
//!     let svc = StreamingMatrixService::default();
//!     let total = svc.sum("1,2\n3,4".as_bytes()).await.unwrap();
//!     println!("sum = {}", total);
//! }
//! ```
//!
//! ## Modules
//!
//! - [`error`] - Domain and server error types
//! - [`models`] - The [`Matrix`] grid
//! - [`parser`] - CSV loading and shape validation
//! - [`transform`] - Rendering and reductions
//! - [`service`] - Serial and streaming processors
//! - [`config`] - Environment configuration
//! - [`api`] - HTTP API server

// Core modules
pub mod config;
pub mod error;
pub mod models;

// Parsing
pub mod parser;

// Transformation
pub mod transform;

// Processing strategies
pub mod service;

// HTTP API
pub mod api;

// =============================================================================
// Re-exports - Error types
// =============================================================================

pub use error::{ConfigError, MatrixError, MatrixResult, ServerError, ServerResult};

// =============================================================================
// Re-exports - Models and parsing
// =============================================================================

pub use models::Matrix;
pub use parser::{for_each_value, load_matrix, load_matrix_file, ShapeTracker};

// =============================================================================
// Re-exports - Transform
// =============================================================================

pub use transform::{echo, invert, Flatten, Product, Reducer, Sum};

// =============================================================================
// Re-exports - Services
// =============================================================================

pub use service::{
    stream_matrix, MatrixProcessor, MatrixStream, SerialMatrixService, StreamingMatrixService,
};

pub use config::{ServerConfig, Strategy};

// Server
pub mod server {
    pub use crate::api::server::start_server;
}
