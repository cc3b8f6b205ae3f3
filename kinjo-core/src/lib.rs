//! # Kinjo Core
//!
//! Fundamental building blocks for the Kinjo ANN index library:
//! the dense vector value type and the shared error taxonomy.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────┐
//! │                   kinjo-core                    │
//! ├─────────────────────────────────────────────────┤
//! │  • vector     - Dense f64 vector value type     │
//! │  • error      - Error taxonomy + Result alias   │
//! └─────────────────────────────────────────────────┘
//! ```
//!
//! Index implementations, distance metrics and the evaluation harness live
//! in `kinjo-index`.

pub mod error;
pub mod vector;

// Re-export commonly used types
pub use error::{Error, Result};
pub use vector::Vector;

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
