//! # asyncval Core
//!
//! Core types, errors, and configuration shared by the asyncval crates.
//!
//! This crate provides the foundational building blocks used by the cache engine:
//!
//! - **Config**: Capacity, default TTL, and maintenance interval settings
//! - **Errors**: Engine-level error type with context
//! - **Constants**: Defaults and environment variable names
//! - **Types**: Statistics reported by the engine
//! - **Traits**: The maintenance-trigger interface
//!
//! ## Example
//!
//! ```rust
//! use std::time::Duration;
//! use asyncval_core::CacheConfig;
//!
//! let config = CacheConfig::default()
//!     .with_max_items(500)
//!     .default_ttl(Duration::from_secs(60));
//! assert!(config.validate().is_ok());
//! ```

#![forbid(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms, clippy::all)]

pub mod config;
pub mod constants;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items at crate root
pub use config::CacheConfig;
pub use constants::*;
pub use error::{CacheError, Result};
pub use traits::*;
pub use types::*;
