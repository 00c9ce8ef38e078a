//! Configuration module for the dispatch layer
//!
//! Configuration is loaded from TOML and may be overridden from `DISPATCH_*`
//! environment variables.

pub mod types;

pub use types::*;
