//! # notebase-core
//!
//! Core types, traits, and abstractions for notebase.
//!
//! This crate provides the domain model and the repository trait that the
//! database gateway implements and the HTTP service consumes.

pub mod defaults;
pub mod error;
pub mod logging;
pub mod models;
pub mod traits;

// Re-export commonly used types at crate root
pub use error::{Error, Result};
pub use models::*;
pub use traits::*;
