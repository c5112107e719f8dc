//! Error types shared across the navigation engine.

mod types;

pub use types::{NavError, Result};
