//! Foundation types for FoodBlock.
//!
//! This crate provides the value model and identity type shared by every
//! other FoodBlock crate.
//!
//! # Key Types
//!
//! - [`Value`] — Closed tagged value tree carried in block `state` and `refs`
//! - [`BlockHash`] — Content-addressed identifier (SHA-256, 64-hex on the wire)

pub mod error;
pub mod hash;
pub mod value;

pub use error::TypeError;
pub use hash::BlockHash;
pub use value::{strip_nulls, Map, Value};
