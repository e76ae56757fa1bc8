//! Shared types and models for the warehouse booking platform
//!
//! This crate contains the booking rules shared between the backend, the
//! portals (via WASM), and other components of the system.

pub mod models;
pub mod types;
pub mod validation;

pub use models::*;
pub use types::*;
pub use validation::*;
