//! HTTP handlers

pub mod availability;
pub mod booking;
pub mod health;
pub mod reporting;
pub mod time_slot;

pub use availability::*;
pub use booking::*;
pub use health::*;
pub use reporting::*;
pub use time_slot::*;
