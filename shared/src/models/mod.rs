//! Domain models for the warehouse booking platform

mod availability;
mod booking;
mod qr;
mod time_slot;
mod warehouse;

pub use availability::*;
pub use booking::*;
pub use qr::*;
pub use time_slot::*;
pub use warehouse::*;
