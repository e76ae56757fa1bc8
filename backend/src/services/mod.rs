//! Business logic services for the warehouse booking platform

pub mod availability;
pub mod booking;
pub mod booking_ledger;
pub mod notification;
pub mod reporting;
pub mod time_slot;
pub mod warehouse;

pub use availability::AvailabilityService;
pub use booking::BookingService;
pub use booking_ledger::BookingLedger;
pub use notification::NotificationService;
pub use reporting::ReportingService;
pub use time_slot::TimeSlotService;
pub use warehouse::WarehouseService;
