pub mod availability;
pub mod booking;
pub mod catalog;
pub mod circuit_breaker;
pub mod events;
pub mod notification;

pub use availability::AvailabilityService;
pub use booking::BookingEngine;
pub use catalog::VenueCatalog;
pub use events::EventService;
pub use notification::{NotificationDispatcher, Notifier};
