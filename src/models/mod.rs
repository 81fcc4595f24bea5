pub mod user;
pub mod venue;
pub mod event;
pub mod seat;
pub mod booking;
pub mod availability;

pub use user::{Actor, UserRole};
pub use venue::Venue;
pub use event::{Event, EventType, NewEvent};
pub use seat::{NewSeat, Seat, SeatView};
pub use booking::{Booking, BookingStatus, NewBooking, Ticket};
pub use availability::Availability;
