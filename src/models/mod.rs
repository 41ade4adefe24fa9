pub mod status;
pub mod catalog;
pub mod theater;
pub mod seat;
pub mod showtime;
pub mod booking;

pub use status::EntityStatus;
pub use catalog::{Movie, NewMovie, ScreenType, SeatCategory, TheaterType};
pub use theater::{NewTheater, NewTheaterScreen, Theater, TheaterScreen, TheaterScreenUpdate, TheaterUpdate};
pub use seat::{CreateSeatsRequest, Seat, SeatBand};
pub use showtime::{MovieSchedule, NewMovieSchedule, NewShowtime, Showtime};
pub use booking::{Booking, BookingSeat, BookingStatus, BookingWithSeats};
