pub mod layout;
pub mod catalog;
pub mod registry;
pub mod schedule;
pub mod reservation;
pub mod lifecycle;
pub mod cleanup;
pub mod payment;
