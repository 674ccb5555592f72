pub mod appointment;
pub mod professional;
pub mod service;
pub mod store_config;

pub use appointment::{Appointment, AppointmentStatus, BookedInterval};
pub use professional::Professional;
pub use service::Service;
pub use store_config::{BusinessHours, Colors, Contact, StoreConfig};
