pub mod error;
pub mod handlers;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use error::AppointmentError;
pub use models::*;
pub use repository::{AppointmentRepo, InMemoryAppointmentRepo, SupabaseAppointmentRepo};
pub use router::{appointment_routes, availability_routes, AppointmentState};
pub use services::*;
