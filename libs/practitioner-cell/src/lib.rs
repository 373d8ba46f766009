pub mod error;
pub mod handlers;
pub mod interval;
pub mod local_time;
pub mod models;
pub mod repository;
pub mod router;
pub mod services;

pub use error::CalendarError;
pub use interval::Interval;
pub use models::*;
pub use repository::{
    InMemoryPractitionerRepo, InMemoryWorkingIntervalRepo, PractitionerRepo, RepositoryError,
    SupabasePractitionerRepo, SupabaseWorkingIntervalRepo, WorkingIntervalRepo,
};
pub use router::{practitioner_routes, PractitionerState};
pub use services::calendar::CalendarService;
