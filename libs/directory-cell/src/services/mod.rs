pub mod facility;
pub mod seed;
pub mod subject;

pub use facility::{parse_timezone, FacilityDirectory, InMemoryFacilityDirectory, SupabaseFacilityDirectory};
pub use seed::DirectorySeed;
pub use subject::{InMemorySubjectDirectory, SubjectDirectory, SupabaseSubjectDirectory};
