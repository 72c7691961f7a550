//! RaceService: validation, uniqueness rules and error classification over the repository.

mod race;
pub mod validation;
pub use race::RaceService;
pub use validation::validate_race;
