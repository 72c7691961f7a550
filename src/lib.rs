//! Race catalog: a REST backend for playable races, their age profiles,
//! proficiencies, languages, traits and subraces, backed by PostgreSQL.

pub mod app;
pub mod config;
pub mod error;
pub mod handlers;
pub mod model;
pub mod repository;
pub mod routes;
pub mod service;
pub mod state;
pub mod store;

pub use app::{build_app, init_tracing};
pub use config::AppConfig;
pub use error::{ConfigError, ErrorKind, RepoError, ServiceError, ValidationError};
pub use model::{AbilityScoreBonuses, Age, Language, Proficiency, Race, Size, Subrace, Trait};
pub use repository::{PgRaceRepository, RaceRepository};
pub use routes::{common_routes, common_routes_with_ready, openapi_routes, race_routes, ApiDoc};
pub use service::RaceService;
pub use state::AppState;
pub use store::{ensure_database_exists, ensure_race_tables};
