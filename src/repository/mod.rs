//! Race persistence: the repository contract and its PostgreSQL implementation.

mod diff;
mod postgres;

pub use diff::{diff_keys, SetDiff};
pub use postgres::PgRaceRepository;

use crate::error::RepoError;
use crate::model::{Race, Subrace};
use async_trait::async_trait;
use std::collections::HashMap;
use uuid::Uuid;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait RaceRepository: Send + Sync {
    async fn get_all(&self) -> Result<Vec<Race>, RepoError>;
    async fn get_by_id(&self, id: Uuid) -> Result<Race, RepoError>;
    async fn get_by_name(&self, name: &str) -> Result<Race, RepoError>;

    /// Insert the race with its age, subraces and dictionary links in one transaction.
    async fn create(&self, race: &Race) -> Result<Race, RepoError>;

    /// Overwrite scalar fields and replace every association in one transaction.
    async fn update(&self, id: Uuid, race: &Race) -> Result<Race, RepoError>;

    async fn delete(&self, id: Uuid) -> Result<(), RepoError>;

    async fn add_subrace(&self, race_id: Uuid, subrace: &Subrace) -> Result<Subrace, RepoError>;
    async fn remove_subrace(&self, race_id: Uuid, subrace_id: Uuid) -> Result<(), RepoError>;
    async fn add_trait(&self, race_id: Uuid, trait_id: Uuid) -> Result<(), RepoError>;
    async fn remove_trait(&self, race_id: Uuid, trait_id: Uuid) -> Result<(), RepoError>;

    /// Races matching every criterion. Only `size`, `speed` and `alignment` are accepted.
    async fn search(&self, criteria: &HashMap<String, String>) -> Result<Vec<Race>, RepoError>;
}
