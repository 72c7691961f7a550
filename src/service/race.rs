//! Business rules on top of [`RaceRepository`]: id checks, validation, name
//! uniqueness and error classification.

use super::validation::{validate_race, validate_subrace};
use crate::error::{ErrorKind, RepoError, ServiceError};
use crate::model::{Race, Subrace};
use crate::repository::RaceRepository;
use crate::store::RACE_NAME_CONSTRAINT;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Kind for a repository failure. `not_found` is the kind used when the missing
/// row is the subject of the request.
fn classify(err: &RepoError, not_found: ErrorKind) -> ErrorKind {
    match err {
        RepoError::NotFound(_) => not_found,
        RepoError::UnknownCriteria(_) | RepoError::InvalidCriteria { .. } | RepoError::ForeignSubrace(_) => {
            ErrorKind::BadRequest
        }
        RepoError::UniqueViolation(_) => ErrorKind::Conflict,
        RepoError::Db(_) => ErrorKind::InternalServer,
    }
}

fn repo_error(context: &str, err: RepoError) -> ServiceError {
    let kind = classify(&err, ErrorKind::NotFound);
    ServiceError::wrap(kind, context, err)
}

fn duplicate_name(name: &str) -> ServiceError {
    ServiceError::bad_request(format!("race with name '{}' already exists", name))
}

/// Like [`repo_error`], but a name collision caught by the store's unique index
/// reads the same as one caught by the pre-check.
fn write_error(context: &str, name: &str, err: RepoError) -> ServiceError {
    match err {
        RepoError::UniqueViolation(ref constraint) if constraint == RACE_NAME_CONSTRAINT => {
            tracing::debug!(name, constraint = %constraint, "race name taken at write time");
            duplicate_name(name)
        }
        other => repo_error(context, other),
    }
}

fn invalid_id(what: &str, id: Uuid) -> ServiceError {
    ServiceError::bad_request(format!("invalid {} ID: {}", what, id))
}

#[derive(Clone)]
pub struct RaceService {
    repo: Arc<dyn RaceRepository>,
}

impl RaceService {
    pub fn new(repo: Arc<dyn RaceRepository>) -> Self {
        RaceService { repo }
    }

    pub async fn list_races(&self) -> Result<Vec<Race>, ServiceError> {
        self.repo
            .get_all()
            .await
            .map_err(|e| ServiceError::wrap(ErrorKind::InternalServer, "failed to get list races", e))
    }

    pub async fn get_race_details(&self, id: Uuid) -> Result<Race, ServiceError> {
        if id.is_nil() {
            return Err(invalid_id("race", id));
        }
        self.repo
            .get_by_id(id)
            .await
            .map_err(|e| repo_error("failed to get race details by ID", e))
    }

    pub async fn register_race(&self, race: &Race) -> Result<Race, ServiceError> {
        validate_race(race).map_err(|e| ServiceError::wrap(ErrorKind::BadRequest, "invalid race data", e))?;
        self.ensure_name_free(&race.name).await?;
        let created = self
            .repo
            .create(race)
            .await
            .map_err(|e| write_error("failed to register race", &race.name, e))?;
        Ok(created)
    }

    pub async fn update_race_info(&self, id: Uuid, race: &Race) -> Result<Race, ServiceError> {
        if id.is_nil() {
            return Err(invalid_id("race", id));
        }
        validate_race(race).map_err(|e| ServiceError::wrap(ErrorKind::BadRequest, "invalid race data", e))?;

        let existing = self
            .repo
            .get_by_id(id)
            .await
            .map_err(|e| repo_error(&format!("race with ID {} does not exist", id), e))?;
        if existing.name != race.name {
            self.ensure_name_free(&race.name).await?;
        }

        self.repo
            .update(id, race)
            .await
            .map_err(|e| write_error("failed to update race info", &race.name, e))
    }

    /// A missing race is a bad request here, not a not-found.
    pub async fn remove_race(&self, id: Uuid) -> Result<(), ServiceError> {
        if id.is_nil() {
            return Err(invalid_id("race", id));
        }
        let context = format!("race with ID {} does not exist", id);
        self.repo.get_by_id(id).await.map_err(|e| {
            let kind = classify(&e, ErrorKind::BadRequest);
            ServiceError::wrap(kind, context.as_str(), e)
        })?;
        self.repo.delete(id).await.map_err(|e| {
            let kind = classify(&e, ErrorKind::BadRequest);
            ServiceError::wrap(kind, "failed to remove race", e)
        })
    }

    /// Subraces are only added to races that exist; a missing parent is a bad request.
    pub async fn add_subrace_to_race(&self, race_id: Uuid, subrace: &Subrace) -> Result<Subrace, ServiceError> {
        if race_id.is_nil() {
            return Err(invalid_id("race", race_id));
        }
        validate_subrace(subrace).map_err(|e| ServiceError::wrap(ErrorKind::BadRequest, "invalid subrace data", e))?;
        self.repo.add_subrace(race_id, subrace).await.map_err(|e| {
            let kind = classify(&e, ErrorKind::BadRequest);
            ServiceError::wrap(kind, "failed to add subrace to race", e)
        })
    }

    pub async fn detach_subrace_from_race(&self, race_id: Uuid, subrace_id: Uuid) -> Result<(), ServiceError> {
        if race_id.is_nil() || subrace_id.is_nil() {
            return Err(ServiceError::bad_request(format!(
                "invalid race ID or subrace ID: raceID={}, subraceID={}",
                race_id, subrace_id
            )));
        }
        self.repo
            .remove_subrace(race_id, subrace_id)
            .await
            .map_err(|e| repo_error("failed to detach subrace from race", e))
    }

    pub async fn assign_trait_to_race(&self, race_id: Uuid, trait_id: Uuid) -> Result<(), ServiceError> {
        if race_id.is_nil() || trait_id.is_nil() {
            return Err(ServiceError::bad_request(format!(
                "invalid race ID or trait ID: raceID={}, traitID={}",
                race_id, trait_id
            )));
        }
        self.repo
            .add_trait(race_id, trait_id)
            .await
            .map_err(|e| repo_error("failed to assign trait to race", e))
    }

    pub async fn unassign_trait_from_race(&self, race_id: Uuid, trait_id: Uuid) -> Result<(), ServiceError> {
        if race_id.is_nil() || trait_id.is_nil() {
            return Err(ServiceError::bad_request(format!(
                "invalid race ID or trait ID: raceID={}, traitID={}",
                race_id, trait_id
            )));
        }
        self.repo
            .remove_trait(race_id, trait_id)
            .await
            .map_err(|e| repo_error("failed to unassign trait from race", e))
    }

    pub async fn find_races(&self, criteria: &HashMap<String, String>) -> Result<Vec<Race>, ServiceError> {
        if criteria.is_empty() {
            return Err(ServiceError::bad_request("no search criteria provided"));
        }
        self.repo
            .search(criteria)
            .await
            .map_err(|e| repo_error("failed to find races", e))
    }

    async fn ensure_name_free(&self, name: &str) -> Result<(), ServiceError> {
        match self.repo.get_by_name(name).await {
            Ok(_) => Err(duplicate_name(name)),
            Err(RepoError::NotFound(_)) => Ok(()),
            Err(e) => Err(ServiceError::wrap(
                ErrorKind::InternalServer,
                "failed to check race name",
                e,
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{Age, Trait};
    use crate::repository::MockRaceRepository;
    use mockall::predicate::*;

    fn elf() -> Race {
        Race {
            name: "Elf".into(),
            description: "Graceful and long-lived".into(),
            size: "Medium".into(),
            speed: 30,
            age: Age {
                average_lifespan: "750 years".into(),
                minimum_age: 100,
                maximum_age: 750,
                ..Default::default()
            },
            ..Default::default()
        }
    }

    fn service(repo: MockRaceRepository) -> RaceService {
        RaceService::new(Arc::new(repo))
    }

    fn not_found(msg: &str) -> RepoError {
        RepoError::NotFound(msg.to_string())
    }

    #[tokio::test]
    async fn register_creates_when_name_is_free() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_name()
            .with(eq("Elf"))
            .times(1)
            .returning(|_| Err(not_found("race with name 'Elf' not found")));
        repo.expect_create().times(1).returning(|race| {
            let mut stored = race.clone();
            stored.id = Uuid::new_v4();
            Ok(stored)
        });

        let created = service(repo).register_race(&elf()).await.unwrap();
        assert!(!created.id.is_nil());
        assert_eq!(created.name, "Elf");
    }

    #[tokio::test]
    async fn register_rejects_duplicate_name() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_name().returning(|_| Ok(elf()));
        repo.expect_create().never();

        let err = service(repo).register_race(&elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "race with name 'Elf' already exists");
    }

    #[tokio::test]
    async fn register_rejects_invalid_race_before_touching_store() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_name().never();
        repo.expect_create().never();

        let race = Race { speed: 0, ..elf() };
        let err = service(repo).register_race(&race).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "invalid race data: invalid speed: 0");
    }

    #[tokio::test]
    async fn register_maps_store_failure_to_internal() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_name().returning(|_| Err(not_found("missing")));
        repo.expect_create().returning(|_| Err(RepoError::Db(sqlx::Error::PoolTimedOut)));

        let err = service(repo).register_race(&elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServer);
        assert!(err.to_string().starts_with("failed to register race: "));
    }

    #[tokio::test]
    async fn register_losing_name_race_at_write_is_bad_request() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_name().returning(|_| Err(not_found("missing")));
        repo.expect_create()
            .times(1)
            .returning(|_| Err(RepoError::UniqueViolation(RACE_NAME_CONSTRAINT.into())));

        let err = service(repo).register_race(&elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "race with name 'Elf' already exists");
    }

    #[tokio::test]
    async fn rename_losing_name_race_at_write_is_bad_request() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id()
            .returning(|id| Ok(Race { id, name: "Wood Elf".into(), ..elf() }));
        repo.expect_get_by_name().returning(|_| Err(not_found("missing")));
        repo.expect_update()
            .returning(|_, _| Err(RepoError::UniqueViolation(RACE_NAME_CONSTRAINT.into())));

        let err = service(repo).update_race_info(Uuid::new_v4(), &elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "race with name 'Elf' already exists");
    }

    #[tokio::test]
    async fn other_unique_violations_stay_conflicts() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_name().returning(|_| Err(not_found("missing")));
        repo.expect_create()
            .returning(|_| Err(RepoError::UniqueViolation("race_traits_pkey".into())));

        let err = service(repo).register_race(&elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Conflict);
    }

    #[tokio::test]
    async fn foreign_subrace_is_bad_request() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id().returning(|id| Ok(Race { id, ..elf() }));
        repo.expect_update()
            .returning(|_, _| Err(RepoError::ForeignSubrace("subrace with ID x does not belong to race y".into())));

        let err = service(repo).update_race_info(Uuid::new_v4(), &elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(
            err.to_string(),
            "failed to update race info: subrace with ID x does not belong to race y"
        );
    }

    #[tokio::test]
    async fn nil_ids_are_rejected_without_store_access() {
        let svc = service(MockRaceRepository::new());
        let nil = Uuid::nil();
        let some = Uuid::new_v4();

        assert_eq!(svc.get_race_details(nil).await.unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(svc.update_race_info(nil, &elf()).await.unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(svc.remove_race(nil).await.unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(
            svc.add_subrace_to_race(nil, &Subrace::default()).await.unwrap_err().kind(),
            ErrorKind::BadRequest
        );
        assert_eq!(svc.detach_subrace_from_race(some, nil).await.unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(svc.assign_trait_to_race(nil, some).await.unwrap_err().kind(), ErrorKind::BadRequest);
        assert_eq!(svc.unassign_trait_from_race(some, nil).await.unwrap_err().kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn get_details_reports_not_found() {
        let id = Uuid::new_v4();
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id()
            .with(eq(id))
            .returning(move |id| Err(not_found(&format!("race with ID {} not found", id))));

        let err = service(repo).get_race_details(id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn update_keeping_name_skips_duplicate_check() {
        let id = Uuid::new_v4();
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id().returning(move |id| Ok(Race { id, ..elf() }));
        repo.expect_get_by_name().never();
        repo.expect_update()
            .with(eq(id), always())
            .times(1)
            .returning(|id, race| Ok(Race { id, ..race.clone() }));

        let incoming = Race {
            traits: vec![Trait { name: "Darkvision".into(), ..Default::default() }],
            ..elf()
        };
        let updated = service(repo).update_race_info(id, &incoming).await.unwrap();
        assert_eq!(updated.id, id);
        assert_eq!(updated.traits.len(), 1);
    }

    #[tokio::test]
    async fn update_rejects_rename_collision() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id().returning(|id| Ok(Race { id, ..elf() }));
        repo.expect_get_by_name()
            .with(eq("Dwarf"))
            .returning(|_| Ok(Race { name: "Dwarf".into(), ..elf() }));
        repo.expect_update().never();

        let incoming = Race { name: "Dwarf".into(), ..elf() };
        let err = service(repo).update_race_info(Uuid::new_v4(), &incoming).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "race with name 'Dwarf' already exists");
    }

    #[tokio::test]
    async fn update_of_missing_race_is_not_found() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id().returning(|_| Err(not_found("race with ID x not found")));
        repo.expect_update().never();

        let err = service(repo).update_race_info(Uuid::new_v4(), &elf()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
    }

    #[tokio::test]
    async fn remove_of_missing_race_is_bad_request() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id().returning(|_| Err(not_found("race with ID x not found")));
        repo.expect_delete().never();

        let err = service(repo).remove_race(Uuid::new_v4()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn remove_deletes_existing_race() {
        let id = Uuid::new_v4();
        let mut repo = MockRaceRepository::new();
        repo.expect_get_by_id().returning(|id| Ok(Race { id, ..elf() }));
        repo.expect_delete().with(eq(id)).times(1).returning(|_| Ok(()));

        service(repo).remove_race(id).await.unwrap();
    }

    #[tokio::test]
    async fn add_subrace_validates_name() {
        let mut repo = MockRaceRepository::new();
        repo.expect_add_subrace().never();

        let err = service(repo)
            .add_subrace_to_race(Uuid::new_v4(), &Subrace::default())
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "invalid subrace data: subrace name cannot be empty");
    }

    #[tokio::test]
    async fn add_subrace_to_missing_race_is_bad_request() {
        let mut repo = MockRaceRepository::new();
        repo.expect_add_subrace()
            .returning(|race_id, _| Err(not_found(&format!("race with ID {} not found", race_id))));

        let subrace = Subrace { name: "High Elf".into(), ..Default::default() };
        let err = service(repo).add_subrace_to_race(Uuid::new_v4(), &subrace).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
    }

    #[tokio::test]
    async fn trait_links_report_missing_side() {
        let mut repo = MockRaceRepository::new();
        repo.expect_add_trait()
            .returning(|_, trait_id| Err(not_found(&format!("trait with ID {} not found", trait_id))));

        let trait_id = Uuid::new_v4();
        let err = service(repo).assign_trait_to_race(Uuid::new_v4(), trait_id).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::NotFound);
        assert!(err.to_string().ends_with(&format!("trait with ID {} not found", trait_id)));
    }

    #[tokio::test]
    async fn find_requires_criteria() {
        let mut repo = MockRaceRepository::new();
        repo.expect_search().never();

        let err = service(repo).find_races(&HashMap::new()).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "no search criteria provided");
    }

    #[tokio::test]
    async fn find_maps_unknown_criteria_to_bad_request() {
        let mut repo = MockRaceRepository::new();
        repo.expect_search()
            .returning(|_| Err(RepoError::UnknownCriteria("unknown".into())));

        let criteria = HashMap::from([("unknown".to_string(), "x".to_string())]);
        let err = service(repo).find_races(&criteria).await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::BadRequest);
        assert_eq!(err.to_string(), "failed to find races: unknown search criteria: unknown");
    }

    #[tokio::test]
    async fn list_failure_is_internal() {
        let mut repo = MockRaceRepository::new();
        repo.expect_get_all().returning(|| Err(RepoError::Db(sqlx::Error::PoolClosed)));

        let err = service(repo).list_races().await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InternalServer);
    }
}
