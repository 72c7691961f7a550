//! Race HTTP handlers: parse path, query and body, call the service, pick the status.

use crate::error::{ErrorBody, ServiceError};
use crate::model::{Race, Subrace};
use crate::state::AppState;
use axum::{
    extract::{rejection::JsonRejection, Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use std::collections::HashMap;
use uuid::Uuid;

fn parse_id(raw: &str, what: &str) -> Result<Uuid, ServiceError> {
    Uuid::parse_str(raw).map_err(|_| ServiceError::bad_request(format!("invalid {} ID", what)))
}

fn payload<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, ServiceError> {
    match body {
        Ok(Json(v)) => Ok(v),
        Err(rejection) => {
            tracing::debug!(error = %rejection, "rejected request body");
            Err(ServiceError::bad_request("invalid request payload"))
        }
    }
}

#[utoipa::path(
    get,
    path = "/api/v1/races",
    tag = "races",
    responses(
        (status = 200, description = "All races with their associations", body = [Race]),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn list_races(State(state): State<AppState>) -> Result<impl IntoResponse, ServiceError> {
    let races = state.races.list_races().await?;
    Ok((StatusCode::OK, Json(races)))
}

#[utoipa::path(
    get,
    path = "/api/v1/races/{id}",
    tag = "races",
    params(("id" = String, Path, description = "Race id (UUID)")),
    responses(
        (status = 200, description = "The race", body = Race),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such race", body = ErrorBody)
    )
)]
pub async fn get_race(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "race")?;
    let race = state.races.get_race_details(id).await?;
    Ok((StatusCode::OK, Json(race)))
}

#[utoipa::path(
    post,
    path = "/api/v1/races",
    tag = "races",
    request_body = Race,
    responses(
        (status = 201, description = "Race created", body = Race),
        (status = 400, description = "Invalid payload or duplicate name", body = ErrorBody),
        (status = 500, description = "Store failure", body = ErrorBody)
    )
)]
pub async fn create_race(
    State(state): State<AppState>,
    body: Result<Json<Race>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let race = payload(body)?;
    let created = state.races.register_race(&race).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    put,
    path = "/api/v1/races/{id}",
    tag = "races",
    params(("id" = String, Path, description = "Race id (UUID)")),
    request_body = Race,
    responses(
        (status = 200, description = "Race updated", body = Race),
        (status = 400, description = "Invalid id, payload or duplicate name", body = ErrorBody),
        (status = 404, description = "No such race", body = ErrorBody)
    )
)]
pub async fn update_race(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Race>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "race")?;
    let race = payload(body)?;
    let updated = state.races.update_race_info(id, &race).await?;
    Ok((StatusCode::OK, Json(updated)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/races/{id}",
    tag = "races",
    params(("id" = String, Path, description = "Race id (UUID)")),
    responses(
        (status = 204, description = "Race and its age and subraces deleted"),
        (status = 400, description = "Invalid id or no such race", body = ErrorBody)
    )
)]
pub async fn delete_race(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, ServiceError> {
    let id = parse_id(&id, "race")?;
    state.races.remove_race(id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/races/{id}/subraces",
    tag = "races",
    params(("id" = String, Path, description = "Race id (UUID)")),
    request_body = Subrace,
    responses(
        (status = 201, description = "Subrace added", body = Subrace),
        (status = 400, description = "Invalid id, payload or missing race", body = ErrorBody)
    )
)]
pub async fn add_subrace(
    State(state): State<AppState>,
    Path(id): Path<String>,
    body: Result<Json<Subrace>, JsonRejection>,
) -> Result<impl IntoResponse, ServiceError> {
    let race_id = parse_id(&id, "race")?;
    let subrace = payload(body)?;
    let created = state.races.add_subrace_to_race(race_id, &subrace).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

#[utoipa::path(
    delete,
    path = "/api/v1/races/{id}/subraces/{subrace_id}",
    tag = "races",
    params(
        ("id" = String, Path, description = "Race id (UUID)"),
        ("subrace_id" = String, Path, description = "Subrace id (UUID)")
    ),
    responses(
        (status = 204, description = "Subrace removed"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such subrace on this race", body = ErrorBody)
    )
)]
pub async fn remove_subrace(
    State(state): State<AppState>,
    Path((id, subrace_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let race_id = parse_id(&id, "race")?;
    let subrace_id = parse_id(&subrace_id, "subrace")?;
    state.races.detach_subrace_from_race(race_id, subrace_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[utoipa::path(
    post,
    path = "/api/v1/races/{id}/traits/{trait_id}",
    tag = "races",
    params(
        ("id" = String, Path, description = "Race id (UUID)"),
        ("trait_id" = String, Path, description = "Trait id (UUID)")
    ),
    responses(
        (status = 201, description = "Trait linked"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such race or trait", body = ErrorBody)
    )
)]
pub async fn add_trait(
    State(state): State<AppState>,
    Path((id, trait_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let race_id = parse_id(&id, "race")?;
    let trait_id = parse_id(&trait_id, "trait")?;
    state.races.assign_trait_to_race(race_id, trait_id).await?;
    Ok(StatusCode::CREATED)
}

#[utoipa::path(
    delete,
    path = "/api/v1/races/{id}/traits/{trait_id}",
    tag = "races",
    params(
        ("id" = String, Path, description = "Race id (UUID)"),
        ("trait_id" = String, Path, description = "Trait id (UUID)")
    ),
    responses(
        (status = 204, description = "Trait unlinked"),
        (status = 400, description = "Malformed id", body = ErrorBody),
        (status = 404, description = "No such race or trait", body = ErrorBody)
    )
)]
pub async fn remove_trait(
    State(state): State<AppState>,
    Path((id, trait_id)): Path<(String, String)>,
) -> Result<impl IntoResponse, ServiceError> {
    let race_id = parse_id(&id, "race")?;
    let trait_id = parse_id(&trait_id, "trait")?;
    state.races.unassign_trait_from_race(race_id, trait_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Every query parameter is a criterion; the first value wins for repeated keys.
#[utoipa::path(
    get,
    path = "/api/v1/races/search",
    tag = "races",
    params(
        ("size" = Option<String>, Query, description = "Small, Medium or Large"),
        ("speed" = Option<i32>, Query, description = "Exact speed"),
        ("alignment" = Option<String>, Query, description = "Exact alignment")
    ),
    responses(
        (status = 200, description = "Races matching every criterion", body = [Race]),
        (status = 400, description = "Unknown key or no criteria", body = ErrorBody)
    )
)]
pub async fn search_races(
    State(state): State<AppState>,
    Query(params): Query<Vec<(String, String)>>,
) -> Result<impl IntoResponse, ServiceError> {
    let mut criteria = HashMap::new();
    for (k, v) in params {
        criteria.entry(k).or_insert(v);
    }
    let races = state.races.find_races(&criteria).await?;
    Ok((StatusCode::OK, Json(races)))
}
