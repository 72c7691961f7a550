//! OpenAPI document for the race catalog, served as JSON.

use crate::error::{ErrorBody, ErrorDetail};
use crate::handlers::race;
use crate::model::{AbilityScoreBonuses, Age, Language, Proficiency, Race, Size, Subrace, Trait};
use axum::{routing::get, Json, Router};
use utoipa::OpenApi;

pub const OPENAPI_PATH: &str = "/api-docs/openapi.json";

#[derive(OpenApi)]
#[openapi(
    info(title = "Race Catalog API", description = "Playable races, their subraces and traits"),
    paths(
        race::list_races,
        race::get_race,
        race::create_race,
        race::update_race,
        race::delete_race,
        race::add_subrace,
        race::remove_subrace,
        race::add_trait,
        race::remove_trait,
        race::search_races,
    ),
    components(schemas(
        Race,
        Subrace,
        Age,
        AbilityScoreBonuses,
        Proficiency,
        Language,
        Trait,
        Size,
        ErrorBody,
        ErrorDetail
    )),
    tags((name = "races", description = "Race catalog"))
)]
pub struct ApiDoc;

pub fn openapi_routes() -> Router {
    Router::new().route(OPENAPI_PATH, get(|| async { Json(ApiDoc::openapi()) }))
}
