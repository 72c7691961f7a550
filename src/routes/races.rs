//! Race catalog routes. Mounted under `/api/v1/races` by the server.

use crate::handlers::race::{
    add_subrace, add_trait, create_race, delete_race, get_race, list_races, remove_subrace,
    remove_trait, search_races, update_race,
};
use crate::state::AppState;
use axum::{
    routing::{delete, get, post},
    Router,
};

pub const RACES_PREFIX: &str = "/api/v1/races";

pub fn race_routes(state: AppState) -> Router {
    Router::new()
        .route("/", get(list_races).post(create_race))
        .route("/search", get(search_races))
        .route("/:id", get(get_race).put(update_race).delete(delete_race))
        .route("/:id/subraces", post(add_subrace))
        .route("/:id/subraces/:subrace_id", delete(remove_subrace))
        .route("/:id/traits/:trait_id", post(add_trait).delete(remove_trait))
        .with_state(state)
}
