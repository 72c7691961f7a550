//! Shared application state for all routes, built once at startup.

use crate::repository::RaceRepository;
use crate::service::RaceService;
use std::sync::Arc;

#[derive(Clone)]
pub struct AppState {
    pub races: RaceService,
}

impl AppState {
    pub fn new(repo: Arc<dyn RaceRepository>) -> Self {
        AppState {
            races: RaceService::new(repo),
        }
    }
}
