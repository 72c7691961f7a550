//! Router builders: common routes, race routes and the OpenAPI document.

pub mod common;
pub mod openapi;
pub mod races;

pub use common::{common_routes, common_routes_with_ready};
pub use openapi::{openapi_routes, ApiDoc, OPENAPI_PATH};
pub use races::{race_routes, RACES_PREFIX};
