//! Assemble the full HTTP application: race routes, common routes, OpenAPI and middleware.

use crate::config::{AppConfig, CorsConfig};
use crate::routes::{common_routes_with_ready, openapi_routes, race_routes, RACES_PREFIX};
use crate::state::AppState;
use axum::http::{HeaderName, HeaderValue, Method};
use axum::Router;
use sqlx::PgPool;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    limit::RequestBodyLimitLayer,
    trace::TraceLayer,
};

/// Install the global fmt subscriber. `RUST_LOG` wins over the built-in default.
pub fn init_tracing(config: &AppConfig) {
    let default_filter = if config.is_debug() {
        "race_catalog=debug,race_server=debug,tower_http=debug"
    } else {
        "race_catalog=info,race_server=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter)),
        )
        .init();
}

pub fn build_app(state: AppState, pool: PgPool, config: &AppConfig) -> Router {
    Router::new()
        .nest(RACES_PREFIX, race_routes(state))
        .merge(common_routes_with_ready(pool))
        .merge(openapi_routes())
        .layer(RequestBodyLimitLayer::new(config.server.body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer(&config.cors))
}

/// Empty origin list means CORS is not enabled. Unparseable entries are skipped with a warning.
pub fn cors_layer(cors: &CorsConfig) -> CorsLayer {
    if cors.allow_origins.is_empty() {
        return CorsLayer::new();
    }

    let mut layer = CorsLayer::new();
    layer = if cors.allow_origins.iter().any(|o| o == "*") {
        layer.allow_origin(Any)
    } else {
        let origins: Vec<HeaderValue> = cors
            .allow_origins
            .iter()
            .filter_map(|o| match HeaderValue::from_str(o) {
                Ok(v) => Some(v),
                Err(_) => {
                    tracing::warn!(origin = %o, "ignoring invalid CORS origin");
                    None
                }
            })
            .collect();
        layer.allow_origin(AllowOrigin::list(origins))
    };

    let methods: Vec<Method> = if cors.allow_methods.is_empty() {
        vec![Method::GET, Method::POST, Method::PUT, Method::DELETE, Method::OPTIONS]
    } else {
        cors.allow_methods
            .iter()
            .filter_map(|m| Method::from_bytes(m.to_ascii_uppercase().as_bytes()).ok())
            .collect()
    };
    layer = layer.allow_methods(methods);

    let headers = header_names(&cors.allow_headers);
    if !headers.is_empty() {
        layer = layer.allow_headers(headers);
    }
    let exposed = header_names(&cors.expose_headers);
    if !exposed.is_empty() {
        layer = layer.expose_headers(exposed);
    }
    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }
    layer
}

fn header_names(raw: &[String]) -> Vec<HeaderName> {
    raw.iter()
        .filter_map(|h| HeaderName::from_bytes(h.to_ascii_lowercase().as_bytes()).ok())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::MockRaceRepository;
    use axum::body::Body;
    use axum::http::{header, Request, StatusCode};
    use std::sync::Arc;
    use tower::ServiceExt;

    fn config(origins: &[&str]) -> AppConfig {
        AppConfig::from_lookup(|key| match key {
            "CORS_ALLOW_ORIGINS" => Some(origins.join(",")),
            "BODY_LIMIT_BYTES" => Some("64".into()),
            _ => None,
        })
        .unwrap()
    }

    fn lazy_pool() -> PgPool {
        sqlx::postgres::PgPoolOptions::new()
            .connect_lazy("postgres://nobody@127.0.0.1:1/none")
            .unwrap()
    }

    fn app(origins: &[&str]) -> Router {
        let state = AppState::new(Arc::new(MockRaceRepository::new()));
        build_app(state, lazy_pool(), &config(origins))
    }

    #[tokio::test]
    async fn oversized_body_is_rejected() {
        let body = format!(r#"{{"name":"{}"}}"#, "x".repeat(200));
        let response = app(&[])
            .oneshot(
                Request::post("/api/v1/races")
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(body))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert!(response.status().is_client_error());
    }

    #[tokio::test]
    async fn allowed_origin_is_echoed() {
        let response = app(&["https://ui.example"])
            .oneshot(
                Request::get("/health")
                    .header(header::ORIGIN, "https://ui.example")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
            "https://ui.example"
        );
    }

    #[tokio::test]
    async fn openapi_document_is_served() {
        let response = app(&[])
            .oneshot(Request::get("/api-docs/openapi.json").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn header_names_skip_invalid_entries() {
        let names = header_names(&["Content-Type".into(), "bad header".into()]);
        assert_eq!(names, vec![header::CONTENT_TYPE]);
    }
}
