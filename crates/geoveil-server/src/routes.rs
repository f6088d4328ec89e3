//! HTTP routes for the encryption service

use std::time::Instant;

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Json, Response},
    routing::{get, post},
    Router,
};
use geoveil_core::{EncryptedFeatureCollection, FeatureCollection};
use serde::{Deserialize, Serialize};
use tower_http::cors::{Any, CorsLayer};

use crate::auth::require_bearer;
use crate::error::{Result, ServerError};
use crate::metrics;
use crate::state::AppState;

/// Health check response
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub auth_enabled: bool,
}

async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        auth_enabled: state.auth_enabled(),
    })
}

/// Encrypt every polygon in a feature collection
async fn encrypt_polygons(
    State(state): State<AppState>,
    payload: std::result::Result<Json<FeatureCollection>, JsonRejection>,
) -> Result<Json<EncryptedFeatureCollection>> {
    let start = Instant::now();
    metrics::record_request_start();

    let result = run_pipeline(&state, payload).await;

    metrics::record_request_end();
    metrics::record_request(metrics::outcome_for(&result), start.elapsed());
    // Error details may contain submitted coordinates; log kinds only
    match &result {
        Err(ServerError::Feature(e)) => {
            tracing::warn!(kind = e.source.kind(), stage = %e.stage, "feature rejected");
        }
        Err(e) => tracing::warn!(kind = e.kind(), status = %e.status(), "encrypt-polygons request failed"),
        Ok(_) => {}
    }
    result.map(Json)
}

async fn run_pipeline(
    state: &AppState,
    payload: std::result::Result<Json<FeatureCollection>, JsonRejection>,
) -> Result<EncryptedFeatureCollection> {
    let Json(collection) = payload.map_err(|e| ServerError::InvalidRequest(e.body_text()))?;
    let received = collection.features.len();

    // The pipeline is CPU-bound and synchronous
    let pipeline = state.pipeline.clone();
    let task = tokio::task::spawn_blocking(move || pipeline.process_collection(&collection));

    let joined = tokio::time::timeout(state.request_timeout, task)
        .await
        .map_err(|_| ServerError::Timeout(state.request_timeout))?;
    let outcome = joined.map_err(|e| ServerError::Internal(format!("pipeline task failed: {e}")))?;

    match outcome {
        Ok(encrypted) => {
            metrics::record_features(metrics::OUTCOME_OK, encrypted.features.len());
            tracing::info!(received, encrypted = encrypted.features.len(), "polygons encrypted");
            Ok(encrypted)
        }
        Err(e) => {
            metrics::record_stage_failure(e.stage);
            let outcome = if e.source.is_input_error() {
                metrics::OUTCOME_CLIENT_ERROR
            } else {
                metrics::OUTCOME_SERVER_ERROR
            };
            metrics::record_features(outcome, 1);
            Err(e.into())
        }
    }
}

async fn prometheus_metrics(State(state): State<AppState>) -> Response {
    match &state.prometheus {
        Some(handle) => handle.render().into_response(),
        None => (StatusCode::NOT_FOUND, "metrics disabled").into_response(),
    }
}

fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
}

/// Create the router with all routes
pub fn create_router(state: AppState) -> Router {
    let protected = Router::new()
        .route("/encrypt-polygons", post(encrypt_polygons))
        .route("/encrypt-polygons/", post(encrypt_polygons))
        .route_layer(middleware::from_fn_with_state(state.clone(), require_bearer));

    let router = Router::new()
        .route("/health", get(health))
        .route("/metrics", get(prometheus_metrics))
        .merge(protected);

    let router = if state.cors { router.layer(permissive_cors()) } else { router };
    router.with_state(state)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use axum::body::{to_bytes, Body};
    use axum::http::{header, Request};
    use geoveil_core::metadata::{Geocoder, MetadataResolver, SpatialIndexer};
    use geoveil_core::{CipherKey, CipherPair, CipherProfile, GeoPoint, Pipeline, PipelineConfig};
    use tower::ServiceExt;

    use crate::config::{AuthConfig, ServerConfig};

    struct Bucket;

    impl SpatialIndexer for Bucket {
        fn cell(&self, _: GeoPoint) -> geoveil_core::Result<String> {
            Ok("81757ffffffffff".into())
        }
    }

    struct Country;

    impl Geocoder for Country {
        fn country(&self, _: GeoPoint) -> geoveil_core::Result<Option<String>> {
            Ok(Some("Ghana".into()))
        }
    }

    fn state(auth: AuthConfig) -> AppState {
        let ciphers = CipherPair::new(
            CipherProfile::longitude(CipherKey::new(vec![3; 32]).unwrap()),
            CipherProfile::latitude(CipherKey::new(vec![4; 32]).unwrap()),
        );
        let pipeline = Pipeline::new(
            PipelineConfig::default(),
            Arc::new(ciphers),
            MetadataResolver::new(Box::new(Bucket), Box::new(Country)),
        )
        .unwrap();
        let config = ServerConfig {
            auth,
            request_timeout: Duration::from_secs(10),
            ..ServerConfig::default()
        };
        AppState::new(Arc::new(pipeline), &config).unwrap()
    }

    fn collection(lon: f64) -> String {
        serde_json::json!({
            "type": "FeatureCollection",
            "features": [{
                "type": "Feature",
                "id": "plot",
                "geometry": {
                    "type": "Polygon",
                    "coordinates": [[[lon, 0.0], [lon + 0.01, 0.0], [lon + 0.01, 0.01], [lon, 0.01], [lon, 0.0]]]
                },
                "properties": {"start_at": "2024-01-01", "end_at": "2024-06-30"}
            }]
        })
        .to_string()
    }

    fn post_json(uri: &str, body: String) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body))
            .unwrap()
    }

    async fn json_body(resp: Response) -> serde_json::Value {
        let bytes = to_bytes(resp.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_health() {
        let app = create_router(state(AuthConfig::disabled()));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        let body = json_body(resp).await;
        assert_eq!(body["status"], "ok");
        assert_eq!(body["auth_enabled"], false);
    }

    #[tokio::test]
    async fn test_encrypt_polygons() {
        let app = create_router(state(AuthConfig::disabled()));
        let resp = app.oneshot(post_json("/encrypt-polygons", collection(0.0))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);

        let body = json_body(resp).await;
        assert_eq!(body["type"], "EncryptedFeatureCollection");
        let feature = &body["features"][0];
        assert_eq!(feature["id"], "plot");
        assert_eq!(feature["properties"]["country"], "Ghana");
        assert_eq!(feature["properties"]["start_at"], "2024-01-01");
        let ring = feature["geometry"]["coordinates"][0].as_array().unwrap();
        assert_eq!(ring.len(), 5);
        assert!(ring[0][0].is_string());
    }

    #[tokio::test]
    async fn test_trailing_slash_alias() {
        let app = create_router(state(AuthConfig::disabled()));
        let resp = app.oneshot(post_json("/encrypt-polygons/", collection(0.0))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn test_out_of_domain_is_bad_request() {
        let app = create_router(state(AuthConfig::disabled()));
        let resp = app.oneshot(post_json("/encrypt-polygons", collection(181.0))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

        let body = json_body(resp).await;
        assert_eq!(body["error"], "out_of_domain");
        assert_eq!(body["stage"], "domain_checked");
        assert_eq!(body["feature_id"], "plot");
    }

    #[tokio::test]
    async fn test_invalid_json_is_bad_request() {
        let app = create_router(state(AuthConfig::disabled()));
        let resp = app
            .oneshot(post_json("/encrypt-polygons", "{\"features\": 12}".into()))
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(json_body(resp).await["error"], "invalid_request");
    }

    #[tokio::test]
    async fn test_missing_token_is_unauthorized() {
        let app = create_router(state(AuthConfig::jwt("route-secret", "authenticated")));
        let resp = app.oneshot(post_json("/encrypt-polygons", collection(0.0))).await.unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(resp.headers()[header::WWW_AUTHENTICATE], "Bearer");
    }

    #[tokio::test]
    async fn test_health_is_public_when_auth_enabled() {
        let app = create_router(state(AuthConfig::jwt("route-secret", "authenticated")));
        let resp = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::OK);
        assert_eq!(json_body(resp).await["auth_enabled"], true);
    }

    #[tokio::test]
    async fn test_metrics_disabled() {
        let app = create_router(state(AuthConfig::disabled()));
        let resp = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }
}
