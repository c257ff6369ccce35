use std::time::Duration;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    http::{
        HeaderValue, Method,
        header::{AUTHORIZATION, CONTENT_TYPE},
    },
};
use deployment::Deployment;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

pub mod error;
pub mod middleware;
pub mod routes;

pub type DeploymentImpl = deployment::PrimeLivingDeployment;

// Multipart framing on top of the file itself
const MULTIPART_OVERHEAD_BYTES: usize = 64 * 1024;

fn cors_layer(site_url: &str) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([AUTHORIZATION, CONTENT_TYPE])
        .max_age(Duration::from_secs(60 * 60));

    match HeaderValue::from_str(site_url) {
        Ok(origin) => cors.allow_origin(origin),
        Err(_) => {
            tracing::warn!(site_url = %site_url, "SITE_URL is not a valid origin; CORS disabled");
            cors
        }
    }
}

/// The full application: every route under `/api`, with request tracing and
/// CORS for the frontend origin.
pub fn app(deployment: DeploymentImpl) -> Router {
    let config = deployment.config();
    let body_limit = config.storage.max_upload_bytes + MULTIPART_OVERHEAD_BYTES;
    let cors = cors_layer(&config.site_url);

    Router::new()
        .nest("/api", routes::router(&deployment))
        .layer(DefaultBodyLimit::max(body_limit))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(deployment)
}
