use std::sync::Arc;

use axum::{routing::get, Json, Router};
use serde_json::{json, Value};
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::context::Context;

mod error;
mod routes;

pub static HEALTH_MSG: &str = "Server is running 🚀";

/// `GET /` plus the medal routes, all with permissive CORS.
pub fn router(ctx: Arc<Context>) -> Router {
    Router::new()
        .route("/", get(health))
        .merge(routes::router())
        .merge(routes::medal_router(ctx.db.clone()))
        .layer(CorsLayer::permissive())
        .layer(TraceLayer::new_for_http())
        .with_state(ctx)
}

async fn health() -> Json<Value> {
    Json(json!({ "msg": HEALTH_MSG }))
}
