use std::sync::Arc;

use axum::{
    extract::{rejection::PathRejection, Path, State},
    routing::get,
    Json, Router,
};
use eyre::Report;
use rosu_v2::prelude::OsuError;
use serde::Serialize;
use serde_json::{json, Value};

use crate::{context::Context, database::MedalReader, model::Medal};

use super::error::ApiError;

/// Routes mounted at the root path next to the health check.
pub fn router() -> Router<Arc<Context>> {
    Router::new()
        .route("/users/{user_id}", get(get_user))
        .route("/sync/status", get(sync_status))
}

/// Read-only access to the stored medals.
pub fn medal_router<R, S>(reader: R) -> Router<S>
where
    R: MedalReader + Clone + 'static,
    S: Clone + Send + Sync + 'static,
{
    Router::new()
        .route("/medals", get(list_medals::<R>))
        .route("/medals/{medal_id}", get(get_medal::<R>))
        .with_state(reader)
}

async fn list_medals<R: MedalReader>(State(reader): State<R>) -> Result<Json<Vec<Medal>>, ApiError> {
    let medals = reader.fetch_medals().await?;

    Ok(Json(medals))
}

async fn get_medal<R: MedalReader>(
    State(reader): State<R>,
    path: Result<Path<i32>, PathRejection>,
) -> Result<Json<Medal>, ApiError> {
    let Path(medal_id) = path?;

    reader
        .fetch_medal(medal_id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("no medal with id {medal_id}")))
}

#[derive(Serialize)]
struct OsuUser {
    user_id: u32,
    username: String,
    country_code: String,
}

async fn get_user(
    State(ctx): State<Arc<Context>>,
    path: Result<Path<u32>, PathRejection>,
) -> Result<Json<OsuUser>, ApiError> {
    let Path(user_id) = path?;

    let osu = ctx
        .osu
        .get()
        .await
        .ok_or_else(|| ApiError::Unavailable("not logged into the osu!api".to_owned()))?;

    match osu.user(user_id).await {
        Ok(user) => Ok(Json(OsuUser {
            user_id: user.user_id,
            username: user.username.to_string(),
            country_code: user.country_code.to_string(),
        })),
        Err(err) => Err(user_error(user_id, err)),
    }
}

fn user_error(user_id: u32, err: OsuError) -> ApiError {
    match err {
        OsuError::NotFound => ApiError::NotFound(format!("no user with id {user_id}")),
        err => {
            let wrap = format!("failed to request user {user_id}");

            Report::new(err).wrap_err(wrap).into()
        }
    }
}

async fn sync_status(State(ctx): State<Arc<Context>>) -> Json<Value> {
    match ctx.medals.last_summary().await {
        Some(summary) => Json(json!(summary)),
        None => Json(json!({ "status": "pending" })),
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::Body,
        http::{Request, StatusCode},
        response::{IntoResponse, Response},
    };
    use http_body_util::BodyExt;
    use serde_json::json;
    use time::UtcOffset;
    use tower::ServiceExt;

    use crate::{
        database::{memory::MemoryStore, MedalStore},
        model::RawMedal,
    };

    use super::*;

    async fn medals(ids: &[i32]) -> Router {
        let store = MemoryStore::default();

        for &medal_id in ids {
            let raw = RawMedal {
                medal_id: json!(medal_id),
                name: json!(format!("Medal {medal_id}")),
                ..Default::default()
            };

            let medal = Medal::from_raw(&raw, UtcOffset::UTC);
            store.replace_medal(&medal).await.unwrap();
        }

        medal_router(store)
    }

    async fn request(app: Router, uri: &str) -> Response {
        let req = Request::builder().uri(uri).body(Body::empty()).unwrap();

        app.oneshot(req).await.unwrap()
    }

    async fn json_body(response: Response) -> Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();

        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn lists_medals_by_id() {
        let response = request(medals(&[7, 3]).await, "/medals").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        let ids: Vec<_> = body
            .as_array()
            .unwrap()
            .iter()
            .map(|medal| medal["medal_id"].clone())
            .collect();

        assert_eq!(ids, [json!(3), json!(7)]);
    }

    #[tokio::test]
    async fn lists_no_medals() {
        let response = request(medals(&[]).await, "/medals").await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(json_body(response).await, json!([]));
    }

    #[tokio::test]
    async fn single_medal() {
        let response = request(medals(&[3]).await, "/medals/3").await;
        assert_eq!(response.status(), StatusCode::OK);

        let body = json_body(response).await;
        assert_eq!(body["medal_id"], json!(3));
        assert_eq!(body["name"], json!("Medal 3"));
    }

    #[tokio::test]
    async fn unknown_medal() {
        let response = request(medals(&[3]).await, "/medals/4").await;

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "no medal with id 4" })
        );
    }

    #[tokio::test]
    async fn non_numeric_medal_id() {
        let response = request(medals(&[3]).await, "/medals/abc").await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert!(json_body(response).await["error"].is_string());
    }

    #[tokio::test]
    async fn unknown_user() {
        let response = user_error(2, OsuError::NotFound).into_response();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            json_body(response).await,
            json!({ "error": "no user with id 2" })
        );
    }
}
