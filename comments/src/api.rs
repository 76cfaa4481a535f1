use crate::config::Listener as ListenerConfig;
use crate::errors::RelayError;
use crate::metrics_defs::REQUEST_DURATION;
use crate::relay::CommentRelay;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::{
    Json, Router,
    extract::{Query, State},
    routing::{get, post},
};
use http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use shared::histogram;
use std::time::Instant;
use tokio::net::TcpListener;
use tower_http::cors::{Any, CorsLayer};

pub const SAVE_PATH: &str = "/apps/comments/save";
pub const GET_PATH: &str = "/apps/comments/get";

pub fn router(relay: CommentRelay) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route(SAVE_PATH, post(save_comment))
        .route(GET_PATH, get(get_comments))
        .layer(cors)
        .with_state(relay)
}

pub async fn serve(listener: &ListenerConfig, app: Router) -> Result<(), std::io::Error> {
    let addr = format!("{}:{}", listener.host, listener.port);
    let listener = TcpListener::bind(&addr).await?;
    tracing::info!(%addr, "comment relay listening");
    axum::serve(listener, app).await
}

#[derive(Deserialize, Debug)]
struct SaveRequest {
    #[serde(default)]
    image_id: Value,
    #[serde(default)]
    comment: Value,
}

impl SaveRequest {
    /// Strings pass through and numbers are stringified. Anything else counts as absent.
    fn image_id(&self) -> Option<String> {
        match &self.image_id {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        }
    }

    fn comment(&self) -> Option<&str> {
        self.comment.as_str()
    }
}

#[derive(Serialize)]
struct SaveResponse {
    success: bool,
    data: Value,
}

#[derive(Deserialize, Debug)]
struct GetParams {
    image_id: Option<String>,
}

#[derive(Serialize)]
struct GetResponse {
    comments: Vec<String>,
}

async fn save_comment(
    State(relay): State<CommentRelay>,
    body: Result<Json<SaveRequest>, JsonRejection>,
) -> Result<Json<SaveResponse>, RelayError> {
    let start = Instant::now();

    let result = match body {
        Ok(Json(request)) => {
            let image_id = request.image_id().unwrap_or_default();
            relay
                .submit(&image_id, request.comment().unwrap_or_default())
                .await
        }
        Err(rejection) => Err(RelayError::InvalidInput(rejection.body_text())),
    };

    observe("save", start, &result);
    result.map(|data| {
        Json(SaveResponse {
            success: true,
            data,
        })
    })
}

async fn get_comments(
    State(relay): State<CommentRelay>,
    params: Result<Query<GetParams>, QueryRejection>,
) -> Result<Json<GetResponse>, RelayError> {
    let start = Instant::now();

    let result = match params {
        Ok(Query(params)) => {
            relay
                .retrieve(params.image_id.as_deref().unwrap_or_default())
                .await
        }
        Err(rejection) => Err(RelayError::InvalidInput(rejection.body_text())),
    };

    observe("get", start, &result);
    result.map(|comments| Json(GetResponse { comments }))
}

fn observe<T>(endpoint: &'static str, start: Instant, result: &Result<T, RelayError>) {
    let status = match result {
        Ok(_) => StatusCode::OK,
        Err(e) => e.status(),
    };

    match result {
        Err(e) if status.is_server_error() => {
            tracing::error!(endpoint, %status, error = %e, "request failed");
        }
        Err(e) => tracing::info!(endpoint, %status, error = %e, "request rejected"),
        Ok(_) => tracing::debug!(endpoint, %status, "request handled"),
    }

    histogram!(REQUEST_DURATION, "endpoint" => endpoint, "status" => status.as_str().to_owned())
        .record(start.elapsed().as_secs_f64());
}
