/*
 *  server.rs
 *
 *  LyScreen - worth the squeeze
 *  (c) 2020-26 Stuart Hunter
 *
 *  HTTP command surface over a single shared display session
 *
 *  This program is free software: you can redistribute it and/or modify
 *  it under the terms of the GNU General Public License as published by
 *  the Free Software Foundation, either version 3 of the License, or
 *  (at your option) any later version.
 *
 *  This program is distributed in the hope that it will be useful,
 *  but WITHOUT ANY WARRANTY; without even the implied warranty of
 *  MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *  GNU General Public License for more details.
 *
 *  See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *  Public License.
 *
 */

use std::net::SocketAddr;

use axum::{
    Json, Router,
    body::Bytes,
    extract::{DefaultBodyLimit, Path, Query, State, rejection::BytesRejection},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use log::{info, warn};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::display::{DisplayError, DisplayState, MimeType, Orientation, SessionState, SharedSession, Transport};

/// Largest image body accepted by `POST /display/bitmap`
pub const MAX_BODY_BYTES: usize = 16 * 1024 * 1024;

/// Body of `GET /display`
#[derive(Debug, Serialize)]
pub struct StatusReply {
    pub state: SessionState,
    #[serde(flatten)]
    pub display: DisplayState,
}

#[derive(Debug, Default, Deserialize)]
pub struct OrientationQuery {
    #[serde(default)]
    pub reverse: bool,
}

/// Request failure as an HTTP response with a JSON body
#[derive(Debug)]
pub enum ApiError {
    Display(DisplayError),
    /// Body could not be read, e.g. larger than the configured limit
    Body(BytesRejection),
}

impl From<DisplayError> for ApiError {
    fn from(err: DisplayError) -> Self {
        ApiError::Display(err)
    }
}

impl From<BytesRejection> for ApiError {
    fn from(rejection: BytesRejection) -> Self {
        ApiError::Body(rejection)
    }
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::Display(DisplayError::Validation(_)) => StatusCode::BAD_REQUEST,
            ApiError::Display(DisplayError::UnsupportedMimeType(_)) => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            ApiError::Display(DisplayError::Decode(_)) => StatusCode::UNPROCESSABLE_ENTITY,
            ApiError::Display(DisplayError::NotReady(_)) => StatusCode::CONFLICT,
            ApiError::Display(DisplayError::Transport(_)) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::Body(rejection) => rejection.status(),
        }
    }

    fn message(&self) -> String {
        match self {
            ApiError::Display(err) => err.to_string(),
            ApiError::Body(rejection) => rejection.body_text(),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = self.message();
        if status.is_server_error() {
            warn!("request failed: {}", message);
        }
        (status, Json(json!({ "error": message }))).into_response()
    }
}

type ApiResult = Result<StatusCode, ApiError>;

/// Route table, built once at start-up.
///
/// Every handler takes the session lock for the whole operation.
pub fn router<T: Transport + 'static>(session: SharedSession<T>) -> Router {
    router_with_limit(session, MAX_BODY_BYTES)
}

/// [`router`] with a custom request body limit in bytes
pub fn router_with_limit<T: Transport + 'static>(session: SharedSession<T>, body_limit: usize) -> Router {
    Router::new()
        .route("/display", get(status::<T>))
        .route("/display/reset", post(reset::<T>))
        .route("/display/clear", post(clear::<T>))
        .route("/display/black", post(to_black::<T>))
        .route("/display/on", post(screen_on::<T>))
        .route("/display/off", post(screen_off::<T>))
        .route("/display/orientation/:orientation", put(set_orientation::<T>))
        .route("/display/brightness/:percent", put(set_brightness::<T>))
        .route("/display/bitmap/:x/:y", post(display_bitmap::<T>))
        .layer(DefaultBodyLimit::max(body_limit))
        .with_state(session)
}

/// Bind and serve until `shutdown` resolves
pub async fn serve<T, F>(session: SharedSession<T>, addr: SocketAddr, shutdown: F) -> std::io::Result<()>
where
    T: Transport + 'static,
    F: Future<Output = ()> + Send + 'static,
{
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("Listening on http://{}", listener.local_addr()?);
    axum::serve(listener, router(session))
        .with_graceful_shutdown(shutdown)
        .await
}

async fn status<T: Transport + 'static>(State(session): State<SharedSession<T>>) -> Json<StatusReply> {
    let session = session.lock().await;
    Json(StatusReply {
        state: session.state(),
        display: session.display_state(),
    })
}

async fn reset<T: Transport + 'static>(State(session): State<SharedSession<T>>) -> ApiResult {
    let mut session = session.lock().await;
    let orientation = session.display_state().orientation;
    session.init(orientation).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn clear<T: Transport + 'static>(State(session): State<SharedSession<T>>) -> ApiResult {
    session.lock().await.clear().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn to_black<T: Transport + 'static>(State(session): State<SharedSession<T>>) -> ApiResult {
    session.lock().await.to_black().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn screen_on<T: Transport + 'static>(State(session): State<SharedSession<T>>) -> ApiResult {
    session.lock().await.screen_on().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn screen_off<T: Transport + 'static>(State(session): State<SharedSession<T>>) -> ApiResult {
    session.lock().await.screen_off().await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_orientation<T: Transport + 'static>(
    State(session): State<SharedSession<T>>,
    Path(orientation): Path<String>,
    Query(query): Query<OrientationQuery>,
) -> ApiResult {
    let orientation: Orientation = orientation.parse()?;
    session.lock().await.set_orientation(orientation, query.reverse).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn set_brightness<T: Transport + 'static>(
    State(session): State<SharedSession<T>>,
    Path(percent): Path<u8>,
) -> ApiResult {
    session.lock().await.set_brightness(percent).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn display_bitmap<T: Transport + 'static>(
    State(session): State<SharedSession<T>>,
    Path((x, y)): Path<(u16, u16)>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult {
    let body = body?;
    let content_type = headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| DisplayError::UnsupportedMimeType("(missing Content-Type)".into()))?;
    let mime: MimeType = content_type.parse()?;

    let rect = session.lock().await.display_bitmap(x, y, mime, &body).await?;
    info!("bitmap {} ({} bytes {}) displayed", rect, body.len(), mime);
    Ok(StatusCode::NO_CONTENT)
}
