//! Current-account endpoint.
//!
//! Answers `GET <me.path>` with the projected account of the caller.

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::forwarding::project;
use crate::http::response::no_store;
use crate::http::server::AppState;

pub async fn current_account(State(state): State<AppState>, request: Request<Body>) -> Response {
    let (parts, _) = request.into_parts();

    let mut response = match state.accounts.account(&parts) {
        Ok(account) => {
            let projected = project(account.as_ref(), &state.me_policy);
            Json(json!({ "account": projected })).into_response()
        }
        Err(_) => {
            let mut response = (
                StatusCode::UNAUTHORIZED,
                Json(json!({
                    "error": "unauthorized",
                    "message": "Authentication required",
                })),
            )
                .into_response();
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));
            response
        }
    };

    no_store(response.headers_mut());
    response
}
