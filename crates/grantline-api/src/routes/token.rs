use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use axum::routing::post;
use axum::{Json, Router};

use grantline_core::error::Error;
use grantline_core::request::TokenRequest;

use crate::error::ApiError;
use crate::server::AppState;

const FORM_CONTENT_TYPE: &str = "application/x-www-form-urlencoded";

pub fn router() -> Router<AppState> {
    Router::new().route("/oauth/token", post(token))
}

async fn token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<Response, ApiError> {
    let api_error = |e: Error| ApiError::new(e, state.config.server.realm.clone());

    let request = parse_request(&headers, &body).map_err(api_error)?;
    let token = state.endpoint.handle(&request).await.map_err(api_error)?;

    let mut response = Json(token).into_response();
    let headers = response.headers_mut();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));
    Ok(response)
}

/// Decode a form-encoded token request (RFC 6749 §3.2). A body of any other
/// type is kept as an unreadable request so client authentication still
/// runs first.
fn parse_request(headers: &HeaderMap, body: &[u8]) -> Result<TokenRequest, Error> {
    let authorization = match headers.get(header::AUTHORIZATION) {
        Some(value) => Some(value.to_str().map_err(|_| Error::InvalidClient)?.to_string()),
        None => None,
    };

    if !is_form(headers) {
        return Ok(TokenRequest::unreadable(
            authorization,
            format!("content type must be {FORM_CONTENT_TYPE}"),
        ));
    }

    let pairs = url::form_urlencoded::parse(body).into_owned();
    TokenRequest::from_form(pairs, authorization)
}

fn is_form(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .is_some_and(|mime| mime.trim().eq_ignore_ascii_case(FORM_CONTENT_TYPE))
}
