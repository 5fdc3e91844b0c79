use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use grantline_core::error::Error;

/// Token endpoint error rendered per RFC 6749 §5.2.
#[derive(Debug)]
pub struct ApiError {
    error: Error,
    realm: String,
}

#[derive(Serialize)]
struct ErrorBody {
    error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    error_description: Option<String>,
}

impl ApiError {
    pub fn new(error: Error, realm: impl Into<String>) -> Self {
        Self { error, realm: realm.into() }
    }

    pub fn status_code(&self) -> StatusCode {
        match self.error {
            Error::InvalidClient => StatusCode::UNAUTHORIZED,
            _ if self.error.is_oauth() => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();

        // Log internal errors, don't expose details to client
        let error_description = if status.is_server_error() {
            tracing::error!(error = %self.error, "token endpoint internal error");
            None
        } else {
            Some(self.error.to_string())
        };

        let body = ErrorBody {
            error: self.error.error_code(),
            error_description,
        };

        let mut response = (status, axum::Json(body)).into_response();
        let headers = response.headers_mut();
        headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        headers.insert(header::PRAGMA, HeaderValue::from_static("no-cache"));

        if status == StatusCode::UNAUTHORIZED {
            let challenge = format!("Basic realm=\"{}\"", self.realm.replace('"', ""));
            match HeaderValue::from_str(&challenge) {
                Ok(value) => {
                    headers.insert(header::WWW_AUTHENTICATE, value);
                }
                Err(_) => {
                    headers.insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Basic"));
                }
            }
        }

        response
    }
}
