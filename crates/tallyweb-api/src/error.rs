//! Error types for tallyweb-api

use axum::http::StatusCode;
use axum::response::{IntoResponse, Json, Response};
use serde::Serialize;
use std::error::Error;
use tallyweb_core::{CoreError, ErrorCode};
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Bad request: {message}")]
    BadRequest { message: String },

    #[error("{source}")]
    Controller {
        resource: String,
        #[source]
        source: CoreError,
    },
}

/// JSON body sent when a controller call fails
#[derive(Debug, Serialize)]
struct ErrorBody {
    code: ErrorCode,
    message: String,
    stack: String,
}

/// Debug rendering of the error followed by its source chain
fn stack_trace(error: &CoreError) -> String {
    let mut trace = format!("{:?}", error);
    let mut source = error.source();
    while let Some(cause) = source {
        trace.push_str("\n    caused by: ");
        trace.push_str(&cause.to_string());
        source = cause.source();
    }
    trace
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            ApiError::BadRequest { message } => (
                StatusCode::BAD_REQUEST,
                Json(serde_json::json!({ "message": message })),
            )
                .into_response(),
            ApiError::Controller { source, .. } => {
                let body = ErrorBody {
                    code: source.code(),
                    message: source.to_string(),
                    stack: stack_trace(&source),
                };
                (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
            }
        }
    }
}
