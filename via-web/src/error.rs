//! HTTP status translation, grounded on the teacher's `web::error::Error`
//! match-based `IntoResponse` impl: every `via_core::Error` variant is
//! matched explicitly and logged at the severity its kind warrants before
//! being turned into a status code plus the fixed body text spec.md §6
//! names for each endpoint.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use log::{error, warn};
use via_core::{Error, ErrorKind, RequestErrorKind};

pub struct WebError(pub Error);

impl From<Error> for WebError {
    fn from(err: Error) -> Self {
        Self(err)
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> Response {
        match &self.0.kind {
            ErrorKind::Request(RequestErrorKind::UnknownContext) => {
                warn!("request referenced an unknown context: {}", self.0);
                (StatusCode::BAD_REQUEST, "Invalid context").into_response()
            }
            ErrorKind::Request(RequestErrorKind::NotFound) => (StatusCode::NOT_FOUND, "Not Found").into_response(),
            ErrorKind::Request(
                RequestErrorKind::ActionNotFound
                | RequestErrorKind::ActionNameRequired
                | RequestErrorKind::InvalidScope
                | RequestErrorKind::MissingSessionId,
            ) => {
                warn!("action dispatch rejected: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "Action failed").into_response()
            }
            ErrorKind::Action => {
                error!("action handler raised: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "Action failed").into_response()
            }
            ErrorKind::Render => {
                error!("view render failed: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
            ErrorKind::Router => {
                error!("route dispatch failed: {}", self.0);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal Server Error").into_response()
            }
        }
    }
}
