use crate::{error::Error, forms::ValidationError};
use axum::{
    extract::FromRequestParts,
    response::{IntoResponse, Redirect, Response},
    Json,
};
use axum_messages::Messages;
use http::{header, request::Parts, HeaderMap};

/// Body of every JSON answer: `{"success": bool, "message": string}`.
#[derive(Debug, serde::Serialize)]
pub struct Envelope {
    pub success: bool,
    pub message: String,
}

impl Envelope {
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

pub fn wants_json(headers: &HeaderMap) -> bool {
    let requested_with = headers
        .get("x-requested-with")
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("XMLHttpRequest"));
    let accepts_json = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.contains("application/json"));
    requested_with || accepts_json
}

/// Whether the caller expects JSON instead of a redirect.
#[derive(Clone, Copy, Debug)]
pub struct Ajax(pub bool);

impl<S: Send + Sync> FromRequestParts<S> for Ajax {
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Ajax(wants_json(&parts.headers)))
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Success(String),
    Failure(String),
}

impl From<ValidationError> for Outcome {
    fn from(err: ValidationError) -> Self {
        Outcome::Failure(err.to_string())
    }
}

impl Outcome {
    pub fn envelope(self) -> Envelope {
        match self {
            Outcome::Success(message) => Envelope {
                success: true,
                message,
            },
            Outcome::Failure(message) => Envelope::failure(message),
        }
    }

    /// JSON for AJAX callers, otherwise a flash message and a redirect to `back`.
    pub fn respond(self, ajax: Ajax, messages: Messages, back: &str) -> Response {
        if ajax.0 {
            return Json(self.envelope()).into_response();
        }
        match self {
            Outcome::Success(message) => messages.success(message),
            Outcome::Failure(message) => messages.error(message),
        };
        Redirect::to(back).into_response()
    }
}

pub fn finish(result: Result<Outcome, Error>, ajax: Ajax, messages: Messages, back: &str) -> Response {
    match result {
        Ok(outcome) => outcome.respond(ajax, messages, back),
        Err(err) if ajax.0 => err.into_json_response(),
        Err(err) => err.into_response(),
    }
}

/// Unwraps a validation result, turning a failure into an early `Ok(Outcome::Failure)`.
macro_rules! validated {
    ($result:expr) => {
        match $result {
            Ok(value) => value,
            Err(err) => return Ok($crate::respond::Outcome::from(err)),
        }
    };
}

pub(crate) use validated;
