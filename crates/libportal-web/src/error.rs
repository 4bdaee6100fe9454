use crate::{respond::Envelope, uploads};
use axum::{
    response::{Html, IntoResponse, Response},
    Json,
};
use http::StatusCode;

#[derive(thiserror::Error, Debug)]
pub enum Error {
    #[error("library database error: {0}")]
    Db(#[from] libportal_db::Error),
    #[error("invalid stored value: {0}")]
    InvalidStoredValue(#[from] libportal_db::status::UnknownValue),
    #[error("template rendering: {0}")]
    Template(#[from] askama::Error),
    #[error("upload storage: {0}")]
    Upload(#[from] uploads::Error),
    #[error("reading multipart form: {0}")]
    Multipart(#[from] axum::extract::multipart::MultipartError),
}

const INTERNAL_SERVER_ERROR: &str = "Internal server error";

impl Error {
    /// JSON envelope for AJAX callers. The detail only goes to the log.
    pub fn into_json_response(self) -> Response {
        tracing::error!("request failed: {self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(Envelope::failure(INTERNAL_SERVER_ERROR)),
        )
            .into_response()
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        tracing::error!("request failed: {self}");
        (
            StatusCode::INTERNAL_SERVER_ERROR,
            Html(format!(
                "<!DOCTYPE html><html><head><title>{INTERNAL_SERVER_ERROR}</title></head>\
                 <body><h1>{INTERNAL_SERVER_ERROR}</h1>\
                 <p><a href=\"/dashboard\">Back to the dashboard</a></p></body></html>"
            )),
        )
            .into_response()
    }
}
