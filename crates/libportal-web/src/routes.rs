use super::{
    dashboard, events, loans,
    login::{login, logout, BackEnd, HOME_URL},
    patrons, programs,
};
use axum::{
    extract::DefaultBodyLimit,
    response::{Html, IntoResponse, Redirect},
    routing::get,
};
use axum_login::{tower_sessions::MemoryStore, AuthManagerLayer};
use axum_messages::MessagesManagerLayer;
use tower_http::{services::ServeDir, trace::TraceLayer};

/// Room for the text fields sent next to the image.
const MULTIPART_OVERHEAD: usize = 64 * 1024;

pub(super) fn setup(
    app_state: super::AppState,
    auth_manager: AuthManagerLayer<BackEnd, MemoryStore>,
) -> axum::routing::Router {
    let upload_limit = app_state.uploads.max_bytes() + MULTIPART_OVERHEAD;
    let uploaded_files = ServeDir::new(app_state.uploads.directory());
    axum::Router::new()
        .route("/", get(home))
        .route("/login.php", get(login::get).post(login::post))
        .route("/logout", get(logout::get).post(logout::post))
        .route("/dashboard", get(dashboard::get))
        .route("/patrons", get(patrons::get).post(patrons::post))
        .route("/borrowing-history", get(loans::get).post(loans::post))
        .route(
            "/events",
            get(events::get)
                .post(events::post)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/reading-programs", get(programs::get).post(programs::post))
        .nest_service(app_state.uploads.url_prefix(), uploaded_files)
        .fallback(fallback)
        .layer(MessagesManagerLayer)
        .layer(auth_manager)
        .layer(TraceLayer::new_for_http())
        .with_state(app_state)
}

pub async fn home() -> Redirect {
    Redirect::to(HOME_URL)
}

pub async fn fallback(_uri: axum::http::Uri) -> impl IntoResponse {
    (
        axum::http::StatusCode::NOT_FOUND,
        Html("<!DOCTYPE html><html><head><title>Not found</title></head><body><h1>Page not found</h1><p><a href=\"/dashboard\">Back to the dashboard</a></p></body></html>"),
    )
}
