use anyhow::Context;
use axum_login::{
    tower_sessions::{MemoryStore, SessionManagerLayer},
    AuthManagerLayerBuilder,
};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod config;
mod dashboard;
mod error;
mod events;
mod format;
mod forms;
mod jobs;
mod layout;
mod loans;
mod login;
mod patrons;
mod programs;
mod respond;
mod routes;
#[cfg(test)]
mod tests;
mod uploads;

#[tokio::main]
pub async fn main() -> anyhow::Result<()> {
    let config = config::load().context("loading configuration")?;
    init_tracing(&config.tracing);
    let store = libportal_db::create(&config.database).context("creating database store")?;
    let uploads = Arc::new(uploads::UploadDir::new(&config.uploads));
    uploads
        .ensure_exists()
        .await
        .context("creating upload directory")?;
    let session_layer = SessionManagerLayer::new(MemoryStore::default())
        .with_secure(config.session.secure_cookie);
    let login_backend = login::create_backend(store.clone());
    let auth_layer = AuthManagerLayerBuilder::new(login_backend, session_layer).build();
    let app_state = AppState {
        store: store.clone(),
        uploads,
        per_page: config.pages.per_page,
    };
    let app = routes::setup(app_state, auth_layer);

    let cancellation_token = CancellationToken::new();
    let background_jobs = jobs::create(config.jobs, store);
    let jobs_handle = tokio::spawn({
        let cancellation_token = cancellation_token.clone();
        async move { background_jobs.run(cancellation_token).await }
    });

    let bind_to = format!("{}:{}", config.bind_address, config.bind_port);
    let listener = tokio::net::TcpListener::bind(&bind_to)
        .await
        .with_context(|| format!("binding listener to {bind_to}"))?;
    tracing::info!("library portal listening on {bind_to}");
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(cancellation_token.clone()))
        .await
        .context("serving application")?;
    cancellation_token.cancel();
    jobs_handle
        .await
        .context("joining background jobs")?
        .context("running background jobs")?;
    Ok(())
}

#[derive(Clone)]
struct AppState {
    store: libportal_db::Store,
    uploads: Arc<uploads::UploadDir>,
    per_page: i64,
}

fn init_tracing(config: &config::TracingConfig) {
    if config.console {
        console_subscriber::init();
    } else {
        tracing_subscriber::registry()
            .with(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info,tower_http=debug".into()),
            )
            .with(tracing_subscriber::fmt::layer())
            .init();
    }
}

async fn shutdown_signal(cancellation_token: CancellationToken) {
    tokio::select! {
        result = tokio::signal::ctrl_c() => {
            if let Err(err) = result {
                tracing::error!("listening for shutdown signal: {err:?}");
            }
            tracing::info!("shutdown requested");
        }
        _ = cancellation_token.cancelled() => (),
    }
    cancellation_token.cancel();
}
