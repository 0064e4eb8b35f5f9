use crate::handlers;
use axum::extract::DefaultBodyLimit;
use axum::routing::{get, post};
use axum::Router;
use log::info;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Upper bound for an uploaded database file.
pub const IMPORT_BODY_LIMIT_BYTES: usize = 64 * 1024 * 1024;

/// Shared handler state: where the live database lives.
#[derive(Debug, Clone)]
pub struct AppState {
    db_path: Arc<PathBuf>,
}

impl AppState {
    pub fn new(db_path: impl Into<PathBuf>) -> Self {
        Self {
            db_path: Arc::new(db_path.into()),
        }
    }

    pub fn db_path(&self) -> &Path {
        &self.db_path
    }
}

/// Builds the `/api` router bound to `state`.
pub fn router(state: AppState) -> Router {
    let api = Router::<AppState>::new()
        .route("/health", get(handlers::health))
        .route("/dashboard", get(handlers::dashboard))
        // bills
        .route("/bills", get(handlers::list_bills).post(handlers::create_bill))
        .route(
            "/bills/:id",
            get(handlers::get_bill)
                .put(handlers::update_bill)
                .delete(handlers::delete_bill),
        )
        // months
        .route("/months", get(handlers::list_months))
        .route("/months/:month", get(handlers::settlement))
        .route("/months/:month/close", post(handlers::close_month))
        .route("/months/:month/reopen", post(handlers::reopen_month))
        .route("/expected-bills", get(handlers::expected_bills))
        // settings
        .route(
            "/settings",
            get(handlers::get_settings).put(handlers::save_settings),
        )
        .route(
            "/utility-types",
            get(handlers::list_utility_types).post(handlers::add_utility_type),
        )
        .route(
            "/utility-types/:id/deactivate",
            post(handlers::deactivate_utility_type),
        )
        .route(
            "/utility-types/:id/activate",
            post(handlers::activate_utility_type),
        )
        // backup
        .route("/backup/export", get(handlers::export_backup))
        .route(
            "/backup/import",
            post(handlers::import_backup).layer(DefaultBodyLimit::max(IMPORT_BODY_LIMIT_BYTES)),
        );

    Router::new().nest("/api", api).with_state(state)
}

/// Serves the API on `listener` until `shutdown` resolves.
pub async fn serve<F>(listener: TcpListener, state: AppState, shutdown: F) -> std::io::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let local_addr = listener.local_addr()?;
    info!(
        "event=server_start module=web status=ok addr={} db_path={}",
        local_addr,
        state.db_path().display()
    );
    axum::serve(listener, router(state))
        .with_graceful_shutdown(shutdown)
        .await?;
    info!("event=server_stop module=web status=ok addr={local_addr}");
    Ok(())
}
