use sqlx::PgPool;
use tokio::task::JoinHandle;
use tower_http::trace::TraceLayer;
use tracing::info;

use crate::api::{create_router, AppState};
use crate::config::Config;
use crate::db::{FloodDamageRepository, ReportRepository};
use crate::geocoder::NaverMapsClient;
use crate::services::{FloodDamageService, ReportService};
use crate::uploads::PhotoStore;

/// Running HTTP server plus the pool it borrows from
///
/// The pool is owned here so it can be closed once the server has drained.
pub struct Application {
    pub server_handle: JoinHandle<Result<(), std::io::Error>>,
    pool: PgPool,
}

impl Application {
    /// Wire repositories and services around `pool` and start serving.
    ///
    /// The server stops accepting connections on Ctrl-C or SIGTERM.
    pub async fn build(config: Config, pool: PgPool) -> Result<Self, Box<dyn std::error::Error>> {
        info!("Initializing application components");

        let report_repo = ReportRepository::new(pool.clone());
        let flood_damage_repo = FloodDamageRepository::new(pool.clone());

        let photo_store = PhotoStore::new(config.upload_dir.clone());
        let report_service = ReportService::new(report_repo, photo_store);
        let flood_damage_service = FloodDamageService::new(flood_damage_repo);

        let geocoder = match &config.naver_base_url {
            Some(base_url) => {
                NaverMapsClient::with_base_url(base_url.clone(), config.naver_credentials.clone())
            }
            None => NaverMapsClient::new(config.naver_credentials.clone()),
        };
        info!(
            "Naver Maps credentials loaded: {}",
            if geocoder.has_credentials() { "yes" } else { "no" }
        );

        tokio::fs::create_dir_all(&config.upload_dir).await?;
        info!("Serving uploads from {}", config.upload_dir.display());

        let app_state = AppState {
            report_service,
            flood_damage_service,
            geocoder,
            upload_dir: config.upload_dir.clone(),
            max_photo_bytes: config.max_photo_bytes,
        };
        let app = create_router(app_state).layer(TraceLayer::new_for_http());

        let addr = config.server_addr();
        info!("Starting HTTP server on {}", addr);
        let listener = tokio::net::TcpListener::bind(&addr).await?;

        let server_handle = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
        });

        info!("Application initialized successfully");
        Ok(Self {
            server_handle,
            pool,
        })
    }

    /// Wait for the server to drain, then close the database pool
    pub async fn run_until_stopped(self) -> Result<(), Box<dyn std::error::Error>> {
        let result = self.server_handle.await;

        info!("Closing database connections");
        self.pool.close().await;

        result??;
        info!("Shutdown complete");
        Ok(())
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    info!("Shutdown signal received, draining connections");
}
