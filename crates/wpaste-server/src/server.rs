use std::future::Future;
use std::sync::Arc;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use wpaste_core::PasteService;
use wpaste_store::EntryStore;

use crate::config::ServerConfig;
use crate::error::ServerResult;
use crate::handler::AppState;
use crate::router::build_router;

/// The wpaste HTTP server plus its background sweep.
pub struct WpasteServer {
    config: ServerConfig,
    service: Arc<PasteService>,
}

impl WpasteServer {
    /// Open the journal under `config.data_dir` and build the service.
    pub fn open(config: ServerConfig) -> ServerResult<Self> {
        let store = EntryStore::open(&config.journal_path(), config.sync_mode)?;
        let service = PasteService::new(Arc::new(store), config.paste.clone())?;
        Ok(Self::with_service(config, Arc::new(service)))
    }

    /// Serve an existing service. `config.paste` is ignored in favour of the
    /// service's own settings.
    pub fn with_service(config: ServerConfig, service: Arc<PasteService>) -> Self {
        Self { config, service }
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn service(&self) -> &Arc<PasteService> {
        &self.service
    }

    /// Build the router (useful for testing).
    pub fn router(&self) -> axum::Router {
        build_router(AppState::new(Arc::clone(&self.service)))
    }

    /// Serve on `config.bind_addr` until Ctrl-C or SIGTERM.
    pub async fn serve(self) -> ServerResult<()> {
        self.serve_with_shutdown(shutdown_signal()).await
    }

    /// Serve on `config.bind_addr` until `shutdown` completes.
    pub async fn serve_with_shutdown(
        self,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let listener = TcpListener::bind(self.config.bind_addr).await?;
        self.serve_on(listener, shutdown).await
    }

    /// Serve on an already bound listener until `shutdown` completes.
    ///
    /// In-flight requests are drained first, then the sweep task is cancelled
    /// and awaited.
    pub async fn serve_on(
        self,
        listener: TcpListener,
        shutdown: impl Future<Output = ()> + Send + 'static,
    ) -> ServerResult<()> {
        let addr = listener.local_addr()?;
        let cancel = CancellationToken::new();
        let sweep = self.service.sweeper().spawn(cancel.clone());

        info!(
            %addr,
            data_dir = %self.config.data_dir.display(),
            entries = self.service.store().len(),
            "wpaste listening"
        );

        let result = axum::serve(listener, self.router())
            .with_graceful_shutdown(shutdown)
            .await;

        cancel.cancel();
        if let Err(e) = sweep.await {
            warn!(error = %e, "sweep task did not exit cleanly");
        }
        info!("wpaste stopped");
        result.map_err(Into::into)
    }
}

/// Completes on Ctrl-C, or SIGTERM on Unix.
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!(error = %e, "failed to listen for ctrl-c");
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
                warn!(error = %e, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("shutdown signal received");
}
