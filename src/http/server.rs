//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, body limits, timeout, request ID)
//! - Bind server to listener (plain TCP or TLS)
//! - Apply hot-reloaded viewer credentials
//! - Drain in-flight requests on shutdown

use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use arc_swap::ArcSwap;
use axum::{
    body::Body,
    extract::DefaultBodyLimit,
    http::Request,
    routing::{any, get},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tower_http::{
    limit::RequestBodyLimitLayer,
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    services::ServeDir,
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::capture::Ingestor;
use crate::config::CatcherConfig;
use crate::http::handlers::{capture_handler, logs_handler};
use crate::http::request::{request_id, X_REQUEST_ID};
use crate::lifecycle::shutdown::wait_for_shutdown;
use crate::lifecycle::startup::{open_ingestor, StartupError};
use crate::net::tls::load_tls_config;
use crate::viewer::page::upload_form;
use crate::viewer::{setup_viewer_router, ViewerCredentials};

/// How long in-flight TLS connections may drain after shutdown.
const TLS_DRAIN_TIMEOUT: Duration = Duration::from_secs(10);

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub ingestor: Arc<Ingestor>,
    pub viewer: Arc<ArcSwap<ViewerCredentials>>,
    pub max_body_size: usize,
}

/// HTTP server for the capture service.
pub struct HttpServer {
    router: Router,
    config: CatcherConfig,
    state: AppState,
}

impl HttpServer {
    /// Open storage and build the router for the given configuration.
    pub fn new(config: CatcherConfig) -> Result<Self, StartupError> {
        let ingestor = open_ingestor(&config)?;
        Ok(Self::with_ingestor(config, ingestor))
    }

    /// Build the server around an already assembled pipeline.
    pub fn with_ingestor(config: CatcherConfig, ingestor: Ingestor) -> Self {
        let state = AppState {
            ingestor: Arc::new(ingestor),
            viewer: Arc::new(ArcSwap::from_pointee(ViewerCredentials::from(&config.viewer))),
            max_body_size: config.listener.max_body_size,
        };

        let router = Self::build_router(&config, state.clone());
        Self {
            router,
            config,
            state,
        }
    }

    /// Build the Axum router with all middleware layers.
    #[allow(deprecated)]
    fn build_router(config: &CatcherConfig, state: AppState) -> Router {
        let max_body = config.listener.max_body_size;

        let mut router = Router::new()
            .route("/logs", get(logs_handler))
            .route("/uploadfile", get(upload_form).post(upload_form))
            .route("/", any(capture_handler))
            .route("/{*path}", any(capture_handler))
            .nest_service("/static", ServeDir::new(Path::new(&config.storage.static_dir)))
            .nest_service("/uploads", ServeDir::new(Path::new(&config.storage.uploads_dir)))
            .with_state(state.clone());

        if config.viewer.enabled {
            router = router.merge(setup_viewer_router(state));
        }

        router
            .layer(DefaultBodyLimit::max(max_body))
            .layer(RequestBodyLimitLayer::new(max_body))
            .layer(TimeoutLayer::new(Duration::from_secs(config.listener.request_timeout_secs)))
            .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
            .layer(TraceLayer::new_for_http().make_span_with(|request: &Request<Body>| {
                tracing::info_span!(
                    "request",
                    request_id = %request_id(request.headers()),
                    method = %request.method(),
                    path = %request.uri().path(),
                )
            }))
            .layer(SetRequestIdLayer::new(X_REQUEST_ID, MakeRequestUuid))
    }

    /// Run the server on a plain TCP listener until shutdown.
    pub async fn run(
        self,
        listener: TcpListener,
        config_updates: mpsc::UnboundedReceiver<CatcherConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        self.spawn_config_updates(config_updates);

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum::serve(listener, app)
            .with_graceful_shutdown(wait_for_shutdown(shutdown))
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// Run the server with TLS termination until shutdown.
    pub async fn run_tls(
        self,
        addr: SocketAddr,
        cert_path: &Path,
        key_path: &Path,
        config_updates: mpsc::UnboundedReceiver<CatcherConfig>,
        shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let tls = load_tls_config(cert_path, key_path).await?;
        tracing::info!(address = %addr, "HTTPS server starting");

        self.spawn_config_updates(config_updates);

        let handle = axum_server::Handle::new();
        let drain = handle.clone();
        tokio::spawn(async move {
            wait_for_shutdown(shutdown).await;
            drain.graceful_shutdown(Some(TLS_DRAIN_TIMEOUT));
        });

        let app = self.router.into_make_service_with_connect_info::<SocketAddr>();
        axum_server::bind_rustls(addr, tls).handle(handle).serve(app).await?;

        tracing::info!("HTTPS server stopped");
        Ok(())
    }

    /// Apply reloaded configs: viewer credentials swap live, the rest needs a restart.
    fn spawn_config_updates(&self, mut updates: mpsc::UnboundedReceiver<CatcherConfig>) {
        let viewer = self.state.viewer.clone();
        let mut current = self.config.clone();

        tokio::spawn(async move {
            while let Some(next) = updates.recv().await {
                if next.viewer != current.viewer {
                    viewer.store(Arc::new(ViewerCredentials::from(&next.viewer)));
                    tracing::info!("Viewer credentials reloaded");
                }
                if next.listener != current.listener
                    || next.storage != current.storage
                    || next.capture != current.capture
                {
                    tracing::warn!("Listener, storage and capture changes require a restart");
                }
                current = next;
            }
        });
    }

    /// Get a reference to the config.
    pub fn config(&self) -> &CatcherConfig {
        &self.config
    }

    /// Shared state, e.g. for inspecting the repository in tests.
    pub fn state(&self) -> &AppState {
        &self.state
    }
}
