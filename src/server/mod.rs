// LAN HTTP responder
//
// Routes match on path only; the method is ignored. Anything else gets the
// JSON not-found body.

pub mod handlers;
pub mod params;
pub mod response;

#[cfg(test)]
mod tests;

use std::net::SocketAddr;
use std::sync::Arc;

use axum::routing::any;
use axum::Router;
use tokio::net::TcpListener;
use tokio::sync::{Mutex, Notify};
use tokio::task::JoinHandle;

use crate::error::Result;
use crate::network::NetworkState;
use crate::recording::CameraControl;
use crate::store::MetadataStore;

#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn MetadataStore>,
    pub camera: Arc<dyn CameraControl>,
    pub network: Arc<NetworkState>,
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", any(handlers::index))
        .route("/get_files", any(handlers::get_files))
        .route("/get_file", any(handlers::get_file))
        .route("/start_camera", any(handlers::start_camera))
        .route("/stop_camera", any(handlers::stop_camera))
        .fallback(handlers::not_found)
        .with_state(state)
}

/// Signal to gracefully shut down a running server.
#[derive(Clone, Default)]
pub struct ShutdownSignal {
    notify: Arc<Notify>,
}

impl ShutdownSignal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn trigger(&self) {
        // notify_one keeps a permit if the server is not waiting yet
        self.notify.notify_one();
    }

    pub async fn wait(&self) {
        self.notify.notified().await;
    }
}

struct RunningServer {
    addr: SocketAddr,
    shutdown: ShutdownSignal,
    handle: JoinHandle<()>,
}

impl RunningServer {
    async fn stop(self) {
        self.shutdown.trigger();
        if let Err(e) = self.handle.await {
            log::error!("Web server task failed: {}", e);
        }
        log::info!("Web server on {} stopped", self.addr);
    }
}

pub struct WebServer {
    state: AppState,
    running: Mutex<Option<RunningServer>>,
}

impl WebServer {
    pub fn new(state: AppState) -> Self {
        Self {
            state,
            running: Mutex::new(None),
        }
    }

    /// Bind and serve in the background. A server that is already running is
    /// stopped first. Port 0 picks a free port.
    pub async fn start(&self, host: &str, port: u16) -> Result<SocketAddr> {
        let mut running = self.running.lock().await;
        if let Some(server) = running.take() {
            log::warn!("Server already running on {}, restarting", server.addr);
            server.stop().await;
            self.state.network.set_port(None);
        }

        let listener = TcpListener::bind((host, port)).await?;
        let addr = listener.local_addr()?;
        self.state.network.set_port(Some(addr.port()));

        let shutdown = ShutdownSignal::new();
        let signal = shutdown.clone();
        let app = router(self.state.clone());

        let handle = tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    signal.wait().await;
                    log::info!("Web server shutting down");
                })
                .await;
            if let Err(e) = result {
                log::error!("Web server error: {}", e);
            }
        });

        log::info!("Web server listening on {}", addr);
        *running = Some(RunningServer {
            addr,
            shutdown,
            handle,
        });
        Ok(addr)
    }

    /// Returns false when nothing was running.
    pub async fn stop(&self) -> bool {
        let server = self.running.lock().await.take();
        match server {
            Some(server) => {
                server.stop().await;
                self.state.network.set_port(None);
                true
            }
            None => false,
        }
    }

    pub async fn local_addr(&self) -> Option<SocketAddr> {
        self.running.lock().await.as_ref().map(|s| s.addr)
    }
}
