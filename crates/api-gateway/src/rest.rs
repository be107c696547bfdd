//! HTTP server

use std::future::Future;
use std::net::SocketAddr;

use axum::routing::IntoMakeService;
use axum::{Router, Server};
use hyper::server::conn::AddrIncoming;
use tracing::{error, info};

use common::error::{Error, Result};

/// REST API server bound to a socket
pub struct RestAPI {
    server: Server<AddrIncoming, IntoMakeService<Router>>,
}

impl RestAPI {
    /// Binds `router` to `addr`. Port 0 picks a free port.
    pub fn bind(addr: SocketAddr, router: Router) -> Result<Self> {
        let builder = Server::try_bind(&addr).map_err(|e| Error::Config(format!("cannot bind {}: {}", addr, e)))?;

        Ok(Self {
            server: builder.serve(router.into_make_service()),
        })
    }

    /// Address actually bound
    pub fn local_addr(&self) -> SocketAddr {
        self.server.local_addr()
    }

    /// Serves requests until `shutdown` completes, then drains in-flight requests
    pub async fn run<F>(self, shutdown: F) -> Result<()>
    where
        F: Future<Output = ()>,
    {
        info!("Listening on http://{}", self.local_addr());

        self.server
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| Error::Internal(format!("server error: {}", e)))?;

        info!("Server stopped");
        Ok(())
    }
}

/// Completes on Ctrl-C, or SIGTERM on Unix
pub async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};

        match signal(SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => info!("Received Ctrl-C, shutting down"),
        _ = terminate => info!("Received SIGTERM, shutting down"),
    }
}
