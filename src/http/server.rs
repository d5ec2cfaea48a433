//! Admin HTTP server.
//!
//! # Responsibilities
//! - Mount the admin router
//! - Wire up middleware (request ID, tracing, timeout)
//! - Serve until the shutdown broadcast fires
//!
//! # Layer order (outermost first)
//! request id → trace span → timeout → handlers

use axum::{body::Body, http::Request, Router};
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

use crate::admin::{setup_admin_router, AdminService};
use crate::http::request::{request_id, RequestIdLayer};

pub struct AdminServer {
    router: Router,
}

impl AdminServer {
    pub fn new(service: Arc<AdminService>, request_timeout: Duration) -> Self {
        Self {
            router: Self::build_router(service, request_timeout),
        }
    }

    #[allow(deprecated)]
    fn build_router(service: Arc<AdminService>, request_timeout: Duration) -> Router {
        setup_admin_router(service)
            .layer(TimeoutLayer::new(request_timeout))
            .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                tracing::info_span!(
                    "admin_request",
                    method = %req.method(),
                    uri = %req.uri(),
                    request_id = %request_id(req),
                )
            }))
            .layer(RequestIdLayer)
    }

    /// The fully layered router, for serving elsewhere or driving in tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Serve on `listener` until `shutdown` fires (or its sender is dropped).
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "Admin server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
            })
            .await?;

        tracing::info!("Admin server stopped");
        Ok(())
    }
}
