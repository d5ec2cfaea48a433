//! Operator interface.
//!
//! `service.rs` holds the operations; `handlers.rs` binds them to the paths
//! the admin page posts to.

pub mod handlers;
pub mod service;

use axum::{
    extract::State,
    http::HeaderMap,
    routing::{get, post},
    Router,
};

use crate::features::FeatureFlag;
use self::handlers::*;

pub use service::{AdminError, AdminService, ServiceStatus};

pub fn setup_admin_router(state: AdminState) -> Router {
    let mut router = Router::new()
        .route("/refresh-proxies", post(refresh_proxies))
        .route("/proxies", get(list_proxies))
        .route("/proxies/add", post(add_proxy))
        .route("/proxies/update", post(update_proxy))
        .route("/proxies/delete", post(delete_proxy))
        .route("/proxy", get(get_proxy))
        .route("/dns-bypass/save", post(save_dns_bypass))
        .route("/status", get(get_status));

    for flag in FeatureFlag::ALL {
        router = router
            .route(
                &format!("/{}/enable", flag.slug()),
                post(move |State(svc): State<AdminState>, headers: HeaderMap| {
                    set_flag(svc, headers, flag, true)
                }),
            )
            .route(
                &format!("/{}/disable", flag.slug()),
                post(move |State(svc): State<AdminState>, headers: HeaderMap| {
                    set_flag(svc, headers, flag, false)
                }),
            );
    }

    router.with_state(state)
}
