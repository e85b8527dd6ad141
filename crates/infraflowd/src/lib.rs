//! InfraFlow daemon
//!
//! HTTP front end for [`Provisioner`]: resource groups, virtual networks and
//! virtual machines, one workflow per request.

pub mod api;
pub mod routes;

use anyhow::{Context, Result};
use axum::Router;
use axum::extract::Request;
use axum::middleware::{self, Next};
use axum::response::Response;
use axum::routing::{get, post};
use infraflow_cloud::{AdminAccess, Provisioner};
use std::path::Path;
use tokio_util::sync::{CancellationToken, DropGuard};
use tracing::Instrument;

/// Shared by every handler
#[derive(Clone)]
pub struct AppState {
    pub provisioner: Provisioner,
    shutdown: CancellationToken,
}

impl AppState {
    pub fn new(provisioner: Provisioner, shutdown: CancellationToken) -> Self {
        Self {
            provisioner,
            shutdown,
        }
    }

    /// Token for one request's workflow
    ///
    /// Cancelled on server shutdown, or when the guard drops because the
    /// handler finished or the client went away.
    pub fn request_token(&self) -> (CancellationToken, DropGuard) {
        let token = self.shutdown.child_token();
        let guard = token.clone().drop_guard();
        (token, guard)
    }
}

/// Administrator access from an OpenSSH public key file
pub fn admin_access(username: &str, key_file: &Path) -> Result<AdminAccess> {
    let key = std::fs::read_to_string(key_file)
        .with_context(|| format!("failed to read SSH public key from {}", key_file.display()))?;
    let admin = AdminAccess::new(username, key);
    if admin.ssh_public_key.is_empty() {
        anyhow::bail!("SSH public key file {} is empty", key_file.display());
    }
    Ok(admin)
}

pub fn router(provisioner: Provisioner, shutdown: CancellationToken) -> Router {
    Router::new()
        .route("/health", get(routes::health))
        .route("/rg", post(routes::create_resource_group))
        .route(
            "/rg/{rg_name}",
            get(routes::get_resource_group).delete(routes::delete_resource_group),
        )
        .route("/rg/{rg_name}/vm", post(routes::create_virtual_machine))
        .route(
            "/rg/{rg_name}/vm/{vm_name}",
            get(routes::get_virtual_machine),
        )
        .route("/rg/{rg_name}/vnet", post(routes::create_virtual_network))
        .route(
            "/rg/{rg_name}/vnet/{vnet_name}",
            get(routes::get_virtual_network),
        )
        .layer(middleware::from_fn(trace_request))
        .with_state(AppState::new(provisioner, shutdown))
}

async fn trace_request(request: Request, next: Next) -> Response {
    let span = tracing::info_span!(
        "request",
        method = %request.method(),
        path = %request.uri().path(),
    );
    async move {
        let response = next.run(request).await;
        tracing::info!(status = response.status().as_u16(), "Request handled");
        response
    }
    .instrument(span)
    .await
}
