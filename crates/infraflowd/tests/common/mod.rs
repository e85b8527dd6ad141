use infraflow_cloud::mock::MockControlPlane;
use infraflow_cloud::{AdminAccess, CancellationToken, Provisioner};
use std::sync::Arc;

/// The real router served on an ephemeral port over an in-memory control plane
pub struct TestServer {
    pub url: String,
    pub control_plane: Arc<MockControlPlane>,
    shutdown: CancellationToken,
}

impl TestServer {
    pub async fn start(control_plane: MockControlPlane) -> Self {
        let control_plane = Arc::new(control_plane);
        let provisioner = Provisioner::new(
            control_plane.clone(),
            AdminAccess::new("azureuser", "ssh-ed25519 AAAAC3NzaC1lZDI1NTE5AAAAITest test@infraflow"),
        );
        let shutdown = CancellationToken::new();
        let app = infraflowd::router(provisioner, shutdown.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let stop = shutdown.clone();
        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move { stop.cancelled().await })
                .await
                .unwrap();
        });

        Self {
            url: format!("http://{addr}"),
            control_plane,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{}", self.url, path)
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.shutdown.cancel();
    }
}
