//! Helpers shared by unit tests that talk to a local HTTP stand-in.

use axum::Router;
use tokio::net::TcpListener;

/// Serves `router` on a random local port and returns its base url.
pub async fn spawn_router(router: Router) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    format!("http://{}", addr)
}
