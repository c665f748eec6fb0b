//! Local pages for webscribe's real-browser tests
//!
//! Serves `/` (index), `/form` (login form with id and name attributes),
//! `/elements` (unnamed divs and paragraphs plus a `#main` section) and
//! `/slow?ms=N` (responds after N milliseconds, for navigation timeouts). Pass a port as
//! the first argument to run it by hand; it defaults to 3000.

use std::net::SocketAddr;
use tracing::{Level, info};

include!("../../tests/test_server_app.rs");

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt().with_max_level(Level::INFO).init();

    let app = create_app().await;

    let port: u16 = std::env::args()
        .nth(1)
        .and_then(|p| p.parse().ok())
        .unwrap_or(3000);

    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind");

    info!("Test server listening on http://{}", addr);

    axum::serve(listener, app).await.expect("Server failed");
}
