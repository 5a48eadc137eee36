use std::sync::Arc;

use fieldpost_auth::StaticTokenServer;

#[tokio::main]
async fn main() {
    fieldpost_observability::init();

    let token = std::env::var("FIELDPOST_API_TOKEN").unwrap_or_else(|_| {
        tracing::warn!("FIELDPOST_API_TOKEN not set; using insecure dev default");
        "dev-token".to_string()
    });

    // Dev wiring: one token with the posts scope, anonymous reads allowed.
    // Production swaps in a real OAuth resource server behind the trait.
    let server = Arc::new(
        StaticTokenServer::new()
            .grant(token, ["posts"])
            .allow_anonymous("posts"),
    );

    let app = fieldpost_api::app::build_app(server);

    let addr = std::env::var("FIELDPOST_ADDR").unwrap_or_else(|_| "0.0.0.0:8080".to_string());
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .unwrap_or_else(|e| panic!("failed to bind {addr}: {e}"));

    tracing::info!("listening on {}", listener.local_addr().unwrap());

    axum::serve(listener, app).await.unwrap();
}
