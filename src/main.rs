use std::sync::Arc;

use anyhow::Context;
use tower_http::cors::CorsLayer;

use storefront_chat_backend::config::AzureAiConfig;
use storefront_chat_backend::routes::create_router;
use storefront_chat_backend::services::relay::RelayClient;
use storefront_chat_backend::services::token::ManagedIdentityProvider;
use storefront_chat_backend::state::AppState;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let config = AzureAiConfig::from_env();
    if !config.is_complete() {
        tracing::warn!(
            "AZURE_AI_ENDPOINT / AZURE_AI_DEPLOYMENT_NAME not set; /chat/send-message will answer 500"
        );
    }

    let http = reqwest::Client::new();
    let tokens = Arc::new(ManagedIdentityProvider::new(http.clone()));
    let relay = RelayClient::new(config, http, tokens);

    let state = Arc::new(AppState::new(relay));

    let cors = CorsLayer::very_permissive();

    let app = create_router().with_state(state).layer(cors);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:3000")
        .await
        .context("failed to bind 0.0.0.0:3000")?;

    println!("🚀 Storefront chat backend running at http://localhost:3000");
    axum::serve(listener, app).await.context("server exited")?;

    Ok(())
}
