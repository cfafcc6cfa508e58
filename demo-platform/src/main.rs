use axum::{Router, routing::get};
use dotenvy::dotenv;
use std::net::SocketAddr;
use std::sync::Arc;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use platform_oauth2::{
    InMemoryStateStore, InMemoryTokenStore, OAuthManager, PLATFORM_OAUTH2_STATE_SWEEP_INTERVAL,
    PlatformRegistry, SqlTokenStore, TokenStore,
};
use platform_oauth2_axum::{PLATFORM_OAUTH2_ROUTE_PREFIX, platform_oauth2_router};

mod handlers;

use crate::handlers::{LoggingRecipient, index};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("{}=debug,platform_oauth2=debug", env!("CARGO_CRATE_NAME")).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let registry = Arc::new(PlatformRegistry::from_env()?);

    let tokens: Arc<dyn TokenStore> = match std::env::var("TOKEN_STORE_URL") {
        Ok(url) if !url.is_empty() => {
            let store = SqlTokenStore::connect(&url).await?;
            tracing::info!("Using SQL token store");
            Arc::new(store)
        }
        _ => {
            tracing::info!("TOKEN_STORE_URL not set, tokens are kept in memory");
            Arc::new(InMemoryTokenStore::new())
        }
    };

    let states = Arc::new(InMemoryStateStore::new());
    let _sweeper = states.spawn_sweeper(*PLATFORM_OAUTH2_STATE_SWEEP_INTERVAL);

    let manager = Arc::new(
        OAuthManager::builder(registry)
            .state_store(states)
            .token_store(tokens)
            .with_recipient(Arc::new(LoggingRecipient::new("youtube")))
            .with_recipient(Arc::new(LoggingRecipient::new("youtube_analytics")))
            .build()?,
    );

    let app = Router::new()
        .route("/", get(index))
        .with_state(manager.clone())
        .nest(
            PLATFORM_OAUTH2_ROUTE_PREFIX.as_str(),
            platform_oauth2_router(manager),
        );

    let port: u16 = std::env::var("PORT")
        .ok()
        .and_then(|p| p.parse().ok())
        .unwrap_or(3001);
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    tracing::info!("Listening on http://{}", addr);
    axum_server::bind(addr)
        .serve(app.into_make_service())
        .await?;
    Ok(())
}
