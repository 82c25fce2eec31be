use std::sync::Arc;

use asset_api::{
    auth::{AuthLayerState, PgRoleLookup, RoleLookup, TokenService},
    config::Config,
    db,
    routes::{create_router, AppState},
    users::{UserRepository, UserService},
};
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load environment variables from .env file
    dotenv::dotenv().ok();

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .with_target(false)
        .with_level(true)
        .init();

    tracing::info!("Asset API - Starting...");

    let config = Config::from_env()?;
    tracing::debug!("Loaded configuration: {:?}", config);

    tracing::info!("Connecting to database...");
    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;

    let tokens = Arc::new(TokenService::with_ttls(
        &config.access_secret,
        &config.refresh_secret,
        config.access_token_ttl_secs,
        config.refresh_token_ttl_secs,
    ));
    let role_lookup: Arc<dyn RoleLookup> = Arc::new(PgRoleLookup::new(pool.clone()));

    let state = AppState {
        users: Arc::new(UserService::new(
            Arc::new(UserRepository::new(pool)),
            role_lookup.clone(),
            tokens.clone(),
        )),
        auth: AuthLayerState::new(tokens, role_lookup, config.role_lookup_timeout),
    };

    let app = create_router(state);

    let addr = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&addr).await?;

    tracing::info!("Asset API is running on http://{}", addr);
    tracing::info!("Swagger UI available at http://{}/swagger-ui", addr);

    axum::serve(listener, app).await?;
    Ok(())
}
