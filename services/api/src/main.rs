use anyhow::Result;
use tracing::{Level, info};
use tracing_subscriber::FmtSubscriber;

mod error;
mod image;
mod jwt;
mod middleware;
mod models;
mod oauth;
mod repositories;
mod routes;
mod state;
mod validation;

use common::database::{DatabaseConfig, init_pool, run_migrations};

use crate::{
    jwt::{JwtConfig, JwtService},
    oauth::{GoogleOAuthClient, GoogleOAuthConfig},
    state::AppState,
};

const DEFAULT_PORT: u16 = 9000;
const DEFAULT_FRONTEND_URL: &str = "http://localhost:5173";
const DEFAULT_MAX_UPLOAD_BYTES: usize = 10 * 1024 * 1024;

#[tokio::main]
async fn main() -> Result<()> {
    // Initialize logging
    let subscriber = FmtSubscriber::builder()
        .with_max_level(Level::INFO)
        .finish();

    tracing::subscriber::set_global_default(subscriber).expect("setting default subscriber failed");

    info!("Starting blog API service");

    // Initialize database connection pool
    let db_config = DatabaseConfig::from_env()?;
    let pool = init_pool(&db_config).await?;

    // Check database connectivity
    if common::database::health_check(&pool).await? {
        info!("Database connection successful");
    } else {
        anyhow::bail!("Failed to connect to database");
    }

    run_migrations(&sqlx::migrate!("./migrations"), &pool).await?;

    // Token signing is required configuration; refuse to start without it
    let jwt_config = JwtConfig::from_env()?;
    let jwt_service = JwtService::new(&jwt_config);

    let oauth_client = match GoogleOAuthConfig::from_env() {
        Some(config) => {
            info!("Google sign-in enabled");
            Some(GoogleOAuthClient::new(&config)?)
        }
        None => {
            info!("Google sign-in not configured, /auth/google routes disabled");
            None
        }
    };

    let frontend_url =
        std::env::var("FRONTEND_URL").unwrap_or_else(|_| DEFAULT_FRONTEND_URL.to_string());

    let max_upload_bytes = std::env::var("MAX_UPLOAD_BYTES")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_MAX_UPLOAD_BYTES);

    let app_state = AppState::new(pool, jwt_service, oauth_client, frontend_url);

    info!("Blog API service initialized successfully");

    // Start the web server
    let app = routes::create_router(app_state, max_upload_bytes);

    let port = std::env::var("PORT")
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(DEFAULT_PORT);
    let addr = format!("0.0.0.0:{port}");

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    info!("Blog API service listening on {}", addr);

    axum::serve(listener, app).await?;

    Ok(())
}
