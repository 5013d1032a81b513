/// RacquetRestring Backend Application
///
/// This is the main entry point for the racquet-restringing marketplace backend.
/// Customers book pickup-and-delivery restringing, partners fulfil orders and
/// admins approve partners and assign work.
///
/// # Startup
///
/// 1. Logging (`RUST_LOG`, default `info`)
/// 2. Configuration from defaults, `.env` and the environment
/// 3. Connection pool and schema migrations
/// 4. Seed data (admin account, catalog, welcome coupon) where missing
/// 5. HTTP server until Ctrl+C or SIGTERM
///
use std::path::Path;

use anyhow::{Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use app_config::AppConfig;
use auth::{PasswordHasher, SessionKeys};
use repository::Repositories;
use server::{AppState, Server};
use service::{MarketplaceService, SeedConfig};

/// Initialize the tracing subscriber for logging
fn init_logger() -> Result<()> {
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logger: {e}"))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_logger()?;

    info!("RacquetRestring backend starting...");

    // Load configuration
    let config = AppConfig::load().context("Failed to load configuration")?;
    if config.uses_insecure_secret() {
        warn!("SECRET_KEY is not set, using the insecure development secret");
    }

    // Initialize database
    let db_pool = db::init_db_pool(&config)
        .await
        .context("Failed to initialize database")?;
    info!("Database initialized successfully");

    let service = MarketplaceService::new(
        Repositories::postgres(db_pool),
        PasswordHasher::new(config.bcrypt_cost),
    )
    .with_role_self_assignment(config.allow_role_self_assignment);
    if config.allow_role_self_assignment {
        warn!("Role self-assignment on registration is enabled");
    }

    service
        .seed_defaults(&SeedConfig {
            admin_phone: config.admin_phone.clone(),
            admin_password: config.admin_password.clone(),
        })
        .await
        .context("Failed to seed database")?;

    if !Path::new(&config.static_dir).exists() {
        warn!("Static directory {} does not exist", config.static_dir);
    }

    let sessions = SessionKeys::new(config.secret_key.as_bytes(), config.session_ttl);
    let state = AppState::new(service, sessions, &config.static_dir)?;

    Server::new(config.http_port, state).start().await?;

    info!("Application stopped");
    Ok(())
}
