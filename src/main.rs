use actix_web::{App, HttpServer, middleware::Logger, web};
use anyhow::Context;
use sqlx::postgres::PgPoolOptions;
use std::sync::Arc;
use std::time::Duration;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use clinicguard::{
  adapters::http::{SessionSettings, StartSession, configure_auth_routes, configure_web_routes},
  domain::auth::{AuthManager, ports::SessionRepository},
  infrastructure::{
    config::{Config, RedisConfig, SessionDriver},
    events::TracingEventDispatcher,
    persistence::{MemorySessionRepository, PostgresUserProvider, RedisSessionRepository},
    security::{Argon2PasswordHasher, CookieEncrypter, SecureTokenGenerator},
  },
};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
  // Initialize environment variables from .env file
  dotenvy::dotenv().ok();

  // Initialize tracing subscriber for logging
  tracing_subscriber::registry()
    .with(
      tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "clinicguard=debug,audit=info,actix_web=info".into()),
    )
    .with(tracing_subscriber::fmt::layer())
    .init();

  tracing::info!("Starting ClinicGuard");

  let config = Config::load().context("Failed to load configuration")?;
  tracing::info!("Configuration loaded successfully");

  // Set up database connection pool with timeout
  tracing::info!("Connecting to database");

  let db_pool = tokio::time::timeout(
    Duration::from_secs(config.database.connect_timeout_seconds),
    PgPoolOptions::new()
      .max_connections(config.database.max_connections)
      .acquire_timeout(Duration::from_secs(config.database.acquire_timeout_seconds))
      .connect(&config.database.url),
  )
  .await
  .map_err(|_| {
    anyhow::anyhow!(
      "Database connection timed out after {} seconds. Is PostgreSQL running?",
      config.database.connect_timeout_seconds
    )
  })?
  .context("Failed to connect to database")?;

  tracing::info!("Database connection pool created");

  tracing::info!("Running database migrations");
  sqlx::migrate!("./migrations")
    .run(&db_pool)
    .await
    .context("Failed to run database migrations")?;
  tracing::info!("Database migrations completed");

  let sessions: Arc<dyn SessionRepository> = match config.session.driver {
    SessionDriver::Redis => Arc::new(RedisSessionRepository::new(
      connect_redis(&config.redis).await?,
      config.redis.key_prefix.clone(),
    )),
    SessionDriver::Memory => {
      tracing::warn!("Using in-memory sessions; they will not survive a restart");
      Arc::new(MemorySessionRepository::new())
    }
  };

  let password_hasher = Arc::new(Argon2PasswordHasher::new()?);
  let provider = Arc::new(PostgresUserProvider::new(db_pool, password_hasher));

  let manager = Arc::new(AuthManager::new(
    provider,
    Arc::new(SecureTokenGenerator::new()),
    Arc::new(TracingEventDispatcher::new()),
    config
      .auth
      .manager_config()
      .context("Invalid auth configuration")?,
  ));
  tracing::info!(
    "Guard '{}' ready with {:?} driver",
    manager.guard_name(),
    config.auth.driver
  );

  let encrypter = Arc::new(
    CookieEncrypter::new(&config.security.encryption_key_base64)
      .context("Invalid cookie encryption key")?,
  );

  let settings = SessionSettings {
    cookie_name: config.session.cookie_name.clone(),
    lifetime: config
      .session
      .lifetime()
      .context("Invalid session configuration")?,
    secure: config.session.secure_cookie,
  };

  let rate_limit = config.rate_limit.clone();
  let login_path = config.auth.login_path.clone();

  tracing::info!(
    "Starting HTTP server on {}:{}",
    config.server.host,
    config.server.port
  );

  HttpServer::new(move || {
    App::new()
      .wrap(Logger::default())
      .wrap(StartSession::new(
        sessions.clone(),
        manager.clone(),
        encrypter.clone(),
        settings.clone(),
      ))
      .service(
        web::scope("/api/v1/auth").configure(|cfg| configure_auth_routes(cfg, &rate_limit)),
      )
      .configure(|cfg| configure_web_routes(cfg, &login_path))
  })
  .bind((config.server.host.as_str(), config.server.port))?
  .run()
  .await?;

  Ok(())
}

/// Opens a Redis connection manager, giving up after the configured timeout
async fn connect_redis(config: &RedisConfig) -> anyhow::Result<redis::aio::ConnectionManager> {
  tracing::info!("Connecting to Redis");

  let client = redis::Client::open(config.url.clone()).context("Invalid Redis URL")?;

  let conn = tokio::time::timeout(
    Duration::from_secs(config.connect_timeout_seconds),
    client.get_connection_manager(),
  )
  .await
  .map_err(|_| {
    anyhow::anyhow!(
      "Redis connection timed out after {} seconds. Is Redis running?",
      config.connect_timeout_seconds
    )
  })?
  .context("Failed to connect to Redis")?;

  tracing::info!("Redis connection established");
  Ok(conn)
}
