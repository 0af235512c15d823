//! Backend entry-point: environment-driven configuration and bootstrap.

use std::env;
use std::net::SocketAddr;

use actix_web::cookie::{Key, SameSite};
use diesel::Connection;
use diesel::pg::PgConnection;
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use tracing::{info, warn};
use tracing_subscriber::{EnvFilter, fmt};

use newsecho_backend::outbound::persistence::{DbPool, PoolConfig};
use newsecho_backend::server::{IdentityProviderConfig, ServerConfig, run};

const MIGRATIONS: EmbeddedMigrations = embed_migrations!("migrations");

/// Application bootstrap.
#[actix_web::main]
async fn main() -> std::io::Result<()> {
    if let Err(e) = fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .json()
        .try_init()
    {
        warn!(error = %e, "tracing init failed");
    }

    let key = load_session_key()?;
    let cookie_secure = env::var("SESSION_COOKIE_SECURE")
        .map(|v| v != "0")
        .unwrap_or(true);
    let bind_addr: SocketAddr = env::var("BIND_ADDR")
        .unwrap_or_else(|_| "0.0.0.0:8080".into())
        .parse()
        .map_err(|e| std::io::Error::other(format!("invalid BIND_ADDR: {e}")))?;

    let mut config = ServerConfig::new(key, cookie_secure, SameSite::Lax, bind_addr);

    if let Ok(database_url) = env::var("DATABASE_URL") {
        run_migrations(&database_url).await?;
        let pool = DbPool::new(PoolConfig::new(&database_url))
            .await
            .map_err(|e| std::io::Error::other(format!("database pool: {e}")))?;
        config = config.with_db_pool(pool);
    } else {
        warn!("DATABASE_URL not set, using in-memory stores");
    }

    match (env::var("IDENTITY_BASE_URL"), env::var("IDENTITY_API_KEY")) {
        (Ok(base_url), Ok(api_key)) => {
            config = config.with_identity_provider(IdentityProviderConfig { base_url, api_key });
        }
        (Ok(_), Err(_)) | (Err(_), Ok(_)) => {
            warn!("IDENTITY_BASE_URL and IDENTITY_API_KEY must both be set, ignoring");
        }
        (Err(_), Err(_)) => {}
    }

    if let Ok(upload_url) = env::var("IMAGE_UPLOAD_URL") {
        config = config.with_image_host(upload_url);
    }

    info!("starting NewsEcho backend");
    run(config).await
}

fn load_session_key() -> std::io::Result<Key> {
    let key_path =
        env::var("SESSION_KEY_FILE").unwrap_or_else(|_| "/var/run/secrets/session_key".into());
    match std::fs::read(&key_path) {
        Ok(bytes) => Ok(Key::derive_from(&bytes)),
        Err(e) => {
            let allow_dev = env::var("SESSION_ALLOW_EPHEMERAL").ok().as_deref() == Some("1");
            if cfg!(debug_assertions) || allow_dev {
                warn!(path = %key_path, error = %e, "using temporary session key (dev only)");
                Ok(Key::generate())
            } else {
                Err(std::io::Error::other(format!(
                    "failed to read session key at {key_path}: {e}"
                )))
            }
        }
    }
}

/// Apply pending migrations over a blocking connection before the pool
/// starts serving traffic.
async fn run_migrations(database_url: &str) -> std::io::Result<()> {
    let database_url = database_url.to_owned();
    tokio::task::spawn_blocking(move || {
        let mut conn = PgConnection::establish(&database_url)
            .map_err(|e| std::io::Error::other(format!("database connection: {e}")))?;
        conn.run_pending_migrations(MIGRATIONS)
            .map(|applied| {
                if !applied.is_empty() {
                    info!(count = applied.len(), "applied database migrations");
                }
            })
            .map_err(|e| std::io::Error::other(format!("database migration: {e}")))
    })
    .await
    .map_err(|e| std::io::Error::other(format!("migration task: {e}")))?
}
