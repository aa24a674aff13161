//! API Server Entry Point
//!
//! Application entry point and server initialization.
//! Uses `anyhow` for startup errors, but application-level
//! errors should use `kernel::error::AppError`.

use std::env;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use academy::{AcademyConfig, FsBlobStore, PgAcademyRepository, StripeConfig, StripeGateway};
use anyhow::Context;
use axum::{
    Router, http,
    http::{Method, header},
    middleware,
};
use base64::Engine;
use base64::engine::general_purpose;
use identity::{
    HttpOAuthProvider, IdentityConfig, IdentityMiddlewareState, OAuthClientConfig,
    PgIdentityRepository, resolve_identity,
};
use sqlx::postgres::PgPoolOptions;
use tokio::net::TcpListener;
use tower_http::cors::{AllowHeaders, AllowMethods, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

// Re-export unified error types for use in handlers
pub use kernel::error::{
    app_error::{AppError, AppResult},
    kind::ErrorKind,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env file
    dotenvy::dotenv().ok();

    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "api=info,identity=info,academy=info,tower_http=info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // Database connection
    let database_url = env::var("DATABASE_URL").context("DATABASE_URL must be set")?;
    let max_connections = env_or("DATABASE_MAX_CONNECTIONS", 10u32)?;

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(&database_url)
        .await?;

    tracing::info!(max_connections, "Connected to database");

    // Run migrations
    sqlx::migrate!("../../../database/migrations")
        .run(&pool)
        .await?;

    tracing::info!("Migrations completed");

    // Startup cleanup: remove expired sessions
    // Errors here should not prevent server startup
    let identity_repo = PgIdentityRepository::new(pool.clone());
    match identity_repo.cleanup_expired().await {
        Ok(sessions) => {
            tracing::info!(sessions_deleted = sessions, "Auth session cleanup completed");
        }
        Err(e) => {
            tracing::warn!(error = %e, "Auth session cleanup failed, continuing anyway");
        }
    }

    let identity_config = Arc::new(load_identity_config()?);
    let oauth_provider = HttpOAuthProvider::new(load_oauth_config()?)?;

    let academy_config = Arc::new(load_academy_config()?);
    let stripe = StripeGateway::new(StripeConfig::new(
        env::var("STRIPE_SECRET_KEY").context("STRIPE_SECRET_KEY must be set")?,
        env::var("STRIPE_WEBHOOK_SECRET").context("STRIPE_WEBHOOK_SECRET must be set")?,
    ))?;
    let blob_root = env::var("BLOB_ROOT").unwrap_or_else(|_| "./storage".to_string());
    tracing::info!(blob_root = %blob_root, "Serving lesson files from disk");

    // CORS configuration
    let frontend_origins = env::var("FRONTEND_ORIGINS")
        .unwrap_or_else(|_| "http://localhost:3000,http://127.0.0.1:3000".to_string());

    let allowed_origins: Vec<http::HeaderValue> = frontend_origins
        .split(',')
        .filter_map(|origin| origin.trim().parse().ok())
        .collect();

    let cors = CorsLayer::new()
        .allow_origin(allowed_origins)
        .allow_methods(AllowMethods::list([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::OPTIONS,
        ]))
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            header::ACCEPT,
        ]))
        .allow_credentials(true);

    // Build router
    let identity_layer = middleware::from_fn_with_state(
        IdentityMiddlewareState::new(identity_repo.clone(), identity_config.clone()),
        resolve_identity::<PgIdentityRepository>,
    );

    let app = Router::new()
        .nest(
            "/api/auth",
            identity::identity_router(identity_repo, oauth_provider, identity_config),
        )
        .nest(
            "/api",
            academy::academy_router(
                PgAcademyRepository::new(pool.clone()),
                stripe,
                FsBlobStore::new(blob_root),
                academy_config,
            ),
        )
        .layer(identity_layer)
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    // Start server
    let addr: SocketAddr = env::var("BIND_ADDRESS")
        .unwrap_or_else(|_| "0.0.0.0:31113".to_string())
        .parse()
        .context("BIND_ADDRESS must be host:port")?;
    tracing::info!("Listening on {}", addr);

    let listener = TcpListener::bind(addr).await?;
    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await?;

    pool.close().await;
    tracing::info!("Server stopped");

    Ok(())
}

fn load_identity_config() -> anyhow::Result<IdentityConfig> {
    let mut config = if cfg!(debug_assertions) {
        IdentityConfig::development()
    } else {
        // In production, load secret from environment
        let secret_b64 =
            env::var("SESSION_SECRET").context("SESSION_SECRET must be set in production")?;
        let secret_bytes = Engine::decode(&general_purpose::STANDARD, &secret_b64)?;
        let session_secret: [u8; 32] = secret_bytes
            .try_into()
            .map_err(|_| anyhow::anyhow!("SESSION_SECRET must decode to 32 bytes"))?;
        IdentityConfig {
            session_secret,
            ..IdentityConfig::default()
        }
    };

    if let Ok(raw) = env::var("ADMIN_EMAILS") {
        config.admin_emails = IdentityConfig::parse_admin_emails(&raw);
    }
    if let Ok(redirect) = env::var("POST_SIGN_IN_REDIRECT") {
        config.post_sign_in_redirect = redirect;
    }

    Ok(config)
}

fn load_oauth_config() -> anyhow::Result<OAuthClientConfig> {
    let required = |key: &str| env::var(key).with_context(|| format!("{key} must be set"));

    Ok(OAuthClientConfig {
        client_id: required("OAUTH_CLIENT_ID")?,
        client_secret: required("OAUTH_CLIENT_SECRET")?,
        authorize_url: required("OAUTH_AUTHORIZE_URL")?,
        token_url: required("OAUTH_TOKEN_URL")?,
        userinfo_url: required("OAUTH_USERINFO_URL")?,
        redirect_uri: required("OAUTH_REDIRECT_URI")?,
        scopes: env::var("OAUTH_SCOPES").unwrap_or_else(|_| "openid email profile".to_string()),
    })
}

fn load_academy_config() -> anyhow::Result<AcademyConfig> {
    let mut config = if cfg!(debug_assertions) {
        AcademyConfig::development()
    } else {
        AcademyConfig {
            media_token_secret: env::var("MEDIA_TOKEN_SECRET")
                .context("MEDIA_TOKEN_SECRET must be set in production")?,
            media_library_id: env::var("MEDIA_LIBRARY_ID")
                .context("MEDIA_LIBRARY_ID must be set in production")?,
            ..AcademyConfig::default()
        }
    };

    if let Ok(secret) = env::var("MEDIA_TOKEN_SECRET") {
        config.media_token_secret = secret;
    }
    if let Ok(library_id) = env::var("MEDIA_LIBRARY_ID") {
        config.media_library_id = library_id;
    }
    if let Ok(host) = env::var("MEDIA_EMBED_HOST") {
        config.media_embed_host = host;
    }
    if let Ok(currency) = env::var("PAYMENT_CURRENCY") {
        config.currency = currency.to_lowercase();
    }
    if let Ok(url) = env::var("CHECKOUT_SUCCESS_URL") {
        config.checkout_success_url = url;
    }
    if let Ok(url) = env::var("CHECKOUT_CANCEL_URL") {
        config.checkout_cancel_url = url;
    }
    config.media_token_ttl = Duration::from_secs(env_or(
        "MEDIA_TOKEN_TTL_SECS",
        config.media_token_ttl.as_secs(),
    )?);

    Ok(config)
}

/// Parse an optional numeric variable, falling back to `default` when unset
fn env_or<T>(key: &str, default: T) -> anyhow::Result<T>
where
    T: std::str::FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse()
            .with_context(|| format!("{key} is not a valid number")),
        Err(_) => Ok(default),
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    tracing::info!("Shutdown signal received");
}
