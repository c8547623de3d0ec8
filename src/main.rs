//! Server binary: reads configuration from the environment, prepares the database and serves the API.

use std::time::Duration;
use tokio::net::TcpListener;
use tracing_subscriber::EnvFilter;
use unihub::service::{AuthService, Passwords};
use unihub::{app, apply_migrations, connect, ensure_database_exists, storage, AppState, Config};

const SESSION_SWEEP_INTERVAL: Duration = Duration::from_secs(15 * 60);

fn init_tracing(json: bool) -> Result<(), Box<dyn std::error::Error>> {
    let filter = EnvFilter::try_from_default_env().or_else(|_| EnvFilter::try_new("unihub=info,tower_http=info"))?;
    if json {
        tracing_subscriber::fmt().json().with_env_filter(filter).init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter).init();
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::from_env()?;
    init_tracing(config.log_json)?;

    ensure_database_exists(&config.database_url).await?;
    let pool = connect(&config).await?;
    apply_migrations(&pool).await?;

    let passwords = Passwords::new()?;
    if let (Some(email), Some(password)) = (config.admin_email.as_deref(), config.admin_password.as_deref()) {
        AuthService::ensure_admin(&pool, &passwords, email, password).await?;
    }

    let assets = storage::from_config(&config.storage).await?;

    let sweeper = pool.clone();
    tokio::spawn(async move {
        let mut tick = tokio::time::interval(SESSION_SWEEP_INTERVAL);
        loop {
            tick.tick().await;
            match AuthService::purge_expired_sessions(&sweeper).await {
                Ok(0) => {}
                Ok(n) => tracing::info!(removed = n, "expired sessions purged"),
                Err(e) => tracing::warn!(error = %e, "session purge failed"),
            }
        }
    });

    let bind_addr = config.bind_addr;
    let state = AppState::new(pool, config, passwords, assets);
    let listener = TcpListener::bind(bind_addr).await?;
    tracing::info!("listening on {}", listener.local_addr()?);
    axum::serve(listener, app(state))
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutting down");
        })
        .await?;
    Ok(())
}
