use std::net::SocketAddr;
use std::sync::{Arc, Mutex};

use clap::Parser;
use tracing::{info, warn};

mod app;
mod http;
mod scheduler;

use daybook_core::config::DaybookConfig;
use daybook_mailer::{HttpMailer, Mailer};
use daybook_store::ServiceStore;
use daybook_users::{EmailResolver, HttpIdentityProvider, IdentityProvider, NoIdentityProvider};

/// Daybook server: productivity dashboard store and reminder dispatch.
#[derive(Parser, Debug)]
#[command(version, about)]
struct Cli {
    /// Path to daybook.toml (falls back to DAYBOOK_CONFIG, then
    /// ~/.daybook/daybook.toml).
    #[arg(long)]
    config: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "daybook_gateway=info,tower_http=debug".into()),
        )
        .init();

    let cli = Cli::parse();
    let config_path = cli.config.or_else(|| std::env::var("DAYBOOK_CONFIG").ok());
    let config = DaybookConfig::load(config_path.as_deref()).unwrap_or_else(|e| {
        warn!("Config load failed ({}), using defaults", e);
        DaybookConfig::default()
    });

    let bind = config.server.bind.clone();
    let port = config.server.port;

    // initialize SQLite database
    let db_path = &config.database.path;
    ensure_parent_dir(db_path);
    info!(path = %db_path, "opening SQLite database");

    let db = rusqlite::Connection::open(db_path)?;
    db.execute_batch("PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON;")?;
    daybook_store::db::init_db(&db)?;
    info!("database migrations complete");

    // Service store gets its own connection; foreign_keys is per-connection
    // and must be re-enabled for the profile cascade to hold.
    let service_conn = rusqlite::Connection::open(db_path)?;
    service_conn.execute_batch("PRAGMA foreign_keys=ON;")?;
    let store = Arc::new(ServiceStore::new(Arc::new(Mutex::new(service_conn))));

    let provider: Box<dyn IdentityProvider> = match config.identity {
        Some(ref identity) => {
            info!(base_url = %identity.base_url, "identity provider configured");
            Box::new(HttpIdentityProvider::new(identity)?)
        }
        None => {
            info!("no identity provider configured; profile cache is the only email source");
            Box::new(NoIdentityProvider)
        }
    };
    let resolver = EmailResolver::new(Arc::clone(&store), provider);

    let mailer: Option<Arc<dyn Mailer>> = match config.mail {
        Some(ref mail) => {
            info!(base_url = %mail.base_url, from = %mail.from, "mailer configured");
            Some(Arc::new(HttpMailer::new(mail)?))
        }
        None => {
            warn!("mail is not configured; job triggers will report a configuration error");
            None
        }
    };
    if config.server.trigger_token.is_none() {
        warn!("no trigger token configured; job endpoints are unauthenticated");
    }

    let state = Arc::new(app::AppState::new(config, store, resolver, mailer));
    let router = app::build_router(Arc::clone(&state));

    // spawn the internal clock driver when configured
    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    if state.config.scheduler.internal {
        let driver_state = Arc::clone(&state);
        tokio::spawn(async move { scheduler::run(driver_state, shutdown_rx).await });
    }

    let addr: SocketAddr = format!("{}:{}", bind, port).parse()?;
    info!("Daybook gateway listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, router).await?;

    // signal the clock driver to stop
    let _ = shutdown_tx.send(true);
    Ok(())
}

/// Ensure the parent directory for a file path exists.
fn ensure_parent_dir(path: &str) {
    if let Some(parent) = std::path::Path::new(path).parent() {
        let _ = std::fs::create_dir_all(parent);
    }
}
