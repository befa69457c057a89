use std::sync::Arc;

use anyhow::Context;

use credit_ledger::config::{AppConfig, StorageBackend};
use credit_ledger::db::Database;
use credit_ledger::gateway::{self, state::AppState, state::RetryPolicy};
use credit_ledger::ledger::{InMemoryLedgerStore, LedgerEngine, LedgerStore, PgLedgerStore};
use credit_ledger::persistence::init_schema;

fn get_env() -> String {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if (args[i] == "--env" || args[i] == "-e") && i + 1 < args.len() {
            return args[i + 1].clone();
        }
    }
    "dev".to_string()
}

/// Get port override from command line (--port argument)
fn get_port_override() -> Option<u16> {
    let args: Vec<String> = std::env::args().collect();
    for i in 0..args.len() {
        if args[i] == "--port" && i + 1 < args.len() {
            return args[i + 1].parse().ok();
        }
    }
    None
}

async fn build_store(config: &AppConfig) -> anyhow::Result<Arc<dyn LedgerStore>> {
    let lock_timeout = config.ledger.lock_timeout();

    match config.storage.backend {
        StorageBackend::Memory => {
            println!("⚠️  In-memory store: state is lost on exit");
            Ok(Arc::new(InMemoryLedgerStore::with_lock_timeout(
                config.accounts.seeds(),
                lock_timeout,
            )))
        }
        StorageBackend::Postgres => {
            let url = config
                .database
                .url
                .as_deref()
                .context("database.url or DATABASE_URL is required for the postgres backend")?;

            println!("[Persistence] Connecting to PostgreSQL...");
            let db = Database::connect(url, &config.database)
                .await
                .context("Failed to connect to PostgreSQL")?;

            if config.database.init_schema {
                init_schema(db.pool(), &config.accounts.seed).await?;
                println!("✅ PostgreSQL connected and schema initialized");
            } else {
                println!("✅ PostgreSQL connected");
            }

            Ok(Arc::new(
                PgLedgerStore::new(db.pool().clone()).with_lock_timeout(lock_timeout),
            ))
        }
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let env = get_env();
    let mut app_config = AppConfig::load(&env)?;
    if let Some(port) = get_port_override() {
        app_config.gateway.port = port;
    }
    let _log_guard = credit_ledger::logging::init_logging(&app_config);

    tracing::info!("Starting Credit Ledger in {} mode", env);
    println!("=== Credit Ledger ({}) ===", env);

    let store = build_store(&app_config).await?;
    tracing::info!(store = store.name(), "Ledger store ready");

    let engine = LedgerEngine::with_config(store, app_config.ledger.engine_config());
    let state = Arc::new(AppState::new(
        engine,
        app_config.accounts.clone(),
        RetryPolicy::from_config(&app_config.gateway),
    ));

    gateway::run_server(&app_config.gateway, state).await
}
