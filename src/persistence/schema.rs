use anyhow::Result;
use sqlx::PgPool;

use crate::config::AccountSeed;

/// Accounts provisioned on a fresh database: `(id, credit limit)`, zero balance.
pub const DEFAULT_ACCOUNTS: &[(i32, i64)] = &[
    (1, 100_000),
    (2, 80_000),
    (3, 1_000_000),
    (4, 10_000_000),
    (5, 500_000),
];

/// Initialize the ledger schema and provision accounts.
///
/// Idempotent: existing tables and accounts are left untouched, so restarting
/// never resets a balance.
pub async fn init_schema(pool: &PgPool, accounts: &[AccountSeed]) -> Result<()> {
    tracing::info!("Initializing ledger schema...");

    let mut tx = pool
        .begin()
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", "Failed to begin schema transaction", e))?;

    sqlx::query(CREATE_ACCOUNTS_TABLE)
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", "Failed to create accounts table", e))?;

    sqlx::query(CREATE_MOVEMENTS_TABLE)
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", "Failed to create movements table", e))?;

    sqlx::query(CREATE_MOVEMENTS_INDEX)
        .execute(&mut *tx)
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", "Failed to create movements index", e))?;

    let mut provisioned = 0u64;
    for seed in accounts {
        if seed.limit < 0 {
            return Err(anyhow::anyhow!(
                "Account {} has negative credit limit {}",
                seed.id,
                seed.limit
            ));
        }
        let result = sqlx::query(INSERT_ACCOUNT)
            .bind(seed.id)
            .bind(seed.limit)
            .execute(&mut *tx)
            .await
            .map_err(|e| anyhow::anyhow!("Failed to provision account {}: {}", seed.id, e))?;
        provisioned += result.rows_affected();
    }

    tx.commit()
        .await
        .map_err(|e| anyhow::anyhow!("{}: {}", "Failed to commit schema", e))?;

    tracing::info!(
        configured = accounts.len(),
        provisioned,
        "Ledger schema initialized successfully"
    );
    Ok(())
}

// =============================================================================
// PostgreSQL Schema
// =============================================================================
//
// `credit_limit` rather than `limit`: LIMIT is a reserved word.
//
// `occurred_at` defaults to clock_timestamp(), not now(). now() is the
// transaction start time, so a movement that waited on the account row lock
// could be stamped earlier than the movement that held it.
//
// =============================================================================
const CREATE_ACCOUNTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS accounts (
    id INTEGER PRIMARY KEY,
    credit_limit BIGINT NOT NULL CHECK (credit_limit >= 0),
    balance BIGINT NOT NULL DEFAULT 0
)
"#;

const CREATE_MOVEMENTS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS movements (
    id BIGSERIAL PRIMARY KEY,
    amount BIGINT NOT NULL CHECK (amount > 0),
    kind CHAR(1) NOT NULL CHECK (kind IN ('c', 'd')),
    description VARCHAR(10) NOT NULL,
    occurred_at TIMESTAMPTZ NOT NULL DEFAULT clock_timestamp(),
    account_id INTEGER NOT NULL REFERENCES accounts (id)
)
"#;

const CREATE_MOVEMENTS_INDEX: &str = r#"
CREATE INDEX IF NOT EXISTS idx_movements_account_recent
    ON movements (account_id, occurred_at DESC, id DESC)
"#;

const INSERT_ACCOUNT: &str = r#"
INSERT INTO accounts (id, credit_limit, balance)
VALUES ($1, $2, 0)
ON CONFLICT (id) DO NOTHING
"#;
