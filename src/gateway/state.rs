use std::future::Future;
use std::time::Duration;

use crate::config::{AccountsConfig, GatewayConfig};
use crate::ledger::{LedgerEngine, LedgerError};

/// Gateway shared state
#[derive(Clone)]
pub struct AppState {
    /// Ledger engine (owns the store)
    pub engine: LedgerEngine,
    /// Known account id range
    pub accounts: AccountsConfig,
    /// Retry policy for infrastructure failures
    pub retry: RetryPolicy,
}

impl AppState {
    pub fn new(engine: LedgerEngine, accounts: AccountsConfig, retry: RetryPolicy) -> Self {
        Self {
            engine,
            accounts,
            retry,
        }
    }
}

/// Bounded retry with linear backoff
///
/// Business rejections are never retried; the caller decides which
/// infrastructure errors are safe to repeat.
#[derive(Debug, Clone, Copy, Default)]
pub struct RetryPolicy {
    /// Extra attempts after the first
    pub attempts: u32,
    pub backoff: Duration,
}

impl RetryPolicy {
    pub fn new(attempts: u32, backoff: Duration) -> Self {
        Self { attempts, backoff }
    }

    pub fn from_config(config: &GatewayConfig) -> Self {
        Self::new(
            config.retry_attempts,
            Duration::from_millis(config.retry_backoff_ms),
        )
    }

    pub async fn run<T, F, Fut>(
        &self,
        op: &'static str,
        retryable: impl Fn(&LedgerError) -> bool,
        mut f: F,
    ) -> Result<T, LedgerError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, LedgerError>>,
    {
        let mut attempt = 0u32;
        loop {
            match f().await {
                Err(e) if attempt < self.attempts && !e.is_business() && retryable(&e) => {
                    attempt += 1;
                    tracing::warn!(op, attempt, error = %e, "Retrying after infrastructure error");
                    tokio::time::sleep(self.backoff * attempt).await;
                }
                result => return result,
            }
        }
    }
}
