use std::future::Future;

use sea_orm::DatabaseConnection;

use crate::{EngineError, ResultEngine};

mod pair;
mod profiles;
mod relationships;
mod retry;
mod search;

pub use retry::RetryPolicy;

const DEFAULT_SEARCH_PAGE_SIZE: u64 = 20;

/// Run a block inside a DB transaction, committing on success and rolling back on error.
///
/// Dropping the transaction without committing rolls it back, so an early
/// return through `?` inside the block is safe.
macro_rules! with_tx {
    ($self:expr, |$tx:ident| $body:expr) => {{
        let $tx = sea_orm::TransactionTrait::begin(&$self.database).await?;
        let result = $body;
        match result {
            Ok(value) => {
                $tx.commit().await?;
                Ok(value)
            }
            Err(err) => Err(err),
        }
    }};
}

pub(crate) use with_tx;

#[derive(Debug)]
pub struct Engine {
    database: DatabaseConnection,
    retry: RetryPolicy,
    search_page_size: u64,
}

impl Engine {
    /// Return a builder for `Engine`. Help to build the struct.
    pub fn builder() -> EngineBuilder {
        EngineBuilder::default()
    }

    /// Run `attempt` until it succeeds, fails with a non transient error, or
    /// the retry policy is exhausted.
    ///
    /// Every call of `attempt` must be a self-contained unit of work (usually a
    /// whole DB transaction).
    async fn retrying<T, F, Fut>(&self, op: &'static str, mut attempt: F) -> ResultEngine<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = ResultEngine<T>>,
    {
        let mut attempts = 0;
        loop {
            attempts += 1;
            match attempt().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && attempts < self.retry.max_attempts => {
                    let delay = self.retry.delay_for_attempt(attempts);
                    tracing::warn!(op, attempts, ?delay, "transient store error, retrying: {err}");
                    tokio::time::sleep(delay).await;
                }
                Err(err) => {
                    if err.kind().is_corruption() {
                        tracing::error!(op, "stored data violates an invariant: {err}");
                    } else if err.is_retryable() {
                        tracing::error!(op, attempts, "store still unavailable, giving up: {err}");
                    } else {
                        tracing::debug!(op, "{err}");
                    }
                    return Err(err);
                }
            }
        }
    }
}

fn normalize_user_id(value: &str, label: &str) -> ResultEngine<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(EngineError::InvalidInput(format!(
            "{label} must not be empty"
        )));
    }
    Ok(trimmed.to_string())
}

/// The builder for `Engine`
#[derive(Default)]
pub struct EngineBuilder {
    database: DatabaseConnection,
    retry: Option<RetryPolicy>,
    search_page_size: Option<u64>,
}

impl EngineBuilder {
    /// Pass the required database
    pub fn database(mut self, db: DatabaseConnection) -> EngineBuilder {
        self.database = db;
        self
    }

    /// Override the retry policy applied to transient store errors.
    pub fn retry_policy(mut self, retry: RetryPolicy) -> EngineBuilder {
        self.retry = Some(retry);
        self
    }

    /// Maximum number of profiles returned by a search.
    pub fn search_page_size(mut self, size: u64) -> EngineBuilder {
        self.search_page_size = Some(size);
        self
    }

    /// Construct `Engine`
    pub async fn build(self) -> ResultEngine<Engine> {
        let retry = self.retry.unwrap_or_default();
        if retry.max_attempts == 0 {
            return Err(EngineError::InvalidInput(
                "retry max_attempts must be at least 1".to_string(),
            ));
        }
        let search_page_size = self.search_page_size.unwrap_or(DEFAULT_SEARCH_PAGE_SIZE);
        if search_page_size == 0 {
            return Err(EngineError::InvalidInput(
                "search page size must be at least 1".to_string(),
            ));
        }

        self.database.ping().await?;

        Ok(Engine {
            database: self.database,
            retry,
            search_page_size,
        })
    }
}
