use std::future::Future;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::cache::file_store::FileTokenStore;
use crate::cache::token::TokenRecord;
use crate::config::types::StoreConfig;
use crate::error::StoreError;

/// Append-only log of issued tokens. The current token is the last one appended.
pub trait CredentialStore: Send + Sync {
    /// Persists a record and returns its id. The token is not current until this resolves.
    fn append_token(
        &self,
        record: &TokenRecord,
    ) -> impl Future<Output = Result<u64, StoreError>> + Send;

    /// Most recently appended record, `NotFound` when the log is empty.
    fn latest_record(&self) -> impl Future<Output = Result<TokenRecord, StoreError>> + Send;

    fn latest_expiry(&self) -> impl Future<Output = Result<DateTime<Utc>, StoreError>> + Send {
        async move { self.latest_record().await.map(|record| record.expires_at) }
    }

    fn latest_token(&self) -> impl Future<Output = Result<String, StoreError>> + Send {
        async move { self.latest_record().await.map(|record| record.value) }
    }
}

/// In-process store; everything is lost on exit.
#[derive(Debug, Clone, Default)]
pub struct MemoryTokenStore {
    inner: Arc<RwLock<Vec<TokenRecord>>>,
}

impl MemoryTokenStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record in insertion order.
    pub async fn records(&self) -> Vec<TokenRecord> {
        self.inner.read().await.clone()
    }
}

impl CredentialStore for MemoryTokenStore {
    async fn append_token(&self, record: &TokenRecord) -> Result<u64, StoreError> {
        let mut guard = self.inner.write().await;
        guard.push(record.clone());
        Ok(guard.len() as u64)
    }

    async fn latest_record(&self) -> Result<TokenRecord, StoreError> {
        self.inner
            .read()
            .await
            .last()
            .cloned()
            .ok_or(StoreError::NotFound)
    }
}

/// Store selected by configuration.
#[derive(Debug, Clone)]
pub enum TokenStore {
    Memory(MemoryTokenStore),
    File(FileTokenStore),
}

impl TokenStore {
    pub fn from_config(cfg: &StoreConfig) -> Self {
        match cfg {
            StoreConfig::Memory => TokenStore::Memory(MemoryTokenStore::new()),
            StoreConfig::File { path } => TokenStore::File(FileTokenStore::new(path)),
        }
    }
}

impl CredentialStore for TokenStore {
    async fn append_token(&self, record: &TokenRecord) -> Result<u64, StoreError> {
        match self {
            TokenStore::Memory(s) => s.append_token(record).await,
            TokenStore::File(s) => s.append_token(record).await,
        }
    }

    async fn latest_record(&self) -> Result<TokenRecord, StoreError> {
        match self {
            TokenStore::Memory(s) => s.latest_record().await,
            TokenStore::File(s) => s.latest_record().await,
        }
    }
}
