use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::fs::{self, OpenOptions};
use tokio::io::AsyncWriteExt;
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::token::TokenRecord;
use crate::cache::token_store::CredentialStore;
use crate::error::StoreError;
use crate::helpers::time::{format_store_timestamp, parse_store_timestamp};

/// One line of the token log: `(id, tokenValue, createdOn, expiresOn)`.
#[derive(Debug, Serialize, Deserialize)]
struct TokenRow {
    id: u64,
    token_value: String,
    created_on: String,
    expires_on: String,
}

impl TokenRow {
    fn into_record(self) -> Result<TokenRecord, StoreError> {
        let created_at = parse_store_timestamp(&self.created_on)
            .map_err(|e| StoreError::Corrupt(format!("row {}: {}", self.id, e)))?;
        let expires_at = parse_store_timestamp(&self.expires_on)
            .map_err(|e| StoreError::Corrupt(format!("row {}: {}", self.id, e)))?;
        Ok(TokenRecord::new(self.token_value, created_at, expires_at))
    }
}

/// JSON-lines token log on disk. Rows are only ever appended.
#[derive(Debug, Clone)]
pub struct FileTokenStore {
    path: PathBuf,
    // readers never observe a half-written row
    lock: Arc<RwLock<()>>,
}

impl FileTokenStore {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn read_log(&self) -> Result<Option<String>, StoreError> {
        match fs::read_to_string(&self.path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(StoreError::Io(e)),
        }
    }

    fn last_line(content: &str) -> Option<&str> {
        content.lines().rev().find(|line| !line.trim().is_empty())
    }

    fn next_id(content: Option<&str>) -> u64 {
        let Some(content) = content else { return 1 };
        Self::last_line(content)
            .and_then(|line| serde_json::from_str::<TokenRow>(line).ok())
            .map(|row| row.id + 1)
            // unreadable tail: fall back to the row count
            .unwrap_or_else(|| content.lines().filter(|l| !l.trim().is_empty()).count() as u64 + 1)
    }
}

impl CredentialStore for FileTokenStore {
    async fn append_token(&self, record: &TokenRecord) -> Result<u64, StoreError> {
        let _guard = self.lock.write().await;

        let existing = self.read_log().await?;
        let id = Self::next_id(existing.as_deref());
        let row = TokenRow {
            id,
            token_value: record.value.to_owned(),
            created_on: format_store_timestamp(&record.created_at),
            expires_on: format_store_timestamp(&record.expires_at),
        };
        let mut line = serde_json::to_string(&row)?;
        line.push('\n');

        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent).await?;
        }
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(line.as_bytes()).await?;
        file.flush().await?;
        file.sync_data().await?;

        debug!(id, path = %self.path.display(), "token row appended");
        Ok(id)
    }

    async fn latest_record(&self) -> Result<TokenRecord, StoreError> {
        let _guard = self.lock.read().await;

        let content = self.read_log().await?.ok_or(StoreError::NotFound)?;
        let line = Self::last_line(&content).ok_or(StoreError::NotFound)?;
        let row: TokenRow = serde_json::from_str(line)
            .map_err(|e| StoreError::Corrupt(format!("last row: {}", e)))?;
        row.into_record()
    }
}
