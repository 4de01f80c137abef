use thiserror::Error;

/// Failures raised by a credential store.
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("credential store is empty")]
    NotFound,

    #[error("credential store row is unparsable: {0}")]
    Corrupt(String),

    #[error("credential store io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("credential store serialization error: {0}")]
    Serialize(#[from] serde_json::Error),
}

/// Typed outcome of a failed dispatch.
#[derive(Error, Debug)]
pub enum FeedError {
    /// Bad credentials, or a token the remote service keeps refusing.
    #[error("remote service rejected the credentials")]
    AuthRejected,

    #[error("unexpected status {status} from remote service")]
    Protocol { status: u16 },

    /// Network failure, timeout or a body that could not be decoded.
    #[error("transport error: {0}")]
    Transport(String),

    #[error("storage error: {0}")]
    Storage(#[from] StoreError),
}

impl FeedError {
    /// Short label used for metrics and structured log fields.
    pub fn kind(&self) -> &'static str {
        match self {
            FeedError::AuthRejected => "auth_rejected",
            FeedError::Protocol { .. } => "protocol",
            FeedError::Transport(_) => "transport",
            FeedError::Storage(_) => "storage",
        }
    }
}

impl From<reqwest::Error> for FeedError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            FeedError::Transport(format!("request timed out: {err}"))
        } else {
            FeedError::Transport(err.to_string())
        }
    }
}
