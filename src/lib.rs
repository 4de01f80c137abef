//! # Estate Feed Client Library
//!
//! Talks to an XML real-estate export feed that authenticates with
//! short-lived tokens: obtains a token through a username/password
//! handshake, keeps issued tokens in an append-only store, and sends
//! every request with a valid token, renewing and retrying once when needed.
//!
//! Modules:
//! - `config`: client configuration
//! - `cache`: token records and credential stores
//! - `sources`: transport, token issuer and token validator
//! - `dispatch`: request dispatcher driving the token lifecycle
//! - `parser`: XML body decoding

pub mod config;
pub mod cache;
pub mod sources;
pub mod dispatch;
pub mod resilience;
pub mod parser;
pub mod observability;
pub mod helpers;
pub mod utils;
pub mod error;

#[cfg(test)]
mod tests;

pub use crate::cache::token::TokenRecord;
pub use crate::cache::token_store::{CredentialStore, MemoryTokenStore, TokenStore};
pub use crate::cache::file_store::FileTokenStore;
pub use crate::config::types::ServiceConfig;
pub use crate::dispatch::dispatcher::Dispatcher;
pub use crate::error::{FeedError, StoreError};
pub use crate::helpers::urls::FeedUrls;
