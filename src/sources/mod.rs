//! Wire-level pieces talking to the remote feed.

pub mod issuer;
pub mod transport;
pub mod validator;
