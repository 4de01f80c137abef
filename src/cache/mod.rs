pub mod file_store;
pub mod token;
pub mod token_store;
