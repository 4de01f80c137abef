pub mod common;
mod token_renewal;
