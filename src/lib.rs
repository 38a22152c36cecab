//! Wallet network configuration: pick which blockchain network a wallet talks
//! to, where its chain config comes from, and apply changes safely.

pub mod collaborators;
pub mod config;
pub mod console;
pub mod draft;
pub mod error;
pub mod fetch;
pub mod operation_log;
pub mod pipeline;
pub mod session;
pub mod store;
pub mod validator;
pub mod wallet_config;

#[cfg(test)]
mod test_support;
