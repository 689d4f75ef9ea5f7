pub mod abi;
pub mod config;
pub mod dto;
pub mod flow;
pub mod gallery;
pub mod pin_client;
pub mod session_store;
pub mod utils;
pub mod wallet;

#[cfg(test)]
mod test_support;
