//! Remote resource gateway: wire types, the `Gateway` contract and its HTTP client.

mod cache;
pub mod client;
#[cfg(test)]
pub mod fake;
pub mod gateway;
pub mod types;

pub use client::ApiClient;
pub use gateway::Gateway;
