//! Chain RPC access

mod client;

pub use client::{ChainClient, HttpClient};
