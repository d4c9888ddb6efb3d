//! Backend API access: HTTP adapter and wire types

mod client;
pub mod types;

pub use client::ApiClient;
