//! Outbound adapters (driven side) - implementations of the listing API port

mod http_listing_api;
mod in_memory_listing_api;

pub use http_listing_api::{HttpListingApi, HttpListingConfig};
pub use in_memory_listing_api::InMemoryListingApi;
