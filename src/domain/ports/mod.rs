mod listing_api;
mod location_listener;

pub use listing_api::{ApiError, ListingApi};
pub use location_listener::LocationListener;
