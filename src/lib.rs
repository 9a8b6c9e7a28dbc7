//! Pop-Up map viewport library
//!
//! Decides when a panned or zoomed map needs fresh markers, fetches them
//! from the listing API and keeps the accumulated marker set.

#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

pub mod adapters;
pub mod application;
pub mod config;
pub mod domain;

// Re-export commonly used types
pub use adapters::outbound::{HttpListingApi, HttpListingConfig, InMemoryListingApi};
pub use application::{
    BaselinePolicy, DetailState, FetchState, LocationHandler, MapViewportService, MergePolicy,
    ViewportDecision, ViewportOptions,
};
pub use config::load_config;
pub use domain::entities::{MarkerRecord, PostDetail};
pub use domain::ports::{ApiError, ListingApi, LocationListener};
pub use domain::services::{has_changed_significantly, BoundsChangeDetector, MarkerSet};
pub use domain::value_objects::{BoundsCorners, GeoBounds, GeoPoint, MarkerId, PostType};
