//! Application Layer
//!
//! Use cases that orchestrate the domain and its ports.

mod location_handler;
mod map_viewport_service;

pub use location_handler::{LocationHandler, SubscriptionId};
pub use map_viewport_service::{
    BaselinePolicy, DetailState, FetchState, MapViewportService, MergePolicy, ViewportDecision,
    ViewportOptions,
};
