//! In-Memory Listing API
//!
//! Implements ListingApi over a DashMap of listings. Serves offline demos
//! and tests that need a working backend without a network.

use crate::domain::entities::{MarkerRecord, PostDetail};
use crate::domain::ports::{ApiError, ListingApi};
use crate::domain::value_objects::{BoundsCorners, MarkerId};
use async_trait::async_trait;
use dashmap::DashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

/// DashMap-backed listing store.
///
/// Can be switched into a failing mode where every call returns a
/// transport error, to exercise the coordinator's failure paths.
pub struct InMemoryListingApi {
    listings: DashMap<MarkerId, PostDetail>,
    failing: AtomicBool,
    bounds_queries: AtomicUsize,
}

impl InMemoryListingApi {
    pub fn new() -> Self {
        Self {
            listings: DashMap::new(),
            failing: AtomicBool::new(false),
            bounds_queries: AtomicUsize::new(0),
        }
    }

    /// Build a store pre-populated with `listings`.
    pub fn with_listings<I>(listings: I) -> Self
    where
        I: IntoIterator<Item = PostDetail>,
    {
        let api = Self::new();
        for listing in listings {
            api.upsert(listing);
        }
        api
    }

    /// Insert or replace a listing.
    pub fn upsert(&self, listing: PostDetail) {
        self.listings.insert(listing.id, listing);
    }

    pub fn remove(&self, id: MarkerId) -> Option<PostDetail> {
        self.listings.remove(&id).map(|(_, v)| v)
    }

    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of bounds queries served so far, failed ones included.
    pub fn bounds_query_count(&self) -> usize {
        self.bounds_queries.load(Ordering::SeqCst)
    }

    pub fn len(&self) -> usize {
        self.listings.len()
    }

    pub fn is_empty(&self) -> bool {
        self.listings.is_empty()
    }

    fn check_available(&self) -> Result<(), ApiError> {
        if self.failing.load(Ordering::SeqCst) {
            Err(ApiError::Transport("listing store offline".to_string()))
        } else {
            Ok(())
        }
    }
}

impl Default for InMemoryListingApi {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ListingApi for InMemoryListingApi {
    async fn fetch_markers_in_bounds(
        &self,
        corners: &BoundsCorners,
    ) -> Result<Vec<MarkerRecord>, ApiError> {
        self.bounds_queries.fetch_add(1, Ordering::SeqCst);
        self.check_available()?;

        let bounds = corners.bounds();
        Ok(self
            .listings
            .iter()
            .filter(|entry| bounds.contains(&entry.value().location))
            .map(|entry| entry.value().marker())
            .collect())
    }

    async fn fetch_marker_detail(&self, id: MarkerId) -> Result<PostDetail, ApiError> {
        self.check_available()?;

        self.listings
            .get(&id)
            .map(|e| e.value().clone())
            .ok_or(ApiError::NotFound(id))
    }
}
