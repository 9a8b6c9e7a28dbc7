//! Listing API Port
//!
//! Defines the interface to the remote listing service.
//! Implementations may talk HTTP or serve an in-memory fixture.

use crate::domain::entities::{MarkerRecord, PostDetail};
use crate::domain::value_objects::{BoundsCorners, MarkerId};
use async_trait::async_trait;

/// Failure of a listing API call.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// The request never produced a response
    #[error("transport error: {0}")]
    Transport(String),
    /// The call exceeded the configured timeout
    #[error("request timed out after {0} ms")]
    Timeout(u64),
    /// Non-success status without a readable error body
    #[error("unexpected status {0}")]
    Status(u16),
    /// Non-success status with the service's error body
    #[error("request rejected ({status}): {title}: {message}")]
    Rejected {
        status: u16,
        title: String,
        message: String,
        details: Option<String>,
    },
    /// Success status but the body did not match the expected shape
    #[error("failed to decode response: {0}")]
    Decode(String),
    #[error("listing {0} not found")]
    NotFound(MarkerId),
}

/// Remote listing service as seen by the map.
///
/// This is an outbound port: the viewport coordinator calls it without
/// knowing how the data is fetched.
#[async_trait]
pub trait ListingApi: Send + Sync {
    /// Get the markers of every listing inside the viewport described by `corners`.
    async fn fetch_markers_in_bounds(
        &self,
        corners: &BoundsCorners,
    ) -> Result<Vec<MarkerRecord>, ApiError>;

    /// Get the full listing for a single marker.
    async fn fetch_marker_detail(&self, id: MarkerId) -> Result<PostDetail, ApiError>;
}
