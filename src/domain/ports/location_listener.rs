//! Location Listener Port
//!
//! Callback interface for components that want to hear about user
//! location changes.

use crate::domain::value_objects::GeoPoint;

/// Receives user location updates from a [`LocationHandler`].
///
/// Called synchronously from the handler; implementations must not block.
///
/// [`LocationHandler`]: crate::application::LocationHandler
pub trait LocationListener: Send + Sync {
    fn location_updated(&self, location: GeoPoint);
}
