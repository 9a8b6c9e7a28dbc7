//! Location Handler
//!
//! Holds the last known user location and fans updates out to listeners.

use crate::domain::ports::LocationListener;
use crate::domain::value_objects::GeoPoint;
use parking_lot::Mutex;
use std::sync::Arc;

/// Handle returned by [`LocationHandler::subscribe`], used to unsubscribe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SubscriptionId(u64);

struct HandlerState {
    last_location: Option<GeoPoint>,
    listeners: Vec<(SubscriptionId, Arc<dyn LocationListener>)>,
    next_id: u64,
}

/// Source of user location updates.
///
/// Listeners are invoked while the handler's lock is held, so they must not
/// call back into the handler.
pub struct LocationHandler {
    state: Mutex<HandlerState>,
}

impl LocationHandler {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(HandlerState {
                last_location: None,
                listeners: Vec::new(),
                next_id: 1,
            }),
        }
    }

    /// Register a listener. If a location is already known it is delivered
    /// to the new listener before this returns.
    pub fn subscribe(&self, listener: Arc<dyn LocationListener>) -> SubscriptionId {
        let mut state = self.state.lock();
        let id = SubscriptionId(state.next_id);
        state.next_id += 1;

        if let Some(location) = state.last_location {
            listener.location_updated(location);
        }
        state.listeners.push((id, listener));

        tracing::debug!("location listener {} subscribed", id.0);
        id
    }

    /// Remove a listener. Returns false if it was not subscribed.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let mut state = self.state.lock();
        let before = state.listeners.len();
        state.listeners.retain(|(sub, _)| *sub != id);
        let removed = state.listeners.len() < before;
        if removed {
            tracing::debug!("location listener {} unsubscribed", id.0);
        }
        removed
    }

    /// Record a new location and notify every listener.
    pub fn update_location(&self, location: GeoPoint) {
        let mut state = self.state.lock();
        state.last_location = Some(location);
        for (_, listener) in state.listeners.iter() {
            listener.location_updated(location);
        }
    }

    pub fn last_location(&self) -> Option<GeoPoint> {
        self.state.lock().last_location
    }

    pub fn listener_count(&self) -> usize {
        self.state.lock().listeners.len()
    }
}

impl Default for LocationHandler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct RecordingListener {
        seen: Mutex<Vec<GeoPoint>>,
    }

    impl RecordingListener {
        fn new() -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
            })
        }

        fn seen(&self) -> Vec<GeoPoint> {
            self.seen.lock().clone()
        }
    }

    impl LocationListener for RecordingListener {
        fn location_updated(&self, location: GeoPoint) {
            self.seen.lock().push(location);
        }
    }

    #[test]
    fn test_subscribe_without_location_delivers_nothing() {
        let handler = LocationHandler::new();
        let listener = RecordingListener::new();

        handler.subscribe(listener.clone());

        assert!(listener.seen().is_empty());
        assert_eq!(handler.listener_count(), 1);
    }

    #[test]
    fn test_subscribe_delivers_last_known_location() {
        let handler = LocationHandler::new();
        handler.update_location(GeoPoint::new(1.0, 2.0));
        handler.update_location(GeoPoint::new(3.0, 4.0));

        let listener = RecordingListener::new();
        handler.subscribe(listener.clone());

        assert_eq!(listener.seen(), vec![GeoPoint::new(3.0, 4.0)]);
    }

    #[test]
    fn test_update_notifies_all_listeners() {
        let handler = LocationHandler::new();
        let a = RecordingListener::new();
        let b = RecordingListener::new();
        handler.subscribe(a.clone());
        handler.subscribe(b.clone());

        handler.update_location(GeoPoint::new(5.0, 6.0));

        assert_eq!(a.seen(), vec![GeoPoint::new(5.0, 6.0)]);
        assert_eq!(b.seen(), vec![GeoPoint::new(5.0, 6.0)]);
        assert_eq!(handler.last_location(), Some(GeoPoint::new(5.0, 6.0)));
    }

    #[test]
    fn test_unsubscribe_stops_updates() {
        let handler = LocationHandler::new();
        let listener = RecordingListener::new();
        let id = handler.subscribe(listener.clone());

        assert!(handler.unsubscribe(id));
        handler.update_location(GeoPoint::new(5.0, 6.0));

        assert!(listener.seen().is_empty());
        assert_eq!(handler.listener_count(), 0);
    }

    #[test]
    fn test_unsubscribe_unknown_id() {
        let handler = LocationHandler::new();
        let id = handler.subscribe(RecordingListener::new());
        handler.unsubscribe(id);

        assert!(!handler.unsubscribe(id));
    }

    #[test]
    fn test_subscription_ids_are_unique() {
        let handler = LocationHandler::new();
        let a = handler.subscribe(RecordingListener::new());
        let b = handler.subscribe(RecordingListener::new());
        assert_ne!(a, b);
    }
}
