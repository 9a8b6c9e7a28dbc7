//! Map Viewport Service - Main application use case
//!
//! Coordinates viewport changes with the listing API: decides when a new
//! marker fetch is worth it, merges results into the running marker set,
//! and serves the click-to-detail path.

use crate::application::location_handler::{LocationHandler, SubscriptionId};
use crate::domain::entities::{MarkerRecord, PostDetail};
use crate::domain::ports::{ApiError, ListingApi, LocationListener};
use crate::domain::services::{BoundsChangeDetector, MarkerSet, DEFAULT_CHANGE_THRESHOLD};
use crate::domain::value_objects::{GeoBounds, GeoPoint, MarkerId};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{watch, Notify};
use tracing::Instrument;

/// How completed marker fetches are applied to the marker set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Merge every response in the order it arrives
    ArrivalOrder,
    /// Drop responses superseded by a newer dispatched fetch
    LatestRequestOnly,
}

impl MergePolicy {
    /// Parse a policy name, falling back to `ArrivalOrder`.
    pub fn from_str(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "latest" | "latest_request" | "latest-request" => Self::LatestRequestOnly,
            _ => Self::ArrivalOrder,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ArrivalOrder => "arrival",
            Self::LatestRequestOnly => "latest",
        }
    }
}

impl Default for MergePolicy {
    fn default() -> Self {
        Self::ArrivalOrder
    }
}

impl std::fmt::Display for MergePolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// What happens to the query baseline when a marker fetch fails.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BaselinePolicy {
    /// Keep the baseline advanced at dispatch time
    AdvanceOnDispatch,
    /// Restore the previous baseline if nothing newer was dispatched
    RollbackOnFailure,
}

impl Default for BaselinePolicy {
    fn default() -> Self {
        Self::AdvanceOnDispatch
    }
}

/// Tuning for [`MapViewportService`].
#[derive(Debug, Clone)]
pub struct ViewportOptions {
    /// Re-query when overlap drops below `1 - change_threshold`
    pub change_threshold: f64,
    /// Upper bound on a single listing API call
    pub fetch_timeout: Duration,
    pub merge_policy: MergePolicy,
    pub baseline_policy: BaselinePolicy,
}

impl Default for ViewportOptions {
    fn default() -> Self {
        Self {
            change_threshold: DEFAULT_CHANGE_THRESHOLD,
            fetch_timeout: Duration::from_secs(10),
            merge_policy: MergePolicy::default(),
            baseline_policy: BaselinePolicy::default(),
        }
    }
}

/// Outcome of a viewport notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViewportDecision {
    /// A fetch was dispatched for the new viewport
    Fetch { generation: u64 },
    /// The viewport is close enough to the baseline; nothing was done
    Unchanged,
}

/// Whether a marker fetch is currently outstanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchState {
    Idle,
    Fetching,
}

/// Detail sheet contents for the most recently clicked marker.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetailState {
    /// Marker whose detail was last requested
    pub requested: Option<MarkerId>,
    /// Detail record to display, if loaded
    pub shown: Option<PostDetail>,
    pub loading: bool,
    /// Set when the last detail fetch failed
    pub load_error: bool,
}

struct QueryState {
    last_queried: Option<GeoBounds>,
    generation: u64,
}

/// Publishes user location updates to the service's observers.
struct UserLocationSink {
    tx: watch::Sender<Option<GeoPoint>>,
}

impl LocationListener for UserLocationSink {
    fn location_updated(&self, location: GeoPoint) {
        self.tx.send_replace(Some(location));
    }
}

struct Inner {
    api: Arc<dyn ListingApi>,
    detector: BoundsChangeDetector,
    options: ViewportOptions,
    query: Mutex<QueryState>,
    markers_tx: watch::Sender<Arc<MarkerSet>>,
    detail_tx: watch::Sender<DetailState>,
    detail_generation: AtomicU64,
    user_location: Arc<UserLocationSink>,
    location_subscription: Mutex<Option<(Arc<LocationHandler>, SubscriptionId)>>,
    in_flight: AtomicUsize,
    markers_in_flight: AtomicUsize,
    idle: Notify,
}

impl Drop for Inner {
    fn drop(&mut self) {
        if let Some((handler, id)) = self.location_subscription.get_mut().take() {
            handler.unsubscribe(id);
        }
    }
}

#[derive(Clone, Copy, PartialEq, Eq)]
enum FetchKind {
    Markers,
    Detail,
}

/// Keeps the in-flight counts accurate for the lifetime of a spawned fetch.
struct FetchGuard {
    inner: Arc<Inner>,
    kind: FetchKind,
}

impl FetchGuard {
    fn new(inner: Arc<Inner>, kind: FetchKind) -> Self {
        inner.in_flight.fetch_add(1, Ordering::SeqCst);
        if kind == FetchKind::Markers {
            inner.markers_in_flight.fetch_add(1, Ordering::SeqCst);
        }
        Self { inner, kind }
    }
}

impl Drop for FetchGuard {
    fn drop(&mut self) {
        if self.kind == FetchKind::Markers {
            self.inner.markers_in_flight.fetch_sub(1, Ordering::SeqCst);
        }
        if self.inner.in_flight.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.inner.idle.notify_waiters();
        }
    }
}

/// Viewport marker coordinator for one map session.
///
/// This service:
/// 1. Decides on every viewport change whether a new fetch is needed
/// 2. Dispatches fetches as independent tasks without cancelling older ones
/// 3. Upserts fetched markers and publishes immutable snapshots
/// 4. Loads marker details on click, with a separate error flag
///
/// Cloning yields another handle to the same session. Methods that dispatch
/// work must be called from within a Tokio runtime.
#[derive(Clone)]
pub struct MapViewportService {
    inner: Arc<Inner>,
}

impl MapViewportService {
    /// Create a coordinator with an empty marker set and no baseline.
    pub fn new(api: Arc<dyn ListingApi>, options: ViewportOptions) -> Self {
        let (markers_tx, _) = watch::channel(Arc::new(MarkerSet::new()));
        let (detail_tx, _) = watch::channel(DetailState::default());
        let (location_tx, _) = watch::channel(None);

        Self {
            inner: Arc::new(Inner {
                api,
                detector: BoundsChangeDetector::new(options.change_threshold),
                options,
                query: Mutex::new(QueryState {
                    last_queried: None,
                    generation: 0,
                }),
                markers_tx,
                detail_tx,
                detail_generation: AtomicU64::new(0),
                user_location: Arc::new(UserLocationSink { tx: location_tx }),
                location_subscription: Mutex::new(None),
                in_flight: AtomicUsize::new(0),
                markers_in_flight: AtomicUsize::new(0),
                idle: Notify::new(),
            }),
        }
    }

    /// Report a new viewport.
    ///
    /// The first viewport always triggers a fetch. Later ones trigger a fetch
    /// only when they differ significantly from the last queried bounds; the
    /// baseline advances as soon as the fetch is dispatched. Never blocks on
    /// the network.
    pub fn on_viewport_changed(&self, bounds: GeoBounds) -> ViewportDecision {
        let (generation, previous) = {
            let mut query = self.inner.query.lock();

            if let Some(last) = query.last_queried {
                if !self.inner.detector.has_changed_significantly(&last, &bounds) {
                    tracing::trace!("viewport {} within threshold of {}", bounds, last);
                    return ViewportDecision::Unchanged;
                }
            }

            let previous = query.last_queried.replace(bounds);
            query.generation += 1;
            (query.generation, previous)
        };

        tracing::debug!(generation, "fetching markers for {}", bounds);

        let guard = FetchGuard::new(self.inner.clone(), FetchKind::Markers);
        tokio::spawn(
            async move {
                let inner = guard.inner.clone();
                Self::fetch_and_merge(&inner, bounds, previous, generation).await;
                drop(guard);
            }
            .in_current_span(),
        );

        ViewportDecision::Fetch { generation }
    }

    /// Fetch markers for `bounds` and merge them. Failures are swallowed.
    async fn fetch_and_merge(
        inner: &Arc<Inner>,
        bounds: GeoBounds,
        previous: Option<GeoBounds>,
        generation: u64,
    ) {
        let corners = bounds.corners();
        let result = Self::with_timeout(
            inner.options.fetch_timeout,
            inner.api.fetch_markers_in_bounds(&corners),
        )
        .await;

        match result {
            Ok(records) => Self::apply_markers(inner, records, generation),
            Err(e) => {
                tracing::warn!(generation, "marker fetch for {} failed: {}", bounds, e);
                Self::handle_fetch_failure(inner, bounds, previous, generation);
            }
        }
    }

    fn apply_markers(inner: &Inner, records: Vec<MarkerRecord>, generation: u64) {
        let received = records.len();
        let mut inserted = 0;
        let mut superseded_by = None;

        inner.markers_tx.send_if_modified(|set| {
            // Held across the merge so no fetch can be dispatched in between.
            let query = inner.query.lock();
            if inner.options.merge_policy == MergePolicy::LatestRequestOnly
                && query.generation != generation
            {
                superseded_by = Some(query.generation);
                return false;
            }
            inserted = Arc::make_mut(set).merge(records);
            true
        });

        match superseded_by {
            Some(latest) => tracing::debug!(
                generation,
                latest,
                "discarded {} markers from superseded fetch",
                received
            ),
            None => tracing::debug!(
                generation,
                "merged {} markers ({} new)",
                received,
                inserted
            ),
        }
    }

    fn handle_fetch_failure(
        inner: &Inner,
        bounds: GeoBounds,
        previous: Option<GeoBounds>,
        generation: u64,
    ) {
        if inner.options.baseline_policy != BaselinePolicy::RollbackOnFailure {
            return;
        }

        let mut query = inner.query.lock();
        if query.generation == generation && query.last_queried == Some(bounds) {
            query.last_queried = previous;
            tracing::debug!(generation, "rolled back query baseline after failure");
        }
    }

    /// Load the full listing for a clicked marker.
    ///
    /// Only the most recent click is applied; a failure sets
    /// [`DetailState::load_error`] and leaves the marker set untouched.
    pub fn on_marker_clicked(&self, id: MarkerId) {
        let mut generation = 0;
        self.inner.detail_tx.send_modify(|state| {
            generation = self.inner.detail_generation.fetch_add(1, Ordering::SeqCst) + 1;
            *state = DetailState {
                requested: Some(id),
                shown: None,
                loading: true,
                load_error: false,
            };
        });

        let guard = FetchGuard::new(self.inner.clone(), FetchKind::Detail);
        tokio::spawn(
            async move {
                let inner = guard.inner.clone();
                Self::fetch_detail(&inner, id, generation).await;
                drop(guard);
            }
            .in_current_span(),
        );
    }

    async fn fetch_detail(inner: &Arc<Inner>, id: MarkerId, generation: u64) {
        let result = Self::with_timeout(
            inner.options.fetch_timeout,
            inner.api.fetch_marker_detail(id),
        )
        .await;

        if let Err(e) = &result {
            tracing::warn!("detail fetch for {} failed: {}", id, e);
        }

        // Clicks and dismissals bump the generation inside the channel's
        // lock, so this check cannot interleave with them.
        let applied = inner.detail_tx.send_if_modified(|state| {
            if inner.detail_generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            match result {
                Ok(detail) => {
                    state.shown = Some(detail);
                    state.load_error = false;
                }
                Err(_) => {
                    state.shown = None;
                    state.load_error = true;
                }
            }
            state.loading = false;
            true
        });

        if !applied {
            tracing::debug!("ignoring stale detail response for {}", id);
        }
    }

    /// Hide the detail sheet. Detail responses still in flight are ignored.
    pub fn dismiss_detail(&self) {
        self.inner.detail_tx.send_modify(|state| {
            self.inner.detail_generation.fetch_add(1, Ordering::SeqCst);
            *state = DetailState::default();
        });
    }

    async fn with_timeout<T, F>(timeout: Duration, call: F) -> Result<T, ApiError>
    where
        F: std::future::Future<Output = Result<T, ApiError>>,
    {
        match tokio::time::timeout(timeout, call).await {
            Ok(result) => result,
            Err(_) => Err(ApiError::Timeout(timeout.as_millis() as u64)),
        }
    }

    /// Current marker snapshot.
    pub fn markers(&self) -> Arc<MarkerSet> {
        self.inner.markers_tx.borrow().clone()
    }

    /// Subscribe to marker snapshots. Each published value is a complete set.
    pub fn subscribe_markers(&self) -> watch::Receiver<Arc<MarkerSet>> {
        self.inner.markers_tx.subscribe()
    }

    /// Current detail sheet state.
    pub fn detail(&self) -> DetailState {
        self.inner.detail_tx.borrow().clone()
    }

    pub fn subscribe_detail(&self) -> watch::Receiver<DetailState> {
        self.inner.detail_tx.subscribe()
    }

    /// Bounds of the most recently dispatched marker fetch.
    pub fn last_queried_bounds(&self) -> Option<GeoBounds> {
        self.inner.query.lock().last_queried
    }

    /// Whether a marker fetch is outstanding. Detail fetches are not counted.
    pub fn fetch_state(&self) -> FetchState {
        if self.inner.markers_in_flight.load(Ordering::SeqCst) == 0 {
            FetchState::Idle
        } else {
            FetchState::Fetching
        }
    }

    /// Wait until no marker or detail fetch is in flight. Returns false on timeout.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.inner.idle.notified();
                tokio::pin!(notified);
                notified.as_mut().enable();

                if self.inner.in_flight.load(Ordering::SeqCst) == 0 {
                    return;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(()) => true,
            Err(_) => {
                tracing::warn!(
                    "idle wait timeout: {} fetches still in flight",
                    self.inner.in_flight.load(Ordering::SeqCst)
                );
                false
            }
        }
    }

    /// Follow the user's location. At most one subscription is kept per
    /// session; attaching again returns the existing subscription.
    pub fn attach_location(&self, handler: &Arc<LocationHandler>) -> SubscriptionId {
        let mut slot = self.inner.location_subscription.lock();
        if let Some((_, id)) = slot.as_ref() {
            return *id;
        }

        let listener: Arc<dyn LocationListener> = self.inner.user_location.clone();
        let id = handler.subscribe(listener);
        *slot = Some((handler.clone(), id));
        id
    }

    /// Stop following the user's location.
    pub fn detach_location(&self) {
        if let Some((handler, id)) = self.inner.location_subscription.lock().take() {
            handler.unsubscribe(id);
        }
    }

    /// Last user location received, if any.
    pub fn user_location(&self) -> Option<GeoPoint> {
        *self.inner.user_location.tx.borrow()
    }

    pub fn subscribe_user_location(&self) -> watch::Receiver<Option<GeoPoint>> {
        self.inner.user_location.tx.subscribe()
    }

    pub fn options(&self) -> &ViewportOptions {
        &self.inner.options
    }
}
