//! Bounds Change Detector
//!
//! Pure domain logic deciding whether a new viewport moved far enough from
//! the last queried one to justify another marker fetch.

use crate::domain::value_objects::GeoBounds;

/// Re-query once overlap drops below 75%.
pub const DEFAULT_CHANGE_THRESHOLD: f64 = 0.25;

/// Decide whether `candidate` differs significantly from `previous`.
///
/// The overlap ratio is the intersection area divided by the *smaller* of
/// the two areas. Disjoint rectangles and zero-area inputs always count as
/// a significant change. Zooming far out from a small viewport that is
/// fully contained in the new one yields a ratio of 1.0 and therefore no
/// refetch.
pub fn has_changed_significantly(previous: &GeoBounds, candidate: &GeoBounds, threshold: f64) -> bool {
    let intersection = previous.intersection(candidate);
    if intersection.is_inverted() {
        return true;
    }

    let smaller_area = previous.area().min(candidate.area());
    if smaller_area == 0.0 {
        return true;
    }

    let overlap_ratio = intersection.area() / smaller_area;
    overlap_ratio < (1.0 - threshold)
}

/// Change detector bound to a configured threshold.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsChangeDetector {
    threshold: f64,
}

impl BoundsChangeDetector {
    pub fn new(threshold: f64) -> Self {
        Self { threshold }
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }

    /// See [`has_changed_significantly`].
    pub fn has_changed_significantly(&self, previous: &GeoBounds, candidate: &GeoBounds) -> bool {
        has_changed_significantly(previous, candidate, self.threshold)
    }
}

impl Default for BoundsChangeDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CHANGE_THRESHOLD)
    }
}
