mod bounds_change;
mod marker_set;

pub use bounds_change::{has_changed_significantly, BoundsChangeDetector, DEFAULT_CHANGE_THRESHOLD};
pub use marker_set::MarkerSet;
