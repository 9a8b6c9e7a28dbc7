//! Value Objects - Immutable domain primitives
//!
//! Value objects are identified by their value rather than identity.
//! They are immutable and can be freely copied between tasks.

use serde::{Deserialize, Serialize};

/// Stable identifier of a listing, shared by its map marker and its detail record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MarkerId(pub i64);

impl std::fmt::Display for MarkerId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A point on the map in degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }
}

/// Errors raised when building a [`GeoBounds`] from raw coordinates.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum BoundsError {
    #[error("coordinate is not finite")]
    NonFinite,
    #[error("north-east latitude {north} is below south-west latitude {south}")]
    InvertedLatitude { north: f64, south: f64 },
}

/// Axis-aligned viewport rectangle defined by its north-east and south-west corners.
///
/// Longitude wraparound at the antimeridian is not handled; viewports are
/// assumed to stay inside a single contiguous longitude range.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoBounds {
    pub northeast: GeoPoint,
    pub southwest: GeoPoint,
}

impl GeoBounds {
    /// Build a viewport, checking that latitudes are ordered and all values finite.
    pub fn new(northeast: GeoPoint, southwest: GeoPoint) -> Result<Self, BoundsError> {
        let all_finite = [
            northeast.latitude,
            northeast.longitude,
            southwest.latitude,
            southwest.longitude,
        ]
        .iter()
        .all(|v| v.is_finite());
        if !all_finite {
            return Err(BoundsError::NonFinite);
        }
        if northeast.latitude < southwest.latitude {
            return Err(BoundsError::InvertedLatitude {
                north: northeast.latitude,
                south: southwest.latitude,
            });
        }
        Ok(Self {
            northeast,
            southwest,
        })
    }

    /// Build from `(latNE, lonNE, latSW, lonSW)` without validation.
    ///
    /// Used for intersections, which may legitimately come out inverted.
    pub fn from_corners(lat_ne: f64, lon_ne: f64, lat_sw: f64, lon_sw: f64) -> Self {
        Self {
            northeast: GeoPoint::new(lat_ne, lon_ne),
            southwest: GeoPoint::new(lat_sw, lon_sw),
        }
    }

    /// Rectangle area in square degrees.
    pub fn area(&self) -> f64 {
        (self.northeast.latitude - self.southwest.latitude).abs()
            * (self.northeast.longitude - self.southwest.longitude).abs()
    }

    /// Component-wise intersection. The result is inverted (NE below or left
    /// of SW) when the two rectangles do not overlap.
    pub fn intersection(&self, other: &GeoBounds) -> GeoBounds {
        GeoBounds::from_corners(
            self.northeast.latitude.min(other.northeast.latitude),
            self.northeast.longitude.min(other.northeast.longitude),
            self.southwest.latitude.max(other.southwest.latitude),
            self.southwest.longitude.max(other.southwest.longitude),
        )
    }

    /// Whether the NE corner lies below or left of the SW corner.
    pub fn is_inverted(&self) -> bool {
        self.northeast.latitude < self.southwest.latitude
            || self.northeast.longitude < self.southwest.longitude
    }

    pub fn contains(&self, point: &GeoPoint) -> bool {
        point.latitude <= self.northeast.latitude
            && point.latitude >= self.southwest.latitude
            && point.longitude <= self.northeast.longitude
            && point.longitude >= self.southwest.longitude
    }

    /// Expand into the four corners the listing API expects.
    pub fn corners(&self) -> BoundsCorners {
        let ne = self.northeast;
        let sw = self.southwest;
        BoundsCorners {
            top_left: GeoPoint::new(ne.latitude, sw.longitude),
            top_right: ne,
            bottom_right: GeoPoint::new(sw.latitude, ne.longitude),
            bottom_left: sw,
        }
    }
}

impl std::fmt::Display for GeoBounds {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "NE({}, {}) SW({}, {})",
            self.northeast.latitude,
            self.northeast.longitude,
            self.southwest.latitude,
            self.southwest.longitude
        )
    }
}

/// Viewport expressed as four corners, as sent in a map data query.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BoundsCorners {
    pub top_left: GeoPoint,
    pub top_right: GeoPoint,
    pub bottom_right: GeoPoint,
    pub bottom_left: GeoPoint,
}

impl BoundsCorners {
    /// Recover the NE/SW rectangle spanned by the corners.
    pub fn bounds(&self) -> GeoBounds {
        let points = [
            self.top_left,
            self.top_right,
            self.bottom_right,
            self.bottom_left,
        ];
        let max_lat = points.iter().map(|p| p.latitude).fold(f64::MIN, f64::max);
        let min_lat = points.iter().map(|p| p.latitude).fold(f64::MAX, f64::min);
        let max_lon = points.iter().map(|p| p.longitude).fold(f64::MIN, f64::max);
        let min_lon = points.iter().map(|p| p.longitude).fold(f64::MAX, f64::min);
        GeoBounds::from_corners(max_lat, max_lon, min_lat, min_lon)
    }
}

/// Listing category shown on the marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum PostType {
    YardSale,
    GarageSale,
    FarmersMarket,
    FoodTruck,
    MusicEvent,
    Seasonal,
    Sporting,
    #[serde(other)]
    Other,
}

impl PostType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::YardSale => "YARD_SALE",
            Self::GarageSale => "GARAGE_SALE",
            Self::FarmersMarket => "FARMERS_MARKET",
            Self::FoodTruck => "FOOD_TRUCK",
            Self::MusicEvent => "MUSIC_EVENT",
            Self::Seasonal => "SEASONAL",
            Self::Sporting => "SPORTING",
            Self::Other => "OTHER",
        }
    }
}

impl Default for PostType {
    fn default() -> Self {
        Self::Other
    }
}

impl std::fmt::Display for PostType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
