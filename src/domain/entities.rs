//! Domain Entities - Listing records as the map sees them
//!
//! `MarkerRecord` is the lightweight projection returned by a viewport
//! query; `PostDetail` is the full listing fetched when a marker is clicked.
//! Field names follow the listing API's JSON (camelCase).

use crate::domain::value_objects::{GeoPoint, MarkerId, PostType};
use serde::{Deserialize, Serialize};

/// A listing reduced to what the map needs to draw a pin.
///
/// Two records with the same `id` are the same entity regardless of the
/// other fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MarkerRecord {
    pub id: MarkerId,
    pub post_type: PostType,
    pub location: GeoPoint,
}

impl MarkerRecord {
    pub fn new(id: MarkerId, post_type: PostType, location: GeoPoint) -> Self {
        Self {
            id,
            post_type,
            location,
        }
    }
}

/// Picture attached to a listing or a user profile.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Image {
    pub id: i64,
    pub name: String,
    pub url: String,
}

/// Calendar time as the backend reports it (UTC, minute precision).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UtcTime {
    pub day: u8,
    pub month: u8,
    pub year: i32,
    pub hour: u8,
    pub minute: u8,
}

impl std::fmt::Display for UtcTime {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{:04}-{:02}-{:02} {:02}:{:02}Z",
            self.year, self.month, self.day, self.hour, self.minute
        )
    }
}

/// Owner of a listing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: i64,
    pub firstname: String,
    pub lastname: String,
    pub username: String,
    pub email: String,
    #[serde(default)]
    pub profile_picture: Option<Image>,
    #[serde(default)]
    pub preferences: Option<Vec<PostType>>,
}

/// Full listing shown in the detail sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostDetail {
    pub id: MarkerId,
    pub title: String,
    pub description: String,
    pub location: GeoPoint,
    #[serde(default)]
    pub distance: Option<f64>,
    #[serde(rename = "type")]
    pub post_type: PostType,
    #[serde(default)]
    pub pictures: Option<Vec<Image>>,
    pub post_time: UtcTime,
    pub start_time: UtcTime,
    pub end_time: UtcTime,
    pub owner: User,
}

impl PostDetail {
    /// Project the listing down to its map marker.
    pub fn marker(&self) -> MarkerRecord {
        MarkerRecord::new(self.id, self.post_type, self.location)
    }
}
