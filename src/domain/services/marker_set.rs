//! Marker Set
//!
//! Accumulated markers keyed by listing id.

use crate::domain::entities::MarkerRecord;
use crate::domain::value_objects::{GeoBounds, MarkerId};
use std::collections::HashMap;

/// Markers deduplicated by id.
///
/// Merging is an upsert: a record replaces any existing record with the same
/// id, so whichever fetch is applied last wins.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MarkerSet {
    records: HashMap<MarkerId, MarkerRecord>,
}

impl MarkerSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upsert every record. Returns how many ids were not present before.
    pub fn merge<I>(&mut self, records: I) -> usize
    where
        I: IntoIterator<Item = MarkerRecord>,
    {
        let mut inserted = 0;
        for record in records {
            if self.records.insert(record.id, record).is_none() {
                inserted += 1;
            }
        }
        inserted
    }

    pub fn get(&self, id: MarkerId) -> Option<&MarkerRecord> {
        self.records.get(&id)
    }

    pub fn contains(&self, id: MarkerId) -> bool {
        self.records.contains_key(&id)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &MarkerRecord> {
        self.records.values()
    }

    /// Markers located inside `bounds`.
    pub fn within(&self, bounds: &GeoBounds) -> Vec<&MarkerRecord> {
        self.records
            .values()
            .filter(|r| bounds.contains(&r.location))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::value_objects::{GeoPoint, PostType};

    fn marker(id: i64, post_type: PostType, lat: f64, lon: f64) -> MarkerRecord {
        MarkerRecord::new(MarkerId(id), post_type, GeoPoint::new(lat, lon))
    }

    #[test]
    fn test_new_is_empty() {
        let set = MarkerSet::new();
        assert!(set.is_empty());
        assert_eq!(set.len(), 0);
    }

    #[test]
    fn test_merge_inserts_new_ids() {
        let mut set = MarkerSet::new();
        let inserted = set.merge(vec![
            marker(1, PostType::YardSale, 0.0, 0.0),
            marker(2, PostType::FoodTruck, 1.0, 1.0),
        ]);

        assert_eq!(inserted, 2);
        assert_eq!(set.len(), 2);
        assert!(set.contains(MarkerId(1)));
        assert!(set.contains(MarkerId(2)));
    }

    #[test]
    fn test_merge_same_result_twice_is_idempotent() {
        let batch = vec![
            marker(1, PostType::YardSale, 0.0, 0.0),
            marker(2, PostType::FoodTruck, 1.0, 1.0),
        ];

        let mut once = MarkerSet::new();
        once.merge(batch.clone());

        let mut twice = MarkerSet::new();
        twice.merge(batch.clone());
        let inserted = twice.merge(batch);

        assert_eq!(inserted, 0);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_merge_last_applied_wins() {
        let a = vec![marker(1, PostType::YardSale, 0.0, 0.0)];
        let b = vec![marker(1, PostType::GarageSale, 0.5, 0.5)];

        let mut ab = MarkerSet::new();
        ab.merge(a.clone());
        ab.merge(b.clone());
        assert_eq!(ab.get(MarkerId(1)).unwrap().post_type, PostType::GarageSale);

        let mut ba = MarkerSet::new();
        ba.merge(b);
        ba.merge(a);
        assert_eq!(ba.get(MarkerId(1)).unwrap().post_type, PostType::YardSale);
    }

    #[test]
    fn test_merge_keeps_ids_absent_from_later_batch() {
        let mut set = MarkerSet::new();
        set.merge(vec![marker(1, PostType::Other, 0.0, 0.0)]);
        set.merge(vec![marker(2, PostType::Other, 5.0, 5.0)]);

        assert_eq!(set.len(), 2);
    }

    #[test]
    fn test_merge_duplicate_ids_in_one_batch() {
        let mut set = MarkerSet::new();
        let inserted = set.merge(vec![
            marker(1, PostType::Sporting, 0.0, 0.0),
            marker(1, PostType::Seasonal, 0.0, 0.0),
        ]);

        assert_eq!(inserted, 1);
        assert_eq!(set.get(MarkerId(1)).unwrap().post_type, PostType::Seasonal);
    }

    #[test]
    fn test_within_filters_by_location() {
        let mut set = MarkerSet::new();
        set.merge(vec![
            marker(1, PostType::Other, 5.0, 5.0),
            marker(2, PostType::Other, 50.0, 50.0),
        ]);

        let inside = set.within(&GeoBounds::from_corners(10.0, 10.0, 0.0, 0.0));
        assert_eq!(inside.len(), 1);
        assert_eq!(inside[0].id, MarkerId(1));
    }
}
