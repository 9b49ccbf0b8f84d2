//! Grouping of service requests into spatial buckets.
//!
//! The request collection is the single owner of the records; buckets
//! hold indices into it, never copies. Rebuilt from scratch each run.

use std::collections::BTreeMap;

use infra_map_report_models::ServiceRequest;
use infra_map_spatial::GridKey;

/// A map from grid cell to the indices of the requests inside it.
#[derive(Debug)]
pub struct BucketMap {
    buckets: BTreeMap<GridKey, Vec<usize>>,
    /// Requests excluded for lacking a valid in-bounds coordinate.
    pub unmapped: u64,
}

impl BucketMap {
    /// Buckets every request with a valid Baltimore coordinate;
    /// everything else is tallied as unmapped.
    #[must_use]
    pub fn build(requests: &[ServiceRequest], cells_per_degree: u32) -> Self {
        let mut buckets: BTreeMap<GridKey, Vec<usize>> = BTreeMap::new();
        let mut unmapped: u64 = 0;

        for (index, request) in requests.iter().enumerate() {
            match GridKey::containing(request.latitude, request.longitude, cells_per_degree) {
                Some(key) => buckets.entry(key).or_default().push(index),
                None => unmapped += 1,
            }
        }

        Self { buckets, unmapped }
    }

    /// Iterates buckets in key order.
    pub fn iter(&self) -> impl Iterator<Item = (GridKey, &[usize])> {
        self.buckets.iter().map(|(key, members)| (*key, members.as_slice()))
    }

    /// Number of non-empty buckets.
    #[must_use]
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    /// Returns `true` when no request could be bucketed.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::request_at;

    #[test]
    fn nearby_requests_share_a_bucket() {
        let requests = vec![
            request_at(39.2905, -76.6103, "2024-01-05T00:00:00Z"),
            request_at(39.2907, -76.6101, "2024-02-10T00:00:00Z"),
        ];
        let map = BucketMap::build(&requests, 1000);
        assert_eq!(map.len(), 1);
        let (_, members) = map.iter().next().unwrap();
        assert_eq!(members, &[0, 1]);
        assert_eq!(map.unmapped, 0);
    }

    #[test]
    fn out_of_bounds_requests_are_unmapped() {
        let requests = vec![
            request_at(39.2905, -76.6103, "2024-01-05T00:00:00Z"),
            request_at(0.0, 0.0, "2024-01-05T00:00:00Z"),
            request_at(f64::NAN, -76.61, "2024-01-05T00:00:00Z"),
        ];
        let map = BucketMap::build(&requests, 1000);
        assert_eq!(map.len(), 1);
        assert_eq!(map.unmapped, 2);
    }

    #[test]
    fn empty_input_builds_an_empty_map() {
        let map = BucketMap::build(&[], 1000);
        assert!(map.is_empty());
        assert_eq!(map.unmapped, 0);
    }
}
