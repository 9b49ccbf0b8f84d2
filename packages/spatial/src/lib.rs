#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions)]

//! Spatial grid quantization for grouping nearby report coordinates.
//!
//! Reports filed for the same pothole rarely carry byte-identical
//! coordinates, so raw lat/lng pairs are snapped onto a fixed grid and
//! grouped by cell. Quantization is pure and deterministic: the cell a
//! point lands in depends only on the point and the grid resolution,
//! never on what else has been seen.

/// Default grid resolution in cells per degree.
///
/// 1000 cells per degree is ~111 m north-south at Baltimore's latitude
/// (~86 m east-west), which matches how far apart two reports of the
/// same street defect typically land.
pub const DEFAULT_CELLS_PER_DEGREE: u32 = 1000;

/// Baltimore bounding box: (min lat, max lat, min lng, max lng).
///
/// Points outside this box are treated as bad geocodes. The box is
/// deliberately loose — it covers the city plus the inner county.
pub const BALTIMORE_BOUNDS: (f64, f64, f64, f64) = (39.1, 39.5, -76.9, -76.4);

/// Returns `true` if the point falls inside [`BALTIMORE_BOUNDS`].
#[must_use]
pub fn in_baltimore(lat: f64, lng: f64) -> bool {
    let (lat_min, lat_max, lng_min, lng_max) = BALTIMORE_BOUNDS;
    (lat_min..=lat_max).contains(&lat) && (lng_min..=lng_max).contains(&lng)
}

/// A quantized grid cell identifying one spatial bucket.
///
/// Cell coordinates are the floor of `degrees * cells_per_degree`, so
/// all points inside the same cell share a key. Keys order
/// lexicographically by (lat cell, lng cell), which gives bucket maps a
/// stable south-to-north iteration order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct GridKey {
    /// Latitude cell index (floor of `lat * cells_per_degree`).
    pub lat_cell: i32,
    /// Longitude cell index (floor of `lng * cells_per_degree`).
    pub lng_cell: i32,
}

impl GridKey {
    /// Returns the cell containing the given point, or `None` when the
    /// coordinates are non-finite or outside [`BALTIMORE_BOUNDS`].
    #[must_use]
    pub fn containing(lat: f64, lng: f64, cells_per_degree: u32) -> Option<Self> {
        if !lat.is_finite() || !lng.is_finite() || !in_baltimore(lat, lng) {
            return None;
        }
        let scale = f64::from(cells_per_degree);
        #[allow(clippy::cast_possible_truncation)]
        Some(Self {
            lat_cell: (lat * scale).floor() as i32,
            lng_cell: (lng * scale).floor() as i32,
        })
    }

    /// Returns the southwest corner of this cell in degrees.
    ///
    /// Only useful for debugging — map markers should use the centroid
    /// of the cell's member reports, not the cell corner.
    #[must_use]
    pub fn corner(self, cells_per_degree: u32) -> (f64, f64) {
        let scale = f64::from(cells_per_degree);
        (f64::from(self.lat_cell) / scale, f64::from(self.lng_cell) / scale)
    }
}

impl std::fmt::Display for GridKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.lat_cell, self.lng_cell)
    }
}

/// Running mean of member coordinates, used to place a bucket's map
/// marker at the visual center of its reports.
#[derive(Debug, Clone, Copy, Default)]
pub struct CentroidAccumulator {
    sum_lat: f64,
    sum_lng: f64,
    count: u64,
}

impl CentroidAccumulator {
    /// Adds a point to the running mean.
    pub fn push(&mut self, lat: f64, lng: f64) {
        self.sum_lat += lat;
        self.sum_lng += lng;
        self.count += 1;
    }

    /// Returns the mean (lat, lng), or `None` when no points were added.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn finish(self) -> Option<(f64, f64)> {
        if self.count == 0 {
            return None;
        }
        let n = self.count as f64;
        Some((self.sum_lat / n, self.sum_lng / n))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearby_points_share_a_cell() {
        // ~20 m apart, well inside one ~100 m cell.
        let a = GridKey::containing(39.2905, -76.6103, DEFAULT_CELLS_PER_DEGREE).unwrap();
        let b = GridKey::containing(39.2907, -76.6101, DEFAULT_CELLS_PER_DEGREE).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn distant_points_get_distinct_cells() {
        let a = GridKey::containing(39.2905, -76.6103, DEFAULT_CELLS_PER_DEGREE).unwrap();
        let b = GridKey::containing(39.3105, -76.6103, DEFAULT_CELLS_PER_DEGREE).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn quantization_is_deterministic() {
        for _ in 0..3 {
            let key = GridKey::containing(39.29043, -76.61221, DEFAULT_CELLS_PER_DEGREE).unwrap();
            assert_eq!(key, GridKey { lat_cell: 39290, lng_cell: -76613 });
        }
    }

    #[test]
    fn rejects_non_finite_and_out_of_bounds() {
        assert!(GridKey::containing(f64::NAN, -76.61, DEFAULT_CELLS_PER_DEGREE).is_none());
        assert!(GridKey::containing(39.29, f64::INFINITY, DEFAULT_CELLS_PER_DEGREE).is_none());
        // Washington DC — valid coordinates, wrong city.
        assert!(GridKey::containing(38.9072, -77.0369, DEFAULT_CELLS_PER_DEGREE).is_none());
        assert!(GridKey::containing(0.0, 0.0, DEFAULT_CELLS_PER_DEGREE).is_none());
    }

    #[test]
    fn corner_is_southwest_of_members() {
        let key = GridKey::containing(39.2905, -76.6103, DEFAULT_CELLS_PER_DEGREE).unwrap();
        let (lat, lng) = key.corner(DEFAULT_CELLS_PER_DEGREE);
        assert!(lat <= 39.2905);
        assert!(lng <= -76.6103);
        assert!((39.2905 - lat) < 0.001);
    }

    #[test]
    fn centroid_is_mean_of_points() {
        let mut acc = CentroidAccumulator::default();
        acc.push(39.29, -76.61);
        acc.push(39.31, -76.63);
        let (lat, lng) = acc.finish().unwrap();
        assert!((lat - 39.30).abs() < 1e-9);
        assert!((lng - -76.62).abs() < 1e-9);
    }

    #[test]
    fn empty_centroid_is_none() {
        assert!(CentroidAccumulator::default().finish().is_none());
    }
}
