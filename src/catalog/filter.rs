//! Apogee versus miss distance pre-filter.
//!
//! An object whose farthest point from the Earth's center never reaches a given fraction of the
//! observed miss distance of the target cannot be the conjuncting object. Discarding those objects
//! before propagation removes most of the low Earth orbit population from the batch.
use crate::{catalog::CatalogRecord, constants::Kilometer};

/// `true` if the record may reach `margin × miss_distance` from the Earth's center.
///
/// The test is `(1 + apogee_altitude) × equatorial_radius > margin × miss_distance`.
pub fn can_reach(record: &CatalogRecord, miss_distance: Kilometer, margin: f64) -> bool {
    record.max_reach() > margin * miss_distance
}

/// Keep the records that pass [`can_reach`], preserving their order.
///
/// Arguments
/// -----------------
/// * `records`: full catalog.
/// * `miss_distance`: distance of the target from the Earth's center at the fine close approach.
/// * `margin`: fraction of the miss distance an object must be able to reach (0.9 by default).
///
/// Return
/// ----------
/// * The surviving candidates. An empty set is a valid outcome.
pub fn filter_candidates(
    records: Vec<CatalogRecord>,
    miss_distance: Kilometer,
    margin: f64,
) -> Vec<CatalogRecord> {
    records
        .into_iter()
        .filter(|r| can_reach(r, miss_distance, margin))
        .collect()
}

#[cfg(test)]
mod filter_test {
    use super::*;
    use crate::catalog::catalog_test::record;

    #[test]
    fn test_low_orbit_excluded() {
        // (1.05)(6378) = 6697 < 0.9 × 50000 = 45000
        let leo = record(1, "LEO", 0.05);
        assert!(!can_reach(&leo, 50_000.0, 0.9));
        assert!(filter_candidates(vec![leo], 50_000.0, 0.9).is_empty());
    }

    #[test]
    fn test_geo_kept() {
        // GEO: 42164 / 6378 - 1 ≈ 5.61, reach 42164 > 0.9 × 45000
        let geo = record(2, "GEO", 5.61);
        assert!(can_reach(&geo, 45_000.0, 0.9));
        // boundary is strict
        let reach = geo.max_reach();
        assert!(!can_reach(&geo, reach / 0.9, 0.9));
    }

    #[test]
    fn test_filter_preserves_order() {
        let records = vec![
            record(10, "HEO A", 8.0),
            record(11, "LEO", 0.1),
            record(12, "HEO B", 6.0),
        ];
        let kept = filter_candidates(records, 40_000.0, 0.9);
        let numbers: Vec<_> = kept.iter().map(|r| r.catalog_number()).collect();
        assert_eq!(numbers, vec![10, 12]);
    }

    #[test]
    fn test_filter_monotonicity() {
        let records: Vec<_> = (0..20)
            .map(|i| record(i, "OBJ", 0.5 * i as f64))
            .collect();

        let mut previous = usize::MAX;
        for miss in [5_000.0, 10_000.0, 20_000.0, 40_000.0, 60_000.0, 100_000.0] {
            let kept = filter_candidates(records.clone(), miss, 0.9).len();
            assert!(kept <= previous);
            previous = kept;
        }
    }
}
