//! # Miss-distance evaluation and ranking
//!
//! For every catalog record, the miss distance is the smallest Euclidean distance between the
//! record and the target over the valid epochs of the fine grid. The records are then sorted by
//! miss distance, ties broken by ascending catalog number, so the same inputs always give the same
//! ranking.
//!
//! Records without a single valid propagated epoch have no miss distance: they are left out of
//! the result and counted in the propagation report.
use std::{cmp::Ordering, fmt};

use hifitime::Epoch;
use log::debug;

use crate::{
    catalog::CatalogRecord,
    constants::Kilometer,
    conjunct_errors::ConjunctError,
    propagation::{ensure_frame, PropagationBatch},
    state::Trajectory,
};

/// Closest approach of one catalog object to the target.
#[derive(Debug, Clone)]
pub struct CloseApproach {
    pub record: CatalogRecord,
    /// km
    pub miss_distance: Kilometer,
    pub epoch: Epoch,
    /// Index of `epoch` in the fine grid.
    pub epoch_index: usize,
}

impl fmt::Display for CloseApproach {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>9} {:10} {:25} {:9.0}  {}",
            self.record.catalog_number(),
            self.record.designator(),
            self.record.name(),
            self.miss_distance,
            self.epoch
        )
    }
}

/// Close approaches sorted by ascending miss distance, then catalog number.
#[derive(Debug, Clone, Default)]
pub struct CloseApproachResult {
    approaches: Vec<CloseApproach>,
}

impl CloseApproachResult {
    /// Sort `approaches` into a result.
    pub fn from_approaches(mut approaches: Vec<CloseApproach>) -> Self {
        approaches.sort_by(compare);
        CloseApproachResult { approaches }
    }

    pub fn len(&self) -> usize {
        self.approaches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.approaches.is_empty()
    }

    pub fn first(&self) -> Option<&CloseApproach> {
        self.approaches.first()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CloseApproach> {
        self.approaches.iter()
    }

    pub fn as_slice(&self) -> &[CloseApproach] {
        &self.approaches
    }

    /// Split the result into active objects and debris, keeping the rank order in both.
    pub fn partition_debris(&self) -> (Vec<&CloseApproach>, Vec<&CloseApproach>) {
        self.approaches
            .iter()
            .partition(|a| !a.record.is_debris())
    }
}

impl<'a> IntoIterator for &'a CloseApproachResult {
    type Item = &'a CloseApproach;
    type IntoIter = std::slice::Iter<'a, CloseApproach>;

    fn into_iter(self) -> Self::IntoIter {
        self.approaches.iter()
    }
}

fn compare(a: &CloseApproach, b: &CloseApproach) -> Ordering {
    a.miss_distance
        .total_cmp(&b.miss_distance)
        .then_with(|| a.record.catalog_number().cmp(&b.record.catalog_number()))
}

/// Rank the records of a propagation batch by miss distance to the target.
///
/// Arguments
/// -----------------
/// * `target`: target trajectory on the fine grid.
/// * `batch`: propagated records, already expressed in the target frame.
/// * `records`: the records of the batch, in batch order.
///
/// Return
/// ----------
/// * The sorted result. Only valid samples contribute to a miss distance.
/// * [`ConjunctError::InvalidTimeGrid`] if the batch and the target are not on the same grid.
/// * [`ConjunctError::InvalidSearchParameter`] if `records` does not match the batch or if a
///   record is not in the target frame.
pub fn rank(
    target: &Trajectory,
    batch: &PropagationBatch,
    records: &[CatalogRecord],
) -> Result<CloseApproachResult, ConjunctError> {
    if batch.grid() != target.grid() {
        return Err(ConjunctError::InvalidTimeGrid(format!(
            "propagation grid of {} epochs differs from the target grid of {} epochs",
            batch.epoch_count(),
            target.len()
        )));
    }
    if records.len() != batch.record_count()
        || records
            .iter()
            .enumerate()
            .any(|(i, r)| r.catalog_number() != batch.catalog_number(i))
    {
        return Err(ConjunctError::InvalidSearchParameter(format!(
            "{} records given for a batch of {}",
            records.len(),
            batch.record_count()
        )));
    }
    ensure_frame(batch, target.frame())?;

    let target_positions: Vec<_> = target.positions().collect();
    let mut approaches = Vec::with_capacity(records.len());

    for (i, record) in records.iter().enumerate() {
        let closest = batch
            .positions(i)
            .iter()
            .zip(batch.status(i))
            .zip(&target_positions)
            .enumerate()
            .filter(|(_, ((_, status), _))| status.is_valid())
            .map(|(j, ((p, _), t))| (j, (p - *t).norm()))
            .fold(None, |best: Option<(usize, f64)>, (j, d)| match best {
                Some((_, b)) if b <= d => best,
                _ => Some((j, d)),
            });

        match closest {
            Some((index, distance)) => {
                debug!(
                    "object {}: minimum {distance:.1} km at epoch {index}",
                    record.catalog_number()
                );
                approaches.push(CloseApproach {
                    record: record.clone(),
                    miss_distance: distance,
                    epoch: batch.grid().epoch(index),
                    epoch_index: index,
                });
            }
            None => debug!("object {}: no valid epoch", record.catalog_number()),
        }
    }

    Ok(CloseApproachResult::from_approaches(approaches))
}

#[cfg(test)]
mod ranking_test {
    use super::*;
    use crate::catalog::catalog_test::record;

    #[test]
    fn test_sort_and_tie_break() {
        let approach = |number, distance| CloseApproach {
            record: record(number, "OBJ", 6.0),
            miss_distance: distance,
            epoch: Epoch::from_gregorian_utc_hms(2023, 1, 27, 0, 0, 0),
            epoch_index: 0,
        };

        let result = CloseApproachResult::from_approaches(vec![
            approach(30, 500.0),
            approach(12, 100.0),
            approach(7, 500.0),
            approach(3, 900.0),
        ]);

        let order: Vec<_> = result
            .iter()
            .map(|a| a.record.catalog_number())
            .collect();
        assert_eq!(order, vec![12, 7, 30, 3]);
        assert_eq!(result.first().unwrap().miss_distance, 100.0);
    }

    #[test]
    fn test_partition_debris() {
        let approach = |number, name: &str, distance| CloseApproach {
            record: record(number, name, 6.0),
            miss_distance: distance,
            epoch: Epoch::from_gregorian_utc_hms(2023, 1, 27, 0, 0, 0),
            epoch_index: 0,
        };
        let result = CloseApproachResult::from_approaches(vec![
            approach(1, "INTELSAT 901", 300.0),
            approach(2, "SL-12 R/B", 100.0),
            approach(3, "GOES 16", 200.0),
            approach(4, "TITAN 3C TRANSTAGE DEB", 50.0),
        ]);

        let (active, debris) = result.partition_debris();
        let active: Vec<_> = active.iter().map(|a| a.record.catalog_number()).collect();
        let debris: Vec<_> = debris.iter().map(|a| a.record.catalog_number()).collect();
        assert_eq!(active, vec![3, 1]);
        assert_eq!(debris, vec![4, 2]);
    }
}
