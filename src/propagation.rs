//! # Bulk propagation and frame reconciliation
//!
//! [`propagate_batch`] evaluates every candidate record at every epoch of the fine grid in a
//! single pass and stores the outcome in a [`PropagationBatch`]: flat `records × epochs` arrays of
//! positions, velocities and [`PropagationStatus`] codes, stored record-major.
//!
//! A failed sample never aborts the batch. Records with at least one invalid epoch are
//! *degraded* and reported as [`PropagationDegraded`] diagnostics; they keep their valid samples.
//! Records with no valid epoch at all cannot contribute a minimum and are listed in
//! [`PropagationReport::dropped`].
//!
//! [`reconcile_frames`] then rotates every sample into the frame of the target trajectory
//! (TEME → GCRS for SGP4 element sets). Distances between vectors of different frames are
//! meaningless, so the ranker refuses a batch that is not expressed in the target frame.
//!
//! ## Progress
//! -----------------
//! With the `progress` feature, [`propagate_batch`] renders an `indicatif` progress bar over the
//! records.
use std::time::Instant;

use ahash::AHashMap;
use log::{info, warn};
use nalgebra::{Matrix3, Vector3};

#[cfg(feature = "progress")]
use indicatif::{ProgressBar, ProgressStyle};

use crate::{
    catalog::{CatalogRecord, PropagationStatus},
    constants::CatalogNumber,
    conjunct_errors::ConjunctError,
    ref_system::rotation_between,
    state::{ReferenceFrame, Trajectory},
    time::TimeGrid,
};

/// Diagnostic of a record with at least one invalid propagated epoch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PropagationDegraded {
    pub catalog_number: CatalogNumber,
    /// Position of the record in the batch.
    pub record_index: usize,
    /// Grid indices of the invalid samples, ascending.
    pub invalid_epochs: Vec<usize>,
}

/// Summary of one batch propagation.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropagationReport {
    pub records: usize,
    pub epochs: usize,
    pub elapsed: std::time::Duration,
    /// Records with at least one invalid epoch (including the dropped ones).
    pub degraded: Vec<PropagationDegraded>,
    /// Catalog numbers of the records without a single valid epoch.
    pub dropped: Vec<CatalogNumber>,
}

impl PropagationReport {
    /// Mean wall time per (record, epoch) sample, in milliseconds.
    pub fn ms_per_element_epoch(&self) -> f64 {
        let samples = self.records * self.epochs;
        if samples == 0 {
            return 0.0;
        }
        self.elapsed.as_secs_f64() * 1e3 / samples as f64
    }
}

/// Positions, velocities and status codes of a set of records over one time grid.
#[derive(Debug, Clone, PartialEq)]
pub struct PropagationBatch {
    grid: TimeGrid,
    catalog_numbers: Vec<CatalogNumber>,
    frames: Vec<ReferenceFrame>,
    positions: Vec<Vector3<f64>>,
    velocities: Vec<Vector3<f64>>,
    status: Vec<PropagationStatus>,
    elapsed: std::time::Duration,
}

impl PropagationBatch {
    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn record_count(&self) -> usize {
        self.catalog_numbers.len()
    }

    pub fn epoch_count(&self) -> usize {
        self.grid.len()
    }

    pub fn catalog_number(&self, record: usize) -> CatalogNumber {
        self.catalog_numbers[record]
    }

    pub fn frame(&self, record: usize) -> ReferenceFrame {
        self.frames[record]
    }

    /// `true` if every record is expressed in `frame`.
    pub fn is_in_frame(&self, frame: ReferenceFrame) -> bool {
        self.frames.iter().all(|f| *f == frame)
    }

    fn span(&self, record: usize) -> std::ops::Range<usize> {
        let n = self.epoch_count();
        record * n..(record + 1) * n
    }

    pub fn positions(&self, record: usize) -> &[Vector3<f64>] {
        &self.positions[self.span(record)]
    }

    pub fn velocities(&self, record: usize) -> &[Vector3<f64>] {
        &self.velocities[self.span(record)]
    }

    pub fn status(&self, record: usize) -> &[PropagationStatus] {
        &self.status[self.span(record)]
    }

    pub fn valid_epochs(&self, record: usize) -> usize {
        self.status(record).iter().filter(|s| s.is_valid()).count()
    }

    pub fn is_degraded(&self, record: usize) -> bool {
        self.valid_epochs(record) != self.epoch_count()
    }

    /// Trajectory of a record, only when every sample of the record is valid.
    pub fn trajectory(&self, record: usize) -> Option<Trajectory> {
        if self.is_degraded(record) {
            return None;
        }
        Trajectory::from_samples(
            self.grid,
            self.frames[record],
            self.positions(record),
            self.velocities(record),
        )
        .ok()
    }

    /// One diagnostic per degraded record, in batch order.
    pub fn diagnostics(&self) -> Vec<PropagationDegraded> {
        (0..self.record_count())
            .filter(|&i| self.is_degraded(i))
            .map(|i| PropagationDegraded {
                catalog_number: self.catalog_numbers[i],
                record_index: i,
                invalid_epochs: self
                    .status(i)
                    .iter()
                    .enumerate()
                    .filter(|(_, s)| !s.is_valid())
                    .map(|(j, _)| j)
                    .collect(),
            })
            .collect()
    }

    pub fn report(&self) -> PropagationReport {
        PropagationReport {
            records: self.record_count(),
            epochs: self.epoch_count(),
            elapsed: self.elapsed,
            degraded: self.diagnostics(),
            dropped: (0..self.record_count())
                .filter(|&i| self.valid_epochs(i) == 0)
                .map(|i| self.catalog_numbers[i])
                .collect(),
        }
    }
}

#[cfg(feature = "progress")]
fn progress_bar(records: usize) -> ProgressBar {
    let pb = ProgressBar::new(records.max(1) as u64);
    if let Ok(style) =
        ProgressStyle::with_template("{bar:40.cyan/blue} {pos}/{len} ({percent:>3}%) | {per_sec} | ETA {eta_precise}")
    {
        pb.set_style(style);
    }
    pb
}

/// Propagate every record at every epoch of `grid`.
///
/// Arguments
/// -----------------
/// * `records`: the candidates that passed the filter, in rank-independent order.
/// * `grid`: the fine time grid.
///
/// Return
/// ----------
/// * The batch, aligned with `records`. States are in each record's native frame.
pub fn propagate_batch(records: &[CatalogRecord], grid: &TimeGrid) -> PropagationBatch {
    let epochs = grid.epochs();
    let total = records.len() * epochs.len();

    let mut positions = Vec::with_capacity(total);
    let mut velocities = Vec::with_capacity(total);
    let mut status = Vec::with_capacity(total);
    let invalid = Vector3::repeat(f64::NAN);

    #[cfg(feature = "progress")]
    let pb = progress_bar(records.len());

    let start = Instant::now();
    for record in records {
        let model = record.model();
        for epoch in &epochs {
            match model.propagate(*epoch) {
                Ok((p, v)) => {
                    positions.push(p);
                    velocities.push(v);
                    status.push(PropagationStatus::Valid);
                }
                Err(code) => {
                    positions.push(invalid);
                    velocities.push(invalid);
                    status.push(code);
                }
            }
        }
        #[cfg(feature = "progress")]
        pb.inc(1);
    }
    let elapsed = start.elapsed();

    #[cfg(feature = "progress")]
    pb.finish_and_clear();

    let batch = PropagationBatch {
        grid: *grid,
        catalog_numbers: records.iter().map(CatalogRecord::catalog_number).collect(),
        frames: records.iter().map(|r| r.model().native_frame()).collect(),
        positions,
        velocities,
        status,
        elapsed,
    };

    let report = batch.report();
    info!(
        "Propagated {} elsets for {} epochs in {:.2} sec: {:.3} ms/el-epoch",
        report.records,
        report.epochs,
        elapsed.as_secs_f64(),
        report.ms_per_element_epoch()
    );
    if !report.degraded.is_empty() {
        warn!(
            "{} of {} records degraded, batch indices {:?}",
            report.degraded.len(),
            report.records,
            report
                .degraded
                .iter()
                .map(|d| d.record_index)
                .collect::<Vec<_>>()
        );
    }
    batch
}

/// Rotate every sample of `batch` into `target` frame.
///
/// The rotation of each epoch is computed once per source frame and shared by all the records in
/// that frame. Invalid samples keep their status and stay invalid.
pub fn reconcile_frames(batch: &PropagationBatch, target: ReferenceFrame) -> PropagationBatch {
    let n = batch.epoch_count();
    let epochs = batch.grid.epochs();

    let mut rotations: AHashMap<ReferenceFrame, Vec<Matrix3<f64>>> = AHashMap::new();
    let mut positions = Vec::with_capacity(batch.positions.len());
    let mut velocities = Vec::with_capacity(batch.velocities.len());

    for (record, &frame) in batch.frames.iter().enumerate() {
        let span = record * n..(record + 1) * n;
        if frame == target {
            positions.extend_from_slice(&batch.positions[span.clone()]);
            velocities.extend_from_slice(&batch.velocities[span]);
            continue;
        }

        let rot = rotations.entry(frame).or_insert_with(|| {
            epochs
                .iter()
                .map(|e| rotation_between(frame, target, e.to_mjd_tt_days()))
                .collect()
        });
        positions.extend(
            batch.positions[span.clone()]
                .iter()
                .zip(rot.iter())
                .map(|(p, r)| r * p),
        );
        velocities.extend(
            batch.velocities[span]
                .iter()
                .zip(rot.iter())
                .map(|(v, r)| r * v),
        );
    }

    PropagationBatch {
        grid: batch.grid,
        catalog_numbers: batch.catalog_numbers.clone(),
        frames: vec![target; batch.record_count()],
        positions,
        velocities,
        status: batch.status.clone(),
        elapsed: batch.elapsed,
    }
}

/// Reject a batch whose samples are not expressed in `frame`.
pub(crate) fn ensure_frame(
    batch: &PropagationBatch,
    frame: ReferenceFrame,
) -> Result<(), ConjunctError> {
    match batch.frames.iter().position(|f| *f != frame) {
        None => Ok(()),
        Some(i) => Err(ConjunctError::InvalidSearchParameter(format!(
            "object {} is expressed in {} but the target trajectory is in {frame}",
            batch.catalog_numbers[i], batch.frames[i]
        ))),
    }
}
