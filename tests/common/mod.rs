#![allow(dead_code)]

use std::{
    cell::{Cell, RefCell},
    collections::VecDeque,
    sync::Arc,
};

use conjunct::{
    catalog::{
        CatalogContext, CatalogProvider, CatalogRecord, OrbitModel, PropagatedState,
        PropagationStatus,
    },
    constants::CatalogNumber,
    conjunct_errors::ConjunctError,
    ephemeris::{BodyRef, EphemerisSource},
    state::{ReferenceFrame, Trajectory},
    time::TimeGrid,
};
use hifitime::{Duration, Epoch, Unit};
use nalgebra::Vector3;

pub fn init_logger() {
    let _ = env_logger::builder().is_test(true).try_init();
}

/// Ephemeris source computing the target position from a closure.
///
/// Queries are recorded. A query whose grid extends past `coverage_end` fails like Horizons does
/// for impacted bodies, and scripted failures are returned in order before any computation.
pub struct ScriptedEphemeris {
    position: Box<dyn Fn(Epoch) -> Vector3<f64>>,
    coverage_end: Option<Epoch>,
    failures: RefCell<VecDeque<Option<ConjunctError>>>,
    calls: RefCell<Vec<TimeGrid>>,
}

impl ScriptedEphemeris {
    pub fn new(position: impl Fn(Epoch) -> Vector3<f64> + 'static) -> Self {
        ScriptedEphemeris {
            position: Box::new(position),
            coverage_end: None,
            failures: RefCell::new(VecDeque::new()),
            calls: RefCell::new(Vec::new()),
        }
    }

    pub fn with_coverage_end(mut self, end: Epoch) -> Self {
        self.coverage_end = Some(end);
        self
    }

    /// Outcome of the next queries: `None` answers normally, `Some(e)` fails with `e`.
    pub fn with_script(self, script: Vec<Option<ConjunctError>>) -> Self {
        *self.failures.borrow_mut() = script.into();
        self
    }

    pub fn calls(&self) -> Vec<TimeGrid> {
        self.calls.borrow().clone()
    }
}

impl EphemerisSource for ScriptedEphemeris {
    fn fetch(
        &self,
        target: &str,
        grid: &TimeGrid,
        _center: BodyRef,
    ) -> Result<Trajectory, ConjunctError> {
        self.calls.borrow_mut().push(*grid);

        if let Some(Some(err)) = self.failures.borrow_mut().pop_front() {
            return Err(err);
        }
        if let Some(end) = self.coverage_end {
            if grid.end() > end {
                return Err(ConjunctError::EphemerisUnavailable {
                    target: target.to_string(),
                    cutoff: end,
                });
            }
        }

        let positions: Vec<_> = grid.iter().map(|e| (self.position)(e)).collect();
        let velocities = vec![Vector3::zeros(); grid.len()];
        Trajectory::from_samples(*grid, ReferenceFrame::Gcrs, &positions, &velocities)
    }
}

/// Catalog provider serving a fixed list of records and recording the requested contexts.
pub struct InMemoryCatalog {
    records: Vec<CatalogRecord>,
    unavailable: bool,
    contexts: RefCell<Vec<CatalogContext>>,
    fetches: Cell<usize>,
}

impl InMemoryCatalog {
    pub fn new(records: Vec<CatalogRecord>) -> Self {
        InMemoryCatalog {
            records,
            unavailable: false,
            contexts: RefCell::new(Vec::new()),
            fetches: Cell::new(0),
        }
    }

    pub fn unavailable() -> Self {
        InMemoryCatalog {
            unavailable: true,
            ..InMemoryCatalog::new(Vec::new())
        }
    }

    pub fn contexts(&self) -> Vec<CatalogContext> {
        self.contexts.borrow().clone()
    }

    pub fn fetches(&self) -> usize {
        self.fetches.get()
    }
}

impl CatalogProvider for InMemoryCatalog {
    fn fetch(&self, context: &CatalogContext) -> Result<Vec<CatalogRecord>, ConjunctError> {
        self.fetches.set(self.fetches.get() + 1);
        self.contexts.borrow_mut().push(*context);
        if self.unavailable {
            return Err(ConjunctError::CatalogUnavailable(
                "archive server unreachable".into(),
            ));
        }
        Ok(self.records.clone())
    }
}

/// Object at a fixed position of its frame.
#[derive(Debug)]
pub struct FixedOrbit {
    pub position: Vector3<f64>,
    pub frame: ReferenceFrame,
}

impl OrbitModel for FixedOrbit {
    fn native_frame(&self) -> ReferenceFrame {
        self.frame
    }

    fn propagate(&self, _epoch: Epoch) -> Result<PropagatedState, PropagationStatus> {
        Ok((self.position, Vector3::zeros()))
    }
}

/// Object whose positions are tabulated on a regular grid, GCRS.
///
/// Epochs off the table, or listed in `failing`, cannot be propagated.
#[derive(Debug)]
pub struct TabulatedOrbit {
    pub start: Epoch,
    pub step: Duration,
    pub positions: Vec<Vector3<f64>>,
    pub failing: Vec<usize>,
}

impl OrbitModel for TabulatedOrbit {
    fn native_frame(&self) -> ReferenceFrame {
        ReferenceFrame::Gcrs
    }

    fn propagate(&self, epoch: Epoch) -> Result<PropagatedState, PropagationStatus> {
        let offset = ((epoch - self.start).to_seconds() / self.step.to_seconds()).round();
        if offset < 0.0 {
            return Err(PropagationStatus::ModelError);
        }
        let index = offset as usize;
        if self.failing.contains(&index) {
            return Err(PropagationStatus::ModelError);
        }
        self.positions
            .get(index)
            .map(|p| (*p, Vector3::zeros()))
            .ok_or(PropagationStatus::ModelError)
    }
}

/// Object at a fixed GCRS position that cannot be propagated at the epochs selected by `fails`.
#[derive(Debug)]
pub struct FlakyOrbit {
    pub position: Vector3<f64>,
    pub fails: fn(Epoch) -> bool,
}

impl OrbitModel for FlakyOrbit {
    fn native_frame(&self) -> ReferenceFrame {
        ReferenceFrame::Gcrs
    }

    fn propagate(&self, epoch: Epoch) -> Result<PropagatedState, PropagationStatus> {
        if (self.fails)(epoch) {
            Err(PropagationStatus::ModelError)
        } else {
            Ok((self.position, Vector3::zeros()))
        }
    }
}

/// High orbit record (reach ≈ 44 600 km), never removed by the apogee filter in the scenarios.
pub fn high_record(
    number: CatalogNumber,
    name: &str,
    model: impl OrbitModel + 'static,
) -> CatalogRecord {
    CatalogRecord::new(number, "2000-001A", name, 6378.135, 6.0, Arc::new(model)).unwrap()
}

pub fn fixed_record(number: CatalogNumber, name: &str, position: Vector3<f64>) -> CatalogRecord {
    high_record(
        number,
        name,
        FixedOrbit {
            position,
            frame: ReferenceFrame::Gcrs,
        },
    )
}

/// Low Earth orbit record, reach ≈ 6 697 km.
pub fn leo_record(number: CatalogNumber, name: &str) -> CatalogRecord {
    CatalogRecord::new(
        number,
        "2000-002A",
        name,
        6378.0,
        0.05,
        Arc::new(FixedOrbit {
            position: Vector3::new(6_697.0, 0.0, 0.0),
            frame: ReferenceFrame::Gcrs,
        }),
    )
    .unwrap()
}

/// Nominal epoch of the 2023 BU flyby used by the flyby scenarios.
pub fn flyby_tca() -> Epoch {
    Epoch::from_gregorian_utc_hms(2023, 1, 27, 0, 29, 0)
}

/// Closest approach distance of the synthetic flyby (km).
pub const FLYBY_PERIGEE: f64 = 30_000.0;

/// Straight line flyby at 10 km/s along x, perigee on the y axis three minutes after the nominal
/// epoch.
pub fn flyby_position(epoch: Epoch) -> Vector3<f64> {
    let perigee = flyby_tca() + Unit::Minute * 3_i64;
    let dt = (epoch - perigee).to_seconds();
    Vector3::new(10.0 * dt, FLYBY_PERIGEE, 0.0)
}

/// Nominal impact epoch of the impact scenarios.
pub fn impact_epoch() -> Epoch {
    Epoch::from_gregorian_utc_hms(2019, 6, 22, 21, 25, 0)
}

/// Radial fall at 10 km/s reaching the Earth's surface at the impact epoch.
pub fn impact_position(epoch: Epoch) -> Vector3<f64> {
    let dt = (impact_epoch() - epoch).to_seconds();
    Vector3::new(6_378.0 + 10.0 * dt, 0.0, 0.0)
}
