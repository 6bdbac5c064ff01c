//! # State vectors and trajectories
//!
//! A [`StateVector`] is one position/velocity sample at one epoch, tagged with the
//! [`ReferenceFrame`] it is expressed in. A [`Trajectory`] is a sequence of state vectors aligned
//! one-to-one with a [`TimeGrid`]: the constructor refuses any sample count that does not match
//! the grid, so a trajectory is never partially populated.
//!
//! Units are kilometers and kilometers per second throughout.
use std::fmt;

use hifitime::Epoch;
use nalgebra::Vector3;

use crate::{constants::Kilometer, conjunct_errors::ConjunctError, time::TimeGrid};

/// Inertial frames met by the search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ReferenceFrame {
    /// True Equator, Mean Equinox of date: the native output frame of SGP4.
    Teme,
    /// Geocentric Celestial Reference System, axes aligned with ICRF.
    /// This is the frame of geocentric Horizons vectors with `REF_SYSTEM=ICRF`.
    Gcrs,
}

impl fmt::Display for ReferenceFrame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ReferenceFrame::Teme => write!(f, "TEME"),
            ReferenceFrame::Gcrs => write!(f, "GCRS"),
        }
    }
}

/// Body the positions are measured from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BodyRef {
    Earth,
}

impl BodyRef {
    /// Horizons center code, body center of the major body.
    pub fn horizons_center(&self) -> &'static str {
        match self {
            BodyRef::Earth => "500@399",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StateVector {
    pub epoch: Epoch,
    /// km
    pub position: Vector3<f64>,
    /// km/s
    pub velocity: Vector3<f64>,
    pub frame: ReferenceFrame,
}

impl StateVector {
    pub fn new(
        epoch: Epoch,
        position: Vector3<f64>,
        velocity: Vector3<f64>,
        frame: ReferenceFrame,
    ) -> Self {
        StateVector {
            epoch,
            position,
            velocity,
            frame,
        }
    }

    /// Distance from the center of the reference body.
    pub fn range(&self) -> Kilometer {
        self.position.norm()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Trajectory {
    grid: TimeGrid,
    frame: ReferenceFrame,
    states: Vec<StateVector>,
}

impl Trajectory {
    /// Assemble a trajectory from positions and velocities sampled on `grid`.
    ///
    /// Arguments
    /// -----------------
    /// * `grid`: the time grid the samples belong to.
    /// * `frame`: frame of every sample.
    /// * `positions`, `velocities`: one entry per grid epoch, in grid order.
    ///
    /// Return
    /// ----------
    /// * The trajectory, or [`ConjunctError::InvalidTimeGrid`] if the sample count differs from
    ///   the grid length.
    pub fn from_samples(
        grid: TimeGrid,
        frame: ReferenceFrame,
        positions: &[Vector3<f64>],
        velocities: &[Vector3<f64>],
    ) -> Result<Self, ConjunctError> {
        if positions.len() != grid.len() || velocities.len() != grid.len() {
            return Err(ConjunctError::InvalidTimeGrid(format!(
                "expected {} samples, got {} positions and {} velocities",
                grid.len(),
                positions.len(),
                velocities.len()
            )));
        }

        let states = grid
            .iter()
            .zip(positions.iter().zip(velocities))
            .map(|(epoch, (p, v))| StateVector::new(epoch, *p, *v, frame))
            .collect();

        Ok(Trajectory {
            grid,
            frame,
            states,
        })
    }

    pub fn grid(&self) -> &TimeGrid {
        &self.grid
    }

    pub fn frame(&self) -> ReferenceFrame {
        self.frame
    }

    pub fn states(&self) -> &[StateVector] {
        &self.states
    }

    pub fn len(&self) -> usize {
        self.states.len()
    }

    pub fn is_empty(&self) -> bool {
        self.states.is_empty()
    }

    pub fn positions(&self) -> impl Iterator<Item = &Vector3<f64>> {
        self.states.iter().map(|s| &s.position)
    }

    /// Distance of each sample from the center of the reference body.
    pub fn ranges(&self) -> Vec<Kilometer> {
        self.states.iter().map(StateVector::range).collect()
    }

    /// Index and value of the smallest range, first index on ties.
    ///
    /// `None` when every range is NaN.
    pub fn closest_approach(&self) -> Option<(usize, Kilometer)> {
        argmin(&self.ranges())
    }
}

/// Position and value of the minimum of a slice, first occurrence on ties.
///
/// NaN values are never selected. Returns `None` for an empty slice or a slice of NaN.
pub fn argmin(values: &[f64]) -> Option<(usize, f64)> {
    values
        .iter()
        .copied()
        .enumerate()
        .filter(|(_, v)| !v.is_nan())
        .fold(None, |best, (i, v)| match best {
            Some((_, b)) if b <= v => best,
            _ => Some((i, v)),
        })
}
