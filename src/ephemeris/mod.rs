//! # Ephemeris sources
//!
//! The target trajectory comes from an [`EphemerisSource`]: given a target identifier, a
//! [`TimeGrid`] and the body the positions are measured from, it returns a [`Trajectory`] with
//! exactly one state per grid epoch.
//!
//! A source whose data ends before the requested grid reports it with the structured
//! [`ConjunctError::EphemerisUnavailable`] error carrying the last covered epoch, so the search
//! controller can shorten its grid without looking at any message text.
//!
//! [`horizons::HorizonsClient`] implements the trait over the JPL Horizons API.
use crate::{conjunct_errors::ConjunctError, state::Trajectory, time::TimeGrid};

pub use crate::state::BodyRef;

pub mod horizons;

pub trait EphemerisSource {
    /// Fetch the state of `target` at every epoch of `grid`, relative to `center`.
    ///
    /// Return
    /// ----------
    /// * The trajectory, aligned one-to-one with `grid`.
    /// * [`ConjunctError::EphemerisUnavailable`] if the data ends before the end of the grid.
    /// * [`ConjunctError::EphemerisQueryError`] for any other failure (unknown or ambiguous target,
    ///   malformed answer).
    fn fetch(
        &self,
        target: &str,
        grid: &TimeGrid,
        center: BodyRef,
    ) -> Result<Trajectory, ConjunctError>;
}

impl<T: EphemerisSource + ?Sized> EphemerisSource for &T {
    fn fetch(
        &self,
        target: &str,
        grid: &TimeGrid,
        center: BodyRef,
    ) -> Result<Trajectory, ConjunctError> {
        (**self).fetch(target, grid, center)
    }
}
