//! # Catalog of tracked objects
//!
//! A [`CatalogRecord`] is the typed view of one element set: NORAD number, international
//! designator, display name, the equatorial radius of the model Earth, the apogee altitude as a
//! multiple of that radius, and an [`OrbitModel`] able to produce state vectors at any epoch.
//! Records are validated once when they are built, so the rest of the search never looks at loose
//! fields.
//!
//! Records come from a [`CatalogProvider`] given a [`CatalogContext`]: either the live catalog or
//! a snapshot as of a given epoch. Which one a search asks for is decided by
//! [`CatalogContext::for_encounter`].
//!
//! ## See also
//! ------------
//! * [`tle_reader`] – ingestion of two- and three-line element sets through SGP4.
//! * [`filter`] – apogee versus miss distance pre-filter.
use std::{fmt, sync::Arc};

use ahash::AHashSet;
use hifitime::{Duration, Epoch};
use log::warn;
use nalgebra::Vector3;

use crate::{
    constants::{CatalogNumber, Kilometer},
    conjunct_errors::ConjunctError,
    state::ReferenceFrame,
};

pub mod filter;
pub mod tle_reader;

/// Outcome of propagating one record at one epoch.
///
/// Anything but [`PropagationStatus::Valid`] marks the sample invalid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PropagationStatus {
    Valid = 0,
    /// The orbit model reported an error (decayed orbit, eccentricity out of range, ...).
    ModelError = 1,
    /// The model returned a non finite position or velocity.
    NonFinite = 2,
}

impl PropagationStatus {
    pub fn code(self) -> u8 {
        self as u8
    }

    pub fn is_valid(self) -> bool {
        self == PropagationStatus::Valid
    }
}

/// Position (km) and velocity (km/s) in the model's native frame.
pub type PropagatedState = (Vector3<f64>, Vector3<f64>);

/// Capability of a catalog record to produce state vectors.
pub trait OrbitModel: fmt::Debug + Send + Sync {
    /// Frame of the state vectors returned by [`OrbitModel::propagate`].
    fn native_frame(&self) -> ReferenceFrame;

    /// State of the object at `epoch`.
    fn propagate(&self, epoch: Epoch) -> Result<PropagatedState, PropagationStatus>;
}

#[derive(Debug, Clone)]
pub struct CatalogRecord {
    catalog_number: CatalogNumber,
    designator: String,
    name: String,
    equatorial_radius: Kilometer,
    apogee_altitude: f64,
    model: Arc<dyn OrbitModel>,
}

impl CatalogRecord {
    /// Build and validate a catalog record.
    ///
    /// Arguments
    /// -----------------
    /// * `catalog_number`: NORAD catalog number, unique within a catalog.
    /// * `designator`: international designator (may be empty).
    /// * `name`: display name, surrounding whitespace is trimmed.
    /// * `equatorial_radius`: equatorial radius of the reference body used by the model (km).
    /// * `apogee_altitude`: apogee altitude above that radius, as a multiple of it.
    /// * `model`: propagation capability of the object.
    ///
    /// Return
    /// ----------
    /// * The record, or [`ConjunctError::InvalidCatalogRecord`] if the radius is not a strictly
    ///   positive finite number or if the apogee lies inside the body center (`apogee_altitude <= -1`).
    pub fn new(
        catalog_number: CatalogNumber,
        designator: impl Into<String>,
        name: impl Into<String>,
        equatorial_radius: Kilometer,
        apogee_altitude: f64,
        model: Arc<dyn OrbitModel>,
    ) -> Result<Self, ConjunctError> {
        if !(equatorial_radius.is_finite() && equatorial_radius > 0.0) {
            return Err(ConjunctError::InvalidCatalogRecord(format!(
                "object {catalog_number}: equatorial radius must be positive, got {equatorial_radius}"
            )));
        }
        if !(apogee_altitude.is_finite() && apogee_altitude > -1.0) {
            return Err(ConjunctError::InvalidCatalogRecord(format!(
                "object {catalog_number}: invalid apogee altitude {apogee_altitude}"
            )));
        }

        Ok(CatalogRecord {
            catalog_number,
            designator: designator.into().trim().to_string(),
            name: name.into().trim().to_string(),
            equatorial_radius,
            apogee_altitude,
            model,
        })
    }

    pub fn catalog_number(&self) -> CatalogNumber {
        self.catalog_number
    }

    pub fn designator(&self) -> &str {
        &self.designator
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn equatorial_radius(&self) -> Kilometer {
        self.equatorial_radius
    }

    pub fn apogee_altitude(&self) -> f64 {
        self.apogee_altitude
    }

    pub fn model(&self) -> &dyn OrbitModel {
        self.model.as_ref()
    }

    /// Farthest distance of the object from the center of the reference body.
    pub fn max_reach(&self) -> Kilometer {
        (1.0 + self.apogee_altitude) * self.equatorial_radius
    }

    /// Name based classification of debris, rocket bodies and kick motors.
    pub fn is_debris(&self) -> bool {
        let name = self.name.as_str();
        name.ends_with("DEB")
            || name.ends_with("AKM")
            || name.contains(" DEB ")
            || name.contains("R/B")
            || name.contains("PKM")
            || name.starts_with("WESTFORD NEEDLES")
            || name == "TBA - TO BE ASSIGNED"
    }
}

impl fmt::Display for CatalogRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:>9} {:10} {}",
            self.catalog_number, self.designator, self.name
        )
    }
}

/// Temporal context of a catalog request.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum CatalogContext {
    /// The latest element sets.
    Live,
    /// A snapshot of the catalog as of the given epoch.
    AsOf(Epoch),
}

impl CatalogContext {
    /// Choose the catalog for an encounter at `tca`.
    ///
    /// An encounter within `live_window` of `now` is screened against the live catalog. Older or
    /// farther encounters use the snapshot taken `archive_offset` after the encounter, whose
    /// elements were fitted with observations made after it.
    pub fn for_encounter(
        tca: Epoch,
        now: Epoch,
        live_window: Duration,
        archive_offset: Duration,
    ) -> Self {
        if (tca - now).abs() < live_window {
            CatalogContext::Live
        } else {
            CatalogContext::AsOf(tca + archive_offset)
        }
    }
}

/// Source of catalog records.
pub trait CatalogProvider {
    /// Fetch every record available in `context`.
    ///
    /// Failures are reported as [`ConjunctError::CatalogUnavailable`] and abort the search.
    fn fetch(&self, context: &CatalogContext) -> Result<Vec<CatalogRecord>, ConjunctError>;
}

/// Drop records whose catalog number was already seen, keeping the first occurrence.
pub fn dedup_catalog(records: Vec<CatalogRecord>) -> Vec<CatalogRecord> {
    let mut seen = AHashSet::with_capacity(records.len());
    let total = records.len();
    let unique: Vec<CatalogRecord> = records
        .into_iter()
        .filter(|r| seen.insert(r.catalog_number))
        .collect();

    if unique.len() != total {
        warn!(
            "{} duplicated catalog numbers discarded",
            total - unique.len()
        );
    }
    unique
}
