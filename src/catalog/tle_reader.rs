//! # Two- and three-line element sets
//!
//! Ingestion of NORAD element sets into [`CatalogRecord`]s backed by the SGP4 theory
//! (`sgp4` crate). Both the bare two-line format and the three-line format, where a name line
//! precedes each pair (optionally prefixed with `0 `), are accepted in the same text.
//!
//! SGP4 uses the WGS-72 Earth model, so every record carries the WGS-72 equatorial radius and an
//! apogee altitude computed from the un-Kozai'd mean motion, the same semi-major axis SGP4 itself
//! initializes from.
//!
//! Malformed element sets are skipped and logged, the remaining ones are still returned.
use std::{fmt, sync::Arc};

use camino::Utf8Path;
use chrono::{Datelike, Timelike};
use hifitime::{Epoch, TimeScale, Unit};
use log::{debug, info, warn};
use nalgebra::Vector3;

use crate::{
    catalog::{
        CatalogContext, CatalogProvider, CatalogRecord, OrbitModel, PropagatedState,
        PropagationStatus,
    },
    constants::{DPI, MINUTES_PER_DAY, WGS72_J2, WGS72_MU, WGS72_RADIUS_KM},
    conjunct_errors::ConjunctError,
    state::ReferenceFrame,
};

/// SGP4 propagator of one element set. States are produced in TEME.
pub struct Sgp4Model {
    element_epoch: Epoch,
    constants: sgp4::Constants,
}

impl fmt::Debug for Sgp4Model {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Sgp4Model")
            .field("element_epoch", &self.element_epoch)
            .finish_non_exhaustive()
    }
}

impl Sgp4Model {
    pub fn from_elements(elements: &sgp4::Elements) -> Result<Self, ConjunctError> {
        let constants = sgp4::Constants::from_elements(elements).map_err(|e| {
            ConjunctError::TleParseError(format!("object {}: {e}", elements.norad_id))
        })?;
        Ok(Sgp4Model {
            element_epoch: element_epoch(elements)?,
            constants,
        })
    }

    /// Epoch of the element set.
    pub fn element_epoch(&self) -> Epoch {
        self.element_epoch
    }
}

impl OrbitModel for Sgp4Model {
    fn native_frame(&self) -> ReferenceFrame {
        ReferenceFrame::Teme
    }

    fn propagate(&self, epoch: Epoch) -> Result<PropagatedState, PropagationStatus> {
        let minutes = (epoch - self.element_epoch).to_unit(Unit::Minute);
        let prediction = self
            .constants
            .propagate(sgp4::MinutesSinceEpoch(minutes))
            .map_err(|_| PropagationStatus::ModelError)?;

        let position = Vector3::from(prediction.position);
        let velocity = Vector3::from(prediction.velocity);
        if position.iter().chain(velocity.iter()).all(|x| x.is_finite()) {
            Ok((position, velocity))
        } else {
            Err(PropagationStatus::NonFinite)
        }
    }
}

fn element_epoch(elements: &sgp4::Elements) -> Result<Epoch, ConjunctError> {
    let dt = elements.datetime;
    Epoch::maybe_from_gregorian(
        dt.year(),
        dt.month() as u8,
        dt.day() as u8,
        dt.hour() as u8,
        dt.minute() as u8,
        dt.second() as u8,
        dt.nanosecond(),
        TimeScale::UTC,
    )
    .map_err(|e| {
        ConjunctError::TleParseError(format!("object {}: invalid epoch {e}", elements.norad_id))
    })
}

/// Apogee altitude above the WGS-72 equatorial radius, as a multiple of that radius.
///
/// The semi-major axis is derived from the un-Kozai'd mean motion, following the SGP4
/// initialization.
pub fn apogee_altitude(elements: &sgp4::Elements) -> f64 {
    // Earth radii per minute
    let xke = 60.0 / (WGS72_RADIUS_KM.powi(3) / WGS72_MU).sqrt();
    let x2o3 = 2.0 / 3.0;

    let no_kozai = elements.mean_motion * DPI / MINUTES_PER_DAY;
    let e = elements.eccentricity;
    let cosio = elements.inclination.to_radians().cos();
    let omeosq = 1.0 - e * e;
    let rteosq = omeosq.sqrt();

    let ak = (xke / no_kozai).powf(x2o3);
    let d1 = 0.75 * WGS72_J2 * (3.0 * cosio * cosio - 1.0) / (rteosq * omeosq);
    let del = d1 / (ak * ak);
    let adel = ak * (1.0 - del * del - del * (1.0 / 3.0 + 134.0 * del * del / 81.0));
    let del = d1 / (adel * adel);
    let no_unkozai = no_kozai / (1.0 + del);

    let a = (xke / no_unkozai).powf(x2o3);
    a * (1.0 + e) - 1.0
}

/// Build a catalog record from one parsed element set.
pub fn record_from_elements(elements: &sgp4::Elements) -> Result<CatalogRecord, ConjunctError> {
    if !(elements.mean_motion > 0.0) {
        return Err(ConjunctError::TleParseError(format!(
            "object {}: non positive mean motion {}",
            elements.norad_id, elements.mean_motion
        )));
    }

    let model = Sgp4Model::from_elements(elements)?;
    let name = elements
        .object_name
        .clone()
        .unwrap_or_else(|| elements.norad_id.to_string());

    CatalogRecord::new(
        elements.norad_id,
        elements.international_designator.clone().unwrap_or_default(),
        name,
        WGS72_RADIUS_KM,
        apogee_altitude(elements),
        Arc::new(model),
    )
}

fn parse_pair(name: Option<String>, line1: &str, line2: &str) -> Result<CatalogRecord, ConjunctError> {
    let elements = sgp4::Elements::from_tle(name, line1.as_bytes(), line2.as_bytes())
        .map_err(|e| ConjunctError::TleParseError(e.to_string()))?;
    record_from_elements(&elements)
}

/// Parse a text made of two- or three-line element sets.
///
/// Arguments
/// -----------------
/// * `text`: element sets, one line per TLE line, blank lines ignored.
///
/// Return
/// ----------
/// * Every element set that could be parsed and initialized, in text order.
///   Rejected sets are logged with their line number.
pub fn parse_tle_text(text: &str) -> Vec<CatalogRecord> {
    let mut records = Vec::new();
    let mut rejected = 0_usize;

    let mut name: Option<String> = None;
    let mut line1: Option<(usize, &str)> = None;

    for (lineno, raw) in text.lines().enumerate() {
        let line = raw.trim_end();
        if line.trim().is_empty() {
            continue;
        }

        if line.starts_with("1 ") {
            line1 = Some((lineno + 1, line));
        } else if line.starts_with("2 ") {
            match line1.take() {
                Some((_, l1)) => match parse_pair(name.take(), l1, line) {
                    Ok(record) => records.push(record),
                    Err(e) => {
                        rejected += 1;
                        warn!("element set ending at line {}: {e}", lineno + 1);
                    }
                },
                None => {
                    rejected += 1;
                    warn!("line {}: second TLE line without first line", lineno + 1);
                }
            }
        } else {
            if let Some((n, _)) = line1.take() {
                rejected += 1;
                warn!("line {n}: first TLE line without second line");
            }
            let trimmed = line.trim();
            let stripped = trimmed.strip_prefix("0 ").unwrap_or(trimmed);
            name = Some(stripped.trim().to_string());
        }
    }

    if rejected > 0 {
        warn!("{rejected} element sets rejected");
    }
    debug!("{} element sets parsed", records.len());
    records
}

/// A fixed set of element sets served for any catalog context.
///
/// Historical snapshots are selected by whoever builds the catalog (one file per snapshot), so the
/// context is only logged.
#[derive(Debug, Clone)]
pub struct TleCatalog {
    records: Vec<CatalogRecord>,
}

impl TleCatalog {
    pub fn from_text(text: &str) -> Self {
        TleCatalog {
            records: parse_tle_text(text),
        }
    }

    /// Read a TLE file.
    ///
    /// Return
    /// ----------
    /// * The catalog, or [`ConjunctError::CatalogUnavailable`] if the file cannot be read.
    pub fn from_file(path: &Utf8Path) -> Result<Self, ConjunctError> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| ConjunctError::CatalogUnavailable(format!("{path}: {e}")))?;
        let catalog = TleCatalog::from_text(&text);
        info!("{} element sets loaded from {path}", catalog.len());
        Ok(catalog)
    }

    pub fn records(&self) -> &[CatalogRecord] {
        &self.records
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}

impl CatalogProvider for TleCatalog {
    fn fetch(&self, context: &CatalogContext) -> Result<Vec<CatalogRecord>, ConjunctError> {
        debug!("serving {} element sets for {context:?}", self.records.len());
        Ok(self.records.clone())
    }
}

#[cfg(test)]
mod tle_reader_test {
    use super::*;
    use approx::assert_relative_eq;

    const ISS: &str = "ISS (ZARYA)
1 25544U 98067A   20194.88612269 -.00002218  00000-0 -31515-4 0  9992
2 25544  51.6461 221.2784 0001413  89.1723 280.4612 15.49507896236008
";

    #[test]
    fn test_parse_three_line_set() {
        let records = parse_tle_text(ISS);
        assert_eq!(records.len(), 1);

        let iss = &records[0];
        assert_eq!(iss.catalog_number(), 25544);
        assert_eq!(iss.name(), "ISS (ZARYA)");
        assert!(iss.designator().ends_with("067A"));
        assert_eq!(iss.equatorial_radius(), WGS72_RADIUS_KM);
        assert!(!iss.is_debris());

        // ~420 km altitude, nearly circular
        assert!(iss.apogee_altitude() > 0.06 && iss.apogee_altitude() < 0.07);
    }

    #[test]
    fn test_name_prefix_and_two_line_sets() {
        let text = format!(
            "0 ISS DEB\n{}\n{}\n",
            ISS.lines().nth(1).unwrap(),
            ISS.lines().nth(2).unwrap()
        );
        let records = parse_tle_text(&text);
        assert_eq!(records[0].name(), "ISS DEB");
        assert!(records[0].is_debris());

        let bare: String = ISS.lines().skip(1).collect::<Vec<_>>().join("\n");
        let records = parse_tle_text(&bare);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].catalog_number(), 25544);
    }

    #[test]
    fn test_malformed_sets_skipped() {
        let text = format!(
            "BROKEN\n1 99999U garbage\n2 99999 garbage\n{ISS}\nORPHAN\n2 00001 orphan line\n"
        );
        let records = parse_tle_text(&text);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].catalog_number(), 25544);
    }

    #[test]
    fn test_sgp4_propagation() {
        let records = parse_tle_text(ISS);
        let model = records[0].model();
        assert_eq!(model.native_frame(), ReferenceFrame::Teme);

        let epoch = Epoch::from_gregorian_utc_hms(2020, 7, 12, 21, 16, 1);
        let (position, velocity) = model.propagate(epoch).unwrap();
        assert!(position.norm() > 6_600.0 && position.norm() < 6_900.0);
        assert_relative_eq!(velocity.norm(), 7.66, epsilon = 0.05);

        // an hour later the object is still in orbit
        let (position, _) = model.propagate(epoch + Unit::Hour * 1_i64).unwrap();
        assert!(position.norm() > 6_600.0 && position.norm() < 6_900.0);
    }

    #[test]
    fn test_catalog_provider() {
        let catalog = TleCatalog::from_text(ISS);
        assert_eq!(catalog.len(), 1);
        let fetched = catalog.fetch(&CatalogContext::Live).unwrap();
        assert_eq!(fetched[0].catalog_number(), 25544);

        assert!(matches!(
            TleCatalog::from_file(Utf8Path::new("/nonexistent/catalog.tle")),
            Err(ConjunctError::CatalogUnavailable(_))
        ));
    }
}
