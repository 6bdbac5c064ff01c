//! # JPL Horizons ephemeris source
//!
//! [`HorizonsClient`] queries the Horizons file API for geocentric state vectors of a target
//! (`TABLE_TYPE=VECTORS`, ICRF axes, km and km/s) sampled on a [`TimeGrid`].
//!
//! ## Query
//! -----------------
//! * Grids with more than one epoch are requested as a start/stop interval split into
//!   `count - 1` equal steps (a unit-less `STEP_SIZE`), which reproduces the grid epochs exactly.
//! * A one-epoch grid is requested with `TLIST`.
//! * Epochs are sent as UTC Julian days (`TIME_TYPE=UT`).
//! * The target name is suffixed with `;` so Horizons searches the small-body database.
//!
//! ## Answer
//! -----------------
//! The CSV block between `$$SOE` and `$$EOE` is extracted with a regex and deserialized with
//! `csv` + `serde`. When Horizons answers that there is
//! `No ephemeris for target "…" after A.D. 2019-JUN-22 21:27:09.1844 TD`, the cutoff is returned as
//! a TDB epoch in [`ConjunctError::EphemerisUnavailable`].
use std::time::Duration;

use hifitime::{Epoch, TimeScale};
use itertools::Itertools;
use log::debug;
use nalgebra::Vector3;
use regex::Regex;
use serde::Deserialize;
use ureq::Agent;

use crate::{
    conjunct_errors::ConjunctError,
    ephemeris::{BodyRef, EphemerisSource},
    state::{ReferenceFrame, Trajectory},
    time::{parse_horizons_calendar, TimeGrid},
};

pub const HORIZONS_FILE_API: &str = "https://ssd.jpl.nasa.gov/api/horizons_file.api";

/// Maximum difference allowed between the first Horizons epoch and the grid start (days).
const EPOCH_TOLERANCE_DAYS: f64 = 1e-4;

/// One row of a Horizons CSV vector table (`VEC_TABLE=2`).
#[derive(Debug, Deserialize, PartialEq)]
struct VectorRow {
    jd: f64,
    date: String,
    x: f64,
    y: f64,
    z: f64,
    vx: f64,
    vy: f64,
    vz: f64,
}

#[derive(Debug, Clone)]
pub struct HorizonsClient {
    agent: Agent,
    url: String,
}

#[derive(Debug, Clone)]
pub struct HorizonsClientBuilder {
    url: String,
    timeout: Duration,
}

impl Default for HorizonsClientBuilder {
    fn default() -> Self {
        HorizonsClientBuilder {
            url: HORIZONS_FILE_API.to_string(),
            timeout: Duration::from_secs(60),
        }
    }
}

impl HorizonsClientBuilder {
    /// Horizons file API endpoint.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Global timeout of one request.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn build(self) -> HorizonsClient {
        // Horizons reports query errors in the body, sometimes with an error status
        let config = Agent::config_builder()
            .timeout_global(Some(self.timeout))
            .http_status_as_error(false)
            .build();

        HorizonsClient {
            agent: config.into(),
            url: self.url,
        }
    }
}

impl Default for HorizonsClient {
    fn default() -> Self {
        HorizonsClient::builder().build()
    }
}

impl HorizonsClient {
    pub fn builder() -> HorizonsClientBuilder {
        HorizonsClientBuilder::default()
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn post_query(&self, query: &str) -> Result<(u16, String), ConjunctError> {
        debug!("Horizons request to {}", self.url);
        let mut response = self
            .agent
            .post(self.url.as_str())
            .send_form([("format", "text"), ("input", query)])?;
        let status = response.status().as_u16();
        let body = response.body_mut().read_to_string()?;
        Ok((status, body))
    }
}

impl EphemerisSource for HorizonsClient {
    fn fetch(
        &self,
        target: &str,
        grid: &TimeGrid,
        center: BodyRef,
    ) -> Result<Trajectory, ConjunctError> {
        let query = build_query(target, grid, center);
        let (status, body) = self.post_query(&query)?;

        match parse_vectors(target, grid, &body) {
            Err(ConjunctError::EphemerisQueryError(msg)) if !(200..300).contains(&status) => Err(
                ConjunctError::EphemerisQueryError(format!("HTTP status {status}: {msg}")),
            ),
            result => result,
        }
    }
}

fn command(target: &str) -> String {
    let target = target.trim();
    if target.ends_with(';') {
        target.to_string()
    } else {
        format!("{target};")
    }
}

/// Build the Horizons batch input for `target` over `grid`.
pub fn build_query(target: &str, grid: &TimeGrid, center: BodyRef) -> String {
    let times = if grid.len() == 1 {
        format!(
            "TLIST_TYPE=JD\nTLIST='{:.9}'\n",
            grid.start().to_jde_utc_days()
        )
    } else {
        format!(
            "START_TIME='JD {:.9}'\nSTOP_TIME='JD {:.9}'\nSTEP_SIZE='{}'\n",
            grid.start().to_jde_utc_days(),
            grid.end().to_jde_utc_days(),
            grid.len() - 1
        )
    };

    format!(
        "!$$SOF
COMMAND='{}'
OBJ_DATA='NO'
MAKE_EPHEM='YES'
TABLE_TYPE='VECTORS'
CENTER='{}'
REF_SYSTEM=ICRF
REF_PLANE=FRAME
OUT_UNITS=KM-S
VEC_TABLE=2
VEC_LABELS=NO
CSV_FORMAT=YES
TIME_TYPE=UT
{}",
        command(target),
        center.horizons_center(),
        times
    )
}

/// Detect the "no ephemeris after" message of Horizons.
fn ephemeris_cutoff(target: &str, answer: &str) -> Option<ConjunctError> {
    let cutoff_regex = Regex::new(
        r#"No ephemeris for target "?([^"\n]*?)"? after A\.D\. (\d{4}-[A-Za-z]{3}-\d{2} \d{2}:\d{2}(?::\d{2}(?:\.\d*)?)?) TD"#,
    )
    .ok()?;
    let captures = cutoff_regex.captures(answer)?;
    let cutoff = parse_horizons_calendar(captures.get(2)?.as_str(), TimeScale::TDB)?;
    let name = captures
        .get(1)
        .map(|m| m.as_str().trim())
        .filter(|s| !s.is_empty())
        .unwrap_or(target);

    Some(ConjunctError::EphemerisUnavailable {
        target: name.to_string(),
        cutoff,
    })
}

fn query_error(target: &str, answer: &str) -> ConjunctError {
    let summary = answer
        .lines()
        .map(str::trim)
        .filter(|l| !l.is_empty() && !l.starts_with('*'))
        .take(6)
        .join(" | ");
    ConjunctError::EphemerisQueryError(format!("target {target}: {summary}"))
}

/// Parse a Horizons vector table answer into a trajectory on `grid`.
///
/// Arguments
/// -----------------
/// * `target`: target identifier, used in error messages.
/// * `grid`: the grid the query was built from.
/// * `answer`: raw text answer of the Horizons API.
///
/// Return
/// ----------
/// * The trajectory in [`ReferenceFrame::Gcrs`], one state per grid epoch.
/// * [`ConjunctError::EphemerisUnavailable`] if Horizons reports a coverage cutoff.
/// * [`ConjunctError::EphemerisQueryError`] if the answer has no data block, a malformed row,
///   a row count different from the grid length or epochs that do not match the grid.
pub fn parse_vectors(
    target: &str,
    grid: &TimeGrid,
    answer: &str,
) -> Result<Trajectory, ConjunctError> {
    let data_regex = Regex::new(r"(?s)\$\$SOE\s*\n(.*?)\$\$EOE")
        .map_err(|e| ConjunctError::EphemerisQueryError(e.to_string()))?;

    let Some(block) = data_regex.captures(answer).and_then(|c| c.get(1)) else {
        return Err(ephemeris_cutoff(target, answer).unwrap_or_else(|| query_error(target, answer)));
    };

    // the rows end with a ',' which the extra `end` column absorbs
    let data = format!("jd,date,x,y,z,vx,vy,vz,end\n{}", block.as_str().trim());
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(data.as_bytes());

    let rows: Vec<VectorRow> = csv_reader
        .deserialize::<VectorRow>()
        .collect::<Result<_, _>>()
        .map_err(|e| {
            ConjunctError::EphemerisQueryError(format!("target {target}: malformed vector row: {e}"))
        })?;

    if rows.len() != grid.len() {
        return Err(ConjunctError::EphemerisQueryError(format!(
            "target {target}: {} rows returned for a grid of {} epochs",
            rows.len(),
            grid.len()
        )));
    }

    let expected_jd = grid.start().to_jde_utc_days();
    if let Some(first) = rows.first() {
        if (first.jd - expected_jd).abs() > EPOCH_TOLERANCE_DAYS {
            return Err(ConjunctError::EphemerisQueryError(format!(
                "target {target}: first epoch JD {} ({}) does not match grid start JD {expected_jd}",
                first.jd, first.date
            )));
        }
    }

    let positions: Vec<Vector3<f64>> = rows
        .iter()
        .map(|r| Vector3::new(r.x, r.y, r.z))
        .collect();
    let velocities: Vec<Vector3<f64>> = rows
        .iter()
        .map(|r| Vector3::new(r.vx, r.vy, r.vz))
        .collect();

    Trajectory::from_samples(*grid, ReferenceFrame::Gcrs, &positions, &velocities)
}

/// Epoch of the last data point available for a target, if `answer` reports one.
pub fn coverage_cutoff(answer: &str) -> Option<Epoch> {
    match ephemeris_cutoff("", answer)? {
        ConjunctError::EphemerisUnavailable { cutoff, .. } => Some(cutoff),
        _ => None,
    }
}

#[cfg(test)]
mod horizons_test {
    use super::*;
    use approx::assert_relative_eq;
    use hifitime::Unit;

    fn grid(count: usize) -> TimeGrid {
        TimeGrid::new(
            Epoch::from_gregorian_utc_hms(2023, 1, 26, 0, 0, 0),
            Unit::Minute * 10_i64,
            count,
        )
        .unwrap()
    }

    const ANSWER: &str = "
*******************************************************************************
Ephemeris / API_USER Sat Jan 28 10:00:00 2023 Pasadena, USA      / Horizons
*******************************************************************************
Target body name: (2023 BU)                       {source: JPL#14}
Center body name: Earth (399)                     {source: DE441}
Reference frame : ICRF
*******************************************************************************
            JDUT,            Calendar Date (UT),                      X,                      Y,                      Z,                     VX,                     VY,                     VZ,
**************************************************************************************************************************
$$SOE
2459970.500000000, A.D. 2023-Jan-26 00:00:00.0000,  1.000000000000000E+05,  2.000000000000000E+04, -3.000000000000000E+03,  1.000000000000000E+00, -2.000000000000000E+00,  3.000000000000000E-01,
2459970.506944444, A.D. 2023-Jan-26 00:10:00.0000,  9.900000000000000E+04,  2.100000000000000E+04, -3.100000000000000E+03,  1.100000000000000E+00, -2.100000000000000E+00,  3.100000000000000E-01,
2459970.513888889, A.D. 2023-Jan-26 00:20:00.0000,  9.800000000000000E+04,  2.200000000000000E+04, -3.200000000000000E+03,  1.200000000000000E+00, -2.200000000000000E+00,  3.200000000000000E-01,
$$EOE
**************************************************************************************************************************
";

    #[test]
    fn test_build_query() {
        let query = build_query("2023 BU", &grid(577), BodyRef::Earth);
        assert!(query.contains("COMMAND='2023 BU;'"));
        assert!(query.contains("CENTER='500@399'"));
        assert!(query.contains("OUT_UNITS=KM-S"));
        assert!(query.contains("TIME_TYPE=UT"));
        assert!(query.contains("START_TIME='JD 2459970.500000000'"));
        assert!(query.contains("STEP_SIZE='576'"));

        let query = build_query("2019 MO;", &grid(1), BodyRef::Earth);
        assert!(query.contains("COMMAND='2019 MO;'"));
        assert!(query.contains("TLIST='2459970.500000000'"));
        assert!(!query.contains("STEP_SIZE"));
    }

    #[test]
    fn test_parse_vectors() {
        let traj = parse_vectors("2023 BU", &grid(3), ANSWER).unwrap();
        assert_eq!(traj.len(), 3);
        assert_eq!(traj.frame(), ReferenceFrame::Gcrs);

        let last = traj.states()[2];
        assert_eq!(last.epoch, grid(3).epoch(2));
        assert_relative_eq!(last.position, Vector3::new(98_000.0, 22_000.0, -3_200.0));
        assert_relative_eq!(last.velocity, Vector3::new(1.2, -2.2, 0.32));
    }

    #[test]
    fn test_row_count_mismatch() {
        assert!(matches!(
            parse_vectors("2023 BU", &grid(4), ANSWER),
            Err(ConjunctError::EphemerisQueryError(_))
        ));
    }

    #[test]
    fn test_epoch_mismatch() {
        let shifted = TimeGrid::new(
            Epoch::from_gregorian_utc_hms(2023, 1, 26, 1, 0, 0),
            Unit::Minute * 10_i64,
            3,
        )
        .unwrap();
        assert!(matches!(
            parse_vectors("2023 BU", &shifted, ANSWER),
            Err(ConjunctError::EphemerisQueryError(_))
        ));
    }

    #[test]
    fn test_coverage_cutoff() {
        let answer = "
API VERSION: 1.2
API SOURCE: NASA/JPL Horizons API

No ephemeris for target \"(2019 MO)\" after A.D. 2019-JUN-22 21:27:09.1844 TD
";
        let err = parse_vectors("2019 MO", &grid(3), answer).unwrap_err();
        assert_eq!(
            err,
            ConjunctError::EphemerisUnavailable {
                target: "(2019 MO)".into(),
                cutoff: Epoch::from_gregorian(2019, 6, 22, 21, 27, 9, 184_400_000, TimeScale::TDB),
            }
        );
        assert!(coverage_cutoff(answer).is_some());
    }

    #[test]
    fn test_unknown_target() {
        let answer = "
API VERSION: 1.2
API SOURCE: NASA/JPL Horizons API

No matches found.
";
        assert!(matches!(
            parse_vectors("2999 ZZ", &grid(3), answer),
            Err(ConjunctError::EphemerisQueryError(_))
        ));
        assert!(coverage_cutoff(answer).is_none());
    }

    #[test]
    #[ignore]
    fn test_horizons_request() {
        let client = HorizonsClient::default();
        let traj = client.fetch("2023 BU", &grid(3), BodyRef::Earth).unwrap();
        assert_eq!(traj.len(), 3);
        // 2023 BU passed the Earth on 2023-01-27
        assert!(traj.ranges()[0] < 1_000_000.0);
    }
}
