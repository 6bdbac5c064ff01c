//! # ESA close approach lists
//!
//! The ESA NEO Coordination Centre publishes pipe-separated lists of upcoming and recent close
//! approaches and of past impactors. This module turns them into [`CloseApproachEvent`]s ready
//! to be screened: designation normalized to the Horizons form, nominal encounter epoch,
//! published miss distance and the [`SearchMode`] suited to the event.
use std::{fmt, str::FromStr, time::Duration};

use hifitime::Epoch;
use log::{debug, info};
use ureq::Agent;

use crate::{
    constants::Kilometer, conjunct_errors::ConjunctError, search::SearchMode, time::parse_iso_utc,
};

const ESA_URL_BASE: &str = "https://neo.ssa.esa.int/PSDB-portlet/download?file=";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EsaListKind {
    Upcoming,
    Recent,
    Impacted,
}

impl EsaListKind {
    pub fn url(&self) -> String {
        let file = match self {
            EsaListKind::Upcoming => "esa_upcoming_close_app",
            EsaListKind::Recent => "esa_recent_close_app",
            EsaListKind::Impacted => "past_impactors_list",
        };
        format!("{ESA_URL_BASE}{file}")
    }

    /// Impactors have no data after the encounter, the window ends on it.
    pub fn search_mode(&self) -> SearchMode {
        match self {
            EsaListKind::Impacted => SearchMode::End,
            EsaListKind::Upcoming | EsaListKind::Recent => SearchMode::Mid,
        }
    }

    fn header_lines(&self) -> usize {
        match self {
            EsaListKind::Impacted => 2,
            EsaListKind::Upcoming | EsaListKind::Recent => 4,
        }
    }
}

impl FromStr for EsaListKind {
    type Err = ConjunctError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "upcoming" => Ok(EsaListKind::Upcoming),
            "recent" => Ok(EsaListKind::Recent),
            "impacted" => Ok(EsaListKind::Impacted),
            _ => Err(ConjunctError::EsaParseError(format!(
                "invalid list kind: {s}"
            ))),
        }
    }
}

impl fmt::Display for EsaListKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EsaListKind::Upcoming => write!(f, "upcoming"),
            EsaListKind::Recent => write!(f, "recent"),
            EsaListKind::Impacted => write!(f, "impacted"),
        }
    }
}

/// One entry of an ESA list.
#[derive(Debug, Clone, PartialEq)]
pub struct CloseApproachEvent {
    /// Designation in the Horizons form (`2023 BU`).
    pub designation: String,
    pub tca: Epoch,
    /// Published miss distance, zero for impactors (km).
    pub miss_distance: Kilometer,
    pub kind: EsaListKind,
}

impl CloseApproachEvent {
    pub fn search_mode(&self) -> SearchMode {
        self.kind.search_mode()
    }

    /// `true` if the encounter happens before `now + horizon`.
    pub fn is_due(&self, now: Epoch, horizon: hifitime::Duration) -> bool {
        self.tca - now <= horizon
    }
}

/// Keep the events worth screening at `now`.
///
/// Upcoming encounters farther than `horizon` are skipped, their catalog does not exist yet.
/// Recent encounters and impactors are always kept. List order is preserved.
pub fn due_events(
    events: Vec<CloseApproachEvent>,
    now: Epoch,
    horizon: hifitime::Duration,
) -> Vec<CloseApproachEvent> {
    events
        .into_iter()
        .filter(|event| {
            let keep = event.kind != EsaListKind::Upcoming || event.is_due(now, horizon);
            if !keep {
                info!(
                    "{} skipped, encounter on {} is more than {horizon} ahead",
                    event.designation, event.tca
                );
            }
            keep
        })
        .collect()
}

/// Convert a packed ESA provisional designation to the Horizons form.
///
/// `2023BU` becomes `2023 BU`, `2023BU23` becomes `2023 BU23`. Numbered objects and any other
/// name are returned unchanged.
pub fn normalize_esa_name(esa_name: &str) -> String {
    let name = esa_name.trim();
    let bytes = name.as_bytes();
    let packed = bytes.len() >= 6
        && bytes[..4].iter().all(u8::is_ascii_digit)
        && bytes[4..6].iter().all(u8::is_ascii_alphabetic);

    if packed {
        format!("{} {}", &name[..4], &name[4..])
    } else {
        name.to_string()
    }
}

fn field<'a>(fields: &[&'a str], index: usize, lineno: usize) -> Result<&'a str, ConjunctError> {
    fields.get(index).map(|f| f.trim()).ok_or_else(|| {
        ConjunctError::EsaParseError(format!("line {lineno}: missing column {}", index + 1))
    })
}

fn parse_date(date: &str, lineno: usize) -> Result<Epoch, ConjunctError> {
    parse_iso_utc(date)
        .ok_or_else(|| ConjunctError::EsaParseError(format!("line {lineno}: invalid date {date}")))
}

/// Parse an ESA close approach list.
///
/// Arguments
/// -----------------
/// * `text`: content of the list.
/// * `kind`: which list the text comes from.
/// * `threshold`: only close approaches with a miss distance strictly below this value are kept
///   (km). Ignored for impactors.
///
/// Return
/// ----------
/// * The events, in list order, or [`ConjunctError::EsaParseError`] on a malformed row.
pub fn parse_close_approach_list(
    text: &str,
    kind: EsaListKind,
    threshold: Kilometer,
) -> Result<Vec<CloseApproachEvent>, ConjunctError> {
    let mut events = Vec::new();

    for (i, line) in text.lines().enumerate().skip(kind.header_lines()) {
        let lineno = i + 1;
        if line.trim().is_empty() {
            continue;
        }
        let fields: Vec<&str> = line.split('|').collect();

        let event = match kind {
            EsaListKind::Upcoming | EsaListKind::Recent => {
                let name: String = field(&fields, 0, lineno)?.chars().take(10).collect();
                let miss = field(&fields, 2, lineno)?;
                let miss_distance = miss.parse::<f64>().map_err(|_| {
                    ConjunctError::EsaParseError(format!("line {lineno}: invalid miss distance {miss}"))
                })?;
                if !(miss_distance < threshold) {
                    continue;
                }
                CloseApproachEvent {
                    designation: normalize_esa_name(&name),
                    tca: parse_date(field(&fields, 1, lineno)?, lineno)?,
                    miss_distance,
                    kind,
                }
            }
            EsaListKind::Impacted => CloseApproachEvent {
                designation: normalize_esa_name(field(&fields, 0, lineno)?),
                tca: parse_date(field(&fields, 2, lineno)?, lineno)?,
                miss_distance: 0.0,
                kind,
            },
        };
        events.push(event);
    }

    debug!("{} {kind} events parsed", events.len());
    Ok(events)
}

/// Download and parse an ESA list.
pub fn fetch_close_approach_list(
    agent: &Agent,
    kind: EsaListKind,
    threshold: Kilometer,
) -> Result<Vec<CloseApproachEvent>, ConjunctError> {
    let url = kind.url();
    debug!("ESA request to {url}");
    let text = agent
        .get(url.as_str())
        .call()?
        .body_mut()
        .read_to_string()?;
    parse_close_approach_list(&text, kind, threshold)
}

/// HTTP agent with the timeout used for the ESA lists.
pub fn default_agent() -> Agent {
    Agent::config_builder()
        .timeout_global(Some(Duration::from_secs(10)))
        .build()
        .into()
}

#[cfg(test)]
mod esa_test {
    use super::*;
    use crate::constants::GEO_RADIUS_KM;
    use hifitime::Unit;

    const UPCOMING: &str = "Close approaches list
Last update: 2023-01-27 10:00 UTC

Object designation  |Date (UTC)       |Miss Distance km|Miss Distance au|Miss Distance LD|Diameter m|H   |Max Bright|Rel. vel km/s|CP|
2023BU              |2023-01-27 00:29 |            9966|      0.00006662|           0.026|         6|29.7|      10.5|        9.27|  |
2023AV              |2023-01-31 15:48 |          542330|      0.00362520|           1.411|        12|28.0|      16.8|        7.40|  |
2012DA14            |2013-02-15 19:25 |           34100|      0.00022800|           0.089|        40|24.0|       7.2|        7.80|  |
";

    const IMPACTED: &str = "Past impactors
Designation|Diameter|Impact date (UTC)|
2008TC3|4|2008-10-07 02:46|
2019MO|5|2019-06-22 21:25|
";

    #[test]
    fn test_normalize_esa_name() {
        assert_eq!(normalize_esa_name("2023BU"), "2023 BU");
        assert_eq!(normalize_esa_name("2023BU23"), "2023 BU23");
        for numbered in ["1", "12", "123", "12345", "123456", "1234567"] {
            assert_eq!(normalize_esa_name(numbered), numbered);
        }
    }

    #[test]
    fn test_parse_upcoming() {
        let threshold = GEO_RADIUS_KM * 1.1;
        let events = parse_close_approach_list(UPCOMING, EsaListKind::Upcoming, threshold).unwrap();
        assert_eq!(events.len(), 2);

        assert_eq!(events[0].designation, "2023 BU");
        assert_eq!(
            events[0].tca,
            Epoch::from_gregorian_utc_hms(2023, 1, 27, 0, 29, 0)
        );
        assert_eq!(events[0].miss_distance, 9966.0);
        assert_eq!(events[0].search_mode(), SearchMode::Mid);

        assert_eq!(events[1].designation, "2012 DA14");
    }

    #[test]
    fn test_parse_impacted() {
        let events = parse_close_approach_list(IMPACTED, EsaListKind::Impacted, 0.0).unwrap();
        assert_eq!(events.len(), 2);
        assert_eq!(events[1].designation, "2019 MO");
        assert_eq!(
            events[1].tca,
            Epoch::from_gregorian_utc_hms(2019, 6, 22, 21, 25, 0)
        );
        assert_eq!(events[1].miss_distance, 0.0);
        assert_eq!(events[1].search_mode(), SearchMode::End);
    }

    #[test]
    fn test_malformed_rows() {
        let text = "a\nb\nc\nd\n2023BU|2023-01-27 00:29|not a number|\n";
        assert!(matches!(
            parse_close_approach_list(text, EsaListKind::Recent, 1e6),
            Err(ConjunctError::EsaParseError(_))
        ));

        let text = "a\nb\n2008TC3|4\n";
        assert!(matches!(
            parse_close_approach_list(text, EsaListKind::Impacted, 0.0),
            Err(ConjunctError::EsaParseError(_))
        ));
    }

    #[test]
    fn test_list_kind() {
        assert_eq!("Impacted".parse::<EsaListKind>().unwrap(), EsaListKind::Impacted);
        assert!("future".parse::<EsaListKind>().is_err());
        assert!(EsaListKind::Recent.url().ends_with("esa_recent_close_app"));
    }

    #[test]
    fn test_is_due() {
        let event = CloseApproachEvent {
            designation: "2023 BU".into(),
            tca: Epoch::from_gregorian_utc_hms(2023, 1, 27, 0, 29, 0),
            miss_distance: 9966.0,
            kind: EsaListKind::Upcoming,
        };
        let now = Epoch::from_gregorian_utc_hms(2023, 1, 15, 0, 0, 0);
        assert!(!event.is_due(now, Unit::Day * 7_i64));
        assert!(event.is_due(now, Unit::Day * 14_i64));
    }

    #[test]
    fn test_due_events() {
        let now = Epoch::from_gregorian_utc_hms(2023, 1, 25, 0, 0, 0);
        let events =
            parse_close_approach_list(UPCOMING, EsaListKind::Upcoming, GEO_RADIUS_KM * 1.1).unwrap();
        let mut far = events[0].clone();
        far.designation = "2023 ZZ".into();
        far.tca = now + Unit::Day * 30_i64;
        let recent = CloseApproachEvent {
            kind: EsaListKind::Recent,
            ..far.clone()
        };

        let due = due_events(
            vec![events[0].clone(), far, events[1].clone(), recent],
            now,
            Unit::Day * 7_i64,
        );
        let names: Vec<_> = due.iter().map(|e| (e.designation.as_str(), e.kind)).collect();
        // 2012 DA14 lies in the past, the recent list entry is kept whatever its date
        assert_eq!(
            names,
            vec![
                ("2023 BU", EsaListKind::Upcoming),
                ("2012 DA14", EsaListKind::Upcoming),
                ("2023 ZZ", EsaListKind::Recent),
            ]
        );
    }
}
