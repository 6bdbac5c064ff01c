//! # Epochs and time grids
//!
//! Epochs are [`hifitime::Epoch`] values: an integer count of centuries plus nanoseconds, which is
//! more than enough precision for sub-second orbital arithmetic over the spans used by a search.
//!
//! A [`TimeGrid`] is the regular sampling used everywhere in the search: a start epoch, a strictly
//! positive spacing and a strictly positive count. Epochs are generated on demand, so a grid is a
//! small `Copy` value that can be handed to the ephemeris source, the bulk propagator and the
//! ranker without ever disagreeing on the sample instants.
use hifitime::{Duration, Epoch, TimeScale, Unit};

use crate::conjunct_errors::ConjunctError;

/// Regular, strictly increasing sequence of epochs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimeGrid {
    start: Epoch,
    spacing: Duration,
    count: usize,
}

impl TimeGrid {
    /// Build a grid from its start, spacing and number of epochs.
    ///
    /// Arguments
    /// -----------------
    /// * `start`: first epoch of the grid.
    /// * `spacing`: duration between two consecutive epochs, must be strictly positive.
    /// * `count`: number of epochs, must be at least one.
    ///
    /// Return
    /// ----------
    /// * The grid, or [`ConjunctError::InvalidTimeGrid`] if the spacing or the count is invalid.
    pub fn new(start: Epoch, spacing: Duration, count: usize) -> Result<Self, ConjunctError> {
        if spacing <= Duration::ZERO {
            return Err(ConjunctError::InvalidTimeGrid(format!(
                "spacing must be strictly positive, got {spacing}"
            )));
        }
        if count == 0 {
            return Err(ConjunctError::InvalidTimeGrid(format!(
                "empty grid starting at {start}"
            )));
        }
        Ok(TimeGrid {
            start,
            spacing,
            count,
        })
    }

    /// Build the grid starting at `start` with as many whole `spacing` steps as fit before `end`.
    ///
    /// The end epoch itself is never part of the grid: the last sample is strictly before `end`
    /// unless `end - start` is not a multiple of the spacing, in which case it is the last whole
    /// step before `end`.
    ///
    /// Arguments
    /// -----------------
    /// * `start`: first epoch of the grid.
    /// * `end`: exclusive upper bound of the grid.
    /// * `spacing`: duration between two consecutive epochs.
    ///
    /// Return
    /// ----------
    /// * The grid, or [`ConjunctError::InvalidTimeGrid`] if not a single step fits in the interval.
    pub fn covering(start: Epoch, end: Epoch, spacing: Duration) -> Result<Self, ConjunctError> {
        let count = whole_steps(end - start, spacing);
        TimeGrid::new(start, spacing, count)
    }

    pub fn start(&self) -> Epoch {
        self.start
    }

    pub fn spacing(&self) -> Duration {
        self.spacing
    }

    pub fn len(&self) -> usize {
        self.count
    }

    /// Always `false`, a grid holds at least one epoch.
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    /// Last epoch of the grid.
    pub fn end(&self) -> Epoch {
        self.epoch(self.count - 1)
    }

    /// Epoch at `index`. Indices past the end extrapolate the grid.
    pub fn epoch(&self, index: usize) -> Epoch {
        self.start + self.spacing * index as i64
    }

    pub fn iter(&self) -> impl ExactSizeIterator<Item = Epoch> + '_ {
        (0..self.count).map(move |i| self.epoch(i))
    }

    pub fn epochs(&self) -> Vec<Epoch> {
        self.iter().collect()
    }

    /// `true` if every epoch of the grid lies within `[start, end]`.
    pub fn is_within(&self, start: Epoch, end: Epoch) -> bool {
        self.start >= start && self.end() <= end
    }
}

/// Number of whole `step` contained in `span` (zero for negative spans).
pub fn whole_steps(span: Duration, step: Duration) -> usize {
    let span_ns = span.total_nanoseconds();
    let step_ns = step.total_nanoseconds();
    if span_ns <= 0 || step_ns <= 0 {
        return 0;
    }
    (span_ns / step_ns) as usize
}

/// Round an epoch down to the preceding whole UTC minute.
pub fn floor_to_utc_minute(epoch: Epoch) -> Epoch {
    let minute = Unit::Minute * 1_i64;
    Epoch::from_utc_duration(epoch.to_utc_duration().floor(minute))
}

fn month_number(month: &str) -> Option<u8> {
    let month = month.to_ascii_uppercase();
    let number = match month.as_str() {
        "JAN" => 1,
        "FEB" => 2,
        "MAR" => 3,
        "APR" => 4,
        "MAY" => 5,
        "JUN" => 6,
        "JUL" => 7,
        "AUG" => 8,
        "SEP" => 9,
        "OCT" => 10,
        "NOV" => 11,
        "DEC" => 12,
        _ => return None,
    };
    Some(number)
}

/// Split `"ss.ffff"` into whole seconds and nanoseconds.
fn parse_seconds(field: &str) -> Option<(u8, u32)> {
    let (whole, frac) = match field.split_once('.') {
        Some((w, f)) => (w, f),
        None => (field, ""),
    };
    let seconds = whole.parse::<u8>().ok()?;
    if frac.is_empty() {
        return Some((seconds, 0));
    }
    if !frac.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    // keep nanosecond resolution, pad or truncate to 9 digits
    let mut digits: String = frac.chars().take(9).collect();
    while digits.len() < 9 {
        digits.push('0');
    }
    Some((seconds, digits.parse::<u32>().ok()?))
}

/// Parse a JPL Horizons calendar date, `YYYY-MON-DD hh:mm[:ss[.ffff]]`.
///
/// Arguments
/// -----------------
/// * `date`: calendar string as printed by Horizons, e.g. `"2019-JUN-22 21:27:09.1844"`.
/// * `time_scale`: the scale the date is expressed in (`TD` dates are [`TimeScale::TDB`]).
///
/// Return
/// ----------
/// * The epoch, or `None` if the string is not a Horizons calendar date.
pub fn parse_horizons_calendar(date: &str, time_scale: TimeScale) -> Option<Epoch> {
    let (day_part, time_part) = date.trim().split_once(' ')?;

    let mut ymd = day_part.split('-');
    let year = ymd.next()?.parse::<i32>().ok()?;
    let month = month_number(ymd.next()?)?;
    let day = ymd.next()?.parse::<u8>().ok()?;

    let mut hms = time_part.trim().split(':');
    let hour = hms.next()?.parse::<u8>().ok()?;
    let minute = hms.next()?.parse::<u8>().ok()?;
    let (second, nanos) = match hms.next() {
        Some(s) => parse_seconds(s)?,
        None => (0, 0),
    };

    Epoch::maybe_from_gregorian(year, month, day, hour, minute, second, nanos, time_scale).ok()
}

/// Parse an ISO-like UTC date, `YYYY-MM-DD[( |T)hh:mm[:ss[.fff]]]`.
///
/// This is the format of the ESA close approach lists.
pub fn parse_iso_utc(date: &str) -> Option<Epoch> {
    let date = date.trim();
    let (day_part, time_part) = match date.split_once([' ', 'T']) {
        Some((d, t)) => (d, Some(t)),
        None => (date, None),
    };

    let mut ymd = day_part.split('-');
    let year = ymd.next()?.parse::<i32>().ok()?;
    let month = ymd.next()?.parse::<u8>().ok()?;
    let day = ymd.next()?.parse::<u8>().ok()?;

    let (hour, minute, second, nanos) = match time_part {
        None => (0, 0, 0, 0),
        Some(t) => {
            let mut hms = t.trim().split(':');
            let hour = hms.next()?.parse::<u8>().ok()?;
            let minute = hms.next()?.parse::<u8>().ok()?;
            let (second, nanos) = match hms.next() {
                Some(s) => parse_seconds(s)?,
                None => (0, 0),
            };
            (hour, minute, second, nanos)
        }
    };

    Epoch::maybe_from_gregorian(year, month, day, hour, minute, second, nanos, TimeScale::UTC)
        .ok()
}
