//! # Close-approach search
//!
//! Configuration and shared types of the two-pass search.
//!
//! * [`SearchParams`] gathers every tunable of the search (window, grid spacings, protected
//!   radius, filter margin, catalog selection). Build it with [`SearchParams::builder`], which
//!   validates the values.
//! * [`SearchMode`] selects how the [`SearchWindow`] is derived from the nominal encounter epoch:
//!   centered on it for a flyby, ending on it for an impact.
//! * [`controller::refine_window`] runs the coarse then fine ephemeris queries.
//! * [`ranking::rank`] computes and sorts the miss distances of the catalog objects.
use std::{fmt, str::FromStr};

use hifitime::{Duration, Epoch, Unit};

use crate::{
    constants::{Kilometer, PROTECTED_RADIUS_KM},
    conjunct_errors::ConjunctError,
};

pub mod controller;
pub mod ranking;

/// Tunables of the search.
///
/// Fields
/// -----------------
/// * `half_window`: half span of a `mid` window. An `end` window spans twice this duration.
/// * `fine_step`: spacing of the fine grid.
/// * `coarse_factor`: the coarse spacing is `coarse_factor × fine_step`. Each masked coarse
///   epoch expands to `coarse_factor` fine epochs.
/// * `protected_radius_km`: coarse epochs closer than this to the Earth's center select the
///   fine window.
/// * `apogee_margin`: fraction of the fine miss distance an object must be able to reach to be
///   propagated.
/// * `live_catalog_window`: encounters closer than this to the current time use the live catalog.
/// * `archive_offset`: older encounters use the catalog snapshot taken this long after them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchParams {
    pub half_window: Duration,
    pub fine_step: Duration,
    pub coarse_factor: usize,
    pub protected_radius_km: Kilometer,
    pub apogee_margin: f64,
    pub live_catalog_window: Duration,
    pub archive_offset: Duration,
}

impl SearchParams {
    pub fn builder() -> SearchParamsBuilder {
        SearchParamsBuilder::new()
    }

    /// Spacing of the coarse grid.
    pub fn coarse_step(&self) -> Duration {
        self.fine_step * self.coarse_factor as i64
    }
}

impl Default for SearchParams {
    fn default() -> Self {
        SearchParams {
            half_window: Unit::Day * 2_i64,
            fine_step: Unit::Minute * 1_i64,
            coarse_factor: 10,
            protected_radius_km: PROTECTED_RADIUS_KM,
            apogee_margin: 0.9,
            live_catalog_window: Unit::Day * 3_i64,
            archive_offset: Unit::Day * 1_i64,
        }
    }
}

/// Builder for [`SearchParams`], with validation.
#[derive(Debug, Clone)]
pub struct SearchParamsBuilder {
    params: SearchParams,
}

impl Default for SearchParamsBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SearchParamsBuilder {
    /// Create a new builder initialized with default values.
    pub fn new() -> Self {
        Self {
            params: SearchParams::default(),
        }
    }

    pub fn half_window(mut self, v: Duration) -> Self {
        self.params.half_window = v;
        self
    }
    pub fn fine_step(mut self, v: Duration) -> Self {
        self.params.fine_step = v;
        self
    }
    pub fn coarse_factor(mut self, v: usize) -> Self {
        self.params.coarse_factor = v;
        self
    }
    pub fn protected_radius_km(mut self, v: Kilometer) -> Self {
        self.params.protected_radius_km = v;
        self
    }
    pub fn apogee_margin(mut self, v: f64) -> Self {
        self.params.apogee_margin = v;
        self
    }
    pub fn live_catalog_window(mut self, v: Duration) -> Self {
        self.params.live_catalog_window = v;
        self
    }
    pub fn archive_offset(mut self, v: Duration) -> Self {
        self.params.archive_offset = v;
        self
    }

    #[inline]
    fn gt0(d: Duration) -> bool {
        d > Duration::ZERO
    }

    #[inline]
    fn finite_gt0(x: f64) -> bool {
        x.is_finite() && x > 0.0
    }

    /// Validate and return the parameters.
    ///
    /// Return
    /// ----------
    /// * [`ConjunctError::InvalidSearchParameter`] if a duration is not strictly positive, if
    ///   `coarse_factor` is zero, or if the radius or the margin is not a strictly positive finite
    ///   number.
    pub fn build(self) -> Result<SearchParams, ConjunctError> {
        let p = &self.params;

        let durations = [
            ("half_window", p.half_window),
            ("fine_step", p.fine_step),
            ("live_catalog_window", p.live_catalog_window),
            ("archive_offset", p.archive_offset),
        ];
        if let Some((name, d)) = durations.iter().find(|(_, d)| !Self::gt0(*d)) {
            return Err(ConjunctError::InvalidSearchParameter(format!(
                "{name} must be strictly positive, got {d}"
            )));
        }

        if p.coarse_factor == 0 {
            return Err(ConjunctError::InvalidSearchParameter(
                "coarse_factor must be at least 1".into(),
            ));
        }
        if !Self::finite_gt0(p.protected_radius_km) {
            return Err(ConjunctError::InvalidSearchParameter(format!(
                "protected_radius_km must be finite and > 0, got {}",
                p.protected_radius_km
            )));
        }
        if !Self::finite_gt0(p.apogee_margin) {
            return Err(ConjunctError::InvalidSearchParameter(format!(
                "apogee_margin must be finite and > 0, got {}",
                p.apogee_margin
            )));
        }

        Ok(self.params)
    }
}

/// Position of the nominal encounter epoch in the search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SearchMode {
    /// Flyby: the window is centered on the encounter.
    Mid,
    /// Terminal event (impact): the window ends on the encounter.
    End,
}

impl FromStr for SearchMode {
    type Err = ConjunctError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mid" => Ok(SearchMode::Mid),
            "end" => Ok(SearchMode::End),
            _ => Err(ConjunctError::InvalidSearchMode(s.to_string())),
        }
    }
}

impl fmt::Display for SearchMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SearchMode::Mid => write!(f, "mid"),
            SearchMode::End => write!(f, "end"),
        }
    }
}

/// Time interval searched for the close approach.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SearchWindow {
    pub start: Epoch,
    pub end: Epoch,
    pub mode: SearchMode,
}

impl SearchWindow {
    /// Derive the window from the nominal encounter epoch.
    ///
    /// * `mid`: `[tca - half_window, tca + half_window]`
    /// * `end`: `[tca - 2 half_window, tca]`
    pub fn around(tca: Epoch, mode: SearchMode, params: &SearchParams) -> Self {
        let (start, end) = match mode {
            SearchMode::Mid => (tca - params.half_window, tca + params.half_window),
            SearchMode::End => (tca - params.half_window * 2_i64, tca),
        };
        SearchWindow { start, end, mode }
    }

    pub fn span(&self) -> Duration {
        self.end - self.start
    }

    pub fn contains(&self, epoch: Epoch) -> bool {
        epoch >= self.start && epoch <= self.end
    }
}

/// Closest approach of the target to the Earth's center on one grid.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ApproachEstimate {
    /// Index of closest approach in the grid.
    pub index: usize,
    pub epoch: Epoch,
    /// Distance from the Earth's center (km).
    pub distance: Kilometer,
}

impl fmt::Display for ApproachEstimate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {:.0} km", self.epoch, self.distance)
    }
}
