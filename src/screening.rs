//! # Close-approach screening
//!
//! [`Screening`] runs the whole search for one target:
//!
//! ```text
//! coarse query ─▶ fine query (one retry on truncation) ─▶ catalog ─▶ apogee filter
//!      ─▶ bulk propagation ─▶ frame reconciliation ─▶ ranking
//! ```
//!
//! Every stage consumes the output of the previous one and produces new values, the façade keeps
//! no state between targets. An error aborts the current target only, so a driver screening a
//! list of events can log it and move on to the next one.
//!
//! ## Example
//! -----------------
//! ```rust, no_run
//! use camino::Utf8Path;
//! use conjunct::catalog::tle_reader::TleCatalog;
//! use conjunct::ephemeris::horizons::HorizonsClient;
//! use conjunct::screening::Screening;
//! use conjunct::search::SearchParams;
//! use hifitime::Epoch;
//!
//! let catalog = TleCatalog::from_file(Utf8Path::new("catalog.tle"))?;
//! let screening = Screening::new(HorizonsClient::default(), catalog, SearchParams::default());
//!
//! let tca = Epoch::from_gregorian_utc_hms(2023, 1, 27, 0, 29, 0);
//! let report = screening.screen("2023 BU", tca, "mid")?;
//! for approach in report.result.iter().take(10) {
//!     println!("{approach}");
//! }
//! # Ok::<(), conjunct::conjunct_errors::ConjunctError>(())
//! ```
use hifitime::Epoch;
use log::{info, warn};

use crate::{
    catalog::{dedup_catalog, filter::filter_candidates, CatalogContext, CatalogProvider},
    constants::CatalogNumber,
    conjunct_errors::ConjunctError,
    ephemeris::EphemerisSource,
    propagation::{propagate_batch, reconcile_frames, PropagationReport},
    search::{
        controller::refine_window,
        ranking::{rank, CloseApproachResult},
        ApproachEstimate, SearchMode, SearchParams, SearchWindow,
    },
    state::Trajectory,
    time::TimeGrid,
};

/// Everything produced by the screening of one target.
#[derive(Debug, Clone)]
pub struct ScreeningReport {
    pub target: String,
    pub window: SearchWindow,
    pub coarse: ApproachEstimate,
    pub fine: ApproachEstimate,
    /// End of the fine grid when the target ephemeris stops before the window end.
    pub truncated_at: Option<Epoch>,
    pub fine_grid: TimeGrid,
    /// Target trajectory on `fine_grid`.
    pub target_trajectory: Trajectory,
    pub catalog_context: CatalogContext,
    /// Records received from the catalog provider, duplicates removed.
    pub catalog_size: usize,
    /// Records that passed the apogee filter and were propagated.
    pub candidates: usize,
    pub propagation: PropagationReport,
    /// Trajectories of the candidates propagated without failure, in the target frame.
    pub trajectories: Vec<(CatalogNumber, Trajectory)>,
    pub result: CloseApproachResult,
}

/// Screening pipeline over one ephemeris source and one catalog provider.
#[derive(Debug, Clone)]
pub struct Screening<E, C> {
    ephemeris: E,
    catalog: C,
    params: SearchParams,
}

impl<E: EphemerisSource, C: CatalogProvider> Screening<E, C> {
    pub fn new(ephemeris: E, catalog: C, params: SearchParams) -> Self {
        Screening {
            ephemeris,
            catalog,
            params,
        }
    }

    pub fn params(&self) -> &SearchParams {
        &self.params
    }

    pub fn ephemeris(&self) -> &E {
        &self.ephemeris
    }

    pub fn catalog(&self) -> &C {
        &self.catalog
    }

    /// Screen the catalog against `target` around its nominal encounter `tca`.
    ///
    /// Arguments
    /// -----------------
    /// * `target`: target identifier understood by the ephemeris source, e.g. `"2023 BU"`.
    /// * `tca`: nominal time of closest approach.
    /// * `mode`: `"mid"` for a flyby, `"end"` for an impact.
    ///
    /// Return
    /// ----------
    /// * The screening report.
    /// * [`ConjunctError::InvalidSearchMode`] before any query if `mode` is invalid.
    /// * [`ConjunctError::ClockError`] if the current time cannot be read.
    /// * Any fatal error of the search (see [`Screening::screen_at`]).
    pub fn screen(
        &self,
        target: &str,
        tca: Epoch,
        mode: &str,
    ) -> Result<ScreeningReport, ConjunctError> {
        let mode: SearchMode = mode.parse()?;
        let now = Epoch::now().map_err(|e| ConjunctError::ClockError(e.to_string()))?;
        self.screen_at(target, tca, mode, now)
    }

    /// Same as [`Screening::screen`], with an explicit current time.
    ///
    /// `now` only selects between the live catalog and a historical snapshot.
    ///
    /// Return
    /// ----------
    /// * The screening report. An empty catalog or an empty candidate set gives an empty result.
    /// * Any error of the ephemeris source other than a single recoverable truncation.
    /// * Any error of the catalog provider.
    pub fn screen_at(
        &self,
        target: &str,
        tca: Epoch,
        mode: SearchMode,
        now: Epoch,
    ) -> Result<ScreeningReport, ConjunctError> {
        let window = SearchWindow::around(tca, mode, &self.params);
        info!(
            "Screening {target} from {} to {} ({mode} mode)",
            window.start, window.end
        );

        let refined = refine_window(&self.ephemeris, target, &window, &self.params)?;

        let catalog_context = CatalogContext::for_encounter(
            refined.fine.epoch,
            now,
            self.params.live_catalog_window,
            self.params.archive_offset,
        );
        let records = dedup_catalog(self.catalog.fetch(&catalog_context)?);
        let catalog_size = records.len();
        info!("{catalog_size} element sets loaded ({catalog_context:?})");

        let candidates = filter_candidates(
            records,
            refined.fine.distance,
            self.params.apogee_margin,
        );
        info!(
            "{} element sets remaining after apogee vs miss distance filtering",
            candidates.len()
        );

        let batch = propagate_batch(&candidates, &refined.fine_grid);
        let reconciled = reconcile_frames(&batch, refined.target.frame());
        let result = rank(&refined.target, &reconciled, &candidates)?;

        let propagation = reconciled.report();
        if !propagation.dropped.is_empty() {
            warn!(
                "{} records without any valid epoch dropped: {:?}",
                propagation.dropped.len(),
                propagation.dropped
            );
        }

        let trajectories = (0..reconciled.record_count())
            .filter_map(|i| {
                reconciled
                    .trajectory(i)
                    .map(|t| (reconciled.catalog_number(i), t))
            })
            .collect();

        if let Some(closest) = result.first() {
            info!(
                "Closest object to {target}: {} {} at {:.0} km",
                closest.record.catalog_number(),
                closest.record.name(),
                closest.miss_distance
            );
        }

        Ok(ScreeningReport {
            target: target.to_string(),
            window,
            coarse: refined.coarse,
            fine: refined.fine,
            truncated_at: refined.truncated_at,
            fine_grid: refined.fine_grid,
            target_trajectory: refined.target,
            catalog_context,
            catalog_size,
            candidates: candidates.len(),
            propagation,
            trajectories,
            result,
        })
    }
}
