//! # Coarse-to-fine search controller
//!
//! Localize the close approach of a target to the Earth in two ephemeris queries.
//!
//! 1. Sample the whole [`SearchWindow`] on the coarse grid and take the index of closest
//!    approach (ICA) of the target to the Earth's center.
//! 2. Select the coarse epochs inside the protected radius. The fine grid spans the selection
//!    from its first to its last epoch, `coarse_factor` fine epochs per coarse epoch.
//!    When nothing is selected, the fine grid is the single coarse cell centered on the ICA.
//! 3. Query the fine grid. If the source reports that its data ends at a cutoff epoch (impacted
//!    bodies), the fine grid is rebuilt from the same start up to the cutoff, rounded down to the
//!    whole UTC minute, and queried exactly once more. The rebuilt grid never extends past the
//!    first fine grid.
//! 4. The ICA of the fine trajectory is the operative close approach estimate.
use hifitime::Epoch;
use log::{debug, info};

use crate::{
    conjunct_errors::ConjunctError,
    ephemeris::{BodyRef, EphemerisSource},
    search::{ApproachEstimate, SearchParams, SearchWindow},
    state::Trajectory,
    time::{floor_to_utc_minute, whole_steps, TimeGrid},
};

/// Outcome of the two-pass search.
#[derive(Debug, Clone, PartialEq)]
pub struct RefinedWindow {
    pub window: SearchWindow,
    pub coarse_grid: TimeGrid,
    pub coarse: ApproachEstimate,
    pub fine_grid: TimeGrid,
    pub fine: ApproachEstimate,
    /// Target trajectory on `fine_grid`.
    pub target: Trajectory,
    /// End of the fine grid when it was shortened to the ephemeris coverage.
    pub truncated_at: Option<Epoch>,
}

fn closest_approach(
    target: &str,
    trajectory: &Trajectory,
) -> Result<ApproachEstimate, ConjunctError> {
    let (index, distance) = trajectory.closest_approach().ok_or_else(|| {
        ConjunctError::EphemerisQueryError(format!("target {target}: no valid range in trajectory"))
    })?;
    Ok(ApproachEstimate {
        index,
        epoch: trajectory.grid().epoch(index),
        distance,
    })
}

fn fetch_aligned<E: EphemerisSource + ?Sized>(
    source: &E,
    target: &str,
    grid: &TimeGrid,
) -> Result<Trajectory, ConjunctError> {
    let trajectory = source.fetch(target, grid, BodyRef::Earth)?;
    if trajectory.grid() != grid {
        return Err(ConjunctError::EphemerisQueryError(format!(
            "target {target}: trajectory of {} samples does not match the requested grid of {}",
            trajectory.len(),
            grid.len()
        )));
    }
    Ok(trajectory)
}

/// Build the fine grid from the coarse ranges.
///
/// Arguments
/// -----------------
/// * `coarse_grid`: grid of the coarse query.
/// * `ranges`: target distance from the Earth's center at each coarse epoch.
/// * `ica`: index of the smallest coarse range.
/// * `window`: the search window, lower bound of the fine grid.
/// * `params`: search parameters.
///
/// Return
/// ----------
/// * The fine grid, always within `[coarse_grid.start(), coarse_grid.end() + coarse_step)`.
pub fn fine_grid(
    coarse_grid: &TimeGrid,
    ranges: &[f64],
    ica: usize,
    window: &SearchWindow,
    params: &SearchParams,
) -> Result<TimeGrid, ConjunctError> {
    let factor = params.coarse_factor;
    let inside = |r: &f64| *r < params.protected_radius_km;

    match (ranges.iter().position(inside), ranges.iter().rposition(inside)) {
        (Some(first), Some(last)) => {
            debug!(
                "{} coarse epochs selected between indices {first} and {last}",
                ranges[first..=last].iter().filter(|r| inside(*r)).count()
            );
            let start = coarse_grid.epoch(first);
            let count = (last - first + 1) * factor;
            TimeGrid::new(start, params.fine_step, count.min(fitting(start, window, params)))
        }
        _ => {
            let centered = coarse_grid.epoch(ica) - params.fine_step * (factor / 2) as i64;
            let start = if centered < window.start {
                window.start
            } else {
                centered
            };
            debug!("no coarse epoch inside the protected radius, fine grid centered on the ICA");
            TimeGrid::new(start, params.fine_step, factor.min(fitting(start, window, params)))
        }
    }
}

/// Number of fine epochs from `start` that stay before the window end.
fn fitting(start: Epoch, window: &SearchWindow, params: &SearchParams) -> usize {
    whole_steps(window.end - start, params.fine_step).max(1)
}

/// Run the coarse and fine ephemeris queries for `target` over `window`.
///
/// Return
/// ----------
/// * The refined window with the coarse and fine estimates and the fine target trajectory.
/// * Any error of the coarse query, any error of the fine query other than
///   [`ConjunctError::EphemerisUnavailable`], or any error of the single retry.
pub fn refine_window<E: EphemerisSource + ?Sized>(
    source: &E,
    target: &str,
    window: &SearchWindow,
    params: &SearchParams,
) -> Result<RefinedWindow, ConjunctError> {
    let coarse_grid = TimeGrid::covering(window.start, window.end, params.coarse_step())?;
    debug!(
        "coarse grid: {} epochs from {} every {}",
        coarse_grid.len(),
        coarse_grid.start(),
        coarse_grid.spacing()
    );

    let coarse_trajectory = fetch_aligned(source, target, &coarse_grid)?;
    let coarse = closest_approach(target, &coarse_trajectory)?;
    info!("Coarse close approach of {target}: {coarse}");

    let grid = fine_grid(
        &coarse_grid,
        &coarse_trajectory.ranges(),
        coarse.index,
        window,
        params,
    )?;
    debug!(
        "fine grid: {} epochs from {} every {}",
        grid.len(),
        grid.start(),
        grid.spacing()
    );

    let (fine_grid, target_trajectory, truncated_at) = match fetch_aligned(source, target, &grid)
    {
        Ok(trajectory) => (grid, trajectory, None),
        Err(ConjunctError::EphemerisUnavailable {
            target: name,
            cutoff,
        }) => {
            // a cutoff past the first fine grid never extends it
            let floored = floor_to_utc_minute(cutoff);
            let limit = grid.end() + params.fine_step;
            let end = if floored < limit { floored } else { limit };
            let retry_grid = TimeGrid::covering(grid.start(), end, params.fine_step)
                .map_err(|_| ConjunctError::EphemerisUnavailable {
                    target: name,
                    cutoff,
                })?;
            info!(
                "Ephemeris of {target} ends at {cutoff}, fine grid shortened to {} epochs",
                retry_grid.len()
            );
            let trajectory = fetch_aligned(source, target, &retry_grid)?;
            (retry_grid, trajectory, Some(end))
        }
        Err(e) => return Err(e),
    };

    let fine = closest_approach(target, &target_trajectory)?;
    info!("Fine close approach of {target}: {fine}");

    Ok(RefinedWindow {
        window: *window,
        coarse_grid,
        coarse,
        fine_grid,
        fine,
        target: target_trajectory,
        truncated_at,
    })
}
