//! Sampler module.
//! Re-reads covered cells from a fresh capture using a calibrated geometry.
//! Revealed cells never turn back into covered ones, so they are never resampled.
//! Pixels outside the palette are treated as "no new information".

use std::time::Instant;
use tracing::{debug, trace};

use crate::calibrate::Geometry;
use crate::capture::ScreenSource;
use crate::error::RefreshError;
use crate::grid::CellGrid;
use crate::palette::{classify, CellState};

/// Counters for one refresh pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct RefreshStats {
    /// Covered cells whose pixel was classified
    pub sampled: u32,
    /// Cells written with a new state
    pub updated: u32,
    /// Sampled pixels that matched no palette entry
    pub unknown: u32,
}

/// Captures the geometry's bounds once and updates every covered cell of `grid`.
pub fn refresh<S, G>(geometry: &Geometry, grid: &mut G, source: &S) -> Result<RefreshStats, RefreshError>
where
    S: ScreenSource + ?Sized,
    G: CellGrid + ?Sized,
{
    let expected = (geometry.rows(), geometry.columns());
    if grid.dimensions() != expected {
        return Err(RefreshError::GridMismatch {
            expected,
            actual: grid.dimensions(),
        });
    }

    let start = Instant::now();
    let bounds = geometry.bounds();
    let frame = source.capture(&bounds)?;
    if frame.dimensions() != bounds.dimensions() {
        return Err(RefreshError::FrameMismatch {
            expected: bounds.dimensions(),
            actual: frame.dimensions(),
        });
    }

    let mut stats = RefreshStats::default();
    for row in 0..geometry.rows() {
        for column in 0..geometry.columns() {
            if !grid.get(row, column).is_covered() {
                continue;
            }
            let (x, y) = geometry.sample_point(row, column);
            stats.sampled += 1;
            match classify(frame.get_pixel(x, y)) {
                Some(CellState::Covered) => {}
                Some(state) => {
                    grid.set(row, column, state);
                    stats.updated += 1;
                }
                None => {
                    trace!("unknown pixel {:?} at cell ({}, {})", frame.get_pixel(x, y), row, column);
                    stats.unknown += 1;
                }
            }
        }
    }

    debug!(
        "refresh: {} sampled, {} updated, {} unknown in {:?}",
        stats.sampled,
        stats.updated,
        stats.unknown,
        start.elapsed()
    );
    Ok(stats)
}
