//! Calibration module.
//! Finds the board on a single capture with no prior knowledge of window
//! position or tile size:
//! 1. origin: first covered pixel in row-major order (top-left of cell (0, 0))
//! 2. cell size: length of the covered run from the origin
//! 3. spacing: length of the non-covered run that follows
//! 4. columns/rows: covered landing pixels when stepping by size + spacing
//! Each step depends on the previous one and fails with its own error.

use image::{Rgba, RgbaImage};
use imageproc::drawing::{draw_cross_mut, draw_hollow_rect_mut};
use imageproc::rect::Rect;
use std::path::Path;
use tracing::{info, warn};

use crate::capture::{dump_frame, Bounds, ScreenSource};
use crate::error::CalibrationError;
use crate::palette::is_covered;

const OVERLAY_CELL: Rgba<u8> = Rgba([255, 0, 255, 255]);
const OVERLAY_SAMPLE: Rgba<u8> = Rgba([0, 160, 255, 255]);

/// Calibrated board geometry. Recalibrating produces a new value.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Geometry {
    bounds: Bounds,
    origin: (i32, i32),
    size: u32,
    spacing: u32,
    columns: u32,
    rows: u32,
}

impl Geometry {
    /// Region this geometry was calibrated against; refresh passes capture exactly this.
    pub const fn bounds(&self) -> Bounds {
        self.bounds
    }

    /// Screen coordinates of the top-left pixel of cell (0, 0).
    pub const fn origin(&self) -> (i32, i32) {
        self.origin
    }

    pub const fn size(&self) -> u32 {
        self.size
    }

    pub const fn spacing(&self) -> u32 {
        self.spacing
    }

    pub const fn columns(&self) -> u32 {
        self.columns
    }

    pub const fn rows(&self) -> u32 {
        self.rows
    }

    const fn stride(&self) -> u32 {
        self.size + self.spacing
    }

    /// Top-left pixel of a cell, in bounds-local coordinates.
    pub fn cell_origin(&self, row: u32, column: u32) -> (u32, u32) {
        let local_x = (self.origin.0 - self.bounds.x) as u32;
        let local_y = (self.origin.1 - self.bounds.y) as u32;
        (
            local_x + column * self.stride(),
            local_y + row * self.stride(),
        )
    }

    /// Offset from a cell's corner to the pixel that gets classified.
    ///
    /// Lands inside the number glyph rather than on the tile border. Scales
    /// with the cell (6 px for the default 20 px tiles) and always stays
    /// strictly below half the cell size.
    pub const fn sample_inset(&self) -> u32 {
        let proportional = self.size * 3 / 10;
        let limit = (self.size - 1) / 2;
        if proportional < limit { proportional } else { limit }
    }

    /// Pixel sampled for a cell, in bounds-local coordinates.
    pub fn sample_point(&self, row: u32, column: u32) -> (u32, u32) {
        let (x, y) = self.cell_origin(row, column);
        let inset = self.sample_inset();
        (x + inset, y + inset)
    }

    /// Copy of `frame` with every cell outlined and its sample point marked.
    pub fn draw_overlay(&self, frame: &RgbaImage) -> RgbaImage {
        let mut overlay = frame.clone();
        for row in 0..self.rows {
            for column in 0..self.columns {
                let (x, y) = self.cell_origin(row, column);
                let rect = Rect::at(x as i32, y as i32).of_size(self.size, self.size);
                draw_hollow_rect_mut(&mut overlay, rect, OVERLAY_CELL);
                let (sx, sy) = self.sample_point(row, column);
                draw_cross_mut(&mut overlay, OVERLAY_SAMPLE, sx as i32, sy as i32);
            }
        }
        overlay
    }
}

/// Queries the display bounds, captures them once and locates the board.
/// With `debug_dir`, the frame is saved there with the result drawn on top.
pub fn calibrate<S: ScreenSource + ?Sized>(
    source: &S,
    display: usize,
    debug_dir: Option<&Path>,
) -> Result<Geometry, CalibrationError> {
    let bounds = source.display_bounds(display)?;
    let frame = source.capture(&bounds)?;
    let result = locate_board(bounds, &frame);

    if let Some(dir) = debug_dir {
        let dumped = match &result {
            Ok(geometry) => dump_frame(dir, "calibration", &geometry.draw_overlay(&frame)),
            Err(_) => dump_frame(dir, "calibration_failed", &frame),
        };
        if let Err(e) = dumped {
            warn!("could not save calibration frame: {}", e);
        }
    }

    result
}

/// Locates the board on a frame captured from `bounds`.
pub fn locate_board(bounds: Bounds, frame: &RgbaImage) -> Result<Geometry, CalibrationError> {
    if frame.dimensions() != bounds.dimensions() {
        return Err(CalibrationError::FrameMismatch {
            expected: bounds.dimensions(),
            actual: frame.dimensions(),
        });
    }

    let (x, y) = find_origin(frame)?;
    info!("top left corner: ({},{})", x, y);

    let size = cell_size(frame, x, y)?;
    info!("cell size: {}", size);

    let spacing = cell_spacing(frame, x, y, size)?;
    info!("spacing: {}", spacing);

    let stride = size + spacing;
    let columns = count_cells(frame, (x, y), (stride, 0));
    let rows = count_cells(frame, (x, y), (0, stride));
    info!("board: {} columns x {} rows", columns, rows);

    if columns == 0 || rows == 0 {
        return Err(CalibrationError::DegenerateBoard { columns, rows });
    }

    let (width, height) = frame.dimensions();
    let fits = |start: u32, count: u32, limit: u32| {
        start as u64 + (count as u64 - 1) * stride as u64 + size as u64 <= limit as u64
    };
    if !fits(x, columns, width) || !fits(y, rows, height) {
        return Err(CalibrationError::BoardOutOfBounds { columns, rows });
    }

    Ok(Geometry {
        bounds,
        origin: (bounds.x + x as i32, bounds.y + y as i32),
        size,
        spacing,
        columns,
        rows,
    })
}

/// First covered pixel scanning top-to-bottom, then left-to-right.
fn find_origin(frame: &RgbaImage) -> Result<(u32, u32), CalibrationError> {
    // enumerate_pixels walks row-major
    frame
        .enumerate_pixels()
        .find(|(_, _, pixel)| is_covered(pixel))
        .map(|(x, y, _)| (x, y))
        .ok_or(CalibrationError::OriginNotFound)
}

fn cell_size(frame: &RgbaImage, x0: u32, y: u32) -> Result<u32, CalibrationError> {
    let mut x = x0;
    loop {
        if x == frame.width() {
            return Err(CalibrationError::SizeNotFound { x: x0, y });
        }
        if !is_covered(frame.get_pixel(x, y)) {
            break;
        }
        x += 1;
    }
    Ok(x - x0)
}

fn cell_spacing(frame: &RgbaImage, x0: u32, y: u32, size: u32) -> Result<u32, CalibrationError> {
    let start = x0 + size;
    let mut x = start;
    loop {
        if x == frame.width() {
            return Err(CalibrationError::SpacingNotFound { x: start, y });
        }
        if is_covered(frame.get_pixel(x, y)) {
            break;
        }
        x += 1;
    }
    Ok(x - start)
}

/// Counts consecutive covered landing pixels from `start`, stepping by `step`.
/// Stops at the first non-covered pixel or at the frame edge.
fn count_cells(frame: &RgbaImage, start: (u32, u32), step: (u32, u32)) -> u32 {
    let (mut x, mut y) = start;
    let mut count = 0;
    while x < frame.width() && y < frame.height() && is_covered(frame.get_pixel(x, y)) {
        count += 1;
        x += step.0;
        y += step.1;
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::fake::{board_frame, paint_cell, FakeScreen, BACKGROUND};
    use crate::palette::CellState;

    #[test]
    fn test_locate_reference_board() {
        let bounds = Bounds::new(0, 0, 100, 100);
        let frame = board_frame((100, 100), (10, 10), 20, 2, 3, 1);
        let geometry = locate_board(bounds, &frame).unwrap();
        assert_eq!(geometry.origin(), (10, 10));
        assert_eq!(geometry.size(), 20);
        assert_eq!(geometry.spacing(), 2);
        assert_eq!(geometry.columns(), 3);
        assert_eq!(geometry.rows(), 1);
    }

    #[test]
    fn test_locate_recovers_known_layouts() {
        // (origin, size, spacing, columns, rows)
        let layouts = [
            ((0, 0), 5, 1, 2, 2),
            ((3, 7), 16, 2, 9, 9),
            ((41, 12), 24, 4, 8, 4),
            ((1, 1), 2, 3, 12, 5),
            ((60, 90), 30, 1, 2, 3),
        ];
        for ((x, y), size, spacing, columns, rows) in layouts {
            let bounds = Bounds::new(0, 0, 400, 300);
            let frame = board_frame((400, 300), (x, y), size, spacing, columns, rows);
            let geometry = locate_board(bounds, &frame).unwrap();
            assert_eq!(geometry.origin(), (x as i32, y as i32));
            assert_eq!(geometry.size(), size);
            assert_eq!(geometry.spacing(), spacing);
            assert_eq!((geometry.columns(), geometry.rows()), (columns, rows));
        }
    }

    #[test]
    fn test_origin_is_in_screen_coordinates() {
        let bounds = Bounds::new(-1920, 200, 100, 100);
        let frame = board_frame((100, 100), (10, 10), 20, 2, 3, 1);
        let geometry = locate_board(bounds, &frame).unwrap();
        assert_eq!(geometry.origin(), (-1910, 210));
        assert_eq!(geometry.cell_origin(0, 2), (54, 10));
    }

    #[test]
    fn test_locate_is_deterministic() {
        let bounds = Bounds::new(0, 0, 120, 80);
        let frame = board_frame((120, 80), (4, 9), 10, 3, 5, 4);
        assert_eq!(locate_board(bounds, &frame).unwrap(), locate_board(bounds, &frame).unwrap());
    }

    #[test]
    fn test_origin_not_found() {
        let frame = RgbaImage::from_pixel(50, 50, BACKGROUND);
        let err = locate_board(Bounds::new(0, 0, 50, 50), &frame).unwrap_err();
        assert!(matches!(err, CalibrationError::OriginNotFound));
    }

    #[test]
    fn test_size_not_found_when_run_hits_edge() {
        // Single cell flush with the right edge
        let frame = board_frame((50, 50), (30, 5), 20, 2, 1, 1);
        let err = locate_board(Bounds::new(0, 0, 50, 50), &frame).unwrap_err();
        assert!(matches!(err, CalibrationError::SizeNotFound { x: 30, y: 5 }));
    }

    #[test]
    fn test_spacing_not_found_for_single_column() {
        let frame = board_frame((50, 50), (5, 5), 10, 2, 1, 3);
        let err = locate_board(Bounds::new(0, 0, 50, 50), &frame).unwrap_err();
        assert!(matches!(err, CalibrationError::SpacingNotFound { x: 15, y: 5 }));
    }

    #[test]
    fn test_truncated_board_is_rejected() {
        // Third column starts at 54 but only 6 pixels of it are captured
        let frame = board_frame((60, 40), (10, 10), 20, 2, 3, 1);
        let err = locate_board(Bounds::new(0, 0, 60, 40), &frame).unwrap_err();
        assert!(matches!(
            err,
            CalibrationError::BoardOutOfBounds { columns: 3, rows: 1 }
        ));
    }

    #[test]
    fn test_frame_mismatch() {
        let frame = board_frame((50, 50), (5, 5), 10, 2, 2, 2);
        let err = locate_board(Bounds::new(0, 0, 60, 50), &frame).unwrap_err();
        assert!(matches!(err, CalibrationError::FrameMismatch { .. }));
    }

    #[test]
    fn test_partially_revealed_row_limits_columns() {
        // Column counting stops at the first non-covered landing pixel
        let mut frame = board_frame((100, 100), (10, 10), 20, 2, 4, 1);
        paint_cell(&mut frame, (54, 10), 20, CellState::Revealed(0));
        let geometry = locate_board(Bounds::new(0, 0, 100, 100), &frame).unwrap();
        assert_eq!(geometry.columns(), 2);
    }

    #[test]
    fn test_sample_inset_stays_inside_cell() {
        let frame = board_frame((100, 100), (10, 10), 20, 2, 3, 1);
        let geometry = locate_board(Bounds::new(0, 0, 100, 100), &frame).unwrap();
        assert_eq!(geometry.sample_inset(), 6);
        assert_eq!(geometry.sample_point(0, 1), (38, 16));

        for size in 1..64 {
            let frame = board_frame((200, 100), (0, 0), size, 1, 2, 1);
            let geometry = locate_board(Bounds::new(0, 0, 200, 100), &frame).unwrap();
            assert!(geometry.sample_inset() * 2 < size, "size {}", size);
        }
    }

    #[test]
    fn test_calibrate_captures_once() {
        let bounds = Bounds::new(0, 0, 100, 100);
        let screen = FakeScreen::new(bounds, board_frame((100, 100), (10, 10), 20, 2, 3, 1));
        let geometry = calibrate(&screen, 0, None).unwrap();
        assert_eq!(geometry.bounds(), bounds);
        assert_eq!(*screen.captures.borrow(), 1);
    }

    #[test]
    fn test_calibrate_propagates_capture_failure() {
        let screen = FakeScreen::unavailable(Bounds::new(0, 0, 10, 10));
        let err = calibrate(&screen, 0, None).unwrap_err();
        assert!(matches!(err, CalibrationError::CaptureUnavailable(_)));

        let err = calibrate(&screen, 3, None).unwrap_err();
        assert!(matches!(err, CalibrationError::CaptureUnavailable(_)));
    }

    #[test]
    fn test_calibrate_writes_debug_overlay() {
        let dir = tempfile::tempdir().unwrap();
        let bounds = Bounds::new(0, 0, 100, 100);
        let screen = FakeScreen::new(bounds, board_frame((100, 100), (10, 10), 20, 2, 3, 1));
        calibrate(&screen, 0, Some(dir.path())).unwrap();
        assert!(dir.path().join("calibration.png").exists());

        let empty = FakeScreen::new(bounds, RgbaImage::from_pixel(100, 100, BACKGROUND));
        calibrate(&empty, 0, Some(dir.path())).unwrap_err();
        assert!(dir.path().join("calibration_failed.png").exists());
    }

    #[test]
    fn test_overlay_marks_cells() {
        let frame = board_frame((100, 100), (10, 10), 20, 2, 3, 1);
        let geometry = locate_board(Bounds::new(0, 0, 100, 100), &frame).unwrap();
        let overlay = geometry.draw_overlay(&frame);
        assert_eq!(overlay.get_pixel(10, 10), &OVERLAY_CELL);
        assert_eq!(overlay.get_pixel(16, 16), &OVERLAY_SAMPLE);
        // Source frame is left untouched
        assert!(is_covered(frame.get_pixel(10, 10)));
    }
}
