use thiserror::Error;

/// Failure of the screen capture layer.
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("Display {0} not found")]
    NoDisplay(usize),
    #[error("Screen capture backend failed: {0}. On macOS, grant Screen Recording permission to the terminal")]
    Backend(#[from] xcap::XCapError),
    #[error("Captured empty frame - possible permission issue or no display")]
    EmptyFrame,
    #[error("Region ({x},{y},{width},{height}) exceeds display {display_width}x{display_height}")]
    RegionOutOfBounds {
        x: i32,
        y: i32,
        width: u32,
        height: u32,
        display_width: u32,
        display_height: u32,
    },
    #[error("Failed to write debug image: {0}")]
    DebugDump(#[from] image::ImageError),
    #[error("Failed to create debug directory: {0}")]
    DebugDir(#[from] std::io::Error),
}

/// Failure of a calibration pass. No partial geometry is ever produced.
#[derive(Error, Debug)]
pub enum CalibrationError {
    #[error("No covered cell found on screen")]
    OriginNotFound,
    #[error("Covered run from ({x},{y}) reaches the capture edge, cannot get cell size")]
    SizeNotFound { x: u32, y: u32 },
    #[error("No second cell to the right of ({x},{y}), cannot get spacing between cells")]
    SpacingNotFound { x: u32, y: u32 },
    #[error("Board has {columns} columns and {rows} rows")]
    DegenerateBoard { columns: u32, rows: u32 },
    #[error("Board of {columns}x{rows} cells does not fit in the captured bounds")]
    BoardOutOfBounds { columns: u32, rows: u32 },
    #[error("Captured frame is {actual:?}, expected {expected:?}")]
    FrameMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error(transparent)]
    CaptureUnavailable(#[from] CaptureError),
}

/// Failure of a refresh pass. Unknown pixels are not errors.
#[derive(Error, Debug)]
pub enum RefreshError {
    #[error(transparent)]
    CaptureUnavailable(#[from] CaptureError),
    #[error("Captured frame is {actual:?}, expected {expected:?}; recalibrate")]
    FrameMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
    #[error("Grid is {actual:?} (rows, columns), geometry is {expected:?}")]
    GridMismatch {
        expected: (u32, u32),
        actual: (u32, u32),
    },
}
