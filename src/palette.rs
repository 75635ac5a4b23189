//! Palette module.
//! Maps exact pixel colors to cell states for the GNOME Mines default theme.
//! Matching is exact: anti-aliased, scaled or themed tiles are not recognized.

use image::Rgba;
use std::fmt;

/// Visible state of a single board cell.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Revealed, with the number of adjacent hazards (0..=8)
    Revealed(u8),
    /// Not yet revealed
    #[default]
    Covered,
    /// Exposed hazard; the game is lost
    Hazard,
}

impl CellState {
    pub const fn is_covered(self) -> bool {
        matches!(self, Self::Covered)
    }

    /// Palette color the game renders for this state, if it has one.
    pub fn color(self) -> Option<Rgba<u8>> {
        PALETTE
            .iter()
            .find(|(_, state)| *state == self)
            .map(|(rgb, _)| Rgba([rgb[0], rgb[1], rgb[2], 255]))
    }
}

impl fmt::Display for CellState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CellState::Revealed(0) => write!(f, "."),
            CellState::Revealed(n) => write!(f, "{}", n),
            CellState::Covered => write!(f, "#"),
            CellState::Hazard => write!(f, "*"),
        }
    }
}

/// Ordered palette; the first exact match wins.
pub const PALETTE: [([u8; 3], CellState); 11] = [
    ([222, 222, 220], CellState::Revealed(0)),
    ([221, 250, 195], CellState::Revealed(1)),
    ([236, 237, 191], CellState::Revealed(2)),
    ([237, 218, 180], CellState::Revealed(3)),
    ([237, 195, 138], CellState::Revealed(4)),
    ([247, 161, 162], CellState::Revealed(5)),
    ([254, 167, 133], CellState::Revealed(6)),
    ([255, 125, 96], CellState::Revealed(7)),
    ([255, 50, 60], CellState::Revealed(8)),
    ([186, 189, 182], CellState::Covered),
    ([46, 52, 54], CellState::Hazard),
];

/// Classifies a pixel against the palette. Alpha is ignored.
/// Returns `None` for colors the palette does not contain.
pub fn classify(pixel: &Rgba<u8>) -> Option<CellState> {
    let rgb = [pixel[0], pixel[1], pixel[2]];
    PALETTE
        .iter()
        .find(|(color, _)| *color == rgb)
        .map(|&(_, state)| state)
}

/// Shorthand used by the calibrator's scans.
pub fn is_covered(pixel: &Rgba<u8>) -> bool {
    classify(pixel) == Some(CellState::Covered)
}
