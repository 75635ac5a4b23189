//! Grid module.
//! The refresh pass writes into any `CellGrid`; `Grid` is the plain
//! row-major store used by the CLI.

use std::fmt;

use crate::palette::CellState;

/// Cell storage the sampler reads from and writes into.
pub trait CellGrid {
    /// (rows, columns)
    fn dimensions(&self) -> (u32, u32);

    fn get(&self, row: u32, column: u32) -> CellState;

    fn set(&mut self, row: u32, column: u32, state: CellState);
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid {
    rows: u32,
    columns: u32,
    cells: Vec<CellState>,
}

impl Grid {
    /// A fully covered grid, the state of a board nobody has clicked yet.
    pub fn covered(rows: u32, columns: u32) -> Self {
        Self {
            rows,
            columns,
            cells: vec![CellState::Covered; rows as usize * columns as usize],
        }
    }

    fn index(&self, row: u32, column: u32) -> usize {
        assert!(
            row < self.rows && column < self.columns,
            "cell ({}, {}) outside {}x{} grid",
            row,
            column,
            self.rows,
            self.columns
        );
        row as usize * self.columns as usize + column as usize
    }

    pub fn count(&self, state: CellState) -> usize {
        self.cells.iter().filter(|&&cell| cell == state).count()
    }

    pub fn hazard_exposed(&self) -> bool {
        self.cells.contains(&CellState::Hazard)
    }

    /// True once a hazard is exposed or nothing is left covered.
    pub fn is_finished(&self) -> bool {
        self.hazard_exposed() || self.count(CellState::Covered) == 0
    }
}

impl CellGrid for Grid {
    fn dimensions(&self) -> (u32, u32) {
        (self.rows, self.columns)
    }

    fn get(&self, row: u32, column: u32) -> CellState {
        self.cells[self.index(row, column)]
    }

    fn set(&mut self, row: u32, column: u32, state: CellState) {
        let index = self.index(row, column);
        self.cells[index] = state;
    }
}

impl fmt::Display for Grid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.columns.max(1) as usize) {
            for cell in row {
                write!(f, "{}", cell)?;
            }
            writeln!(f)?;
        }
        Ok(())
    }
}
