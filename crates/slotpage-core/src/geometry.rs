#![forbid(unsafe_code)]

//! Cell geometry for fixed-size grid surfaces.
//!
//! A surface is a row-major grid `width` cells wide and `rows` cells tall.
//! Cells are addressed by a linear index `row * width + column`.

use std::fmt;

/// Linear index of one slot on a surface (`0..capacity`).
pub type Cell = usize;

/// A cell on a specific page.
///
/// Ordering is page-major, so sorted collections of `CellRef` walk pages
/// front to back and cells in index order within a page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct CellRef {
    /// Zero-based page.
    pub page: u32,
    /// Cell within the page.
    pub cell: Cell,
}

impl CellRef {
    /// Create a new page/cell pair.
    #[inline]
    pub const fn new(page: u32, cell: Cell) -> Self {
        Self { page, cell }
    }
}

impl fmt::Display for CellRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.page, self.cell)
    }
}

/// Dimensions of a grid surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct GridSize {
    /// Cells per row.
    pub width: usize,
    /// Number of rows.
    pub rows: usize,
}

impl GridSize {
    /// Create a grid of `width` columns and `rows` rows.
    #[inline]
    pub const fn new(width: usize, rows: usize) -> Self {
        Self { width, rows }
    }

    /// Total number of cells.
    #[inline]
    pub const fn capacity(&self) -> usize {
        self.width * self.rows
    }

    /// Whether the grid has no cells.
    #[inline]
    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.rows == 0
    }

    /// Whether `cell` addresses a slot on this grid.
    #[inline]
    pub const fn contains(&self, cell: Cell) -> bool {
        cell < self.capacity()
    }

    /// Cell at `(row, column)`, or `None` if either is out of range.
    #[inline]
    pub const fn cell_at(&self, row: usize, column: usize) -> Option<Cell> {
        if row < self.rows && column < self.width {
            Some(row * self.width + column)
        } else {
            None
        }
    }

    /// `(row, column)` of a cell. The cell is not range-checked.
    #[inline]
    pub const fn row_col(&self, cell: Cell) -> (usize, usize) {
        if self.width == 0 {
            return (0, 0);
        }
        (cell / self.width, cell % self.width)
    }

    /// Row of a cell.
    #[inline]
    pub const fn row_of(&self, cell: Cell) -> usize {
        self.row_col(cell).0
    }

    /// Column of a cell.
    #[inline]
    pub const fn column_of(&self, cell: Cell) -> usize {
        self.row_col(cell).1
    }

    /// All cells of one row, left to right. Empty if `row` is out of range.
    pub fn row_cells(&self, row: usize) -> impl Iterator<Item = Cell> + use<> {
        if row < self.rows {
            row * self.width..(row + 1) * self.width
        } else {
            0..0
        }
    }

    /// All cells of one column, top to bottom. Empty if `column` is out of range.
    pub fn column_cells(&self, column: usize) -> impl Iterator<Item = Cell> + use<> {
        let width = self.width;
        let rows = if column < width { self.rows } else { 0 };
        (0..rows).map(move |row| row * width + column)
    }

    /// Cells on the outer ring of the grid, in index order.
    pub fn border_cells(&self) -> impl Iterator<Item = Cell> + use<> {
        let Self { width, rows } = *self;
        (0..self.capacity()).filter(move |&cell| {
            let (row, column) = (cell / width, cell % width);
            row == 0 || row + 1 == rows || column == 0 || column + 1 == width
        })
    }
}

impl Default for GridSize {
    /// Three rows of nine cells.
    fn default() -> Self {
        Self::new(9, 3)
    }
}

impl fmt::Display for GridSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.rows)
    }
}
