#![forbid(unsafe_code)]

//! Repeating placement templates.
//!
//! A template is a list of equal-length rows of symbols. One symbol is the
//! *fill* symbol: only cells under it take part in automatic placement. Rows
//! repeat top to bottom down each page, restarting at row 0 on every page.
//!
//! ```
//! use slotpage_layout::Template;
//!
//! let template = Template::new(["#X#", "###"], 'X')?;
//! assert!(template.is_fill(1, 3));
//! assert!(!template.is_fill(4, 3));
//! assert!(template.is_fill(7, 3)); // row 2 repeats row 0
//! # Ok::<(), slotpage_layout::PlacementError>(())
//! ```

use slotpage_core::geometry::{Cell, GridSize};

use crate::PlacementError;

/// A validated repeating symbol pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Template {
    rows: Vec<String>,
    fill: char,
}

impl Template {
    /// Build a template from its rows and fill symbol.
    pub fn new<R: AsRef<str>>(
        rows: impl IntoIterator<Item = R>,
        fill: char,
    ) -> Result<Self, PlacementError> {
        let template = Self {
            rows: rows.into_iter().map(|r| r.as_ref().to_owned()).collect(),
            fill,
        };
        template.validate()?;
        Ok(template)
    }

    /// Check row lengths and the presence of at least one fill cell.
    ///
    /// Templates built with [`Template::new`] are already valid; deserialized
    /// templates should be checked before use.
    pub fn validate(&self) -> Result<(), PlacementError> {
        let Some(first) = self.rows.first() else {
            return Err(PlacementError::EmptyTemplate);
        };
        let expected = first.chars().count();
        for (row, text) in self.rows.iter().enumerate() {
            let found = text.chars().count();
            if found != expected {
                return Err(PlacementError::RaggedTemplate {
                    row,
                    expected,
                    found,
                });
            }
        }
        if !self.rows.iter().any(|r| r.contains(self.fill)) {
            return Err(PlacementError::EmptyTemplate);
        }
        Ok(())
    }

    /// Check that the rows match the surface row width and that at least one
    /// fill cell lands on a page of `grid`.
    pub fn validate_for(&self, grid: GridSize) -> Result<(), PlacementError> {
        self.validate()?;
        if self.width() != grid.width {
            return Err(PlacementError::TemplateWidth {
                expected: grid.width,
                found: self.width(),
            });
        }
        if self.fill_cells(grid).next().is_none() {
            return Err(PlacementError::EmptyTemplate);
        }
        Ok(())
    }

    /// Symbols per row.
    pub fn width(&self) -> usize {
        self.rows.first().map_or(0, |r| r.chars().count())
    }

    /// Number of rows before the pattern repeats.
    pub fn height(&self) -> usize {
        self.rows.len()
    }

    /// The fill symbol.
    pub fn fill(&self) -> char {
        self.fill
    }

    /// Rows as written.
    pub fn rows(&self) -> &[String] {
        &self.rows
    }

    /// Symbol under `cell` for a surface `width` cells wide.
    pub fn symbol_at(&self, cell: Cell, width: usize) -> Option<char> {
        if width == 0 || self.rows.is_empty() {
            return None;
        }
        let row = (cell / width) % self.rows.len();
        self.rows[row].chars().nth(cell % width)
    }

    /// Whether `cell` is under the fill symbol.
    pub fn is_fill(&self, cell: Cell, width: usize) -> bool {
        self.symbol_at(cell, width) == Some(self.fill)
    }

    /// Fill cells on one page of `grid`.
    pub fn fill_cells(&self, grid: GridSize) -> impl Iterator<Item = Cell> + '_ {
        (0..grid.capacity()).filter(move |&cell| self.is_fill(cell, grid.width))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_templates_without_fill() {
        assert_eq!(
            Template::new(["###", "###"], 'X').unwrap_err(),
            PlacementError::EmptyTemplate
        );
        assert_eq!(
            Template::new(Vec::<&str>::new(), 'X').unwrap_err(),
            PlacementError::EmptyTemplate
        );
    }

    #[test]
    fn rejects_ragged_rows() {
        assert_eq!(
            Template::new(["#X#", "##"], 'X').unwrap_err(),
            PlacementError::RaggedTemplate {
                row: 1,
                expected: 3,
                found: 2
            }
        );
    }

    #[test]
    fn width_must_match_surface() {
        let template = Template::new(["#X#"], 'X').unwrap();
        assert!(template.validate_for(GridSize::new(3, 4)).is_ok());
        assert_eq!(
            template.validate_for(GridSize::new(9, 1)).unwrap_err(),
            PlacementError::TemplateWidth {
                expected: 9,
                found: 3
            }
        );
    }

    #[test]
    fn fill_rows_below_the_surface_do_not_count() {
        let template = Template::new(["...", ".X."], 'X').unwrap();
        assert_eq!(
            template.validate_for(GridSize::new(3, 1)),
            Err(PlacementError::EmptyTemplate)
        );
    }

    #[test]
    fn rows_repeat_down_the_page() {
        let template = Template::new(["X..", ".X."], 'X').unwrap();
        let fills: Vec<_> = template.fill_cells(GridSize::new(3, 4)).collect();
        assert_eq!(fills, vec![0, 4, 6, 10]);
    }
}
