#![forbid(unsafe_code)]

//! Placement constraints.
//!
//! A [`PlacementConstraint`] describes how free cells are discovered: where
//! the scan starts and ends on each page, in which direction it walks, which
//! cells are never used, whether occupied cells may be overwritten, and an
//! optional [`Template`] that restricts placement to its fill cells.
//!
//! # Capacity
//!
//! [`PlacementConstraint::effective_capacity`] caps how many items a page
//! accepts:
//!
//! | `end` | `reserved` | capacity |
//! |---|---|---|
//! | set | any | `end - start` |
//! | unset | non-empty | `items_per_page - reserved.len()` |
//! | unset | empty | `items_per_page` |

use std::collections::BTreeSet;

use slotpage_core::geometry::{Cell, GridSize};

use crate::{PlacementError, Template};

/// Scan order for free cells.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Direction {
    /// Left to right, then down.
    #[default]
    Horizontal,
    /// Top to bottom, then right.
    Vertical,
}

/// Immutable description of where automatic placement may put items.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct PlacementConstraint {
    start: Option<Cell>,
    end: Option<Cell>,
    direction: Direction,
    reserved: BTreeSet<Cell>,
    override_existing: bool,
    template: Option<Template>,
}

impl PlacementConstraint {
    /// Start building a constraint.
    pub fn builder() -> PlacementConstraintBuilder {
        PlacementConstraintBuilder::default()
    }

    /// First cell scanned on each page (defaults to 0).
    #[inline]
    pub fn start(&self) -> Cell {
        self.start.unwrap_or(0)
    }

    /// Explicit start cell, if one was set.
    #[inline]
    pub fn start_cell(&self) -> Option<Cell> {
        self.start
    }

    /// Inclusive end of the scan on each page.
    #[inline]
    pub fn end(&self) -> Option<Cell> {
        self.end
    }

    /// Scan direction. Ignored when a template is present.
    #[inline]
    pub fn direction(&self) -> Direction {
        self.direction
    }

    /// Cells never used for automatic placement.
    #[inline]
    pub fn reserved(&self) -> &BTreeSet<Cell> {
        &self.reserved
    }

    /// Whether `cell` is reserved.
    #[inline]
    pub fn is_reserved(&self, cell: Cell) -> bool {
        self.reserved.contains(&cell)
    }

    /// Whether automatic placement may land on occupied cells.
    #[inline]
    pub fn overrides_existing(&self) -> bool {
        self.override_existing
    }

    /// Repeating template, if any.
    #[inline]
    pub fn template(&self) -> Option<&Template> {
        self.template.as_ref()
    }

    /// Items a single page accepts.
    pub fn effective_capacity(&self, items_per_page: usize) -> usize {
        match self.end {
            Some(end) => end.saturating_sub(self.start()),
            None if !self.reserved.is_empty() => {
                items_per_page.saturating_sub(self.reserved.len())
            }
            None => items_per_page,
        }
    }

    /// Check internal consistency.
    ///
    /// Constraints from the builder are already consistent; deserialized
    /// constraints should be checked before use.
    pub fn validate(&self) -> Result<(), PlacementError> {
        if let (Some(start), Some(end)) = (self.start, self.end)
            && start >= end
        {
            return Err(PlacementError::InvalidConstraint { start, end });
        }
        if let Some(template) = &self.template {
            template.validate()?;
        }
        Ok(())
    }

    /// Check the constraint against a concrete surface.
    pub fn validate_for(&self, grid: GridSize) -> Result<(), PlacementError> {
        self.validate()?;
        let capacity = grid.capacity();
        let cells = self
            .start
            .iter()
            .chain(self.end.iter())
            .chain(self.reserved.iter());
        for &cell in cells {
            if !grid.contains(cell) {
                return Err(PlacementError::SlotOutOfBounds { cell, capacity });
            }
        }
        if let Some(template) = &self.template {
            template.validate_for(grid)?;
        }
        Ok(())
    }

    /// Last cell the scan may visit on a page of `grid`.
    pub(crate) fn scan_limit(&self, grid: GridSize) -> Option<Cell> {
        let last = grid.capacity().checked_sub(1)?;
        Some(self.end.map_or(last, |end| end.min(last)))
    }
}

/// Builder for [`PlacementConstraint`].
#[derive(Debug, Clone, Default)]
pub struct PlacementConstraintBuilder {
    inner: PlacementConstraint,
}

impl PlacementConstraintBuilder {
    /// First cell scanned on each page.
    #[must_use]
    pub fn start(mut self, cell: Cell) -> Self {
        self.inner.start = Some(cell);
        self
    }

    /// Inclusive last cell scanned on each page.
    #[must_use]
    pub fn end(mut self, cell: Cell) -> Self {
        self.inner.end = Some(cell);
        self
    }

    /// Scan direction.
    #[must_use]
    pub fn direction(mut self, direction: Direction) -> Self {
        self.inner.direction = direction;
        self
    }

    /// Reserve cells so automatic placement skips them.
    #[must_use]
    pub fn reserve(mut self, cells: impl IntoIterator<Item = Cell>) -> Self {
        self.inner.reserved.extend(cells);
        self
    }

    /// Allow placement onto occupied cells.
    #[must_use]
    pub fn override_existing(mut self, enabled: bool) -> Self {
        self.inner.override_existing = enabled;
        self
    }

    /// Restrict placement to a template's fill cells.
    #[must_use]
    pub fn template(mut self, template: Template) -> Self {
        self.inner.template = Some(template);
        self
    }

    /// Validate and finish.
    pub fn build(self) -> Result<PlacementConstraint, PlacementError> {
        self.inner.validate()?;
        Ok(self.inner)
    }
}
