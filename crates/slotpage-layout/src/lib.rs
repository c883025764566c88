#![forbid(unsafe_code)]

//! Slot placement and pagination.
//!
//! This crate decides which page and which cell every content item occupies
//! on a fixed-size grid surface:
//!
//! - [`PlacementConstraint`] - where automatic placement may put items
//! - [`Template`] - a repeating symbolic pattern of placeable cells
//! - [`FreeCellCursor`] - lazy walk over free `(page, cell)` pairs
//! - [`PlacementCache`] - the frontier of not-yet-consumed free cells
//! - [`PaginationState`] - the item list, page cursor and assignments
//!
//! Placement is greedy and deterministic by insertion order. Once an item has
//! been given a `(page, cell)` it keeps it: appending more items only ever
//! consumes cells further along the frontier.
//!
//! ```
//! use slotpage_core::GridSize;
//! use slotpage_layout::{PaginationState, PlacementConstraint};
//!
//! let mut state = PaginationState::new(GridSize::new(9, 2), 10, PlacementConstraint::default())?;
//! for n in 0..25 {
//!     state.push(n);
//! }
//! state.place();
//! assert_eq!(state.last_page(), 3);
//! assert_eq!(state.page_items(2).len(), 5);
//! # Ok::<(), slotpage_layout::PlacementError>(())
//! ```

pub mod cache;
pub mod constraint;
pub mod cursor;
pub mod pagination;
pub mod template;

pub use cache::PlacementCache;
pub use constraint::{Direction, PlacementConstraint, PlacementConstraintBuilder};
pub use cursor::{CellOccupancy, CursorState, FreeCellCursor};
pub use pagination::{AssignmentOrigin, FixedScope, ItemAssignment, ItemId, PaginationState};
pub use slotpage_core::geometry::{Cell, CellRef, GridSize};
pub use template::Template;

use std::fmt;

/// Placement and navigation errors.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlacementError {
    /// `start >= end` with both bounds set.
    InvalidConstraint { start: Cell, end: Cell },
    /// A template with no rows or no fill symbol.
    EmptyTemplate,
    /// A template row whose length differs from the first row.
    RaggedTemplate {
        row: usize,
        expected: usize,
        found: usize,
    },
    /// A template whose row width does not match the surface row width.
    TemplateWidth { expected: usize, found: usize },
    /// A cell index outside the surface.
    SlotOutOfBounds { cell: Cell, capacity: usize },
    /// A page at or beyond the last page.
    PageOutOfRange { page: u32, last_page: u32 },
    /// `items_per_page` of zero.
    ZeroItemsPerPage,
}

impl fmt::Display for PlacementError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidConstraint { start, end } => {
                write!(f, "placement start cell {start} must be before end cell {end}")
            }
            Self::EmptyTemplate => write!(f, "template has no fill cells"),
            Self::RaggedTemplate {
                row,
                expected,
                found,
            } => write!(
                f,
                "template row {row} has {found} symbols, expected {expected}"
            ),
            Self::TemplateWidth { expected, found } => write!(
                f,
                "template rows are {found} wide but the surface is {expected} wide"
            ),
            Self::SlotOutOfBounds { cell, capacity } => {
                write!(f, "cell {cell} is outside a surface of {capacity} cells")
            }
            Self::PageOutOfRange { page, last_page } => {
                write!(f, "page {page} is out of range (page count {last_page})")
            }
            Self::ZeroItemsPerPage => write!(f, "items per page must be positive"),
        }
    }
}

impl std::error::Error for PlacementError {}
