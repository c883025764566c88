#![forbid(unsafe_code)]

//! Free-cell discovery.
//!
//! [`FreeCellCursor`] walks a [`PlacementConstraint`] page by page and yields
//! every `(page, cell)` pair that automatic placement may use. It is lazy,
//! and its position can be saved as a [`CursorState`] and resumed later,
//! which is how [`PlacementCache`](crate::PlacementCache) keeps its frontier
//! moving forward across placement passes.
//!
//! # Scan order
//!
//! - Horizontal: `start, start + 1, ...` up to the scan limit.
//! - Vertical: down the column of `start` in steps of the row width, then
//!   down the column of `start + 1`, until the end of `start`'s row.
//! - Template: as horizontal, but only the template's fill cells qualify.
//!
//! A cell is skipped if it is reserved, or occupied while the constraint does
//! not override existing cells. The page ends when the scan passes the limit
//! or when the page has accepted `effective_capacity` cells.
//!
//! # Invariants
//!
//! 1. A cursor never yields the same pair twice (pages only increase and the
//!    scan position only advances within a page).
//! 2. At most `effective_capacity` pairs are yielded per page.
//! 3. The cursor ends once a page yields nothing and no later page can differ
//!    (the page is past the occupancy horizon).

use std::collections::BTreeSet;

use slotpage_core::geometry::{Cell, CellRef, GridSize};

use crate::{Direction, PlacementConstraint};

/// Read-only view of which cells already hold something.
pub trait CellOccupancy {
    /// Whether `at` is occupied.
    fn is_occupied(&self, at: CellRef) -> bool;

    /// Last page whose occupancy may differ from the pages after it.
    ///
    /// `None` means occupancy is the same on every page.
    fn page_horizon(&self) -> Option<u32>;
}

impl CellOccupancy for () {
    fn is_occupied(&self, _at: CellRef) -> bool {
        false
    }

    fn page_horizon(&self) -> Option<u32> {
        None
    }
}

impl CellOccupancy for BTreeSet<CellRef> {
    fn is_occupied(&self, at: CellRef) -> bool {
        self.contains(&at)
    }

    fn page_horizon(&self) -> Option<u32> {
        self.last().map(|at| at.page)
    }
}

impl<O: CellOccupancy + ?Sized> CellOccupancy for &O {
    fn is_occupied(&self, at: CellRef) -> bool {
        (**self).is_occupied(at)
    }

    fn page_horizon(&self) -> Option<u32> {
        (**self).page_horizon()
    }
}

/// Saved cursor position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CursorState {
    page: u32,
    column_origin: Cell,
    position: Cell,
    accepted: usize,
    exhausted: bool,
}

impl CursorState {
    /// Position at the beginning of page 0.
    pub fn start(constraint: &PlacementConstraint) -> Self {
        let start = constraint.start();
        Self {
            page: 0,
            column_origin: start,
            position: start,
            accepted: 0,
            exhausted: false,
        }
    }

    /// Page currently being scanned.
    #[inline]
    pub fn page(&self) -> u32 {
        self.page
    }

    /// Whether the cursor can yield nothing more.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.exhausted
    }
}

/// Lazy sequence of free `(page, cell)` pairs.
#[derive(Debug)]
pub struct FreeCellCursor<'a, O: ?Sized> {
    constraint: &'a PlacementConstraint,
    grid: GridSize,
    capacity: usize,
    occupancy: &'a O,
    state: CursorState,
}

impl<'a, O: CellOccupancy + ?Sized> FreeCellCursor<'a, O> {
    /// Cursor at the start of page 0.
    pub fn new(
        constraint: &'a PlacementConstraint,
        grid: GridSize,
        items_per_page: usize,
        occupancy: &'a O,
    ) -> Self {
        Self::resume(
            CursorState::start(constraint),
            constraint,
            grid,
            items_per_page,
            occupancy,
        )
    }

    /// Cursor continuing from a saved position.
    pub fn resume(
        state: CursorState,
        constraint: &'a PlacementConstraint,
        grid: GridSize,
        items_per_page: usize,
        occupancy: &'a O,
    ) -> Self {
        Self {
            constraint,
            grid,
            capacity: constraint.effective_capacity(items_per_page),
            occupancy,
            state,
        }
    }

    /// Current position, for [`resume`](Self::resume).
    #[inline]
    pub fn state(&self) -> CursorState {
        self.state
    }

    /// Rewind to the start of page 0.
    pub fn restart(&mut self) {
        self.state = CursorState::start(self.constraint);
    }

    /// Items a page accepts under this cursor's constraint.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.capacity
    }

    fn accepts(&self, at: CellRef) -> bool {
        if self.constraint.is_reserved(at.cell) {
            return false;
        }
        if let Some(template) = self.constraint.template()
            && !template.is_fill(at.cell, self.grid.width)
        {
            return false;
        }
        self.constraint.overrides_existing() || !self.occupancy.is_occupied(at)
    }

    fn vertical(&self) -> bool {
        self.constraint.template().is_none() && self.constraint.direction() == Direction::Vertical
    }

    /// Cell under the scan position, or `None` when the page is scanned out.
    fn current_cell(&self, limit: Cell) -> Option<Cell> {
        let position = self.state.position;
        if self.vertical() {
            let start = self.constraint.start();
            let width = self.grid.width.max(1);
            let origin = self.state.column_origin;
            let wrapped = origin > start && origin % width == 0;
            if origin > limit || wrapped {
                return None;
            }
        }
        (position <= limit).then_some(position)
    }

    fn step(&mut self, limit: Cell) {
        if self.vertical() {
            let next = self.state.position + self.grid.width.max(1);
            if next > limit {
                self.state.column_origin += 1;
                self.state.position = self.state.column_origin;
            } else {
                self.state.position = next;
            }
        } else {
            self.state.position += 1;
        }
    }

    fn next_page(&mut self) {
        let beyond_horizon = self
            .occupancy
            .page_horizon()
            .is_none_or(|horizon| self.state.page > horizon);
        if self.state.accepted == 0 && beyond_horizon {
            self.state.exhausted = true;
            return;
        }
        let start = self.constraint.start();
        self.state.page += 1;
        self.state.column_origin = start;
        self.state.position = start;
        self.state.accepted = 0;
    }
}

impl<O: CellOccupancy + ?Sized> Iterator for FreeCellCursor<'_, O> {
    type Item = CellRef;

    fn next(&mut self) -> Option<CellRef> {
        let Some(limit) = self.constraint.scan_limit(self.grid) else {
            self.state.exhausted = true;
            return None;
        };
        loop {
            if self.state.exhausted {
                return None;
            }
            if self.state.accepted >= self.capacity {
                self.next_page();
                continue;
            }
            let Some(cell) = self.current_cell(limit) else {
                self.next_page();
                continue;
            };
            self.step(limit);
            let at = CellRef::new(self.state.page, cell);
            if self.accepts(at) {
                self.state.accepted += 1;
                return Some(at);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Template;

    fn take(
        constraint: &PlacementConstraint,
        grid: GridSize,
        per_page: usize,
        n: usize,
    ) -> Vec<(u32, Cell)> {
        FreeCellCursor::new(constraint, grid, per_page, &())
            .take(n)
            .map(|at| (at.page, at.cell))
            .collect()
    }

    #[test]
    fn horizontal_fills_page_then_advances() {
        let c = PlacementConstraint::default();
        let pairs = take(&c, GridSize::new(3, 1), 3, 5);
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (1, 0), (1, 1)]);
    }

    #[test]
    fn items_per_page_caps_before_surface_end() {
        let c = PlacementConstraint::default();
        let pairs = take(&c, GridSize::new(9, 1), 4, 6);
        assert_eq!(pairs, vec![(0, 0), (0, 1), (0, 2), (0, 3), (1, 0), (1, 1)]);
    }

    #[test]
    fn reserved_cells_are_skipped() {
        let c = PlacementConstraint::builder().reserve([1, 2]).build().unwrap();
        let pairs = take(&c, GridSize::new(9, 1), 9, 8);
        let page0: Vec<_> = pairs.iter().filter(|p| p.0 == 0).map(|p| p.1).collect();
        assert_eq!(page0, vec![0, 3, 4, 5, 6, 7, 8]);
        assert_eq!(pairs[7], (1, 0));
    }

    #[test]
    fn start_and_end_bound_each_page() {
        let c = PlacementConstraint::builder().start(2).end(5).build().unwrap();
        let pairs = take(&c, GridSize::new(9, 1), 9, 4);
        assert_eq!(pairs, vec![(0, 2), (0, 3), (0, 4), (1, 2)]);
    }

    #[test]
    fn end_cell_picks_up_slack_from_reserved() {
        let c = PlacementConstraint::builder()
            .start(0)
            .end(3)
            .reserve([1])
            .build()
            .unwrap();
        let pairs = take(&c, GridSize::new(9, 1), 9, 4);
        assert_eq!(pairs, vec![(0, 0), (0, 2), (0, 3), (1, 0)]);
    }

    #[test]
    fn vertical_walks_columns() {
        let c = PlacementConstraint::builder()
            .direction(Direction::Vertical)
            .build()
            .unwrap();
        let pairs = take(&c, GridSize::new(3, 2), 6, 7);
        assert_eq!(
            pairs,
            vec![(0, 0), (0, 3), (0, 1), (0, 4), (0, 2), (0, 5), (1, 0)]
        );
    }

    #[test]
    fn vertical_from_offset_start_stops_at_row_end() {
        let c = PlacementConstraint::builder()
            .start(1)
            .direction(Direction::Vertical)
            .build()
            .unwrap();
        let pairs = take(&c, GridSize::new(3, 2), 6, 5);
        assert_eq!(pairs, vec![(0, 1), (0, 4), (0, 2), (0, 5), (1, 1)]);
    }

    #[test]
    fn template_only_yields_fill_cells() {
        let c = PlacementConstraint::builder()
            .template(Template::new(["#X#", "###"], 'X').unwrap())
            .build()
            .unwrap();
        let pairs = take(&c, GridSize::new(3, 2), 6, 3);
        assert_eq!(pairs, vec![(0, 1), (1, 1), (2, 1)]);
    }

    #[test]
    fn occupied_cells_are_skipped_unless_overriding() {
        let grid = GridSize::new(3, 1);
        let occupied: BTreeSet<CellRef> = [CellRef::new(0, 0), CellRef::new(1, 1)].into();
        let c = PlacementConstraint::default();
        let pairs: Vec<_> = FreeCellCursor::new(&c, grid, 3, &occupied).take(4).collect();
        assert_eq!(
            pairs,
            vec![
                CellRef::new(0, 1),
                CellRef::new(0, 2),
                CellRef::new(1, 0),
                CellRef::new(1, 2)
            ]
        );

        let over = PlacementConstraint::builder()
            .override_existing(true)
            .build()
            .unwrap();
        let first = FreeCellCursor::new(&over, grid, 3, &occupied).next();
        assert_eq!(first, Some(CellRef::new(0, 0)));
    }

    #[test]
    fn exhausts_when_nothing_can_ever_be_free() {
        let c = PlacementConstraint::builder().reserve([0, 1, 2]).build().unwrap();
        let mut cursor = FreeCellCursor::new(&c, GridSize::new(3, 1), 3, &());
        assert_eq!(cursor.next(), None);
        assert!(cursor.state().is_exhausted());
    }

    #[test]
    fn fully_occupied_pages_before_horizon_are_crossed() {
        let grid = GridSize::new(2, 1);
        let occupied: BTreeSet<CellRef> = (0..3)
            .flat_map(|page| [CellRef::new(page, 0), CellRef::new(page, 1)])
            .collect();
        let c = PlacementConstraint::default();
        let first = FreeCellCursor::new(&c, grid, 2, &occupied).next();
        assert_eq!(first, Some(CellRef::new(3, 0)));
    }

    #[test]
    fn resume_continues_where_it_stopped() {
        let c = PlacementConstraint::default();
        let grid = GridSize::new(3, 1);
        let mut first = FreeCellCursor::new(&c, grid, 3, &());
        let a: Vec<_> = first.by_ref().take(2).collect();
        let b: Vec<_> = FreeCellCursor::resume(first.state(), &c, grid, 3, &())
            .take(2)
            .collect();
        assert_eq!(a, vec![CellRef::new(0, 0), CellRef::new(0, 1)]);
        assert_eq!(b, vec![CellRef::new(0, 2), CellRef::new(1, 0)]);
    }

    #[test]
    fn restart_rewinds() {
        let c = PlacementConstraint::default();
        let mut cursor = FreeCellCursor::new(&c, GridSize::new(3, 1), 3, &());
        cursor.next();
        cursor.next();
        cursor.restart();
        assert_eq!(cursor.next(), Some(CellRef::new(0, 0)));
    }
}
