#![forbid(unsafe_code)]

//! The placement frontier.
//!
//! [`PlacementCache`] is the stability ledger of the engine: a FIFO queue of
//! free `(page, cell)` pairs that have been discovered but not yet handed to
//! an item, plus the saved position of the cursor that discovered them.
//!
//! When the queue runs dry it is refilled with the next batch from a
//! [`FreeCellCursor`] resumed at the saved position, so a refill never
//! rediscovers a pair that was already queued or consumed. Because entries are
//! only appended and popped from the front, an item resolved in one pass
//! keeps its cell in every later pass.
//!
//! A queued pair can go stale when a fixed item is placed on it after it was
//! discovered. Stale pairs are dropped when they reach the front of the queue
//! (unless the constraint overrides existing cells).

use std::collections::VecDeque;

use slotpage_core::geometry::{CellRef, GridSize};

use crate::{CellOccupancy, CursorState, FreeCellCursor, PlacementConstraint};

/// FIFO frontier of free cells.
#[derive(Debug, Clone)]
pub struct PlacementCache {
    pending: VecDeque<CellRef>,
    cursor: CursorState,
    consumed: usize,
    stale: usize,
}

impl PlacementCache {
    /// Empty cache positioned at the start of `constraint`'s first page.
    pub fn new(constraint: &PlacementConstraint) -> Self {
        Self {
            pending: VecDeque::new(),
            cursor: CursorState::start(constraint),
            consumed: 0,
            stale: 0,
        }
    }

    /// Pop the next free pair, refilling up to `batch` pairs when empty.
    ///
    /// Returns `None` when no further free cell can exist.
    pub fn next_free<O: CellOccupancy + ?Sized>(
        &mut self,
        constraint: &PlacementConstraint,
        grid: GridSize,
        items_per_page: usize,
        occupancy: &O,
        batch: usize,
    ) -> Option<CellRef> {
        loop {
            while let Some(at) = self.pending.pop_front() {
                if constraint.overrides_existing() || !occupancy.is_occupied(at) {
                    self.consumed += 1;
                    return Some(at);
                }
                self.stale += 1;
                slotpage_core::trace!(page = at.page, cell = at.cell, "dropping stale frontier cell");
            }
            if !self.refill(constraint, grid, items_per_page, occupancy, batch) {
                return None;
            }
        }
    }

    fn refill<O: CellOccupancy + ?Sized>(
        &mut self,
        constraint: &PlacementConstraint,
        grid: GridSize,
        items_per_page: usize,
        occupancy: &O,
        batch: usize,
    ) -> bool {
        let mut cursor =
            FreeCellCursor::resume(self.cursor, constraint, grid, items_per_page, occupancy);
        let before = self.pending.len();
        self.pending.extend(cursor.by_ref().take(batch.max(1)));
        self.cursor = cursor.state();
        let added = self.pending.len() - before;
        slotpage_core::trace!(added, page = self.cursor.page(), "frontier refilled");
        added > 0
    }

    /// Pairs discovered but not yet consumed.
    pub fn frontier(&self) -> impl Iterator<Item = CellRef> + '_ {
        self.pending.iter().copied()
    }

    /// Number of queued pairs.
    #[inline]
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Pairs handed out so far.
    #[inline]
    pub fn consumed(&self) -> usize {
        self.consumed
    }

    /// Pairs dropped because they became occupied before use.
    #[inline]
    pub fn stale(&self) -> usize {
        self.stale
    }

    /// Whether the underlying cursor can discover nothing more.
    #[inline]
    pub fn is_exhausted(&self) -> bool {
        self.pending.is_empty() && self.cursor.is_exhausted()
    }
}
