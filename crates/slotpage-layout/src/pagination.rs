#![forbid(unsafe_code)]

//! Pagination state: items, assignments, and the page cursor.
//!
//! [`PaginationState`] owns two kinds of content:
//!
//! - *paginated* items, appended with [`push`](PaginationState::push) and
//!   resolved to a `(page, cell)` by [`place`](PaginationState::place);
//! - *fixed* items, put on an explicit `(page, cell)` by the caller with
//!   [`set_fixed`](PaginationState::set_fixed). Fixed items occupy their cell,
//!   so automatic placement flows around them unless the constraint overrides
//!   existing cells.
//!
//! # Stability
//!
//! A placement pass only visits items without an assignment, in insertion
//! order, and feeds them from the [`PlacementCache`] frontier. Assignments are
//! never revoked by a pass, so appending items never moves items that were
//! already placed. The one exception is explicit eviction: a fixed item put on
//! a cell held by a resolved item unassigns that item, and the next pass gives
//! it a fresh frontier cell.
//!
//! # Page count
//!
//! [`last_page`](PaginationState::last_page) is a page count. Once every item
//! is resolved it is one past the highest page holding a resolved item; before
//! that it is at least `ceil(items / effective_capacity)`. It is never zero.

use std::collections::{BTreeMap, HashMap};
use std::fmt;

use slotpage_core::geometry::{Cell, CellRef, GridSize};

use crate::{CellOccupancy, PlacementCache, PlacementConstraint, PlacementError};

/// Stable identifier of an item inside one [`PaginationState`].
///
/// Identifiers increase with insertion order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(u64);

impl ItemId {
    /// Raw identifier value.
    #[inline]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// How long a fixed item stays on its cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FixedScope {
    /// Only on the page it was set on.
    #[default]
    Page,
    /// Occupies its cell on every page for placement purposes and moves with
    /// the viewer on page changes when data transfer is enabled.
    Sticky,
}

/// Where an assignment came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignmentOrigin {
    /// Chosen by a placement pass.
    Resolved,
    /// Put there explicitly by the caller.
    Fixed(FixedScope),
}

/// An item's resolved position.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ItemAssignment {
    pub item: ItemId,
    pub at: CellRef,
    pub origin: AssignmentOrigin,
}

impl ItemAssignment {
    /// Page of the assignment.
    #[inline]
    pub fn page(&self) -> u32 {
        self.at.page
    }

    /// Cell of the assignment.
    #[inline]
    pub fn cell(&self) -> Cell {
        self.at.cell
    }
}

#[derive(Debug, Clone)]
struct FixedEntry<T> {
    id: ItemId,
    item: T,
    scope: FixedScope,
}

/// Occupancy as seen by the placement pass: fixed cells on their page and
/// sticky cells on every page.
struct FixedOccupancy<'a, T> {
    fixed: &'a BTreeMap<CellRef, FixedEntry<T>>,
    sticky: &'a BTreeMap<Cell, usize>,
}

impl<T> CellOccupancy for FixedOccupancy<'_, T> {
    fn is_occupied(&self, at: CellRef) -> bool {
        self.sticky.contains_key(&at.cell) || self.fixed.contains_key(&at)
    }

    fn page_horizon(&self) -> Option<u32> {
        self.fixed
            .iter()
            .rev()
            .find(|(_, entry)| entry.scope == FixedScope::Page)
            .map(|(at, _)| at.page)
    }
}

/// Items, their assignments, and the current page.
#[derive(Debug, Clone)]
pub struct PaginationState<T> {
    grid: GridSize,
    items_per_page: usize,
    constraint: PlacementConstraint,
    current_page: u32,
    next_id: u64,
    items: BTreeMap<ItemId, T>,
    assignments: HashMap<ItemId, CellRef>,
    resolved_at: BTreeMap<CellRef, ItemId>,
    fixed: BTreeMap<CellRef, FixedEntry<T>>,
    fixed_ids: HashMap<ItemId, CellRef>,
    sticky_cells: BTreeMap<Cell, usize>,
    cache: Option<PlacementCache>,
}

impl<T> PaginationState<T> {
    /// Create an empty state for a surface of `grid` size.
    pub fn new(
        grid: GridSize,
        items_per_page: usize,
        constraint: PlacementConstraint,
    ) -> Result<Self, PlacementError> {
        if items_per_page == 0 {
            return Err(PlacementError::ZeroItemsPerPage);
        }
        constraint.validate_for(grid)?;
        Ok(Self {
            grid,
            items_per_page,
            constraint,
            current_page: 0,
            next_id: 0,
            items: BTreeMap::new(),
            assignments: HashMap::new(),
            resolved_at: BTreeMap::new(),
            fixed: BTreeMap::new(),
            fixed_ids: HashMap::new(),
            sticky_cells: BTreeMap::new(),
            cache: None,
        })
    }

    /// Surface dimensions.
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.grid
    }

    /// Configured items per page.
    #[inline]
    pub fn items_per_page(&self) -> usize {
        self.items_per_page
    }

    /// Placement constraint.
    #[inline]
    pub fn constraint(&self) -> &PlacementConstraint {
        &self.constraint
    }

    /// Items a page accepts after the constraint is applied.
    #[inline]
    pub fn effective_capacity(&self) -> usize {
        self.constraint.effective_capacity(self.items_per_page)
    }

    fn allocate_id(&mut self) -> ItemId {
        let id = ItemId(self.next_id);
        self.next_id += 1;
        id
    }

    // -- paginated items ----------------------------------------------------

    /// Append an item for automatic placement.
    pub fn push(&mut self, item: T) -> ItemId {
        let id = self.allocate_id();
        self.items.insert(id, item);
        id
    }

    /// Append several items, returning their identifiers in order.
    pub fn extend(&mut self, items: impl IntoIterator<Item = T>) -> Vec<ItemId> {
        items.into_iter().map(|item| self.push(item)).collect()
    }

    /// Number of paginated items.
    #[inline]
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether there are no paginated items.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// Paginated items waiting for a placement pass.
    pub fn unassigned(&self) -> usize {
        self.items.len() - self.assignments.len()
    }

    /// Paginated items in insertion order.
    pub fn items(&self) -> impl Iterator<Item = (ItemId, &T)> + '_ {
        self.items.iter().map(|(id, item)| (*id, item))
    }

    /// Item by identifier, paginated or fixed.
    pub fn get(&self, id: ItemId) -> Option<&T> {
        self.items.get(&id).or_else(|| {
            self.fixed_ids
                .get(&id)
                .and_then(|at| self.fixed.get(at))
                .map(|entry| &entry.item)
        })
    }

    /// Mutable item by identifier, paginated or fixed.
    pub fn get_mut(&mut self, id: ItemId) -> Option<&mut T> {
        if let Some(item) = self.items.get_mut(&id) {
            return Some(item);
        }
        let at = *self.fixed_ids.get(&id)?;
        self.fixed.get_mut(&at).map(|entry| &mut entry.item)
    }

    /// Remove an item. Its cell is not reused by later passes.
    pub fn remove(&mut self, id: ItemId) -> Option<T> {
        if let Some(item) = self.items.remove(&id) {
            if let Some(at) = self.assignments.remove(&id) {
                self.resolved_at.remove(&at);
            }
            return Some(item);
        }
        let at = self.fixed_ids.get(&id).copied()?;
        self.remove_fixed(at)
    }

    /// Assignment of an item, if it has one.
    pub fn assignment(&self, id: ItemId) -> Option<ItemAssignment> {
        if let Some(&at) = self.assignments.get(&id) {
            return Some(ItemAssignment {
                item: id,
                at,
                origin: AssignmentOrigin::Resolved,
            });
        }
        let &at = self.fixed_ids.get(&id)?;
        let entry = self.fixed.get(&at)?;
        Some(ItemAssignment {
            item: id,
            at,
            origin: AssignmentOrigin::Fixed(entry.scope),
        })
    }

    // -- fixed items ---------------------------------------------------------

    /// Put an item on an explicit cell.
    ///
    /// Replaces any fixed item already there. Unless the constraint overrides
    /// existing cells, a resolved item on the same cell is evicted and will be
    /// re-placed by the next pass; for [`FixedScope::Sticky`] this applies to
    /// the cell on every page.
    pub fn set_fixed(
        &mut self,
        at: CellRef,
        item: T,
        scope: FixedScope,
    ) -> Result<ItemId, PlacementError> {
        if !self.grid.contains(at.cell) {
            return Err(PlacementError::SlotOutOfBounds {
                cell: at.cell,
                capacity: self.grid.capacity(),
            });
        }
        self.remove_fixed(at);
        if !self.constraint.overrides_existing() {
            match scope {
                FixedScope::Page => self.evict(at),
                FixedScope::Sticky => {
                    let hits: Vec<CellRef> = self
                        .resolved_at
                        .keys()
                        .filter(|held| held.cell == at.cell)
                        .copied()
                        .collect();
                    for held in hits {
                        self.evict(held);
                    }
                }
            }
        }
        let id = self.allocate_id();
        if scope == FixedScope::Sticky {
            *self.sticky_cells.entry(at.cell).or_default() += 1;
        }
        self.fixed.insert(at, FixedEntry { id, item, scope });
        self.fixed_ids.insert(id, at);
        Ok(id)
    }

    fn evict(&mut self, at: CellRef) {
        if let Some(id) = self.resolved_at.remove(&at) {
            self.assignments.remove(&id);
            slotpage_core::debug!(item = id.get(), page = at.page, cell = at.cell, "evicted resolved item");
        }
    }

    /// Remove the fixed item on `at`.
    pub fn remove_fixed(&mut self, at: CellRef) -> Option<T> {
        let entry = self.fixed.remove(&at)?;
        self.fixed_ids.remove(&entry.id);
        if entry.scope == FixedScope::Sticky
            && let Some(count) = self.sticky_cells.get_mut(&at.cell)
        {
            *count -= 1;
            if *count == 0 {
                self.sticky_cells.remove(&at.cell);
            }
        }
        Some(entry.item)
    }

    /// Fixed item on `at`.
    pub fn fixed_at(&self, at: CellRef) -> Option<&T> {
        self.fixed.get(&at).map(|entry| &entry.item)
    }

    /// Fixed items on `page`, in cell order.
    pub fn fixed_items(&self, page: u32) -> Vec<(Cell, ItemId, &T)> {
        self.fixed
            .range(CellRef::new(page, 0)..=CellRef::new(page, Cell::MAX))
            .map(|(at, entry)| (at.cell, entry.id, &entry.item))
            .collect()
    }

    /// Move sticky items from page `from` to page `to`.
    ///
    /// Items whose cell on `to` already holds a fixed item stay behind.
    /// Returns the number of items moved.
    pub fn carry_sticky(&mut self, from: u32, to: u32) -> usize {
        if from == to {
            return 0;
        }
        let candidates: Vec<CellRef> = self
            .fixed
            .range(CellRef::new(from, 0)..=CellRef::new(from, Cell::MAX))
            .filter(|(at, entry)| {
                entry.scope == FixedScope::Sticky
                    && !self.fixed.contains_key(&CellRef::new(to, at.cell))
            })
            .map(|(at, _)| *at)
            .collect();
        for at in &candidates {
            if let Some(entry) = self.fixed.remove(at) {
                let dest = CellRef::new(to, at.cell);
                self.fixed_ids.insert(entry.id, dest);
                self.fixed.insert(dest, entry);
            }
        }
        candidates.len()
    }

    // -- placement -----------------------------------------------------------

    /// Resolve every unassigned item, in insertion order.
    ///
    /// Items already assigned are skipped. Items for which no free cell can
    /// exist stay unassigned; that is not an error. Returns the number of
    /// items placed by this pass.
    pub fn place(&mut self) -> usize {
        let pending: Vec<ItemId> = self
            .items
            .keys()
            .filter(|id| !self.assignments.contains_key(id))
            .copied()
            .collect();
        if pending.is_empty() {
            return 0;
        }

        let _span = slotpage_core::trace_span!("placement_pass", pending = pending.len()).entered();
        let cache = self
            .cache
            .get_or_insert_with(|| PlacementCache::new(&self.constraint));
        let occupancy = FixedOccupancy {
            fixed: &self.fixed,
            sticky: &self.sticky_cells,
        };

        let mut placed = 0;
        let mut remaining = pending.len();
        for id in pending {
            let Some(at) = cache.next_free(
                &self.constraint,
                self.grid,
                self.items_per_page,
                &occupancy,
                remaining,
            ) else {
                break;
            };
            self.assignments.insert(id, at);
            self.resolved_at.insert(at, id);
            placed += 1;
            remaining -= 1;
        }

        slotpage_core::trace!(placed, unplaced = remaining, "placement pass complete");
        placed
    }

    /// The frontier cache, once a pass has created it.
    pub fn cache(&self) -> Option<&PlacementCache> {
        self.cache.as_ref()
    }

    // -- lookup --------------------------------------------------------------

    /// Item shown on `at`: a resolved item first, then a fixed one.
    pub fn item_at(&self, at: CellRef) -> Option<&T> {
        self.resolved_at
            .get(&at)
            .and_then(|id| self.items.get(id))
            .or_else(|| self.fixed_at(at))
    }

    /// Paginated item resolved to `at`, ignoring fixed items.
    pub fn resolved_item(&self, at: CellRef) -> Option<&T> {
        self.resolved_at.get(&at).and_then(|id| self.items.get(id))
    }

    /// Identifier of the item shown on `at`.
    pub fn id_at(&self, at: CellRef) -> Option<ItemId> {
        self.resolved_at
            .get(&at)
            .copied()
            .or_else(|| self.fixed.get(&at).map(|entry| entry.id))
    }

    /// Resolved items on `page`, in cell order.
    pub fn page_items(&self, page: u32) -> Vec<(Cell, ItemId, &T)> {
        self.resolved_at
            .range(CellRef::new(page, 0)..=CellRef::new(page, Cell::MAX))
            .filter_map(|(at, id)| self.items.get(id).map(|item| (at.cell, *id, item)))
            .collect()
    }

    /// All resolved assignments, ordered by page and cell.
    pub fn assignments(&self) -> impl Iterator<Item = ItemAssignment> + '_ {
        self.resolved_at.iter().map(|(at, id)| ItemAssignment {
            item: *id,
            at: *at,
            origin: AssignmentOrigin::Resolved,
        })
    }

    // -- navigation ----------------------------------------------------------

    /// Current page (zero-based).
    #[inline]
    pub fn page(&self) -> u32 {
        self.current_page
    }

    /// Number of pages (at least 1).
    ///
    /// Items the frontier can no longer place add no pages.
    pub fn last_page(&self) -> u32 {
        let highest = self
            .resolved_at
            .keys()
            .next_back()
            .map_or(0, |at| at.page as usize + 1);
        let stuck = self.cache.as_ref().is_some_and(PlacementCache::is_exhausted);
        let pages = if self.unassigned() == 0 || stuck {
            highest
        } else {
            let capacity = self.effective_capacity();
            let estimate = if capacity == 0 {
                1
            } else {
                self.items.len().div_ceil(capacity)
            };
            highest.max(estimate)
        };
        u32::try_from(pages.max(1)).unwrap_or(u32::MAX)
    }

    /// Whether the current page is the first.
    #[inline]
    pub fn is_first(&self) -> bool {
        self.current_page == 0
    }

    /// Whether the current page is the last.
    pub fn is_last(&self) -> bool {
        self.current_page + 1 >= self.last_page()
    }

    /// Move to the next page, staying put on the last one.
    pub fn next(&mut self) -> u32 {
        if !self.is_last() {
            self.current_page += 1;
        }
        self.current_page
    }

    /// Move to the previous page, staying put on the first one.
    pub fn previous(&mut self) -> u32 {
        self.current_page = self.current_page.saturating_sub(1);
        self.current_page
    }

    /// Jump to `page`.
    pub fn goto(&mut self, page: u32) -> Result<(), PlacementError> {
        self.check_page(page)?;
        self.current_page = page;
        Ok(())
    }

    /// Position the page cursor without a range check.
    ///
    /// Used to populate a page before the placement pass that makes it
    /// reachable; follow with [`check_page`](Self::check_page).
    pub fn seek(&mut self, page: u32) {
        self.current_page = page;
    }

    /// Fail with `PageOutOfRange` unless `page < last_page()`.
    pub fn check_page(&self, page: u32) -> Result<(), PlacementError> {
        let last_page = self.last_page();
        if page >= last_page {
            return Err(PlacementError::PageOutOfRange { page, last_page });
        }
        Ok(())
    }
}
