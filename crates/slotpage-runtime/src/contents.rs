#![forbid(unsafe_code)]

//! What a provider sees of an open container.
//!
//! [`Contents`] wraps the container's [`PaginationState`] and adds the
//! pieces a provider works with: fixed cells on the current page, paginated
//! items, typed properties, the title, animators, and requests to close or
//! change page.
//!
//! Requests and animator changes are queued here and applied by the
//! lifecycle after the provider hook returns, so a hook never re-enters the
//! lifecycle that called it.

use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use slotpage_core::geometry::{Cell, CellRef, GridSize};
use slotpage_layout::{FixedScope, ItemId, PaginationState, PlacementError};

use crate::animator::{Animator, AnimatorId, AnimatorTarget, Effect};
use crate::config::ContainerConfig;
use crate::error::LifecycleError;
use crate::item::{CellValue, Item};
use crate::surface::ViewerId;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Request {
    Close,
    Page(u32),
}

/// Live contents of one container for one viewer.
pub struct Contents<V> {
    viewer: ViewerId,
    state: PaginationState<Item<V>>,
    properties: HashMap<String, Box<dyn Any>>,
    title: String,
    title_changed: bool,
    next_animator: u32,
    started: Vec<(AnimatorId, Animator<V>)>,
    stopped: Vec<AnimatorId>,
    requests: Vec<Request>,
}

impl<V> Contents<V> {
    pub(crate) fn new(viewer: ViewerId, config: &ContainerConfig) -> Result<Self, LifecycleError> {
        let state = PaginationState::new(
            config.grid(),
            config.effective_items_per_page(),
            config.constraint.clone(),
        )?;
        Ok(Self {
            viewer,
            state,
            properties: HashMap::new(),
            title: config.title.clone(),
            title_changed: false,
            next_animator: 0,
            started: Vec::new(),
            stopped: Vec::new(),
            requests: Vec::new(),
        })
    }

    /// Viewer these contents are rendered for.
    #[inline]
    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    /// Surface dimensions.
    #[inline]
    pub fn grid(&self) -> GridSize {
        self.state.grid()
    }

    /// Page being shown.
    #[inline]
    pub fn page(&self) -> u32 {
        self.state.page()
    }

    /// Number of pages.
    pub fn last_page(&self) -> u32 {
        self.state.last_page()
    }

    pub fn is_first(&self) -> bool {
        self.state.is_first()
    }

    pub fn is_last(&self) -> bool {
        self.state.is_last()
    }

    /// Read-only view of the placement state.
    pub fn pagination(&self) -> &PaginationState<Item<V>> {
        &self.state
    }

    pub(crate) fn state_mut(&mut self) -> &mut PaginationState<Item<V>> {
        &mut self.state
    }

    fn here(&self, cell: Cell) -> CellRef {
        CellRef::new(self.state.page(), cell)
    }

    // -- fixed cells ---------------------------------------------------------

    /// Put an item on `cell` of the current page.
    pub fn set(&mut self, cell: Cell, item: impl Into<Item<V>>) -> Result<ItemId, LifecycleError> {
        let at = self.here(cell);
        Ok(self.state.set_fixed(at, item.into(), FixedScope::Page)?)
    }

    /// Put an item on `cell` of an explicit page.
    pub fn set_on_page(
        &mut self,
        page: u32,
        cell: Cell,
        item: impl Into<Item<V>>,
    ) -> Result<ItemId, LifecycleError> {
        Ok(self
            .state
            .set_fixed(CellRef::new(page, cell), item.into(), FixedScope::Page)?)
    }

    /// Put an item on `cell` that follows the viewer from page to page.
    ///
    /// The cell is kept free of paginated items on every page.
    pub fn set_sticky(
        &mut self,
        cell: Cell,
        item: impl Into<Item<V>>,
    ) -> Result<ItemId, LifecycleError> {
        let at = self.here(cell);
        Ok(self.state.set_fixed(at, item.into(), FixedScope::Sticky)?)
    }

    /// Item shown on `cell` of the current page, ignoring viewer predicates.
    pub fn get(&self, cell: Cell) -> Option<&Item<V>> {
        self.state.item_at(self.here(cell))
    }

    /// Mutable item shown on `cell` of the current page.
    pub fn get_mut(&mut self, cell: Cell) -> Option<&mut Item<V>> {
        let id = self.state.id_at(self.here(cell))?;
        self.state.get_mut(id)
    }

    /// Remove whatever is shown on `cell` of the current page.
    ///
    /// A paginated item removed this way leaves its cell empty; later items
    /// do not move into it.
    pub fn remove(&mut self, cell: Cell) -> Option<Item<V>> {
        let id = self.state.id_at(self.here(cell))?;
        self.state.remove(id)
    }

    /// First cell of the current page with nothing on it.
    pub fn first_empty(&self) -> Option<Cell> {
        (0..self.grid().capacity()).find(|&cell| self.get(cell).is_none())
    }

    // -- paginated items -----------------------------------------------------

    /// Append an item for automatic placement.
    pub fn add_item(&mut self, item: impl Into<Item<V>>) -> ItemId {
        self.state.push(item.into())
    }

    /// Append several items for automatic placement.
    pub fn extend_items<I>(&mut self, items: impl IntoIterator<Item = I>) -> Vec<ItemId>
    where
        I: Into<Item<V>>,
    {
        self.state.extend(items.into_iter().map(Into::into))
    }

    /// Item by identifier.
    pub fn item(&self, id: ItemId) -> Option<&Item<V>> {
        self.state.get(id)
    }

    /// Remove an item by identifier.
    pub fn remove_item(&mut self, id: ItemId) -> Option<Item<V>> {
        self.state.remove(id)
    }

    // -- properties ----------------------------------------------------------

    /// Store a typed value under `key`, replacing any previous value.
    pub fn set_property<T: Any>(&mut self, key: impl Into<String>, value: T) {
        self.properties.insert(key.into(), Box::new(value));
    }

    /// Value under `key`, if present and of type `T`.
    pub fn property<T: Any>(&self, key: &str) -> Option<&T> {
        self.properties.get(key)?.downcast_ref()
    }

    /// Mutable value under `key`, if present and of type `T`.
    pub fn property_mut<T: Any>(&mut self, key: &str) -> Option<&mut T> {
        self.properties.get_mut(key)?.downcast_mut()
    }

    /// Remove the value under `key`. Returns whether one was present.
    pub fn remove_property(&mut self, key: &str) -> bool {
        self.properties.remove(key).is_some()
    }

    pub fn has_property(&self, key: &str) -> bool {
        self.properties.contains_key(key)
    }

    pub(crate) fn clear_properties(&mut self) {
        self.properties.clear();
    }

    // -- title ---------------------------------------------------------------

    #[inline]
    pub fn title(&self) -> &str {
        &self.title
    }

    /// Change the title the viewer sees.
    pub fn update_title(&mut self, title: impl Into<String>) {
        let title = title.into();
        if title != self.title {
            self.title = title;
            self.title_changed = true;
        }
    }

    pub(crate) fn take_title_change(&mut self) -> Option<&str> {
        std::mem::take(&mut self.title_changed).then_some(self.title.as_str())
    }

    // -- animators and requests ---------------------------------------------

    /// Start an animator once the current hook returns.
    pub fn animate(&mut self, animator: Animator<V>) -> Result<AnimatorId, LifecycleError>
    where
        V: Clone,
    {
        if let Some(cell) = animator.target().cell() {
            let capacity = self.grid().capacity();
            if cell >= capacity {
                return Err(PlacementError::SlotOutOfBounds { cell, capacity }.into());
            }
        }
        let id = AnimatorId(self.next_animator);
        self.next_animator += 1;
        self.started.push((id, animator));
        Ok(id)
    }

    /// Stop a running animator.
    pub fn stop_animation(&mut self, id: AnimatorId) {
        if let Some(pos) = self.started.iter().position(|(queued, _)| *queued == id) {
            self.started.remove(pos);
        } else {
            self.stopped.push(id);
        }
    }

    pub(crate) fn take_animator_changes(&mut self) -> (Vec<(AnimatorId, Animator<V>)>, Vec<AnimatorId>) {
        (
            std::mem::take(&mut self.started),
            std::mem::take(&mut self.stopped),
        )
    }

    /// Ask for the container to close after the current hook.
    pub fn request_close(&mut self) {
        self.requests.push(Request::Close);
    }

    /// Ask for a page change after the current hook.
    pub fn request_page(&mut self, page: u32) {
        self.requests.push(Request::Page(page));
    }

    pub(crate) fn take_requests(&mut self) -> Vec<Request> {
        std::mem::take(&mut self.requests)
    }

    // -- rendering -------------------------------------------------------------

    /// Item rendered on `cell` of the current page for the viewer.
    ///
    /// A paginated item the viewer may not see falls back to a fixed item on
    /// the same cell.
    pub fn displayed(&self, cell: Cell) -> Option<&Item<V>> {
        let at = self.here(cell);
        self.state
            .resolved_item(at)
            .filter(|item| item.can_display(self.viewer))
            .or_else(|| {
                self.state
                    .fixed_at(at)
                    .filter(|item| item.can_display(self.viewer))
            })
    }

    /// Whether the viewer may interact with `cell` of the current page.
    pub fn interactable(&self, cell: Cell) -> bool {
        self.displayed(cell)
            .is_some_and(|item| item.can_interact(self.viewer))
    }
}

impl<V: CellValue> Contents<V> {
    /// Fill every cell of `row` with copies of `item`.
    pub fn fill_row(&mut self, row: usize, item: impl Into<Item<V>>) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = self.grid().row_cells(row).collect();
        self.fill_cells(cells, item.into(), FixedScope::Page)
    }

    /// Like [`fill_row`](Self::fill_row) with sticky items (see [`set_sticky`](Self::set_sticky)).
    pub fn fill_row_sticky(
        &mut self,
        row: usize,
        item: impl Into<Item<V>>,
    ) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = self.grid().row_cells(row).collect();
        self.fill_cells(cells, item.into(), FixedScope::Sticky)
    }

    /// Fill every cell of `column` with copies of `item`.
    pub fn fill_column(
        &mut self,
        column: usize,
        item: impl Into<Item<V>>,
    ) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = self.grid().column_cells(column).collect();
        self.fill_cells(cells, item.into(), FixedScope::Page)
    }

    /// Like [`fill_column`](Self::fill_column) with sticky items.
    pub fn fill_column_sticky(
        &mut self,
        column: usize,
        item: impl Into<Item<V>>,
    ) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = self.grid().column_cells(column).collect();
        self.fill_cells(cells, item.into(), FixedScope::Sticky)
    }

    /// Fill the outer ring of the surface with copies of `item`.
    pub fn fill_border(&mut self, item: impl Into<Item<V>>) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = self.grid().border_cells().collect();
        self.fill_cells(cells, item.into(), FixedScope::Page)
    }

    /// Fill the outer ring with sticky copies of `item`.
    ///
    /// The ring stays free of paginated items on every page and follows the
    /// viewer when data transfer is enabled.
    pub fn fill_border_sticky(&mut self, item: impl Into<Item<V>>) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = self.grid().border_cells().collect();
        self.fill_cells(cells, item.into(), FixedScope::Sticky)
    }

    /// Fill every empty cell of the current page with copies of `item`.
    pub fn fill_empty(&mut self, item: impl Into<Item<V>>) -> Result<(), LifecycleError> {
        let cells: Vec<Cell> = (0..self.grid().capacity())
            .filter(|&cell| self.get(cell).is_none())
            .collect();
        self.fill_cells(cells, item.into(), FixedScope::Page)
    }

    fn fill_cells(
        &mut self,
        cells: Vec<Cell>,
        item: Item<V>,
        scope: FixedScope,
    ) -> Result<(), LifecycleError> {
        for cell in cells {
            let at = self.here(cell);
            self.state.set_fixed(at, item.clone(), scope)?;
        }
        Ok(())
    }

    /// Apply one animator tick. Returns the cell that changed, if any.
    pub(crate) fn apply_effect(&mut self, target: AnimatorTarget, effect: Effect<V>) -> Option<Cell> {
        match (target, effect) {
            (AnimatorTarget::Title, Effect::Text(text)) => {
                self.update_title(text);
                None
            }
            (AnimatorTarget::Material { cell }, Effect::Value(value)) => {
                match self.get_mut(cell) {
                    Some(item) => *item.value_mut() = value,
                    None => {
                        self.set(cell, value).ok()?;
                    }
                }
                Some(cell)
            }
            (AnimatorTarget::Name { cell }, Effect::Text(text)) => {
                self.get_mut(cell)?.value_mut().set_name(&text);
                Some(cell)
            }
            (AnimatorTarget::Lore { cell, line }, Effect::Text(text)) => {
                self.get_mut(cell)?.value_mut().set_lore_line(line, &text);
                Some(cell)
            }
            _ => None,
        }
    }
}

impl<V> fmt::Debug for Contents<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Contents")
            .field("viewer", &self.viewer)
            .field("page", &self.state.page())
            .field("items", &self.state.len())
            .field("properties", &self.properties.len())
            .field("title", &self.title)
            .finish_non_exhaustive()
    }
}
