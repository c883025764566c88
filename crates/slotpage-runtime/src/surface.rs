#![forbid(unsafe_code)]

//! The host surface a container renders into.
//!
//! [`Surface`] is the capability the lifecycle needs from the host: create a
//! fixed-size grid, read and write its cells, show it to a viewer, close it,
//! and change the title the viewer sees. Each viewer also owns a *personal*
//! grid (their own inventory of cells) that "clear and save" containers
//! empty while open and restore afterwards.
//!
//! [`BufferSurface`] is an in-memory implementation for tests and headless
//! hosts. It records every show, close and title change so tests can assert
//! on what a viewer saw.

use std::collections::HashMap;
use std::fmt;

use slotpage_core::geometry::{Cell, GridSize};

/// Identifies one viewer of the host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ViewerId(pub u64);

impl fmt::Display for ViewerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "viewer-{}", self.0)
    }
}

/// Opaque handle to a surface created by a [`Surface`] host.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SurfaceHandle(pub u64);

/// Host capability for grid surfaces.
pub trait Surface<V> {
    /// Create a new, empty surface.
    fn create_surface(&mut self, size: GridSize) -> SurfaceHandle;

    /// Write or clear one cell.
    fn set_cell(&mut self, handle: SurfaceHandle, cell: Cell, value: Option<V>);

    /// Read one cell.
    fn get_cell(&self, handle: SurfaceHandle, cell: Cell) -> Option<V>;

    /// Number of cells on the surface (0 for unknown handles).
    fn surface_size(&self, handle: SurfaceHandle) -> usize;

    /// Present `handle` to `viewer`, replacing whatever they were viewing.
    fn show(&mut self, viewer: ViewerId, handle: SurfaceHandle);

    /// Stop presenting any surface to `viewer`.
    fn close(&mut self, viewer: ViewerId);

    /// Change the title `viewer` sees without reopening the surface.
    fn set_title(&mut self, viewer: ViewerId, title: &str);

    /// Drop a surface nobody views any more.
    fn release(&mut self, _handle: SurfaceHandle) {}

    /// The viewer's personal cells.
    fn viewer_contents(&self, viewer: ViewerId) -> Vec<Option<V>>;

    /// Replace the viewer's personal cells.
    fn set_viewer_contents(&mut self, viewer: ViewerId, contents: Vec<Option<V>>);
}

#[derive(Debug, Clone)]
struct Grid<V> {
    size: GridSize,
    cells: Vec<Option<V>>,
}

/// In-memory [`Surface`].
#[derive(Debug, Clone)]
pub struct BufferSurface<V> {
    next_handle: u64,
    grids: HashMap<SurfaceHandle, Grid<V>>,
    shown: HashMap<ViewerId, SurfaceHandle>,
    titles: HashMap<ViewerId, String>,
    personal: HashMap<ViewerId, Vec<Option<V>>>,
    personal_size: usize,
    shows: usize,
    closes: usize,
}

impl<V> Default for BufferSurface<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<V> BufferSurface<V> {
    /// Personal grids default to 36 cells.
    pub const DEFAULT_PERSONAL_SIZE: usize = 36;

    /// Create an empty host.
    pub fn new() -> Self {
        Self {
            next_handle: 0,
            grids: HashMap::new(),
            shown: HashMap::new(),
            titles: HashMap::new(),
            personal: HashMap::new(),
            personal_size: Self::DEFAULT_PERSONAL_SIZE,
            shows: 0,
            closes: 0,
        }
    }

    /// Size of personal grids for viewers seen for the first time.
    #[must_use]
    pub fn with_personal_size(mut self, size: usize) -> Self {
        self.personal_size = size;
        self
    }

    /// Surface currently shown to `viewer`.
    pub fn viewing(&self, viewer: ViewerId) -> Option<SurfaceHandle> {
        self.shown.get(&viewer).copied()
    }

    /// Last title sent to `viewer`.
    pub fn title(&self, viewer: ViewerId) -> Option<&str> {
        self.titles.get(&viewer).map(String::as_str)
    }

    /// All cells of a surface.
    pub fn cells(&self, handle: SurfaceHandle) -> Option<&[Option<V>]> {
        self.grids.get(&handle).map(|grid| grid.cells.as_slice())
    }

    /// Cells of the surface `viewer` is looking at.
    pub fn viewed_cells(&self, viewer: ViewerId) -> Option<&[Option<V>]> {
        self.viewing(viewer).and_then(|handle| self.cells(handle))
    }

    /// Dimensions of a surface.
    pub fn grid(&self, handle: SurfaceHandle) -> Option<GridSize> {
        self.grids.get(&handle).map(|grid| grid.size)
    }

    /// Surfaces created and not yet released.
    pub fn live_surfaces(&self) -> usize {
        self.grids.len()
    }

    /// Number of `show` calls so far.
    pub fn show_count(&self) -> usize {
        self.shows
    }

    /// Number of `close` calls so far.
    pub fn close_count(&self) -> usize {
        self.closes
    }
}

impl<V: Clone> Surface<V> for BufferSurface<V> {
    fn create_surface(&mut self, size: GridSize) -> SurfaceHandle {
        let handle = SurfaceHandle(self.next_handle);
        self.next_handle += 1;
        let cells = std::iter::repeat_with(|| None)
            .take(size.capacity())
            .collect();
        self.grids.insert(handle, Grid { size, cells });
        handle
    }

    fn set_cell(&mut self, handle: SurfaceHandle, cell: Cell, value: Option<V>) {
        if let Some(slot) = self
            .grids
            .get_mut(&handle)
            .and_then(|grid| grid.cells.get_mut(cell))
        {
            *slot = value;
        }
    }

    fn get_cell(&self, handle: SurfaceHandle, cell: Cell) -> Option<V> {
        self.grids
            .get(&handle)
            .and_then(|grid| grid.cells.get(cell))
            .and_then(Clone::clone)
    }

    fn surface_size(&self, handle: SurfaceHandle) -> usize {
        self.grids.get(&handle).map_or(0, |grid| grid.cells.len())
    }

    fn show(&mut self, viewer: ViewerId, handle: SurfaceHandle) {
        self.shows += 1;
        self.shown.insert(viewer, handle);
    }

    fn close(&mut self, viewer: ViewerId) {
        self.closes += 1;
        self.shown.remove(&viewer);
        self.titles.remove(&viewer);
    }

    fn set_title(&mut self, viewer: ViewerId, title: &str) {
        self.titles.insert(viewer, title.to_owned());
    }

    fn release(&mut self, handle: SurfaceHandle) {
        self.grids.remove(&handle);
    }

    fn viewer_contents(&self, viewer: ViewerId) -> Vec<Option<V>> {
        match self.personal.get(&viewer) {
            Some(cells) => cells.clone(),
            None => std::iter::repeat_with(|| None)
                .take(self.personal_size)
                .collect(),
        }
    }

    fn set_viewer_contents(&mut self, viewer: ViewerId, contents: Vec<Option<V>>) {
        self.personal.insert(viewer, contents);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cells_round_trip_and_ignore_out_of_bounds() {
        let mut host = BufferSurface::<&str>::new();
        let handle = host.create_surface(GridSize::new(3, 2));
        assert_eq!(host.surface_size(handle), 6);
        host.set_cell(handle, 4, Some("a"));
        host.set_cell(handle, 99, Some("b"));
        assert_eq!(host.get_cell(handle, 4), Some("a"));
        assert_eq!(host.get_cell(handle, 99), None);
    }

    #[test]
    fn show_close_and_title() {
        let mut host = BufferSurface::<u8>::new();
        let viewer = ViewerId(7);
        let handle = host.create_surface(GridSize::new(9, 1));
        host.show(viewer, handle);
        host.set_title(viewer, "Shop");
        assert_eq!(host.viewing(viewer), Some(handle));
        assert_eq!(host.title(viewer), Some("Shop"));
        host.close(viewer);
        assert_eq!(host.viewing(viewer), None);
        assert_eq!((host.show_count(), host.close_count()), (1, 1));
    }

    #[test]
    fn personal_contents_default_to_empty() {
        let mut host = BufferSurface::<u8>::new().with_personal_size(4);
        let viewer = ViewerId(1);
        assert_eq!(host.viewer_contents(viewer), vec![None; 4]);
        host.set_viewer_contents(viewer, vec![Some(1), None]);
        assert_eq!(host.viewer_contents(viewer), vec![Some(1), None]);
    }

    #[test]
    fn released_surfaces_are_gone() {
        let mut host = BufferSurface::<u8>::new();
        let handle = host.create_surface(GridSize::new(1, 1));
        assert_eq!(host.live_surfaces(), 1);
        host.release(handle);
        assert_eq!(host.live_surfaces(), 0);
        assert_eq!(host.surface_size(handle), 0);
    }
}
