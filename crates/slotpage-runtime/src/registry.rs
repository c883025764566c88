#![forbid(unsafe_code)]

//! Per-viewer container registry.
//!
//! [`ContainerRegistry`] is the host-owned entry point. It owns the
//! [`Surface`] and [`Scheduler`] collaborators and at most one current
//! [`ContainerLifecycle`] per viewer.
//!
//! # Usage
//!
//! ```
//! use slotpage_runtime::{
//!     BufferSurface, Container, ContainerConfig, ContainerRegistry, Contents, TickScheduler,
//!     ViewerId,
//! };
//!
//! let list = Container::<String>::builder()
//!     .config(ContainerConfig::default().with_rows(2))
//!     .provider(|_: ViewerId, contents: &mut Contents<String>| {
//!         contents.extend_items((0..40).map(|n| n.to_string()));
//!     })
//!     .build()?;
//!
//! let mut registry = ContainerRegistry::new(BufferSurface::new(), TickScheduler::new());
//! let viewer = ViewerId(1);
//! registry.open(viewer, &list)?;
//! assert_eq!(registry.next_page(viewer)?, 1);
//! registry.tick();
//! registry.close(viewer)?;
//! # Ok::<(), slotpage_runtime::LifecycleError>(())
//! ```
//!
//! # Invariants
//!
//! 1. Opening a container for a viewer finalizes the previous one first, so
//!    two containers never write to the same viewer.
//! 2. Opening the definition that is already open for the viewer is a page
//!    change, not a reopen.
//! 3. An open that fails leaves the previous container open and untouched.
//! 4. A task whose container is no longer the viewer's current `Open`
//!    container is ignored.
//! 5. An open requested while the viewer's container is still closing is
//!    retried on later ticks until the close completes.

use std::collections::HashMap;

use slotpage_core::geometry::Cell;

use crate::container::Container;
use crate::contents::{Contents, Request};
use crate::error::LifecycleError;
use crate::item::CellValue;
use crate::lifecycle::{ContainerId, ContainerLifecycle, LifecycleState};
use crate::scheduler::{Scheduler, Task, TickScheduler};
use crate::surface::{Surface, ViewerId};

/// Upper bound on provider request rounds handled after one operation.
const MAX_REQUEST_ROUNDS: usize = 8;

/// Result of an open request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OpenOutcome {
    /// A new container instance is shown.
    Opened(ContainerId),
    /// The already-open container moved to another page.
    PageChanged { from: u32, to: u32 },
    /// The viewer's previous container is still closing; the open will be
    /// retried on a later tick.
    Deferred,
}

struct PendingOpen<V> {
    container: Container<V>,
    page: u32,
}

/// Current containers, keyed by viewer.
pub struct ContainerRegistry<V, S, C> {
    surface: S,
    scheduler: C,
    lifecycles: HashMap<ViewerId, ContainerLifecycle<V>>,
    deferred: HashMap<ViewerId, PendingOpen<V>>,
    next_id: u64,
}

impl<V, S, C> ContainerRegistry<V, S, C> {
    /// Create a registry over the host's collaborators.
    pub fn new(surface: S, scheduler: C) -> Self {
        Self {
            surface,
            scheduler,
            lifecycles: HashMap::new(),
            deferred: HashMap::new(),
            next_id: 0,
        }
    }

    #[inline]
    pub fn surface(&self) -> &S {
        &self.surface
    }

    #[inline]
    pub fn surface_mut(&mut self) -> &mut S {
        &mut self.surface
    }

    #[inline]
    pub fn scheduler(&self) -> &C {
        &self.scheduler
    }

    #[inline]
    pub fn scheduler_mut(&mut self) -> &mut C {
        &mut self.scheduler
    }

    /// Lifecycle of the viewer's current container, open or closing.
    pub fn current(&self, viewer: ViewerId) -> Option<&ContainerLifecycle<V>> {
        self.lifecycles.get(&viewer)
    }

    /// Whether the viewer has an open container.
    pub fn is_open(&self, viewer: ViewerId) -> bool {
        self.current(viewer).is_some_and(ContainerLifecycle::is_open)
    }

    /// Viewers with an open container, in id order.
    pub fn viewers(&self) -> Vec<ViewerId> {
        let mut viewers: Vec<ViewerId> = self
            .lifecycles
            .iter()
            .filter(|(_, lifecycle)| lifecycle.is_open())
            .map(|(viewer, _)| *viewer)
            .collect();
        viewers.sort_unstable();
        viewers
    }

    /// Whether an open request is waiting for the viewer.
    pub fn has_deferred(&self, viewer: ViewerId) -> bool {
        self.deferred.contains_key(&viewer)
    }

    /// Whether the viewer may interact with `cell` of their open container.
    pub fn interactable(&self, viewer: ViewerId, cell: Cell) -> bool {
        self.current(viewer)
            .is_some_and(|lifecycle| lifecycle.interactable(cell))
    }

    /// Give back the collaborators.
    pub fn into_parts(self) -> (S, C) {
        (self.surface, self.scheduler)
    }

    fn allocate_id(&mut self) -> ContainerId {
        let id = ContainerId(self.next_id);
        self.next_id += 1;
        id
    }

    fn open_lifecycle(&self, viewer: ViewerId) -> Result<&ContainerLifecycle<V>, LifecycleError> {
        self.lifecycles
            .get(&viewer)
            .filter(|lifecycle| lifecycle.is_open())
            .ok_or(LifecycleError::NotOpen { viewer })
    }
}

impl<V, S, C> ContainerRegistry<V, S, C>
where
    V: CellValue,
    S: Surface<V>,
    C: Scheduler,
{
    /// Open `container` on its first page.
    pub fn open(
        &mut self,
        viewer: ViewerId,
        container: &Container<V>,
    ) -> Result<OpenOutcome, LifecycleError> {
        self.open_page(viewer, container, 0)
    }

    /// Open `container` on `page`.
    pub fn open_page(
        &mut self,
        viewer: ViewerId,
        container: &Container<V>,
        page: u32,
    ) -> Result<OpenOutcome, LifecycleError> {
        if let Some(current) = self.lifecycles.get(&viewer) {
            match current.state() {
                LifecycleState::Open if current.container().same_definition(container) => {
                    let from = current.page();
                    self.goto_page(viewer, page)?;
                    return Ok(OpenOutcome::PageChanged { from, to: page });
                }
                LifecycleState::Opening | LifecycleState::Closing => {
                    self.defer(viewer, container, page);
                    return Ok(OpenOutcome::Deferred);
                }
                LifecycleState::Open | LifecycleState::Closed => {}
            }
        }

        let id = self.allocate_id();
        let mut next = match ContainerLifecycle::prepare(id, viewer, container, page) {
            Ok(lifecycle) => lifecycle,
            Err(err) => {
                tracing::warn!(viewer = %viewer, page, error = %err, "open rolled back");
                return Err(err);
            }
        };
        if let Some(mut previous) = self.lifecycles.remove(&viewer) {
            previous.finalize(&mut self.surface, &mut self.scheduler);
        }
        self.deferred.remove(&viewer);
        next.attach(&mut self.surface, &mut self.scheduler);
        self.lifecycles.insert(viewer, next);
        self.process_requests(viewer);
        Ok(OpenOutcome::Opened(id))
    }

    fn defer(&mut self, viewer: ViewerId, container: &Container<V>, page: u32) {
        self.deferred.insert(
            viewer,
            PendingOpen {
                container: container.clone(),
                page,
            },
        );
        self.scheduler
            .schedule_once(1, Task::RetryOpen { viewer });
        tracing::debug!(viewer = %viewer, page, "open deferred");
    }

    /// Move the viewer's open container to `page`.
    pub fn goto_page(&mut self, viewer: ViewerId, page: u32) -> Result<u32, LifecycleError> {
        self.open_lifecycle(viewer)?;
        let Some(lifecycle) = self.lifecycles.get_mut(&viewer) else {
            return Err(LifecycleError::NotOpen { viewer });
        };
        lifecycle.change_page(page, &mut self.surface, &mut self.scheduler)?;
        self.process_requests(viewer);
        Ok(page)
    }

    /// Move to the next page. Stays on the last page.
    pub fn next_page(&mut self, viewer: ViewerId) -> Result<u32, LifecycleError> {
        let lifecycle = self.open_lifecycle(viewer)?;
        let page = lifecycle.page();
        if lifecycle.contents().is_last() {
            return Ok(page);
        }
        self.goto_page(viewer, page + 1)
    }

    /// Move to the previous page. Stays on the first page.
    pub fn previous_page(&mut self, viewer: ViewerId) -> Result<u32, LifecycleError> {
        let page = self.open_lifecycle(viewer)?.page();
        match page.checked_sub(1) {
            Some(previous) => self.goto_page(viewer, previous),
            None => Ok(page),
        }
    }

    /// Close the viewer's open container.
    pub fn close(&mut self, viewer: ViewerId) -> Result<(), LifecycleError> {
        self.open_lifecycle(viewer)?;
        self.close_current(viewer);
        Ok(())
    }

    fn close_current(&mut self, viewer: ViewerId) {
        if let Some(lifecycle) = self.lifecycles.get_mut(&viewer) {
            lifecycle.close(&mut self.surface, &mut self.scheduler);
            if lifecycle.state() == LifecycleState::Closed {
                self.lifecycles.remove(&viewer);
            }
        }
    }

    /// Close every open container and drop deferred opens.
    pub fn close_all(&mut self) {
        self.deferred.clear();
        for viewer in self.viewers() {
            self.close_current(viewer);
        }
    }

    /// Reopen the untouched definition the viewer's container was copied from.
    pub fn reopen_original(&mut self, viewer: ViewerId) -> Result<OpenOutcome, LifecycleError> {
        let original = self.open_lifecycle(viewer)?.container().restore_original()?;
        self.open_page(viewer, &original, 0)
    }

    /// Edit the viewer's open contents, then place and re-render.
    pub fn update_contents(
        &mut self,
        viewer: ViewerId,
        f: impl FnOnce(&mut Contents<V>),
    ) -> Result<(), LifecycleError> {
        let Some(lifecycle) = self.lifecycles.get_mut(&viewer) else {
            return Err(LifecycleError::NotOpen { viewer });
        };
        lifecycle.modify(&mut self.surface, &mut self.scheduler, f)?;
        self.process_requests(viewer);
        Ok(())
    }

    /// Run a task that came due. Returns whether it did anything.
    pub fn dispatch(&mut self, task: Task) -> bool {
        let viewer = task.viewer();
        if let Task::RetryOpen { .. } = task {
            let Some(pending) = self.deferred.remove(&viewer) else {
                return false;
            };
            if let Err(err) = self.open_page(viewer, &pending.container, pending.page) {
                tracing::warn!(viewer = %viewer, error = %err, "deferred open failed");
            }
            return true;
        }

        let Some(lifecycle) = self
            .lifecycles
            .get_mut(&viewer)
            .filter(|lifecycle| task_matches(&task, &**lifecycle))
        else {
            tracing::trace!(viewer = %viewer, task = task.name(), "ignoring task for superseded container");
            return false;
        };

        match task {
            Task::Update { .. } => lifecycle.update(&mut self.surface, &mut self.scheduler),
            Task::Animate { animator, .. } => {
                lifecycle.animate(animator, &mut self.surface, &mut self.scheduler);
            }
            Task::AutoClose { .. } => {
                tracing::debug!(viewer = %viewer, container = %lifecycle.id(), "auto-close");
                lifecycle.close(&mut self.surface, &mut self.scheduler);
            }
            Task::RestoreViewer { .. } => {
                lifecycle.finish_restore(&mut self.surface, &mut self.scheduler);
            }
            Task::RetryOpen { .. } => {}
        }
        if lifecycle.state() == LifecycleState::Closed {
            self.lifecycles.remove(&viewer);
        } else {
            self.process_requests(viewer);
        }
        true
    }

    /// Apply close and page requests queued by provider hooks.
    fn process_requests(&mut self, viewer: ViewerId) {
        for _ in 0..MAX_REQUEST_ROUNDS {
            let Some(lifecycle) = self.lifecycles.get_mut(&viewer) else {
                return;
            };
            let requests = lifecycle.take_requests();
            if requests.is_empty() {
                return;
            }
            for request in requests {
                if !self.is_open(viewer) {
                    return;
                }
                match request {
                    Request::Close => self.close_current(viewer),
                    Request::Page(page) => {
                        let Some(lifecycle) = self.lifecycles.get_mut(&viewer) else {
                            return;
                        };
                        if let Err(err) =
                            lifecycle.change_page(page, &mut self.surface, &mut self.scheduler)
                        {
                            tracing::warn!(viewer = %viewer, page, error = %err, "requested page change failed");
                        }
                    }
                }
            }
        }
        tracing::warn!(viewer = %viewer, "dropping provider requests after {MAX_REQUEST_ROUNDS} rounds");
        if let Some(lifecycle) = self.lifecycles.get_mut(&viewer) {
            lifecycle.take_requests();
        }
    }
}

impl<V, S> ContainerRegistry<V, S, TickScheduler>
where
    V: CellValue,
    S: Surface<V>,
{
    /// Advance the scheduler one tick and dispatch everything due.
    ///
    /// Returns the number of tasks that did something.
    pub fn tick(&mut self) -> usize {
        let due = self.scheduler.advance();
        due.into_iter()
            .filter(|(_, task)| self.dispatch(*task))
            .count()
    }
}

fn task_matches<V>(task: &Task, lifecycle: &ContainerLifecycle<V>) -> bool {
    let (container, wanted) = match *task {
        Task::Update { container, .. }
        | Task::Animate { container, .. }
        | Task::AutoClose { container, .. } => (container, LifecycleState::Open),
        Task::RestoreViewer { container, .. } => (container, LifecycleState::Closing),
        Task::RetryOpen { .. } => return false,
    };
    lifecycle.id() == container && lifecycle.state() == wanted
}

impl<V, S, C> std::fmt::Debug for ContainerRegistry<V, S, C> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContainerRegistry")
            .field("lifecycles", &self.lifecycles.len())
            .field("deferred", &self.deferred.len())
            .field("next_id", &self.next_id)
            .finish_non_exhaustive()
    }
}
