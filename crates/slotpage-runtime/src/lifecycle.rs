#![forbid(unsafe_code)]

//! The container lifecycle state machine.
//!
//! One [`ContainerLifecycle`] owns one container instance shown to one
//! viewer:
//!
//! ```text
//! Closed ──prepare──▶ Opening ──attach──▶ Open ──close──▶ Closing ──restore──▶ Closed
//!                                          │  ▲               │
//!                                          └──┘ change_page   └─(nothing saved)─▶ Closed
//! ```
//!
//! Opening is split in two. [`prepare`](ContainerLifecycle::prepare) is pure:
//! it builds the contents, runs the provider's `init`, runs the placement
//! pass and checks the requested page, touching neither the surface nor the
//! scheduler. Only once that succeeds does
//! [`attach`](ContainerLifecycle::attach) save the viewer's personal cells,
//! create and show the surface, and register the update, auto-close and
//! animator tasks. A failed open therefore leaves whatever the viewer had
//! before untouched.
//!
//! # Invariants
//!
//! 1. Every task the lifecycle schedules is cancelled by [`close`]; tasks
//!    that still fire are ignored because the state is no longer `Open`.
//! 2. Animators never survive a page change.
//! 3. A failed page change leaves the lifecycle `Open` on its old page.
//! 4. Saved personal cells are given back exactly once, either by the
//!    delayed restore task or by [`finalize`].
//!
//! [`close`]: ContainerLifecycle::close
//! [`finalize`]: ContainerLifecycle::finalize

use std::collections::BTreeMap;
use std::fmt;

use slotpage_core::geometry::Cell;

use crate::animator::{Animator, AnimatorId};
use crate::container::Container;
use crate::contents::{Contents, Request};
use crate::error::LifecycleError;
use crate::item::CellValue;
use crate::scheduler::{Scheduler, Task, TaskToken};
use crate::surface::{Surface, SurfaceHandle, ViewerId};

/// Identifies one opened container instance.
///
/// Page changes keep the identifier; reopening allocates a new one.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ContainerId(pub u64);

impl fmt::Display for ContainerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "container-{}", self.0)
    }
}

/// Lifecycle states.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LifecycleState {
    Closed,
    Opening,
    Open,
    Closing,
}

#[derive(Debug)]
struct RunningAnimator<V> {
    animator: Animator<V>,
    token: TaskToken,
}

/// One container instance shown to one viewer.
pub struct ContainerLifecycle<V> {
    id: ContainerId,
    viewer: ViewerId,
    container: Container<V>,
    state: LifecycleState,
    contents: Contents<V>,
    handle: Option<SurfaceHandle>,
    saved_viewer: Option<Vec<Option<V>>>,
    update_token: Option<TaskToken>,
    auto_close_token: Option<TaskToken>,
    restore_token: Option<TaskToken>,
    animators: BTreeMap<AnimatorId, RunningAnimator<V>>,
}

impl<V> ContainerLifecycle<V> {
    #[inline]
    pub fn id(&self) -> ContainerId {
        self.id
    }

    #[inline]
    pub fn viewer(&self) -> ViewerId {
        self.viewer
    }

    #[inline]
    pub fn state(&self) -> LifecycleState {
        self.state
    }

    #[inline]
    pub fn is_open(&self) -> bool {
        self.state == LifecycleState::Open
    }

    /// Definition this instance was opened from.
    #[inline]
    pub fn container(&self) -> &Container<V> {
        &self.container
    }

    #[inline]
    pub fn contents(&self) -> &Contents<V> {
        &self.contents
    }

    /// Page being shown.
    #[inline]
    pub fn page(&self) -> u32 {
        self.contents.page()
    }

    /// Surface shown to the viewer while open.
    #[inline]
    pub fn handle(&self) -> Option<SurfaceHandle> {
        self.handle
    }

    /// Whether personal cells are waiting to be given back.
    pub fn has_saved_viewer(&self) -> bool {
        self.saved_viewer.is_some()
    }

    /// Animators currently scheduled.
    pub fn running_animators(&self) -> impl Iterator<Item = AnimatorId> + '_ {
        self.animators.keys().copied()
    }

    /// Whether the viewer may interact with `cell`.
    pub fn interactable(&self, cell: Cell) -> bool {
        self.is_open() && self.contents.interactable(cell)
    }

    pub(crate) fn take_requests(&mut self) -> Vec<Request> {
        self.contents.take_requests()
    }
}

impl<V: CellValue> ContainerLifecycle<V> {
    /// First phase of opening: populate and place, without side effects.
    ///
    /// Fails with [`LifecycleError::PageOutOfRange`] when `page` is not a
    /// page of the populated contents.
    pub fn prepare(
        id: ContainerId,
        viewer: ViewerId,
        container: &Container<V>,
        page: u32,
    ) -> Result<Self, LifecycleError> {
        let mut contents = Contents::new(viewer, container.config())?;
        contents.state_mut().seek(page);
        container.provider().init(viewer, &mut contents);
        let placed = contents.state_mut().place();
        contents.pagination().check_page(page)?;
        tracing::debug!(
            viewer = %viewer,
            container = %id,
            page,
            placed,
            "container prepared"
        );
        Ok(Self {
            id,
            viewer,
            container: container.clone(),
            state: LifecycleState::Opening,
            contents,
            handle: None,
            saved_viewer: None,
            update_token: None,
            auto_close_token: None,
            restore_token: None,
            animators: BTreeMap::new(),
        })
    }

    /// Second phase of opening: show the surface and register tasks.
    ///
    /// Does nothing unless the lifecycle is `Opening`.
    pub fn attach<S, C>(&mut self, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if self.state != LifecycleState::Opening {
            return;
        }
        let config = self.container.config();
        let (period, auto_close, clear) = (
            config.update_period,
            config.auto_close,
            config.clears_and_saves(),
        );

        if clear {
            let saved = surface.viewer_contents(self.viewer);
            surface.set_viewer_contents(self.viewer, vec![None; saved.len()]);
            self.saved_viewer = Some(saved);
        }

        let handle = surface.create_surface(self.contents.grid());
        self.handle = Some(handle);
        self.render(surface);
        surface.show(self.viewer, handle);
        surface.set_title(self.viewer, self.contents.title());
        self.contents.take_title_change();

        self.update_token = Some(scheduler.schedule_repeating(
            period,
            period,
            Task::Update {
                viewer: self.viewer,
                container: self.id,
            },
        ));
        if let Some(ticks) = auto_close {
            self.auto_close_token = Some(scheduler.schedule_once(
                ticks,
                Task::AutoClose {
                    viewer: self.viewer,
                    container: self.id,
                },
            ));
        }

        self.state = LifecycleState::Open;
        self.apply_animator_changes(scheduler);
        tracing::debug!(
            viewer = %self.viewer,
            container = %self.id,
            page = self.page(),
            "container opened"
        );
    }

    /// Periodic update: provider hook, placement pass, re-render.
    pub fn update<S, C>(&mut self, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if !self.is_open() {
            return;
        }
        self.container
            .provider()
            .update(self.viewer, &mut self.contents);
        self.refresh(surface, scheduler);
    }

    /// Run `f` against the contents, then place and re-render.
    pub fn modify<S, C>(
        &mut self,
        surface: &mut S,
        scheduler: &mut C,
        f: impl FnOnce(&mut Contents<V>),
    ) -> Result<(), LifecycleError>
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if !self.is_open() {
            return Err(LifecycleError::NotOpen {
                viewer: self.viewer,
            });
        }
        f(&mut self.contents);
        self.refresh(surface, scheduler);
        Ok(())
    }

    fn refresh<S, C>(&mut self, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        let placed = self.contents.state_mut().place();
        if placed > 0 {
            tracing::trace!(viewer = %self.viewer, container = %self.id, placed, "placed new items");
        }
        self.apply_animator_changes(scheduler);
        self.sync_title(surface);
        self.render(surface);
    }

    /// Move to page `to`.
    ///
    /// Sticky items travel with the viewer and properties are kept when the
    /// container transfers data; otherwise properties are cleared. Running
    /// animators are stopped. On error nothing changes.
    pub fn change_page<S, C>(
        &mut self,
        to: u32,
        surface: &mut S,
        scheduler: &mut C,
    ) -> Result<(), LifecycleError>
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if !self.is_open() {
            return Err(LifecycleError::NotOpen {
                viewer: self.viewer,
            });
        }
        self.contents.state_mut().place();
        self.contents.pagination().check_page(to)?;
        let from = self.page();

        self.state = LifecycleState::Opening;
        self.cancel_animators(scheduler);
        if self.container.config().transfers_data() {
            let carried = self.contents.state_mut().carry_sticky(from, to);
            tracing::trace!(viewer = %self.viewer, carried, "carried sticky items");
        } else {
            self.contents.clear_properties();
        }
        self.contents.state_mut().seek(to);
        self.container
            .provider()
            .page_changed(self.viewer, from, to, &mut self.contents);
        self.state = LifecycleState::Open;
        self.refresh(surface, scheduler);

        tracing::debug!(
            viewer = %self.viewer,
            container = %self.id,
            from_page = from,
            to_page = to,
            "page changed"
        );
        Ok(())
    }

    /// One animator tick. Completed animators are deregistered.
    pub fn animate<S, C>(&mut self, id: AnimatorId, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if !self.is_open() {
            return;
        }
        let Some(running) = self.animators.get_mut(&id) else {
            tracing::trace!(viewer = %self.viewer, animator = %id, "ignoring stopped animator");
            return;
        };
        let target = running.animator.target();
        let step = running.animator.tick();
        for event in running.animator.drain_events() {
            tracing::trace!(viewer = %self.viewer, animator = %id, ?event, "animator event");
        }
        match step {
            Some(effect) => {
                if let Some(cell) = self.contents.apply_effect(target, effect) {
                    self.render_cell(surface, cell);
                }
                self.sync_title(surface);
            }
            None => {
                scheduler.cancel(running.token);
                self.animators.remove(&id);
                tracing::debug!(viewer = %self.viewer, animator = %id, "animator completed");
            }
        }
    }

    /// Close the surface and cancel every task.
    ///
    /// With saved personal cells the lifecycle stays `Closing` until the
    /// restore task runs; otherwise it is `Closed` on return.
    pub fn close<S, C>(&mut self, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if !self.is_open() {
            return;
        }
        self.state = LifecycleState::Closing;
        for token in [self.update_token.take(), self.auto_close_token.take()]
            .into_iter()
            .flatten()
        {
            scheduler.cancel(token);
        }
        self.cancel_animators(scheduler);
        self.container.provider().closed(self.viewer, &self.contents);
        surface.close(self.viewer);
        if let Some(handle) = self.handle.take() {
            surface.release(handle);
        }

        if self.saved_viewer.is_some() {
            self.restore_token = Some(scheduler.schedule_once(
                self.container.config().restore_delay,
                Task::RestoreViewer {
                    viewer: self.viewer,
                    container: self.id,
                },
            ));
        } else {
            self.state = LifecycleState::Closed;
        }
        tracing::debug!(
            viewer = %self.viewer,
            container = %self.id,
            state = ?self.state,
            "container closed"
        );
    }

    /// Give back the saved personal cells and finish closing.
    pub fn finish_restore<S, C>(&mut self, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        if self.state != LifecycleState::Closing {
            return;
        }
        if let Some(token) = self.restore_token.take() {
            scheduler.cancel(token);
        }
        if let Some(saved) = self.saved_viewer.take() {
            surface.set_viewer_contents(self.viewer, saved);
        }
        self.state = LifecycleState::Closed;
        tracing::debug!(viewer = %self.viewer, container = %self.id, "viewer restored");
    }

    /// Close and restore immediately, as when another container replaces
    /// this one.
    pub fn finalize<S, C>(&mut self, surface: &mut S, scheduler: &mut C)
    where
        S: Surface<V> + ?Sized,
        C: Scheduler + ?Sized,
    {
        self.close(surface, scheduler);
        self.finish_restore(surface, scheduler);
    }

    fn apply_animator_changes<C: Scheduler + ?Sized>(&mut self, scheduler: &mut C) {
        let (started, stopped) = self.contents.take_animator_changes();
        for id in stopped {
            if let Some(running) = self.animators.remove(&id) {
                scheduler.cancel(running.token);
            }
        }
        for (id, animator) in started {
            let token = scheduler.schedule_repeating(
                animator.delay(),
                animator.period(),
                Task::Animate {
                    viewer: self.viewer,
                    container: self.id,
                    animator: id,
                },
            );
            self.animators.insert(id, RunningAnimator { animator, token });
        }
    }

    fn cancel_animators<C: Scheduler + ?Sized>(&mut self, scheduler: &mut C) {
        self.contents.take_animator_changes();
        for running in std::mem::take(&mut self.animators).into_values() {
            scheduler.cancel(running.token);
        }
    }

    fn sync_title<S: Surface<V> + ?Sized>(&mut self, surface: &mut S) {
        if let Some(title) = self.contents.take_title_change() {
            surface.set_title(self.viewer, title);
        }
    }

    fn render<S: Surface<V> + ?Sized>(&self, surface: &mut S) {
        for cell in 0..self.contents.grid().capacity() {
            self.render_cell(surface, cell);
        }
    }

    fn render_cell<S: Surface<V> + ?Sized>(&self, surface: &mut S, cell: Cell) {
        if let Some(handle) = self.handle {
            let value = self.contents.displayed(cell).map(|item| item.value().clone());
            surface.set_cell(handle, cell, value);
        }
    }
}

impl<V> fmt::Debug for ContainerLifecycle<V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContainerLifecycle")
            .field("id", &self.id)
            .field("viewer", &self.viewer)
            .field("state", &self.state)
            .field("page", &self.contents.page())
            .field("handle", &self.handle)
            .field("animators", &self.animators.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ContainerConfig, ContainerOptions};
    use crate::scheduler::TickScheduler;
    use crate::surface::BufferSurface;

    const VIEWER: ViewerId = ViewerId(1);

    fn numbered(count: usize, config: ContainerConfig) -> Container<String> {
        Container::builder()
            .config(config)
            .provider(move |_: ViewerId, contents: &mut Contents<String>| {
                contents.extend_items((0..count).map(|n| n.to_string()));
            })
            .build()
            .unwrap()
    }

    fn opened(
        container: &Container<String>,
        page: u32,
    ) -> (ContainerLifecycle<String>, BufferSurface<String>, TickScheduler) {
        let mut surface = BufferSurface::new();
        let mut scheduler = TickScheduler::new();
        let mut lifecycle =
            ContainerLifecycle::prepare(ContainerId(0), VIEWER, container, page).unwrap();
        assert_eq!(lifecycle.state(), LifecycleState::Opening);
        lifecycle.attach(&mut surface, &mut scheduler);
        (lifecycle, surface, scheduler)
    }

    #[test]
    fn prepare_rejects_pages_past_the_end() {
        let container = numbered(20, ContainerConfig::default().with_rows(1));
        let err = ContainerLifecycle::prepare(ContainerId(0), VIEWER, &container, 3).unwrap_err();
        assert_eq!(
            err,
            LifecycleError::PageOutOfRange {
                page: 3,
                last_page: 3
            }
        );
    }

    #[test]
    fn attach_renders_and_schedules() {
        let config = ContainerConfig::default()
            .with_rows(1)
            .with_title("Items")
            .with_auto_close(50);
        let (lifecycle, surface, scheduler) = opened(&numbered(20, config), 1);
        assert!(lifecycle.is_open());
        let cells = surface.viewed_cells(VIEWER).unwrap();
        assert_eq!(cells[0].as_deref(), Some("9"));
        assert_eq!(cells[8].as_deref(), Some("17"));
        assert_eq!(surface.title(VIEWER), Some("Items"));
        assert_eq!(scheduler.pending(), 2);
    }

    #[test]
    fn change_page_renders_new_items() {
        let (mut lifecycle, mut surface, mut scheduler) =
            opened(&numbered(12, ContainerConfig::default().with_rows(1)), 0);
        lifecycle
            .change_page(1, &mut surface, &mut scheduler)
            .unwrap();
        let cells = surface.viewed_cells(VIEWER).unwrap();
        assert_eq!(cells[0].as_deref(), Some("9"));
        assert_eq!(cells[3], None);
        assert_eq!(lifecycle.page(), 1);
    }

    #[test]
    fn failed_page_change_keeps_old_page() {
        let (mut lifecycle, mut surface, mut scheduler) =
            opened(&numbered(12, ContainerConfig::default().with_rows(1)), 0);
        let err = lifecycle
            .change_page(5, &mut surface, &mut scheduler)
            .unwrap_err();
        assert!(matches!(err, LifecycleError::PageOutOfRange { .. }));
        assert!(lifecycle.is_open());
        assert_eq!(lifecycle.page(), 0);
    }

    #[test]
    fn close_cancels_everything() {
        let config = ContainerConfig::default().with_rows(1).with_auto_close(10);
        let (mut lifecycle, mut surface, mut scheduler) = opened(&numbered(3, config), 0);
        lifecycle.close(&mut surface, &mut scheduler);
        assert_eq!(lifecycle.state(), LifecycleState::Closed);
        assert_eq!(scheduler.pending(), 0);
        assert_eq!(surface.viewing(VIEWER), None);
        assert_eq!(surface.live_surfaces(), 0);
    }

    #[test]
    fn clear_and_save_restores_after_delay() {
        let config = ContainerConfig::default()
            .with_rows(1)
            .with_restore_delay(3)
            .with_options(ContainerOptions::CLEAR_AND_SAVE);
        let container = numbered(3, config);
        let mut surface = BufferSurface::new().with_personal_size(2);
        surface.set_viewer_contents(VIEWER, vec![Some("mine".to_string()), None]);
        let mut scheduler = TickScheduler::new();
        let mut lifecycle =
            ContainerLifecycle::prepare(ContainerId(4), VIEWER, &container, 0).unwrap();
        lifecycle.attach(&mut surface, &mut scheduler);
        assert_eq!(surface.viewer_contents(VIEWER), vec![None, None]);

        lifecycle.close(&mut surface, &mut scheduler);
        assert_eq!(lifecycle.state(), LifecycleState::Closing);
        let mut due = Vec::new();
        while due.is_empty() {
            due = scheduler.advance();
        }
        assert_eq!(scheduler.now(), 3);
        assert_eq!(
            due[0].1,
            Task::RestoreViewer {
                viewer: VIEWER,
                container: ContainerId(4)
            }
        );
        lifecycle.finish_restore(&mut surface, &mut scheduler);
        assert_eq!(lifecycle.state(), LifecycleState::Closed);
        assert_eq!(
            surface.viewer_contents(VIEWER),
            vec![Some("mine".to_string()), None]
        );
    }

    #[test]
    fn tasks_after_close_are_ignored() {
        let (mut lifecycle, mut surface, mut scheduler) =
            opened(&numbered(3, ContainerConfig::default().with_rows(1)), 0);
        lifecycle.close(&mut surface, &mut scheduler);
        lifecycle.update(&mut surface, &mut scheduler);
        lifecycle.animate(AnimatorId(0), &mut surface, &mut scheduler);
        assert_eq!(lifecycle.state(), LifecycleState::Closed);
        assert_eq!(scheduler.pending(), 0);
    }

    #[test]
    fn looping_animator_keeps_no_backlog() {
        let container = Container::builder()
            .config(ContainerConfig::default().with_rows(1).with_title("Shop"))
            .provider(|_: ViewerId, contents: &mut Contents<String>| {
                let frames = slotpage_core::animation::FrameAnimation::builder()
                    .frame("a")
                    .map('a', "* ".to_string())
                    .looping(true)
                    .build()
                    .unwrap();
                contents
                    .animate(crate::animator::Animator::title(frames, "Shop"))
                    .unwrap();
            })
            .build()
            .unwrap();
        let (mut lifecycle, mut surface, mut scheduler) = opened(&container, 0);
        let id = lifecycle.running_animators().next().unwrap();
        for _ in 0..10_000 {
            lifecycle.animate(id, &mut surface, &mut scheduler);
        }
        let running = &lifecycle.animators[&id];
        assert_eq!(running.animator.pending_events(), 0);
        assert!(!running.animator.is_complete());
        assert_eq!(surface.title(VIEWER), Some("* Shop"));
    }

    #[test]
    fn modify_requires_open() {
        let (mut lifecycle, mut surface, mut scheduler) =
            opened(&numbered(0, ContainerConfig::default().with_rows(1)), 0);
        lifecycle
            .modify(&mut surface, &mut scheduler, |c| {
                c.add_item("late".to_string());
            })
            .unwrap();
        assert_eq!(
            surface.viewed_cells(VIEWER).unwrap()[0].as_deref(),
            Some("late")
        );
        lifecycle.close(&mut surface, &mut scheduler);
        assert_eq!(
            lifecycle.modify(&mut surface, &mut scheduler, |_| {}),
            Err(LifecycleError::NotOpen { viewer: VIEWER })
        );
    }
}
