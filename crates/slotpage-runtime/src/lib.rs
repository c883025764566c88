#![forbid(unsafe_code)]

//! Container lifecycle for slotpage.
//!
//! This crate turns the placement engine of `slotpage-layout` into paged
//! containers that viewers open, browse and close:
//!
//! - [`Container`] / [`ContainerBuilder`] - reusable container definitions
//! - [`ContainerProvider`] - fills a container when it opens and on updates
//! - [`Contents`] - what a provider edits: cells, items, properties, title
//! - [`Animator`] - frame animations bound to a cell or the title
//! - [`ContainerLifecycle`] - `Closed → Opening → Open → Closing` for one
//!   viewer
//! - [`ContainerRegistry`] - the current container of every viewer
//!
//! The host supplies two collaborators: a [`Surface`] that shows grids to
//! viewers, and a [`Scheduler`] that runs [`Task`]s later. In-memory versions
//! of both ([`BufferSurface`], [`TickScheduler`]) are included for tests and
//! headless hosts.
//!
//! Everything runs on the host's single tick loop; nothing here locks.

pub mod animator;
pub mod config;
pub mod container;
pub mod contents;
pub mod error;
pub mod item;
pub mod lifecycle;
pub mod registry;
pub mod scheduler;
pub mod surface;

pub use animator::{Animator, AnimatorId, AnimatorTarget};
pub use config::{ContainerConfig, ContainerOptions};
pub use container::{Container, ContainerBuilder, ContainerProvider, ContainerSnapshot, EmptyProvider};
pub use contents::Contents;
pub use error::LifecycleError;
pub use item::{CellValue, Item, ViewerPredicate};
pub use lifecycle::{ContainerId, ContainerLifecycle, LifecycleState};
pub use registry::{ContainerRegistry, OpenOutcome};
pub use scheduler::{Scheduler, Task, TaskToken, TickScheduler};
pub use surface::{BufferSurface, Surface, SurfaceHandle, ViewerId};
