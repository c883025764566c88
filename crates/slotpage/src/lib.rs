#![forbid(unsafe_code)]

//! slotpage public facade crate.
//!
//! Re-exports the placement engine, the container lifecycle and the
//! animation primitives under one name, with a prelude for hosts.
//!
//! ```
//! use slotpage::prelude::*;
//!
//! let shop = Container::<String>::builder()
//!     .config(ContainerConfig::default().with_rows(2).with_title("Shop"))
//!     .provider(|_viewer: ViewerId, contents: &mut Contents<String>| {
//!         contents.extend_items((0..30).map(|n| format!("offer {n}")));
//!     })
//!     .build()?;
//!
//! let mut registry = ContainerRegistry::new(BufferSurface::new(), TickScheduler::new());
//! registry.open(ViewerId(1), &shop)?;
//! registry.next_page(ViewerId(1))?;
//! assert_eq!(registry.current(ViewerId(1)).map(|c| c.page()), Some(1));
//! # Ok::<(), slotpage::Error>(())
//! ```

use std::fmt;

// --- Core re-exports -------------------------------------------------------

pub use slotpage_core::animation::{
    AnimationError, AnimationEvent, Frame, FrameAnimation, FrameAnimationBuilder, Step,
};
pub use slotpage_core::geometry::{Cell, CellRef, GridSize};

// --- Layout re-exports -----------------------------------------------------

pub use slotpage_layout::{
    AssignmentOrigin, Direction, FixedScope, ItemAssignment, ItemId, PaginationState,
    PlacementConstraint, PlacementConstraintBuilder, PlacementError, Template,
};

// --- Runtime re-exports ----------------------------------------------------

pub use slotpage_runtime::{
    Animator, AnimatorId, AnimatorTarget, BufferSurface, CellValue, Container, ContainerBuilder,
    ContainerConfig, ContainerId, ContainerLifecycle, ContainerOptions, ContainerProvider,
    ContainerRegistry, ContainerSnapshot, Contents, EmptyProvider, Item, LifecycleError,
    LifecycleState, OpenOutcome, Scheduler, Surface, SurfaceHandle, Task, TaskToken,
    TickScheduler, ViewerId,
};

// --- Errors ---------------------------------------------------------------

/// Top-level error type for slotpage hosts.
#[derive(Debug)]
pub enum Error {
    /// Opening, paging or building a container failed.
    Lifecycle(LifecycleError),
    /// A logging subscriber could not be installed.
    Logging(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Lifecycle(err) => write!(f, "{err}"),
            Self::Logging(msg) => write!(f, "logging setup failed: {msg}"),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Lifecycle(err) => Some(err),
            Self::Logging(_) => None,
        }
    }
}

impl From<LifecycleError> for Error {
    fn from(err: LifecycleError) -> Self {
        Self::Lifecycle(err)
    }
}

impl From<PlacementError> for Error {
    fn from(err: PlacementError) -> Self {
        Self::Lifecycle(err.into())
    }
}

impl From<AnimationError> for Error {
    fn from(err: AnimationError) -> Self {
        Self::Lifecycle(err.into())
    }
}

/// Standard result type for slotpage APIs.
pub type Result<T> = std::result::Result<T, Error>;

// --- Logging --------------------------------------------------------------

/// Output format for [`init_logging`].
#[cfg(feature = "logging")]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Text,
    /// One JSON object per event.
    Json,
}

/// Install a global `tracing` subscriber filtered by `RUST_LOG`.
///
/// Without `RUST_LOG` only warnings are shown. Fails if a global subscriber
/// is already set.
#[cfg(feature = "logging")]
pub fn init_logging(format: LogFormat) -> Result<()> {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);
    let installed = match format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    installed.map_err(|err| Error::Logging(err.to_string()))
}

// --- Prelude --------------------------------------------------------------

pub mod prelude {
    pub use crate::{
        Animator, AnimatorTarget, BufferSurface, CellValue, Container, ContainerConfig,
        ContainerOptions, ContainerProvider, ContainerRegistry, Contents, Error, FrameAnimation,
        Item, OpenOutcome, PlacementConstraint, Result, Scheduler, Surface, Template,
        TickScheduler, ViewerId,
    };

    pub use crate::{core, layout, runtime};
}

pub use slotpage_core as core;
pub use slotpage_layout as layout;
pub use slotpage_runtime as runtime;
