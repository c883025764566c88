#![forbid(unsafe_code)]

//! Core: cell geometry, logging shim, and the frame animation state machine.

pub mod animation;
pub mod geometry;
pub mod logging;

pub use geometry::{Cell, CellRef, GridSize};

// Re-export tracing macros at crate root for ergonomic use.
#[cfg(feature = "tracing")]
pub use logging::{
    debug, debug_span, error, error_span, info, info_span, trace, trace_span, warn, warn_span,
};
