#![forbid(unsafe_code)]

//! Lifecycle errors.

use std::fmt;

use slotpage_core::animation::AnimationError;
use slotpage_layout::PlacementError;

use crate::surface::ViewerId;

/// Errors from building containers and driving their lifecycle.
///
/// Tick-time work never produces these: a task that fires for a container
/// that is no longer current is ignored instead.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LifecycleError {
    /// Invalid placement configuration or a fixed cell outside the surface.
    Placement(PlacementError),
    /// Invalid animator frames.
    Animation(AnimationError),
    /// A page at or beyond the last page was requested.
    PageOutOfRange { page: u32, last_page: u32 },
    /// `restore_original` on a container built without `KEEP_ORIGINAL`.
    NoOriginalKept,
    /// The viewer has no open container.
    NotOpen { viewer: ViewerId },
    /// Container configuration rejected by [`ContainerConfig::validate`].
    ///
    /// [`ContainerConfig::validate`]: crate::ContainerConfig::validate
    InvalidConfig { reason: &'static str },
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Placement(err) => write!(f, "placement error: {err}"),
            Self::Animation(err) => write!(f, "animation error: {err}"),
            Self::PageOutOfRange { page, last_page } => {
                write!(f, "page {page} is out of range (container has {last_page} pages)")
            }
            Self::NoOriginalKept => write!(f, "container was not built with KEEP_ORIGINAL"),
            Self::NotOpen { viewer } => write!(f, "viewer {viewer} has no open container"),
            Self::InvalidConfig { reason } => write!(f, "invalid container config: {reason}"),
        }
    }
}

impl std::error::Error for LifecycleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Self::Placement(err) => Some(err),
            Self::Animation(err) => Some(err),
            _ => None,
        }
    }
}

impl From<PlacementError> for LifecycleError {
    fn from(err: PlacementError) -> Self {
        match err {
            PlacementError::PageOutOfRange { page, last_page } => {
                Self::PageOutOfRange { page, last_page }
            }
            other => Self::Placement(other),
        }
    }
}

impl From<AnimationError> for LifecycleError {
    fn from(err: AnimationError) -> Self {
        Self::Animation(err)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::error::Error;

    #[test]
    fn page_out_of_range_is_lifted() {
        let err: LifecycleError = PlacementError::PageOutOfRange {
            page: 4,
            last_page: 2,
        }
        .into();
        assert_eq!(
            err,
            LifecycleError::PageOutOfRange {
                page: 4,
                last_page: 2
            }
        );
        assert!(err.source().is_none());
    }

    #[test]
    fn wrapped_errors_expose_source() {
        let err: LifecycleError = PlacementError::EmptyTemplate.into();
        assert!(err.source().is_some());
        assert!(err.to_string().contains("template"));
    }
}
