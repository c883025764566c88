#![forbid(unsafe_code)]

//! Animators bound to a container.
//!
//! An [`Animator`] pairs one [`FrameAnimation`] with the thing it changes:
//!
//! | Target | Table maps a symbol to | Effect per tick |
//! |---|---|---|
//! | `Material { cell }` | a cell value | replaces the value on `cell` |
//! | `Name { cell }` | a text prefix | renames the value on `cell` to `prefix + base` |
//! | `Lore { cell, line }` | a text prefix | sets line `line` of the value on `cell` |
//! | `Title` | a text prefix | retitles the container to `prefix + base` |
//!
//! Animators started from a provider run on the scheduler with their own
//! delay and period, and are cancelled when their container closes or
//! changes page.
//!
//! ```
//! use slotpage_core::animation::FrameAnimation;
//! use slotpage_runtime::{Animator, AnimatorTarget};
//!
//! let blink = FrameAnimation::builder()
//!     .frame("ab")
//!     .map('a', "> ".to_string())
//!     .map('b', "  ".to_string())
//!     .looping(true)
//!     .build()?;
//! let animator = Animator::<String>::title(blink, "Shop").with_period(5);
//! assert_eq!(animator.target(), AnimatorTarget::Title);
//! # Ok::<(), slotpage_core::animation::AnimationError>(())
//! ```

use std::fmt;

use slotpage_core::animation::{AnimationEvent, FrameAnimation, Step};
use slotpage_core::geometry::Cell;

/// Identifies a running animator within one container.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct AnimatorId(pub u32);

impl fmt::Display for AnimatorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "anim-{}", self.0)
    }
}

/// What an animator changes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimatorTarget {
    Material { cell: Cell },
    Name { cell: Cell },
    Lore { cell: Cell, line: usize },
    Title,
}

impl AnimatorTarget {
    /// Cell the target lives on, if any.
    pub fn cell(&self) -> Option<Cell> {
        match *self {
            Self::Material { cell } | Self::Name { cell } | Self::Lore { cell, .. } => Some(cell),
            Self::Title => None,
        }
    }
}

#[derive(Debug, Clone)]
enum Frames<V> {
    Values(FrameAnimation<V>),
    Text {
        animation: FrameAnimation<String>,
        base: String,
    },
}

/// The value produced by one animator tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Effect<V> {
    Value(V),
    Text(String),
}

/// A frame animation bound to a target.
#[derive(Debug, Clone)]
pub struct Animator<V> {
    target: AnimatorTarget,
    frames: Frames<V>,
    delay: u64,
    period: u64,
}

impl<V: Clone> Animator<V> {
    /// Cycle the value on `cell` through the animation's mapped values.
    pub fn material(cell: Cell, animation: FrameAnimation<V>) -> Self {
        Self::with_frames(AnimatorTarget::Material { cell }, Frames::Values(animation))
    }

    /// Rename the value on `cell` to `prefix + base` every tick.
    pub fn name(cell: Cell, animation: FrameAnimation<String>, base: impl Into<String>) -> Self {
        Self::text(AnimatorTarget::Name { cell }, animation, base)
    }

    /// Rewrite line `line` of the value on `cell` every tick.
    pub fn lore(
        cell: Cell,
        line: usize,
        animation: FrameAnimation<String>,
        base: impl Into<String>,
    ) -> Self {
        Self::text(AnimatorTarget::Lore { cell, line }, animation, base)
    }

    /// Retitle the container every tick.
    pub fn title(animation: FrameAnimation<String>, base: impl Into<String>) -> Self {
        Self::text(AnimatorTarget::Title, animation, base)
    }

    fn text(target: AnimatorTarget, animation: FrameAnimation<String>, base: impl Into<String>) -> Self {
        Self::with_frames(
            target,
            Frames::Text {
                animation,
                base: base.into(),
            },
        )
    }

    fn with_frames(target: AnimatorTarget, frames: Frames<V>) -> Self {
        Self {
            target,
            frames,
            delay: 0,
            period: 1,
        }
    }

    /// Ticks before the first frame.
    #[must_use]
    pub fn with_delay(mut self, ticks: u64) -> Self {
        self.delay = ticks;
        self
    }

    /// Ticks between frames (at least 1).
    #[must_use]
    pub fn with_period(mut self, ticks: u64) -> Self {
        self.period = ticks.max(1);
        self
    }

    #[inline]
    pub fn target(&self) -> AnimatorTarget {
        self.target
    }

    #[inline]
    pub fn delay(&self) -> u64 {
        self.delay
    }

    #[inline]
    pub fn period(&self) -> u64 {
        self.period
    }

    /// Whether the animation has finished.
    pub fn is_complete(&self) -> bool {
        match &self.frames {
            Frames::Values(animation) => animation.is_complete(),
            Frames::Text { animation, .. } => animation.is_complete(),
        }
    }

    /// Milestones reached since the last call.
    pub(crate) fn drain_events(&mut self) -> Vec<AnimationEvent> {
        match &mut self.frames {
            Frames::Values(animation) => animation.drain_events(),
            Frames::Text { animation, .. } => animation.drain_events(),
        }
    }

    /// Events the animation is still holding.
    pub fn pending_events(&self) -> usize {
        match &self.frames {
            Frames::Values(animation) => animation.pending_events(),
            Frames::Text { animation, .. } => animation.pending_events(),
        }
    }

    /// Advance one frame symbol. `None` once the animation has completed.
    pub(crate) fn tick(&mut self) -> Option<Effect<V>> {
        match &mut self.frames {
            Frames::Values(animation) => match animation.tick() {
                Step::Render(value) => Some(Effect::Value(value.clone())),
                Step::Completed => None,
            },
            Frames::Text { animation, base } => match animation.tick() {
                Step::Render(prefix) => Some(Effect::Text(format!("{prefix}{base}"))),
                Step::Completed => None,
            },
        }
    }
}
