#![forbid(unsafe_code)]

//! Tick-driven frame animation.
//!
//! A [`FrameAnimation`] plays a queue of [`Frame`]s, one symbol per tick.
//! Every symbol is looked up in a caller-supplied table that maps it to a
//! concrete value (a cell value, a colour prefix, a title glyph). The
//! animation never renders anything itself: [`FrameAnimation::tick`] hands
//! back the value for the current tick and the caller applies it.
//!
//! # Usage
//!
//! ```
//! use slotpage_core::animation::{FrameAnimation, Step};
//!
//! let mut anim = FrameAnimation::builder()
//!     .frame("ab")
//!     .map('a', "red")
//!     .map('b', "blue")
//!     .build()
//!     .unwrap();
//!
//! assert_eq!(anim.tick(), Step::Render(&"red"));
//! assert_eq!(anim.tick(), Step::Render(&"blue"));
//! assert_eq!(anim.tick(), Step::Completed);
//! ```
//!
//! # Invariants
//!
//! 1. Every symbol of every frame has an entry in the table; this is checked
//!    by [`FrameAnimationBuilder::build`], never during `tick()`.
//! 2. A looping animation never completes.
//! 3. A non-looping animation drops each frame once it has been played and
//!    completes when the queue is empty. `Completed` is reported once.
//! 4. [`drain_events`](FrameAnimation::drain_events) clears the event queue.
//!    At most [`MAX_PENDING_EVENTS`] are buffered; older ones are dropped
//!    first.
//!
//! # Failure Modes
//!
//! - No frames, an empty frame, or an unmapped symbol: rejected at build time
//!   with [`AnimationError`].

use std::collections::{HashMap, VecDeque};
use std::fmt;

use smallvec::SmallVec;

/// A symbol inside a frame.
pub type Symbol = char;

/// One fixed-length sequence of symbols.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    symbols: SmallVec<[Symbol; 16]>,
}

impl Frame {
    /// Build a frame from the characters of `pattern`.
    pub fn new(pattern: &str) -> Self {
        Self {
            symbols: pattern.chars().collect(),
        }
    }

    /// Number of symbols (ticks) in the frame.
    #[inline]
    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    /// Whether the frame has no symbols.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Symbol at `index`.
    #[inline]
    pub fn symbol(&self, index: usize) -> Option<Symbol> {
        self.symbols.get(index).copied()
    }

    /// Iterate over the symbols.
    pub fn symbols(&self) -> impl Iterator<Item = Symbol> + '_ {
        self.symbols.iter().copied()
    }
}

impl From<&str> for Frame {
    fn from(pattern: &str) -> Self {
        Self::new(pattern)
    }
}

/// Build-time animation misconfiguration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AnimationError {
    /// The animation has no frames.
    NoFrames,
    /// A frame has no symbols.
    EmptyFrame { frame: usize },
    /// A frame uses a symbol missing from the mapping table.
    UnmappedSymbol { frame: usize, symbol: Symbol },
}

impl fmt::Display for AnimationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoFrames => write!(f, "animation has no frames"),
            Self::EmptyFrame { frame } => write!(f, "animation frame {frame} is empty"),
            Self::UnmappedSymbol { frame, symbol } => {
                write!(f, "symbol {symbol:?} in frame {frame} has no mapped value")
            }
        }
    }
}

impl std::error::Error for AnimationError {}

/// Outcome of a single tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step<'a, T> {
    /// Apply this value to the animation's target.
    Render(&'a T),
    /// The animation has finished; the caller should deregister it.
    Completed,
}

/// Events kept between two [`FrameAnimation::drain_events`] calls.
pub const MAX_PENDING_EVENTS: usize = 64;

/// Milestones reported through [`FrameAnimation::drain_events`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnimationEvent {
    /// The first symbol was rendered.
    Started,
    /// A frame was played to its end. Carries the number of frames finished so far.
    FrameFinished(usize),
    /// The last frame was dropped; nothing more will render.
    Completed,
}

/// Builder for [`FrameAnimation`].
#[derive(Debug, Clone)]
pub struct FrameAnimationBuilder<T> {
    frames: Vec<Frame>,
    table: HashMap<Symbol, T>,
    looping: bool,
}

impl<T> Default for FrameAnimationBuilder<T> {
    fn default() -> Self {
        Self {
            frames: Vec::new(),
            table: HashMap::new(),
            looping: false,
        }
    }
}

impl<T> FrameAnimationBuilder<T> {
    /// Append a frame.
    #[must_use]
    pub fn frame(mut self, frame: impl Into<Frame>) -> Self {
        self.frames.push(frame.into());
        self
    }

    /// Append several frames.
    #[must_use]
    pub fn frames<F: Into<Frame>>(mut self, frames: impl IntoIterator<Item = F>) -> Self {
        self.frames.extend(frames.into_iter().map(Into::into));
        self
    }

    /// Map a symbol to the value rendered for it.
    #[must_use]
    pub fn map(mut self, symbol: Symbol, value: T) -> Self {
        self.table.insert(symbol, value);
        self
    }

    /// Replay frames forever instead of consuming them.
    #[must_use]
    pub fn looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    /// Validate the frames against the table.
    pub fn build(self) -> Result<FrameAnimation<T>, AnimationError> {
        if self.frames.is_empty() {
            return Err(AnimationError::NoFrames);
        }
        for (frame_idx, frame) in self.frames.iter().enumerate() {
            if frame.is_empty() {
                return Err(AnimationError::EmptyFrame { frame: frame_idx });
            }
            if let Some(symbol) = frame.symbols().find(|s| !self.table.contains_key(s)) {
                return Err(AnimationError::UnmappedSymbol {
                    frame: frame_idx,
                    symbol,
                });
            }
        }
        Ok(FrameAnimation {
            frames: self.frames.iter().cloned().collect(),
            initial: self.frames,
            table: self.table,
            frame_index: 0,
            sub_index: 0,
            looping: self.looping,
            started: false,
            finished_frames: 0,
            completed: false,
            events: VecDeque::new(),
        })
    }
}

/// Frame queue with a symbol cursor and a loop/consume policy.
#[derive(Debug, Clone)]
pub struct FrameAnimation<T> {
    frames: VecDeque<Frame>,
    initial: Vec<Frame>,
    table: HashMap<Symbol, T>,
    frame_index: usize,
    sub_index: usize,
    looping: bool,
    started: bool,
    finished_frames: usize,
    completed: bool,
    events: VecDeque<AnimationEvent>,
}

impl<T> FrameAnimation<T> {
    /// Start building an animation.
    pub fn builder() -> FrameAnimationBuilder<T> {
        FrameAnimationBuilder::default()
    }

    /// Advance by one tick.
    pub fn tick(&mut self) -> Step<'_, T> {
        if self.completed {
            return Step::Completed;
        }

        let active_len = self.frames.get(self.frame_index).map_or(0, Frame::len);
        if self.sub_index >= active_len {
            self.sub_index = 0;
            self.finished_frames += 1;
            self.push_event(AnimationEvent::FrameFinished(self.finished_frames));
            if self.looping {
                self.frame_index = (self.frame_index + 1) % self.frames.len().max(1);
            } else {
                self.frames.pop_front();
                self.frame_index = 0;
            }
        }

        let Some(symbol) = self
            .frames
            .get(self.frame_index)
            .and_then(|frame| frame.symbol(self.sub_index))
        else {
            self.completed = true;
            self.push_event(AnimationEvent::Completed);
            return Step::Completed;
        };
        self.sub_index += 1;

        if !self.started {
            self.started = true;
            self.push_event(AnimationEvent::Started);
        }

        if !self.table.contains_key(&symbol) {
            // Unreachable after a successful build; treat as finished.
            self.completed = true;
            self.push_event(AnimationEvent::Completed);
            return Step::Completed;
        }
        match self.table.get(&symbol) {
            Some(value) => Step::Render(value),
            None => Step::Completed,
        }
    }

    /// Whether the animation has finished.
    #[inline]
    pub fn is_complete(&self) -> bool {
        self.completed
    }

    /// Whether frames replay forever.
    #[inline]
    pub fn is_looping(&self) -> bool {
        self.looping
    }

    /// Frames still queued (including the active one).
    #[inline]
    pub fn remaining_frames(&self) -> usize {
        self.frames.len()
    }

    /// Index of the active frame within the queue.
    #[inline]
    pub fn frame_index(&self) -> usize {
        self.frame_index
    }

    /// Symbols of the active frame already rendered.
    #[inline]
    pub fn sub_index(&self) -> usize {
        self.sub_index
    }

    /// Value mapped to `symbol`.
    pub fn mapped(&self, symbol: Symbol) -> Option<&T> {
        self.table.get(&symbol)
    }

    /// Drain pending milestone events.
    pub fn drain_events(&mut self) -> Vec<AnimationEvent> {
        self.events.drain(..).collect()
    }

    /// Events buffered since the last drain.
    #[inline]
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    fn push_event(&mut self, event: AnimationEvent) {
        if self.events.len() == MAX_PENDING_EVENTS {
            self.events.pop_front();
        }
        self.events.push_back(event);
    }

    /// Restore the original frame queue and cursor.
    pub fn reset(&mut self) {
        self.frames = self.initial.iter().cloned().collect();
        self.frame_index = 0;
        self.sub_index = 0;
        self.started = false;
        self.finished_frames = 0;
        self.completed = false;
        self.events.clear();
    }
}
