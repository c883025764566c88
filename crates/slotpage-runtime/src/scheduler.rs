#![forbid(unsafe_code)]

//! Deferred and repeating work.
//!
//! The lifecycle never runs callbacks directly. It schedules [`Task`]
//! messages through a [`Scheduler`], and the host hands each due task back
//! to [`ContainerRegistry::dispatch`](crate::ContainerRegistry::dispatch).
//! Every task names the container it belongs to, so a task that fires after
//! its container was closed or replaced is recognised and ignored.
//!
//! [`TickScheduler`] is a deterministic implementation driven by explicit
//! [`advance`](TickScheduler::advance) calls, one per host tick.
//!
//! # Invariants
//!
//! 1. A task scheduled with delay `d` during tick `t` is first due at tick
//!    `t + max(d, 1)`: nothing scheduled during a tick runs within it.
//! 2. Tasks due on the same tick come back in scheduling order.
//! 3. A cancelled token never comes back from `advance`.

use std::collections::BTreeMap;
use std::fmt;

use crate::animator::AnimatorId;
use crate::lifecycle::ContainerId;
use crate::surface::ViewerId;

/// Work the registry performs when a scheduled task comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Periodic provider update and re-render.
    Update {
        viewer: ViewerId,
        container: ContainerId,
    },
    /// One animator tick.
    Animate {
        viewer: ViewerId,
        container: ContainerId,
        animator: AnimatorId,
    },
    /// Scheduled auto-close.
    AutoClose {
        viewer: ViewerId,
        container: ContainerId,
    },
    /// Give the viewer back the personal cells saved at open.
    RestoreViewer {
        viewer: ViewerId,
        container: ContainerId,
    },
    /// Retry an open that arrived while the viewer's container was closing.
    RetryOpen { viewer: ViewerId },
}

impl Task {
    /// Viewer the task acts on.
    pub fn viewer(&self) -> ViewerId {
        match *self {
            Self::Update { viewer, .. }
            | Self::Animate { viewer, .. }
            | Self::AutoClose { viewer, .. }
            | Self::RestoreViewer { viewer, .. }
            | Self::RetryOpen { viewer } => viewer,
        }
    }

    /// Short name used in log fields.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Update { .. } => "update",
            Self::Animate { .. } => "animate",
            Self::AutoClose { .. } => "auto_close",
            Self::RestoreViewer { .. } => "restore_viewer",
            Self::RetryOpen { .. } => "retry_open",
        }
    }
}

/// Cancellation handle returned by a [`Scheduler`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct TaskToken(pub u64);

impl fmt::Display for TaskToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "task-{}", self.0)
    }
}

/// Host capability for delayed and repeating tasks. Delays are in ticks.
pub trait Scheduler {
    /// Run `task` after `delay` ticks and then every `period` ticks.
    fn schedule_repeating(&mut self, delay: u64, period: u64, task: Task) -> TaskToken;

    /// Run `task` once after `delay` ticks.
    fn schedule_once(&mut self, delay: u64, task: Task) -> TaskToken;

    /// Cancel a task. Unknown or finished tokens are ignored.
    fn cancel(&mut self, token: TaskToken);
}

#[derive(Debug, Clone)]
struct Entry {
    task: Task,
    due: u64,
    period: Option<u64>,
}

/// Deterministic manual-tick [`Scheduler`].
#[derive(Debug, Clone, Default)]
pub struct TickScheduler {
    now: u64,
    next_token: u64,
    entries: BTreeMap<TaskToken, Entry>,
}

impl TickScheduler {
    /// Create a scheduler at tick 0.
    pub fn new() -> Self {
        Self::default()
    }

    /// Current tick.
    #[inline]
    pub fn now(&self) -> u64 {
        self.now
    }

    /// Number of scheduled tasks.
    #[inline]
    pub fn pending(&self) -> usize {
        self.entries.len()
    }

    /// Whether `token` is still scheduled.
    pub fn is_scheduled(&self, token: TaskToken) -> bool {
        self.entries.contains_key(&token)
    }

    /// Task behind `token`.
    pub fn task(&self, token: TaskToken) -> Option<Task> {
        self.entries.get(&token).map(|entry| entry.task)
    }

    /// Scheduled tasks, in scheduling order.
    pub fn tasks(&self) -> impl Iterator<Item = (TaskToken, Task)> + '_ {
        self.entries.iter().map(|(token, entry)| (*token, entry.task))
    }

    /// Move to the next tick and return the tasks due on it.
    ///
    /// Repeating tasks are rescheduled; one-shot tasks are dropped.
    pub fn advance(&mut self) -> Vec<(TaskToken, Task)> {
        self.now += 1;
        let now = self.now;
        let mut due = Vec::new();
        self.entries.retain(|token, entry| {
            if entry.due > now {
                return true;
            }
            due.push((*token, entry.task));
            match entry.period {
                Some(period) => {
                    entry.due = now + period.max(1);
                    true
                }
                None => false,
            }
        });
        due
    }

    fn insert(&mut self, delay: u64, period: Option<u64>, task: Task) -> TaskToken {
        let token = TaskToken(self.next_token);
        self.next_token += 1;
        self.entries.insert(
            token,
            Entry {
                task,
                due: self.now + delay.max(1),
                period,
            },
        );
        tracing::trace!(token = token.0, task = task.name(), delay, "task scheduled");
        token
    }
}

impl Scheduler for TickScheduler {
    fn schedule_repeating(&mut self, delay: u64, period: u64, task: Task) -> TaskToken {
        self.insert(delay, Some(period), task)
    }

    fn schedule_once(&mut self, delay: u64, task: Task) -> TaskToken {
        self.insert(delay, None, task)
    }

    fn cancel(&mut self, token: TaskToken) {
        if self.entries.remove(&token).is_some() {
            tracing::trace!(token = token.0, "task cancelled");
        }
    }
}
