/*
 * Copyright (C) 2022-2025 by Christian Fischer
 *
 * This program is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * This program is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with this program. If not, see <http://www.gnu.org/licenses/>.
 */

//! Due-callback bookkeeping for `idle()`: the host drives wall-clock time
//! in, the scheduler says what is due. No threads, no timers, matching the
//! synchronous callback-driven boundary used throughout this crate.

use core::time::Duration;

/// A periodic job tracked by elapsed time rather than wall-clock deadlines,
/// so the scheduler never has to read a clock itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Rich presence ping, fixed 30s interval per the runtime's keepalive.
    Ping,
    /// A pending retry for a request `classify`'d as [`crate::retry::Classified::Retry`].
    Retry,
}

struct Pending {
    task: Task,
    remaining: Duration,
    period: Duration,
}

/// Tracks when each registered [`Task`] is next due.
#[derive(Default)]
pub struct Scheduler {
    pending: Vec<Pending>,
}

impl Scheduler {
    pub fn new() -> Self {
        Self { pending: Vec::new() }
    }

    /// Schedules `task` to come due after `delay`, replacing any existing
    /// schedule for the same task.
    pub fn schedule(&mut self, task: Task, delay: Duration) {
        self.pending.retain(|p| p.task != task);
        self.pending.push(Pending { task, remaining: delay, period: delay });
    }

    /// Cancels a pending schedule for `task`, if any.
    pub fn cancel(&mut self, task: Task) {
        self.pending.retain(|p| p.task != task);
    }

    /// Advances every pending task by `elapsed`, returning the tasks that
    /// became due. A task that fires is rescheduled for its own period,
    /// mirroring a repeating timer rather than a one-shot.
    pub fn advance(&mut self, elapsed: Duration) -> Vec<Task> {
        let mut due = Vec::new();
        for entry in self.pending.iter_mut() {
            if elapsed >= entry.remaining {
                due.push(entry.task);
                entry.remaining = entry.period;
            } else {
                entry.remaining -= elapsed;
            }
        }
        due
    }
}

impl PartialEq for Pending {
    fn eq(&self, other: &Self) -> bool {
        self.task == other.task
    }
}
