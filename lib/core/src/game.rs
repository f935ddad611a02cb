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

//! [`GameRuntime`]: the arena-owning root that a host drives one frame at a
//! time, the way the teacher's `GameBoy`/`EmulatorCore` owns every hardware
//! subsystem behind one `do_frame`-shaped call.

#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::ParseError;
use crate::format::ValueFormat;
use crate::groupvar::GroupVarRegistry;
use crate::memref::MemrefSet;
use crate::parse::parse_leaderboard_definition;
use crate::richpresence::RichPresence;
use crate::trigger::{Trigger, TriggerState};
use crate::value::{Aggregation, Value};
use crate::MemoryReader;

/// A compiled achievement plus the bookkeeping needed to report it exactly
/// once: its definition-supplied identifier and the point value a client
/// submits on unlock.
pub struct Achievement {
    pub id: u32,
    pub points: u32,
    pub trigger: Trigger,
    /// Set once [`GameRuntime::do_frame`] observes this trigger transition
    /// into [`TriggerState::Triggered`], so the host is notified exactly on
    /// that frame and never again.
    pub newly_triggered: bool,
    /// The source definition string, kept so progress persistence can
    /// digest it and refuse to restore hit-count state into a
    /// differently-compiled achievement carrying the same id.
    pub(crate) definition: String,
}

/// What changed during one [`GameRuntime::do_frame`] call.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct FrameReport {
    pub triggered_achievements: Vec<u32>,
    /// Achievements that just entered [`TriggerState::Primed`] this frame.
    pub primed_achievements: Vec<u32>,
    /// Achievements that just left [`TriggerState::Primed`] this frame
    /// (including the frame they trigger on).
    pub unprimed_achievements: Vec<u32>,
    pub leaderboard_started: Vec<u32>,
    pub leaderboard_failed: Vec<u32>,
    pub leaderboard_submitted: Vec<(u32, i64)>,
    /// Leaderboards that just entered the `Tracking` sub-state this frame,
    /// with the value their tracker overlay should show immediately.
    pub tracker_shown: Vec<(u32, i64)>,
    /// Leaderboards still `Tracking` this frame, with their current value.
    pub tracker_updated: Vec<(u32, i64)>,
    /// Leaderboards that just left the `Tracking` sub-state this frame
    /// (failed or submitted).
    pub tracker_hidden: Vec<u32>,
}

/// A compiled leaderboard: a start/cancel/submit/value quartet evaluated
/// together, matching the four required parts of a leaderboard definition,
/// plus the optional `PRO:` progress value and `FOR:` display format a
/// client uses to render its tracker.
pub struct Leaderboard {
    pub id: u32,
    start: Trigger,
    cancel: Trigger,
    submit: Trigger,
    value: Value,
    progress: Option<Value>,
    format: Option<ValueFormat>,
    /// Whether the start set has fired and neither cancel nor submit has
    /// fired yet, i.e. the `Tracking` sub-state is active and a tracker
    /// overlay should be visible.
    tracking: bool,
    /// The source wire definition, kept so progress persistence can digest
    /// it and refuse to restore hit-count state into a differently-compiled
    /// leaderboard carrying the same id.
    pub(crate) definition: String,
}

impl Leaderboard {
    pub fn value(&self) -> &Value {
        &self.value
    }

    pub fn value_mut(&mut self) -> &mut Value {
        &mut self.value
    }

    pub fn progress(&self) -> Option<&Value> {
        self.progress.as_ref()
    }

    pub fn progress_mut(&mut self) -> Option<&mut Value> {
        self.progress.as_mut()
    }

    pub fn format(&self) -> Option<ValueFormat> {
        self.format
    }

    pub fn is_active(&self) -> bool {
        self.tracking
    }

    pub fn set_active(&mut self, active: bool) {
        self.tracking = active;
    }

    /// Alias for [`Self::is_active`] naming the `Tracking` sub-state
    /// explicitly: whether this leaderboard's tracker overlay should
    /// currently be visible.
    pub fn is_tracking(&self) -> bool {
        self.tracking
    }

    pub fn start_trigger_mut(&mut self) -> &mut Trigger {
        &mut self.start
    }

    pub fn cancel_trigger_mut(&mut self) -> &mut Trigger {
        &mut self.cancel
    }

    pub fn submit_trigger_mut(&mut self) -> &mut Trigger {
        &mut self.submit
    }

    pub fn start_trigger(&self) -> &Trigger {
        &self.start
    }

    pub fn cancel_trigger(&self) -> &Trigger {
        &self.cancel
    }

    pub fn submit_trigger(&self) -> &Trigger {
        &self.submit
    }
}

/// Owns every compiled artifact for one loaded game: memrefs, group
/// variables, achievements, leaderboards and rich presence, refreshed
/// together once per emulated frame.
pub struct GameRuntime {
    game_id: u32,
    memrefs: MemrefSet,
    groupvars: GroupVarRegistry,
    achievements: Vec<Achievement>,
    leaderboards: Vec<Leaderboard>,
    rich_presence: Option<RichPresence>,
    frame_count: u64,
}

impl GameRuntime {
    pub fn new() -> Self {
        Self {
            game_id: 0,
            memrefs: MemrefSet::new(),
            groupvars: GroupVarRegistry::new(),
            achievements: Vec::new(),
            leaderboards: Vec::new(),
            rich_presence: None,
            frame_count: 0,
        }
    }

    pub fn game_id(&self) -> u32 {
        self.game_id
    }

    pub fn set_game_id(&mut self, game_id: u32) {
        self.game_id = game_id;
    }

    pub fn frame_count(&self) -> u64 {
        self.frame_count
    }

    /// Compiles and activates one achievement from its definition string.
    pub fn add_achievement(&mut self, id: u32, points: u32, definition: &str) -> Result<(), ParseError> {
        let mut trigger = Trigger::parse(definition, &mut self.memrefs, &mut self.groupvars)?;
        trigger.activate();
        self.achievements.push(Achievement {
            id,
            points,
            trigger,
            newly_triggered: false,
            definition: definition.to_string(),
        });
        Ok(())
    }

    /// Compiles one leaderboard from its wire definition:
    /// `STA:trigger::SUB:trigger::CAN:trigger::VAL:value[::PRO:value][::FOR:fmt]`.
    pub fn add_leaderboard(&mut self, id: u32, definition: &str) -> Result<(), ParseError> {
        let parts = parse_leaderboard_definition(definition)?;

        let mut start = Trigger::parse(parts.start, &mut self.memrefs, &mut self.groupvars)?;
        let mut cancel = Trigger::parse(parts.cancel, &mut self.memrefs, &mut self.groupvars)?;
        let mut submit = Trigger::parse(parts.submit, &mut self.memrefs, &mut self.groupvars)?;
        start.activate();
        cancel.activate();
        submit.activate();
        let value = Value::parse(parts.value, Aggregation::Max, &mut self.memrefs, &mut self.groupvars)?;
        let progress = parts
            .progress
            .map(|def| Value::parse(def, Aggregation::Max, &mut self.memrefs, &mut self.groupvars))
            .transpose()?;
        let format = parts.format.and_then(ValueFormat::from_name);

        self.leaderboards.push(Leaderboard {
            id,
            start,
            cancel,
            submit,
            value,
            progress,
            format,
            tracking: false,
            definition: definition.to_string(),
        });
        Ok(())
    }

    pub fn set_rich_presence(&mut self, script: &str) -> Result<(), ParseError> {
        self.rich_presence = Some(RichPresence::parse(script, &mut self.memrefs, &mut self.groupvars)?);
        Ok(())
    }

    pub fn rich_presence(&self) -> Option<&RichPresence> {
        self.rich_presence.as_ref()
    }

    pub fn rich_presence_mut(&mut self) -> Option<&mut RichPresence> {
        self.rich_presence.as_mut()
    }

    pub fn rich_presence_text(&mut self) -> String {
        match &mut self.rich_presence {
            Some(rp) => rp.evaluate(&self.memrefs, &self.groupvars),
            None => String::new(),
        }
    }

    pub fn achievements(&self) -> &[Achievement] {
        &self.achievements
    }

    pub fn achievements_mut(&mut self) -> &mut [Achievement] {
        &mut self.achievements
    }

    pub fn leaderboards(&self) -> &[Leaderboard] {
        &self.leaderboards
    }

    pub fn leaderboards_mut(&mut self) -> &mut [Leaderboard] {
        &mut self.leaderboards
    }

    /// Evaluates one leaderboard's value expression against the current
    /// memory state, for a caller (progress restore, a host's manual
    /// refresh) that needs a tracker's value outside the normal
    /// [`Self::do_frame`] loop.
    pub fn tracked_value(&mut self, leaderboard_id: u32) -> Option<i64> {
        let leaderboard = self.leaderboards.iter_mut().find(|lb| lb.id == leaderboard_id)?;
        Some(leaderboard.value.evaluate(&self.memrefs, &self.groupvars) as i64)
    }

    pub fn memrefs(&self) -> &MemrefSet {
        &self.memrefs
    }

    pub fn memrefs_mut(&mut self) -> &mut MemrefSet {
        &mut self.memrefs
    }

    pub fn groupvars(&self) -> &GroupVarRegistry {
        &self.groupvars
    }

    pub fn groupvars_mut(&mut self) -> &mut GroupVarRegistry {
        &mut self.groupvars
    }

    /// Refreshes every memref, then evaluates every achievement and
    /// leaderboard state machine exactly once.
    pub fn do_frame(&mut self, reader: &mut dyn MemoryReader) -> FrameReport {
        self.memrefs.refresh_all(reader);
        self.frame_count += 1;

        let mut report = FrameReport::default();
        for achievement in self.achievements.iter_mut() {
            let was_primed = achievement.trigger.state() == TriggerState::Primed;
            if achievement.trigger.evaluate(&self.memrefs, &self.groupvars) {
                achievement.newly_triggered = true;
                report.triggered_achievements.push(achievement.id);
            }
            let is_primed = achievement.trigger.state() == TriggerState::Primed;
            if is_primed && !was_primed {
                report.primed_achievements.push(achievement.id);
            } else if was_primed && !is_primed {
                report.unprimed_achievements.push(achievement.id);
            }
        }

        for leaderboard in self.leaderboards.iter_mut() {
            if !leaderboard.tracking {
                if leaderboard.start.evaluate(&self.memrefs, &self.groupvars) {
                    leaderboard.tracking = true;
                    let value = leaderboard.value.evaluate(&self.memrefs, &self.groupvars) as i64;
                    report.leaderboard_started.push(leaderboard.id);
                    report.tracker_shown.push((leaderboard.id, value));
                }
            } else if leaderboard.cancel.evaluate(&self.memrefs, &self.groupvars) {
                leaderboard.tracking = false;
                leaderboard.start.rearm();
                leaderboard.cancel.rearm();
                report.leaderboard_failed.push(leaderboard.id);
                report.tracker_hidden.push(leaderboard.id);
            } else if leaderboard.submit.evaluate(&self.memrefs, &self.groupvars) {
                leaderboard.tracking = false;
                let final_value = leaderboard.value.evaluate(&self.memrefs, &self.groupvars);
                leaderboard.start.rearm();
                leaderboard.submit.rearm();
                report.leaderboard_submitted.push((leaderboard.id, final_value as i64));
                report.tracker_hidden.push(leaderboard.id);
            } else {
                let value = leaderboard.value.evaluate(&self.memrefs, &self.groupvars) as i64;
                report.tracker_updated.push((leaderboard.id, value));
            }
        }

        report
    }

    /// Resets every achievement and leaderboard trigger back to its
    /// initial active state, without discarding compiled definitions or
    /// memref addresses (used when the player restarts the game from a
    /// menu without reloading achievement data).
    pub fn reset(&mut self) {
        for achievement in self.achievements.iter_mut() {
            achievement.trigger.reset();
            achievement.newly_triggered = false;
        }
        for leaderboard in self.leaderboards.iter_mut() {
            leaderboard.start.reset();
            leaderboard.cancel.reset();
            leaderboard.submit.reset();
            leaderboard.tracking = false;
        }
    }
}

impl Default for GameRuntime {
    fn default() -> Self {
        Self::new()
    }
}
