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

//! Achievement state machines built from a core condition set plus any
//! number of alt sets (`ACHIEVED = core AND (alt1 OR alt2 OR ...)`).
//!
//! `original_source/` doesn't carry `trigger.c`/`condset.c` in the retrieval
//! pack, so the state table below follows the achievement lifecycle
//! described in the achievement runtime's own design notes rather than a
//! line-for-line port.

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::ParseError;
use crate::groupvar::GroupVarRegistry;
use crate::memref::MemrefSet;
use crate::parse::{parse_condition_set, split_condition_sets, ConditionSet};
use crate::typed_value::TypedValue;

/// The lifecycle state of one [`Trigger`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TriggerState {
    /// The achievement hasn't started progressing and isn't being watched.
    Inactive,
    /// At least one hit-counted condition has progress, but the achievement
    /// isn't satisfied yet.
    Waiting,
    /// No condition set is paused or reset this frame and no progress has
    /// been made yet; the common steady state while a player works toward
    /// the achievement.
    Active,
    /// Every gating condition is satisfied; one more non-reset frame will
    /// trigger the achievement. Exists so a client can show "about to pop"
    /// feedback without over-reporting `Triggered`.
    Primed,
    /// The achievement has unlocked. Terminal until [`Trigger::reset`].
    Triggered,
    /// A `PauseIf` condition is currently holding progress (hit counts
    /// frozen, not reset).
    Paused,
    /// The trigger failed to activate (e.g. a memref address outside the
    /// console's declared memory map) and will never evaluate.
    Disabled,
}

/// One compiled achievement: a core condition set every alt set's result is
/// ANDed against, evaluated once per frame via [`Trigger::evaluate`].
#[derive(Debug, Clone)]
pub struct Trigger {
    core: ConditionSet,
    alts: Vec<ConditionSet>,
    state: TriggerState,
    recall: TypedValue,
    measured_value: Option<u32>,
    /// The denominator progress is reported against, taken at parse time
    /// from the first `Measured`/`MeasuredPercent` condition found in the
    /// core set, else the first alt that has one. `0` means no defined
    /// target, so no progress percentage is ever reported.
    measured_target: u32,
    /// Whether `measured_value` should be rendered as a percentage of
    /// `measured_target` rather than as a raw count.
    measured_as_percent: bool,
    /// `true` once the core set, or the currently-passing alt, has reported
    /// at least one hit -- the source of `Waiting` vs `Active`.
    has_progress: bool,
}

impl Trigger {
    /// Parses a full achievement definition (`core` optionally followed by
    /// `Salt1Salt2...`) into a [`Trigger`] in the [`TriggerState::Inactive`]
    /// state.
    pub fn parse(
        definition: &str,
        memrefs: &mut MemrefSet,
        groupvars: &mut GroupVarRegistry,
    ) -> Result<Self, ParseError> {
        let parts = split_condition_sets(definition);
        let mut parts = parts.into_iter();
        let core_text = parts.next().unwrap_or("");
        let core = parse_condition_set(core_text, memrefs, groupvars)?;

        let mut alts = Vec::new();
        for alt_text in parts {
            alts.push(parse_condition_set(alt_text, memrefs, groupvars)?);
        }

        let (measured_target, measured_as_percent) = core
            .measured_target()
            .or_else(|| alts.iter().find_map(|alt| alt.measured_target()))
            .unwrap_or((0, false));

        Ok(Trigger {
            core,
            alts,
            state: TriggerState::Inactive,
            recall: TypedValue::U32(0),
            measured_value: None,
            measured_target,
            measured_as_percent,
            has_progress: false,
        })
    }

    pub fn state(&self) -> TriggerState {
        self.state
    }

    pub fn measured_value(&self) -> Option<u32> {
        self.measured_value
    }

    pub fn measured_target(&self) -> u32 {
        self.measured_target
    }

    pub fn measured_as_percent(&self) -> bool {
        self.measured_as_percent
    }

    pub fn recall(&self) -> TypedValue {
        self.recall
    }

    /// Every condition's hit count, core set first then each alt set in
    /// order, flattened for progress persistence.
    pub fn hit_counts(&self) -> Vec<u32> {
        let mut hits: Vec<u32> = self.core.conditions.iter().map(|c| c.hit_count()).collect();
        for alt in &self.alts {
            hits.extend(alt.conditions.iter().map(|c| c.hit_count()));
        }
        hits
    }

    /// Restores hit counts previously captured by [`Trigger::hit_counts`],
    /// plus `state`/`recall`/`measured_value`. `hits` must have exactly as
    /// many entries as this trigger has conditions (true whenever the
    /// snapshot was taken from an identically-compiled trigger).
    pub fn restore(
        &mut self,
        state: TriggerState,
        hits: &[u32],
        recall: TypedValue,
        measured_value: Option<u32>,
    ) {
        let mut iter = hits.iter().copied();
        for condition in self.core.conditions.iter_mut() {
            condition.restore_hits(iter.next().unwrap_or(0));
        }
        for alt in self.alts.iter_mut() {
            for condition in alt.conditions.iter_mut() {
                condition.restore_hits(iter.next().unwrap_or(0));
            }
        }
        self.state = state;
        self.recall = recall;
        self.measured_value = measured_value;
        self.has_progress = hits.iter().any(|&h| h > 0);
    }

    /// Moves a freshly-parsed or [`TriggerState::Inactive`] trigger into
    /// [`TriggerState::Waiting`]/[`TriggerState::Active`] so it starts being
    /// evaluated on the next frame.
    pub fn activate(&mut self) {
        if self.state == TriggerState::Inactive {
            self.state = TriggerState::Active;
        }
    }

    pub fn disable(&mut self) {
        self.state = TriggerState::Disabled;
    }

    /// Clears hit counts and forces the trigger back to
    /// [`TriggerState::Active`] even if it had already reached
    /// [`TriggerState::Triggered`]. Achievements never need this (they are
    /// one-shot for a session), but a leaderboard's start/cancel/submit
    /// triggers have to be rearmed after each attempt.
    pub fn rearm(&mut self) {
        for condition in self.core.conditions.iter_mut() {
            condition.reset_hits();
        }
        for alt in self.alts.iter_mut() {
            for condition in alt.conditions.iter_mut() {
                condition.reset_hits();
            }
        }
        self.has_progress = false;
        self.measured_value = None;
        if self.state != TriggerState::Disabled {
            self.state = TriggerState::Active;
        }
    }

    /// Resets every condition's hit counter and returns to
    /// [`TriggerState::Active`]; used both for the achievement's own
    /// `ResetIf` handling and for an explicit session reset.
    pub fn reset(&mut self) {
        for condition in self.core.conditions.iter_mut() {
            condition.reset_hits();
        }
        for alt in self.alts.iter_mut() {
            for condition in alt.conditions.iter_mut() {
                condition.reset_hits();
            }
        }
        self.has_progress = false;
        self.measured_value = None;
        if self.state != TriggerState::Disabled && self.state != TriggerState::Triggered {
            self.state = TriggerState::Active;
        }
    }

    /// Evaluates the core set and every alt set once, updates the hit
    /// counters and transitions `state`. Returns `true` exactly on the
    /// frame the achievement becomes [`TriggerState::Triggered`].
    pub fn evaluate(&mut self, memrefs: &MemrefSet, groupvars: &GroupVarRegistry) -> bool {
        if matches!(self.state, TriggerState::Triggered | TriggerState::Disabled) {
            return false;
        }

        let core_result = self.core.evaluate(memrefs, groupvars, &mut self.recall);

        // `alt_true` ignores pending `Trigger` conditions (it's what makes a
        // set "primeable"); `alt_fully_true` additionally requires every
        // `Trigger` condition in that same alt to have resolved, which is
        // what actually unlocks the achievement.
        let mut alt_true = self.alts.is_empty();
        let mut alt_fully_true = self.alts.is_empty();
        let mut any_alt_has_trigger = false;
        let mut any_alt_measured = None;
        let mut any_alt_paused = false;
        let mut any_alt_reset = false;
        for alt in self.alts.iter_mut() {
            let result = alt.evaluate(memrefs, groupvars, &mut self.recall);
            any_alt_has_trigger = any_alt_has_trigger || result.has_trigger_condition;
            if result.is_true && !result.reset && !result.paused {
                alt_true = true;
                if !result.trigger_pending {
                    alt_fully_true = true;
                }
            }
            any_alt_paused = any_alt_paused || result.paused;
            any_alt_reset = any_alt_reset || result.reset;
            if let Some(value) = result.measured_value {
                any_alt_measured = Some(match any_alt_measured {
                    Some(running) => running_max(running, value),
                    None => value,
                });
            }
        }

        self.measured_value = core_result
            .measured_value
            .map(|v| v.as_u32())
            .or(any_alt_measured.map(|v| v.as_u32()));

        if core_result.paused || any_alt_paused {
            self.state = TriggerState::Paused;
            return false;
        }

        if core_result.reset || any_alt_reset {
            self.reset();
            return false;
        }

        let achieved = core_result.is_true && !core_result.trigger_pending && alt_fully_true;

        if achieved {
            self.state = TriggerState::Triggered;
            return true;
        }

        // Every gating condition except a pending `Trigger` one has already
        // resolved: one more non-reset frame on that condition triggers the
        // achievement, so report `Primed` instead of `Active`/`Waiting`.
        let primed = core_result.is_true
            && alt_true
            && (core_result.has_trigger_condition || any_alt_has_trigger);

        if primed {
            self.state = TriggerState::Primed;
            return false;
        }

        self.has_progress = self.has_progress || has_any_hits(&self.core) || self.alts.iter().any(has_any_hits);
        self.state = if self.has_progress {
            TriggerState::Waiting
        } else {
            TriggerState::Active
        };
        false
    }
}

fn has_any_hits(set: &ConditionSet) -> bool {
    set.conditions.iter().any(|c| c.hit_count() > 0)
}

fn running_max(a: TypedValue, b: TypedValue) -> TypedValue {
    if a.compare(b, crate::typed_value::CompareOp::GreaterThanOrEqual) {
        a
    } else {
        b
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FakeMemory(Vec<u8>);

    impl crate::MemoryReader for FakeMemory {
        fn read(&mut self, address: u32, buf: &mut [u8]) -> usize {
            let start = address as usize;
            let end = start + buf.len();
            if end > self.0.len() {
                return 0;
            }
            buf.copy_from_slice(&self.0[start..end]);
            buf.len()
        }
    }

    #[test]
    fn single_condition_trigger_fires_once_satisfied() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut trigger = Trigger::parse("0xH0000=5", &mut memrefs, &mut groupvars).unwrap();
        trigger.activate();

        let mut mem = FakeMemory(vec![0]);
        memrefs.refresh_all(&mut mem);
        assert!(!trigger.evaluate(&memrefs, &groupvars));
        assert_eq!(trigger.state(), TriggerState::Active);

        mem.0[0] = 5;
        memrefs.refresh_all(&mut mem);
        assert!(trigger.evaluate(&memrefs, &groupvars));
        assert_eq!(trigger.state(), TriggerState::Triggered);
    }

    #[test]
    fn triggered_achievement_stays_triggered() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut trigger = Trigger::parse("0xH0000=1", &mut memrefs, &mut groupvars).unwrap();
        trigger.activate();
        let mut mem = FakeMemory(vec![1]);
        memrefs.refresh_all(&mut mem);
        assert!(trigger.evaluate(&memrefs, &groupvars));
        mem.0[0] = 0;
        memrefs.refresh_all(&mut mem);
        assert!(!trigger.evaluate(&memrefs, &groupvars));
        assert_eq!(trigger.state(), TriggerState::Triggered);
    }

    #[test]
    fn core_and_alt_both_required() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut trigger =
            Trigger::parse("0xH0000=1S0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        trigger.activate();

        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        assert!(!trigger.evaluate(&memrefs, &groupvars));

        mem.0[1] = 1;
        memrefs.refresh_all(&mut mem);
        assert!(trigger.evaluate(&memrefs, &groupvars));
    }

    #[test]
    fn reset_if_clears_hit_counts() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut trigger =
            Trigger::parse("0xH0000=1.2._R:0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        trigger.activate();

        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        trigger.evaluate(&memrefs, &groupvars);

        mem.0[1] = 1;
        memrefs.refresh_all(&mut mem);
        trigger.evaluate(&memrefs, &groupvars);
        assert_eq!(trigger.core.conditions[0].hit_count(), 0);
    }

    #[test]
    fn trigger_flagged_condition_primes_before_the_final_hit() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut trigger =
            Trigger::parse("0xH0000=1_T:0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        trigger.activate();

        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        assert!(!trigger.evaluate(&memrefs, &groupvars));
        assert_eq!(trigger.state(), TriggerState::Primed);

        mem.0[1] = 1;
        memrefs.refresh_all(&mut mem);
        assert!(trigger.evaluate(&memrefs, &groupvars));
        assert_eq!(trigger.state(), TriggerState::Triggered);
    }

    #[test]
    fn unpriming_falls_back_once_the_condition_goes_false_again() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut trigger =
            Trigger::parse("0xH0000=1_T:0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        trigger.activate();

        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        trigger.evaluate(&memrefs, &groupvars);
        assert_eq!(trigger.state(), TriggerState::Primed);

        mem.0[0] = 0;
        memrefs.refresh_all(&mut mem);
        trigger.evaluate(&memrefs, &groupvars);
        // Not `Primed` and not `Triggered`: the first condition having once
        // been true already left it with a hit recorded, so this lands on
        // `Waiting` rather than `Active`.
        assert_eq!(trigger.state(), TriggerState::Waiting);
    }

    #[test]
    fn measured_target_is_taken_from_the_hit_counted_measured_condition() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let trigger = Trigger::parse("M:0xH0000.100.", &mut memrefs, &mut groupvars).unwrap();
        assert_eq!(trigger.measured_target(), 100);
        assert!(!trigger.measured_as_percent());
    }

    #[test]
    fn measured_percent_flag_is_recorded() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let trigger = Trigger::parse("G:0xH0000.100.", &mut memrefs, &mut groupvars).unwrap();
        assert!(trigger.measured_as_percent());
    }
}
