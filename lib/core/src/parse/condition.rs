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

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::ParseError;
use crate::memref::{MemrefHandle, MemrefSet, Modifier};
use crate::parse::cursor::Cursor;
use crate::parse::operand::{parse_operand, Operand, ParseContext};
use crate::typed_value::{ArithOp, CompareOp, TypedValue};

/// A condition's role within a condition set, matching `spec.md`'s flag
/// table (itself `RC_CONDITION_*` from the source).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConditionFlag {
    Standard,
    PauseIf,
    ResetIf,
    ResetNextIf,
    AddHits,
    SubHits,
    AddSource,
    SubSource,
    AddAddress,
    AndNext,
    OrNext,
    Measured,
    MeasuredPercent,
    MeasuredIf,
    Trigger,
    Remember,
}

impl ConditionFlag {
    fn from_prefix(prefix: &str) -> Option<Self> {
        Some(match prefix {
            "" => ConditionFlag::Standard,
            "P" => ConditionFlag::PauseIf,
            "R" => ConditionFlag::ResetIf,
            "Z" => ConditionFlag::ResetNextIf,
            "C" => ConditionFlag::AddHits,
            "D" => ConditionFlag::SubHits,
            "A" => ConditionFlag::AddSource,
            "B" => ConditionFlag::SubSource,
            "I" => ConditionFlag::AddAddress,
            "N" => ConditionFlag::AndNext,
            "O" => ConditionFlag::OrNext,
            "M" => ConditionFlag::Measured,
            "G" => ConditionFlag::MeasuredPercent,
            "Q" => ConditionFlag::MeasuredIf,
            "T" => ConditionFlag::Trigger,
            "K" => ConditionFlag::Remember,
            _ => return None,
        })
    }

    /// Whether this flag combines into the following condition's accumulator
    /// rather than evaluating a comparison of its own. `AddAddress` is
    /// handled separately at parse time (see
    /// [`super::condition::redirect_add_address_operands`]) but still counts
    /// as combining here, since it must never gate the set on its own.
    pub fn is_combining(self) -> bool {
        matches!(
            self,
            ConditionFlag::AddSource
                | ConditionFlag::SubSource
                | ConditionFlag::AddAddress
                | ConditionFlag::AndNext
                | ConditionFlag::OrNext
                | ConditionFlag::AddHits
                | ConditionFlag::SubHits
        )
    }

    pub fn is_measured(self) -> bool {
        matches!(self, ConditionFlag::Measured | ConditionFlag::MeasuredPercent)
    }
}

/// One compiled condition: `flag` classifies its role, `left`/`operator`/
/// `right` describe its comparison (or, for `Hit`-less combining flags, just
/// its left-hand value), `required_hits` is the target hit count (`0` means
/// "every frame the comparison holds counts, but no threshold gates it").
#[derive(Debug, Clone, Copy)]
pub struct Condition {
    pub flag: ConditionFlag,
    pub left: Operand,
    pub operator: Option<CompareOp>,
    pub right: Option<Operand>,
    pub required_hits: u32,
    hit_count: u32,
}

impl Condition {
    pub fn hit_count(&self) -> u32 {
        self.hit_count
    }

    pub fn reset_hits(&mut self) {
        self.hit_count = 0;
    }

    pub fn restore_hits(&mut self, hits: u32) {
        self.hit_count = hits;
    }

    /// Evaluates this condition's own comparison (ignoring accumulator
    /// combination, which the caller applies beforehand for `AddSource`-style
    /// chains), given the current state of memory and the running recall
    /// value.
    pub fn evaluate_comparison(
        &self,
        memrefs: &MemrefSet,
        groupvars: &crate::groupvar::GroupVarRegistry,
        recall: TypedValue,
        accumulator: Option<TypedValue>,
    ) -> bool {
        let left = accumulator
            .map(|acc| acc.combine(self.left.value(memrefs, groupvars, recall), crate::typed_value::ArithOp::Add))
            .unwrap_or_else(|| self.left.value(memrefs, groupvars, recall));

        match (self.operator, self.right) {
            (Some(op), Some(right)) => left.compare(right.value(memrefs, groupvars, recall), op),
            _ => !left.is_zero(),
        }
    }

    /// Advances this condition's hit counter; returns whether the
    /// `required_hits` threshold is satisfied this frame (a threshold of
    /// `0` is satisfied by any single true comparison, matching the
    /// source's "hits: 0 means unbounded, but still gates on truthiness").
    pub fn tick(&mut self, comparison_true: bool) -> bool {
        if !comparison_true {
            return false;
        }
        if self.required_hits == 0 {
            self.hit_count = self.hit_count.saturating_add(1);
            return true;
        }
        if self.hit_count < self.required_hits {
            self.hit_count += 1;
        }
        self.hit_count >= self.required_hits
    }

    /// Like [`Condition::tick`], but first folds in hits fed by a preceding
    /// `AddHits`/`SubHits` chain (positive to add, negative to subtract)
    /// before applying this frame's own increment.
    pub fn tick_extra(&mut self, comparison_true: bool, extra_hits: i64) -> bool {
        if extra_hits != 0 {
            let adjusted = (self.hit_count as i64 + extra_hits).max(0) as u32;
            self.hit_count = if self.required_hits > 0 {
                adjusted.min(self.required_hits)
            } else {
                adjusted
            };
        }
        self.tick(comparison_true)
    }
}

/// Parses one condition, e.g. `0xH1234=10.5.` or `R:0xH1234!=0`.
pub fn parse_condition(cursor: &mut Cursor, ctx: &mut ParseContext) -> Result<Condition, ParseError> {
    let flag = parse_flag_prefix(cursor)?;
    let left = parse_operand(cursor, ctx)?;

    let (operator, right) = if let Some(op) = parse_operator(cursor) {
        (Some(op), Some(parse_operand(cursor, ctx)?))
    } else {
        (None, None)
    };

    let required_hits = if cursor.eat(b'.') {
        let hits = cursor.take_decimal_i32()?;
        if cursor.eat(b'.') {
            // trailing dot form: `N.` with no explicit second number
        }
        if hits < 0 {
            return Err(ParseError::InvalidRequiredHits);
        }
        hits as u32
    } else {
        0
    };

    Ok(Condition {
        flag,
        left,
        operator,
        right,
        required_hits,
        hit_count: 0,
    })
}

fn parse_flag_prefix(cursor: &mut Cursor) -> Result<ConditionFlag, ParseError> {
    let ident = cursor.take_ident();
    if ident.is_empty() {
        return ConditionFlag::from_prefix("").ok_or(ParseError::InvalidConditionType);
    }
    if cursor.eat(b':') {
        ConditionFlag::from_prefix(ident).ok_or(ParseError::InvalidConditionType)
    } else {
        // Not actually a flag prefix: this was consumed speculatively, but
        // there is no cheap way to push bytes back onto the byte cursor, so
        // callers must only reach here when a flag prefix is genuinely
        // absent -- i.e. `ident` was empty, handled above. A non-empty,
        // non-colon-terminated ident at this position is a malformed
        // condition.
        Err(ParseError::InvalidConditionType)
    }
}

fn parse_operator(cursor: &mut Cursor) -> Option<CompareOp> {
    match cursor.peek() {
        Some(b'=') => {
            cursor.advance();
            if cursor.eat(b'=') { /* accept both `=` and `==` */ }
            Some(CompareOp::Equal)
        }
        Some(b'!') => {
            cursor.advance();
            if cursor.eat(b'=') {
                Some(CompareOp::NotEqual)
            } else {
                None
            }
        }
        Some(b'<') => {
            cursor.advance();
            if cursor.eat(b'=') {
                Some(CompareOp::LessThanOrEqual)
            } else {
                Some(CompareOp::LessThan)
            }
        }
        Some(b'>') => {
            cursor.advance();
            if cursor.eat(b'=') {
                Some(CompareOp::GreaterThanOrEqual)
            } else {
                Some(CompareOp::GreaterThan)
            }
        }
        _ => None,
    }
}

/// A sequence of conditions evaluated together every frame, matching
/// `rc_condset_t`: AddSource/SubSource/AddAddress/AndNext/OrNext chains feed
/// an accumulator into the next "real" condition; Measured conditions report
/// the set's numeric progress; PauseIf/ResetIf/ResetNextIf gate the set as a
/// whole.
#[derive(Debug, Clone, Default)]
pub struct ConditionSet {
    pub conditions: Vec<Condition>,
}

/// The per-frame result of evaluating one [`ConditionSet`].
#[derive(Debug, Clone, Copy, Default)]
pub struct ConditionSetResult {
    pub is_true: bool,
    pub paused: bool,
    pub reset: bool,
    pub measured_value: Option<TypedValue>,
    /// Whether this set contains at least one `Trigger`-flagged condition.
    pub has_trigger_condition: bool,
    /// Whether any `Trigger`-flagged condition in this set is *not*
    /// satisfied this frame. Only meaningful when `has_trigger_condition`
    /// is `true`; a set reports `is_true` without waiting on its `Trigger`
    /// conditions, so a [`crate::trigger::Trigger`] can tell "primed" (all
    /// of `is_true`, but still `trigger_pending`) apart from "triggered"
    /// (both satisfied).
    pub trigger_pending: bool,
}

/// Which accumulator channel a combining condition feeds into the next
/// "real" condition, matching the distinct combination kinds the source
/// gives each flag: `AddSource`/`SubSource` combine numeric values,
/// `AndNext`/`OrNext` combine boolean predicate results, and
/// `AddHits`/`SubHits` combine hit counts. `AddAddress` isn't listed here:
/// it's rewritten away entirely at parse time (see
/// [`redirect_add_address_operands`]) into an indirect-read memref, since
/// it redirects the next operand's *address* rather than combining a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum BoolCombine {
    And,
    Or,
}

fn combine_bool(acc: Option<bool>, op: Option<BoolCombine>, this: bool) -> bool {
    match (acc, op) {
        (Some(prev), Some(BoolCombine::And)) => prev && this,
        (Some(prev), Some(BoolCombine::Or)) => prev || this,
        _ => this,
    }
}

impl ConditionSet {
    pub fn parse(cursor: &mut Cursor, ctx: &mut ParseContext) -> Result<Self, ParseError> {
        let mut conditions = Vec::new();
        loop {
            conditions.push(parse_condition(cursor, ctx)?);
            if !cursor.eat(b'_') {
                break;
            }
        }
        redirect_add_address_operands(&mut conditions, ctx.memrefs);
        Ok(ConditionSet { conditions })
    }

    /// Whether any `PauseIf` condition in this set is satisfied this frame,
    /// replayed with the same numeric/boolean accumulator chaining
    /// `evaluate` uses but without ticking any hit counter, so calling this
    /// has no observable side effect. `AddHits`/`SubHits` chains are not
    /// replayed here -- they can't feed a `PauseIf` comparison; only the
    /// numeric and boolean chains can.
    fn any_pause_satisfied(
        &self,
        memrefs: &MemrefSet,
        groupvars: &crate::groupvar::GroupVarRegistry,
        recall: TypedValue,
    ) -> bool {
        let mut recall = recall;
        let mut value_acc: Option<TypedValue> = None;
        let mut bool_acc: Option<bool> = None;
        let mut bool_op: Option<BoolCombine> = None;

        for condition in &self.conditions {
            let prior_acc = value_acc.take();
            let comparison = condition.evaluate_comparison(memrefs, groupvars, recall, prior_acc);

            if condition.flag == ConditionFlag::Remember {
                recall = condition.left.value(memrefs, groupvars, recall);
            }

            match condition.flag {
                ConditionFlag::AddSource => {
                    let this_value = condition.left.value(memrefs, groupvars, recall);
                    value_acc = Some(prior_acc.map(|a| a.combine(this_value, ArithOp::Add)).unwrap_or(this_value));
                    continue;
                }
                ConditionFlag::SubSource => {
                    let negated =
                        TypedValue::U32(0).combine(condition.left.value(memrefs, groupvars, recall), ArithOp::Sub);
                    value_acc = Some(prior_acc.map(|a| a.combine(negated, ArithOp::Add)).unwrap_or(negated));
                    continue;
                }
                ConditionFlag::AndNext | ConditionFlag::OrNext => {
                    bool_acc = Some(combine_bool(bool_acc.take(), bool_op.take(), comparison));
                    bool_op = Some(if condition.flag == ConditionFlag::AndNext {
                        BoolCombine::And
                    } else {
                        BoolCombine::Or
                    });
                    continue;
                }
                ConditionFlag::AddAddress | ConditionFlag::AddHits | ConditionFlag::SubHits => continue,
                _ => {}
            }

            let effective = combine_bool(bool_acc.take(), bool_op.take(), comparison);
            if condition.flag == ConditionFlag::PauseIf && effective {
                return true;
            }
        }

        false
    }

    /// Evaluates every condition once, in order, applying accumulator
    /// chains and hit counting, and folds the result into one
    /// [`ConditionSetResult`]. `recall` is mutated in place by any
    /// `Remember` condition so later conditions in this same set see it.
    ///
    /// If any `PauseIf` condition is satisfied this frame, every hit count
    /// in the set is frozen for the whole frame -- checked first via
    /// [`ConditionSet::any_pause_satisfied`], matching the "pause freezes
    /// everything, not just its own branch" rule.
    pub fn evaluate(
        &mut self,
        memrefs: &MemrefSet,
        groupvars: &crate::groupvar::GroupVarRegistry,
        recall: &mut TypedValue,
    ) -> ConditionSetResult {
        let frame_paused = self.any_pause_satisfied(memrefs, groupvars, *recall);

        let mut result = ConditionSetResult {
            is_true: true,
            paused: frame_paused,
            ..Default::default()
        };

        let mut value_acc: Option<TypedValue> = None;
        let mut bool_acc: Option<bool> = None;
        let mut bool_op: Option<BoolCombine> = None;
        let mut hits_acc: i64 = 0;
        let mut skip_next = false;
        let mut measured_running: Option<TypedValue> = None;

        for condition in self.conditions.iter_mut() {
            let prior_acc = value_acc.take();
            let own_comparison = condition.evaluate_comparison(memrefs, groupvars, *recall, prior_acc);

            if condition.flag == ConditionFlag::Remember {
                *recall = condition.left.value(memrefs, groupvars, *recall);
            }

            match condition.flag {
                ConditionFlag::AddSource => {
                    let this_value = condition.left.value(memrefs, groupvars, *recall);
                    value_acc = Some(prior_acc.map(|a| a.combine(this_value, ArithOp::Add)).unwrap_or(this_value));
                    continue;
                }
                ConditionFlag::SubSource => {
                    let negated = TypedValue::U32(0)
                        .combine(condition.left.value(memrefs, groupvars, *recall), ArithOp::Sub);
                    value_acc = Some(prior_acc.map(|a| a.combine(negated, ArithOp::Add)).unwrap_or(negated));
                    continue;
                }
                ConditionFlag::AddAddress => {
                    // Already baked into the next condition's operand at
                    // parse time; nothing left to do here.
                    continue;
                }
                ConditionFlag::AndNext | ConditionFlag::OrNext => {
                    bool_acc = Some(combine_bool(bool_acc.take(), bool_op.take(), own_comparison));
                    bool_op = Some(if condition.flag == ConditionFlag::AndNext {
                        BoolCombine::And
                    } else {
                        BoolCombine::Or
                    });
                    continue;
                }
                ConditionFlag::AddHits => {
                    if !frame_paused {
                        condition.tick(own_comparison);
                    }
                    if own_comparison {
                        hits_acc += 1;
                    }
                    continue;
                }
                ConditionFlag::SubHits => {
                    if !frame_paused {
                        condition.tick(own_comparison);
                    }
                    if own_comparison {
                        hits_acc -= 1;
                    }
                    continue;
                }
                _ => {}
            }

            if skip_next {
                skip_next = false;
                continue;
            }

            let comparison = combine_bool(bool_acc.take(), bool_op.take(), own_comparison);
            let extra_hits = core::mem::take(&mut hits_acc);
            let satisfied = if frame_paused {
                // Hits are frozen: a threshold already crossed before the
                // pause stays satisfied, but no new progress is recorded
                // this frame.
                condition.required_hits > 0 && condition.hit_count() >= condition.required_hits
            } else {
                condition.tick_extra(comparison, extra_hits) || condition.required_hits == 0 && comparison
            };

            match condition.flag {
                ConditionFlag::PauseIf => {
                    // Pause state for this frame was already decided by
                    // `any_pause_satisfied`; nothing more to do.
                }
                ConditionFlag::ResetIf => {
                    if comparison {
                        result.reset = true;
                    }
                }
                ConditionFlag::ResetNextIf => {
                    if comparison {
                        skip_next = true;
                    }
                }
                ConditionFlag::Measured | ConditionFlag::MeasuredPercent => {
                    let value = if condition.required_hits > 0 {
                        TypedValue::U32(condition.hit_count())
                    } else {
                        condition.left.value(memrefs, groupvars, *recall)
                    };
                    measured_running = Some(match measured_running {
                        Some(running) => running.combine(value, ArithOp::Add),
                        None => value,
                    });
                }
                ConditionFlag::Trigger => {
                    // A `Trigger`-flagged condition gates the set's final
                    // Primed -> Triggered transition, not `is_true` itself:
                    // the set can report `is_true` with this condition still
                    // pending, which is exactly "primed".
                    result.has_trigger_condition = true;
                    if !satisfied {
                        result.trigger_pending = true;
                    }
                }
                ConditionFlag::MeasuredIf | ConditionFlag::Standard | ConditionFlag::Remember => {
                    if !satisfied && !condition.flag.is_measured() {
                        result.is_true = false;
                    }
                }
                ConditionFlag::AddSource
                | ConditionFlag::SubSource
                | ConditionFlag::AddAddress
                | ConditionFlag::AndNext
                | ConditionFlag::OrNext
                | ConditionFlag::AddHits
                | ConditionFlag::SubHits => unreachable!("combining flags handled above"),
            }
        }

        result.measured_value = measured_running;
        result
    }

    /// The `(target, as_percent)` a client reports progress against, taken
    /// from this set's first `Measured`/`MeasuredPercent` condition's hit
    /// target. `0` (no `required_hits`, i.e. the condition just exposes a
    /// raw value rather than counting toward a goal) means no defined
    /// target, so no progress percentage is ever reported.
    pub fn measured_target(&self) -> Option<(u32, bool)> {
        self.conditions
            .iter()
            .find(|condition| condition.flag.is_measured())
            .map(|condition| (condition.required_hits, condition.flag == ConditionFlag::MeasuredPercent))
    }

    /// Every condition's hit count, for progress persistence of a bare set
    /// (a rich presence display's gating expression) that has no
    /// surrounding [`crate::trigger::Trigger`] to hang state off of.
    pub fn hit_counts(&self) -> Vec<u32> {
        self.conditions.iter().map(|c| c.hit_count()).collect()
    }

    /// Restores hit counts previously captured by [`Self::hit_counts`].
    /// Extra or missing entries (a condition count mismatch) are ignored;
    /// the caller is expected to have already confirmed a digest match.
    pub fn restore_hits(&mut self, hits: &[u32]) {
        for (condition, hit) in self.conditions.iter_mut().zip(hits) {
            condition.restore_hits(*hit);
        }
    }
}

/// `AddAddress` doesn't combine a value into the next condition's
/// comparison: it redirects the *address* the next condition's memory
/// operand reads from, by the current value of its own operand. Rewritten
/// here into an indirect-read modified memref (refreshed every frame by the
/// ordinary memref pass) so pointer chasing stays current without needing a
/// live memory reader during condition evaluation.
///
/// Only a single immediately-preceding `AddAddress` condition whose own
/// operand is a plain address is rewritten; a chained `AddAddress` (more
/// than one in a row) or a `delta`/`prior` base falls back to no
/// redirection, since the accumulator this used to feed into no longer
/// exists.
fn redirect_add_address_operands(conditions: &mut [Condition], memrefs: &mut MemrefSet) {
    for i in 0..conditions.len().saturating_sub(1) {
        if conditions[i].flag != ConditionFlag::AddAddress {
            continue;
        }
        let Operand::Address(base) = conditions[i].left else {
            continue;
        };

        let next = &mut conditions[i + 1];
        next.left = redirect_operand(next.left, base, memrefs);
        if let Some(right) = next.right {
            next.right = Some(redirect_operand(right, base, memrefs));
        }
    }
}

fn redirect_operand(operand: Operand, base: MemrefHandle, memrefs: &mut MemrefSet) -> Operand {
    let target = match operand {
        Operand::Address(h) => h,
        // Delta/prior timing on a redirected read isn't representable by a
        // plain indirect-read modifier; leave those operands unredirected.
        _ => return operand,
    };
    let memref = *memrefs.memref(target);
    let modified = memrefs.alloc_modified(
        base,
        Modifier::IndirectRead {
            offset: memref.address as i32,
            size: memref.size,
        },
    );
    Operand::Modified(modified)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupvar::GroupVarRegistry;
    use crate::memref::MemSize;

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
    fn standard_condition_true_requires_comparison_true() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut mem = FakeMemory(vec![10]);
        let mut ctx = ParseContext {
            memrefs: &mut memrefs,
            groupvars: &mut groupvars,
        };
        let mut cursor = Cursor::new("0xH0000=10");
        let condition = parse_condition(&mut cursor, &mut ctx).unwrap();
        memrefs.refresh_all(&mut mem);

        let mut set = ConditionSet {
            conditions: vec![condition],
        };
        let mut recall = TypedValue::U32(0);
        let result = set.evaluate(&memrefs, &groupvars, &mut recall);
        assert!(result.is_true);
    }

    #[test]
    fn hit_target_requires_accumulated_frames() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut mem = FakeMemory(vec![1]);
        let mut ctx = ParseContext {
            memrefs: &mut memrefs,
            groupvars: &mut groupvars,
        };
        let mut cursor = Cursor::new("0xH0000=1.3.");
        let condition = parse_condition(&mut cursor, &mut ctx).unwrap();
        assert_eq!(condition.required_hits, 3);

        let mut set = ConditionSet {
            conditions: vec![condition],
        };
        let mut recall = TypedValue::U32(0);
        for expect_true in [false, false, true] {
            memrefs.refresh_all(&mut mem);
            let result = set.evaluate(&memrefs, &groupvars, &mut recall);
            assert_eq!(result.is_true, expect_true);
        }
    }

    #[test]
    fn pause_if_sets_paused_flag() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut mem = FakeMemory(vec![1]);
        let mut ctx = ParseContext {
            memrefs: &mut memrefs,
            groupvars: &mut groupvars,
        };
        let mut cursor = Cursor::new("P:0xH0000=1");
        let condition = parse_condition(&mut cursor, &mut ctx).unwrap();
        memrefs.refresh_all(&mut mem);
        let mut set = ConditionSet {
            conditions: vec![condition],
        };
        let mut recall = TypedValue::U32(0);
        let result = set.evaluate(&memrefs, &groupvars, &mut recall);
        assert!(result.paused);
    }

    #[test]
    fn different_size_tag_is_a_distinct_memref_address() {
        let _ = MemSize::Byte;
    }

    #[test]
    fn pause_freezes_hit_counts_of_every_condition_in_the_set() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut set =
            crate::parse::parse_condition_set("0xH0000=1.3._P:0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        let mut recall = TypedValue::U32(0);

        // Frame 1: not paused, hit-counted condition ticks to 1.
        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        set.evaluate(&memrefs, &groupvars, &mut recall);
        assert_eq!(set.conditions[0].hit_count(), 1);

        // Frame 2: PauseIf fires, so the hit count must stay at 1 even
        // though the first condition's comparison is still true.
        mem.0[1] = 1;
        memrefs.refresh_all(&mut mem);
        let result = set.evaluate(&memrefs, &groupvars, &mut recall);
        assert!(result.paused);
        assert_eq!(set.conditions[0].hit_count(), 1);

        // Frame 3: unpaused again, counting resumes from where it froze.
        mem.0[1] = 0;
        memrefs.refresh_all(&mut mem);
        set.evaluate(&memrefs, &groupvars, &mut recall);
        assert_eq!(set.conditions[0].hit_count(), 2);
    }

    #[test]
    fn add_hits_feeds_the_next_conditions_hit_count() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut set =
            crate::parse::parse_condition_set("C:0xH0000=1_0xH0001=1.2.", &mut memrefs, &mut groupvars).unwrap();
        let mut mem = FakeMemory(vec![1, 1]);
        memrefs.refresh_all(&mut mem);
        let mut recall = TypedValue::U32(0);

        // A fresh condition with required_hits=2 can't satisfy on its own
        // comparison alone in a single frame; the AddHits contribution must
        // push it over the threshold this same frame.
        let result = set.evaluate(&memrefs, &groupvars, &mut recall);
        assert!(result.is_true);
        assert_eq!(set.conditions[1].hit_count(), 2);
    }

    #[test]
    fn and_next_requires_both_conditions_true() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut set = crate::parse::parse_condition_set("N:0xH0000=1_0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        let mut recall = TypedValue::U32(0);

        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        assert!(!set.evaluate(&memrefs, &groupvars, &mut recall).is_true);

        mem.0[1] = 1;
        memrefs.refresh_all(&mut mem);
        assert!(set.evaluate(&memrefs, &groupvars, &mut recall).is_true);
    }

    #[test]
    fn add_address_redirects_the_next_operands_address() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut set =
            crate::parse::parse_condition_set("I:0xH0000_0xH0001=77", &mut memrefs, &mut groupvars).unwrap();
        // Byte 0 holds the pointer value 10; the next condition's operand
        // was parsed at address 0x0001, so it gets redirected to read
        // address 10 + 1 = 11, where the pointed-to byte lives.
        let mut mem = vec![0u8; 12];
        mem[0] = 10;
        mem[11] = 77;
        let mut mem = FakeMemory(mem);
        memrefs.refresh_all(&mut mem);
        let mut recall = TypedValue::U32(0);
        assert!(set.evaluate(&memrefs, &groupvars, &mut recall).is_true);
    }

    #[test]
    fn trigger_flag_reports_is_true_while_still_pending() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let mut set =
            crate::parse::parse_condition_set("0xH0000=1_T:0xH0001=1", &mut memrefs, &mut groupvars).unwrap();
        let mut mem = FakeMemory(vec![1, 0]);
        memrefs.refresh_all(&mut mem);
        let mut recall = TypedValue::U32(0);

        let result = set.evaluate(&memrefs, &groupvars, &mut recall);
        assert!(result.is_true);
        assert!(result.has_trigger_condition);
        assert!(result.trigger_pending);

        mem.0[1] = 1;
        memrefs.refresh_all(&mut mem);
        let result = set.evaluate(&memrefs, &groupvars, &mut recall);
        assert!(result.is_true);
        assert!(!result.trigger_pending);
    }

    #[test]
    fn measured_target_reads_the_hit_target_of_a_measured_condition() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let set = crate::parse::parse_condition_set("M:0xH0000.50.", &mut memrefs, &mut groupvars).unwrap();
        assert_eq!(set.measured_target(), Some((50, false)));
    }
}
