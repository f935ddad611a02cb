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

//! Recursive-descent compiler turning achievement definition strings into
//! [`crate::trigger::Trigger`]s, [`crate::value::Value`]s and rich presence
//! scripts, all allocated directly into a game's memref arena (no two-pass
//! byte measuring -- see `SPEC_FULL.md` for why that part of the original
//! allocator strategy doesn't carry over to a `Vec`-backed arena).

pub mod condition;
pub mod cursor;
pub mod operand;

#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::error::ParseError;
use crate::groupvar::GroupVarRegistry;
use crate::memref::MemrefSet;

pub use condition::{Condition, ConditionFlag, ConditionSet, ConditionSetResult};
pub use cursor::Cursor;
pub use operand::{Operand, ParseContext};

/// Splits a trigger definition into its core set and alt sets, matching the
/// source's `S`-delimited format: `core_conditions` optionally followed by
/// `Salt1Salt2...`.
pub fn split_condition_sets(definition: &str) -> Vec<&str> {
    definition.split('S').collect()
}

/// Splits a value definition into its condition sets, the legacy `$`
/// delimiter used for "take the best of several ways to measure this".
pub fn split_value_sets(definition: &str) -> Vec<&str> {
    definition.split('$').collect()
}

/// The four-to-six component parts of a leaderboard's wire definition.
pub struct LeaderboardDefinition<'a> {
    pub start: &'a str,
    pub cancel: &'a str,
    pub submit: &'a str,
    pub value: &'a str,
    pub progress: Option<&'a str>,
    pub format: Option<&'a str>,
}

/// Splits a leaderboard's wire definition:
/// `STA:trigger::SUB:trigger::CAN:trigger::VAL:value[::PRO:value][::FOR:fmt]`.
pub fn parse_leaderboard_definition(definition: &str) -> Result<LeaderboardDefinition<'_>, ParseError> {
    let rest = definition
        .strip_prefix("STA:")
        .ok_or(ParseError::InvalidLboardField)?;
    let (start, rest) = rest.split_once("::SUB:").ok_or(ParseError::InvalidLboardField)?;
    let (submit, rest) = rest.split_once("::CAN:").ok_or(ParseError::InvalidLboardField)?;
    let (cancel, rest) = rest.split_once("::VAL:").ok_or(ParseError::InvalidLboardField)?;

    let (before_format, format) = match rest.split_once("::FOR:") {
        Some((before, fmt)) => (before, Some(fmt)),
        None => (rest, None),
    };
    let (value, progress) = match before_format.split_once("::PRO:") {
        Some((value, pro)) => (value, Some(pro)),
        None => (before_format, None),
    };

    Ok(LeaderboardDefinition { start, cancel, submit, value, progress, format })
}

/// Parses one `_`-joined condition set string.
pub fn parse_condition_set(
    definition: &str,
    memrefs: &mut MemrefSet,
    groupvars: &mut GroupVarRegistry,
) -> Result<ConditionSet, ParseError> {
    let mut cursor = Cursor::new(definition);
    let mut ctx = ParseContext { memrefs, groupvars };
    let set = ConditionSet::parse(&mut cursor, &mut ctx)?;
    if !cursor.is_empty() {
        return Err(ParseError::InvalidConditionType);
    }
    Ok(set)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_core_and_alt_sets() {
        let parts = split_condition_sets("0xH0=1S0xH1=2S0xH2=3");
        assert_eq!(parts, vec!["0xH0=1", "0xH1=2", "0xH2=3"]);
    }

    #[test]
    fn parses_multi_condition_set() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let set = parse_condition_set("0xH0=1_0xH1=2", &mut memrefs, &mut groupvars).unwrap();
        assert_eq!(set.conditions.len(), 2);
    }

    #[test]
    fn parses_required_leaderboard_parts() {
        let def = parse_leaderboard_definition("STA:0xH0=1::SUB:0xH1=1::CAN:0xH2=1::VAL:M:0xH3").unwrap();
        assert_eq!(def.start, "0xH0=1");
        assert_eq!(def.submit, "0xH1=1");
        assert_eq!(def.cancel, "0xH2=1");
        assert_eq!(def.value, "M:0xH3");
        assert!(def.progress.is_none());
        assert!(def.format.is_none());
    }

    #[test]
    fn parses_optional_progress_and_format_suffixes() {
        let def = parse_leaderboard_definition(
            "STA:0xH0=1::SUB:0xH1=1::CAN:0xH2=1::VAL:M:0xH3::PRO:M:0xH4::FOR:SCORE",
        )
        .unwrap();
        assert_eq!(def.value, "M:0xH3");
        assert_eq!(def.progress, Some("M:0xH4"));
        assert_eq!(def.format, Some("SCORE"));
    }

    #[test]
    fn rejects_definition_missing_a_required_part() {
        assert!(parse_leaderboard_definition("STA:0xH0=1::SUB:0xH1=1::VAL:M:0xH3").is_err());
    }
}
