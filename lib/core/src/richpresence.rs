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

//! Rich presence: a templated status line re-evaluated every frame, built
//! from named `Format:` macros and conditional `Display:` entries.

#[cfg(not(feature = "std"))]
use alloc::string::{String, ToString};
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use md5::{Digest, Md5};

use crate::error::ParseError;
use crate::format::ValueFormat;
use crate::groupvar::GroupVarRegistry;
use crate::memref::MemrefSet;
use crate::parse::{parse_condition_set, ConditionSet};
use crate::value::{Aggregation, Value};

/// A `@Macro(operand)` substitution inside a display string.
struct Macro {
    name: String,
    value: Value,
    format: ValueFormat,
}

/// One candidate display line: an optional gating condition set (absent
/// for the final, always-true fallback line) plus the text template.
struct DisplayEntry {
    condition: Option<ConditionSet>,
    template: String,
}

/// A compiled rich presence script: zero or more `Format:` macro
/// definitions followed by an ordered list of `Display:` candidates, the
/// first whose condition passes (or the unconditional last one) wins.
pub struct RichPresence {
    macros: Vec<Macro>,
    entries: Vec<DisplayEntry>,
    /// Digest of the whole script, used by progress persistence as a
    /// coarse "is this still the same script" check before restoring any
    /// conditional display's hit counts.
    script_digest: [u8; 16],
}

impl RichPresence {
    /// Parses a script of the form:
    /// ```text
    /// Format:Points
    /// FormatType=SCORE
    /// Value:M:0xH0000
    ///
    /// Display:
    /// 0xH0001=1@Points()point mode
    /// Just playing
    /// ```
    /// Each macro definition is three lines (`Format:name`, `FormatType=`,
    /// `Value:`); the `Display:` section is conditional lines
    /// (`condition@template`) followed by one unconditional default line.
    pub fn parse(
        script: &str,
        memrefs: &mut MemrefSet,
        groupvars: &mut GroupVarRegistry,
    ) -> Result<Self, ParseError> {
        let mut macros = Vec::new();
        let mut entries = Vec::new();
        let mut lines = script.lines().peekable();
        let mut in_display = false;

        while let Some(line) = lines.next() {
            if line.is_empty() {
                continue;
            }
            if line == "Display:" {
                in_display = true;
                continue;
            }

            if !in_display {
                if let Some(name) = line.strip_prefix("Format:") {
                    let format_type_line = lines.next().ok_or(ParseError::UnexpectedEndOfInput)?;
                    let format_type = format_type_line
                        .strip_prefix("FormatType=")
                        .ok_or(ParseError::MissingDisplayString)?;
                    let format = ValueFormat::from_name(format_type)
                        .ok_or(ParseError::InvalidValueFlag)?;
                    let value_line = lines.next().ok_or(ParseError::UnexpectedEndOfInput)?;
                    let value_def = value_line
                        .strip_prefix("Value:")
                        .ok_or(ParseError::MissingValue)?;
                    let value = Value::parse(value_def, Aggregation::Max, memrefs, groupvars)?;
                    macros.push(Macro {
                        name: name.to_string(),
                        value,
                        format,
                    });
                }
                continue;
            }

            match line.split_once('@') {
                Some((condition_text, template)) if !condition_text.is_empty() && looks_like_condition(condition_text) => {
                    let condition = parse_condition_set(condition_text, memrefs, groupvars)?;
                    entries.push(DisplayEntry {
                        condition: Some(condition),
                        template: template.to_string(),
                    });
                }
                _ => {
                    entries.push(DisplayEntry {
                        condition: None,
                        template: line.to_string(),
                    });
                }
            }
        }

        if entries.is_empty() {
            return Err(ParseError::MissingDisplayString);
        }

        let mut hasher = Md5::new();
        hasher.update(script.as_bytes());
        let script_digest = hasher.finalize().into();

        Ok(RichPresence { macros, entries, script_digest })
    }

    /// Evaluates every conditional line in order and renders the template
    /// of the first one whose condition passes, substituting
    /// `@Name()`-style macro references along the way.
    pub fn evaluate(&mut self, memrefs: &MemrefSet, groupvars: &GroupVarRegistry) -> String {
        let mut chosen: Option<usize> = None;
        for (index, entry) in self.entries.iter_mut().enumerate() {
            match &mut entry.condition {
                Some(condition) => {
                    let mut recall = crate::typed_value::TypedValue::U32(0);
                    let result = condition.evaluate(memrefs, groupvars, &mut recall);
                    if result.is_true && !result.reset && !result.paused {
                        chosen = Some(index);
                        break;
                    }
                }
                None => {
                    chosen = Some(index);
                    break;
                }
            }
        }

        let Some(index) = chosen else {
            return String::new();
        };

        render_template(&self.entries[index].template, &mut self.macros, memrefs, groupvars)
    }

    pub fn script_digest(&self) -> [u8; 16] {
        self.script_digest
    }

    /// Every conditional display's hit counts, in entry order, for progress
    /// persistence (the unconditional fallback line has no condition and
    /// is skipped).
    pub fn conditional_hit_counts(&self) -> Vec<Vec<u32>> {
        self.entries.iter().filter_map(|e| e.condition.as_ref()).map(|c| c.hit_counts()).collect()
    }

    /// Restores hit counts previously captured by
    /// [`Self::conditional_hit_counts`]. Extra or missing entries are
    /// ignored; the caller is expected to have confirmed a digest match.
    pub fn restore_conditional_hit_counts(&mut self, counts: &[Vec<u32>]) {
        let mut iter = counts.iter();
        for entry in self.entries.iter_mut() {
            if let (Some(condition), Some(hits)) = (entry.condition.as_mut(), iter.next()) {
                condition.restore_hits(hits);
            }
        }
    }
}

/// Distinguishes a gating condition (`0xH1234=1`, `R:0xH1234=1`) from plain
/// display text that merely happens to contain an `@` macro call, by
/// requiring a `0x` memory reference within the first couple of characters
/// (immediately, or right after a one-letter flag prefix and a colon).
fn looks_like_condition(text: &str) -> bool {
    if text.starts_with("0x") {
        return true;
    }
    if let Some(colon) = text.find(':') {
        if colon <= 2 && text[colon + 1..].starts_with("0x") {
            return true;
        }
    }
    false
}

fn render_template(
    template: &str,
    macros: &mut [Macro],
    memrefs: &MemrefSet,
    groupvars: &GroupVarRegistry,
) -> String {
    let mut output = String::new();
    let mut rest = template;

    while let Some(at) = rest.find('@') {
        output.push_str(&rest[..at]);
        rest = &rest[at + 1..];

        let name_end = rest.find("()").map(|i| i + 2);
        match name_end {
            Some(end) => {
                let name = &rest[..end - 2];
                if let Some(m) = macros.iter_mut().find(|m| m.name == name) {
                    let raw = m.value.evaluate(memrefs, groupvars);
                    output.push_str(&m.format.render(raw));
                } else {
                    output.push('@');
                    output.push_str(name);
                    output.push_str("()");
                }
                rest = &rest[end..];
            }
            None => {
                output.push('@');
            }
        }
    }

    output.push_str(rest);
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::groupvar::GroupVarRegistry;

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
    fn falls_back_to_unconditional_default_line() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let script = "Display:\nJust playing";
        let mut rp = RichPresence::parse(script, &mut memrefs, &mut groupvars).unwrap();
        let mut mem = FakeMemory(vec![0]);
        memrefs.refresh_all(&mut mem);
        assert_eq!(rp.evaluate(&memrefs, &groupvars), "Just playing");
    }

    #[test]
    fn conditional_line_wins_when_true() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let script = "Display:\n0xH0000=1@In a boss fight\nExploring";
        let mut rp = RichPresence::parse(script, &mut memrefs, &mut groupvars).unwrap();

        let mut mem = FakeMemory(vec![0]);
        memrefs.refresh_all(&mut mem);
        assert_eq!(rp.evaluate(&memrefs, &groupvars), "Exploring");

        mem.0[0] = 1;
        memrefs.refresh_all(&mut mem);
        assert_eq!(rp.evaluate(&memrefs, &groupvars), "In a boss fight");
    }

    #[test]
    fn macro_substitution_renders_measured_value() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let script = "Format:Points\nFormatType=VALUE\nValue:M:0xH0000\n\nDisplay:\nScore: @Points()";
        let mut rp = RichPresence::parse(script, &mut memrefs, &mut groupvars).unwrap();
        let mut mem = FakeMemory(vec![42]);
        memrefs.refresh_all(&mut mem);
        assert_eq!(rp.evaluate(&memrefs, &groupvars), "Score: 42");
    }

    #[test]
    fn conditional_hit_counts_round_trip() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let script = "Display:\n0xH0000=1.2.@Nearly there\nJust playing";
        let mut rp = RichPresence::parse(script, &mut memrefs, &mut groupvars).unwrap();
        let mut mem = FakeMemory(vec![1]);
        memrefs.refresh_all(&mut mem);
        rp.evaluate(&memrefs, &groupvars);

        let counts = rp.conditional_hit_counts();
        assert_eq!(counts, vec![vec![1]]);

        let mut restored = RichPresence::parse(script, &mut MemrefSet::new(), &mut GroupVarRegistry::new()).unwrap();
        assert_eq!(restored.script_digest(), rp.script_digest());
        restored.restore_conditional_hit_counts(&counts);
        assert_eq!(restored.conditional_hit_counts(), vec![vec![1]]);
    }

    #[test]
    fn macro_applies_its_declared_format_rather_than_raw_value() {
        let mut memrefs = MemrefSet::new();
        let mut groupvars = GroupVarRegistry::new();
        let script = "Format:Points\nFormatType=SCORE\nValue:M:0xH0000\n\nDisplay:\nScore: @Points()";
        let mut rp = RichPresence::parse(script, &mut memrefs, &mut groupvars).unwrap();
        let mut mem = FakeMemory(vec![7]);
        memrefs.refresh_all(&mut mem);
        assert_eq!(rp.evaluate(&memrefs, &groupvars), "Score: 000007");
    }
}
