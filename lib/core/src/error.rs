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

#[cfg(feature = "std")]
use std::fmt::{Display, Formatter};
#[cfg(not(feature = "std"))]
use core::fmt::{Display, Formatter};

/// Errors raised while compiling a piece of the DSL (memrefs, operands,
/// conditions, condition sets, values, leaderboards, rich presence).
///
/// A parse error aborts only the artifact being compiled; siblings already
/// compiled, or compiled afterwards, are unaffected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    InvalidMemoryOperand,
    InvalidConstOperand,
    InvalidFpOperand,
    InvalidConditionType,
    InvalidOperator,
    InvalidRequiredHits,
    DuplicatedStart,
    DuplicatedCancel,
    DuplicatedSubmit,
    DuplicatedValue,
    DuplicatedProgress,
    MissingStart,
    MissingCancel,
    MissingSubmit,
    MissingValue,
    InvalidLboardField,
    MissingDisplayString,
    InvalidValueFlag,
    MissingValueMeasured,
    MultipleMeasured,
    InvalidMeasuredTarget,
    InvalidComparison,
    InvalidLuaOperand,
    /// Not part of the original taxonomy: the cursor ran out of input where
    /// more was expected (e.g. an unterminated `{name}` variable).
    UnexpectedEndOfInput,
}

/// Errors raised while driving the runtime after artifacts are compiled:
/// memory access, state, transport and authentication failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RuntimeError {
    OutOfMemory,
    InvalidState,
    InvalidJson,
    MissingValue,
    ApiFailure,
    LoginRequired,
    NoGameLoaded,
    HardcoreDisabled,
    Aborted,
    NoResponse,
    AccessDenied,
    InvalidCredentials,
    ExpiredToken,
    BufferOverflow,
}

impl Display for ParseError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let message = match self {
            ParseError::InvalidMemoryOperand => "invalid memory operand",
            ParseError::InvalidConstOperand => "invalid constant operand",
            ParseError::InvalidFpOperand => "invalid floating point operand",
            ParseError::InvalidConditionType => "invalid condition type",
            ParseError::InvalidOperator => "invalid operator",
            ParseError::InvalidRequiredHits => "invalid hit count",
            ParseError::DuplicatedStart => "duplicated start condition",
            ParseError::DuplicatedCancel => "duplicated cancel condition",
            ParseError::DuplicatedSubmit => "duplicated submit condition",
            ParseError::DuplicatedValue => "duplicated value",
            ParseError::DuplicatedProgress => "duplicated progress value",
            ParseError::MissingStart => "missing start condition",
            ParseError::MissingCancel => "missing cancel condition",
            ParseError::MissingSubmit => "missing submit condition",
            ParseError::MissingValue => "missing value",
            ParseError::InvalidLboardField => "invalid leaderboard field",
            ParseError::MissingDisplayString => "missing display string",
            ParseError::InvalidValueFlag => "invalid value flag",
            ParseError::MissingValueMeasured => "missing measured value",
            ParseError::MultipleMeasured => "multiple measured conditions",
            ParseError::InvalidMeasuredTarget => "invalid measured target",
            ParseError::InvalidComparison => "invalid comparison",
            ParseError::InvalidLuaOperand => "invalid Lua operand",
            ParseError::UnexpectedEndOfInput => "unexpected end of input",
        };

        write!(f, "{message}")
    }
}

impl Display for RuntimeError {
    fn fmt(&self, f: &mut Formatter<'_>) -> core::fmt::Result {
        let message = match self {
            RuntimeError::OutOfMemory => "out of memory",
            RuntimeError::InvalidState => "invalid state",
            RuntimeError::InvalidJson => "invalid json",
            RuntimeError::MissingValue => "missing value",
            RuntimeError::ApiFailure => "api call failed",
            RuntimeError::LoginRequired => "login required",
            RuntimeError::NoGameLoaded => "no game loaded",
            RuntimeError::HardcoreDisabled => "hardcore mode disabled",
            RuntimeError::Aborted => "aborted",
            RuntimeError::NoResponse => "no response",
            RuntimeError::AccessDenied => "access denied",
            RuntimeError::InvalidCredentials => "invalid credentials",
            RuntimeError::ExpiredToken => "expired token",
            RuntimeError::BufferOverflow => "buffer overflow",
        };

        write!(f, "{message}")
    }
}

#[cfg(feature = "std")]
impl std::error::Error for ParseError {}

#[cfg(feature = "std")]
impl std::error::Error for RuntimeError {}
