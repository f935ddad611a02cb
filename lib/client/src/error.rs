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

use std::fmt::{Display, Formatter};

pub use cheevo_core::RuntimeError as CoreError;

/// Errors the client lifecycle can surface to its host, layered on top of
/// [`CoreError`] with the transport/session failures the expression engine
/// has no concept of.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientError {
    Core(CoreError),
    /// The server rejected the request outright (bad credentials, banned
    /// account, unknown game).
    Rejected(String),
    /// The request could not be sent or no response arrived after
    /// exhausting the retry policy.
    Unreachable,
    /// An operation was attempted that requires a different lifecycle
    /// state (e.g. `do_frame` before a game is loaded).
    WrongState(&'static str),
}

impl Display for ClientError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            ClientError::Core(e) => write!(f, "{e}"),
            ClientError::Rejected(reason) => write!(f, "request rejected: {reason}"),
            ClientError::Unreachable => write!(f, "server unreachable"),
            ClientError::WrongState(op) => write!(f, "invalid state for {op}"),
        }
    }
}

impl std::error::Error for ClientError {}

impl From<CoreError> for ClientError {
    fn from(value: CoreError) -> Self {
        ClientError::Core(value)
    }
}
