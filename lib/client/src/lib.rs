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

//! Lifecycle runtime wiring [`cheevo_core`]'s expression engine to a host's
//! network and memory-read collaborators: login, game identification,
//! per-frame evaluation, event dispatch, retry scheduling and progress
//! persistence.

pub mod error;
pub mod events;
pub mod load;
pub mod retry;
pub mod runtime;
pub mod scheduler;
pub mod server;
pub mod user;

pub use error::ClientError;
pub use events::{Event, EventQueue};
pub use load::{GameData, GameLoader, LoadState};
pub use runtime::{Client, ClientState};
pub use server::{CallOutcome, ServerCall};
pub use user::{Credentials, RuntimeConfig, Session};
