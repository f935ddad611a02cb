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

#![cfg_attr(not(feature = "std"), no_std)]

//! Umbrella crate bundling the expression engine and, when the `client`
//! feature is enabled, the login/load/frame lifecycle runtime on top of
//! it -- the single dependency an emulator embeds.

pub use cheevo_core as core;

#[cfg(feature = "client")]
pub use cheevo_client as client;

pub use cheevo_core::{GameRuntime, MemSize, MemoryReader, Memref, MemrefHandle, ParseError, RuntimeError, Trigger, TriggerState, TypedValue, Value};

#[cfg(feature = "client")]
pub use cheevo_client::{CallOutcome, Client, ClientError, ClientState, Credentials, Event, RuntimeConfig, ServerCall, Session};
