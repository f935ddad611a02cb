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

//! Expression engine for a retro-game achievement runtime: compiles the
//! memory-reference DSL into triggers, values and rich presence displays,
//! and evaluates them one emulated frame at a time.

#![cfg_attr(not(feature = "std"), no_std)]

extern crate alloc;
extern crate core;

pub mod arena;
pub mod error;
pub mod format;
pub mod game;
pub mod groupvar;
pub mod memref;
pub mod parse;
#[cfg(feature = "progress")]
pub mod progress;
pub mod richpresence;
pub mod trigger;
pub mod typed_value;
pub mod value;

pub use error::{ParseError, RuntimeError};
pub use game::GameRuntime;
pub use memref::{MemSize, Memref, MemrefHandle};
pub use trigger::{Trigger, TriggerState};
pub use typed_value::TypedValue;
pub use value::Value;

/// A host-supplied callback used to read the emulated address space.
///
/// Mirrors `rc_peek_t` from the source runtime: returns the number of bytes
/// actually read starting at `address` into `buf`. A short read (fewer bytes
/// than `buf.len()`) is authoritative -- the engine treats the address as
/// permanently invalid for the remainder of the session.
pub trait MemoryReader {
    fn read(&mut self, address: u32, buf: &mut [u8]) -> usize;
}

impl<F> MemoryReader for F
where
    F: FnMut(u32, &mut [u8]) -> usize,
{
    fn read(&mut self, address: u32, buf: &mut [u8]) -> usize {
        (self)(address, buf)
    }
}
