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

//! Named `{variable}` cells, supplemented from `src/rcheevos/groupvar.c`.
//!
//! Unlike a memref, a group variable is not read from host memory: it is a
//! host- or script-assigned cell, usable as the parent address of an
//! indirect memref so an array walk can be re-targeted without recompiling
//! the conditions that read through it.

#[cfg(not(feature = "std"))]
use alloc::string::String;
#[cfg(not(feature = "std"))]
use alloc::vec::Vec;

use crate::arena::{Arena, Handle};
use crate::memref::MemrefHandle;
use crate::typed_value::TypedValue;

pub type GroupVarHandle = Handle<GroupVar>;

/// One named cell plus the memrefs whose address depends on it.
#[derive(Debug, Clone)]
pub struct GroupVar {
    name: String,
    value: TypedValue,
    dependents: Vec<MemrefHandle>,
}

impl GroupVar {
    pub fn value(&self) -> TypedValue {
        self.value
    }

    pub fn name(&self) -> &str {
        &self.name
    }
}

/// A per-game table of group variables, keyed by name.
#[derive(Debug, Clone, Default)]
pub struct GroupVarRegistry {
    vars: Arena<GroupVar>,
}

impl GroupVarRegistry {
    pub fn new() -> Self {
        Self { vars: Arena::new() }
    }

    /// Returns the handle for `name`, creating a zero-valued cell on first
    /// reference -- a group variable doesn't need a separate declaration
    /// before use, matching the source's lazy allocation in
    /// `rc_alloc_groupvar`.
    pub fn resolve(&mut self, name: &str) -> GroupVarHandle {
        for handle in self.vars.handles() {
            if self.vars.get(handle).name == name {
                return handle;
            }
        }
        self.vars.push(GroupVar {
            name: String::from(name),
            value: TypedValue::U32(0),
            dependents: Vec::new(),
        })
    }

    /// Registers `memref` as depending on `var`'s value for its address.
    pub fn add_dependent(&mut self, var: GroupVarHandle, memref: MemrefHandle) {
        self.vars.get_mut(var).dependents.push(memref);
    }

    pub fn get(&self, handle: GroupVarHandle) -> &GroupVar {
        self.vars.get(handle)
    }

    pub fn len(&self) -> usize {
        self.vars.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vars.is_empty()
    }

    pub fn handle_at(&self, index: usize) -> GroupVarHandle {
        self.vars.handles().nth(index).expect("index out of bounds")
    }

    /// Assigns a new value to `var`; the caller (the game runtime) is
    /// responsible for re-pointing each dependent memref's address before
    /// the next refresh.
    pub fn set(&mut self, var: GroupVarHandle, value: TypedValue) -> &[MemrefHandle] {
        self.vars.get_mut(var).value = value;
        &self.vars.get(var).dependents
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resolve_is_idempotent_by_name() {
        let mut registry = GroupVarRegistry::new();
        let a = registry.resolve("index");
        let b = registry.resolve("index");
        assert_eq!(a, b);
    }

    #[test]
    fn distinct_names_get_distinct_handles() {
        let mut registry = GroupVarRegistry::new();
        let a = registry.resolve("a");
        let b = registry.resolve("b");
        assert_ne!(a, b);
    }

    #[test]
    fn set_returns_dependents_to_repoint() {
        use crate::memref::{MemSize, MemrefSet};

        let mut registry = GroupVarRegistry::new();
        let mut memrefs = MemrefSet::new();
        let var = registry.resolve("ptr");
        let dependent_memref = memrefs.alloc_memref(0, MemSize::Byte);
        registry.add_dependent(var, dependent_memref);
        let dependents = registry.set(var, TypedValue::U32(5));
        assert_eq!(dependents.len(), 1);
    }
}
