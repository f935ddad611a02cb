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

use crate::error::ParseError;
use crate::groupvar::GroupVarRegistry;
use crate::memref::{MemSize, MemrefHandle, MemrefSet, Modifier};
use crate::parse::cursor::Cursor;
use crate::typed_value::TypedValue;

/// A single term feeding a condition's comparison, matching `rc_operand_t`'s
/// variants minus `RC_OPERAND_LUA` (the `lua` feature is a separate,
/// optional extension -- see [`crate::parse::lua`]).
#[derive(Debug, Clone, Copy)]
pub enum Operand {
    /// The memref's current value.
    Address(MemrefHandle),
    /// The memref's value from the previous frame.
    Delta(MemrefHandle),
    /// The memref's value the last time it changed.
    Prior(MemrefHandle),
    /// A derived cell (BCD, inverted, indirect-read or arithmetic) built on
    /// top of a memref.
    Modified(crate::memref::ModifiedMemrefHandle),
    ConstInt(i32),
    ConstFloat(f32),
    /// A named `{variable}` cell.
    GroupVar(crate::groupvar::GroupVarHandle),
    /// The value last captured by a `Remember` condition in the same
    /// condition set.
    Recall,
}

struct SizeTag {
    size: MemSize,
    len: usize,
}

/// Recognizes the size-tag letters that follow `0x`, matching the switch in
/// `rc_parse_memref`. Longest-match first so e.g. `H` isn't mistaken before
/// a two-letter tag.
fn parse_size_tag(cursor: &Cursor) -> Option<SizeTag> {
    const TAGS: &[(u8, MemSize)] = &[
        (b'H', MemSize::Byte),
        (b'W', MemSize::TByte),
        (b'X', MemSize::DWord),
        (b'M', MemSize::Bit0),
        (b'N', MemSize::Bit1),
        (b'O', MemSize::Bit2),
        (b'P', MemSize::Bit3),
        (b'Q', MemSize::Bit4),
        (b'R', MemSize::Bit5),
        (b'S', MemSize::Bit6),
        (b'T', MemSize::Bit7),
        (b'L', MemSize::Nibble0),
        (b'U', MemSize::Nibble1),
        (b'K', MemSize::BitCount),
        (b'I', MemSize::WordBe),
        (b'J', MemSize::TByteBe),
        (b'G', MemSize::DWordBe),
    ];

    let byte = cursor.peek()?;
    for (tag, size) in TAGS {
        if byte == *tag {
            return Some(SizeTag { size: *size, len: 1 });
        }
    }
    // No recognized letter tag: the default (bare `0x`) is a 16-bit word.
    Some(SizeTag { size: MemSize::Word, len: 0 })
}

fn parse_float_tag(cursor: &Cursor) -> Option<MemSize> {
    match cursor.peek()? {
        b'F' => Some(MemSize::Float),
        b'B' => Some(MemSize::FloatBe),
        b'H' => Some(MemSize::Double32),
        b'I' => Some(MemSize::Double32Be),
        b'M' => Some(MemSize::Mbf32),
        b'L' => Some(MemSize::Mbf32Le),
        _ => None,
    }
}

pub struct ParseContext<'m> {
    pub memrefs: &'m mut MemrefSet,
    pub groupvars: &'m mut GroupVarRegistry,
}

/// Parses one operand: `0xH1234`, `d0xH1234`, `p0xH1234`, `b0xH1234`
/// (BCD), `~0xH1234` (inverted), a plain integer, a float, `{name}`, or
/// `v<recall>`.
pub fn parse_operand(cursor: &mut Cursor, ctx: &mut ParseContext) -> Result<Operand, ParseError> {
    match cursor.peek() {
        Some(b'd') => {
            cursor.advance();
            let memref = parse_memory_reference(cursor, ctx)?;
            Ok(Operand::Delta(memref))
        }
        Some(b'p') => {
            cursor.advance();
            let memref = parse_memory_reference(cursor, ctx)?;
            Ok(Operand::Prior(memref))
        }
        Some(b'b') => {
            cursor.advance();
            let memref = parse_memory_reference(cursor, ctx)?;
            let modified = ctx.memrefs.alloc_modified(memref, Modifier::Bcd);
            Ok(Operand::Modified(modified))
        }
        Some(b'~') => {
            cursor.advance();
            let memref = parse_memory_reference(cursor, ctx)?;
            let modified = ctx.memrefs.alloc_modified(memref, Modifier::Invert);
            Ok(Operand::Modified(modified))
        }
        Some(b'0') => {
            let memref = parse_memory_reference(cursor, ctx)?;
            Ok(Operand::Address(memref))
        }
        Some(b'f') => {
            cursor.advance();
            cursor.expect(b'0')?;
            cursor.expect(b'x')?;
            let size = parse_float_tag(cursor).ok_or(ParseError::InvalidFpOperand)?;
            cursor.advance();
            let address = cursor.take_hex_u32()?;
            let memref = ctx.memrefs.alloc_memref(address, size);
            Ok(Operand::Address(memref))
        }
        Some(b'{') => {
            let name = cursor.take_braced_name()?;
            Ok(Operand::GroupVar(ctx.groupvars.resolve(name)))
        }
        Some(b'v') => {
            cursor.advance();
            Ok(Operand::Recall)
        }
        Some(b) if b == b'-' || b.is_ascii_digit() => {
            if cursor.peek_is_float() {
                Ok(Operand::ConstFloat(cursor.take_float()?))
            } else {
                Ok(Operand::ConstInt(cursor.take_decimal_i32()?))
            }
        }
        Some(_) => Err(ParseError::InvalidMemoryOperand),
        None => Err(ParseError::UnexpectedEndOfInput),
    }
}

/// Parses `0x` followed by an optional size tag and a hex address,
/// returning the memref handle for `(address, size)`.
pub fn parse_memory_reference(
    cursor: &mut Cursor,
    ctx: &mut ParseContext,
) -> Result<MemrefHandle, ParseError> {
    cursor.expect(b'0')?;
    cursor.expect(b'x')?;
    let tag = parse_size_tag(cursor).ok_or(ParseError::InvalidMemoryOperand)?;
    for _ in 0..tag.len {
        cursor.advance();
    }
    let address = cursor.take_hex_u32()?;
    Ok(ctx.memrefs.alloc_memref(address, tag.size))
}

impl Operand {
    /// Reads this operand's value given a snapshot of the memref arena.
    pub fn value(self, memrefs: &MemrefSet, groupvars: &GroupVarRegistry, recall: TypedValue) -> TypedValue {
        match self {
            Operand::Address(h) => raw_value(memrefs, h, memrefs.memref(h).current()),
            Operand::Delta(h) => raw_value(memrefs, h, memrefs.memref(h).delta()),
            Operand::Prior(h) => raw_value(memrefs, h, memrefs.memref(h).prior()),
            Operand::Modified(h) => memrefs.modified_memref(h).current(),
            Operand::ConstInt(v) => TypedValue::I32(v),
            Operand::ConstFloat(v) => TypedValue::F32(v),
            Operand::GroupVar(h) => groupvars.get(h).value(),
            Operand::Recall => recall,
        }
    }
}

fn raw_value(memrefs: &MemrefSet, handle: MemrefHandle, raw: u32) -> TypedValue {
    if memrefs.memref(handle).is_float() {
        TypedValue::F32(raw as f32)
    } else {
        TypedValue::U32(raw)
    }
}
