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

/// A simple byte cursor over one condition/operand definition string.
///
/// The DSL is pure ASCII, so this walks bytes rather than chars to keep the
/// size-tag and hex-digit scanning branch-free.
#[derive(Clone, Copy)]
pub struct Cursor<'a> {
    input: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub fn new(input: &'a str) -> Self {
        Self {
            input: input.as_bytes(),
            pos: 0,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.pos >= self.input.len()
    }

    pub fn peek(&self) -> Option<u8> {
        self.input.get(self.pos).copied()
    }

    pub fn advance(&mut self) -> Option<u8> {
        let byte = self.peek()?;
        self.pos += 1;
        Some(byte)
    }

    /// Consumes `byte` if it is next, returning whether it matched.
    pub fn eat(&mut self, byte: u8) -> bool {
        if self.peek() == Some(byte) {
            self.pos += 1;
            true
        } else {
            false
        }
    }

    pub fn expect(&mut self, byte: u8) -> Result<(), ParseError> {
        if self.eat(byte) {
            Ok(())
        } else {
            Err(ParseError::UnexpectedEndOfInput)
        }
    }

    /// Consumes hex digits and returns them as a `u32`, matching the
    /// source's unbounded-width hex address parsing (`strtoul(str, ..., 16)`).
    pub fn take_hex_u32(&mut self) -> Result<u32, ParseError> {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_hexdigit()) {
            self.pos += 1;
        }
        if self.pos == start {
            return Err(ParseError::InvalidMemoryOperand);
        }
        let text = core::str::from_utf8(&self.input[start..self.pos]).unwrap();
        u32::from_str_radix(text, 16).map_err(|_| ParseError::InvalidMemoryOperand)
    }

    /// Consumes decimal digits (with an optional leading `-`) and returns
    /// them as an `i32`.
    pub fn take_decimal_i32(&mut self) -> Result<i32, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        let digits_start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.pos == digits_start {
            return Err(ParseError::InvalidConstOperand);
        }
        let text = core::str::from_utf8(&self.input[start..self.pos]).unwrap();
        text.parse::<i32>().map_err(|_| ParseError::InvalidConstOperand)
    }

    /// Consumes a float literal (digits, optional `.`, optional more
    /// digits) and returns it as an `f32`.
    pub fn take_float(&mut self) -> Result<f32, ParseError> {
        let start = self.pos;
        if self.peek() == Some(b'-') {
            self.pos += 1;
        }
        while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.eat(b'.') {
            while matches!(self.peek(), Some(b) if b.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if self.pos == start {
            return Err(ParseError::InvalidFpOperand);
        }
        let text = core::str::from_utf8(&self.input[start..self.pos]).unwrap();
        text.parse::<f32>().map_err(|_| ParseError::InvalidFpOperand)
    }

    /// Consumes a bracketed `{name}` variable identifier, returning its
    /// interior bytes as a str.
    pub fn take_braced_name(&mut self) -> Result<&'a str, ParseError> {
        self.expect(b'{')?;
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b != b'}') {
            self.pos += 1;
        }
        if self.is_empty() {
            return Err(ParseError::UnexpectedEndOfInput);
        }
        let name = core::str::from_utf8(&self.input[start..self.pos]).unwrap();
        self.expect(b'}')?;
        Ok(name)
    }

    /// Looks ahead (without consuming) through a leading `-` and run of
    /// digits to see whether a `.` follows, distinguishing a float literal
    /// from a plain integer.
    pub fn peek_is_float(&self) -> bool {
        let mut pos = self.pos;
        if self.input.get(pos) == Some(&b'-') {
            pos += 1;
        }
        while matches!(self.input.get(pos), Some(b) if b.is_ascii_digit()) {
            pos += 1;
        }
        self.input.get(pos) == Some(&b'.')
    }

    /// Consumes an identifier made of ascii-alphanumeric characters.
    pub fn take_ident(&mut self) -> &'a str {
        let start = self.pos;
        while matches!(self.peek(), Some(b) if b.is_ascii_alphanumeric()) {
            self.pos += 1;
        }
        core::str::from_utf8(&self.input[start..self.pos]).unwrap()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hex_parsing_stops_at_non_hex() {
        let mut cursor = Cursor::new("1234=5");
        assert_eq!(cursor.take_hex_u32().unwrap(), 0x1234);
        assert_eq!(cursor.peek(), Some(b'='));
    }

    #[test]
    fn decimal_parsing_accepts_negative() {
        let mut cursor = Cursor::new("-42x");
        assert_eq!(cursor.take_decimal_i32().unwrap(), -42);
    }

    #[test]
    fn braced_name_extracts_interior() {
        let mut cursor = Cursor::new("{level}rest");
        assert_eq!(cursor.take_braced_name().unwrap(), "level");
        assert_eq!(cursor.take_ident(), "rest");
    }
}
