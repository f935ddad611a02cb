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

//! Formatters turning a raw `u32` macro argument into display text, used by
//! rich presence `@Macro()` substitutions.

#[cfg(not(feature = "std"))]
use alloc::format;
#[cfg(not(feature = "std"))]
use alloc::string::String;

/// The named formatter types, taken verbatim from the macro name table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueFormat {
    Value,
    Score,
    Frames,
    Seconds,
    Centiseconds,
    Minutes,
    SecondsAsMinutes,
    Float1,
    Float2,
    Float3,
    Float4,
    Float5,
    Float6,
    Fixed1,
    Fixed2,
    Fixed3,
    UnsignedValue,
    Tens,
    Hundreds,
    Thousands,
    UnformattedValue,
}

impl ValueFormat {
    pub fn from_name(name: &str) -> Option<Self> {
        Some(match name {
            "VALUE" => ValueFormat::Value,
            "SCORE" | "POINTS" => ValueFormat::Score,
            "FRAMES" => ValueFormat::Frames,
            "SECS" => ValueFormat::Seconds,
            "CENTISECS" => ValueFormat::Centiseconds,
            "MINUTES" => ValueFormat::Minutes,
            "SECS_AS_MINS" => ValueFormat::SecondsAsMinutes,
            "FLOAT1" => ValueFormat::Float1,
            "FLOAT2" => ValueFormat::Float2,
            "FLOAT3" => ValueFormat::Float3,
            "FLOAT4" => ValueFormat::Float4,
            "FLOAT5" => ValueFormat::Float5,
            "FLOAT6" => ValueFormat::Float6,
            "FIXED1" => ValueFormat::Fixed1,
            "FIXED2" => ValueFormat::Fixed2,
            "FIXED3" => ValueFormat::Fixed3,
            "UNSIGNED" => ValueFormat::UnsignedValue,
            "TENS" => ValueFormat::Tens,
            "HUNDREDS" => ValueFormat::Hundreds,
            "THOUSANDS" => ValueFormat::Thousands,
            "UNFORMATTED" => ValueFormat::UnformattedValue,
            _ => return None,
        })
    }

    /// Renders `raw` the way this formatter would, at 60 frames per second
    /// for the frame-derived time formats.
    pub fn render(self, raw: u32) -> String {
        const FRAMES_PER_SECOND: u32 = 60;

        match self {
            ValueFormat::Value | ValueFormat::UnsignedValue => format!("{raw}"),
            // Unlike `Value`, preserves a negative reading instead of
            // wrapping it into the unsigned range.
            ValueFormat::UnformattedValue => format!("{}", raw as i32),
            ValueFormat::Score => format!("{raw:06}"),
            ValueFormat::Frames => render_frames(raw, FRAMES_PER_SECOND),
            ValueFormat::Tens => format!("{}", raw / 10),
            ValueFormat::Hundreds => format!("{}", raw / 100),
            ValueFormat::Thousands => format!("{}", raw / 1000),
            ValueFormat::Seconds => format!("{}", raw / FRAMES_PER_SECOND),
            ValueFormat::Centiseconds => format!("{}", raw / (FRAMES_PER_SECOND / 100).max(1)),
            ValueFormat::Minutes => format!("{}", raw / (FRAMES_PER_SECOND * 60)),
            ValueFormat::SecondsAsMinutes => {
                let total_seconds = raw;
                format!("{:02}:{:02}", total_seconds / 60, total_seconds % 60)
            }
            ValueFormat::Float1 => render_fixed(raw, 1),
            ValueFormat::Float2 => render_fixed(raw, 2),
            ValueFormat::Float3 => render_fixed(raw, 3),
            ValueFormat::Float4 => render_fixed(raw, 4),
            ValueFormat::Float5 => render_fixed(raw, 5),
            ValueFormat::Float6 => render_fixed(raw, 6),
            ValueFormat::Fixed1 => render_divided(raw, 10),
            ValueFormat::Fixed2 => render_divided(raw, 100),
            ValueFormat::Fixed3 => render_divided(raw, 1000),
        }
    }
}

/// Renders a frame count as `h:mm:ss.cc`, matching the `FRAMES` macro's
/// h:mm:ss.ff display at `fps` frames per second.
fn render_frames(total_frames: u32, fps: u32) -> String {
    let total_seconds = total_frames / fps;
    let leftover_frames = total_frames % fps;
    let centiseconds = leftover_frames * 100 / fps;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;
    format!("{hours}:{minutes:02}:{seconds:02}.{centiseconds:02}")
}

/// Treats `raw` as a fixed-point number with `decimals` digits already
/// baked into the integer (i.e. divides by `10^decimals`), matching the
/// `FIXEDn` macro family.
fn render_divided(raw: u32, divisor: u32) -> String {
    let whole = raw / divisor;
    let frac = raw % divisor;
    format!("{whole}.{frac:0width$}", width = divisor_digits(divisor))
}

fn divisor_digits(divisor: u32) -> usize {
    match divisor {
        10 => 1,
        100 => 2,
        1000 => 3,
        _ => 0,
    }
}

/// Treats `raw` as the bit pattern of an `f32` (as the evaluator would pass
/// a floating-point measured value through as its raw bits) and formats it
/// with `decimals` digits, matching the `FLOATn` macro family.
fn render_fixed(raw: u32, decimals: usize) -> String {
    let value = f32::from_bits(raw);
    let scale = 10u32.pow(decimals as u32) as f32;
    let scaled = (value * scale).round() as i64;
    let whole = scaled / scale as i64;
    let frac = (scaled - whole * scale as i64).unsigned_abs();
    format!("{whole}.{frac:0width$}", width = decimals)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn value_format_passes_through() {
        assert_eq!(ValueFormat::Value.render(42), "42");
    }

    #[test]
    fn score_format_pads_to_six_digits() {
        assert_eq!(ValueFormat::Score.render(7), "000007");
    }

    #[test]
    fn seconds_as_minutes_splits_minutes_and_seconds() {
        assert_eq!(ValueFormat::SecondsAsMinutes.render(125), "02:05");
    }

    #[test]
    fn fixed1_divides_by_ten() {
        assert_eq!(ValueFormat::Fixed1.render(125), "12.5");
    }

    #[test]
    fn unknown_macro_name_is_rejected() {
        assert!(ValueFormat::from_name("NOT_A_FORMAT").is_none());
    }

    #[test]
    fn frames_renders_hours_minutes_seconds_and_centiseconds() {
        // 1 hour, 1 minute, 1 second and half a second, at 60fps.
        let total = 60 * 60 * 60 + 60 * 60 + 60 + 30;
        assert_eq!(ValueFormat::Frames.render(total), "1:01:01.50");
    }

    #[test]
    fn frames_under_a_minute_still_reports_zero_hours_and_minutes() {
        assert_eq!(ValueFormat::Frames.render(120), "0:00:02.00");
    }

    #[test]
    fn tens_hundreds_thousands_divide_down() {
        assert_eq!(ValueFormat::Tens.render(125), "12");
        assert_eq!(ValueFormat::Hundreds.render(125), "1");
        assert_eq!(ValueFormat::Thousands.render(1999), "1");
    }

    #[test]
    fn unformatted_value_preserves_sign() {
        let negative_one: u32 = (-1i32) as u32;
        assert_eq!(ValueFormat::UnformattedValue.render(negative_one), "-1");
        assert_eq!(ValueFormat::Value.render(negative_one), "4294967295");
    }
}
