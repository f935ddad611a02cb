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

//! A versioned binary snapshot of everything needed to resume a session
//! mid-game: memref values, group variables, achievement/leaderboard hit
//! counts and rich presence display state. Chunk layout is grounded on
//! `src/rcheevos/runtime_progress.c` (marker, four-letter chunk tags,
//! trailing digest); the digest itself uses the `md-5` crate rather than
//! linking libmd5 directly.
//!
//! Achievement, leaderboard and rich presence chunks each carry an MD5
//! digest of the definition text they were compiled from. A snapshot taken
//! against one version of a game's data and restored into a differently
//! patched one will skip (and reset) only the entries whose digest no
//! longer matches, rather than failing the whole restore.

use md5::{Digest, Md5};

use crate::error::RuntimeError;
use crate::game::GameRuntime;
use crate::memref::MemSize;
use crate::trigger::TriggerState;
use crate::typed_value::TypedValue;

/// `b"RAP\n"` read as a little-endian `u32`, matching `RC_RUNTIME_MARKER`.
const MARKER: u32 = 0x0A50_4152;
const FORMAT_VERSION: u32 = 1;

const CHUNK_MREF: [u8; 4] = *b"MREF";
const CHUNK_VARS: [u8; 4] = *b"VARS";
const CHUNK_ACHV: [u8; 4] = *b"ACHV";
const CHUNK_LBRD: [u8; 4] = *b"LBRD";
const CHUNK_RICH: [u8; 4] = *b"RICH";
const CHUNK_DONE: [u8; 4] = *b"DONE";

/// Bit 16 of a memref's persisted flags word, matching
/// `RC_MEMREF_FLAG_CHANGED_THIS_FRAME`.
const MREF_FLAG_CHANGED: u32 = 0x0001_0000;

fn definition_digest(definition: &str) -> [u8; 16] {
    let mut hasher = Md5::new();
    hasher.update(definition.as_bytes());
    hasher.finalize().into()
}

fn write_u32(out: &mut Vec<u8>, value: u32) {
    out.extend_from_slice(&value.to_le_bytes());
}

fn read_u32(bytes: &[u8], pos: &mut usize) -> Result<u32, RuntimeError> {
    let slice = bytes.get(*pos..*pos + 4).ok_or(RuntimeError::BufferOverflow)?;
    *pos += 4;
    Ok(u32::from_le_bytes(slice.try_into().unwrap()))
}

fn write_typed_value(out: &mut Vec<u8>, value: TypedValue) {
    match value {
        TypedValue::U32(v) => {
            out.push(0);
            write_u32(out, v);
        }
        TypedValue::I32(v) => {
            out.push(1);
            write_u32(out, v as u32);
        }
        TypedValue::F32(v) => {
            out.push(2);
            write_u32(out, v.to_bits());
        }
    }
}

fn read_typed_value(bytes: &[u8], pos: &mut usize) -> Result<TypedValue, RuntimeError> {
    let tag = *bytes.get(*pos).ok_or(RuntimeError::BufferOverflow)?;
    *pos += 1;
    let raw = read_u32(bytes, pos)?;
    Ok(match tag {
        0 => TypedValue::U32(raw),
        1 => TypedValue::I32(raw as i32),
        2 => TypedValue::F32(f32::from_bits(raw)),
        _ => return Err(RuntimeError::InvalidState),
    })
}

fn write_chunk(out: &mut Vec<u8>, tag: [u8; 4], payload: &[u8]) {
    out.extend_from_slice(&tag);
    write_u32(out, payload.len() as u32);
    out.extend_from_slice(payload);
    // Pad to a 4-byte boundary, matching `rc_runtime_progress_end_chunk`.
    while out.len() % 4 != 0 {
        out.push(0);
    }
}

fn state_to_byte(state: TriggerState) -> u8 {
    match state {
        TriggerState::Inactive => 0,
        TriggerState::Waiting => 1,
        TriggerState::Active => 2,
        TriggerState::Primed => 3,
        TriggerState::Triggered => 4,
        TriggerState::Paused => 5,
        TriggerState::Disabled => 6,
    }
}

fn byte_to_state(byte: u8) -> Result<TriggerState, RuntimeError> {
    Ok(match byte {
        0 => TriggerState::Inactive,
        1 => TriggerState::Waiting,
        2 => TriggerState::Active,
        3 => TriggerState::Primed,
        4 => TriggerState::Triggered,
        5 => TriggerState::Paused,
        6 => TriggerState::Disabled,
        _ => return Err(RuntimeError::InvalidState),
    })
}

fn write_trigger(out: &mut Vec<u8>, trigger: &crate::trigger::Trigger) {
    out.push(state_to_byte(trigger.state()));
    write_typed_value(out, trigger.recall());
    match trigger.measured_value() {
        Some(v) => {
            out.push(1);
            write_u32(out, v);
        }
        None => out.push(0),
    }
    let hits = trigger.hit_counts();
    write_u32(out, hits.len() as u32);
    for hit in hits {
        write_u32(out, hit);
    }
}

fn read_trigger(
    trigger: &mut crate::trigger::Trigger,
    bytes: &[u8],
    pos: &mut usize,
) -> Result<(), RuntimeError> {
    let state = byte_to_state(*bytes.get(*pos).ok_or(RuntimeError::BufferOverflow)?)?;
    *pos += 1;
    let recall = read_typed_value(bytes, pos)?;
    let has_measured = *bytes.get(*pos).ok_or(RuntimeError::BufferOverflow)?;
    *pos += 1;
    let measured_value = if has_measured == 1 {
        Some(read_u32(bytes, pos)?)
    } else {
        None
    };
    let hit_len = read_u32(bytes, pos)? as usize;
    let mut hits = Vec::with_capacity(hit_len);
    for _ in 0..hit_len {
        hits.push(read_u32(bytes, pos)?);
    }
    trigger.restore(state, &hits, recall, measured_value);
    Ok(())
}

/// Advances `pos` past one serialized trigger without restoring it anywhere,
/// for an entry whose digest no longer matches the locally compiled
/// achievement or leaderboard it's keyed to.
fn skip_trigger(bytes: &[u8], pos: &mut usize) -> Result<(), RuntimeError> {
    bytes.get(*pos).ok_or(RuntimeError::BufferOverflow)?;
    *pos += 1;
    read_typed_value(bytes, pos)?;
    let has_measured = *bytes.get(*pos).ok_or(RuntimeError::BufferOverflow)?;
    *pos += 1;
    if has_measured == 1 {
        read_u32(bytes, pos)?;
    }
    let hit_len = read_u32(bytes, pos)? as usize;
    for _ in 0..hit_len {
        read_u32(bytes, pos)?;
    }
    Ok(())
}

/// Serializes `game`'s current progress into a self-contained byte buffer.
pub fn write_progress(game: &GameRuntime) -> Vec<u8> {
    let mut out = Vec::new();
    write_u32(&mut out, MARKER);
    write_u32(&mut out, FORMAT_VERSION);

    let mut mref_payload = Vec::new();
    for index in 0..game.memrefs().memref_count() {
        let handle = game.memrefs().memref_handle_at(index);
        let memref = game.memrefs().memref(handle);
        let (current, prior, changed) = memref.raw_state();
        write_u32(&mut mref_payload, memref.address);
        let mut flags = memref.size.to_byte() as u32;
        if changed {
            flags |= MREF_FLAG_CHANGED;
        }
        write_u32(&mut mref_payload, flags);
        write_u32(&mut mref_payload, current);
        write_u32(&mut mref_payload, prior);
    }
    write_chunk(&mut out, CHUNK_MREF, &mref_payload);

    let mut vars_payload = Vec::new();
    write_u32(&mut vars_payload, game.groupvars().len() as u32);
    for index in 0..game.groupvars().len() {
        let handle = game.groupvars().handle_at(index);
        write_typed_value(&mut vars_payload, game.groupvars().get(handle).value());
    }
    write_chunk(&mut out, CHUNK_VARS, &vars_payload);

    let mut achv_payload = Vec::new();
    write_u32(&mut achv_payload, game.achievements().len() as u32);
    for achievement in game.achievements() {
        write_u32(&mut achv_payload, achievement.id);
        achv_payload.extend_from_slice(&definition_digest(&achievement.definition));
        write_trigger(&mut achv_payload, &achievement.trigger);
    }
    write_chunk(&mut out, CHUNK_ACHV, &achv_payload);

    let mut lbrd_payload = Vec::new();
    write_u32(&mut lbrd_payload, game.leaderboards().len() as u32);
    for leaderboard in game.leaderboards() {
        write_u32(&mut lbrd_payload, leaderboard.id);
        lbrd_payload.extend_from_slice(&definition_digest(&leaderboard.definition));
        lbrd_payload.push(leaderboard.is_active() as u8);
        write_trigger(&mut lbrd_payload, leaderboard.start_trigger());
        write_trigger(&mut lbrd_payload, leaderboard.cancel_trigger());
        write_trigger(&mut lbrd_payload, leaderboard.submit_trigger());
    }
    write_chunk(&mut out, CHUNK_LBRD, &lbrd_payload);

    if let Some(rich_presence) = game.rich_presence() {
        let mut rich_payload = Vec::new();
        rich_payload.extend_from_slice(&rich_presence.script_digest());
        let counts = rich_presence.conditional_hit_counts();
        write_u32(&mut rich_payload, counts.len() as u32);
        for hits in &counts {
            write_u32(&mut rich_payload, hits.len() as u32);
            for hit in hits {
                write_u32(&mut rich_payload, *hit);
            }
        }
        write_chunk(&mut out, CHUNK_RICH, &rich_payload);
    }

    write_chunk(&mut out, CHUNK_DONE, &[]);

    let mut hasher = Md5::new();
    hasher.update(&out);
    out.extend_from_slice(&hasher.finalize());

    out
}

/// Restores `game`'s progress from a buffer produced by [`write_progress`].
/// `game` must already have every achievement/leaderboard/group variable
/// compiled in the same order they were when the snapshot was taken --
/// exactly as the source runtime requires an identical `rc_runtime_t`
/// shape before deserializing into it.
pub fn read_progress(game: &mut GameRuntime, bytes: &[u8]) -> Result<(), RuntimeError> {
    if bytes.len() < 16 {
        return Err(RuntimeError::BufferOverflow);
    }
    let (body, digest) = bytes.split_at(bytes.len() - 16);
    let mut hasher = Md5::new();
    hasher.update(body);
    if hasher.finalize().as_slice() != digest {
        return Err(RuntimeError::InvalidState);
    }

    let mut pos = 0usize;
    let marker = read_u32(body, &mut pos)?;
    if marker != MARKER {
        return Err(RuntimeError::InvalidState);
    }
    let _version = read_u32(body, &mut pos)?;

    loop {
        let tag = body.get(pos..pos + 4).ok_or(RuntimeError::BufferOverflow)?;
        pos += 4;
        let len = read_u32(body, &mut pos)? as usize;
        let payload = body.get(pos..pos + len).ok_or(RuntimeError::BufferOverflow)?;
        pos += len;
        while pos % 4 != 0 {
            pos += 1;
        }

        match tag {
            t if t == CHUNK_MREF => read_mref_chunk(game, payload)?,
            t if t == CHUNK_VARS => read_vars_chunk(game, payload)?,
            t if t == CHUNK_ACHV => read_achv_chunk(game, payload)?,
            t if t == CHUNK_LBRD => read_lbrd_chunk(game, payload)?,
            t if t == CHUNK_RICH => read_rich_chunk(game, payload)?,
            t if t == CHUNK_DONE => break,
            _ => return Err(RuntimeError::InvalidState),
        }
    }

    Ok(())
}

/// Restores every memref present in the snapshot that also exists locally,
/// matched by `(address, size)` rather than trusting index order (a memref
/// list's construction order can shift if a definition gained or lost
/// conditions between the snapshot and now).
fn read_mref_chunk(game: &mut GameRuntime, payload: &[u8]) -> Result<(), RuntimeError> {
    if payload.len() % 16 != 0 {
        return Err(RuntimeError::InvalidState);
    }
    let mut pos = 0;
    while pos < payload.len() {
        let address = read_u32(payload, &mut pos)?;
        let flags = read_u32(payload, &mut pos)?;
        let current = read_u32(payload, &mut pos)?;
        let prior = read_u32(payload, &mut pos)?;
        let size = MemSize::from_byte((flags & 0xff) as u8).ok_or(RuntimeError::InvalidState)?;
        let changed = flags & MREF_FLAG_CHANGED != 0;

        for index in 0..game.memrefs().memref_count() {
            let handle = game.memrefs().memref_handle_at(index);
            if game.memrefs().memref(handle).address == address && game.memrefs().memref(handle).size == size {
                game.memrefs_mut().memref_mut(handle).restore_state(current, prior, changed);
                break;
            }
        }
    }
    Ok(())
}

fn read_vars_chunk(game: &mut GameRuntime, payload: &[u8]) -> Result<(), RuntimeError> {
    let mut pos = 0;
    let count = read_u32(payload, &mut pos)? as usize;
    if count != game.groupvars().len() {
        return Err(RuntimeError::InvalidState);
    }
    for index in 0..count {
        let value = read_typed_value(payload, &mut pos)?;
        let handle = game.groupvars().handle_at(index);
        game.groupvars_mut().set(handle, value);
    }
    Ok(())
}

/// Restores each snapshot entry into the achievement sharing its id, but
/// only when that achievement's current definition digests the same as the
/// one the snapshot was taken against; otherwise the entry is skipped and
/// that one achievement is reset, leaving every other entry unaffected.
fn read_achv_chunk(game: &mut GameRuntime, payload: &[u8]) -> Result<(), RuntimeError> {
    let mut pos = 0;
    let count = read_u32(payload, &mut pos)? as usize;
    for _ in 0..count {
        let id = read_u32(payload, &mut pos)?;
        let digest = payload.get(pos..pos + 16).ok_or(RuntimeError::BufferOverflow)?;
        let digest: [u8; 16] = digest.try_into().unwrap();
        pos += 16;

        match game.achievements_mut().iter_mut().find(|a| a.id == id) {
            Some(achievement) if definition_digest(&achievement.definition) == digest => {
                read_trigger(&mut achievement.trigger, payload, &mut pos)?;
            }
            Some(achievement) => {
                skip_trigger(payload, &mut pos)?;
                achievement.trigger.reset();
            }
            None => {
                skip_trigger(payload, &mut pos)?;
            }
        }
    }
    Ok(())
}

/// Same digest-gated skip-and-reset behavior as [`read_achv_chunk`], applied
/// to a leaderboard's tracking flag and start/cancel/submit triggers.
fn read_lbrd_chunk(game: &mut GameRuntime, payload: &[u8]) -> Result<(), RuntimeError> {
    let mut pos = 0;
    let count = read_u32(payload, &mut pos)? as usize;
    for _ in 0..count {
        let id = read_u32(payload, &mut pos)?;
        let digest = payload.get(pos..pos + 16).ok_or(RuntimeError::BufferOverflow)?;
        let digest: [u8; 16] = digest.try_into().unwrap();
        pos += 16;
        let active = *payload.get(pos).ok_or(RuntimeError::BufferOverflow)? != 0;
        pos += 1;

        match game.leaderboards_mut().iter_mut().find(|l| l.id == id) {
            Some(leaderboard) if definition_digest(&leaderboard.definition) == digest => {
                leaderboard.set_active(active);
                read_trigger(leaderboard.start_trigger_mut(), payload, &mut pos)?;
                read_trigger(leaderboard.cancel_trigger_mut(), payload, &mut pos)?;
                read_trigger(leaderboard.submit_trigger_mut(), payload, &mut pos)?;
            }
            Some(leaderboard) => {
                skip_trigger(payload, &mut pos)?;
                skip_trigger(payload, &mut pos)?;
                skip_trigger(payload, &mut pos)?;
                leaderboard.set_active(false);
                leaderboard.start_trigger_mut().reset();
                leaderboard.cancel_trigger_mut().reset();
                leaderboard.submit_trigger_mut().reset();
            }
            None => {
                skip_trigger(payload, &mut pos)?;
                skip_trigger(payload, &mut pos)?;
                skip_trigger(payload, &mut pos)?;
            }
        }
    }
    Ok(())
}

/// Restores rich presence's conditional display hit counts only if the
/// script digest still matches; otherwise explicitly zeroes them, matching
/// the source runtime's `rc_reset_richpresence` rather than leaving stale
/// counts from a since-edited script in place.
fn read_rich_chunk(game: &mut GameRuntime, payload: &[u8]) -> Result<(), RuntimeError> {
    let mut pos = 0;
    let digest = payload.get(pos..pos + 16).ok_or(RuntimeError::BufferOverflow)?;
    let digest: [u8; 16] = digest.try_into().unwrap();
    pos += 16;
    let count = read_u32(payload, &mut pos)? as usize;
    let mut counts = Vec::with_capacity(count);
    for _ in 0..count {
        let len = read_u32(payload, &mut pos)? as usize;
        let mut hits = Vec::with_capacity(len);
        for _ in 0..len {
            hits.push(read_u32(payload, &mut pos)?);
        }
        counts.push(hits);
    }

    if let Some(rich_presence) = game.rich_presence_mut() {
        if rich_presence.script_digest() == digest {
            rich_presence.restore_conditional_hit_counts(&counts);
        } else {
            let reset: Vec<Vec<u32>> =
                rich_presence.conditional_hit_counts().iter().map(|hits| vec![0; hits.len()]).collect();
            rich_presence.restore_conditional_hit_counts(&reset);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

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
    fn round_trips_achievement_hit_progress() {
        let mut game = GameRuntime::new();
        game.add_achievement(1, 5, "0xH0000=1.3.").unwrap();
        let mut mem = FakeMemory(vec![1]);
        game.do_frame(&mut mem);
        game.do_frame(&mut mem);

        let snapshot = write_progress(&game);

        let mut restored = GameRuntime::new();
        restored.add_achievement(1, 5, "0xH0000=1.3.").unwrap();
        read_progress(&mut restored, &snapshot).unwrap();

        assert_eq!(
            restored.achievements()[0].trigger.hit_counts(),
            game.achievements()[0].trigger.hit_counts()
        );
    }

    #[test]
    fn rejects_corrupted_digest() {
        let mut game = GameRuntime::new();
        game.add_achievement(1, 5, "0xH0000=1").unwrap();
        let mut snapshot = write_progress(&game);
        let last = snapshot.len() - 1;
        snapshot[last] ^= 0xff;

        let mut restored = GameRuntime::new();
        restored.add_achievement(1, 5, "0xH0000=1").unwrap();
        assert!(read_progress(&mut restored, &snapshot).is_err());
    }

    #[test]
    fn round_trips_memref_current_prior_and_changed_flag() {
        let mut game = GameRuntime::new();
        game.add_achievement(1, 5, "0xH0000=1").unwrap();
        let mut mem = FakeMemory(vec![3]);
        game.do_frame(&mut mem);
        mem.0[0] = 7;
        game.do_frame(&mut mem);

        let snapshot = write_progress(&game);

        let mut restored = GameRuntime::new();
        restored.add_achievement(1, 5, "0xH0000=1").unwrap();
        read_progress(&mut restored, &snapshot).unwrap();

        let handle = restored.memrefs().memref_handle_at(0);
        let memref = restored.memrefs().memref(handle);
        assert_eq!(memref.current(), 7);
        assert_eq!(memref.prior(), 3);
        assert!(!memref.is_invalid());
    }

    #[test]
    fn achievement_with_changed_definition_is_skipped_and_reset_not_failed() {
        let mut game = GameRuntime::new();
        game.add_achievement(1, 5, "0xH0000=1.3.").unwrap();
        let mut mem = FakeMemory(vec![1]);
        game.do_frame(&mut mem);
        game.do_frame(&mut mem);
        let snapshot = write_progress(&game);

        // A differently authored achievement now lives under the same id.
        let mut restored = GameRuntime::new();
        restored.add_achievement(1, 5, "0xH0000=1.5.").unwrap();
        read_progress(&mut restored, &snapshot).unwrap();

        assert_eq!(restored.achievements()[0].trigger.hit_counts(), vec![0]);
    }

    #[test]
    fn rich_presence_hit_counts_round_trip_through_a_snapshot() {
        let mut game = GameRuntime::new();
        game.set_rich_presence("Display:\n0xH0000=1.2.@Nearly there\nJust playing").unwrap();
        let mut mem = FakeMemory(vec![1]);
        game.do_frame(&mut mem);
        let _ = game.rich_presence_text();

        let snapshot = write_progress(&game);

        let mut restored = GameRuntime::new();
        restored.set_rich_presence("Display:\n0xH0000=1.2.@Nearly there\nJust playing").unwrap();
        read_progress(&mut restored, &snapshot).unwrap();

        assert_eq!(
            restored.rich_presence().unwrap().conditional_hit_counts(),
            game.rich_presence().unwrap().conditional_hit_counts()
        );
    }

    #[test]
    fn rich_presence_with_changed_script_resets_instead_of_restoring_stale_hits() {
        let mut game = GameRuntime::new();
        game.set_rich_presence("Display:\n0xH0000=1.2.@Nearly there\nJust playing").unwrap();
        let mut mem = FakeMemory(vec![1]);
        game.do_frame(&mut mem);
        let _ = game.rich_presence_text();
        let snapshot = write_progress(&game);

        let mut restored = GameRuntime::new();
        restored.set_rich_presence("Display:\n0xH0000=1.3.@Nearly there\nJust playing").unwrap();
        read_progress(&mut restored, &snapshot).unwrap();

        assert_eq!(restored.rich_presence().unwrap().conditional_hit_counts(), vec![vec![0]]);
    }
}
