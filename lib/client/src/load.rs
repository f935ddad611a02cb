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

//! `begin_identify_and_load_game`'s coroutine-shaped continuation, modelled
//! as an explicit state enum the way the runtime's design notes describe:
//! `Identifying -> AwaitLogin -> FetchingGameData -> StartingSession -> Done`
//! or `UnknownGame` on failure.

use serde::Deserialize;

use cheevo_core::GameRuntime;

use crate::error::ClientError;
use crate::server::{
    CallOutcome, GameIdRequest, PatchRequest, ServerCall, StartSessionRequest, UnlocksRequest,
};
use crate::user::Session;

/// One achievement as described by a game's patch data.
#[derive(Debug, Clone, Deserialize)]
pub struct AchievementDef {
    pub id: u32,
    pub points: u32,
    pub definition: String,
    #[serde(default)]
    pub unofficial: bool,
}

/// One leaderboard as described by a game's patch data. `definition` is the
/// server's single combined wire string
/// (`STA:trigger::SUB:trigger::CAN:trigger::VAL:value[::PRO:value][::FOR:fmt]`),
/// not four separate fields.
#[derive(Debug, Clone, Deserialize)]
pub struct LeaderboardDef {
    pub id: u32,
    pub definition: String,
}

/// A console's declared memory map: region sizes used to validate every
/// memref address before the first frame, per the activation step.
#[derive(Debug, Clone, Deserialize)]
pub struct MemoryRegion {
    pub size: u32,
}

/// The parsed shape of one game's patch payload. `PatchResponse::patch_data`
/// carries this as JSON; the wire format itself is a non-goal, but the
/// shape a complete loader needs is not.
#[derive(Debug, Clone, Deserialize)]
pub struct GameData {
    pub game_id: u32,
    #[serde(default)]
    pub achievements: Vec<AchievementDef>,
    #[serde(default)]
    pub leaderboards: Vec<LeaderboardDef>,
    #[serde(default)]
    pub rich_presence: Option<String>,
    #[serde(default)]
    pub memory_regions: Vec<MemoryRegion>,
}

/// Where `begin_identify_and_load_game` currently is.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LoadState {
    Identifying,
    AwaitLogin,
    FetchingGameData,
    StartingSession,
    Done,
    UnknownGame,
}

/// Drives one load attempt to completion against a [`ServerCall`]
/// collaborator, synchronously (the callback races the spec describes
/// collapse to ordinary sequential calls under this crate's
/// blocking-transport decision).
pub struct GameLoader {
    state: LoadState,
    test_unofficial: bool,
}

impl GameLoader {
    pub fn new(test_unofficial: bool) -> Self {
        Self { state: LoadState::Identifying, test_unofficial }
    }

    pub fn state(&self) -> &LoadState {
        &self.state
    }

    /// Runs the full identify/resolve/fetch/start/activate sequence.
    /// `session` must already reflect a completed login; the load state
    /// machine parks in `AwaitLogin` and fails fast otherwise, matching the
    /// "login happens-before any game-identify response" ordering rule.
    pub fn load(
        &mut self,
        server: &mut dyn ServerCall,
        session: Option<&Session>,
        content_hash: &str,
        hardcore_enabled: bool,
    ) -> Result<GameRuntime, ClientError> {
        if session.is_none() {
            self.state = LoadState::AwaitLogin;
            return Err(ClientError::WrongState("begin_identify_and_load_game"));
        }

        self.state = LoadState::Identifying;
        let game_id = match server.game_id(&GameIdRequest { content_hash: content_hash.into() }) {
            CallOutcome::Success(response) if response.success && response.game_id != 0 => response.game_id,
            CallOutcome::Success(_) => {
                self.state = LoadState::UnknownGame;
                return Err(ClientError::Rejected("unknown game".into()));
            }
            CallOutcome::Rejected(reason) => {
                self.state = LoadState::UnknownGame;
                return Err(ClientError::Rejected(reason));
            }
            CallOutcome::NoResponse => return Err(ClientError::Unreachable),
        };

        self.state = LoadState::FetchingGameData;
        let patch = match server.patch(&PatchRequest { game_id }) {
            CallOutcome::Success(response) if response.success => response,
            CallOutcome::Success(response) => {
                return Err(ClientError::Rejected(response.error.unwrap_or_default()))
            }
            CallOutcome::Rejected(reason) => return Err(ClientError::Rejected(reason)),
            CallOutcome::NoResponse => return Err(ClientError::Unreachable),
        };
        let game_data: GameData =
            serde_json::from_str(&patch.patch_data).map_err(|_| ClientError::Rejected("malformed patch data".into()))?;

        self.state = LoadState::StartingSession;
        match server.start_session(&StartSessionRequest { game_id }) {
            CallOutcome::Success(response) if response.success => {}
            CallOutcome::Success(response) => {
                return Err(ClientError::Rejected(response.error.unwrap_or_default()))
            }
            CallOutcome::Rejected(reason) => return Err(ClientError::Rejected(reason)),
            CallOutcome::NoResponse => return Err(ClientError::Unreachable),
        }

        let hardcore_unlocks = fetch_unlocks(server, game_id, true)?;
        let softcore_unlocks = fetch_unlocks(server, game_id, false)?;

        let region_budget: u64 = game_data.memory_regions.iter().map(|r| r.size as u64).sum();
        let runtime = self.activate(&game_data, &hardcore_unlocks, &softcore_unlocks, region_budget, hardcore_enabled)?;

        self.state = LoadState::Done;
        Ok(runtime)
    }

    /// Compiles every artifact, applies already-unlocked achievements and
    /// drops the ones whose every memref address falls outside the
    /// console's declared memory map.
    fn activate(
        &self,
        game_data: &GameData,
        hardcore_unlocks: &[u32],
        softcore_unlocks: &[u32],
        region_budget: u64,
        hardcore_enabled: bool,
    ) -> Result<GameRuntime, ClientError> {
        let mut runtime = GameRuntime::new();
        runtime.set_game_id(game_data.game_id);

        for def in &game_data.achievements {
            if def.unofficial && !self.test_unofficial {
                continue;
            }
            if region_budget > 0 && exceeds_region_budget(&def.definition, region_budget) {
                continue;
            }
            runtime
                .add_achievement(def.id, def.points, &def.definition)
                .map_err(|e| ClientError::Rejected(format!("{e}")))?;
        }

        for lb in &game_data.leaderboards {
            runtime
                .add_leaderboard(lb.id, &lb.definition)
                .map_err(|e| ClientError::Rejected(format!("{e}")))?;
        }

        if let Some(script) = &game_data.rich_presence {
            runtime
                .set_rich_presence(script)
                .map_err(|e| ClientError::Rejected(format!("{e}")))?;
        }

        let already_unlocked = if hardcore_enabled { hardcore_unlocks } else { softcore_unlocks };
        for achievement in runtime.achievements_mut() {
            if already_unlocked.contains(&achievement.id) {
                achievement.trigger.disable();
            }
        }

        Ok(runtime)
    }
}

fn fetch_unlocks(server: &mut dyn ServerCall, game_id: u32, hardcore: bool) -> Result<Vec<u32>, ClientError> {
    match server.unlocks(&UnlocksRequest { game_id, hardcore }) {
        CallOutcome::Success(response) if response.success => Ok(response.unlocked_achievement_ids),
        CallOutcome::Success(response) => Err(ClientError::Rejected(response.error.unwrap_or_default())),
        CallOutcome::Rejected(reason) => Err(ClientError::Rejected(reason)),
        CallOutcome::NoResponse => Err(ClientError::Unreachable),
    }
}

/// Coarse address-budget check: every `0x` literal address referenced by a
/// definition must fall within the console's declared memory size. This
/// mirrors the activation-path validation without requiring a second,
/// fully structural parse of the trigger definition.
fn exceeds_region_budget(definition: &str, region_budget: u64) -> bool {
    let mut bytes = definition.as_bytes();
    while let Some(pos) = find(bytes, b"0x") {
        bytes = &bytes[pos + 2..];
        let mut hex_start = 0;
        while hex_start < bytes.len() && bytes[hex_start].is_ascii_alphabetic() && !bytes[hex_start].is_ascii_hexdigit() {
            hex_start += 1;
        }
        let mut end = hex_start;
        while end < bytes.len() && bytes[end].is_ascii_hexdigit() {
            end += 1;
        }
        if end > hex_start {
            if let Ok(text) = core::str::from_utf8(&bytes[hex_start..end]) {
                if let Ok(addr) = u32::from_str_radix(text, 16) {
                    if addr as u64 >= region_budget {
                        return true;
                    }
                }
            }
        }
        bytes = &bytes[end..];
    }
    false
}

fn find(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    haystack.windows(needle.len()).position(|w| w == needle)
}
