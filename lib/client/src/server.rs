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

//! Typed request/response pairs for the nine named server APIs, and the
//! [`ServerCall`] trait a host implements to actually transport them.
//! HTTP itself, JSON wire compatibility and request signing are
//! non-goals: these types exist only to drive the retry/unlock logic with
//! something structured instead of raw strings, per `SPEC_FULL.md` 2.

use serde::{Deserialize, Serialize};

use crate::user::Credentials;

#[derive(Debug, Clone, Serialize)]
pub struct LoginRequest {
    pub credentials: Credentials,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginResponse {
    pub success: bool,
    pub username: String,
    pub api_token: String,
    pub score: u32,
    pub num_unread_messages: u32,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct StartSessionRequest {
    pub game_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct StartSessionResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PatchRequest {
    pub game_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PatchResponse {
    pub success: bool,
    pub patch_data: String,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct UnlocksRequest {
    pub game_id: u32,
    pub hardcore: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UnlocksResponse {
    pub success: bool,
    pub unlocked_achievement_ids: Vec<u32>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AwardAchievementRequest {
    pub achievement_id: u32,
    pub hardcore: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AwardAchievementResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SubmitLbEntryRequest {
    pub leaderboard_id: u32,
    pub score: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitLbEntryResponse {
    pub success: bool,
    pub error: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PingRequest {
    pub game_id: u32,
    pub rich_presence: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PingResponse {
    pub success: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct GameIdRequest {
    pub content_hash: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GameIdResponse {
    pub success: bool,
    pub game_id: u32,
}

#[derive(Debug, Clone, Serialize)]
pub struct CodeNotesRequest {
    pub game_id: u32,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CodeNotesResponse {
    pub success: bool,
    pub notes: Vec<(u32, String)>,
}

/// Outcome of dispatching one request, abstracting away transport details
/// (HTTP status, connection refusal, timeout) behind three buckets the
/// retry layer cares about: got a clean response, got rejected by the
/// server, or never got an answer at all.
pub enum CallOutcome<T> {
    Success(T),
    Rejected(String),
    NoResponse,
}

/// A host-implemented transport. One method per named API, synchronous and
/// blocking from the engine's point of view -- matching the teacher's
/// callback-driven rather than `async fn`-based collaborator boundaries
/// (see `SPEC_FULL.md` 1, "no tokio/reqwest" decision).
pub trait ServerCall {
    fn login(&mut self, request: &LoginRequest) -> CallOutcome<LoginResponse>;
    fn start_session(&mut self, request: &StartSessionRequest) -> CallOutcome<StartSessionResponse>;
    fn patch(&mut self, request: &PatchRequest) -> CallOutcome<PatchResponse>;
    fn unlocks(&mut self, request: &UnlocksRequest) -> CallOutcome<UnlocksResponse>;
    fn award_achievement(&mut self, request: &AwardAchievementRequest) -> CallOutcome<AwardAchievementResponse>;
    fn submit_lb_entry(&mut self, request: &SubmitLbEntryRequest) -> CallOutcome<SubmitLbEntryResponse>;
    fn ping(&mut self, request: &PingRequest) -> CallOutcome<PingResponse>;
    fn game_id(&mut self, request: &GameIdRequest) -> CallOutcome<GameIdResponse>;
    fn code_notes(&mut self, request: &CodeNotesRequest) -> CallOutcome<CodeNotesResponse>;
}
