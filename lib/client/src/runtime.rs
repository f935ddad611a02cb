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

//! [`Client`]: the single opaque handle a host drives one frame at a time,
//! wiring together login, game loading, frame evaluation, event dispatch
//! and progress persistence. Owns one [`GameRuntime`] once a game is
//! loaded, the way the teacher's `EmulatorCore` owns one `GameBoy`.

use core::time::Duration;

use cheevo_core::{GameRuntime, MemoryReader};

use crate::error::ClientError;
use crate::events::{Event, EventQueue};
use crate::load::GameLoader;
use crate::retry::{backoff_delay, classify, Classified};
use crate::scheduler::{Scheduler, Task};
use crate::server::{
    AwardAchievementRequest, CallOutcome, LoginRequest, PingRequest, ServerCall, SubmitLbEntryRequest,
};
use crate::user::{Credentials, RuntimeConfig, Session};

/// Where the client as a whole currently sits, independent of a specific
/// load attempt's [`crate::load::LoadState`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ClientState {
    LoggedOut,
    LoggingIn,
    LoggedIn,
    GameLoaded,
}

/// An unlock or leaderboard submission waiting on a retry, tracked so
/// `idle()` can re-attempt it once its backoff elapses.
enum PendingSubmission {
    Unlock { achievement_id: u32, hardcore: bool, attempt: u32 },
    Leaderboard { leaderboard_id: u32, score: i64, attempt: u32 },
}

/// The opaque runtime handle. Generic over the host's memory-read and
/// server-transport collaborators, matching the two callbacks `create`
/// takes in the source interface.
pub struct Client<S: ServerCall> {
    server: S,
    config: RuntimeConfig,
    state: ClientState,
    session: Option<Session>,
    game: Option<GameRuntime>,
    loader: Option<GameLoader>,
    scheduler: Scheduler,
    events: EventQueue,
    pending: Vec<PendingSubmission>,
}

impl<S: ServerCall> Client<S> {
    pub fn new(server: S, config: RuntimeConfig) -> Self {
        Self {
            server,
            config,
            state: ClientState::LoggedOut,
            session: None,
            game: None,
            loader: None,
            scheduler: Scheduler::new(),
            events: EventQueue::new(),
            pending: Vec::new(),
        }
    }

    pub fn state(&self) -> ClientState {
        self.state
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    pub fn is_hardcore(&self) -> bool {
        self.config.hardcore
    }

    pub fn set_hardcore_enabled(&mut self, enabled: bool) {
        self.config.hardcore = enabled;
    }

    pub fn set_encore_mode_enabled(&mut self, enabled: bool) {
        self.config.encore_mode = enabled;
    }

    pub fn set_spectator_mode_enabled(&mut self, enabled: bool) {
        self.config.spectator_mode = enabled;
    }

    pub fn set_test_unofficial(&mut self, enabled: bool) {
        self.config.test_unofficial = enabled;
    }

    /// Logs in with a raw password. Empty credentials are rejected without
    /// a round trip.
    pub fn begin_login_with_password(&mut self, username: &str, password: &str) -> Result<(), ClientError> {
        if username.is_empty() || password.is_empty() {
            return Err(ClientError::WrongState("begin_login_with_password"));
        }
        self.login(Credentials::Password { username: username.into(), password: password.into() })
    }

    pub fn begin_login_with_token(&mut self, username: &str, token: &str) -> Result<(), ClientError> {
        if username.is_empty() || token.is_empty() {
            return Err(ClientError::WrongState("begin_login_with_token"));
        }
        self.login(Credentials::Token { username: username.into(), token: token.into() })
    }

    fn login(&mut self, credentials: Credentials) -> Result<(), ClientError> {
        self.state = ClientState::LoggingIn;
        match self.server.login(&LoginRequest { credentials }) {
            CallOutcome::Success(response) if response.success => {
                self.session = Some(Session {
                    username: response.username,
                    api_token: response.api_token,
                    score: response.score,
                    num_unread_messages: response.num_unread_messages,
                });
                self.state = ClientState::LoggedIn;
                Ok(())
            }
            CallOutcome::Success(response) => {
                self.state = ClientState::LoggedOut;
                Err(ClientError::Rejected(response.error.unwrap_or_else(|| "login failed".into())))
            }
            CallOutcome::Rejected(reason) => {
                self.state = ClientState::LoggedOut;
                Err(ClientError::Rejected(reason))
            }
            CallOutcome::NoResponse => {
                self.state = ClientState::LoggedOut;
                Err(ClientError::Unreachable)
            }
        }
    }

    /// Identifies a game from its content hash and loads every compiled
    /// artifact, applying already-earned unlocks and scheduling the
    /// 30-second rich-presence ping.
    pub fn begin_identify_and_load_game(&mut self, content_hash: &str) -> Result<(), ClientError> {
        if self.session.is_none() {
            return Err(ClientError::WrongState("begin_identify_and_load_game"));
        }
        let mut loader = GameLoader::new(self.config.test_unofficial);
        let runtime = loader.load(&mut self.server, self.session.as_ref(), content_hash, self.config.hardcore)?;
        self.game = Some(runtime);
        self.loader = Some(loader);
        self.state = ClientState::GameLoaded;
        self.scheduler.schedule(Task::Ping, Duration::from_secs(30));
        Ok(())
    }

    pub fn unload_game(&mut self) {
        self.game = None;
        self.loader = None;
        self.scheduler.cancel(Task::Ping);
        self.pending.clear();
        if self.session.is_some() {
            self.state = ClientState::LoggedIn;
        }
    }

    /// Refreshes memory, evaluates every achievement and leaderboard, and
    /// returns the events produced this frame in their fixed dispatch
    /// order.
    pub fn do_frame(&mut self, reader: &mut dyn MemoryReader) -> Result<Vec<Event>, ClientError> {
        let game = self.game.as_mut().ok_or(ClientError::WrongState("do_frame"))?;
        let report = game.do_frame(reader);

        for id in report.triggered_achievements {
            self.events.push_unlock(id);
            self.pending.push(PendingSubmission::Unlock { achievement_id: id, hardcore: self.config.hardcore, attempt: 0 });
        }
        for id in report.primed_achievements {
            self.events.push_primed(id);
        }
        for id in report.unprimed_achievements {
            self.events.push_unprimed(id);
        }
        for id in report.leaderboard_started {
            self.events.push_leaderboard_started(id);
        }
        for id in report.leaderboard_failed {
            self.events.push_leaderboard_failed(id);
        }
        for (leaderboard_id, score) in report.leaderboard_submitted {
            self.events.push_leaderboard_submitted(leaderboard_id, score);
            self.pending.push(PendingSubmission::Leaderboard { leaderboard_id, score, attempt: 0 });
        }
        for (leaderboard_id, value) in report.tracker_shown {
            let rendered = format_leaderboard_value(game, leaderboard_id, value);
            self.events.push_tracker_show(leaderboard_id, rendered);
        }
        for (leaderboard_id, value) in report.tracker_updated {
            let rendered = format_leaderboard_value(game, leaderboard_id, value);
            self.events.push_tracker_update(leaderboard_id, rendered);
        }
        for id in report.tracker_hidden {
            self.events.push_tracker_hide(id);
        }

        let text = game.rich_presence_text();
        if !text.is_empty() {
            self.events.push_rich_presence_changed(text);
        }

        Ok(self.events.drain())
    }

    /// Drains due scheduled work (pings, retried submissions) without
    /// evaluating a frame.
    pub fn idle(&mut self, elapsed: Duration) -> Vec<Event> {
        for task in self.scheduler.advance(elapsed) {
            match task {
                Task::Ping => self.send_ping(),
                Task::Retry => self.retry_pending(),
            }
        }
        self.events.drain()
    }

    fn send_ping(&mut self) {
        let Some(game) = self.game.as_mut() else { return };
        let game_id = game.game_id();
        let text = game.rich_presence_text();
        let _ = self.server.ping(&PingRequest { game_id, rich_presence: text });
        self.scheduler.schedule(Task::Ping, Duration::from_secs(30));
    }

    fn retry_pending(&mut self) {
        let pending = core::mem::take(&mut self.pending);
        for item in pending {
            match item {
                PendingSubmission::Unlock { achievement_id, hardcore, attempt } => {
                    let outcome = self.server.award_achievement(&AwardAchievementRequest { achievement_id, hardcore });
                    match classify(outcome) {
                        Classified::Success | Classified::AlreadyHave => {}
                        Classified::Rejected(reason) => self.events.push_error(reason),
                        Classified::Retry => {
                            self.scheduler.schedule(Task::Retry, backoff_delay(attempt));
                            self.pending.push(PendingSubmission::Unlock { achievement_id, hardcore, attempt: attempt + 1 });
                        }
                    }
                }
                PendingSubmission::Leaderboard { leaderboard_id, score, attempt } => {
                    let outcome = self.server.submit_lb_entry(&SubmitLbEntryRequest { leaderboard_id, score });
                    match classify(outcome) {
                        Classified::Success | Classified::AlreadyHave => {}
                        Classified::Rejected(reason) => self.events.push_error(reason),
                        Classified::Retry => {
                            self.scheduler.schedule(Task::Retry, backoff_delay(attempt));
                            self.pending.push(PendingSubmission::Leaderboard { leaderboard_id, score, attempt: attempt + 1 });
                        }
                    }
                }
            }
        }
    }

    /// Resets every trigger/value/rich-presence text back to its initial
    /// state, keeping the compiled game loaded.
    pub fn reset(&mut self) -> Result<(), ClientError> {
        let game = self.game.as_mut().ok_or(ClientError::WrongState("reset"))?;
        game.reset();
        Ok(())
    }

    pub fn serialize_progress(&self) -> Result<Vec<u8>, ClientError> {
        let game = self.game.as_ref().ok_or(ClientError::WrongState("serialize_progress"))?;
        Ok(cheevo_core::progress::write_progress(game))
    }

    /// Restores a snapshot taken by [`Self::serialize_progress`], then
    /// re-announces any artifact the restore brought straight back into
    /// `Primed`/`Tracking` -- states that would normally have been reached
    /// (and reported) by evaluating frames, not by loading a buffer.
    pub fn deserialize_progress(&mut self, bytes: &[u8]) -> Result<Vec<Event>, ClientError> {
        let game = self.game.as_mut().ok_or(ClientError::WrongState("deserialize_progress"))?;
        cheevo_core::progress::read_progress(game, bytes).map_err(ClientError::from)?;

        let primed_ids: Vec<u32> = game
            .achievements()
            .iter()
            .filter(|a| a.trigger.state() == cheevo_core::TriggerState::Primed)
            .map(|a| a.id)
            .collect();
        let tracking_ids: Vec<u32> = game.leaderboards().iter().filter(|lb| lb.is_tracking()).map(|lb| lb.id).collect();

        for id in primed_ids {
            self.events.push_primed(id);
        }
        for id in tracking_ids {
            let value = game.tracked_value(id).unwrap_or(0);
            let rendered = format_leaderboard_value(game, id, value);
            self.events.push_tracker_show(id, rendered);
        }

        Ok(self.events.drain())
    }
}

/// Renders a leaderboard's tracker value the way it declared via its `FOR:`
/// field, falling back to a plain decimal when it didn't declare one.
fn format_leaderboard_value(game: &GameRuntime, leaderboard_id: u32, value: i64) -> String {
    let format = game
        .leaderboards()
        .iter()
        .find(|lb| lb.id == leaderboard_id)
        .and_then(|lb| lb.format());
    match format {
        Some(format) => format.render(value as u32),
        None => value.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::{
        AwardAchievementResponse, CodeNotesRequest, CodeNotesResponse, GameIdRequest, GameIdResponse, LoginResponse,
        PatchRequest, PatchResponse, PingResponse, StartSessionRequest, StartSessionResponse, SubmitLbEntryResponse,
        UnlocksRequest, UnlocksResponse,
    };

    struct FakeServer {
        login_ok: bool,
        patch_json: String,
    }

    impl ServerCall for FakeServer {
        fn login(&mut self, _request: &LoginRequest) -> CallOutcome<LoginResponse> {
            if self.login_ok {
                CallOutcome::Success(LoginResponse {
                    success: true,
                    username: "player".into(),
                    api_token: "tok".into(),
                    score: 0,
                    num_unread_messages: 0,
                    error: None,
                })
            } else {
                CallOutcome::Rejected("bad credentials".into())
            }
        }
        fn start_session(&mut self, _request: &StartSessionRequest) -> CallOutcome<StartSessionResponse> {
            CallOutcome::Success(StartSessionResponse { success: true, error: None })
        }
        fn patch(&mut self, _request: &PatchRequest) -> CallOutcome<PatchResponse> {
            CallOutcome::Success(PatchResponse { success: true, patch_data: self.patch_json.clone(), error: None })
        }
        fn unlocks(&mut self, _request: &UnlocksRequest) -> CallOutcome<UnlocksResponse> {
            CallOutcome::Success(UnlocksResponse { success: true, unlocked_achievement_ids: vec![], error: None })
        }
        fn award_achievement(&mut self, _request: &AwardAchievementRequest) -> CallOutcome<AwardAchievementResponse> {
            CallOutcome::Success(AwardAchievementResponse { success: true, error: None })
        }
        fn submit_lb_entry(&mut self, _request: &SubmitLbEntryRequest) -> CallOutcome<SubmitLbEntryResponse> {
            CallOutcome::Success(SubmitLbEntryResponse { success: true, error: None })
        }
        fn ping(&mut self, _request: &PingRequest) -> CallOutcome<PingResponse> {
            CallOutcome::Success(PingResponse { success: true })
        }
        fn game_id(&mut self, _request: &GameIdRequest) -> CallOutcome<GameIdResponse> {
            CallOutcome::Success(GameIdResponse { success: true, game_id: 7 })
        }
        fn code_notes(&mut self, _request: &CodeNotesRequest) -> CallOutcome<CodeNotesResponse> {
            CallOutcome::Success(CodeNotesResponse { success: true, notes: vec![] })
        }
    }

    struct FakeMemory(Vec<u8>);

    impl MemoryReader for FakeMemory {
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

    fn client_with_game(patch_json: &str) -> Client<FakeServer> {
        let server = FakeServer { login_ok: true, patch_json: patch_json.into() };
        let mut client = Client::new(server, RuntimeConfig::default());
        client.begin_login_with_password("player", "hunter2").unwrap();
        client.begin_identify_and_load_game("deadbeef").unwrap();
        client
    }

    #[test]
    fn login_with_empty_credentials_is_rejected_locally() {
        let server = FakeServer { login_ok: true, patch_json: "{}".into() };
        let mut client = Client::new(server, RuntimeConfig::default());
        assert!(client.begin_login_with_password("", "pw").is_err());
        assert_eq!(client.state(), ClientState::LoggedOut);
    }

    #[test]
    fn successful_login_transitions_to_logged_in() {
        let server = FakeServer { login_ok: true, patch_json: "{}".into() };
        let mut client = Client::new(server, RuntimeConfig::default());
        client.begin_login_with_password("player", "hunter2").unwrap();
        assert_eq!(client.state(), ClientState::LoggedIn);
        assert_eq!(client.session().unwrap().username, "player");
    }

    #[test]
    fn loading_a_game_before_login_fails() {
        let server = FakeServer { login_ok: true, patch_json: "{}".into() };
        let mut client = Client::new(server, RuntimeConfig::default());
        assert!(client.begin_identify_and_load_game("deadbeef").is_err());
    }

    #[test]
    fn do_frame_emits_unlock_event_and_schedules_a_submission() {
        let patch = r#"{"game_id":7,"achievements":[{"id":1,"points":5,"definition":"0xH0000=1"}]}"#;
        let mut client = client_with_game(patch);
        let events = client.do_frame(&mut FakeMemory(vec![1])).unwrap();
        assert!(events.contains(&Event::AchievementUnlocked { achievement_id: 1 }));
    }

    #[test]
    fn do_frame_emits_primed_then_unprimed_on_trigger() {
        let patch =
            r#"{"game_id":7,"achievements":[{"id":1,"points":5,"definition":"0xH0000=1_T:0xH0001=1"}]}"#;
        let mut client = client_with_game(patch);

        let events = client.do_frame(&mut FakeMemory(vec![1, 0])).unwrap();
        assert!(events.contains(&Event::AchievementPrimed { achievement_id: 1 }));

        let events = client.do_frame(&mut FakeMemory(vec![1, 1])).unwrap();
        assert!(events.contains(&Event::AchievementUnprimed { achievement_id: 1 }));
        assert!(events.contains(&Event::AchievementUnlocked { achievement_id: 1 }));
    }

    #[test]
    fn leaderboard_lifecycle_emits_tracker_show_then_hide_on_cancel() {
        let patch = r#"{"game_id":7,"leaderboards":[{"id":1,"definition":"STA:0xH0000=1::SUB:0xH0002=1::CAN:0xH0001=1::VAL:M:0xH0003::FOR:SCORE"}]}"#;
        let mut client = client_with_game(patch);

        let events = client.do_frame(&mut FakeMemory(vec![1, 0, 0, 7])).unwrap();
        assert!(events.contains(&Event::LeaderboardStarted { leaderboard_id: 1 }));
        assert!(events.contains(&Event::TrackerShow { leaderboard_id: 1, value: "000007".into() }));

        let events = client.do_frame(&mut FakeMemory(vec![1, 1, 0, 7])).unwrap();
        assert!(events.contains(&Event::LeaderboardFailed { leaderboard_id: 1 }));
        assert!(events.contains(&Event::TrackerHide { leaderboard_id: 1 }));

        let tracker_hide_index = events.iter().position(|e| *e == Event::TrackerHide { leaderboard_id: 1 }).unwrap();
        let failed_index = events.iter().position(|e| *e == Event::LeaderboardFailed { leaderboard_id: 1 }).unwrap();
        assert!(tracker_hide_index < failed_index);
    }

    #[test]
    fn progress_snapshot_restores_primed_and_tracking_and_reannounces_both() {
        let patch = r#"{
            "game_id":7,
            "achievements":[{"id":1,"points":5,"definition":"0xH0000=1_T:0xH0001=1"}],
            "leaderboards":[{"id":2,"definition":"STA:0xH0002=1::SUB:0xH0004=1::CAN:0xH0003=1::VAL:0xX0005"}]
        }"#;
        let mut client = client_with_game(patch);

        // Achievement 1 primes (core condition true, trigger condition not
        // yet) and leaderboard 2 enters Tracking, with a value of 1234.
        let events = client
            .do_frame(&mut FakeMemory(vec![1, 0, 1, 0, 0, 0xD2, 0x04, 0x00, 0x00]))
            .unwrap();
        assert!(events.contains(&Event::AchievementPrimed { achievement_id: 1 }));
        assert!(events.iter().any(|e| matches!(e, Event::TrackerShow { leaderboard_id: 2, .. })));

        let snapshot = client.serialize_progress().unwrap();

        // A fresh runtime loaded from the same patch, reset to its initial
        // state, has neither artifact primed or tracking yet.
        let mut restored = client_with_game(patch);
        restored.reset().unwrap();

        let events = restored.deserialize_progress(&snapshot).unwrap();
        assert!(events.contains(&Event::AchievementPrimed { achievement_id: 1 }));
        assert!(events.contains(&Event::TrackerShow { leaderboard_id: 2, value: "1234".into() }));

        // The next evaluated frame continues from the restored state: the
        // achievement's trigger condition firing now unlocks it rather than
        // priming it again.
        let events = restored
            .do_frame(&mut FakeMemory(vec![1, 1, 1, 0, 0, 0xD2, 0x04, 0x00, 0x00]))
            .unwrap();
        assert!(events.contains(&Event::AchievementUnlocked { achievement_id: 1 }));
    }

    #[test]
    fn unload_game_returns_to_logged_in_without_clearing_session() {
        let patch = r#"{"game_id":7,"achievements":[]}"#;
        let mut client = client_with_game(patch);
        client.unload_game();
        assert_eq!(client.state(), ClientState::LoggedIn);
        assert!(client.session().is_some());
    }
}
