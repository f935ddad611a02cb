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

//! Plain, `Clone`-able configuration and session state, the client-runtime
//! equivalent of the teacher's `DeviceConfig`.

/// Toggles threaded through every API call that needs to know which mode
/// the player is in, plus a host override and user-agent for requests.
#[derive(Debug, Clone)]
pub struct RuntimeConfig {
    pub host: String,
    pub user_agent: String,
    pub hardcore: bool,
    pub encore_mode: bool,
    pub spectator_mode: bool,
    pub test_unofficial: bool,
}

impl Default for RuntimeConfig {
    fn default() -> Self {
        Self {
            host: String::from("retroachievements.org"),
            user_agent: String::from("cheevo-client/0.1"),
            hardcore: true,
            encore_mode: false,
            spectator_mode: false,
            test_unofficial: false,
        }
    }
}

/// The authenticated session token pair returned by a successful login.
#[derive(Debug, Clone)]
pub struct Session {
    pub username: String,
    pub api_token: String,
    pub score: u32,
    pub num_unread_messages: u32,
}

/// Credentials used to start a new session, either a raw password or a
/// previously-issued API token.
#[derive(Debug, Clone, serde::Serialize)]
pub enum Credentials {
    Password { username: String, password: String },
    Token { username: String, token: String },
}
