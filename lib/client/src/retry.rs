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

//! Exponential backoff and the shared "is this outcome actually a
//! duplicate success" coercion applied to both unlock and leaderboard
//! submissions (`SPEC_FULL.md` 3.2).

use core::time::Duration;

use crate::server::CallOutcome;

/// Delay schedule in seconds: doubles each attempt, capped at 120s,
/// matching the runtime's own retry policy.
const BACKOFF_SECONDS: [u64; 8] = [1, 2, 4, 8, 16, 32, 64, 120];

/// Returns the delay before retry attempt number `attempt` (0-based): the
/// first retry waits 1s, the schedule then doubles until it saturates at
/// 120s for every attempt past the table's length.
pub fn backoff_delay(attempt: u32) -> Duration {
    let index = (attempt as usize).min(BACKOFF_SECONDS.len() - 1);
    Duration::from_secs(BACKOFF_SECONDS[index])
}

/// What a classified server outcome means for the caller.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Classified {
    /// Treat as a clean success, value attached.
    Success,
    /// The server said "you already have this" -- functionally identical
    /// to success for an unlock or leaderboard submission the client may
    /// have already sent once during a dropped connection.
    AlreadyHave,
    /// A genuine rejection; do not retry.
    Rejected(String),
    /// No response; the caller should retry after `backoff_delay`.
    Retry,
}

/// Classifies a [`CallOutcome`], applying the "User already has this
/// achievement"/"already has a submission" string coercion the source
/// applies to award/submission responses.
pub fn classify<T>(outcome: CallOutcome<T>) -> Classified {
    match outcome {
        CallOutcome::Success(_) => Classified::Success,
        CallOutcome::NoResponse => Classified::Retry,
        CallOutcome::Rejected(reason) => {
            if reason.to_lowercase().contains("already") {
                Classified::AlreadyHave
            } else {
                Classified::Rejected(reason)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backoff_doubles_then_caps() {
        assert_eq!(backoff_delay(0), Duration::from_secs(1));
        assert_eq!(backoff_delay(1), Duration::from_secs(2));
        assert_eq!(backoff_delay(6), Duration::from_secs(64));
        assert_eq!(backoff_delay(7), Duration::from_secs(120));
        assert_eq!(backoff_delay(100), Duration::from_secs(120));
    }

    #[test]
    fn already_have_is_coerced_from_rejection_text() {
        let outcome: CallOutcome<()> = CallOutcome::Rejected("User already has this award".into());
        assert_eq!(classify(outcome), Classified::AlreadyHave);
    }

    #[test]
    fn unrelated_rejection_stays_rejected() {
        let outcome: CallOutcome<()> = CallOutcome::Rejected("Invalid achievement".into());
        assert_eq!(classify(outcome), Classified::Rejected("Invalid achievement".into()));
    }

    #[test]
    fn no_response_means_retry() {
        let outcome: CallOutcome<()> = CallOutcome::NoResponse;
        assert_eq!(classify(outcome), Classified::Retry);
    }
}
