//! The eligibility gate: the pure decision logic governing OTP issuance,
//! ballot submission and candidate registration.
//!
//! These checks are deliberately re-run at every step (once when a voter
//! requests an OTP and again immediately before their ballot is recorded)
//! rather than cached; the voting window or the voter's status can change
//! between the two steps, and the second check is what closes that race.

use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::model::db::settings::SettingsCore;

/// Why a request was denied.
///
/// When several conditions hold at once, the first matching reason in the
/// order below is reported (window checks before the voter flag); this
/// ordering is part of the contract and is pinned by tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum DenialReason {
    #[error("Voting has not started yet.")]
    VotingNotStarted,
    #[error("Voting has closed.")]
    VotingClosed,
    #[error("Voting is currently disabled.")]
    VotingDisabled,
    #[error("You have already voted.")]
    AlreadyVoted,
    #[error("Registration deadline has passed.")]
    RegistrationClosed,
}

/// May a voter with the given voted-flag request an OTP right now?
pub fn can_request_otp(
    settings: &SettingsCore,
    has_voted: bool,
    now: DateTime<Utc>,
) -> Result<(), DenialReason> {
    check_voting_window(settings, now)?;
    if !settings.voting_enabled {
        return Err(DenialReason::VotingDisabled);
    }
    if has_voted {
        return Err(DenialReason::AlreadyVoted);
    }
    Ok(())
}

/// May a voter with the given voted-flag submit a ballot right now?
///
/// Identical rule set to [`can_request_otp`]: holding a valid session token
/// does not exempt a voter from the window having closed in the meantime.
pub fn can_submit_ballot(
    settings: &SettingsCore,
    has_voted: bool,
    now: DateTime<Utc>,
) -> Result<(), DenialReason> {
    can_request_otp(settings, has_voted, now)
}

/// May a candidate register right now?
pub fn can_register_candidate(
    settings: &SettingsCore,
    now: DateTime<Utc>,
) -> Result<(), DenialReason> {
    match settings.registration_due_date {
        Some(due) if now > due => Err(DenialReason::RegistrationClosed),
        _ => Ok(()),
    }
}

/// An unset bound leaves that side of the window open.
fn check_voting_window(settings: &SettingsCore, now: DateTime<Utc>) -> Result<(), DenialReason> {
    if let Some(start) = settings.voting_start {
        if now < start {
            return Err(DenialReason::VotingNotStarted);
        }
    }
    if let Some(end) = settings.voting_end {
        if now > end {
            return Err(DenialReason::VotingClosed);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    fn open_settings() -> SettingsCore {
        SettingsCore {
            registration_due_date: None,
            voting_start: None,
            voting_end: None,
            voting_enabled: true,
        }
    }

    #[test]
    fn allows_within_window() {
        let now = Utc::now();
        let mut settings = open_settings();
        settings.voting_start = Some(now - Duration::hours(1));
        settings.voting_end = Some(now + Duration::hours(1));
        assert_eq!(Ok(()), can_request_otp(&settings, false, now));
        assert_eq!(Ok(()), can_submit_ballot(&settings, false, now));
    }

    #[test]
    fn denies_before_start() {
        let now = Utc::now();
        let mut settings = open_settings();
        settings.voting_start = Some(now + Duration::hours(1));
        assert_eq!(
            Err(DenialReason::VotingNotStarted),
            can_request_otp(&settings, false, now)
        );
        // Two hours later the window is open (no end set).
        assert_eq!(
            Ok(()),
            can_request_otp(&settings, false, now + Duration::hours(2))
        );
    }

    #[test]
    fn denies_after_end() {
        let now = Utc::now();
        let mut settings = open_settings();
        settings.voting_end = Some(now);
        // One second past the end is closed, even with a valid session in hand.
        assert_eq!(
            Err(DenialReason::VotingClosed),
            can_submit_ballot(&settings, false, now + Duration::seconds(1))
        );
        // Exactly at the end is still open.
        assert_eq!(Ok(()), can_submit_ballot(&settings, false, now));
    }

    #[test]
    fn denies_when_disabled() {
        let now = Utc::now();
        let mut settings = open_settings();
        settings.voting_enabled = false;
        assert_eq!(
            Err(DenialReason::VotingDisabled),
            can_request_otp(&settings, false, now)
        );
    }

    #[test]
    fn denies_when_already_voted() {
        let now = Utc::now();
        let settings = open_settings();
        assert_eq!(
            Err(DenialReason::AlreadyVoted),
            can_request_otp(&settings, true, now)
        );
        assert_eq!(
            Err(DenialReason::AlreadyVoted),
            can_submit_ballot(&settings, true, now)
        );
    }

    #[test]
    fn window_reported_before_flag() {
        // All deny conditions hold at once; the window comes first.
        let now = Utc::now();
        let settings = SettingsCore {
            registration_due_date: None,
            voting_start: Some(now + Duration::hours(1)),
            voting_end: Some(now - Duration::hours(1)),
            voting_enabled: false,
        };
        assert_eq!(
            Err(DenialReason::VotingNotStarted),
            can_request_otp(&settings, true, now)
        );

        // Drop the start bound: the end bound is next in line.
        let settings = SettingsCore {
            voting_start: None,
            ..settings
        };
        assert_eq!(
            Err(DenialReason::VotingClosed),
            can_request_otp(&settings, true, now)
        );

        // Drop the end bound: the manual toggle outranks the voted flag.
        let settings = SettingsCore {
            voting_end: None,
            ..settings
        };
        assert_eq!(
            Err(DenialReason::VotingDisabled),
            can_request_otp(&settings, true, now)
        );
    }

    #[test]
    fn registration_deadline() {
        let now = Utc::now();
        let mut settings = open_settings();
        assert_eq!(Ok(()), can_register_candidate(&settings, now));

        settings.registration_due_date = Some(now + Duration::days(1));
        assert_eq!(Ok(()), can_register_candidate(&settings, now));

        settings.registration_due_date = Some(now - Duration::days(1));
        assert_eq!(
            Err(DenialReason::RegistrationClosed),
            can_register_candidate(&settings, now)
        );
    }
}
