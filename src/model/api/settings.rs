use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, Document};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::db::settings::SettingsCore;

/// The gating state as rendered to clients, with the server's idea of "now"
/// so they can tell whether the window has opened yet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElectionStatus {
    pub registration_due_date: Option<DateTime<Utc>>,
    pub voting_start: Option<DateTime<Utc>>,
    pub voting_end: Option<DateTime<Utc>>,
    pub voting_enabled: bool,
    pub now: DateTime<Utc>,
}

impl ElectionStatus {
    pub fn new(settings: &SettingsCore, now: DateTime<Utc>) -> Self {
        Self {
            registration_due_date: settings.registration_due_date,
            voting_start: settings.voting_start,
            voting_end: settings.voting_end,
            voting_enabled: settings.voting_enabled,
            now,
        }
    }
}

/// Admin update to the candidate registration deadline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DueDateUpdate {
    pub due_date: DateTime<Utc>,
}

impl DueDateUpdate {
    pub fn into_patch(self) -> Document {
        doc! {
            "$set": { "registration_due_date": bson::DateTime::from_chrono(self.due_date) },
        }
    }
}

/// Admin update to the voting window. An omitted end leaves the window
/// open-ended.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingWindowUpdate {
    pub start: DateTime<Utc>,
    pub end: Option<DateTime<Utc>>,
}

impl VotingWindowUpdate {
    /// Cross-field validation before anything is persisted.
    pub fn validate(&self) -> Result<(), InvalidWindow> {
        match self.end {
            Some(end) if end <= self.start => Err(InvalidWindow),
            _ => Ok(()),
        }
    }

    pub fn into_patch(self) -> Document {
        let start = bson::DateTime::from_chrono(self.start);
        match self.end {
            Some(end) => doc! {
                "$set": {
                    "voting_start": start,
                    "voting_end": bson::DateTime::from_chrono(end),
                },
            },
            None => doc! {
                "$set": { "voting_start": start, "voting_end": null },
            },
        }
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
#[error("Voting end must be after voting start")]
pub struct InvalidWindow;

impl From<InvalidWindow> for Error {
    fn from(err: InvalidWindow) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Admin update to the manual voting switch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VotingEnabledUpdate {
    pub enabled: bool,
}

impl VotingEnabledUpdate {
    pub fn into_patch(self) -> Document {
        doc! {
            "$set": { "voting_enabled": self.enabled },
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::Duration;

    use super::*;

    #[test]
    fn window_must_end_after_start() {
        let now = Utc::now();
        let window = VotingWindowUpdate {
            start: now,
            end: Some(now - Duration::hours(1)),
        };
        assert_eq!(Err(InvalidWindow), window.validate());

        let window = VotingWindowUpdate {
            start: now,
            end: Some(now),
        };
        assert_eq!(Err(InvalidWindow), window.validate());

        let window = VotingWindowUpdate {
            start: now,
            end: Some(now + Duration::hours(1)),
        };
        assert_eq!(Ok(()), window.validate());

        // Open-ended windows are fine.
        let window = VotingWindowUpdate {
            start: now,
            end: None,
        };
        assert_eq!(Ok(()), window.validate());
    }

    #[test]
    fn open_ended_window_clears_the_end() {
        let now = Utc::now();
        let patch = VotingWindowUpdate {
            start: now,
            end: None,
        }
        .into_patch();
        let set = patch.get_document("$set").unwrap();
        assert_eq!(Some(&bson::Bson::Null), set.get("voting_end"));
    }

    #[test]
    fn enabled_patch_sets_only_the_switch() {
        let patch = VotingEnabledUpdate { enabled: true }.into_patch();
        assert_eq!(
            doc! { "$set": { "voting_enabled": true } },
            patch
        );
    }
}
