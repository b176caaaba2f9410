use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use serde::{Deserialize, Serialize};

use crate::model::{api::email::Email, mongodb::Id};

/// Where a candidate is in the approval lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CandidateStatus {
    Pending,
    Approved,
    Rejected,
}

impl Display for CandidateStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}",
            match self {
                Self::Pending => "pending",
                Self::Approved => "approved",
                Self::Rejected => "rejected",
            }
        )
    }
}

/// Core candidate data, as stored in the database.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct CandidateCore {
    pub name: String,
    /// Normalised (lowercased, trimmed) university serial number;
    /// globally unique among candidates.
    pub usn: String,
    pub email: Email,
    /// The internal name of the position this candidate stands for.
    pub position: String,
    pub phone: Option<String>,
    pub gender: Option<String>,
    /// Reference to an externally hosted photo, if any.
    pub photo_url: Option<String>,
    pub status: CandidateStatus,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

/// A candidate without an ID.
pub type NewCandidate = CandidateCore;

/// A candidate from the database, with their unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Candidate {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub candidate: CandidateCore,
}

impl Deref for Candidate {
    type Target = CandidateCore;

    fn deref(&self) -> &Self::Target {
        &self.candidate
    }
}

impl DerefMut for Candidate {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.candidate
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateCore {
        pub fn example() -> Self {
            Self {
                name: "Alice Anand".to_string(),
                usn: "nu24mca42".to_string(),
                email: Email::example(),
                position: "secretary".to_string(),
                phone: Some("9876543210".to_string()),
                gender: None,
                photo_url: None,
                status: CandidateStatus::Approved,
                created_at: Utc::now(),
            }
        }
    }
}
