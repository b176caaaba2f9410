use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::{db::ballot::VoteEntry, mongodb::Id};

/// A single position→candidate choice within a submission.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BallotEntrySpec {
    pub position: String,
    pub candidate_id: Id,
}

/// A full ballot as submitted by a voter: one candidate per position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BallotSubmission {
    pub votes: Vec<BallotEntrySpec>,
}

impl BallotSubmission {
    /// Structural validation only; whether the referenced candidates exist
    /// and stand for the given positions is checked against the database.
    ///
    /// A malformed ballot is a validation failure, deliberately distinct
    /// from an eligibility denial.
    pub fn validate(&self) -> Result<(), MalformedBallot> {
        if self.votes.is_empty() {
            return Err(MalformedBallot::Empty);
        }
        let mut seen = HashSet::new();
        for entry in &self.votes {
            if !seen.insert(entry.position.as_str()) {
                return Err(MalformedBallot::DuplicatePosition(entry.position.clone()));
            }
        }
        Ok(())
    }

    /// Convert into the database representation.
    pub fn into_entries(self) -> Vec<VoteEntry> {
        self.votes
            .into_iter()
            .map(|entry| VoteEntry {
                position: entry.position,
                candidate: entry.candidate_id,
            })
            .collect()
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum MalformedBallot {
    #[error("No votes submitted")]
    Empty,
    #[error("Multiple votes for position '{0}'")]
    DuplicatePosition(String),
}

impl From<MalformedBallot> for Error {
    fn from(err: MalformedBallot) -> Self {
        Error::Validation(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;

    fn entry(position: &str) -> BallotEntrySpec {
        BallotEntrySpec {
            position: position.to_string(),
            candidate_id: Id::from(ObjectId::new()),
        }
    }

    #[test]
    fn accepts_distinct_positions() {
        let submission = BallotSubmission {
            votes: vec![entry("secretary"), entry("treasurer")],
        };
        assert_eq!(Ok(()), submission.validate());
    }

    #[test]
    fn rejects_empty_ballot() {
        let submission = BallotSubmission { votes: vec![] };
        assert_eq!(Err(MalformedBallot::Empty), submission.validate());
    }

    #[test]
    fn rejects_duplicate_position() {
        // Two different candidates for the same position is still malformed.
        let submission = BallotSubmission {
            votes: vec![entry("secretary"), entry("secretary")],
        };
        assert_eq!(
            Err(MalformedBallot::DuplicatePosition("secretary".to_string())),
            submission.validate()
        );
    }
}
