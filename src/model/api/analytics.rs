use std::cmp::Reverse;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

use super::email::Email;

/// One candidate's standing within a position tally.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CandidateVotes {
    pub candidate_id: Id,
    pub candidate_name: String,
    pub candidate_usn: String,
    pub vote_count: u64,
}

/// The tally for a single position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionAnalytics {
    pub position: String,
    pub position_display: String,
    pub total_candidates: usize,
    pub total_votes: u64,
    pub candidate_votes: Vec<CandidateVotes>,
}

/// One recorded vote, resolved to the voter's contact for auditing.
/// Exposes voter identity, so it is only ever served to admins.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterDetail {
    pub voter_id: Id,
    pub voter_email: Email,
    pub cast_at: DateTime<Utc>,
}

/// A candidate's tally plus per-vote audit detail.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateDetail {
    pub candidate_id: Id,
    pub candidate_name: String,
    pub candidate_usn: String,
    pub candidate_email: Email,
    pub photo_url: Option<String>,
    pub vote_count: u64,
    pub votes: Vec<VoterDetail>,
}

/// The audit view of a single position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionDetailAnalytics {
    pub position: String,
    pub position_display: String,
    pub total_candidates: usize,
    pub total_votes: u64,
    pub candidates: Vec<CandidateDetail>,
}

/// Order a tally by descending vote count.
///
/// The sort is stable, so candidates tied on votes keep their input order;
/// callers pass candidates in creation order, which makes the tie-break
/// deterministic and documented rather than incidental.
pub fn rank_by_votes<T>(items: &mut [T], vote_count: impl Fn(&T) -> u64) {
    items.sort_by_key(|item| Reverse(vote_count(item)));
}

#[cfg(test)]
mod tests {
    use mongodb::bson::oid::ObjectId;

    use super::*;

    fn votes(name: &str, count: u64) -> CandidateVotes {
        CandidateVotes {
            candidate_id: Id::from(ObjectId::new()),
            candidate_name: name.to_string(),
            candidate_usn: format!("nu24mca{}", name.len()),
            vote_count: count,
        }
    }

    #[test]
    fn ranks_descending() {
        let mut tally = vec![votes("b", 1), votes("a", 2)];
        rank_by_votes(&mut tally, |c| c.vote_count);
        let names: Vec<_> = tally.iter().map(|c| c.candidate_name.as_str()).collect();
        assert_eq!(vec!["a", "b"], names);
        assert_eq!(3, tally.iter().map(|c| c.vote_count).sum::<u64>());
    }

    #[test]
    fn ties_keep_creation_order() {
        let mut tally = vec![
            votes("first", 1),
            votes("second", 1),
            votes("third", 2),
            votes("fourth", 1),
        ];
        rank_by_votes(&mut tally, |c| c.vote_count);
        let names: Vec<_> = tally.iter().map(|c| c.candidate_name.as_str()).collect();
        assert_eq!(vec!["third", "first", "second", "fourth"], names);
    }
}
