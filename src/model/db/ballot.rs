use std::ops::Deref;

use chrono::{DateTime, Utc};
use mongodb::bson::serde_helpers::chrono_datetime_as_bson_datetime;
use mongodb::{bson::doc, error::Error as DbError, Client};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    eligibility::DenialReason,
    mongodb::{is_duplicate_key, Coll, Id},
};

use super::voter::Voter;

/// One position→candidate selection within a ballot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoteEntry {
    pub position: String,
    pub candidate: Id,
}

/// Core ballot data, as stored in the database.
///
/// A ballot is immutable once created: there is no update or delete path, and
/// the unique index on `voter_id` means at most one can ever exist per voter.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct BallotCore {
    pub voter_id: Id,
    pub votes: Vec<VoteEntry>,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub cast_at: DateTime<Utc>,
}

/// A ballot without an ID.
pub type NewBallot = BallotCore;

/// A ballot from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Ballot {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub ballot: BallotCore,
}

impl Deref for Ballot {
    type Target = BallotCore;

    fn deref(&self) -> &Self::Target {
        &self.ballot
    }
}

/// Record a ballot and flip the voter's `has_voted` flag as one atomic unit.
///
/// Two layers of defence against a double submission racing itself:
/// the flag flip only matches `has_voted: false` (a miss aborts the whole
/// transaction, so no orphaned ballot remains), and the unique index on
/// `ballots.voter_id` rejects a second insert outright. The index rejection
/// is reported as the same `AlreadyVoted` denial as the proactive check, so
/// the loser of the race cannot tell which layer caught it.
pub async fn record_ballot(
    db_client: &Client,
    ballots: &Coll<NewBallot>,
    voters: &Coll<Voter>,
    voter_id: Id,
    votes: Vec<VoteEntry>,
) -> Result<()> {
    let ballot = NewBallot {
        voter_id,
        votes,
        cast_at: Utc::now(),
    };

    let mut session = db_client.start_session(None).await?;
    session.start_transaction(None).await?;

    if let Err(err) = ballots
        .insert_one_with_session(&ballot, None, &mut session)
        .await
    {
        session.abort_transaction().await?;
        return Err(rewrite_duplicate_ballot(err));
    }

    let flipped = voters
        .update_one_with_session(
            doc! { "_id": *voter_id, "has_voted": false },
            doc! { "$set": { "has_voted": true } },
            None,
            &mut session,
        )
        .await;
    match flipped {
        Ok(result) if result.modified_count == 1 => {}
        Ok(_) => {
            // A concurrent submission won between our eligibility check and
            // here; drop our ballot and report the usual denial.
            session.abort_transaction().await?;
            return Err(Error::Eligibility(DenialReason::AlreadyVoted));
        }
        Err(err) => {
            session.abort_transaction().await?;
            return Err(err.into());
        }
    }

    session.commit_transaction().await.map_err(rewrite_duplicate_ballot)?;
    Ok(())
}

/// Map a duplicate-key rejection of the one-ballot-per-voter index onto the
/// same user-visible denial as the proactive flag check.
fn rewrite_duplicate_ballot(err: DbError) -> Error {
    if is_duplicate_key(&err) {
        Error::Eligibility(DenialReason::AlreadyVoted)
    } else {
        err.into()
    }
}
