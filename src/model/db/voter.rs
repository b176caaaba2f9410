use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{self, doc, serde_helpers::chrono_datetime_as_bson_datetime};
use mongodb::error::Error as DbError;
use mongodb::options::UpdateOptions;
use serde::{Deserialize, Serialize};

use crate::model::{
    api::email::Email,
    mongodb::{serde_option_chrono_datetime, Coll, Id},
    otp::Code,
};

/// Core voter data, as stored in the database.
///
/// A voter record is created lazily on their first OTP request and never
/// deleted by the normal flow. `has_voted` flips false to true exactly once;
/// nothing ever resets it.
#[derive(Debug, PartialEq, Serialize, Deserialize)]
pub struct VoterCore {
    /// Voter unique identity: their normalised email address.
    pub email: Email,
    /// The currently pending OTP code, if any. Re-issuance overwrites it;
    /// successful verification clears it.
    pub otp_code: Option<Code>,
    /// When the pending OTP code stops being valid.
    #[serde(with = "serde_option_chrono_datetime")]
    pub otp_expires_at: Option<DateTime<Utc>>,
    /// Whether this voter has cast their ballot.
    pub has_voted: bool,
    #[serde(with = "chrono_datetime_as_bson_datetime")]
    pub created_at: DateTime<Utc>,
}

impl VoterCore {
    /// Create a new voter with no pending code and no ballot.
    pub fn new(email: Email) -> Self {
        Self {
            email,
            otp_code: None,
            otp_expires_at: None,
            has_voted: false,
            created_at: Utc::now(),
        }
    }
}

/// A voter without an ID.
pub type NewVoter = VoterCore;

/// A voter from the database, with their unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Voter {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub voter: VoterCore,
}

impl Deref for Voter {
    type Target = VoterCore;

    fn deref(&self) -> &Self::Target {
        &self.voter
    }
}

impl DerefMut for Voter {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.voter
    }
}

/// Store a fresh OTP against the voter, creating their record on a first
/// request. Re-issuance simply overwrites the pending code, so at most one
/// code is ever live per voter.
pub async fn issue_otp(
    voters: &Coll<Voter>,
    email: &Email,
    code: &Code,
    expires_at: DateTime<Utc>,
) -> Result<(), DbError> {
    voters
        .update_one(
            doc! { "email": email.clone() },
            doc! {
                "$set": {
                    "otp_code": code.to_string(),
                    "otp_expires_at": bson::DateTime::from_chrono(expires_at),
                },
                "$setOnInsert": {
                    "email": email.clone(),
                    "has_voted": false,
                    "created_at": bson::DateTime::from_chrono(Utc::now()),
                },
            },
            UpdateOptions::builder().upsert(true).build(),
        )
        .await?;
    Ok(())
}

/// Atomically exchange a pending OTP for the voter record it belongs to.
///
/// The filter matches only an exact, unexpired code against the given
/// identity, and the update clears it in the same operation; a replay of the
/// same code races against its own consumption and loses. Returns `None` for
/// an unknown voter, a wrong code and an expired code alike.
pub async fn consume_otp(
    voters: &Coll<Voter>,
    email: Email,
    code: &Code,
    now: DateTime<Utc>,
) -> Result<Option<Voter>, DbError> {
    voters
        .find_one_and_update(
            doc! {
                "email": email,
                "otp_code": code.to_string(),
                "otp_expires_at": { "$gt": bson::DateTime::from_chrono(now) },
            },
            doc! { "$set": { "otp_code": null, "otp_expires_at": null } },
            None,
        )
        .await
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl VoterCore {
        pub fn example() -> Self {
            Self::new(Email::example())
        }
    }
}
