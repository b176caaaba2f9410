use std::ops::Deref;
use std::time::Duration;

use mongodb::{
    bson::doc,
    error::{Error as DbError, ErrorKind, WriteFailure},
    options::IndexOptions,
    Collection, Database, IndexModel,
};
use rocket::{
    request::{self, FromRequest, Request},
    State,
};

use crate::model::db::{
    admin::{Admin, NewAdmin},
    ballot::{Ballot, NewBallot},
    candidate::{Candidate, NewCandidate},
    position::{NewPosition, Position},
    settings::{NewSettings, Settings},
    voter::{NewVoter, Voter},
};

/// A type that can be directly inserted/read to/from the database.
pub trait MongoCollection {
    /// The name of the collection.
    const NAME: &'static str;
}

/// A database collection of the given type.
pub struct Coll<T>(Collection<T>);

impl<T> Coll<T>
where
    T: MongoCollection,
{
    /// Get a handle on this collection in the given database.
    pub fn from_db(db: &Database) -> Self {
        Self(db.collection(T::NAME))
    }
}

// `derive(Clone)` would only derive if `T: Clone`, but we don't need that bound.
impl<T> Clone for Coll<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> Deref for Coll<T> {
    type Target = Collection<T>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

#[rocket::async_trait]
impl<'r, T> FromRequest<'r> for Coll<T>
where
    T: MongoCollection,
{
    type Error = ();

    /// Get the database connection from the managed state and wrap it in a collection.
    ///
    /// Panics iff the [`Database`] is not managed by [`rocket::Rocket`].
    async fn from_request(req: &'r Request<'_>) -> request::Outcome<Self, Self::Error> {
        let db = req.guard::<&State<Database>>().await.unwrap();
        request::Outcome::Success(Coll::from_db(db))
    }
}

// Voter collections
const VOTERS: &str = "voters";
impl MongoCollection for Voter {
    const NAME: &'static str = VOTERS;
}
impl MongoCollection for NewVoter {
    const NAME: &'static str = VOTERS;
}

// Admin collections
const ADMINS: &str = "admins";
impl MongoCollection for Admin {
    const NAME: &'static str = ADMINS;
}
impl MongoCollection for NewAdmin {
    const NAME: &'static str = ADMINS;
}

// Settings collections
const SETTINGS: &str = "settings";
impl MongoCollection for Settings {
    const NAME: &'static str = SETTINGS;
}
impl MongoCollection for NewSettings {
    const NAME: &'static str = SETTINGS;
}

// Candidate collections
const CANDIDATES: &str = "candidates";
impl MongoCollection for Candidate {
    const NAME: &'static str = CANDIDATES;
}
impl MongoCollection for NewCandidate {
    const NAME: &'static str = CANDIDATES;
}

// Position collections
const POSITIONS: &str = "positions";
impl MongoCollection for Position {
    const NAME: &'static str = POSITIONS;
}
impl MongoCollection for NewPosition {
    const NAME: &'static str = POSITIONS;
}

// Ballot collections
const BALLOTS: &str = "ballots";
impl MongoCollection for Ballot {
    const NAME: &'static str = BALLOTS;
}
impl MongoCollection for NewBallot {
    const NAME: &'static str = BALLOTS;
}

/// Was this error a unique-index rejection?
///
/// Callers use this to turn index violations into domain-specific responses
/// (a duplicate ballot, a duplicate candidate) rather than a bare 500.
pub fn is_duplicate_key(err: &DbError) -> bool {
    const DUPLICATE_KEY: i32 = 11000;
    match &*err.kind {
        ErrorKind::Write(WriteFailure::WriteError(write_err)) => write_err.code == DUPLICATE_KEY,
        ErrorKind::Command(command_err) => command_err.code == DUPLICATE_KEY,
        ErrorKind::BulkWrite(bulk_err) => bulk_err
            .write_errors
            .iter()
            .flatten()
            .any(|write_err| write_err.code == DUPLICATE_KEY),
        _ => false,
    }
}

/// Ensure that all the required indexes exist on the given database.
///
/// The unique indexes here are load-bearing: one-ballot-per-voter is the
/// correctness backstop for concurrent submissions, not just a lookup aid.
///
/// This operation is idempotent.
pub async fn ensure_indexes_exist(db: &Database) -> Result<(), DbError> {
    debug!("Ensuring collection indexes exist");

    let unique = IndexOptions::builder().unique(true).build();

    // Voter collection: unique identity, plus a TTL index that reaps expired
    // OTP codes (cleanup only; expiry is enforced on every verify).
    let voter_email = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(unique.clone())
        .build();
    let otp_reaper = IndexModel::builder()
        .keys(doc! { "otp_expires_at": 1 })
        .options(
            IndexOptions::builder()
                .expire_after(Duration::from_secs(0))
                .partial_filter_expression(doc! { "otp_expires_at": { "$type": "date" } })
                .build(),
        )
        .build();
    Coll::<Voter>::from_db(db)
        .create_indexes([voter_email, otp_reaper], None)
        .await?;

    // Admin collection.
    let admin_username = IndexModel::builder()
        .keys(doc! { "username": 1 })
        .options(unique.clone())
        .build();
    Coll::<Admin>::from_db(db)
        .create_index(admin_username, None)
        .await?;

    // Settings collection: enforce the singleton.
    let settings_key = IndexModel::builder()
        .keys(doc! { "key": 1 })
        .options(unique.clone())
        .build();
    Coll::<Settings>::from_db(db)
        .create_index(settings_key, None)
        .await?;

    // Candidate collection: USN and email are each globally unique, so the
    // registration pre-check has a backstop under concurrent requests.
    let candidate_usn = IndexModel::builder()
        .keys(doc! { "usn": 1 })
        .options(unique.clone())
        .build();
    let candidate_email = IndexModel::builder()
        .keys(doc! { "email": 1 })
        .options(unique.clone())
        .build();
    let candidate_lookup = IndexModel::builder()
        .keys(doc! { "position": 1, "status": 1 })
        .build();
    Coll::<Candidate>::from_db(db)
        .create_indexes([candidate_usn, candidate_email, candidate_lookup], None)
        .await?;

    // Position collection.
    let position_name = IndexModel::builder()
        .keys(doc! { "name": 1 })
        .options(unique.clone())
        .build();
    let position_order = IndexModel::builder()
        .keys(doc! { "order": 1 })
        .options(unique.clone())
        .build();
    Coll::<Position>::from_db(db)
        .create_indexes([position_name, position_order], None)
        .await?;

    // Ballot collection: at most one ballot per voter, ever.
    let ballot_voter = IndexModel::builder()
        .keys(doc! { "voter_id": 1 })
        .options(unique)
        .build();
    let ballot_candidate = IndexModel::builder()
        .keys(doc! { "votes.candidate": 1 })
        .build();
    Coll::<Ballot>::from_db(db)
        .create_indexes([ballot_voter, ballot_candidate], None)
        .await?;

    Ok(())
}
