//! Storage-level behaviour tests: the properties that live in MongoDB
//! filters and indexes rather than in pure code.
//!
//! These run against a real MongoDB and are skipped unless `TEST_DB_URI` is
//! set, e.g. `TEST_DB_URI=mongodb://localhost:27017 cargo test`. The ballot
//! tests need a replica set, since recording uses multi-document
//! transactions. Each test uses its own randomly named database and drops it
//! on success.

use chrono::{Duration, Utc};
use mongodb::bson::oid::ObjectId;
use mongodb::{Client, Database};
use rocket::futures::future::join_all;

use student_vote_backend::error::Error;
use student_vote_backend::model::{
    api::email::Email,
    db::{
        ballot::{record_ballot, NewBallot, VoteEntry},
        candidate::{CandidateStatus, NewCandidate},
        voter::{consume_otp, issue_otp, NewVoter, Voter, VoterCore},
    },
    eligibility::DenialReason,
    mongodb::{ensure_indexes_exist, is_duplicate_key, Coll, Id},
    otp::Code,
};

async fn test_db() -> Option<(Client, Database)> {
    let uri = match std::env::var("TEST_DB_URI") {
        Ok(uri) => uri,
        Err(_) => return None,
    };
    let client = Client::with_uri_str(&uri)
        .await
        .expect("failed to connect to the test database");
    let db = client.database(&format!("test{}", rand::random::<u32>()));
    ensure_indexes_exist(&db)
        .await
        .expect("failed to create indexes");
    Some((client, db))
}

async fn insert_voter(db: &Database, email: &str) -> Id {
    let email: Email = email.parse().unwrap();
    Coll::<NewVoter>::from_db(db)
        .insert_one(VoterCore::new(email), None)
        .await
        .unwrap()
        .inserted_id
        .as_object_id()
        .unwrap()
        .into()
}

fn secretary_vote() -> Vec<VoteEntry> {
    vec![VoteEntry {
        position: "secretary".to_string(),
        candidate: Id::from(ObjectId::new()),
    }]
}

#[rocket::async_test]
async fn concurrent_submissions_record_one_ballot() {
    let Some((client, db)) = test_db().await else { return };
    let ballots = Coll::<NewBallot>::from_db(&db);
    let voters = Coll::<Voter>::from_db(&db);
    let voter_id = insert_voter(&db, "alice@example.edu").await;

    // Race eight submissions for the same voter against each other.
    let attempts = (0..8).map(|_| {
        record_ballot(&client, &ballots, &voters, voter_id, secretary_vote())
    });
    let results = join_all(attempts).await;
    let successes = results.iter().filter(|result| result.is_ok()).count();
    assert_eq!(1, successes);

    assert_eq!(1, ballots.count_documents(None, None).await.unwrap());
    let voter = voters
        .find_one(voter_id.as_doc(), None)
        .await
        .unwrap()
        .unwrap();
    assert!(voter.has_voted);

    db.drop(None).await.unwrap();
}

#[rocket::async_test]
async fn second_submission_denied_as_already_voted() {
    let Some((client, db)) = test_db().await else { return };
    let ballots = Coll::<NewBallot>::from_db(&db);
    let voters = Coll::<Voter>::from_db(&db);
    let voter_id = insert_voter(&db, "alice@example.edu").await;

    record_ballot(&client, &ballots, &voters, voter_id, secretary_vote())
        .await
        .unwrap();
    let second = record_ballot(&client, &ballots, &voters, voter_id, secretary_vote()).await;
    assert!(matches!(
        second,
        Err(Error::Eligibility(DenialReason::AlreadyVoted))
    ));
    assert_eq!(1, ballots.count_documents(None, None).await.unwrap());

    db.drop(None).await.unwrap();
}

#[rocket::async_test]
async fn otp_replay_rejected_after_first_verify() {
    let Some((_client, db)) = test_db().await else { return };
    let voters = Coll::<Voter>::from_db(&db);
    let email: Email = "alice@example.edu".parse().unwrap();
    let code: Code = "123456".parse().unwrap();

    issue_otp(&voters, &email, &code, Utc::now() + Duration::minutes(30))
        .await
        .unwrap();

    let first = consume_otp(&voters, email.clone(), &code, Utc::now())
        .await
        .unwrap();
    assert!(first.is_some());

    // The code was cleared by the first verification.
    let replay = consume_otp(&voters, email.clone(), &code, Utc::now())
        .await
        .unwrap();
    assert!(replay.is_none());

    db.drop(None).await.unwrap();
}

#[rocket::async_test]
async fn otp_bound_to_the_identity_it_was_issued_to() {
    let Some((_client, db)) = test_db().await else { return };
    let voters = Coll::<Voter>::from_db(&db);
    let alice: Email = "alice@example.edu".parse().unwrap();
    let bob: Email = "bob@example.edu".parse().unwrap();
    let alice_code: Code = "123456".parse().unwrap();
    let bob_code: Code = "654321".parse().unwrap();
    let expires_at = Utc::now() + Duration::minutes(30);

    issue_otp(&voters, &alice, &alice_code, expires_at)
        .await
        .unwrap();
    issue_otp(&voters, &bob, &bob_code, expires_at).await.unwrap();

    // Alice's code is no good against Bob's identity, and neither code is
    // consumed by the failed attempt.
    let stolen = consume_otp(&voters, bob.clone(), &alice_code, Utc::now())
        .await
        .unwrap();
    assert!(stolen.is_none());
    let legitimate = consume_otp(&voters, bob, &bob_code, Utc::now())
        .await
        .unwrap();
    assert!(legitimate.is_some());

    db.drop(None).await.unwrap();
}

#[rocket::async_test]
async fn expired_otp_rejected() {
    let Some((_client, db)) = test_db().await else { return };
    let voters = Coll::<Voter>::from_db(&db);
    let email: Email = "alice@example.edu".parse().unwrap();
    let code: Code = "123456".parse().unwrap();
    let now = Utc::now();

    // Already expired.
    issue_otp(&voters, &email, &code, now - Duration::seconds(1))
        .await
        .unwrap();
    assert!(consume_otp(&voters, email.clone(), &code, now)
        .await
        .unwrap()
        .is_none());

    // Exactly at the expiry instant is also too late.
    issue_otp(&voters, &email, &code, now).await.unwrap();
    assert!(consume_otp(&voters, email.clone(), &code, now)
        .await
        .unwrap()
        .is_none());

    // Re-issuance overwrites the expiry and the code works again.
    issue_otp(&voters, &email, &code, now + Duration::minutes(30))
        .await
        .unwrap();
    assert!(consume_otp(&voters, email, &code, now)
        .await
        .unwrap()
        .is_some());

    db.drop(None).await.unwrap();
}

fn candidate(usn: &str, email: &str) -> NewCandidate {
    NewCandidate {
        name: "Alice Anand".to_string(),
        usn: usn.to_string(),
        email: email.parse().unwrap(),
        position: "secretary".to_string(),
        phone: Some("9876543210".to_string()),
        gender: None,
        photo_url: None,
        status: CandidateStatus::Pending,
        created_at: Utc::now(),
    }
}

#[rocket::async_test]
async fn duplicate_candidate_identity_rejected_by_index() {
    let Some((_client, db)) = test_db().await else { return };
    let candidates = Coll::<NewCandidate>::from_db(&db);

    candidates
        .insert_one(candidate("nu24mca01", "alice@example.edu"), None)
        .await
        .unwrap();

    // Same email, different USN: the pre-check race loser hits the index.
    let err = candidates
        .insert_one(candidate("nu24mca02", "alice@example.edu"), None)
        .await
        .unwrap_err();
    assert!(is_duplicate_key(&err));

    // Same USN, different email.
    let err = candidates
        .insert_one(candidate("nu24mca01", "carol@example.edu"), None)
        .await
        .unwrap_err();
    assert!(is_duplicate_key(&err));

    assert_eq!(1, candidates.count_documents(None, None).await.unwrap());

    db.drop(None).await.unwrap();
}
