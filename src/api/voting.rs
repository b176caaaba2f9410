use chrono::Utc;
use mongodb::bson::doc;
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route, State};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        ballot::BallotSubmission,
        settings::ElectionStatus,
        token::AuthToken,
    },
    db::{
        ballot::{record_ballot, NewBallot},
        candidate::{Candidate, CandidateStatus},
        position::Position,
        settings::{self, NewSettings, Settings},
        voter::Voter,
    },
    eligibility,
    mongodb::Coll,
};

pub fn routes() -> Vec<Route> {
    routes![election_status, ballot_form, submit_ballot]
}

/// Current gating state, for clients to render countdowns and disabled
/// buttons. Advisory only; every state change re-checks on the server.
#[get("/status")]
async fn election_status(
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
) -> Result<Json<ElectionStatus>> {
    let settings = settings::get_or_create(&settings, &new_settings).await?;
    Ok(Json(ElectionStatus::new(&settings, Utc::now())))
}

/// One position on the ballot form, with its approved candidates.
#[derive(Debug, Serialize, Deserialize)]
pub struct BallotFormPosition {
    #[serde(flatten)]
    pub position: Position,
    pub candidates: Vec<Candidate>,
}

/// The full ballot form: active positions in display order, each with its
/// approved candidates in registration order. Pending and rejected candidates
/// never appear here.
#[get("/vote/form")]
async fn ballot_form(
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<BallotFormPosition>>> {
    let active: Vec<Position> = positions
        .find(
            doc! { "is_active": true },
            FindOptions::builder().sort(doc! { "order": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;

    let mut form = Vec::with_capacity(active.len());
    for position in active {
        let approved: Vec<Candidate> = candidates
            .find(
                doc! { "position": &position.name, "status": "approved" },
                FindOptions::builder().sort(doc! { "created_at": 1 }).build(),
            )
            .await?
            .try_collect()
            .await?;
        form.push(BallotFormPosition {
            position,
            candidates: approved,
        });
    }
    Ok(Json(form))
}

/// Record an authenticated voter's ballot.
///
/// Validation order: structure, then referential integrity, then eligibility
/// immediately before the write. The eligibility check at OTP issue time does
/// not carry over; the window may have closed or another session may have
/// voted in the meantime.
#[post("/vote", data = "<submission>", format = "json")]
async fn submit_ballot(
    token: AuthToken<Voter>,
    submission: Json<BallotSubmission>,
    voters: Coll<Voter>,
    ballots: Coll<NewBallot>,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
    db_client: &State<mongodb::Client>,
) -> Result<()> {
    let submission = submission.0;
    submission.validate()?;

    // The token guard has already confirmed this voter exists.
    let voter = voters
        .find_one(token.id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("No voter with ID '{}'", token.id)))?;

    // Every entry must name an active position and an approved candidate
    // actually standing for it.
    for entry in &submission.votes {
        positions
            .find_one(doc! { "name": &entry.position, "is_active": true }, None)
            .await?
            .ok_or_else(|| {
                Error::Validation(format!("No active position '{}'", entry.position))
            })?;
        let candidate = candidates
            .find_one(entry.candidate_id.as_doc(), None)
            .await?
            .ok_or_else(|| {
                Error::Validation(format!("No candidate with ID '{}'", entry.candidate_id))
            })?;
        if candidate.status != CandidateStatus::Approved || candidate.position != entry.position {
            return Err(Error::Validation(format!(
                "Candidate '{}' is not standing for position '{}'",
                candidate.name, entry.position
            )));
        }
    }

    // Authoritative gate check, as close to the write as possible.
    let settings = settings::get_or_create(&settings, &new_settings).await?;
    eligibility::can_submit_ballot(&settings, voter.has_voted, Utc::now())?;

    record_ballot(
        db_client,
        &ballots,
        &voters,
        voter.id,
        submission.into_entries(),
    )
    .await?;

    info!("Ballot recorded for voter {}", voter.id);
    Ok(())
}
