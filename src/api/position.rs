use std::collections::HashMap;

use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        analytics::{
            rank_by_votes, CandidateDetail, CandidateVotes, PositionAnalytics,
            PositionDetailAnalytics, VoterDetail,
        },
        position::{PositionSpec, PositionUpdate},
        token::AuthToken,
    },
    db::{
        admin::Admin,
        ballot::Ballot,
        candidate::Candidate,
        position::{NewPosition, Position},
        voter::Voter,
    },
    mongodb::{is_duplicate_key, Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![
        list_positions,
        create_position,
        edit_position,
        delete_position,
        position_analytics,
        position_detail,
    ]
}

/// Active positions in ballot order, for rendering the public form skeleton.
#[get("/positions")]
async fn list_positions(positions: Coll<Position>) -> Result<Json<Vec<Position>>> {
    let active = positions
        .find(
            doc! { "is_active": true },
            FindOptions::builder().sort(doc! { "order": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;
    Ok(Json(active))
}

#[post("/positions", data = "<spec>", format = "json")]
async fn create_position(
    _token: AuthToken<Admin>,
    spec: Json<PositionSpec>,
    new_positions: Coll<NewPosition>,
) -> Result<Json<Position>> {
    let position = NewPosition::try_from(spec.0)?;

    let inserted = new_positions.insert_one(&position, None).await.map_err(|err| {
        if is_duplicate_key(&err) {
            Error::Validation("A position with this name or order already exists.".to_string())
        } else {
            err.into()
        }
    })?;
    let id: Id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::Validation("Invalid position ID".to_string()))?
        .into();

    info!("Position created: {}", position.name);
    Ok(Json(Position { id, position }))
}

#[put("/positions/<id>", data = "<update>", format = "json")]
async fn edit_position(
    _token: AuthToken<Admin>,
    id: Id,
    update: Json<PositionUpdate>,
    positions: Coll<Position>,
) -> Result<Json<Position>> {
    let update = update.0;

    let mut set = Document::new();
    if let Some(display_name) = update.display_name {
        if display_name.trim().is_empty() {
            return Err(Error::Validation("Display name cannot be empty".to_string()));
        }
        set.insert("display_name", display_name.trim());
    }
    if let Some(order) = update.order {
        set.insert("order", order);
    }
    if let Some(is_active) = update.is_active {
        set.insert("is_active", is_active);
    }
    if set.is_empty() {
        return Err(Error::Validation("No fields to update".to_string()));
    }

    let updated = positions
        .find_one_and_update(
            id.as_doc(),
            doc! { "$set": set },
            mongodb::options::FindOneAndUpdateOptions::builder()
                .return_document(mongodb::options::ReturnDocument::After)
                .build(),
        )
        .await
        .map_err(|err| {
            if is_duplicate_key(&err) {
                Error::Validation("A position with this order already exists.".to_string())
            } else {
                err.into()
            }
        })?
        .ok_or_else(|| Error::not_found(format!("No position with ID '{id}'")))?;
    Ok(Json(updated))
}

/// Delete a position. Refused while any candidate still references it;
/// recorded ballots are never touched.
#[delete("/positions/<id>")]
async fn delete_position(
    _token: AuthToken<Admin>,
    id: Id,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
) -> Result<()> {
    let position = positions
        .find_one(id.as_doc(), None)
        .await?
        .ok_or_else(|| Error::not_found(format!("No position with ID '{id}'")))?;

    let referencing = candidates
        .count_documents(doc! { "position": &position.name }, None)
        .await?;
    if referencing > 0 {
        return Err(Error::Validation(format!(
            "Cannot delete position '{}': {referencing} candidate(s) reference it",
            position.name
        )));
    }

    positions.delete_one(id.as_doc(), None).await?;
    Ok(())
}

/// Per-position tallies over all active positions, computed on demand from
/// the ballot ledger. No cached counters exist to drift out of sync.
#[get("/positions/analytics")]
async fn position_analytics(
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
) -> Result<Json<Vec<PositionAnalytics>>> {
    let active = active_positions(&positions).await?;

    let mut analytics = Vec::with_capacity(active.len());
    for position in active {
        let mut tally = Vec::new();
        for candidate in approved_candidates(&candidates, &position.name).await? {
            let vote_count = ballots
                .count_documents(vote_filter(&position.name, &candidate.id), None)
                .await?;
            tally.push(CandidateVotes {
                candidate_id: candidate.id,
                candidate_name: candidate.candidate.name,
                candidate_usn: candidate.candidate.usn,
                vote_count,
            });
        }
        rank_by_votes(&mut tally, |c| c.vote_count);

        analytics.push(PositionAnalytics {
            total_candidates: tally.len(),
            total_votes: tally.iter().map(|c| c.vote_count).sum(),
            candidate_votes: tally,
            position: position.position.name,
            position_display: position.position.display_name,
        });
    }
    Ok(Json(analytics))
}

/// The audit view of one position: every candidate with the individual votes
/// cast for them, resolved to voter identities. Admin-only.
#[get("/positions/<name>/analytics")]
async fn position_detail(
    _token: AuthToken<Admin>,
    name: String,
    positions: Coll<Position>,
    candidates: Coll<Candidate>,
    ballots: Coll<Ballot>,
    voters: Coll<Voter>,
) -> Result<Json<PositionDetailAnalytics>> {
    let position = positions
        .find_one(doc! { "name": &name }, None)
        .await?
        .ok_or_else(|| Error::not_found(format!("No position '{name}'")))?;

    let mut details = Vec::new();
    for candidate in approved_candidates(&candidates, &position.name).await? {
        let supporting: Vec<Ballot> = ballots
            .find(
                vote_filter(&position.name, &candidate.id),
                FindOptions::builder().sort(doc! { "cast_at": 1 }).build(),
            )
            .await?
            .try_collect()
            .await?;

        // Resolve voter identities in one query rather than per ballot.
        let voter_ids: Vec<_> = supporting.iter().map(|b| *b.voter_id).collect();
        let voter_emails: HashMap<_, _> = voters
            .find(doc! { "_id": { "$in": voter_ids } }, None)
            .await?
            .try_collect::<Vec<Voter>>()
            .await?
            .into_iter()
            .map(|voter| (voter.id, voter.voter.email))
            .collect();

        let votes: Vec<VoterDetail> = supporting
            .iter()
            .filter_map(|ballot| {
                voter_emails.get(&ballot.voter_id).map(|email| VoterDetail {
                    voter_id: ballot.voter_id,
                    voter_email: email.clone(),
                    cast_at: ballot.cast_at,
                })
            })
            .collect();

        details.push(CandidateDetail {
            candidate_id: candidate.id,
            candidate_name: candidate.candidate.name,
            candidate_usn: candidate.candidate.usn,
            candidate_email: candidate.candidate.email,
            photo_url: candidate.candidate.photo_url,
            vote_count: votes.len() as u64,
            votes,
        });
    }
    rank_by_votes(&mut details, |c| c.vote_count);

    Ok(Json(PositionDetailAnalytics {
        total_candidates: details.len(),
        total_votes: details.iter().map(|c| c.vote_count).sum(),
        candidates: details,
        position: position.position.name,
        position_display: position.position.display_name,
    }))
}

async fn active_positions(positions: &Coll<Position>) -> Result<Vec<Position>> {
    Ok(positions
        .find(
            doc! { "is_active": true },
            FindOptions::builder().sort(doc! { "order": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?)
}

/// Approved candidates in registration order, so tied tallies rank by
/// who registered first.
async fn approved_candidates(
    candidates: &Coll<Candidate>,
    position: &str,
) -> Result<Vec<Candidate>> {
    Ok(candidates
        .find(
            doc! { "position": position, "status": "approved" },
            FindOptions::builder().sort(doc! { "created_at": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?)
}

/// Ballots containing a vote for this candidate under this position.
fn vote_filter(position: &str, candidate: &Id) -> Document {
    doc! {
        "votes": {
            "$elemMatch": { "position": position, "candidate": **candidate },
        },
    }
}
