use chrono::Utc;
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route};

use crate::error::{Error, Result};
use crate::model::{
    api::{
        candidate::{CandidateRegistration, CandidateUpdate},
        token::AuthToken,
    },
    db::{
        admin::Admin,
        candidate::{Candidate, CandidateStatus, NewCandidate},
        position::Position,
        settings::{self, NewSettings, Settings},
    },
    eligibility,
    mongodb::{is_duplicate_key, Coll, Id},
};

pub fn routes() -> Vec<Route> {
    routes![
        register_candidate,
        create_candidate,
        list_candidates,
        pending_candidates,
        approve_candidate,
        reject_candidate,
        edit_candidate,
        delete_candidate,
    ]
}

/// Public candidate registration, open until the registration deadline.
///
/// New candidates always start out pending; they appear on the ballot only
/// once an admin approves them.
#[post("/candidates", data = "<form>", format = "json")]
async fn register_candidate(
    form: Json<CandidateRegistration>,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
    positions: Coll<Position>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
) -> Result<Json<Candidate>> {
    let settings = settings::get_or_create(&settings, &new_settings).await?;
    eligibility::can_register_candidate(&settings, Utc::now())?;

    let candidate = NewCandidate::try_from(form.0)?;
    let created = insert_candidate(candidate, &candidates, &new_candidates, &positions).await?;
    info!(
        "Candidate registered: {} for {}",
        created.usn, created.position
    );
    Ok(Json(created))
}

/// Direct admin creation of a candidate: no deadline gate, no pending step.
#[post("/admin/candidates", data = "<form>", format = "json")]
async fn create_candidate(
    _token: AuthToken<Admin>,
    form: Json<CandidateRegistration>,
    candidates: Coll<Candidate>,
    new_candidates: Coll<NewCandidate>,
    positions: Coll<Position>,
) -> Result<Json<Candidate>> {
    let candidate = form.0.into_approved()?;
    let created = insert_candidate(candidate, &candidates, &new_candidates, &positions).await?;
    info!(
        "Candidate created by admin: {} for {}",
        created.usn, created.position
    );
    Ok(Json(created))
}

/// Shared insert path: the position must be active, and the USN and email
/// must both be new. The unique indexes are the real guarantee under
/// concurrency; the pre-check only buys a friendlier message.
async fn insert_candidate(
    candidate: NewCandidate,
    candidates: &Coll<Candidate>,
    new_candidates: &Coll<NewCandidate>,
    positions: &Coll<Position>,
) -> Result<Candidate> {
    positions
        .find_one(
            doc! { "name": &candidate.position, "is_active": true },
            None,
        )
        .await?
        .ok_or_else(|| {
            Error::Validation(format!("No active position '{}'", candidate.position))
        })?;

    let duplicate = candidates
        .find_one(
            doc! { "$or": [
                { "usn": &candidate.usn },
                { "email": candidate.email.clone() },
            ] },
            None,
        )
        .await?;
    if duplicate.is_some() {
        return Err(Error::Validation(
            "A candidate with this USN or email already exists.".to_string(),
        ));
    }

    // The index rejection covers the race the pre-check cannot.
    let inserted = new_candidates.insert_one(&candidate, None).await.map_err(|err| {
        if is_duplicate_key(&err) {
            Error::Validation("A candidate with this USN or email already exists.".to_string())
        } else {
            err.into()
        }
    })?;
    let id: Id = inserted
        .inserted_id
        .as_object_id()
        .ok_or_else(|| Error::Validation("Invalid candidate ID".to_string()))?
        .into();

    Ok(Candidate { id, candidate })
}

/// All candidates in every state, for the admin dashboard.
#[get("/candidates")]
async fn list_candidates(
    _token: AuthToken<Admin>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<Candidate>>> {
    let all = candidates
        .find(
            None,
            FindOptions::builder().sort(doc! { "created_at": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;
    Ok(Json(all))
}

/// Candidates awaiting an approval decision.
#[get("/candidates/pending")]
async fn pending_candidates(
    _token: AuthToken<Admin>,
    candidates: Coll<Candidate>,
) -> Result<Json<Vec<Candidate>>> {
    let pending = candidates
        .find(
            doc! { "status": "pending" },
            FindOptions::builder().sort(doc! { "created_at": 1 }).build(),
        )
        .await?
        .try_collect()
        .await?;
    Ok(Json(pending))
}

#[post("/candidates/<id>/approve")]
async fn approve_candidate(
    token: AuthToken<Admin>,
    id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<Candidate>> {
    set_candidate_status(token, id, CandidateStatus::Approved, candidates).await
}

#[post("/candidates/<id>/reject")]
async fn reject_candidate(
    token: AuthToken<Admin>,
    id: Id,
    candidates: Coll<Candidate>,
) -> Result<Json<Candidate>> {
    set_candidate_status(token, id, CandidateStatus::Rejected, candidates).await
}

/// Move a candidate to the given lifecycle state. Approving an already
/// approved (or rejected) candidate is allowed and idempotent.
async fn set_candidate_status(
    _token: AuthToken<Admin>,
    id: Id,
    status: CandidateStatus,
    candidates: Coll<Candidate>,
) -> Result<Json<Candidate>> {
    let updated = candidates
        .find_one_and_update(
            id.as_doc(),
            doc! { "$set": { "status": status.to_string() } },
            mongodb::options::FindOneAndUpdateOptions::builder()
                .return_document(mongodb::options::ReturnDocument::After)
                .build(),
        )
        .await?
        .ok_or_else(|| Error::not_found(format!("No candidate with ID '{id}'")))?;

    info!("Candidate {} now {}", updated.usn, updated.status);
    Ok(Json(updated))
}

/// Admin edits to a candidate's details. Only the provided fields change;
/// the USN and email are immutable once registered.
#[put("/candidates/<id>", data = "<update>", format = "json")]
async fn edit_candidate(
    _token: AuthToken<Admin>,
    id: Id,
    update: Json<CandidateUpdate>,
    candidates: Coll<Candidate>,
    positions: Coll<Position>,
) -> Result<Json<Candidate>> {
    let update = update.0;

    let mut set = Document::new();
    if let Some(name) = update.name {
        if name.trim().is_empty() {
            return Err(Error::Validation("Name cannot be empty".to_string()));
        }
        set.insert("name", name.trim());
    }
    if let Some(position) = update.position {
        positions
            .find_one(doc! { "name": &position, "is_active": true }, None)
            .await?
            .ok_or_else(|| Error::Validation(format!("No active position '{position}'")))?;
        set.insert("position", position);
    }
    if let Some(gender) = update.gender {
        set.insert("gender", gender);
    }
    if set.is_empty() {
        return Err(Error::Validation("No fields to update".to_string()));
    }

    let updated = candidates
        .find_one_and_update(
            id.as_doc(),
            doc! { "$set": set },
            mongodb::options::FindOneAndUpdateOptions::builder()
                .return_document(mongodb::options::ReturnDocument::After)
                .build(),
        )
        .await?
        .ok_or_else(|| Error::not_found(format!("No candidate with ID '{id}'")))?;
    Ok(Json(updated))
}

#[delete("/candidates/<id>")]
async fn delete_candidate(
    _token: AuthToken<Admin>,
    id: Id,
    candidates: Coll<Candidate>,
) -> Result<()> {
    let result = candidates.delete_one(id.as_doc(), None).await?;
    if result.deleted_count == 0 {
        return Err(Error::not_found(format!("No candidate with ID '{id}'")));
    }
    Ok(())
}
