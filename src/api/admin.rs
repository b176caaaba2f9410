use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::options::FindOptions;
use rocket::futures::TryStreamExt;
use rocket::{serde::json::Json, Route};
use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::model::{
    api::{
        email::Email,
        settings::{DueDateUpdate, ElectionStatus, VotingEnabledUpdate, VotingWindowUpdate},
        token::AuthToken,
    },
    db::{
        admin::Admin,
        settings::{self, NewSettings, Settings},
        voter::Voter,
    },
    mongodb::{Coll, Id},
    pagination::{Pagination, PaginationResult},
};

pub fn routes() -> Vec<Route> {
    routes![
        get_settings,
        set_due_date,
        set_voting_window,
        set_voting_enabled,
        voted_voters,
    ]
}

/// The full settings view for the admin dashboard. Same shape as the public
/// status endpoint; admins just reach it behind their login.
#[get("/admin/settings")]
async fn get_settings(
    _token: AuthToken<Admin>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
) -> Result<Json<ElectionStatus>> {
    let settings = settings::get_or_create(&settings, &new_settings).await?;
    Ok(Json(ElectionStatus::new(&settings, Utc::now())))
}

#[post("/admin/settings/due-date", data = "<update>", format = "json")]
async fn set_due_date(
    _token: AuthToken<Admin>,
    update: Json<DueDateUpdate>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
) -> Result<Json<ElectionStatus>> {
    apply_settings_patch(&settings, &new_settings, update.0.into_patch()).await
}

#[post("/admin/settings/voting-window", data = "<update>", format = "json")]
async fn set_voting_window(
    _token: AuthToken<Admin>,
    update: Json<VotingWindowUpdate>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
) -> Result<Json<ElectionStatus>> {
    let update = update.0;
    update.validate()?;
    apply_settings_patch(&settings, &new_settings, update.into_patch()).await
}

/// The manual switch. Flipping it off takes effect on the next request;
/// in-flight sessions get denied at their next gated step.
#[post("/admin/settings/voting-enabled", data = "<update>", format = "json")]
async fn set_voting_enabled(
    _token: AuthToken<Admin>,
    update: Json<VotingEnabledUpdate>,
    settings: Coll<Settings>,
    new_settings: Coll<NewSettings>,
) -> Result<Json<ElectionStatus>> {
    let update = update.0;
    info!(
        "Voting manually {}",
        if update.enabled { "enabled" } else { "disabled" }
    );
    apply_settings_patch(&settings, &new_settings, update.into_patch()).await
}

async fn apply_settings_patch(
    settings: &Coll<Settings>,
    new_settings: &Coll<NewSettings>,
    patch: Document,
) -> Result<Json<ElectionStatus>> {
    // Make sure the singleton exists before patching it.
    settings::get_or_create(settings, new_settings).await?;
    let updated = settings::update(settings, patch).await?;
    Ok(Json(ElectionStatus::new(&updated, Utc::now())))
}

/// A voted voter as shown on the turnout page. Never includes OTP state.
#[derive(Debug, Serialize, Deserialize)]
pub struct VotedVoter {
    pub id: Id,
    pub email: Email,
    pub registered_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VotedVotersResponse {
    pub voters: Vec<VotedVoter>,
    pub pagination: PaginationResult,
}

/// Paginated list of voters who have cast a ballot, newest first, with an
/// optional email substring search.
#[get("/admin/voters/voted?<search>")]
async fn voted_voters(
    _token: AuthToken<Admin>,
    search: Option<String>,
    pagination: Pagination,
    voters: Coll<Voter>,
) -> Result<Json<VotedVotersResponse>> {
    let mut filter = doc! { "has_voted": true };
    if let Some(search) = search {
        filter.insert(
            "email",
            doc! { "$regex": escape_regex(&search), "$options": "i" },
        );
    }

    let total = voters.count_documents(filter.clone(), None).await?;
    let page: Vec<Voter> = voters
        .find(
            filter,
            FindOptions::builder()
                .sort(doc! { "created_at": -1 })
                .skip(pagination.skip())
                .limit(pagination.page_size() as i64)
                .build(),
        )
        .await?
        .try_collect()
        .await?;

    let voters = page
        .into_iter()
        .map(|voter| VotedVoter {
            id: voter.id,
            email: voter.voter.email,
            registered_at: voter.voter.created_at,
        })
        .collect();
    Ok(Json(VotedVotersResponse {
        voters,
        pagination: pagination.result(total as usize),
    }))
}

/// Treat the search term as a literal, not a pattern.
fn escape_regex(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len());
    for c in term.chars() {
        if !c.is_ascii_alphanumeric() {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_regex_metacharacters() {
        assert_eq!("alice", escape_regex("alice"));
        assert_eq!("a\\.b", escape_regex("a.b"));
        assert_eq!("\\.\\*\\+\\?", escape_regex(".*+?"));
    }
}
