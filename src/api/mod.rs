//! HTTP endpoint definitions, grouped by concern.

mod admin;
mod auth;
mod candidate;
mod position;
mod voting;

use rocket::Route;

/// All the API routes.
pub fn routes() -> Vec<Route> {
    auth::routes()
        .into_iter()
        .chain(voting::routes())
        .chain(candidate::routes())
        .chain(position::routes())
        .chain(admin::routes())
        .collect()
}
