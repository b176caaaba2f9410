#[macro_use]
extern crate rocket;

#[macro_use]
extern crate log;

pub mod api;
pub mod config;
pub mod error;
pub mod logging;
pub mod mailer;
pub mod model;

use rocket::{Build, Rocket};

use crate::config::{ConfigFairing, DatabaseFairing, MailerFairing};
use crate::logging::LoggerFairing;

/// Assemble the server: all routes mounted at the root, with the config,
/// database and mailer fairings doing their setup at ignite time.
pub fn build() -> Rocket<Build> {
    rocket::build()
        .mount("/", api::routes())
        .attach(ConfigFairing)
        .attach(DatabaseFairing)
        .attach(MailerFairing)
        .attach(LoggerFairing)
}
