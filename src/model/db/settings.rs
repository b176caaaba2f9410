use std::ops::{Deref, DerefMut};

use chrono::{DateTime, Utc};
use mongodb::bson::{doc, Document};
use mongodb::error::Error as DbError;
use mongodb::options::FindOneAndUpdateOptions;
use serde::{Deserialize, Serialize};

use crate::model::mongodb::{serde_option_chrono_datetime, Coll, Id};

/// The fixed key of the one logical settings document.
pub const SETTINGS_KEY: &str = "singleton";

/// The election settings every gating decision reads.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingsCore {
    /// Candidates may register up to this instant; unset means no deadline.
    #[serde(with = "serde_option_chrono_datetime")]
    pub registration_due_date: Option<DateTime<Utc>>,
    /// Start of the voting window; unset leaves that side open.
    #[serde(with = "serde_option_chrono_datetime")]
    pub voting_start: Option<DateTime<Utc>>,
    /// End of the voting window; unset leaves that side open.
    #[serde(with = "serde_option_chrono_datetime")]
    pub voting_end: Option<DateTime<Utc>>,
    /// The manual switch, layered on top of the window checks.
    /// Defaults to off: a fresh election stays closed until an admin opens it.
    pub voting_enabled: bool,
}

impl Default for SettingsCore {
    fn default() -> Self {
        Self {
            registration_due_date: None,
            voting_start: None,
            voting_end: None,
            voting_enabled: false,
        }
    }
}

/// The settings document without an ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct NewSettings {
    pub key: String,
    #[serde(flatten)]
    pub settings: SettingsCore,
}

impl Default for NewSettings {
    fn default() -> Self {
        Self {
            key: SETTINGS_KEY.to_string(),
            settings: SettingsCore::default(),
        }
    }
}

/// The settings document from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Settings {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub inner: NewSettings,
}

impl Deref for Settings {
    type Target = SettingsCore;

    fn deref(&self) -> &Self::Target {
        &self.inner.settings
    }
}

impl DerefMut for Settings {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.inner.settings
    }
}

/// Get the settings singleton, creating the default-valued document the first
/// time it is requested. Idempotent; the unique index on `key` guarantees two
/// concurrent first reads still produce a single document.
pub async fn get_or_create(
    settings: &Coll<Settings>,
    new_settings: &Coll<NewSettings>,
) -> Result<Settings, DbError> {
    let filter = doc! { "key": SETTINGS_KEY };
    if let Some(existing) = settings.find_one(filter.clone(), None).await? {
        return Ok(existing);
    }

    // First access: insert the default, tolerating a concurrent insert
    // winning the race (the re-read below sees whichever won).
    if let Err(err) = new_settings.insert_one(NewSettings::default(), None).await {
        if settings.find_one(filter.clone(), None).await?.is_none() {
            return Err(err);
        }
    }
    settings
        .find_one(filter, None)
        .await?
        .ok_or_else(|| DbError::custom("settings singleton vanished after insert"))
}

/// Apply a merge-patch to the settings singleton and return the updated
/// document. `update` is a full update document (`$set`/`$unset`); field
/// validation is the caller's job.
pub async fn update(settings: &Coll<Settings>, update: Document) -> Result<Settings, DbError> {
    let options = FindOneAndUpdateOptions::builder()
        .return_document(mongodb::options::ReturnDocument::After)
        .build();
    settings
        .find_one_and_update(doc! { "key": SETTINGS_KEY }, update, options)
        .await?
        .ok_or_else(|| DbError::custom("settings singleton missing during update"))
}
