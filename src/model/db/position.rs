use std::ops::{Deref, DerefMut};

use serde::{Deserialize, Serialize};

use crate::model::mongodb::Id;

/// Core position data, as stored in the database.
#[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct PositionCore {
    /// Unique internal name, referenced by candidates and ballots.
    pub name: String,
    /// Human-readable name shown on the ballot form.
    pub display_name: String,
    pub is_active: bool,
    /// Unique display order on the ballot form.
    pub order: u32,
}

/// A position without an ID.
pub type NewPosition = PositionCore;

/// A position from the database, with its unique ID.
#[derive(Debug, Serialize, Deserialize)]
pub struct Position {
    #[serde(rename = "_id")]
    pub id: Id,
    #[serde(flatten)]
    pub position: PositionCore,
}

impl Deref for Position {
    type Target = PositionCore;

    fn deref(&self) -> &Self::Target {
        &self.position
    }
}

impl DerefMut for Position {
    fn deref_mut(&mut self) -> &mut Self::Target {
        &mut self.position
    }
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl PositionCore {
        pub fn example() -> Self {
            Self {
                name: "secretary".to_string(),
                display_name: "Secretary".to_string(),
                is_active: true,
                order: 1,
            }
        }
    }
}
