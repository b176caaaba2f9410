use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::db::position::NewPosition;

/// Admin form for creating a position.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionSpec {
    pub name: String,
    pub display_name: String,
    pub order: u32,
    /// New positions default to active.
    #[serde(default = "default_active")]
    pub is_active: bool,
}

fn default_active() -> bool {
    true
}

impl TryFrom<PositionSpec> for NewPosition {
    type Error = PositionSpecError;

    /// The internal name is normalised like USNs: trimmed and lowercased, so
    /// ballots and candidates always reference one canonical spelling.
    fn try_from(spec: PositionSpec) -> Result<Self, Self::Error> {
        let name = spec.name.trim().to_lowercase();
        if name.is_empty() {
            return Err(PositionSpecError::MissingField("name"));
        }
        let display_name = spec.display_name.trim().to_string();
        if display_name.is_empty() {
            return Err(PositionSpecError::MissingField("display_name"));
        }
        Ok(NewPosition {
            name,
            display_name,
            is_active: spec.is_active,
            order: spec.order,
        })
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum PositionSpecError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
}

impl From<PositionSpecError> for Error {
    fn from(err: PositionSpecError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Admin edits to an existing position. The internal name is immutable:
/// candidates and recorded ballots reference it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PositionUpdate {
    pub display_name: Option<String>,
    pub order: Option<u32>,
    pub is_active: Option<bool>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_name() {
        let spec = PositionSpec {
            name: " General Secretary ".to_string(),
            display_name: "General Secretary".to_string(),
            order: 2,
            is_active: true,
        };
        let position = NewPosition::try_from(spec).unwrap();
        assert_eq!("general secretary", position.name);
        assert_eq!("General Secretary", position.display_name);
    }

    #[test]
    fn rejects_blank_fields() {
        let spec = PositionSpec {
            name: "  ".to_string(),
            display_name: "Secretary".to_string(),
            order: 1,
            is_active: true,
        };
        assert_eq!(
            Err(PositionSpecError::MissingField("name")),
            NewPosition::try_from(spec)
        );

        let spec = PositionSpec {
            name: "secretary".to_string(),
            display_name: "".to_string(),
            order: 1,
            is_active: true,
        };
        assert_eq!(
            Err(PositionSpecError::MissingField("display_name")),
            NewPosition::try_from(spec)
        );
    }
}
