use chrono::Utc;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::Error;
use crate::model::db::candidate::{CandidateStatus, NewCandidate};

use super::email::Email;

/// A prospective candidate's registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateRegistration {
    pub name: String,
    pub usn: String,
    pub email: Email,
    pub position: String,
    pub phone: String,
    pub gender: Option<String>,
    pub photo_url: Option<String>,
}

impl TryFrom<CandidateRegistration> for NewCandidate {
    type Error = RegistrationError;

    /// Validate the form and produce a pending candidate record.
    /// The USN is normalised the same way voter emails are: lowercased and
    /// trimmed, so one student cannot register twice under different casings.
    fn try_from(form: CandidateRegistration) -> Result<Self, Self::Error> {
        if form.name.trim().is_empty() {
            return Err(RegistrationError::MissingField("name"));
        }
        if form.position.trim().is_empty() {
            return Err(RegistrationError::MissingField("position"));
        }
        if form.phone.trim().is_empty() {
            return Err(RegistrationError::MissingField("phone"));
        }

        let usn = form.usn.trim().to_lowercase();
        if usn.is_empty() {
            return Err(RegistrationError::MissingField("usn"));
        }
        if !usn.chars().all(|c| c.is_ascii_alphanumeric()) {
            return Err(RegistrationError::InvalidUsn(usn));
        }

        Ok(NewCandidate {
            name: form.name.trim().to_string(),
            usn,
            email: form.email,
            position: form.position,
            phone: Some(form.phone),
            gender: form.gender,
            photo_url: form.photo_url,
            status: CandidateStatus::Pending,
            created_at: Utc::now(),
        })
    }
}

impl CandidateRegistration {
    /// The admin creation path: same validation as self-registration, but the
    /// candidate goes straight to approved with no pending step.
    pub fn into_approved(self) -> Result<NewCandidate, RegistrationError> {
        let mut candidate = NewCandidate::try_from(self)?;
        candidate.status = CandidateStatus::Approved;
        Ok(candidate)
    }
}

#[derive(Debug, PartialEq, Eq, Error)]
pub enum RegistrationError {
    #[error("Missing required field: {0}")]
    MissingField(&'static str),
    #[error("Invalid USN: {0}")]
    InvalidUsn(String),
}

impl From<RegistrationError> for Error {
    fn from(err: RegistrationError) -> Self {
        Error::Validation(err.to_string())
    }
}

/// Admin edits to an existing candidate.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateUpdate {
    pub name: Option<String>,
    pub position: Option<String>,
    pub gender: Option<String>,
}

#[cfg(test)]
mod examples {
    use super::*;

    impl CandidateRegistration {
        pub fn example() -> Self {
            Self {
                name: "Alice Anand".to_string(),
                usn: "NU24MCA42".to_string(),
                email: Email::example(),
                position: "secretary".to_string(),
                phone: "9876543210".to_string(),
                gender: None,
                photo_url: None,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalises_usn() {
        let form = CandidateRegistration::example();
        let candidate = NewCandidate::try_from(form).unwrap();
        assert_eq!("nu24mca42", candidate.usn);
        assert_eq!(CandidateStatus::Pending, candidate.status);
    }

    #[test]
    fn admin_created_candidates_start_approved() {
        let candidate = CandidateRegistration::example().into_approved().unwrap();
        assert_eq!(CandidateStatus::Approved, candidate.status);
        assert_eq!("nu24mca42", candidate.usn);

        // Validation still applies on the admin path.
        let mut form = CandidateRegistration::example();
        form.phone = "".to_string();
        assert_eq!(
            Err(RegistrationError::MissingField("phone")),
            form.into_approved()
        );
    }

    #[test]
    fn rejects_missing_fields() {
        let mut form = CandidateRegistration::example();
        form.name = " ".to_string();
        assert_eq!(
            Err(RegistrationError::MissingField("name")),
            NewCandidate::try_from(form)
        );

        let mut form = CandidateRegistration::example();
        form.usn = "".to_string();
        assert_eq!(
            Err(RegistrationError::MissingField("usn")),
            NewCandidate::try_from(form)
        );
    }

    #[test]
    fn rejects_non_alphanumeric_usn() {
        let mut form = CandidateRegistration::example();
        form.usn = "nu24/mca42".to_string();
        assert!(matches!(
            NewCandidate::try_from(form),
            Err(RegistrationError::InvalidUsn(_))
        ));
    }
}
