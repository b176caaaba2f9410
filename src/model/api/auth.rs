use serde::{Deserialize, Serialize};

use crate::model::otp::Code;

use super::email::Email;

/// A request for an OTP to be emailed to the given address.
///
/// Parsing the [`Email`] is where identity normalisation happens; a missing
/// or malformed address never reaches the issuing logic.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OtpRequest {
    pub email: Email,
}

/// Submission of an emailed code to exchange for a session credential.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: Email,
    pub code: Code,
}

/// Example data for tests.
#[cfg(test)]
mod examples {
    use super::*;

    impl OtpRequest {
        pub fn example() -> Self {
            Self {
                email: Email::example(),
            }
        }
    }
}
