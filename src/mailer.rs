use lettre::{
    message::Mailbox,
    transport::smtp::{authentication::Credentials, Error as SmtpError},
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};
use thiserror::Error;

use crate::error::Error;
use crate::model::api::email::Email;

/// The outbound transactional email sender.
///
/// The transport pools SMTP connections and connects lazily, so constructing
/// a `Mailer` at ignite time never blocks on the mail server.
pub struct Mailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
}

impl Mailer {
    /// Build a mailer against the given SMTP relay.
    pub fn new(
        host: &str,
        port: u16,
        username: String,
        password: String,
        from: &str,
    ) -> Result<Self, MailerError> {
        let transport = AsyncSmtpTransport::<Tokio1Executor>::relay(host)?
            .port(port)
            .credentials(Credentials::new(username, password))
            .build();
        let from = from.parse::<Mailbox>()?;
        Ok(Self { transport, from })
    }

    /// Send a plain-text email. The result reflects actual dispatch success,
    /// not merely that the message was constructed.
    pub async fn send(&self, to: &Email, subject: &str, body: String) -> Result<(), Error> {
        let message = Message::builder()
            .from(self.from.clone())
            .to(to
                .parse::<Mailbox>()
                .map_err(|err| Error::Validation(format!("Undeliverable address: {err}")))?)
            .subject(subject)
            .body(body)
            .map_err(|err| Error::Validation(format!("Unsendable message: {err}")))?;
        self.transport.send(message).await?;
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum MailerError {
    #[error(transparent)]
    Smtp(#[from] SmtpError),
    #[error("Invalid sender address: {0}")]
    Address(#[from] lettre::address::AddressError),
}
