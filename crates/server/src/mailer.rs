//! Invitation mail.
//!
//! Delivery is behind the [`Mailer`] trait; the bundled [`LogMailer`] composes
//! the message and records the send through `tracing`. Sends run on a
//! detached task and never affect the response of the request that caused
//! them.

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

pub const INVITATION_SUBJECT: &str = "Te han invitado a unirte a un hogar en Keda";

#[derive(Debug, Error)]
pub enum MailError {
    #[error("invalid recipient address")]
    InvalidRecipient,

    #[error("mail delivery failed: {0}")]
    Delivery(String),
}

/// A composed plain-text message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send_invitation(&self, to: &str, code: &str) -> Result<(), MailError>;
}

/// Loose syntactic check: `local@domain.tld`, no whitespace.
pub fn is_valid_address(addr: &str) -> bool {
    let Some((local, domain)) = addr.split_once('@') else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !addr.chars().any(char::is_whitespace)
}

/// Build the invitation message for `code`, linking to `app_url`.
pub fn compose_invitation(from: &str, to: &str, code: &str, app_url: &str) -> Message {
    let body = format!(
        "Hola!\n\nTe han invitado a compartir los gastos de un hogar en Keda.\n\n\
         Para unirte, haz click en el siguiente enlace o usa el código de invitación al loguearte: {code}\n\n\
         Link: {}/invite?code={code}\n\n¡Te esperamos!",
        app_url.trim_end_matches('/')
    );
    Message {
        from: from.to_owned(),
        to: to.to_owned(),
        subject: INVITATION_SUBJECT.to_owned(),
        body,
    }
}

/// [`Mailer`] that only logs.
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
    app_url: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>, app_url: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            app_url: app_url.into(),
        }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send_invitation(&self, to: &str, code: &str) -> Result<(), MailError> {
        if !is_valid_address(to) {
            return Err(MailError::InvalidRecipient);
        }
        let msg = compose_invitation(&self.from, to, code, &self.app_url);
        info!(
            from = %msg.from,
            subject = %msg.subject,
            body_len = msg.body.len(),
            "invitation mail sent"
        );
        Ok(())
    }
}

/// Send an invitation in the background, logging failure.
pub fn dispatch_invitation(mailer: Arc<dyn Mailer>, to: String, code: String) {
    tokio::spawn(async move {
        if let Err(e) = mailer.send_invitation(&to, &code).await {
            warn!(error = %e, "failed to send invitation mail");
        }
    });
}
