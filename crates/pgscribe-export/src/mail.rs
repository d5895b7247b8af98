//! Mail delivery of the generated archive.

use std::fs;
use std::path::Path;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::{Attachment, Mailbox, MultiPart, SinglePart};
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use pgscribe_core::{Error, Result};

use crate::config::DeliveryParams;

/// Sends the archive to the configured recipient. Failures are reported to
/// the caller, which logs them and keeps the artifact on disk.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(
        &self,
        params: &DeliveryParams,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<()>;
}

/// SMTP delivery over STARTTLS.
#[derive(Debug, Clone, Default)]
pub struct SmtpMailer;

fn delivery_err(err: impl ToString) -> Error {
    Error::Delivery(err.to_string())
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(
        &self,
        params: &DeliveryParams,
        subject: &str,
        body: &str,
        attachment: &Path,
    ) -> Result<()> {
        let file_name = attachment
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "backup.zip".to_string());
        let contents = fs::read(attachment)?;
        let content_type = ContentType::parse("application/zip").map_err(delivery_err)?;

        let message = Message::builder()
            .from(params.from.parse::<Mailbox>().map_err(delivery_err)?)
            .to(params.to.parse::<Mailbox>().map_err(delivery_err)?)
            .subject(subject)
            .multipart(
                MultiPart::mixed()
                    .singlepart(SinglePart::plain(body.to_string()))
                    .singlepart(Attachment::new(file_name).body(contents, content_type)),
            )
            .map_err(delivery_err)?;

        let credentials = Credentials::new(params.username.clone(), params.password.clone());
        let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&params.host)
            .map_err(delivery_err)?
            .port(params.port)
            .credentials(credentials)
            .build();

        transport.send(message).await.map_err(delivery_err)?;
        Ok(())
    }
}
