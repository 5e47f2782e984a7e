use crate::compose::EmailMessage;
use crate::config::SmtpConfig;
use crate::types::Result;
use async_trait::async_trait;
use lettre::transport::smtp::client::Tls;
use lettre::{Address, AsyncSmtpTransport, AsyncTransport, Tokio1Executor};
use tracing::info;

/// Delivery seam for the pipeline; tests substitute a counting fake.
#[async_trait]
pub trait SendMail: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<()>;
}

/// Delivers composed messages over a plain SMTP session. The message bytes
/// are composed upstream and sent raw, so the wire format (folded encoded
/// subject, base64 body) reaches the server exactly as rendered.
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    smtp: SmtpConfig,
}

impl SmtpMailer {
    pub fn new(smtp: SmtpConfig) -> Result<Self> {
        let (host, port) = smtp.host_and_port()?;

        let transport = AsyncSmtpTransport::<Tokio1Executor>::builder_dangerous(&host)
            .port(port)
            .tls(Tls::None)
            .build();

        Ok(Self { transport, smtp })
    }

    fn envelope(&self) -> Result<lettre::address::Envelope> {
        let from: Address = self.smtp.from.parse()?;
        let mut recipients = Vec::with_capacity(self.smtp.recipients.len());
        for recipient in &self.smtp.recipients {
            recipients.push(recipient.to.parse::<Address>()?);
        }
        Ok(lettre::address::Envelope::new(Some(from), recipients)?)
    }
}

#[async_trait]
impl SendMail for SmtpMailer {
    async fn send(&self, message: &EmailMessage) -> Result<()> {
        let envelope = self.envelope()?;
        let wire = message.to_wire(&self.smtp);

        self.transport.send_raw(&envelope, wire.as_bytes()).await?;

        info!(
            "Delivered notification to {} recipient(s): {}",
            self.smtp.recipients.len(),
            message.subject
        );
        Ok(())
    }
}
