use std::sync::Arc;

use askama::Template;
use lettre::{
	message::{header::ContentType, Mailbox},
	transport::smtp::authentication::Credentials,
	AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
};

use crate::config::{Config, MailConfig};

pub const RESET_SUBJECT: &str = "Reset your password";

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("invalid address: {0}")]
	Address(#[from] lettre::address::AddressError),
	#[error("failed to build message: {0}")]
	Message(#[from] lettre::error::Error),
	#[error("smtp error: {0}")]
	Smtp(#[from] lettre::transport::smtp::Error),
}

#[derive(Template)]
#[template(path = "reset_password.html")]
struct ResetTemplate<'a> {
	name: &'a str,
	link: &'a str,
}

struct Smtp {
	transport: AsyncSmtpTransport<Tokio1Executor>,
	from: Mailbox,
}

/// Sends transactional email. Without SMTP configuration every send is
/// skipped and logged instead.
#[derive(Clone)]
pub struct Mailer {
	smtp: Option<Arc<Smtp>>,
	public_url: Arc<str>,
}

impl std::fmt::Debug for Mailer {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Mailer")
			.field("enabled", &self.smtp.is_some())
			.field("public_url", &self.public_url)
			.finish()
	}
}

impl Mailer {
	pub fn new(config: &Config) -> Result<Self, Error> {
		let smtp = config.mail.as_ref().map(connect).transpose()?;

		Ok(Self {
			smtp: smtp.map(Arc::new),
			public_url: config.public_url.as_str().into(),
		})
	}

	/// A mailer that never sends anything.
	pub fn disabled(public_url: &str) -> Self {
		Self {
			smtp: None,
			public_url: public_url.into(),
		}
	}

	pub fn reset_link(&self, token: &str) -> String {
		format!("{}/api/users/reset-password?resetToken={token}", self.public_url)
	}

	/// Emails a password reset link in the background.
	///
	/// Delivery failures are logged and never reach the caller.
	pub fn send_reset(&self, name: &str, email: &str, token: &str) {
		let Some(smtp) = self.smtp.clone() else {
			tracing::info!(to = email, "mail is not configured, skipping password reset email");
			return;
		};

		let link = self.reset_link(token);
		let body = match (ResetTemplate { name, link: &link }).render() {
			Ok(body) => body,
			Err(error) => {
				tracing::error!(to = email, %error, "failed to render password reset email");
				return;
			}
		};
		let to = email.to_owned();

		tokio::spawn(async move {
			match smtp.send(&to, RESET_SUBJECT, body).await {
				Ok(()) => tracing::info!(%to, "sent password reset email"),
				Err(error) => tracing::error!(%to, %error, "failed to send password reset email"),
			}
		});
	}
}

fn connect(config: &MailConfig) -> Result<Smtp, Error> {
	let transport = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?
		.port(config.port)
		.credentials(Credentials::new(
			config.username.clone(),
			config.password.clone(),
		))
		.build();

	Ok(Smtp {
		transport,
		from: config.username.parse()?,
	})
}

impl Smtp {
	async fn send(&self, to: &str, subject: &str, html: String) -> Result<(), Error> {
		let message = Message::builder()
			.from(self.from.clone())
			.to(to.parse()?)
			.subject(subject)
			.header(ContentType::TEXT_HTML)
			.body(html)?;

		self.transport.send(message).await?;
		Ok(())
	}
}
