use std::{fmt, net::IpAddr, str::FromStr};

/// An error in the environment configuration.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} must be set")]
	Missing(&'static str),
	#[error("{name} is invalid: {reason}")]
	Invalid { name: &'static str, reason: String },
}

/// SMTP relay used to deliver password reset emails.
#[derive(Clone)]
pub struct MailConfig {
	pub host: String,
	pub port: u16,
	pub username: String,
	pub password: String,
}

impl fmt::Debug for MailConfig {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("MailConfig")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("username", &self.username)
			.field("password", &"<redacted>")
			.finish()
	}
}

/// Process configuration, read once at startup and never mutated.
#[derive(Clone)]
pub struct Config {
	pub host: IpAddr,
	pub port: u16,
	/// `None` keeps all data in memory.
	pub database_url: Option<String>,
	/// Secret used to sign session tokens.
	pub jwt_secret: String,
	/// Base URL used when linking back to the server, e.g. in reset emails.
	pub public_url: String,
	/// `None` disables outbound mail.
	pub mail: Option<MailConfig>,
	pub rate_limit: bool,
	/// Whether to export traces and metrics over OTLP.
	pub otlp: bool,
}

impl fmt::Debug for Config {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Config")
			.field("host", &self.host)
			.field("port", &self.port)
			.field("database_url", &self.database_url.as_ref().map(|_| "<redacted>"))
			.field("jwt_secret", &"<redacted>")
			.field("public_url", &self.public_url)
			.field("mail", &self.mail)
			.field("rate_limit", &self.rate_limit)
			.field("otlp", &self.otlp)
			.finish()
	}
}

impl Config {
	/// Reads the configuration from the process environment.
	pub fn from_env() -> Result<Self, Error> {
		Self::from_lookup(|key| std::env::var(key).ok())
	}

	fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, Error> {
		let var = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

		let host = parse(&var, "HOST")?.unwrap_or(IpAddr::from([127, 0, 0, 1]));
		let port = parse(&var, "PORT")?.unwrap_or(3000);

		let jwt_secret = var("JWT_SECRET").ok_or(Error::Missing("JWT_SECRET"))?;
		let public_url = var("PUBLIC_URL")
			.map_or_else(|| format!("http://localhost:{port}"), |url| url.trim_end_matches('/').to_owned());

		let mail = match (var("ADMIN_EMAIL"), var("ADMIN_PASSWORD")) {
			(Some(username), Some(password)) => Some(MailConfig {
				host: var("SMTP_HOST").unwrap_or_else(|| "smtp.gmail.com".into()),
				port: parse(&var, "SMTP_PORT")?.unwrap_or(587),
				username,
				password,
			}),
			(Some(_), None) => return Err(Error::Missing("ADMIN_PASSWORD")),
			_ => None,
		};

		Ok(Self {
			host,
			port,
			database_url: var("DATABASE_URL"),
			jwt_secret,
			public_url,
			mail,
			rate_limit: parse(&var, "RATE_LIMIT")?.unwrap_or(true),
			otlp: var("OTEL_EXPORTER_OTLP_ENDPOINT").is_some(),
		})
	}
}

fn parse<T>(var: impl Fn(&str) -> Option<String>, name: &'static str) -> Result<Option<T>, Error>
where
	T: FromStr,
	T::Err: fmt::Display,
{
	var(name)
		.map(|value| {
			value.trim().parse().map_err(|e: T::Err| Error::Invalid {
				name,
				reason: e.to_string(),
			})
		})
		.transpose()
}

#[cfg(test)]
mod test {
	use std::collections::HashMap;

	use super::*;

	fn config(vars: &[(&str, &str)]) -> Result<Config, Error> {
		let vars = vars
			.iter()
			.map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
			.collect::<HashMap<_, _>>();

		Config::from_lookup(|key| vars.get(key).cloned())
	}

	#[test]
	fn test_defaults() {
		let config = config(&[("JWT_SECRET", "secret")]).unwrap();

		assert_eq!(config.port, 3000);
		assert_eq!(config.host, IpAddr::from([127, 0, 0, 1]));
		assert_eq!(config.public_url, "http://localhost:3000");
		assert!(config.database_url.is_none());
		assert!(config.mail.is_none());
		assert!(config.rate_limit);
		assert!(!config.otlp);
	}

	#[test]
	fn test_secret_is_required() {
		assert!(matches!(config(&[]), Err(Error::Missing("JWT_SECRET"))));
		assert!(matches!(
			config(&[("JWT_SECRET", "  ")]),
			Err(Error::Missing("JWT_SECRET"))
		));
	}

	#[test]
	fn test_invalid_port() {
		let error = config(&[("JWT_SECRET", "secret"), ("PORT", "eighty")]).unwrap_err();

		assert!(matches!(error, Error::Invalid { name: "PORT", .. }));
	}

	#[test]
	fn test_mail_config() {
		let config = config(&[
			("JWT_SECRET", "secret"),
			("ADMIN_EMAIL", "admin@example.com"),
			("ADMIN_PASSWORD", "app-password"),
			("PORT", "8080"),
			("PUBLIC_URL", "https://example.com/"),
		])
		.unwrap();

		let mail = config.mail.unwrap();
		assert_eq!(mail.host, "smtp.gmail.com");
		assert_eq!(mail.port, 587);
		assert_eq!(mail.username, "admin@example.com");
		assert_eq!(config.public_url, "https://example.com");
	}

	#[test]
	fn test_mail_password_is_required_with_email() {
		assert!(matches!(
			config(&[("JWT_SECRET", "secret"), ("ADMIN_EMAIL", "admin@example.com")]),
			Err(Error::Missing("ADMIN_PASSWORD"))
		));
	}

	#[test]
	fn test_debug_redacts_secrets() {
		let config = config(&[
			("JWT_SECRET", "super-secret"),
			("DATABASE_URL", "postgres://user:pw@localhost/db"),
		])
		.unwrap();

		let debug = format!("{config:?}");
		assert!(!debug.contains("super-secret"));
		assert!(!debug.contains("pw@localhost"));
	}
}
