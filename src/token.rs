//! Stateless session tokens.
//!
//! A token is an HS256 JWT naming a user and an expiry. Nothing is stored on
//! the server: a token stays valid until it expires, and rotating the secret
//! invalidates every token issued with the old one.

use std::fmt;

use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// How many days a session token stays valid after it is issued.
pub const LIFETIME_DAYS: i64 = 15;

/// How long a session token stays valid after it is issued.
pub fn lifetime() -> Duration {
	Duration::days(LIFETIME_DAYS)
}

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("failed to sign token: {0}")]
	Sign(jsonwebtoken::errors::Error),
	#[error("invalid token: {0}")]
	Invalid(jsonwebtoken::errors::Error),
	#[error("token expired at {0}")]
	Expired(DateTime<Utc>),
}

#[derive(Debug, Serialize, Deserialize)]
struct Claims {
	/// The user the token was issued to.
	sub: Uuid,
	/// Issued at (Unix timestamp).
	iat: i64,
	/// Expiration (Unix timestamp).
	exp: i64,
}

/// Issues and verifies session tokens with a process-wide secret.
pub struct Tokens {
	encoding: EncodingKey,
	decoding: DecodingKey,
	validation: Validation,
}

impl Tokens {
	pub fn new(secret: &[u8]) -> Self {
		let mut validation = Validation::new(Algorithm::HS256);

		// expiry is checked against our own clock in `verify_at`
		validation.validate_exp = false;
		validation.leeway = 0;
		validation.set_required_spec_claims(&["sub", "exp"]);

		Self {
			encoding: EncodingKey::from_secret(secret),
			decoding: DecodingKey::from_secret(secret),
			validation,
		}
	}

	/// Issues a token for the user, valid for [`lifetime`].
	pub fn issue(&self, user_id: Uuid) -> Result<String, Error> {
		self.issue_at(user_id, Utc::now())
	}

	/// Returns the user the token was issued to, if the token is authentic and unexpired.
	pub fn verify(&self, token: &str) -> Result<Uuid, Error> {
		self.verify_at(token, Utc::now())
	}

	fn issue_at(&self, user_id: Uuid, now: DateTime<Utc>) -> Result<String, Error> {
		let claims = Claims {
			sub: user_id,
			iat: now.timestamp(),
			exp: (now + lifetime()).timestamp(),
		};

		jsonwebtoken::encode(&Header::new(Algorithm::HS256), &claims, &self.encoding)
			.map_err(Error::Sign)
	}

	fn verify_at(&self, token: &str, now: DateTime<Utc>) -> Result<Uuid, Error> {
		let claims = jsonwebtoken::decode::<Claims>(token, &self.decoding, &self.validation)
			.map_err(Error::Invalid)?
			.claims;

		if now.timestamp() > claims.exp {
			return Err(Error::Expired(
				DateTime::from_timestamp(claims.exp, 0).unwrap_or_default(),
			));
		}

		Ok(claims.sub)
	}
}

impl fmt::Debug for Tokens {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Tokens").finish_non_exhaustive()
	}
}

#[cfg(test)]
mod test {
	use super::*;

	fn tokens() -> Tokens {
		Tokens::new(b"an example secret of reasonable length")
	}

	#[test]
	fn test_issue_then_verify() {
		let tokens = tokens();
		let user = Uuid::new_v4();

		let token = tokens.issue(user).unwrap();

		assert_eq!(tokens.verify(&token).unwrap(), user);
	}

	#[test]
	fn test_token_lifetime() {
		let tokens = tokens();
		let user = Uuid::new_v4();
		let issued = Utc::now();

		let token = tokens.issue_at(user, issued).unwrap();

		assert_eq!(tokens.verify_at(&token, issued).unwrap(), user);
		assert_eq!(
			tokens
				.verify_at(&token, issued + Duration::days(14) + Duration::hours(23))
				.unwrap(),
			user
		);
		assert!(matches!(
			tokens.verify_at(&token, issued + lifetime() + Duration::minutes(1)),
			Err(Error::Expired(..))
		));
	}

	#[test]
	fn test_wrong_secret() {
		let token = tokens().issue(Uuid::new_v4()).unwrap();
		let other = Tokens::new(b"a different secret entirely");

		assert!(matches!(other.verify(&token), Err(Error::Invalid(..))));
	}

	#[test]
	fn test_tampered_payload() {
		let tokens = tokens();
		let token = tokens.issue(Uuid::new_v4()).unwrap();
		let forged = tokens.issue(Uuid::new_v4()).unwrap();

		// header and signature of one token, payload of another
		let mut parts = token.split('.').collect::<Vec<_>>();
		parts[1] = forged.split('.').nth(1).unwrap();

		assert!(matches!(
			tokens.verify(&parts.join(".")),
			Err(Error::Invalid(..))
		));
	}

	#[test]
	fn test_malformed() {
		let tokens = tokens();

		for token in ["", "invalid.token.here", "abc"] {
			assert!(matches!(tokens.verify(token), Err(Error::Invalid(..))));
		}
	}

	#[test]
	fn test_missing_claims() {
		#[derive(Serialize)]
		struct NoExpiry {
			sub: Uuid,
		}

		let secret = b"an example secret of reasonable length";
		let token = jsonwebtoken::encode(
			&Header::new(Algorithm::HS256),
			&NoExpiry { sub: Uuid::new_v4() },
			&EncodingKey::from_secret(secret),
		)
		.unwrap();

		assert!(matches!(tokens().verify(&token), Err(Error::Invalid(..))));
	}
}
