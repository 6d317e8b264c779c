use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::model::User;

fn validate_username(username: &str) -> Result<(), ValidationError> {
	if username
		.chars()
		.any(|c| !(c.is_alphanumeric() || c == '_' || c == '.'))
	{
		return Err(ValidationError::new(
			"username may only contain letters, digits, underscores and dots",
		));
	}

	Ok(())
}

/// The public view of a user. Never carries the password hash or reset token.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
	pub id: Uuid,
	/// The display name.
	pub name: String,
	/// The unique name used to log in and find the user.
	pub username: String,
	pub email: String,
	/// URL of the profile picture, empty when unset.
	pub profile_pic: String,
	pub bio: String,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

impl From<User> for Profile {
	fn from(user: User) -> Self {
		Self {
			id: user.id,
			name: user.name,
			username: user.username,
			email: user.email,
			profile_pic: user.profile_pic,
			bio: user.bio,
			created_at: user.created_at,
			updated_at: user.updated_at,
		}
	}
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct SignupInput {
	/// The display name.
	#[validate(length(min = 1, max = 64))]
	pub name: String,
	/// The username that is displayed to the public. Case-sensitive.
	#[validate(length(min = 1, max = 32), custom(function = "validate_username"))]
	pub username: String,
	#[validate(email)]
	pub email: String,
	#[validate(length(min = 6, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct LoginInput {
	#[validate(length(min = 1, max = 32))]
	pub username: String,
	#[validate(length(min = 1, max = 128))]
	pub password: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct ForgetPasswordInput {
	#[validate(email)]
	pub email: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordQuery {
	/// The token from the password reset email.
	#[validate(length(min = 1))]
	pub reset_token: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct ResetPasswordInput {
	/// The new password.
	#[validate(length(min = 6, max = 128))]
	pub password: String,
}

/// Fields of a profile that its owner may change. Omitted fields are left as-is.
#[derive(Debug, Default, Deserialize, Validate, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct UpdateProfileInput {
	#[validate(length(min = 1, max = 64))]
	pub name: Option<String>,
	#[validate(length(min = 1, max = 32), custom(function = "validate_username"))]
	pub username: Option<String>,
	#[validate(email)]
	pub email: Option<String>,
	/// A new password, hashed before it is stored.
	#[validate(length(min = 6, max = 128))]
	pub password: Option<String>,
	#[validate(length(max = 2048))]
	pub profile_pic: Option<String>,
	#[validate(length(max = 500))]
	pub bio: Option<String>,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UsernamePath {
	/// The username of the profile.
	pub user: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct UserIdPath {
	/// The id of the profile.
	pub user: Uuid,
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_username_characters() {
		assert!(validate_username("alice_01.b").is_ok());
		assert!(validate_username("alice smith").is_err());
		assert!(validate_username("bob!").is_err());
	}

	#[test]
	fn test_profile_hides_secrets() {
		let now = Utc::now();
		let profile = Profile::from(User {
			id: Uuid::new_v4(),
			name: "Alice".into(),
			username: "alice".into(),
			email: "alice@example.com".into(),
			password: "$2b$10$hash".into(),
			profile_pic: String::new(),
			bio: String::new(),
			reset_token: Some("token".into()),
			created_at: now,
			updated_at: now,
		});

		let json = serde_json::to_value(&profile).unwrap();

		assert_eq!(json["username"], "alice");
		assert_eq!(json["profilePic"], "");
		assert!(json.get("password").is_none());
		assert!(json.get("resetToken").is_none());
	}
}
