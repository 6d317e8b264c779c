use chrono::{DateTime, Utc};
use macros::model;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

/// A stored user record.
///
/// Use this when reading from the store. The `password` hash and the
/// `reset_token` are never serialized, but handlers should still return
/// [`crate::route::user::model::Profile`] rather than this type.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
	pub id: Uuid,
	/// Display name.
	pub name: String,
	pub username: String,
	pub email: String,
	/// bcrypt hash, salt and cost embedded.
	#[serde(skip)]
	pub password: String,
	pub profile_pic: String,
	pub bio: String,
	/// One-shot password reset token, cleared once consumed.
	#[serde(skip)]
	pub reset_token: Option<String>,
	pub created_at: DateTime<Utc>,
	pub updated_at: DateTime<Utc>,
}

/// A single post, created by a user.
#[model]
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, Validate, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Post {
	/// The unique identifier of the post.
	#[serde(skip_deserializing)]
	pub id: Uuid,
	/// The user that created the post. Never changes.
	#[serde(skip_deserializing)]
	pub posted_by: Uuid,
	/// Public details of the user that created the post, filled in when reading posts.
	#[serde(skip_deserializing, skip_serializing_if = "Option::is_none")]
	#[sqlx(skip)]
	pub author: Option<Author>,
	/// The body of the post.
	#[validate(length(min = 1, max = 500))]
	pub text: String,
	/// An optional image URL, empty when the post has no image.
	#[serde(default)]
	#[validate(length(max = 2048))]
	pub post_img: String,
	/// Comments on the post, oldest first.
	#[serde(skip_deserializing)]
	#[sqlx(skip)]
	pub comments: Vec<Comment>,
	/// The creation time of the post.
	#[serde(skip_deserializing)]
	pub created_at: DateTime<Utc>,
	/// The time of the last change to the post or its comments.
	#[serde(skip_deserializing)]
	pub updated_at: DateTime<Utc>,
}

impl Post {
	pub fn comment(&self, id: Uuid) -> Option<&Comment> {
		self.comments.iter().find(|comment| comment.id == id)
	}
}

/// The public view of a post's author.
#[derive(Debug, Clone, Serialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct Author {
	pub id: Uuid,
	pub username: String,
	pub profile_pic: String,
}

impl From<&User> for Author {
	fn from(user: &User) -> Self {
		Self {
			id: user.id,
			username: user.username.clone(),
			profile_pic: user.profile_pic.clone(),
		}
	}
}

/// A comment embedded in a [`Post`].
#[derive(Debug, Clone, Deserialize, Serialize, JsonSchema, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
	pub id: Uuid,
	/// The author of the comment.
	pub user_id: Uuid,
	pub text: String,
	/// The author's username when the comment was written.
	pub author_username: String,
	/// The author's profile image when the comment was written.
	pub author_profile_img: String,
	pub created_at: DateTime<Utc>,
}
