//! Persistence for users and posts.
//!
//! Handlers talk to a [`Store`] trait object so the same routes run against
//! PostgreSQL in production and an in-memory map in tests.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use std::fmt;

use uuid::Uuid;

use crate::{
	model::{Comment, Post, User},
	route::model::Paginate,
};

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("{0} already taken")]
	Conflict(Unique),
	#[error("database error: {0}")]
	Database(#[from] sqlx::Error),
	#[error("migration error: {0}")]
	Migrate(#[from] sqlx::migrate::MigrateError),
}

/// A user attribute that must be unique across all users.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Unique {
	Username,
	Email,
}

impl fmt::Display for Unique {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(match self {
			Self::Username => "username",
			Self::Email => "email",
		})
	}
}

#[derive(Debug, Clone)]
pub struct NewUser {
	pub name: String,
	pub username: String,
	pub email: String,
	pub password: String,
}

/// Changes to a user record. `None` leaves the field untouched.
#[derive(Debug, Clone, Default)]
pub struct UserChanges {
	pub name: Option<String>,
	pub username: Option<String>,
	pub email: Option<String>,
	pub password: Option<String>,
	pub profile_pic: Option<String>,
	pub bio: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewPost {
	pub posted_by: Uuid,
	pub text: String,
	pub post_img: String,
}

/// Changes to a post. Only the body and image are ever mutable.
#[derive(Debug, Clone, Default)]
pub struct PostChanges {
	pub text: Option<String>,
	pub post_img: Option<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
	pub user_id: Uuid,
	pub text: String,
	pub author_username: String,
	pub author_profile_img: String,
}

/// Every operation is a single atomic step from the caller's point of view.
/// Lookups return `Ok(None)` for missing records; only infrastructure failures are errors.
#[axum::async_trait]
pub trait Store: Send + Sync {
	async fn find_user(&self, id: Uuid) -> Result<Option<User>, Error>;
	async fn find_user_by_username(&self, username: &str) -> Result<Option<User>, Error>;

	/// Creates a user, failing with [`Error::Conflict`] if the username or email is taken.
	async fn create_user(&self, user: NewUser) -> Result<User, Error>;
	/// Applies the changes and bumps `updated_at`, returning `None` if the user is gone.
	async fn update_user(&self, id: Uuid, changes: UserChanges) -> Result<Option<User>, Error>;

	/// Stores a fresh reset token for the user with this email, replacing any previous one.
	async fn set_reset_token(&self, email: &str, token: &str) -> Result<Option<User>, Error>;
	/// Sets a new password hash on the user holding `token` and clears the token,
	/// so that a token can be consumed at most once.
	async fn consume_reset_token(&self, token: &str, password: &str)
		-> Result<Option<User>, Error>;

	async fn create_post(&self, post: NewPost) -> Result<Post, Error>;
	async fn find_post(&self, id: Uuid) -> Result<Option<Post>, Error>;
	/// Lists posts newest first, optionally only those of one user.
	async fn list_posts(
		&self,
		posted_by: Option<Uuid>,
		paginate: &Paginate,
	) -> Result<Vec<Post>, Error>;
	async fn update_post(&self, id: Uuid, changes: PostChanges) -> Result<Option<Post>, Error>;
	/// Returns whether a post was deleted.
	async fn delete_post(&self, id: Uuid) -> Result<bool, Error>;

	/// Appends a comment to the end of the post's comments, returning the updated post.
	async fn push_comment(&self, post_id: Uuid, comment: NewComment)
		-> Result<Option<Post>, Error>;
	/// Removes exactly one comment, returning whether it existed on that post.
	async fn remove_comment(&self, post_id: Uuid, comment_id: Uuid) -> Result<bool, Error>;
}

impl Comment {
	fn from_new(comment: NewComment) -> Self {
		Self {
			id: Uuid::new_v4(),
			user_id: comment.user_id,
			text: comment.text,
			author_username: comment.author_username,
			author_profile_img: comment.author_profile_img,
			created_at: chrono::Utc::now(),
		}
	}
}
