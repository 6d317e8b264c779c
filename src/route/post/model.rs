pub use crate::model::{CreatePost, Post, UpdatePost};
pub use crate::route::model::{IdInput, Paginate};

use schemars::JsonSchema;
use serde::Deserialize;
use uuid::Uuid;
use validator::Validate;

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CommentInput {
	/// The body of the comment.
	#[validate(length(min = 1, max = 300))]
	pub text: String,
}

#[derive(Deserialize, Validate, JsonSchema)]
pub struct CommentPath {
	/// The post the comment belongs to.
	pub id: Uuid,
	pub comment_id: Uuid,
}
