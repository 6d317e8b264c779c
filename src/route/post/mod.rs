use aide::axum::{
	routing::{delete_with, get_with, patch_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use uuid::Uuid;

use crate::{error, ownership, AppState};

pub mod model;
pub mod route;

#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("post not found")]
	UnknownPost(Uuid),
	#[error("comment not found")]
	UnknownComment(Uuid),
	#[error("user not found")]
	UnknownUser(Uuid),
	#[error(transparent)]
	Forbidden(#[from] ownership::Forbidden),
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

pub fn routes() -> ApiRouter<AppState> {
	use route::*;

	ApiRouter::new()
		.api_route("/", get_with(get_posts, get_posts_docs))
		.api_route("/create", post_with(create_post, create_post_docs))
		.api_route("/user/:id", get_with(get_user_posts, get_user_posts_docs))
		.api_route("/update/:id", patch_with(update_post, update_post_docs))
		.api_route("/comment/:id", post_with(add_comment, add_comment_docs))
		.api_route(
			"/:id",
			get_with(get_post, get_post_docs).delete_with(delete_post, delete_post_docs),
		)
		.api_route(
			"/:id/comment/:comment_id",
			delete_with(delete_comment, delete_comment_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::UnknownPost(..) | Self::UnknownComment(..) | Self::UnknownUser(..) => {
				StatusCode::NOT_FOUND
			}
			Self::Forbidden(..) => StatusCode::FORBIDDEN,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		let message = error::Message::new(self.to_string());

		match self {
			Self::UnknownPost(id) => message.detail("post", id.to_string()),
			Self::UnknownComment(id) => message.detail("comment", id.to_string()),
			Self::UnknownUser(id) => message.detail("user", id.to_string()),
			Self::Forbidden(forbidden) => message.detail(
				&forbidden.resource.to_string(),
				forbidden.id.to_string(),
			),
		}
		.into_vec()
	}
}
