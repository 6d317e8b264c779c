use aide::axum::IntoApiResponse;
use axum::{extract::State, http::StatusCode};
use macros::route;

use crate::{
	extract::{Json, Path, Query, Session},
	openapi::tag,
	ownership::{self, Resource},
	route::model::Acknowledged,
	store::{NewComment, NewPost, PostChanges},
	Database,
};

use super::{model, Error, RouteError};

/// Get all posts
/// Returns a paginated response of all posts, newest first.
#[route(tag = tag::POST)]
pub async fn get_posts(
	State(database): State<Database>,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<Vec<model::Post>>, RouteError> {
	Ok(Json(database.list_posts(None, &paginate).await?))
}

/// Get post
/// Returns a single post with its comments, oldest first.
#[route(tag = tag::POST)]
pub async fn get_post(
	State(database): State<Database>,
	Path(path): Path<model::IdInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = database
		.find_post(path.id)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	Ok(Json(post))
}

/// Get user posts
/// Returns a paginated response of one user's posts, newest first.
#[route(tag = tag::POST)]
pub async fn get_user_posts(
	State(database): State<Database>,
	_session: Session,
	Path(path): Path<model::IdInput>,
	Query(paginate): Query<model::Paginate>,
) -> Result<Json<Vec<model::Post>>, RouteError> {
	if database.find_user(path.id).await?.is_none() {
		return Err(Error::UnknownUser(path.id).into());
	}

	Ok(Json(database.list_posts(Some(path.id), &paginate).await?))
}

/// Create post
/// Creates a new post owned by you.
#[route(tag = tag::POST, response(status = 201, description = "The created post.", shape = "Json<model::Post>"))]
pub async fn create_post(
	State(database): State<Database>,
	session: Session,
	Json(post): Json<model::CreatePost>,
) -> Result<impl IntoApiResponse, RouteError> {
	let post = database
		.create_post(NewPost {
			posted_by: session.user.id,
			text: post.text,
			post_img: post.post_img,
		})
		.await?;

	tracing::debug!(post = %post.id, user = %post.posted_by, "created post");

	Ok((StatusCode::CREATED, Json(post)))
}

/// Update post
/// Updates the text or image of one of your posts. Any other field is ignored.
#[route(tag = tag::POST, response(status = 200, description = "The updated post.", shape = "Json<model::Post>"))]
pub async fn update_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(update): Json<model::UpdatePost>,
) -> Result<Json<model::Post>, RouteError> {
	let post = database
		.find_post(path.id)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	ownership::assert_owner(session.user.id, post.posted_by, Resource::Post, post.id)
		.map_err(Error::Forbidden)?;

	if update.is_empty() {
		return Ok(Json(post));
	}

	let post = database
		.update_post(
			post.id,
			PostChanges {
				text: update.text,
				post_img: update.post_img,
			},
		)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	Ok(Json(post))
}

/// Delete post
/// Deletes one of your posts along with its comments.
#[route(tag = tag::POST, response(status = 200, shape = "Json<Acknowledged>"))]
pub async fn delete_post(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
) -> Result<Json<Acknowledged>, RouteError> {
	let post = database
		.find_post(path.id)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	ownership::assert_owner(session.user.id, post.posted_by, Resource::Post, post.id)
		.map_err(Error::Forbidden)?;

	if !database.delete_post(post.id).await? {
		return Err(Error::UnknownPost(path.id).into());
	}

	Ok(Json(Acknowledged::new("post deleted successfully")))
}

/// Comment on post
/// Adds a comment to the end of a post's comments, returning the updated post.
#[route(tag = tag::POST, response(status = 200, description = "The post with the new comment.", shape = "Json<model::Post>"))]
pub async fn add_comment(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::IdInput>,
	Json(comment): Json<model::CommentInput>,
) -> Result<Json<model::Post>, RouteError> {
	let post = database
		.push_comment(
			path.id,
			NewComment {
				user_id: session.user.id,
				text: comment.text,
				author_username: session.user.username,
				author_profile_img: session.user.profile_pic,
			},
		)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	Ok(Json(post))
}

/// Delete comment
/// Deletes one of your comments. Authoring the post is not enough.
#[route(tag = tag::POST, response(status = 200, shape = "Json<Acknowledged>"))]
pub async fn delete_comment(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::CommentPath>,
) -> Result<Json<Acknowledged>, RouteError> {
	let post = database
		.find_post(path.id)
		.await?
		.ok_or(Error::UnknownPost(path.id))?;

	let comment = post
		.comment(path.comment_id)
		.ok_or(Error::UnknownComment(path.comment_id))?;

	ownership::assert_owner(
		session.user.id,
		comment.user_id,
		Resource::Comment,
		comment.id,
	)
	.map_err(Error::Forbidden)?;

	if !database.remove_comment(post.id, comment.id).await? {
		return Err(Error::UnknownComment(path.comment_id).into());
	}

	Ok(Json(Acknowledged::new("comment deleted successfully")))
}
