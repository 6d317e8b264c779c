use std::sync::Arc;

use aide::axum::IntoApiResponse;
use axum::{
	extract::State,
	http::{header, StatusCode},
};
use macros::route;
use rand::{distributions::Alphanumeric, Rng};

use crate::{
	extract::{Json, Path, Query, Session},
	mail::Mailer,
	openapi::tag,
	ownership::{self, Resource},
	password,
	route::model::Acknowledged,
	session,
	store::{NewUser, UserChanges},
	token::Tokens,
	Database,
};

use super::{model, taken, Error, RouteError};

/// Length of a password reset token, in characters.
pub const RESET_TOKEN_LENGTH: usize = 32;

fn reset_token() -> String {
	rand::thread_rng()
		.sample_iter(&Alphanumeric)
		.take(RESET_TOKEN_LENGTH)
		.map(char::from)
		.collect()
}

/// Issues a session token for the user and wraps it in a `Set-Cookie` header.
fn session_header(tokens: &Tokens, user: &model::Profile) -> Result<[(header::HeaderName, String); 1], Error> {
	let token = tokens.issue(user.id)?;

	Ok([(header::SET_COOKIE, session::create_cookie(token).to_string())])
}

/// Sign up
/// Creates an account and logs in to it, returning the new profile along with a session cookie.
#[route(tag = tag::USER, response(status = 201, description = "Signed up successfully.", shape = "Json<model::Profile>"))]
pub async fn signup(
	State(database): State<Database>,
	State(tokens): State<Arc<Tokens>>,
	Json(input): Json<model::SignupInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let hashed = password::hash(input.password).await.map_err(Error::Hash)?;

	let user = database
		.create_user(NewUser {
			name: input.name,
			username: input.username,
			email: input.email,
			password: hashed,
		})
		.await
		.map_err(taken)?;

	tracing::info!(user = %user.id, "signed up");

	let profile = model::Profile::from(user);
	let cookie = session_header(&tokens, &profile)?;

	Ok((StatusCode::CREATED, (cookie, Json(profile))))
}

/// Log in
/// Logs in to an account with a username and password, returning the profile along with a session cookie.
#[route(tag = tag::USER, response(status = 200, description = "Logged in successfully.", shape = "Json<model::Profile>"))]
pub async fn login(
	State(database): State<Database>,
	State(tokens): State<Arc<Tokens>>,
	Json(input): Json<model::LoginInput>,
) -> Result<impl IntoApiResponse, RouteError> {
	let Some(user) = database.find_user_by_username(&input.username).await? else {
		return Err(Error::InvalidUsernameOrPassword.into());
	};

	if !password::verify(input.password, user.password.clone()).await {
		return Err(Error::InvalidUsernameOrPassword.into());
	}

	let profile = model::Profile::from(user);
	let cookie = session_header(&tokens, &profile)?;

	Ok((cookie, Json(profile)))
}

/// Log out
/// Clears the session cookie. The token itself stays valid until it expires.
#[route(tag = tag::USER, response(status = 200, description = "Logged out successfully.", shape = "Json<Acknowledged>"))]
pub async fn logout() -> impl IntoApiResponse {
	(
		[(header::SET_COOKIE, session::clear_cookie().to_string())],
		Json(Acknowledged::new("logged out successfully")),
	)
}

/// Forget password
/// Emails a single-use password reset link to the account with this email.
#[route(tag = tag::USER, response(status = 200, description = "Reset email sent.", shape = "Json<Acknowledged>"))]
pub async fn forget_password(
	State(database): State<Database>,
	State(mailer): State<Mailer>,
	Json(input): Json<model::ForgetPasswordInput>,
) -> Result<Json<Acknowledged>, RouteError> {
	let token = reset_token();

	let Some(user) = database.set_reset_token(&input.email, &token).await? else {
		return Err(Error::UnknownEmail.into());
	};

	mailer.send_reset(&user.name, &user.email, &token);

	Ok(Json(Acknowledged::new("reset password email sent")))
}

/// Reset password
/// Sets a new password using the token from a reset email. Each token works once.
#[route(tag = tag::USER, response(status = 200, description = "Password updated.", shape = "Json<Acknowledged>"))]
pub async fn reset_password(
	State(database): State<Database>,
	Query(query): Query<model::ResetPasswordQuery>,
	Json(input): Json<model::ResetPasswordInput>,
) -> Result<Json<Acknowledged>, RouteError> {
	let hashed = password::hash(input.password).await.map_err(Error::Hash)?;

	let Some(user) = database
		.consume_reset_token(&query.reset_token, &hashed)
		.await?
	else {
		return Err(Error::InvalidResetToken.into());
	};

	tracing::info!(user = %user.id, "reset password");

	Ok(Json(Acknowledged::new("password updated successfully")))
}

/// Get own profile
#[route(tag = tag::USER, response(status = 200, shape = "Json<model::Profile>"))]
pub async fn get_me(session: Session) -> Json<model::Profile> {
	Json(session.user)
}

/// Get profile
/// Returns the public profile of the user with this username.
#[route(tag = tag::USER, response(status = 200, shape = "Json<model::Profile>"))]
pub async fn get_profile(
	State(database): State<Database>,
	Path(path): Path<model::UsernamePath>,
) -> Result<Json<model::Profile>, RouteError> {
	let user = database
		.find_user_by_username(&path.user)
		.await?
		.ok_or(Error::UnknownUser)?;

	Ok(Json(user.into()))
}

/// Update profile
/// Updates your own profile. A new password is hashed before it is stored.
#[route(tag = tag::USER, response(status = 200, description = "The updated profile.", shape = "Json<model::Profile>"))]
pub async fn update_profile(
	State(database): State<Database>,
	session: Session,
	Path(path): Path<model::UserIdPath>,
	Json(input): Json<model::UpdateProfileInput>,
) -> Result<Json<model::Profile>, RouteError> {
	let user = database
		.find_user(path.user)
		.await?
		.ok_or(Error::UnknownUser)?;

	ownership::assert_owner(session.user.id, user.id, Resource::Profile, user.id)
		.map_err(Error::Forbidden)?;

	let password = match input.password {
		Some(password) => Some(password::hash(password).await.map_err(Error::Hash)?),
		None => None,
	};

	let user = database
		.update_user(
			user.id,
			UserChanges {
				name: input.name,
				username: input.username,
				email: input.email,
				password,
				profile_pic: input.profile_pic,
				bio: input.bio,
			},
		)
		.await
		.map_err(taken)?
		.ok_or(Error::UnknownUser)?;

	Ok(Json(user.into()))
}
