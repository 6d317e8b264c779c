use std::sync::Arc;

use aide::OperationInput;
use axum::{
	extract::{FromRef, FromRequestParts},
	http::{header, request},
};

use crate::{
	error::RouteError,
	openapi::SECURITY_SCHEME_SESSION,
	route::user::{self, model::Profile},
	session,
	token::Tokens,
	Database,
};

/// Extracts the authenticated user from the session cookie.
///
/// If there is no session cookie, a [`user::Error::NoSessionCookie`] is returned.
/// If the token is forged, expired or names a user that no longer exists,
/// a [`user::Error::InvalidSessionCookie`] is returned.
///
/// ```rust,ignore
/// async fn route(session: Session) {
///   println!("{:?}", session.user);
/// }
/// ```
#[derive(Debug)]
pub struct Session {
	pub user: Profile,
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Session
where
	Database: FromRef<S>,
	Arc<Tokens>: FromRef<S>,
	S: Sync + Send,
{
	type Rejection = RouteError<user::Error>;

	async fn from_request_parts(
		parts: &mut request::Parts,
		state: &S,
	) -> Result<Self, Self::Rejection> {
		let cookies = parts
			.headers
			.get_all(header::COOKIE)
			.into_iter()
			.filter_map(|value| value.to_str().ok());

		let cookie = cookies
			.flat_map(cookie::Cookie::split_parse)
			.filter_map(Result::ok)
			.find(|cookie| cookie.name() == session::COOKIE_NAME)
			.ok_or(user::Error::NoSessionCookie)?;

		let tokens = Arc::<Tokens>::from_ref(state);
		let user_id = tokens.verify(cookie.value()).map_err(|error| {
			tracing::debug!(%error, "rejected session token");
			user::Error::InvalidSessionCookie
		})?;

		let database = Database::from_ref(state);
		let user = database
			.find_user(user_id)
			.await?
			.ok_or(user::Error::InvalidSessionCookie)?;

		Ok(Self { user: user.into() })
	}
}

impl OperationInput for Session {
	/// Adds a session cookie requirement to the `OpenAPI` operation.
	fn operation_input(_ctx: &mut aide::gen::GenContext, operation: &mut aide::openapi::Operation) {
		operation.security.push(
			[(SECURITY_SCHEME_SESSION.to_string(), Vec::new())]
				.into_iter()
				.collect(),
		);
	}
}
