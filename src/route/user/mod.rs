use std::sync::Arc;

use aide::axum::{
	routing::{get_with, post_with},
	ApiRouter,
};
use axum::http::StatusCode;
use tower_governor::GovernorLayer;

use crate::{error, ownership, password, ratelimit, store, token, AppState};

pub mod model;
pub mod route;

/// An error that can occur in account and profile routes.
///
/// Note that the messages are presented to the client, so they should not contain
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum Error {
	#[error("no session cookie")]
	NoSessionCookie,
	#[error("invalid session cookie")]
	InvalidSessionCookie,
	#[error("invalid username or password")]
	InvalidUsernameOrPassword,
	#[error("username already taken")]
	UsernameTaken,
	#[error("email already taken")]
	EmailTaken,
	#[error("user not found")]
	UnknownUser,
	#[error("no user with this email")]
	UnknownEmail,
	#[error("invalid or expired reset token")]
	InvalidResetToken,
	#[error(transparent)]
	Forbidden(#[from] ownership::Forbidden),
	#[error("password hashing failed: {0}")]
	Hash(#[from] password::Error),
	#[error("session token error: {0}")]
	Token(#[from] token::Error),
}

pub type RouteError = error::RouteError<Error>;

impl From<Error> for RouteError {
	fn from(error: Error) -> Self {
		Self::Route(error)
	}
}

/// Maps a uniqueness violation to its client-facing error, leaving
/// other store failures as internal errors.
fn taken(error: store::Error) -> RouteError {
	match error {
		store::Error::Conflict(store::Unique::Username) => Error::UsernameTaken.into(),
		store::Error::Conflict(store::Unique::Email) => Error::EmailTaken.into(),
		error => error.into(),
	}
}

pub fn routes(limit: Option<Arc<ratelimit::Config>>) -> ApiRouter<AppState> {
	use route::*;

	let credentials = ApiRouter::new()
		.api_route("/signup", post_with(signup, signup_docs))
		.api_route("/login", post_with(login, login_docs))
		.api_route(
			"/forget-password",
			post_with(forget_password, forget_password_docs),
		)
		.api_route(
			"/reset-password",
			post_with(reset_password, reset_password_docs),
		);

	let credentials = match limit {
		Some(config) => credentials.layer(GovernorLayer { config }),
		None => credentials,
	};

	ApiRouter::new()
		.merge(credentials)
		.api_route("/logout", post_with(logout, logout_docs))
		.api_route("/me", get_with(get_me, get_me_docs))
		.api_route(
			"/profile/:user",
			get_with(get_profile, get_profile_docs).patch_with(update_profile, update_profile_docs),
		)
}

impl error::ErrorShape for Error {
	fn status(&self) -> StatusCode {
		match self {
			Self::NoSessionCookie | Self::InvalidSessionCookie => StatusCode::UNAUTHORIZED,
			Self::InvalidUsernameOrPassword
			| Self::UsernameTaken
			| Self::EmailTaken
			| Self::UnknownEmail
			| Self::InvalidResetToken => StatusCode::BAD_REQUEST,
			Self::UnknownUser => StatusCode::NOT_FOUND,
			Self::Forbidden(..) => StatusCode::FORBIDDEN,
			Self::Hash(..) | Self::Token(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<error::Message<'_>> {
		match self {
			Self::UsernameTaken => error::Message::new(self.to_string())
				.field("username")
				.into_vec(),
			Self::EmailTaken => error::Message::new(self.to_string())
				.field("email")
				.into_vec(),
			Self::Forbidden(forbidden) => error::Message::new(self.to_string())
				.detail("id", forbidden.id.to_string())
				.into_vec(),
			_ => error::Message::new(self.to_string()).into_vec(),
		}
	}
}

#[cfg(test)]
mod test {
	use crate::test::*;

	#[tokio::test]
	async fn test_signup_flow() {
		let (server, _) = app();

		let response = server
			.post("/api/users/signup")
			.json(&json!({
				"name": "Alice",
				"username": "alice",
				"email": "alice@example.com",
				"password": "hunter2hunter",
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::CREATED);

		let cookie = response.cookie(COOKIE_NAME);
		assert!(!cookie.value().is_empty());
		assert_eq!(cookie.http_only(), Some(true));

		let body = response.json::<Value>();
		assert_eq!(body["username"], "alice");
		assert!(body.get("password").is_none());

		let response = server.get("/api/users/me").add_cookie(cookie).await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.json::<Value>()["email"], "alice@example.com");
	}

	#[tokio::test]
	async fn test_signup_stores_hash() {
		let (server, store) = app();
		signup(&server, "alice").await;

		let user = store.find_user_by_username("alice").await.unwrap().unwrap();

		assert_ne!(user.password, PASSWORD);
		assert!(user.password.starts_with("$2b$10$"));
	}

	#[tokio::test]
	async fn test_duplicate_signup() {
		let (server, _) = app();
		signup(&server, "alice").await;

		let response = server
			.post("/api/users/signup")
			.json(&json!({
				"name": "Another Alice",
				"username": "alice",
				"email": "other@example.com",
				"password": PASSWORD,
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(response.json::<Value>()["errors"][0]["field"], "username");

		let response = server
			.post("/api/users/signup")
			.json(&json!({
				"name": "Another Alice",
				"username": "alice2",
				"email": "alice@example.com",
				"password": PASSWORD,
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(response.json::<Value>()["errors"][0]["field"], "email");
	}

	#[tokio::test]
	async fn test_signup_validation() {
		let (server, _) = app();

		let response = server
			.post("/api/users/signup")
			.json(&json!({
				"name": "Alice",
				"username": "alice",
				"email": "not an email",
				"password": PASSWORD,
			}))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(response.json::<Value>()["success"], false);
	}

	#[tokio::test]
	async fn test_signup_missing_fields() {
		let (server, store) = app();

		let response = server
			.post("/api/users/signup")
			.json(&json!({ "username": "alice", "password": PASSWORD }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(response.json::<Value>()["success"], false);
		assert!(store.find_user_by_username("alice").await.unwrap().is_none());
	}

	#[tokio::test]
	async fn test_login() {
		let (server, _) = app();
		signup(&server, "alice").await;

		let response = server
			.post("/api/users/login")
			.json(&json!({ "username": "alice", "password": PASSWORD }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.json::<Value>()["username"], "alice");

		let cookie = response.cookie(COOKIE_NAME);
		let response = server.get("/api/users/me").add_cookie(cookie).await;

		assert_eq!(response.status_code(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_login_rejects_bad_credentials() {
		let (server, _) = app();
		signup(&server, "alice").await;

		let wrong_password = server
			.post("/api/users/login")
			.json(&json!({ "username": "alice", "password": "wrong password" }))
			.await;
		let unknown_user = server
			.post("/api/users/login")
			.json(&json!({ "username": "nobody", "password": PASSWORD }))
			.await;
		let wrong_case = server
			.post("/api/users/login")
			.json(&json!({ "username": "Alice", "password": PASSWORD }))
			.await;

		for response in [wrong_password, unknown_user, wrong_case] {
			assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
			assert_eq!(
				response.json::<Value>()["errors"][0]["content"],
				"invalid username or password"
			);
		}
	}

	#[tokio::test]
	async fn test_logout_clears_cookie() {
		let (server, _) = app();

		let response = server.post("/api/users/logout").await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let cookie = response.cookie(COOKIE_NAME);
		assert_eq!(cookie.value(), "");
		assert_eq!(cookie.max_age(), Some(cookie::time::Duration::ZERO));
	}

	#[tokio::test]
	async fn test_me_requires_session() {
		let (server, _) = app();

		let response = server.get("/api/users/me").await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			response.json::<Value>()["errors"][0]["content"],
			"no session cookie"
		);

		let response = server
			.get("/api/users/me")
			.add_cookie(Cookie::new(COOKIE_NAME, "not.a.token"))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
		assert_eq!(
			response.json::<Value>()["errors"][0]["content"],
			"invalid session cookie"
		);
	}

	#[tokio::test]
	async fn test_token_for_missing_user() {
		let (server, _) = app();
		let token = tokens().issue(uuid::Uuid::new_v4()).unwrap();

		let response = server
			.get("/api/users/me")
			.add_cookie(Cookie::new(COOKIE_NAME, token))
			.await;

		assert_eq!(response.status_code(), StatusCode::UNAUTHORIZED);
	}

	#[tokio::test]
	async fn test_password_reset() {
		let (server, store) = app();
		signup(&server, "alice").await;

		let response = server
			.post("/api/users/forget-password")
			.json(&json!({ "email": "alice@example.com" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let token = store
			.find_user_by_username("alice")
			.await
			.unwrap()
			.unwrap()
			.reset_token
			.unwrap();

		assert_eq!(token.len(), 32);
		assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

		let response = server
			.post("/api/users/reset-password")
			.add_query_param("resetToken", &token)
			.json(&json!({ "password": "a new password" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let response = server
			.post("/api/users/login")
			.json(&json!({ "username": "alice", "password": "a new password" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		// the token is single-use
		let response = server
			.post("/api/users/reset-password")
			.add_query_param("resetToken", &token)
			.json(&json!({ "password": "yet another password" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn test_wrong_reset_token_keeps_password() {
		let (server, store) = app();
		signup(&server, "alice").await;

		server
			.post("/api/users/forget-password")
			.json(&json!({ "email": "alice@example.com" }))
			.await;

		let before = store.find_user_by_username("alice").await.unwrap().unwrap();

		let response = server
			.post("/api/users/reset-password")
			.add_query_param("resetToken", "not-the-token")
			.json(&json!({ "password": "a new password" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
		assert_eq!(
			response.json::<Value>()["errors"][0]["content"],
			"invalid or expired reset token"
		);

		let after = store.find_user_by_username("alice").await.unwrap().unwrap();

		assert_eq!(after.password, before.password);
		assert_eq!(after.reset_token, before.reset_token);

		let response = server
			.post("/api/users/login")
			.json(&json!({ "username": "alice", "password": PASSWORD }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_forget_password_unknown_email() {
		let (server, _) = app();

		let response = server
			.post("/api/users/forget-password")
			.json(&json!({ "email": "nobody@example.com" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
	}

	#[tokio::test]
	async fn test_get_profile() {
		let (server, _) = app();
		signup(&server, "alice").await;

		let response = server.get("/api/users/profile/alice").await;

		assert_eq!(response.status_code(), StatusCode::OK);
		assert_eq!(response.json::<Value>()["name"], "alice");

		let response = server.get("/api/users/profile/nobody").await;

		assert_eq!(response.status_code(), StatusCode::NOT_FOUND);
	}

	#[tokio::test]
	async fn test_update_own_profile() {
		let (server, _) = app();
		let (alice, cookie) = signup(&server, "alice").await;

		let response = server
			.patch(&format!("/api/users/profile/{}", alice["id"].as_str().unwrap()))
			.add_cookie(cookie)
			.json(&json!({ "bio": "hello", "password": "a new password" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);

		let body = response.json::<Value>();
		assert_eq!(body["bio"], "hello");
		assert!(body.get("password").is_none());

		let response = server
			.post("/api/users/login")
			.json(&json!({ "username": "alice", "password": "a new password" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::OK);
	}

	#[tokio::test]
	async fn test_update_other_profile_is_forbidden() {
		let (server, _) = app();
		let (alice, _) = signup(&server, "alice").await;
		let (_, bob) = signup(&server, "bob").await;

		let response = server
			.patch(&format!("/api/users/profile/{}", alice["id"].as_str().unwrap()))
			.add_cookie(bob)
			.json(&json!({ "bio": "pwned" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::FORBIDDEN);

		let response = server.get("/api/users/profile/alice").await;

		assert_eq!(response.json::<Value>()["bio"], "");
	}

	#[tokio::test]
	async fn test_update_profile_username_conflict() {
		let (server, _) = app();
		let (alice, cookie) = signup(&server, "alice").await;
		signup(&server, "bob").await;

		let response = server
			.patch(&format!("/api/users/profile/{}", alice["id"].as_str().unwrap()))
			.add_cookie(cookie)
			.json(&json!({ "username": "bob" }))
			.await;

		assert_eq!(response.status_code(), StatusCode::BAD_REQUEST);
	}
}
