pub use std::sync::Arc;

pub use axum::http::StatusCode;
pub use axum_test::TestServer;
pub use cookie::Cookie;
pub use serde_json::{json, Value};

pub use crate::{
	route::model::Paginate,
	session::COOKIE_NAME,
	store::{MemoryStore, Store},
};
use crate::{mail::Mailer, token::Tokens, State};

pub const PASSWORD: &str = "hunter2hunter";

const SECRET: &[u8] = b"a secret used only by the test suite";

/// A token issuer sharing the secret of the server built by [`app`].
pub fn tokens() -> Tokens {
	Tokens::new(SECRET)
}

/// Builds the full router on top of a fresh in-memory store, without rate limiting.
pub fn app() -> (TestServer, Arc<MemoryStore>) {
	let store = Arc::new(MemoryStore::new());
	let state = State {
		database: store.clone(),
		tokens: Arc::new(tokens()),
		mailer: Mailer::disabled("http://localhost:3000"),
	};

	let server = TestServer::new(crate::app(state, false)).unwrap();

	(server, store)
}

/// Signs up a user named after their username, returning the profile and session cookie.
pub async fn signup(server: &TestServer, username: &str) -> (Value, Cookie<'static>) {
	let response = server
		.post("/api/users/signup")
		.json(&json!({
			"name": username,
			"username": username,
			"email": format!("{username}@example.com"),
			"password": PASSWORD,
		}))
		.await;

	assert_eq!(response.status_code(), StatusCode::CREATED);

	(response.json::<Value>(), response.cookie(COOKIE_NAME))
}
