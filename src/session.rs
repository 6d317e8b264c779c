use cookie::{time::Duration, SameSite};

use crate::token;

pub const COOKIE_NAME: &str = "jwt";

/// Creates a session cookie holding the token, expiring along with it.
pub fn create_cookie(token: String) -> cookie::Cookie<'static> {
	cookie::Cookie::build((COOKIE_NAME, token))
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(SameSite::Strict)
		.path("/")
		.max_age(Duration::days(token::LIFETIME_DAYS))
		.into()
}

/// Creates an empty session cookie used to invalidate a previous one
pub fn clear_cookie() -> cookie::Cookie<'static> {
	cookie::Cookie::build(COOKIE_NAME)
		.secure(!cfg!(debug_assertions))
		.http_only(true)
		.same_site(SameSite::Strict)
		.path("/")
		.max_age(Duration::ZERO)
		.into()
}
