use std::{sync::Arc, time::Duration};

use axum::{
	body::Body,
	response::{IntoResponse, Response},
};
use governor::{
	clock::QuantaInstant,
	middleware::{RateLimitingMiddleware, StateInformationMiddleware},
};
use tower_governor::{
	governor::{GovernorConfig, GovernorConfigBuilder},
	key_extractor::{KeyExtractor, PeerIpKeyExtractor},
	GovernorError,
};

use crate::error::AppError;

pub type Config = GovernorConfig<PeerIpKeyExtractor, StateInformationMiddleware>;

/// How often a single peer address may call a group of routes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quota {
	/// Milliseconds between each replenished request.
	pub period_ms: u64,
	/// Requests allowed back to back before the period applies.
	pub burst: u32,
}

/// Applied to every route.
pub const GENERAL: Quota = Quota {
	period_ms: 100,
	burst: 50,
};

/// Applied on top of [`GENERAL`] to routes that check credentials or send mail.
pub const CREDENTIALS: Quota = Quota {
	period_ms: 1000,
	burst: 5,
};

/// Builds a limiter keyed by peer address, answering with the usual error body once exhausted.
pub fn limit(quota: Quota) -> Arc<Config> {
	Arc::new(
		GovernorConfigBuilder::default()
			.per_millisecond(quota.period_ms)
			.burst_size(quota.burst)
			.use_headers()
			.error_handler(error_handler)
			.finish()
			.expect("rate limit quota is non-zero"),
	)
}

fn error_handler(error: GovernorError) -> Response<Body> {
	AppError::from(error).into_response()
}

/// Periodically forgets peers that have not been seen recently.
pub fn cleanup_old_limits<T, M>(configs: &[&Arc<GovernorConfig<T, M>>])
where
	T: KeyExtractor,
	<T as KeyExtractor>::Key: Send + Sync + 'static,
	M: RateLimitingMiddleware<QuantaInstant> + Send + Sync + 'static,
{
	let limiters = configs
		.iter()
		.map(|config| config.limiter().clone())
		.collect::<Vec<_>>();
	let interval = Duration::from_secs(60);

	std::thread::spawn(move || loop {
		std::thread::sleep(interval);

		for limiter in &limiters {
			tracing::debug!(size = limiter.len(), "pruning rate limit storage");

			limiter.retain_recent();
		}
	});
}

#[cfg(test)]
mod test {
	use axum::http::StatusCode;

	use super::*;

	#[test]
	fn test_rejection_is_too_many_requests() {
		let response = error_handler(GovernorError::TooManyRequests {
			wait_time: 1,
			headers: None,
		});

		assert_eq!(response.status(), StatusCode::TOO_MANY_REQUESTS);
	}

	#[test]
	fn test_credentials_quota_allows_burst() {
		let config = limit(CREDENTIALS);
		let peer = std::net::IpAddr::from([127, 0, 0, 1]);

		for _ in 0..CREDENTIALS.burst {
			assert!(config.limiter().check_key(&peer).is_ok());
		}

		assert!(config.limiter().check_key(&peer).is_err());
	}
}
