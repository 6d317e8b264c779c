#![warn(clippy::pedantic)]

mod config;
mod error;
mod extract;
mod mail;
mod model;
mod openapi;
mod ownership;
mod password;
mod ratelimit;
mod route;
mod session;
mod store;
mod token;
mod trace;

#[cfg(test)]
mod test;

use std::{net::SocketAddr, sync::Arc};

use aide::{axum::ApiRouter, openapi::OpenApi};
use axum::{extract::Request, http::HeaderName, Extension, Router, ServiceExt};
use tower::{Layer, ServiceBuilder};
use tower_governor::GovernorLayer;
use tower_http::{
	compression::CompressionLayer,
	normalize_path::NormalizePathLayer,
	request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
	trace::TraceLayer,
};

use crate::{
	config::Config,
	mail::Mailer,
	store::{MemoryStore, PgStore, Store},
	token::Tokens,
};

pub type Database = Arc<dyn Store>;
pub type AppState = State;

const REQUEST_ID_HEADER: HeaderName = HeaderName::from_static("x-request-id");

/// The shared application state.
///
/// Everything in here is built once at startup and never mutated,
/// so handlers can take any part of it by value.
#[derive(Clone, axum::extract::FromRef)]
pub struct State {
	pub database: Database,
	pub tokens: Arc<Tokens>,
	pub mailer: Mailer,
}

/// Builds the router with every route, the API documentation and the HTTP middleware.
///
/// Rate limiting keys on the peer address, so it needs a server started with
/// connect info.
pub fn app(state: AppState, rate_limit: bool) -> Router {
	let (general, secure) = if rate_limit {
		let general = ratelimit::limit(ratelimit::GENERAL);
		let secure = ratelimit::limit(ratelimit::CREDENTIALS);

		ratelimit::cleanup_old_limits(&[&general, &secure]);

		(Some(general), Some(secure))
	} else {
		(None, None)
	};

	let mut api = OpenApi::default();

	let router = ApiRouter::new()
		.nest("/api/users", route::user::routes(secure))
		.nest("/api/posts", route::post::routes())
		.nest("/docs", route::docs::routes())
		.finish_api_with(&mut api, openapi::docs)
		.layer(Extension(Arc::new(api)))
		.layer(
			ServiceBuilder::new()
				.layer(SetRequestIdLayer::new(REQUEST_ID_HEADER, MakeRequestUuid))
				.layer(
					TraceLayer::new_for_http().make_span_with(|request: &Request| {
						let request_id = request
							.headers()
							.get(REQUEST_ID_HEADER)
							.and_then(|value| value.to_str().ok())
							.unwrap_or_default();

						tracing::info_span!(
							"request",
							method = %request.method(),
							uri = %request.uri(),
							request_id,
						)
					}),
				)
				.layer(PropagateRequestIdLayer::new(REQUEST_ID_HEADER))
				.layer(CompressionLayer::new()),
		)
		.with_state(state);

	match general {
		Some(config) => router.layer(GovernorLayer { config }),
		None => router,
	}
}

async fn shutdown_signal() {
	if let Err(error) = tokio::signal::ctrl_c().await {
		tracing::error!(%error, "failed to listen for shutdown signal");
	}

	tracing::info!("shutting down");
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
	dotenvy::dotenv().ok();

	let config = Config::from_env()?;
	let _guard = trace::init_tracing_subscriber(config.otlp)?;

	tracing::debug!(?config, "loaded configuration");

	let database: Database = if let Some(url) = &config.database_url {
		Arc::new(PgStore::connect(url).await?)
	} else {
		tracing::warn!("DATABASE_URL is not set, data will be kept in memory");
		Arc::new(MemoryStore::new())
	};

	let state = State {
		database,
		tokens: Arc::new(Tokens::new(config.jwt_secret.as_bytes())),
		mailer: Mailer::new(&config)?,
	};

	let app = NormalizePathLayer::trim_trailing_slash().layer(app(state, config.rate_limit));
	let listener = tokio::net::TcpListener::bind((config.host, config.port)).await?;

	tracing::info!(address = %listener.local_addr()?, "listening");

	axum::serve(
		listener,
		ServiceExt::<Request>::into_make_service_with_connect_info::<SocketAddr>(app),
	)
	.with_graceful_shutdown(shutdown_signal())
	.await?;

	Ok(())
}
