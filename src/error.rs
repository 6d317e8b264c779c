use std::{borrow::Cow, fmt};

use aide::OperationOutput;
use axum::{
	body::Body,
	extract::rejection::{JsonRejection, PathRejection, QueryRejection},
	http::{Response, StatusCode},
	response::IntoResponse,
};
use schemars::JsonSchema;
use serde::Serialize;
use tower_governor::GovernorError;

use crate::{extract::Json, store};

pub type Map = serde_json::Map<String, serde_json::Value>;

/// A single error message presented to the client.
#[derive(Debug, Serialize, JsonSchema)]
pub struct Message<'a> {
	/// A short, machine-friendly description of the error.
	pub content: Cow<'a, str>,
	/// The request field the error refers to, if any.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub field: Option<Cow<'a, str>>,
	/// Additional structured information about the error.
	#[serde(skip_serializing_if = "Option::is_none")]
	pub details: Option<Cow<'a, Map>>,
}

impl<'a> Message<'a> {
	pub fn new(content: impl Into<Cow<'a, str>>) -> Self {
		Self {
			content: content.into(),
			field: None,
			details: None,
		}
	}

	pub fn field(mut self, field: impl Into<Cow<'a, str>>) -> Self {
		self.field = Some(field.into());
		self
	}

	pub fn detail(mut self, key: &str, value: impl Into<serde_json::Value>) -> Self {
		self.details
			.get_or_insert_with(|| Cow::Owned(Map::new()))
			.to_mut()
			.insert(key.into(), value.into());
		self
	}

	pub fn into_vec(self) -> Vec<Self> {
		vec![self]
	}
}

/// The body of every error response.
#[derive(Debug, Serialize, JsonSchema)]
pub struct ErrorBody<'a> {
	pub success: bool,
	pub errors: Vec<Message<'a>>,
}

impl<'a> ErrorBody<'a> {
	pub fn new(errors: Vec<Message<'a>>) -> Self {
		Self {
			success: false,
			errors,
		}
	}
}

/// The response shape of a route-specific error.
///
/// The messages are sent to the client, so they should not contain sensitive information.
pub trait ErrorShape: std::error::Error {
	fn status(&self) -> StatusCode;
	fn errors(&self) -> Vec<Message<'_>>;
}

/// Errors that can happen in any route.
///
/// The Display trait is not sent to the client, so it can show
/// sensitive information.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
	#[error("validation error: {0}")]
	Validation(#[from] validator::ValidationErrors),
	#[error("json error: {0}")]
	Json(#[from] JsonRejection),
	#[error("query error: {0}")]
	Query(#[from] QueryRejection),
	#[error("path error: {0}")]
	Path(#[from] PathRejection),
	#[error("store error: {0}")]
	Store(#[from] store::Error),
	#[error("rate limited: {0}")]
	RateLimit(#[from] GovernorError),
}

impl ErrorShape for AppError {
	fn status(&self) -> StatusCode {
		match self {
			Self::Validation(..) | Self::Query(..) | Self::Path(..) => StatusCode::BAD_REQUEST,
			Self::Json(
				JsonRejection::JsonDataError(..)
				| JsonRejection::JsonSyntaxError(..)
				| JsonRejection::MissingJsonContentType(..),
			) => StatusCode::BAD_REQUEST,
			Self::Json(rejection) => rejection.status(),
			Self::Store(..) => StatusCode::INTERNAL_SERVER_ERROR,
			Self::RateLimit(GovernorError::TooManyRequests { .. }) => StatusCode::TOO_MANY_REQUESTS,
			Self::RateLimit(..) => StatusCode::INTERNAL_SERVER_ERROR,
		}
	}

	fn errors(&self) -> Vec<Message<'_>> {
		match self {
			Self::Validation(errors) => errors
				.field_errors()
				.into_iter()
				.flat_map(|(field, errors)| {
					errors.iter().map(move |error| {
						let content = error.message.as_ref().unwrap_or(&error.code).to_string();

						Message::new(content).field(field.to_string())
					})
				})
				.collect(),
			Self::Json(rejection) => Message::new(rejection.body_text()).into_vec(),
			Self::Query(rejection) => Message::new(rejection.body_text()).into_vec(),
			Self::Path(rejection) => Message::new(rejection.body_text()).into_vec(),
			Self::Store(error) => Message::new(error.to_string()).into_vec(),
			Self::RateLimit(error) => Message::new(error.to_string()).into_vec(),
		}
	}
}

impl IntoResponse for AppError {
	fn into_response(self) -> Response<Body> {
		shape_response(&self)
	}
}

/// An error returned from a route handler: either a cross-cutting [`AppError`]
/// or an error specific to the route module.
#[derive(Debug)]
pub enum RouteError<T> {
	App(AppError),
	Route(T),
}

impl<T: fmt::Display> fmt::Display for RouteError<T> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::App(error) => error.fmt(f),
			Self::Route(error) => error.fmt(f),
		}
	}
}

impl<T: std::error::Error + 'static> std::error::Error for RouteError<T> {
	fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
		match self {
			Self::App(error) => Some(error),
			Self::Route(error) => Some(error),
		}
	}
}

impl<T> From<AppError> for RouteError<T> {
	fn from(error: AppError) -> Self {
		Self::App(error)
	}
}

impl<T> From<store::Error> for RouteError<T> {
	fn from(error: store::Error) -> Self {
		Self::App(error.into())
	}
}

impl<T> From<validator::ValidationErrors> for RouteError<T> {
	fn from(error: validator::ValidationErrors) -> Self {
		Self::App(error.into())
	}
}

impl<T: ErrorShape> IntoResponse for RouteError<T> {
	fn into_response(self) -> Response<Body> {
		match self {
			Self::App(error) => shape_response(&error),
			Self::Route(error) => shape_response(&error),
		}
	}
}

impl<T> OperationOutput for RouteError<T> {
	type Inner = Self;
}

fn shape_response<E: ErrorShape>(error: &E) -> Response<Body> {
	let status = error.status();

	if status.is_server_error() {
		tracing::error!(%error, "request failed");
	} else {
		tracing::debug!(%error, "request rejected");
	}

	(status, Json(ErrorBody::new(error.errors()))).into_response()
}

