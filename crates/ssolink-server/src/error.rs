// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Server error types and HTTP response conversions.

use axum::{
	http::StatusCode,
	response::{IntoResponse, Response},
	Json,
};
use serde::Serialize;
use ssolink_server_link::LinkError;

#[derive(Debug, thiserror::Error)]
pub enum ServerError {
	/// Unknown provider or resource.
	#[error("Not found: {0}")]
	NotFound(String),

	/// Invalid request payload.
	#[error("Invalid request: {0}")]
	BadRequest(String),

	/// Linking failed.
	#[error(transparent)]
	Link(#[from] LinkError),
}

/// Error response body.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
	pub error: String,
	pub message: String,
}

impl ErrorResponse {
	fn new(error: &str, message: impl Into<String>) -> Self {
		Self {
			error: error.to_string(),
			message: message.into(),
		}
	}
}

impl IntoResponse for ServerError {
	fn into_response(self) -> Response {
		let (status, body) = match &self {
			ServerError::NotFound(what) => (
				StatusCode::NOT_FOUND,
				ErrorResponse::new("not_found", format!("Not found: {what}")),
			),
			ServerError::BadRequest(message) => (
				StatusCode::BAD_REQUEST,
				ErrorResponse::new("invalid_request", message.clone()),
			),
			ServerError::Link(LinkError::Configuration(message)) => (
				StatusCode::NOT_IMPLEMENTED,
				ErrorResponse::new("not_configured", message.clone()),
			),
			ServerError::Link(LinkError::Provider(e)) => {
				tracing::warn!(error = %e, "identity provider error");
				(
					StatusCode::BAD_GATEWAY,
					ErrorResponse::new("provider_error", e.to_string()),
				)
			}
			ServerError::Link(e @ LinkError::MergeRefused { .. }) => (
				StatusCode::CONFLICT,
				ErrorResponse::new("account_exists", e.to_string()),
			),
			ServerError::Link(e @ LinkError::AlreadyLinked { .. }) => (
				StatusCode::CONFLICT,
				ErrorResponse::new("account_linked", e.to_string()),
			),
			ServerError::Link(e @ LinkError::Storage { .. }) => {
				tracing::error!(error = %e, "storage error");
				(
					StatusCode::INTERNAL_SERVER_ERROR,
					ErrorResponse::new("storage_error", "A storage error occurred"),
				)
			}
		};

		(status, Json(body)).into_response()
	}
}
