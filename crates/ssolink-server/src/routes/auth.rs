// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Login redirect and callback handlers.

use std::sync::Arc;

use axum::{
	extract::{Path, Query, State},
	http::{header, StatusCode},
	response::{IntoResponse, Response},
	Json,
};
use serde::{Deserialize, Serialize};
use ssolink_common_secret::SecretString;
use ssolink_server_link::{AuthProvider, LocalUserId, Strategy};

use crate::{api::AppState, error::ServerError};

#[derive(Debug, Deserialize)]
pub struct CallbackQuery {
	pub token: Option<SecretString>,
}

#[derive(Debug, Serialize)]
pub struct StrategiesResponse {
	pub strategies: Vec<Strategy>,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
	pub uid: LocalUserId,
	/// True when this login linked the identity for the first time.
	pub new_link: bool,
}

fn provider(state: &AppState, name: &str) -> Result<Arc<dyn AuthProvider>, ServerError> {
	state
		.registry
		.get(name)
		.ok_or_else(|| ServerError::NotFound(format!("provider {name}")))
}

/// GET /auth/strategies
pub async fn list_strategies(State(state): State<AppState>) -> Json<StrategiesResponse> {
	Json(StrategiesResponse {
		strategies: state.registry.strategies(),
	})
}

/// GET /auth/{provider}
///
/// Redirects to the provider's login page. Providers that send the browser
/// back here with `?token=` are handled as a callback.
#[tracing::instrument(skip(state, query))]
pub async fn login(
	State(state): State<AppState>,
	Path(name): Path<String>,
	Query(query): Query<CallbackQuery>,
) -> Result<Response, ServerError> {
	let provider = provider(&state, &name)?;

	if let Some(token) = query.token {
		return complete_login(provider.as_ref(), token).await;
	}

	let return_url = format!("{}/auth/{}/callback", state.base_url, provider.name());
	let location = provider.login_url(&return_url)?;
	tracing::debug!("redirecting to identity provider");
	Ok((StatusCode::FOUND, [(header::LOCATION, location)]).into_response())
}

/// GET /auth/{provider}/callback?token=
#[tracing::instrument(skip(state, query))]
pub async fn callback(
	State(state): State<AppState>,
	Path(name): Path<String>,
	Query(query): Query<CallbackQuery>,
) -> Result<Response, ServerError> {
	let provider = provider(&state, &name)?;
	let token = query
		.token
		.ok_or_else(|| ServerError::BadRequest("Missing token parameter".to_string()))?;
	complete_login(provider.as_ref(), token).await
}

async fn complete_login(
	provider: &dyn AuthProvider,
	token: SecretString,
) -> Result<Response, ServerError> {
	if token.is_blank() {
		return Err(ServerError::BadRequest("Missing token parameter".to_string()));
	}

	let resolution = provider.handle_callback(&token).await?;
	tracing::info!(user_id = %resolution.local_user_id, "login completed");

	Ok(Json(LoginResponse {
		uid: resolution.local_user_id,
		new_link: resolution.is_new_link(),
	})
	.into_response())
}
