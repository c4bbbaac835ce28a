// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{extract::State, Json};
use serde::Serialize;

use crate::api::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
	pub status: &'static str,
	pub version: &'static str,
	pub providers: Vec<ProviderHealth>,
}

#[derive(Debug, Serialize)]
pub struct ProviderHealth {
	pub name: String,
	pub enabled: bool,
}

/// GET /health - liveness plus provider configuration state.
pub async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
	let providers = state
		.registry
		.providers()
		.map(|p| ProviderHealth {
			name: p.name().to_string(),
			enabled: p.is_enabled(),
		})
		.collect();

	Json(HealthResponse {
		status: "ok",
		version: env!("CARGO_PKG_VERSION"),
		providers,
	})
}
