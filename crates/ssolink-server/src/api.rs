// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Application state and router.

use std::sync::Arc;

use axum::{
	routing::{delete, get},
	Router,
};
use sqlx::sqlite::SqlitePool;
use ssolink_server_auth_twt::provider_from_config;
use ssolink_server_config::ServerConfig;
use ssolink_server_db::{MappingRepository, UserRepository};
use ssolink_server_link::{MappingStore, StrategyRegistry, UserStore};

use crate::routes;

#[derive(Clone)]
pub struct AppState {
	pub registry: Arc<StrategyRegistry>,
	/// Public URL of this server, without a trailing slash.
	pub base_url: String,
}

/// Build the provider registry over the SQLite repositories.
pub fn create_app_state(pool: SqlitePool, config: &ServerConfig) -> AppState {
	let users: Arc<dyn UserStore> = Arc::new(UserRepository::new(pool.clone()));
	let mappings: Arc<dyn MappingStore> = Arc::new(MappingRepository::new(pool));

	let twt = provider_from_config(&config.twt, users, mappings);
	let registry = StrategyRegistry::new().with_provider(Arc::new(twt));

	AppState {
		registry: Arc::new(registry),
		base_url: config.http.base_url.clone(),
	}
}

pub fn create_router(state: AppState) -> Router {
	Router::new()
		.route("/health", get(routes::health::health_check))
		.route("/auth/strategies", get(routes::auth::list_strategies))
		.route("/auth/{provider}", get(routes::auth::login))
		.route("/auth/{provider}/callback", get(routes::auth::callback))
		.route("/api/users/{uid}/sso", delete(routes::users::delete_user_data))
		.with_state(state)
}
