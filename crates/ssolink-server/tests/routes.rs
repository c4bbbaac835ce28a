// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! HTTP route tests.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::{body::Body, Router};
use http::{header, Request, StatusCode};
use ssolink_common_secret::SecretString;
use ssolink_server::{create_app_state, create_router, AppState};
use ssolink_server_config::ServerConfig;
use ssolink_server_db::testing::create_test_pool;
use ssolink_server_link::{
	ExternalIdentity, IdentityClient, IdentityLinker, InMemoryMappingStore, InMemoryUserStore,
	LinkerConfig, ProviderError, SsoProvider, StrategyRegistry,
};
use tower::ServiceExt;

struct FakeTwt {
	identities: HashMap<String, ExternalIdentity>,
}

#[async_trait]
impl IdentityClient for FakeTwt {
	fn login_url(&self, return_url: &str) -> String {
		format!("https://sso.test/login?app_id=app-1&redirect={return_url}")
	}

	async fn fetch_identity(&self, token: &SecretString) -> Result<ExternalIdentity, ProviderError> {
		self
			.identities
			.get(token.expose())
			.cloned()
			.ok_or_else(|| ProviderError::Rejected("invalid token".to_string()))
	}
}

struct TestApp {
	router: Router,
	users: Arc<InMemoryUserStore>,
	mappings: Arc<InMemoryMappingStore>,
}

fn setup_test_app() -> TestApp {
	let users = Arc::new(InMemoryUserStore::new());
	let mappings = Arc::new(InMemoryMappingStore::new());
	let linker = IdentityLinker::new(LinkerConfig::new("twt"), users.clone(), mappings.clone())
		.unwrap();
	let client = FakeTwt {
		identities: HashMap::from([(
			"tok-alice".to_string(),
			ExternalIdentity::new("E1", "alice", "a@x.com"),
		)]),
	};
	let registry = StrategyRegistry::new().with_provider(Arc::new(SsoProvider::new(client, linker)));

	let state = AppState {
		registry: Arc::new(registry),
		base_url: "http://localhost:4567".to_string(),
	};

	TestApp {
		router: create_router(state),
		users,
		mappings,
	}
}

async fn send(router: &Router, method: &str, uri: &str) -> axum::response::Response {
	router
		.clone()
		.oneshot(
			Request::builder()
				.method(method)
				.uri(uri)
				.body(Body::empty())
				.unwrap(),
		)
		.await
		.unwrap()
}

async fn json_body(response: axum::response::Response) -> serde_json::Value {
	let body = axum::body::to_bytes(response.into_body(), usize::MAX)
		.await
		.unwrap();
	serde_json::from_slice(&body).unwrap()
}

#[tokio::test]
async fn health_reports_providers() {
	let app = setup_test_app();
	let response = send(&app.router, "GET", "/health").await;

	assert_eq!(response.status(), StatusCode::OK);
	let json = json_body(response).await;
	assert_eq!(json["status"], "ok");
	assert_eq!(json["providers"][0]["name"], "twt");
	assert_eq!(json["providers"][0]["enabled"], true);
}

#[tokio::test]
async fn strategies_lists_configured_provider() {
	let app = setup_test_app();
	let response = send(&app.router, "GET", "/auth/strategies").await;

	assert_eq!(response.status(), StatusCode::OK);
	let json = json_body(response).await;
	let strategy = &json["strategies"][0];
	assert_eq!(strategy["name"], "twt");
	assert_eq!(strategy["login_path"], "/auth/twt");
	assert_eq!(strategy["callback_path"], "/auth/twt/callback");
	assert_eq!(strategy["icon_hint"], "fa-check-square");
	assert_eq!(strategy["scope"], "");
}

#[tokio::test]
async fn login_redirects_to_provider() {
	let app = setup_test_app();
	let response = send(&app.router, "GET", "/auth/twt").await;

	assert_eq!(response.status(), StatusCode::FOUND);
	let location = response.headers()[header::LOCATION].to_str().unwrap();
	assert_eq!(
		location,
		"https://sso.test/login?app_id=app-1&redirect=http://localhost:4567/auth/twt/callback"
	);
}

#[tokio::test]
async fn login_with_token_acts_as_callback() {
	let app = setup_test_app();
	let response = send(&app.router, "GET", "/auth/twt?token=tok-alice").await;

	assert_eq!(response.status(), StatusCode::OK);
	let json = json_body(response).await;
	assert_eq!(json["new_link"], true);
	assert!(json["uid"].is_i64());
}

#[tokio::test]
async fn callback_is_idempotent() {
	let app = setup_test_app();

	let first = json_body(send(&app.router, "GET", "/auth/twt/callback?token=tok-alice").await).await;
	let second = json_body(send(&app.router, "GET", "/auth/twt/callback?token=tok-alice").await).await;

	assert_eq!(first["uid"], second["uid"]);
	assert_eq!(first["new_link"], true);
	assert_eq!(second["new_link"], false);
	assert_eq!(app.users.len(), 1);
}

#[tokio::test]
async fn callback_without_token_is_bad_request() {
	let app = setup_test_app();

	for uri in ["/auth/twt/callback", "/auth/twt/callback?token="] {
		let response = send(&app.router, "GET", uri).await;
		assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
		assert_eq!(json_body(response).await["error"], "invalid_request");
	}
}

#[tokio::test]
async fn rejected_token_is_bad_gateway_without_state_change() {
	let app = setup_test_app();
	let response = send(&app.router, "GET", "/auth/twt/callback?token=forged").await;

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert_eq!(json_body(response).await["error"], "provider_error");
	assert!(app.users.is_empty());
	assert_eq!(app.mappings.count("twtId:uid"), 0);
}

#[tokio::test]
async fn unknown_provider_is_not_found() {
	let app = setup_test_app();

	let response = send(&app.router, "GET", "/auth/acme").await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);

	let response = send(&app.router, "GET", "/auth/acme/callback?token=x").await;
	assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn delete_user_data_unlinks_and_is_idempotent() {
	let app = setup_test_app();
	let login = json_body(send(&app.router, "GET", "/auth/twt/callback?token=tok-alice").await).await;
	let uid = login["uid"].as_i64().unwrap();

	for _ in 0..2 {
		let response = send(&app.router, "DELETE", &format!("/api/users/{uid}/sso")).await;
		assert_eq!(response.status(), StatusCode::OK);
		assert_eq!(json_body(response).await["uid"], uid);
	}
	assert_eq!(app.mappings.count("twtId:uid"), 0);
}

#[tokio::test]
async fn unconfigured_provider_is_hidden_and_not_implemented() {
	let pool = create_test_pool().await.unwrap();
	let router = create_router(create_app_state(pool, &ServerConfig::default()));

	let json = json_body(send(&router, "GET", "/auth/strategies").await).await;
	assert_eq!(json["strategies"], serde_json::json!([]));

	let response = send(&router, "GET", "/auth/twt").await;
	assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);
	assert_eq!(json_body(response).await["error"], "not_configured");

	let response = send(&router, "GET", "/auth/twt/callback?token=x").await;
	assert_eq!(response.status(), StatusCode::NOT_IMPLEMENTED);

	let response = send(&router, "DELETE", "/api/users/1/sso").await;
	assert_eq!(response.status(), StatusCode::OK);
}
