// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! TwT single sign-on for ssolink.
//!
//! # Login Flow
//!
//! 1. **Redirect**: the browser is sent to `{scheme}://{host}/login` with the
//!    application id and a return URL.
//! 2. **Callback**: TwT redirects back to the return URL with a `token` query
//!    parameter.
//! 3. **User info**: the token is posted, together with the application id
//!    and key, to `{scheme}://{host}/api/user`, which answers with the
//!    account's id, TwT name and email.
//!
//! # Security Considerations
//!
//! - The application key and callback tokens are [`SecretString`]s and never
//!   logged; tracing spans skip them.
//! - `use_secure_transport = false` sends the application key in clear text
//!   and is only meant for development hosts.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use ssolink_common_secret::SecretString;
use ssolink_server_config::{TwtConfig, TwtCredentials};
use ssolink_server_link::{
	ExternalIdentity, IdentityClient, IdentityLinker, LinkerConfig, MappingStore, ProviderError,
	SsoProvider, UserStore,
};
use url::Url;

/// Provider name used for routes and stored keys.
pub const PROVIDER_NAME: &str = "twt";

/// Message logged and returned when credentials are incomplete.
pub const INVALID_CONFIGURATION: &str = "TwT Api Configuration is invalid";

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

// =============================================================================
// Errors
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum TwtError {
	/// The HTTP request to TwT failed (network error, timeout, etc.).
	#[error("HTTP request failed: {0}")]
	HttpRequest(#[from] reqwest::Error),

	/// The configured host does not form a valid URL.
	#[error("invalid TwT host: {0}")]
	InvalidHost(String),

	/// TwT answered with a non-success HTTP status.
	#[error("TwT returned HTTP {status}: {body}")]
	Status { status: u16, body: String },

	/// TwT answered `status: false`.
	#[error("TwT API error: {0}")]
	Rejected(String),

	/// The response body was not the expected shape.
	#[error("failed to parse response: {0}")]
	ParseError(String),
}

impl From<TwtError> for ProviderError {
	fn from(err: TwtError) -> Self {
		match err {
			TwtError::Rejected(message) => ProviderError::Rejected(message),
			TwtError::Status { status, body } if (400..500).contains(&status) => {
				ProviderError::Rejected(format!("HTTP {status}: {body}"))
			}
			TwtError::ParseError(message) => ProviderError::InvalidAssertion(message),
			other => ProviderError::Unavailable(Box::new(other)),
		}
	}
}

// =============================================================================
// Response types
// =============================================================================

/// Envelope returned by `POST /api/user`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TwtUserInfoResponse {
	pub status: bool,
	#[serde(default)]
	pub message: Option<String>,
	#[serde(default)]
	pub result: Option<TwtUser>,
}

/// A TwT account.
///
/// # PII Handling
///
/// `twt_name` and `email` are user PII.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TwtUser {
	#[serde(deserialize_with = "deserialize_id")]
	pub id: String,
	pub twt_name: String,
	pub email: String,
}

/// TwT has been seen to send ids both as numbers and as strings.
fn deserialize_id<'de, D>(deserializer: D) -> Result<String, D::Error>
where
	D: serde::Deserializer<'de>,
{
	#[derive(Deserialize)]
	#[serde(untagged)]
	enum Id {
		Number(i64),
		Text(String),
	}

	Ok(match Id::deserialize(deserializer)? {
		Id::Number(n) => n.to_string(),
		Id::Text(s) => s,
	})
}

impl From<TwtUser> for ExternalIdentity {
	fn from(user: TwtUser) -> Self {
		ExternalIdentity::new(user.id, user.twt_name, user.email)
	}
}

// =============================================================================
// Client
// =============================================================================

#[derive(Debug, Clone)]
pub struct TwtClient {
	application_id: String,
	application_secret: SecretString,
	login_endpoint: Url,
	user_endpoint: Url,
	http_client: reqwest::Client,
}

impl TwtClient {
	#[tracing::instrument(skip_all, name = "TwtClient::new")]
	pub fn new(credentials: TwtCredentials) -> Result<Self, TwtError> {
		let scheme = if credentials.use_secure_transport {
			"https"
		} else {
			"http"
		};
		let base = Url::parse(&format!("{scheme}://{}/", credentials.host))
			.map_err(|e| TwtError::InvalidHost(format!("{}: {e}", credentials.host)))?;
		if base.path() != "/" || base.query().is_some() {
			return Err(TwtError::InvalidHost(credentials.host));
		}
		let login_endpoint = base
			.join("login")
			.map_err(|e| TwtError::InvalidHost(e.to_string()))?;
		let user_endpoint = base
			.join("api/user")
			.map_err(|e| TwtError::InvalidHost(e.to_string()))?;

		let http_client = reqwest::Client::builder()
			.timeout(REQUEST_TIMEOUT)
			.user_agent(concat!("ssolink/", env!("CARGO_PKG_VERSION")))
			.build()?;

		Ok(Self {
			application_id: credentials.application_id,
			application_secret: credentials.application_secret,
			login_endpoint,
			user_endpoint,
			http_client,
		})
	}

	/// TwT login page that returns to `return_url` with a token.
	pub fn login_url(&self, return_url: &str) -> String {
		let mut url = self.login_endpoint.clone();
		url
			.query_pairs_mut()
			.append_pair("app_id", &self.application_id)
			.append_pair("redirect", return_url);
		url.to_string()
	}

	/// Exchange a callback token for the account it belongs to.
	#[tracing::instrument(skip(self, token), name = "TwtClient::get_user_info")]
	pub async fn get_user_info(&self, token: &str) -> Result<TwtUser, TwtError> {
		tracing::debug!("fetching TwT user info");

		let response = self
			.http_client
			.post(self.user_endpoint.clone())
			.header("Accept", "application/json")
			.form(&[
				("app_id", self.application_id.as_str()),
				("app_key", self.application_secret.expose().as_str()),
				("token", token),
			])
			.send()
			.await?;

		let status = response.status();
		let body = response.text().await?;
		if !status.is_success() {
			return Err(TwtError::Status {
				status: status.as_u16(),
				body,
			});
		}

		let envelope: TwtUserInfoResponse = serde_json::from_str(&body)
			.map_err(|e| TwtError::ParseError(format!("failed to parse user response: {e}")))?;

		if !envelope.status {
			return Err(TwtError::Rejected(
				envelope
					.message
					.unwrap_or_else(|| "token rejected".to_string()),
			));
		}

		envelope
			.result
			.ok_or_else(|| TwtError::ParseError("user response has no result".to_string()))
	}
}

#[async_trait]
impl IdentityClient for TwtClient {
	fn login_url(&self, return_url: &str) -> String {
		TwtClient::login_url(self, return_url)
	}

	async fn fetch_identity(&self, token: &SecretString) -> Result<ExternalIdentity, ProviderError> {
		let user = self.get_user_info(token.expose()).await?;
		Ok(user.into())
	}
}

// =============================================================================
// Provider
// =============================================================================

/// Build the TwT provider from configuration.
///
/// Incomplete credentials or an unusable host yield a disabled provider, which
/// answers every call with a configuration error.
pub fn provider_from_config(
	config: &TwtConfig,
	users: Arc<dyn UserStore>,
	mappings: Arc<dyn MappingStore>,
) -> SsoProvider<TwtClient> {
	let credentials = match config.credentials() {
		Ok(credentials) => credentials,
		Err(err) => {
			tracing::debug!(error = %err, "TwT credentials incomplete");
			return SsoProvider::disabled(PROVIDER_NAME, INVALID_CONFIGURATION);
		}
	};

	let client = match TwtClient::new(credentials) {
		Ok(client) => client,
		Err(err) => {
			return SsoProvider::disabled(PROVIDER_NAME, format!("{INVALID_CONFIGURATION}: {err}"));
		}
	};

	let linker_config = LinkerConfig::new(PROVIDER_NAME).with_merge_by_email(config.merge_by_email);
	match IdentityLinker::new(linker_config, users, mappings) {
		Ok(linker) => SsoProvider::new(client, linker),
		Err(err) => SsoProvider::disabled(PROVIDER_NAME, err.to_string()),
	}
}
