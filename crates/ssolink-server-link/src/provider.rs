// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Host-facing provider surface.
//!
//! An [`SsoProvider`] pairs a provider API client with an [`IdentityLinker`].
//! Providers whose credentials are incomplete are still registered, as
//! disabled, so every entry point can answer with a configuration error
//! instead of the host having to special-case them.

use std::sync::Arc;

use async_trait::async_trait;
use serde::Serialize;
use ssolink_common_secret::SecretString;

use crate::error::{LinkError, ProviderError};
use crate::linker::IdentityLinker;
use crate::types::{ExternalIdentity, LocalUserId, Resolution};

/// Login strategy advertised to the host's login page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Strategy {
	pub name: String,
	pub login_path: String,
	pub callback_path: String,
	pub icon_hint: String,
	pub scope: String,
}

impl Strategy {
	pub fn for_provider(name: &str) -> Self {
		Self {
			name: name.to_string(),
			login_path: format!("/auth/{name}"),
			callback_path: format!("/auth/{name}/callback"),
			icon_hint: "fa-check-square".to_string(),
			scope: String::new(),
		}
	}
}

/// Client for a provider's HTTP API.
#[async_trait]
pub trait IdentityClient: Send + Sync {
	/// Where to send the browser; the provider redirects back to
	/// `return_url` with a token.
	fn login_url(&self, return_url: &str) -> String;

	/// Exchange a callback token for the identity it asserts.
	async fn fetch_identity(&self, token: &SecretString) -> Result<ExternalIdentity, ProviderError>;
}

#[async_trait]
pub trait AuthProvider: Send + Sync {
	fn name(&self) -> &str;

	fn is_enabled(&self) -> bool;

	/// Append this provider's strategy. Leaves `strategies` untouched on error.
	fn get_strategy(&self, strategies: &mut Vec<Strategy>) -> Result<(), LinkError>;

	fn login_url(&self, return_url: &str) -> Result<String, LinkError>;

	async fn handle_callback(&self, token: &SecretString) -> Result<Resolution, LinkError>;

	async fn delete_user_data(&self, uid: LocalUserId) -> Result<LocalUserId, LinkError>;
}

enum ProviderState<C> {
	Ready { client: C, linker: IdentityLinker },
	Disabled { reason: String },
}

pub struct SsoProvider<C> {
	name: String,
	state: ProviderState<C>,
}

impl<C: IdentityClient> SsoProvider<C> {
	pub fn new(client: C, linker: IdentityLinker) -> Self {
		Self {
			name: linker.provider().to_string(),
			state: ProviderState::Ready { client, linker },
		}
	}

	/// A provider that rejects every call. Logs the reason once.
	pub fn disabled(name: impl Into<String>, reason: impl Into<String>) -> Self {
		let name = name.into();
		let reason = reason.into();
		tracing::error!(provider = %name, %reason, "provider disabled: application id and secret required");
		Self {
			name,
			state: ProviderState::Disabled { reason },
		}
	}

	fn ready(&self) -> Result<(&C, &IdentityLinker), LinkError> {
		match &self.state {
			ProviderState::Ready { client, linker } => Ok((client, linker)),
			ProviderState::Disabled { reason } => Err(LinkError::Configuration(reason.clone())),
		}
	}

	/// Resolve an already-authenticated identity.
	pub async fn login(&self, identity: &ExternalIdentity) -> Result<Resolution, LinkError> {
		let (_, linker) = self.ready()?;
		linker.resolve(identity).await
	}

	pub async fn lookup_local_id(&self, external_id: &str) -> Result<Option<LocalUserId>, LinkError> {
		let (_, linker) = self.ready()?;
		linker.lookup_local_id(external_id).await
	}
}

impl<C> std::fmt::Debug for SsoProvider<C> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		let enabled = matches!(self.state, ProviderState::Ready { .. });
		f.debug_struct("SsoProvider")
			.field("name", &self.name)
			.field("enabled", &enabled)
			.finish_non_exhaustive()
	}
}

#[async_trait]
impl<C: IdentityClient> AuthProvider for SsoProvider<C> {
	fn name(&self) -> &str {
		&self.name
	}

	fn is_enabled(&self) -> bool {
		self.ready().is_ok()
	}

	fn get_strategy(&self, strategies: &mut Vec<Strategy>) -> Result<(), LinkError> {
		self.ready()?;
		strategies.push(Strategy::for_provider(&self.name));
		Ok(())
	}

	fn login_url(&self, return_url: &str) -> Result<String, LinkError> {
		let (client, _) = self.ready()?;
		Ok(client.login_url(return_url))
	}

	#[tracing::instrument(skip(self, token), fields(provider = %self.name))]
	async fn handle_callback(&self, token: &SecretString) -> Result<Resolution, LinkError> {
		let (client, linker) = self.ready()?;
		let identity = client.fetch_identity(token).await.map_err(|err| {
			tracing::warn!(error = %err, "identity provider did not return an identity");
			err
		})?;
		linker.resolve(&identity).await
	}

	async fn delete_user_data(&self, uid: LocalUserId) -> Result<LocalUserId, LinkError> {
		let (_, linker) = self.ready()?;
		linker.unlink(uid).await
	}
}

/// Providers known to the host, fixed at startup.
#[derive(Default)]
pub struct StrategyRegistry {
	providers: Vec<Arc<dyn AuthProvider>>,
}

impl StrategyRegistry {
	pub fn new() -> Self {
		Self::default()
	}

	pub fn with_provider(mut self, provider: Arc<dyn AuthProvider>) -> Self {
		self.providers.push(provider);
		self
	}

	pub fn get(&self, name: &str) -> Option<Arc<dyn AuthProvider>> {
		self.providers.iter().find(|p| p.name() == name).cloned()
	}

	pub fn providers(&self) -> impl Iterator<Item = &Arc<dyn AuthProvider>> {
		self.providers.iter()
	}

	/// Strategies of enabled providers, in registration order.
	pub fn strategies(&self) -> Vec<Strategy> {
		let mut strategies = Vec::new();
		for provider in &self.providers {
			if let Err(err) = provider.get_strategy(&mut strategies) {
				tracing::debug!(provider = provider.name(), error = %err, "strategy not offered");
			}
		}
		strategies
	}

	/// Remove every enabled provider's linkage from an account. Stops at the
	/// first failure.
	pub async fn unlink_all(&self, uid: LocalUserId) -> Result<LocalUserId, LinkError> {
		for provider in self.providers.iter().filter(|p| p.is_enabled()) {
			provider.delete_user_data(uid).await?;
		}
		Ok(uid)
	}

	pub fn len(&self) -> usize {
		self.providers.len()
	}

	pub fn is_empty(&self) -> bool {
		self.providers.is_empty()
	}
}
