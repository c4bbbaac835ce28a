// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! TwT identity provider configuration.
//!
//! The provider is optional: a config without an application id or secret
//! still finalizes, and the server registers the provider as disabled. Only
//! [`TwtConfig::credentials`] enforces completeness.

use serde::Deserialize;
use ssolink_common_secret::SecretString;

use crate::error::ConfigError;

/// Configuration layer for TwT (all fields optional for layering).
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TwtConfigLayer {
	#[serde(default)]
	pub application_id: Option<String>,
	#[serde(default)]
	pub application_secret: Option<SecretString>,
	/// Talk to the provider over `https` instead of `http`.
	#[serde(default)]
	pub use_secure_transport: Option<bool>,
	/// Provider host, optionally with a port (`sso.example.com:8443`).
	#[serde(default)]
	pub host: Option<String>,
	/// Attach a first-time external identity to an existing account with the
	/// same email.
	#[serde(default)]
	pub merge_by_email: Option<bool>,
}

impl TwtConfigLayer {
	pub fn merge(&mut self, other: TwtConfigLayer) {
		if other.application_id.is_some() {
			self.application_id = other.application_id;
		}
		if other.application_secret.is_some() {
			self.application_secret = other.application_secret;
		}
		if other.use_secure_transport.is_some() {
			self.use_secure_transport = other.use_secure_transport;
		}
		if other.host.is_some() {
			self.host = other.host;
		}
		if other.merge_by_email.is_some() {
			self.merge_by_email = other.merge_by_email;
		}
	}

	pub fn finalize(self) -> TwtConfig {
		TwtConfig {
			application_id: self.application_id.filter(|s| !s.trim().is_empty()),
			application_secret: self.application_secret.filter(|s| !s.is_blank()),
			use_secure_transport: self.use_secure_transport.unwrap_or(false),
			host: self.host.filter(|s| !s.trim().is_empty()),
			merge_by_email: self.merge_by_email.unwrap_or(true),
		}
	}
}

/// TwT configuration (runtime, possibly incomplete).
#[derive(Debug, Clone)]
pub struct TwtConfig {
	pub application_id: Option<String>,
	pub application_secret: Option<SecretString>,
	pub use_secure_transport: bool,
	pub host: Option<String>,
	pub merge_by_email: bool,
}

impl Default for TwtConfig {
	fn default() -> Self {
		TwtConfigLayer::default().finalize()
	}
}

/// The credential set the provider client needs. Only obtainable through
/// [`TwtConfig::credentials`].
#[derive(Debug, Clone)]
pub struct TwtCredentials {
	pub application_id: String,
	pub application_secret: SecretString,
	pub use_secure_transport: bool,
	pub host: String,
}

impl TwtConfig {
	pub fn is_configured(&self) -> bool {
		self.credentials().is_ok()
	}

	/// Validate that id, secret and host are all present.
	pub fn credentials(&self) -> Result<TwtCredentials, ConfigError> {
		let mut missing = Vec::new();
		if self.application_id.is_none() {
			missing.push("application_id");
		}
		if self.application_secret.is_none() {
			missing.push("application_secret");
		}
		if self.host.is_none() {
			missing.push("host");
		}

		match (&self.application_id, &self.application_secret, &self.host) {
			(Some(id), Some(secret), Some(host)) => Ok(TwtCredentials {
				application_id: id.clone(),
				application_secret: secret.clone(),
				use_secure_transport: self.use_secure_transport,
				host: host.clone(),
			}),
			_ => Err(ConfigError::Validation(format!(
				"TwT Api Configuration is invalid: missing {}",
				missing.join(", ")
			))),
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;

	fn complete_layer() -> TwtConfigLayer {
		TwtConfigLayer {
			application_id: Some("app-1".to_string()),
			application_secret: Some(SecretString::new("key-1".to_string())),
			use_secure_transport: Some(true),
			host: Some("sso.example.com".to_string()),
			merge_by_email: None,
		}
	}

	#[test]
	fn test_unconfigured_by_default() {
		let config = TwtConfigLayer::default().finalize();
		assert!(!config.is_configured());
		assert!(!config.use_secure_transport);
		assert!(config.merge_by_email);
	}

	#[test]
	fn test_complete_config_yields_credentials() {
		let creds = complete_layer().finalize().credentials().unwrap();
		assert_eq!(creds.application_id, "app-1");
		assert_eq!(creds.application_secret.expose(), "key-1");
		assert!(creds.use_secure_transport);
		assert_eq!(creds.host, "sso.example.com");
	}

	#[test]
	fn test_missing_secret_names_field() {
		let mut layer = complete_layer();
		layer.application_secret = None;
		let err = layer.finalize().credentials().unwrap_err();
		assert!(err.to_string().contains("application_secret"));
	}

	#[test]
	fn test_blank_values_count_as_missing() {
		let mut layer = complete_layer();
		layer.application_id = Some("  ".to_string());
		layer.application_secret = Some(SecretString::new(String::new()));
		let err = layer.finalize().credentials().unwrap_err().to_string();
		assert!(err.contains("application_id"));
		assert!(err.contains("application_secret"));
		assert!(!err.contains("host"));
	}

	#[test]
	fn test_merge_prefers_other() {
		let mut base = complete_layer();
		base.merge(TwtConfigLayer {
			host: Some("other.example.com".to_string()),
			merge_by_email: Some(false),
			..Default::default()
		});
		let config = base.finalize();
		assert_eq!(config.host.as_deref(), Some("other.example.com"));
		assert_eq!(config.application_id.as_deref(), Some("app-1"));
		assert!(!config.merge_by_email);
	}

	#[test]
	fn test_secret_not_in_debug() {
		let config = complete_layer().finalize();
		let debug = format!("{config:?}");
		assert!(!debug.contains("key-1"));
	}

	proptest! {
		#[test]
		fn any_non_blank_triplet_is_configured(
			id in "[a-zA-Z0-9]{1,32}",
			secret in "[a-zA-Z0-9]{1,32}",
			host in "[a-z]{1,16}\\.[a-z]{2,5}",
		) {
			let config = TwtConfigLayer {
				application_id: Some(id),
				application_secret: Some(SecretString::new(secret)),
				host: Some(host),
				..Default::default()
			}
			.finalize();
			prop_assert!(config.is_configured());
		}
	}
}
