// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Configuration sources: environment variables and TOML files.

use std::path::PathBuf;

use ssolink_common_secret::load_secret_env;
use tracing::{debug, trace};

use crate::error::ConfigError;
use crate::layer::ServerConfigLayer;
use crate::sections::{DatabaseConfigLayer, HttpConfigLayer, LoggingConfigLayer, TwtConfigLayer};

/// Source precedence levels (higher = overrides lower).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Precedence {
	Defaults = 10,
	ConfigFile = 20,
	Environment = 50,
}

/// Trait for configuration sources.
pub trait ConfigSource: Send + Sync {
	fn name(&self) -> &'static str;
	fn precedence(&self) -> Precedence;
	fn load(&self) -> Result<ServerConfigLayer, ConfigError>;
}

/// Built-in defaults source.
pub struct DefaultsSource;

impl ConfigSource for DefaultsSource {
	fn name(&self) -> &'static str {
		"defaults"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Defaults
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading defaults");
		Ok(ServerConfigLayer::default())
	}
}

/// TOML file configuration source. A missing file is not an error.
pub struct TomlSource {
	path: PathBuf,
}

impl TomlSource {
	pub fn new(path: impl Into<PathBuf>) -> Self {
		Self { path: path.into() }
	}

	pub fn system() -> Self {
		Self::new("/etc/ssolink/server.toml")
	}
}

impl ConfigSource for TomlSource {
	fn name(&self) -> &'static str {
		"toml-config"
	}

	fn precedence(&self) -> Precedence {
		Precedence::ConfigFile
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		if !self.path.exists() {
			debug!(path = %self.path.display(), "config file not found, skipping");
			return Ok(ServerConfigLayer::default());
		}

		debug!(path = %self.path.display(), "loading config file");
		let content = std::fs::read_to_string(&self.path).map_err(|e| ConfigError::FileRead {
			path: self.path.clone(),
			source: e,
		})?;

		let layer: ServerConfigLayer =
			toml::from_str(&content).map_err(|e| ConfigError::TomlParse {
				path: self.path.clone(),
				source: e,
			})?;

		trace!("parsed config layer from TOML");
		Ok(layer)
	}
}

/// Environment variable source.
///
/// Convention: SSOLINK_SERVER_<SECTION>_<FIELD>
pub struct EnvSource;

impl ConfigSource for EnvSource {
	fn name(&self) -> &'static str {
		"environment"
	}

	fn precedence(&self) -> Precedence {
		Precedence::Environment
	}

	fn load(&self) -> Result<ServerConfigLayer, ConfigError> {
		debug!("loading environment variables");
		Ok(ServerConfigLayer {
			http: Some(load_http_from_env()?),
			database: Some(load_database_from_env()),
			logging: Some(load_logging_from_env()),
			twt: Some(load_twt_from_env()?),
		})
	}
}

fn env_var(name: &str) -> Option<String> {
	std::env::var(name).ok().filter(|s| !s.is_empty())
}

fn env_bool(name: &str) -> Option<bool> {
	env_var(name).map(|v| v.eq_ignore_ascii_case("true") || v == "1")
}

fn env_u16(name: &str) -> Result<Option<u16>, ConfigError> {
	match env_var(name) {
		Some(v) => v.parse().map(Some).map_err(|_| ConfigError::InvalidValue {
			key: name.to_string(),
			message: format!("invalid u16 value '{v}'"),
		}),
		None => Ok(None),
	}
}

fn load_http_from_env() -> Result<HttpConfigLayer, ConfigError> {
	Ok(HttpConfigLayer {
		host: env_var("SSOLINK_SERVER_HOST"),
		port: env_u16("SSOLINK_SERVER_PORT")?,
		base_url: env_var("SSOLINK_SERVER_BASE_URL"),
	})
}

fn load_database_from_env() -> DatabaseConfigLayer {
	DatabaseConfigLayer {
		url: env_var("SSOLINK_SERVER_DATABASE_URL"),
	}
}

fn load_logging_from_env() -> LoggingConfigLayer {
	LoggingConfigLayer {
		level: env_var("SSOLINK_SERVER_LOG_LEVEL"),
	}
}

fn load_twt_from_env() -> Result<TwtConfigLayer, ConfigError> {
	Ok(TwtConfigLayer {
		application_id: env_var("SSOLINK_SERVER_TWT_APPLICATION_ID"),
		application_secret: load_secret_env("SSOLINK_SERVER_TWT_APPLICATION_SECRET")?,
		use_secure_transport: env_bool("SSOLINK_SERVER_TWT_USE_SECURE_TRANSPORT"),
		host: env_var("SSOLINK_SERVER_TWT_HOST"),
		merge_by_email: env_bool("SSOLINK_SERVER_TWT_MERGE_BY_EMAIL"),
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::io::Write;

	#[test]
	fn test_precedence_ordering() {
		assert!(Precedence::Defaults < Precedence::ConfigFile);
		assert!(Precedence::ConfigFile < Precedence::Environment);
	}

	#[test]
	fn test_missing_toml_file_is_empty_layer() {
		let source = TomlSource::new("/nonexistent/ssolink/server.toml");
		let layer = source.load().unwrap();
		assert!(layer.http.is_none());
		assert!(layer.twt.is_none());
	}

	#[test]
	fn test_toml_file_parses_twt_section() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(
			file,
			r#"
[http]
port = 9001

[twt]
application_id = "app-1"
application_secret = "key-1"
use_secure_transport = true
host = "sso.example.com"
"#
		)
		.unwrap();

		let layer = TomlSource::new(file.path()).load().unwrap();
		assert_eq!(layer.http.unwrap().port, Some(9001));
		let twt = layer.twt.unwrap();
		assert_eq!(twt.application_id.as_deref(), Some("app-1"));
		assert_eq!(twt.application_secret.unwrap().expose(), "key-1");
		assert_eq!(twt.use_secure_transport, Some(true));
	}

	#[test]
	fn test_invalid_toml_reports_path() {
		let mut file = tempfile::NamedTempFile::new().unwrap();
		write!(file, "[twt\nhost = ").unwrap();

		let err = TomlSource::new(file.path()).load().unwrap_err();
		assert!(matches!(err, ConfigError::TomlParse { .. }));
	}

	#[test]
	fn test_env_bool_parsing() {
		std::env::set_var("SSOLINK_TEST_ENV_BOOL_TRUE", "TRUE");
		std::env::set_var("SSOLINK_TEST_ENV_BOOL_ONE", "1");
		std::env::set_var("SSOLINK_TEST_ENV_BOOL_NO", "no");
		assert_eq!(env_bool("SSOLINK_TEST_ENV_BOOL_TRUE"), Some(true));
		assert_eq!(env_bool("SSOLINK_TEST_ENV_BOOL_ONE"), Some(true));
		assert_eq!(env_bool("SSOLINK_TEST_ENV_BOOL_NO"), Some(false));
		assert_eq!(env_bool("SSOLINK_TEST_ENV_BOOL_UNSET"), None);
	}

	#[test]
	fn test_env_u16_rejects_garbage() {
		std::env::set_var("SSOLINK_TEST_ENV_PORT_BAD", "eighty");
		let err = env_u16("SSOLINK_TEST_ENV_PORT_BAD").unwrap_err();
		assert!(matches!(err, ConfigError::InvalidValue { .. }));
	}
}
