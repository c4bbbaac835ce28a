// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity-linking value types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Identifier of an account in the host's user store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LocalUserId(i64);

impl LocalUserId {
	pub fn new(id: i64) -> Self {
		Self(id)
	}

	pub fn get(self) -> i64 {
		self.0
	}
}

impl fmt::Display for LocalUserId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "{}", self.0)
	}
}

impl FromStr for LocalUserId {
	type Err = std::num::ParseIntError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		s.trim().parse().map(Self)
	}
}

impl From<i64> for LocalUserId {
	fn from(id: i64) -> Self {
		Self(id)
	}
}

/// An authenticated identity assertion from the provider.
///
/// Built once per login attempt and consumed by
/// [`IdentityLinker::resolve`](crate::IdentityLinker::resolve).
///
/// # PII Handling
///
/// `email` and `handle` are user PII from the provider; log the external id
/// instead.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalIdentity {
	/// Stable id of the account at the provider.
	pub external_id: String,
	/// Provider username; becomes the local username on first login.
	pub handle: String,
	pub email: String,
}

impl ExternalIdentity {
	pub fn new(
		external_id: impl Into<String>,
		handle: impl Into<String>,
		email: impl Into<String>,
	) -> Self {
		Self {
			external_id: external_id.into(),
			handle: handle.into(),
			email: email.into(),
		}
	}
}

/// Fields for an account created on first login.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewLocalUser {
	pub username: String,
	pub email: String,
}

/// A durable external id to local id association.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdentityMapping {
	pub external_id: String,
	pub local_user_id: LocalUserId,
}

/// How a resolution arrived at its local account.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkOutcome {
	/// A mapping already existed.
	Existing,
	/// First login attached to an account found by email.
	Merged,
	/// First login created a new account.
	Created,
	/// A concurrent resolution wrote the mapping first. `orphan` is the
	/// account this call created before losing, if any.
	RaceLost { orphan: Option<LocalUserId> },
}

/// Result of [`IdentityLinker::resolve`](crate::IdentityLinker::resolve).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
	pub local_user_id: LocalUserId,
	pub outcome: LinkOutcome,
}

impl Resolution {
	/// True when this call wrote the mapping.
	pub fn is_new_link(&self) -> bool {
		matches!(self.outcome, LinkOutcome::Merged | LinkOutcome::Created)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn local_user_id_parses_stored_values() {
		assert_eq!("42".parse::<LocalUserId>().unwrap(), LocalUserId::new(42));
		assert_eq!(" 7 ".parse::<LocalUserId>().unwrap(), LocalUserId::new(7));
		assert!("abc".parse::<LocalUserId>().is_err());
		assert!("".parse::<LocalUserId>().is_err());
	}

	#[test]
	fn local_user_id_serializes_as_number() {
		let id = LocalUserId::new(12);
		assert_eq!(id.to_string(), "12");
	}

	#[test]
	fn only_merge_and_create_are_new_links() {
		let uid = LocalUserId::new(1);
		let resolution = |outcome| Resolution {
			local_user_id: uid,
			outcome,
		};
		assert!(!resolution(LinkOutcome::Existing).is_new_link());
		assert!(resolution(LinkOutcome::Merged).is_new_link());
		assert!(resolution(LinkOutcome::Created).is_new_link());
		assert!(!resolution(LinkOutcome::RaceLost { orphan: Some(uid) }).is_new_link());
	}
}
