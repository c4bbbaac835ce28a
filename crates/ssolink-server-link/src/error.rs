// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Error taxonomy for identity linking.

use std::fmt;

use crate::types::LocalUserId;

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Errors returned by [`UserStore`](crate::UserStore) and
/// [`MappingStore`](crate::MappingStore) implementations.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
	#[error("backend error: {0}")]
	Backend(#[source] BoxError),

	#[error("conflict: {0}")]
	Conflict(String),

	#[error("not found: {0}")]
	NotFound(String),

	#[error("corrupt value: {0}")]
	Corrupt(String),
}

impl StoreError {
	pub fn backend(err: impl std::error::Error + Send + Sync + 'static) -> Self {
		Self::Backend(Box::new(err))
	}
}

/// Errors from the identity provider collaborator. None of these leave local
/// state changed.
#[derive(Debug, thiserror::Error)]
pub enum ProviderError {
	/// The provider answered but refused the assertion (bad token, revoked
	/// app, ...).
	#[error("identity provider rejected the login: {0}")]
	Rejected(String),

	/// The provider could not be reached or returned something unreadable.
	#[error("identity provider unavailable: {0}")]
	Unavailable(#[source] BoxError),

	#[error("invalid identity assertion: {0}")]
	InvalidAssertion(String),
}

/// The storage step that failed, reported with every
/// [`LinkError::Storage`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageStage {
	MappingLookup,
	EmailLookup,
	CreateUser,
	MappingWrite,
	SetUserField,
	FlagOrphan,
	ReadUserField,
	MappingDelete,
	ClearUserField,
}

impl fmt::Display for StorageStage {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let s = match self {
			StorageStage::MappingLookup => "mapping lookup",
			StorageStage::EmailLookup => "email lookup",
			StorageStage::CreateUser => "account creation",
			StorageStage::MappingWrite => "mapping write",
			StorageStage::SetUserField => "user field write",
			StorageStage::FlagOrphan => "orphan flag",
			StorageStage::ReadUserField => "user field read",
			StorageStage::MappingDelete => "mapping delete",
			StorageStage::ClearUserField => "user field clear",
		};
		f.write_str(s)
	}
}

#[derive(Debug, thiserror::Error)]
pub enum LinkError {
	/// Provider credentials are missing or invalid. Fixed at startup.
	#[error("provider integration is not configured: {0}")]
	Configuration(String),

	#[error(transparent)]
	Provider(#[from] ProviderError),

	#[error("storage failure during {stage}: {source}")]
	Storage {
		stage: StorageStage,
		#[source]
		source: StoreError,
	},

	/// An account already uses the asserted email and email merging is off.
	#[error("an account with this email already exists and merging by email is disabled")]
	MergeRefused { email: String },

	/// The account matched by email is already linked to a different external
	/// identity of this provider.
	#[error("account {user_id} is already linked to another identity")]
	AlreadyLinked { user_id: LocalUserId },
}

impl LinkError {
	pub(crate) fn at(stage: StorageStage) -> impl FnOnce(StoreError) -> LinkError {
		move |source| LinkError::Storage { stage, source }
	}

	/// The failed stage, for storage errors.
	pub fn stage(&self) -> Option<StorageStage> {
		match self {
			LinkError::Storage { stage, .. } => Some(*stage),
			_ => None,
		}
	}
}
