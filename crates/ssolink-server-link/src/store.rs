// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Storage collaborators.
//!
//! The linker never owns accounts; it reads and writes through these traits.
//! Implementations must be safe to share across tasks; the linker itself
//! takes no locks, so [`MappingStore::set_object_field_if_absent`] is the
//! only thing standing between two racing first logins.

use async_trait::async_trait;

use crate::error::StoreError;
use crate::types::{LocalUserId, NewLocalUser};

#[async_trait]
pub trait UserStore: Send + Sync {
	async fn get_uid_by_email(&self, email: &str) -> Result<Option<LocalUserId>, StoreError>;
	async fn create_user(&self, user: &NewLocalUser) -> Result<LocalUserId, StoreError>;
	async fn set_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
		value: &str,
	) -> Result<(), StoreError>;
	async fn get_user_field(&self, uid: LocalUserId, field: &str)
		-> Result<Option<String>, StoreError>;
	/// Removing an absent field succeeds.
	async fn remove_user_field(&self, uid: LocalUserId, field: &str) -> Result<(), StoreError>;
}

/// Generic namespaced key/value field store.
#[async_trait]
pub trait MappingStore: Send + Sync {
	async fn get_object_field(&self, namespace: &str, key: &str)
		-> Result<Option<String>, StoreError>;
	/// Unconditional write.
	async fn set_object_field(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<(), StoreError>;
	/// Atomic insert. Returns `false`, leaving the stored value untouched,
	/// when the key already exists.
	async fn set_object_field_if_absent(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<bool, StoreError>;
	/// Deleting an absent key succeeds.
	async fn delete_object_field(&self, namespace: &str, key: &str) -> Result<(), StoreError>;
}

/// Mapping namespace for a provider, e.g. `twtId:uid`.
pub fn mapping_namespace(provider: &str) -> String {
	format!("{provider}Id:uid")
}

/// User field holding the external id, e.g. `twtId`.
pub fn provider_field(provider: &str) -> String {
	format!("{provider}Id")
}

/// User field set on an account orphaned by a lost mapping race.
pub fn orphan_field(provider: &str) -> String {
	format!("{provider}OrphanOf")
}
