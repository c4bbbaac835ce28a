// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! In-process stores for tests and single-node embedding.

use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::error::StoreError;
use crate::store::{MappingStore, UserStore};
use crate::types::{LocalUserId, NewLocalUser};

/// An account as held by [`InMemoryUserStore`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUser {
	pub id: LocalUserId,
	pub username: String,
	pub email: String,
	pub fields: HashMap<String, String>,
}

#[derive(Debug, Default)]
struct Users {
	next_id: i64,
	by_id: HashMap<LocalUserId, StoredUser>,
}

/// User store with unique usernames and emails (case-insensitive email).
#[derive(Debug, Default)]
pub struct InMemoryUserStore {
	inner: Mutex<Users>,
}

impl InMemoryUserStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> Result<MutexGuard<'_, Users>, StoreError> {
		self
			.inner
			.lock()
			.map_err(|_| StoreError::Conflict("user store lock poisoned".to_string()))
	}

	pub fn user(&self, uid: LocalUserId) -> Option<StoredUser> {
		self.lock().ok()?.by_id.get(&uid).cloned()
	}

	pub fn len(&self) -> usize {
		self.lock().map(|u| u.by_id.len()).unwrap_or(0)
	}

	pub fn is_empty(&self) -> bool {
		self.len() == 0
	}
}

#[async_trait]
impl UserStore for InMemoryUserStore {
	async fn get_uid_by_email(&self, email: &str) -> Result<Option<LocalUserId>, StoreError> {
		let users = self.lock()?;
		Ok(users
			.by_id
			.values()
			.find(|u| u.email.eq_ignore_ascii_case(email))
			.map(|u| u.id))
	}

	async fn create_user(&self, user: &NewLocalUser) -> Result<LocalUserId, StoreError> {
		if user.username.trim().is_empty() {
			return Err(StoreError::Conflict("username cannot be empty".to_string()));
		}
		let mut users = self.lock()?;
		if users.by_id.values().any(|u| u.username == user.username) {
			return Err(StoreError::Conflict(format!(
				"username {} is taken",
				user.username
			)));
		}
		if users
			.by_id
			.values()
			.any(|u| u.email.eq_ignore_ascii_case(&user.email))
		{
			return Err(StoreError::Conflict("email is already registered".to_string()));
		}

		users.next_id += 1;
		let id = LocalUserId::new(users.next_id);
		users.by_id.insert(
			id,
			StoredUser {
				id,
				username: user.username.clone(),
				email: user.email.clone(),
				fields: HashMap::new(),
			},
		);
		Ok(id)
	}

	async fn set_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
		value: &str,
	) -> Result<(), StoreError> {
		let mut users = self.lock()?;
		let user = users
			.by_id
			.get_mut(&uid)
			.ok_or_else(|| StoreError::NotFound(format!("user {uid}")))?;
		user.fields.insert(field.to_string(), value.to_string());
		Ok(())
	}

	async fn get_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
	) -> Result<Option<String>, StoreError> {
		let users = self.lock()?;
		Ok(users
			.by_id
			.get(&uid)
			.and_then(|u| u.fields.get(field).cloned()))
	}

	async fn remove_user_field(&self, uid: LocalUserId, field: &str) -> Result<(), StoreError> {
		let mut users = self.lock()?;
		if let Some(user) = users.by_id.get_mut(&uid) {
			user.fields.remove(field);
		}
		Ok(())
	}
}

/// Namespaced key/value store; insert-if-absent is atomic under the lock.
#[derive(Debug, Default)]
pub struct InMemoryMappingStore {
	inner: Mutex<HashMap<(String, String), String>>,
}

impl InMemoryMappingStore {
	pub fn new() -> Self {
		Self::default()
	}

	fn lock(&self) -> Result<MutexGuard<'_, HashMap<(String, String), String>>, StoreError> {
		self
			.inner
			.lock()
			.map_err(|_| StoreError::Conflict("mapping store lock poisoned".to_string()))
	}

	/// Number of keys in `namespace`.
	pub fn count(&self, namespace: &str) -> usize {
		self
			.lock()
			.map(|m| m.keys().filter(|(ns, _)| ns == namespace).count())
			.unwrap_or(0)
	}
}

#[async_trait]
impl MappingStore for InMemoryMappingStore {
	async fn get_object_field(
		&self,
		namespace: &str,
		key: &str,
	) -> Result<Option<String>, StoreError> {
		let map = self.lock()?;
		Ok(map.get(&(namespace.to_string(), key.to_string())).cloned())
	}

	async fn set_object_field(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<(), StoreError> {
		let mut map = self.lock()?;
		map.insert((namespace.to_string(), key.to_string()), value.to_string());
		Ok(())
	}

	async fn set_object_field_if_absent(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<bool, StoreError> {
		let mut map = self.lock()?;
		match map.entry((namespace.to_string(), key.to_string())) {
			Entry::Occupied(_) => Ok(false),
			Entry::Vacant(slot) => {
				slot.insert(value.to_string());
				Ok(true)
			}
		}
	}

	async fn delete_object_field(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
		let mut map = self.lock()?;
		map.remove(&(namespace.to_string(), key.to_string()));
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn new_user(username: &str, email: &str) -> NewLocalUser {
		NewLocalUser {
			username: username.to_string(),
			email: email.to_string(),
		}
	}

	#[tokio::test]
	async fn create_assigns_increasing_ids() {
		let store = InMemoryUserStore::new();
		let a = store.create_user(&new_user("alice", "a@x.com")).await.unwrap();
		let b = store.create_user(&new_user("bob", "b@x.com")).await.unwrap();
		assert!(b > a);
		assert_eq!(store.len(), 2);
	}

	#[tokio::test]
	async fn email_lookup_is_case_insensitive() {
		let store = InMemoryUserStore::new();
		let id = store.create_user(&new_user("alice", "Alice@X.com")).await.unwrap();
		assert_eq!(store.get_uid_by_email("alice@x.com").await.unwrap(), Some(id));
		assert_eq!(store.get_uid_by_email("nobody@x.com").await.unwrap(), None);
	}

	#[tokio::test]
	async fn duplicate_email_is_a_conflict() {
		let store = InMemoryUserStore::new();
		store.create_user(&new_user("alice", "a@x.com")).await.unwrap();
		let err = store
			.create_user(&new_user("alice2", "A@x.com"))
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::Conflict(_)));
	}

	#[tokio::test]
	async fn field_on_missing_user_is_not_found() {
		let store = InMemoryUserStore::new();
		let err = store
			.set_user_field(LocalUserId::new(99), "twtId", "x")
			.await
			.unwrap_err();
		assert!(matches!(err, StoreError::NotFound(_)));
	}

	#[tokio::test]
	async fn insert_if_absent_keeps_first_value() {
		let store = InMemoryMappingStore::new();
		assert!(store.set_object_field_if_absent("ns", "k", "1").await.unwrap());
		assert!(!store.set_object_field_if_absent("ns", "k", "2").await.unwrap());
		assert_eq!(
			store.get_object_field("ns", "k").await.unwrap().as_deref(),
			Some("1")
		);
	}

	#[tokio::test]
	async fn namespaces_are_isolated() {
		let store = InMemoryMappingStore::new();
		store.set_object_field("a", "k", "1").await.unwrap();
		assert_eq!(store.get_object_field("b", "k").await.unwrap(), None);
		assert_eq!(store.count("a"), 1);
		store.delete_object_field("a", "k").await.unwrap();
		store.delete_object_field("a", "k").await.unwrap();
		assert_eq!(store.count("a"), 0);
	}
}
