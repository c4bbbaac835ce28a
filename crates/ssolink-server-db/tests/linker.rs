// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Identity linking against the SQLite repositories.

use std::sync::Arc;

use ssolink_server_db::testing::create_test_pool;
use ssolink_server_db::{MappingRepository, UserRepository};
use ssolink_server_link::{
	ExternalIdentity, IdentityLinker, LinkError, LinkOutcome, LinkerConfig, NewLocalUser,
	ProviderError, UserStore,
};

async fn setup() -> (IdentityLinker, UserRepository, MappingRepository) {
	let pool = create_test_pool().await.unwrap();
	let users = UserRepository::new(pool.clone());
	let mappings = MappingRepository::new(pool);
	let linker = IdentityLinker::new(
		LinkerConfig::new("twt"),
		Arc::new(users.clone()),
		Arc::new(mappings.clone()),
	)
	.unwrap();
	(linker, users, mappings)
}

#[tokio::test]
async fn first_login_creates_then_reuses_account() {
	let (linker, users, mappings) = setup().await;
	let identity = ExternalIdentity::new("E1", "alice", "a@x.com");

	let created = linker.resolve(&identity).await.unwrap();
	let again = linker.resolve(&identity).await.unwrap();

	assert_eq!(created.outcome, LinkOutcome::Created);
	assert_eq!(again.outcome, LinkOutcome::Existing);
	assert_eq!(again.local_user_id, created.local_user_id);
	assert_eq!(users.count_users().await.unwrap(), 1);
	assert_eq!(mappings.count_namespace("twtId:uid").await.unwrap(), 1);
	assert_eq!(
		users
			.get_user_field(created.local_user_id, "twtId")
			.await
			.unwrap()
			.as_deref(),
		Some("E1")
	);
}

#[tokio::test]
async fn merges_into_account_with_same_email() {
	let (linker, users, _) = setup().await;
	let bob = UserStore::create_user(
		&users,
		&NewLocalUser {
			username: "bob".to_string(),
			email: "Bob@X.com".to_string(),
		},
	)
	.await
	.unwrap();

	let resolution = linker
		.resolve(&ExternalIdentity::new("E2", "bobby", "bob@x.com"))
		.await
		.unwrap();

	assert_eq!(resolution.local_user_id, bob);
	assert_eq!(resolution.outcome, LinkOutcome::Merged);
	assert_eq!(users.get_username(bob).await.unwrap().as_deref(), Some("bob"));
}

#[tokio::test]
async fn unlink_clears_mapping_and_field() {
	let (linker, users, mappings) = setup().await;
	let uid = linker
		.resolve(&ExternalIdentity::new("E1", "alice", "a@x.com"))
		.await
		.unwrap()
		.local_user_id;

	assert_eq!(linker.unlink(uid).await.unwrap(), uid);
	assert_eq!(linker.unlink(uid).await.unwrap(), uid);

	assert_eq!(linker.lookup_local_id("E1").await.unwrap(), None);
	assert_eq!(users.get_user_field(uid, "twtId").await.unwrap(), None);
	assert_eq!(mappings.count_namespace("twtId:uid").await.unwrap(), 0);
}

#[tokio::test]
async fn account_linked_to_another_identity_is_not_merged() {
	let (linker, users, mappings) = setup().await;
	let uid = linker
		.resolve(&ExternalIdentity::new("E1", "alice", "a@x.com"))
		.await
		.unwrap()
		.local_user_id;

	let err = linker
		.resolve(&ExternalIdentity::new("E2", "mallory", "A@x.com"))
		.await
		.unwrap_err();

	assert!(matches!(err, LinkError::AlreadyLinked { user_id } if user_id == uid));
	assert_eq!(
		users.get_user_field(uid, "twtId").await.unwrap().as_deref(),
		Some("E1")
	);

	linker.unlink(uid).await.unwrap();
	assert_eq!(mappings.count_namespace("twtId:uid").await.unwrap(), 0);
}

#[tokio::test]
async fn blank_email_is_rejected_before_any_write() {
	let (linker, users, _) = setup().await;

	for identity in [
		ExternalIdentity::new("E1", "alice", ""),
		ExternalIdentity::new("E2", "mallory", ""),
	] {
		let err = linker.resolve(&identity).await.unwrap_err();
		assert!(matches!(
			err,
			LinkError::Provider(ProviderError::InvalidAssertion(_))
		));
	}
	assert_eq!(users.count_users().await.unwrap(), 0);
}
