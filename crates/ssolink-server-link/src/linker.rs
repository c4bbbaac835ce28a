// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Resolution of external identities to local accounts.
//!
//! A first login goes mapping lookup, then email lookup, then merge or
//! create, then the mapping and user field writes. The mapping insert is a
//! compare-and-set; a resolution that loses it re-reads once and adopts the
//! winner's account.

use std::sync::Arc;

use crate::error::{LinkError, ProviderError, StorageStage, StoreError};
use crate::store::{mapping_namespace, orphan_field, provider_field, MappingStore, UserStore};
use crate::types::{
	ExternalIdentity, IdentityMapping, LinkOutcome, LocalUserId, NewLocalUser, Resolution,
};

/// Per-provider linker settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkerConfig {
	/// Short provider name, e.g. `twt`. Prefixes every stored key.
	pub provider: String,
	/// Attach first logins to an existing account with the same email.
	pub merge_by_email: bool,
}

impl LinkerConfig {
	pub fn new(provider: impl Into<String>) -> Self {
		Self {
			provider: provider.into(),
			merge_by_email: true,
		}
	}

	pub fn with_merge_by_email(mut self, merge_by_email: bool) -> Self {
		self.merge_by_email = merge_by_email;
		self
	}
}

enum ConflictOutcome {
	Merge(LocalUserId),
	Settled(Resolution),
}

pub struct IdentityLinker {
	provider: String,
	namespace: String,
	field: String,
	orphan_field: String,
	merge_by_email: bool,
	users: Arc<dyn UserStore>,
	mappings: Arc<dyn MappingStore>,
}

impl std::fmt::Debug for IdentityLinker {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("IdentityLinker")
			.field("provider", &self.provider)
			.field("merge_by_email", &self.merge_by_email)
			.finish_non_exhaustive()
	}
}

impl IdentityLinker {
	/// Provider names must be non-empty ASCII alphanumerics; they become part
	/// of stored keys.
	pub fn new(
		config: LinkerConfig,
		users: Arc<dyn UserStore>,
		mappings: Arc<dyn MappingStore>,
	) -> Result<Self, LinkError> {
		let provider = config.provider;
		if provider.is_empty() || !provider.chars().all(|c| c.is_ascii_alphanumeric()) {
			return Err(LinkError::Configuration(format!(
				"invalid provider name {provider:?}"
			)));
		}

		Ok(Self {
			namespace: mapping_namespace(&provider),
			field: provider_field(&provider),
			orphan_field: orphan_field(&provider),
			provider,
			merge_by_email: config.merge_by_email,
			users,
			mappings,
		})
	}

	pub fn provider(&self) -> &str {
		&self.provider
	}

	/// Name of the user field holding the external id.
	pub fn field_name(&self) -> &str {
		&self.field
	}

	/// Map an authenticated identity to its local account, creating or merging
	/// on first sight.
	#[tracing::instrument(
		skip(self, identity),
		fields(provider = %self.provider, external_id = %identity.external_id)
	)]
	pub async fn resolve(&self, identity: &ExternalIdentity) -> Result<Resolution, LinkError> {
		if identity.external_id.trim().is_empty() {
			return Err(ProviderError::InvalidAssertion(
				"identity assertion is missing an id".to_string(),
			)
			.into());
		}

		if let Some(uid) = self.lookup_local_id(&identity.external_id).await? {
			tracing::debug!(user_id = %uid, "external identity already linked");
			return Ok(Resolution {
				local_user_id: uid,
				outcome: LinkOutcome::Existing,
			});
		}

		if identity.email.trim().is_empty() {
			return Err(ProviderError::InvalidAssertion(
				"identity assertion is missing an email".to_string(),
			)
			.into());
		}

		let (uid, outcome) = match self.find_by_email(identity).await? {
			Some(uid) => (self.merge_target(identity, uid).await?, LinkOutcome::Merged),
			None => {
				let new_user = NewLocalUser {
					username: identity.handle.clone(),
					email: identity.email.clone(),
				};
				match self.users.create_user(&new_user).await {
					Ok(uid) => (uid, LinkOutcome::Created),
					Err(StoreError::Conflict(reason)) => {
						match self.after_create_conflict(identity, reason).await? {
							ConflictOutcome::Merge(uid) => (uid, LinkOutcome::Merged),
							ConflictOutcome::Settled(resolution) => return Ok(resolution),
						}
					}
					Err(source) => {
						return Err(LinkError::Storage {
							stage: StorageStage::CreateUser,
							source,
						})
					}
				}
			}
		};

		self.link(identity, uid, outcome).await
	}

	async fn find_by_email(&self, identity: &ExternalIdentity) -> Result<Option<LocalUserId>, LinkError> {
		self
			.users
			.get_uid_by_email(&identity.email)
			.await
			.map_err(LinkError::at(StorageStage::EmailLookup))
	}

	/// Check that `uid` may take this identity: merging must be enabled and the
	/// account must not carry another external id of this provider.
	async fn merge_target(
		&self,
		identity: &ExternalIdentity,
		uid: LocalUserId,
	) -> Result<LocalUserId, LinkError> {
		if !self.merge_by_email {
			tracing::warn!(user_id = %uid, "email matches an existing account; merging is disabled");
			return Err(LinkError::MergeRefused {
				email: identity.email.clone(),
			});
		}

		let linked = self
			.users
			.get_user_field(uid, &self.field)
			.await
			.map_err(LinkError::at(StorageStage::ReadUserField))?;
		match linked {
			Some(other) if other != identity.external_id => {
				tracing::warn!(user_id = %uid, "email matches an account linked to another identity");
				Err(LinkError::AlreadyLinked { user_id: uid })
			}
			_ => Ok(uid),
		}
	}

	/// Account creation hit a uniqueness conflict. A concurrent login for the
	/// same identity has either finished linking or registered the email first;
	/// in the latter case its account becomes the merge target.
	async fn after_create_conflict(
		&self,
		identity: &ExternalIdentity,
		reason: String,
	) -> Result<ConflictOutcome, LinkError> {
		if let Some(winner) = self.lookup_local_id(&identity.external_id).await? {
			tracing::debug!(user_id = %winner, "lost account creation race");
			return Ok(ConflictOutcome::Settled(Resolution {
				local_user_id: winner,
				outcome: LinkOutcome::RaceLost { orphan: None },
			}));
		}

		match self.find_by_email(identity).await? {
			Some(uid) => Ok(ConflictOutcome::Merge(self.merge_target(identity, uid).await?)),
			None => Err(LinkError::Storage {
				stage: StorageStage::CreateUser,
				source: StoreError::Conflict(reason),
			}),
		}
	}

	async fn link(
		&self,
		identity: &ExternalIdentity,
		uid: LocalUserId,
		outcome: LinkOutcome,
	) -> Result<Resolution, LinkError> {
		let inserted = self
			.mappings
			.set_object_field_if_absent(&self.namespace, &identity.external_id, &uid.to_string())
			.await
			.map_err(LinkError::at(StorageStage::MappingWrite))?;

		if !inserted {
			return self.settle_lost_race(identity, uid, outcome).await;
		}

		if let Err(source) = self
			.users
			.set_user_field(uid, &self.field, &identity.external_id)
			.await
		{
			if let Err(cleanup) = self
				.mappings
				.delete_object_field(&self.namespace, &identity.external_id)
				.await
			{
				tracing::error!(
					user_id = %uid,
					error = %cleanup,
					"failed to remove mapping after user field write failed"
				);
			}
			return Err(LinkError::Storage {
				stage: StorageStage::SetUserField,
				source,
			});
		}

		match outcome {
			LinkOutcome::Merged => {
				tracing::info!(user_id = %uid, "linked external identity to existing account by email")
			}
			_ => tracing::info!(user_id = %uid, "created account for external identity"),
		}

		Ok(Resolution {
			local_user_id: uid,
			outcome,
		})
	}

	async fn settle_lost_race(
		&self,
		identity: &ExternalIdentity,
		uid: LocalUserId,
		outcome: LinkOutcome,
	) -> Result<Resolution, LinkError> {
		let winner = self
			.lookup_local_id(&identity.external_id)
			.await?
			.ok_or_else(|| LinkError::Storage {
				stage: StorageStage::MappingLookup,
				source: StoreError::NotFound(format!(
					"mapping for {} vanished after a lost write",
					identity.external_id
				)),
			})?;

		let orphan = match outcome {
			LinkOutcome::Created if winner != uid => Some(uid),
			_ => None,
		};

		if let Some(orphan) = orphan {
			self
				.users
				.set_user_field(orphan, &self.orphan_field, &identity.external_id)
				.await
				.map_err(LinkError::at(StorageStage::FlagOrphan))?;
			tracing::warn!(
				user_id = %winner,
				orphan_id = %orphan,
				"lost mapping race; created account left orphaned"
			);
		} else {
			tracing::debug!(user_id = %winner, "lost mapping race");
		}

		Ok(Resolution {
			local_user_id: winner,
			outcome: LinkOutcome::RaceLost { orphan },
		})
	}

	/// Read-only mapping lookup.
	#[tracing::instrument(skip(self), fields(provider = %self.provider))]
	pub async fn lookup_local_id(&self, external_id: &str) -> Result<Option<LocalUserId>, LinkError> {
		Ok(self
			.mapping(external_id)
			.await?
			.map(|mapping| mapping.local_user_id))
	}

	/// The stored mapping for `external_id`, if any.
	pub async fn mapping(&self, external_id: &str) -> Result<Option<IdentityMapping>, LinkError> {
		let stored = self
			.mappings
			.get_object_field(&self.namespace, external_id)
			.await
			.map_err(LinkError::at(StorageStage::MappingLookup))?;

		let Some(value) = stored else {
			return Ok(None);
		};
		let local_user_id = value.parse::<LocalUserId>().map_err(|_| LinkError::Storage {
			stage: StorageStage::MappingLookup,
			source: StoreError::Corrupt(format!("mapping value {value:?} is not a user id")),
		})?;

		Ok(Some(IdentityMapping {
			external_id: external_id.to_string(),
			local_user_id,
		}))
	}

	/// Remove this provider's linkage from an account. Unlinked accounts are a
	/// no-op.
	#[tracing::instrument(skip(self), fields(provider = %self.provider, user_id = %uid))]
	pub async fn unlink(&self, uid: LocalUserId) -> Result<LocalUserId, LinkError> {
		let external_id = self
			.users
			.get_user_field(uid, &self.field)
			.await
			.map_err(|source| self.unlink_failed(uid, StorageStage::ReadUserField, source))?;

		let Some(external_id) = external_id else {
			tracing::debug!("account has no linked external identity");
			return Ok(uid);
		};

		self
			.mappings
			.delete_object_field(&self.namespace, &external_id)
			.await
			.map_err(|source| self.unlink_failed(uid, StorageStage::MappingDelete, source))?;

		self
			.users
			.remove_user_field(uid, &self.field)
			.await
			.map_err(|source| self.unlink_failed(uid, StorageStage::ClearUserField, source))?;

		tracing::info!("external identity unlinked");
		Ok(uid)
	}

	fn unlink_failed(&self, uid: LocalUserId, stage: StorageStage, source: StoreError) -> LinkError {
		tracing::error!(
			provider = %self.provider,
			user_id = %uid,
			%stage,
			error = %source,
			"could not remove external identity data"
		);
		LinkError::Storage { stage, source }
	}
}
