// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Linking of third-party SSO identities to local accounts.
//!
//! [`IdentityLinker`] maps an authenticated [`ExternalIdentity`] to a
//! [`LocalUserId`], creating an account or merging into one found by email
//! on first login, and removes the linkage again on account deletion. It
//! works against the host's storage through [`UserStore`] and
//! [`MappingStore`].
//!
//! [`SsoProvider`] and [`StrategyRegistry`] wrap linkers into the surface the
//! HTTP server exposes.

pub mod error;
pub mod linker;
pub mod memory;
pub mod provider;
pub mod store;
pub mod types;

pub use error::{BoxError, LinkError, ProviderError, StorageStage, StoreError};
pub use linker::{IdentityLinker, LinkerConfig};
pub use memory::{InMemoryMappingStore, InMemoryUserStore, StoredUser};
pub use provider::{AuthProvider, IdentityClient, SsoProvider, Strategy, StrategyRegistry};
pub use store::{mapping_namespace, orphan_field, provider_field, MappingStore, UserStore};
pub use types::{ExternalIdentity, IdentityMapping, LinkOutcome, LocalUserId, NewLocalUser, Resolution};
