// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! SQLite persistence for accounts and identity mappings.

pub mod error;
pub mod mapping;
pub mod pool;
pub mod testing;
pub mod user;

pub use error::{DbError, Result};
pub use mapping::MappingRepository;
pub use pool::{create_pool, run_migrations};
pub use user::UserRepository;
