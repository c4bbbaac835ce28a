// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use ssolink_server_link::StoreError;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
	#[error("Database error: {0}")]
	Sqlx(#[from] sqlx::Error),

	#[error("Not found: {0}")]
	NotFound(String),

	#[error("Conflict: {0}")]
	Conflict(String),

	#[error("Internal: {0}")]
	Internal(String),
}

pub type Result<T> = std::result::Result<T, DbError>;

impl From<DbError> for StoreError {
	fn from(err: DbError) -> Self {
		match err {
			DbError::NotFound(what) => StoreError::NotFound(what),
			DbError::Conflict(what) => StoreError::Conflict(what),
			DbError::Sqlx(sqlx::Error::Database(ref db_err)) if db_err.is_unique_violation() => {
				StoreError::Conflict(db_err.message().to_string())
			}
			other => StoreError::backend(other),
		}
	}
}
