// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! User repository.
//!
//! Accounts carry a unique username and a unique, case-insensitive email.
//! Provider linkage lives in `user_fields` as free-form key/value pairs.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use ssolink_server_link::{LocalUserId, NewLocalUser, StoreError, UserStore};

use crate::error::DbError;

/// Repository for user and user field operations.
#[derive(Clone)]
pub struct UserRepository {
	pool: SqlitePool,
}

impl UserRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self, email))]
	pub async fn get_uid_by_email(&self, email: &str) -> Result<Option<LocalUserId>, DbError> {
		let row: Option<(i64,)> = sqlx::query_as("SELECT id FROM users WHERE email = ?")
			.bind(email)
			.fetch_optional(&self.pool)
			.await?;

		if let Some((id,)) = row {
			tracing::debug!(user_id = id, "user found by email");
		}
		Ok(row.map(|(id,)| LocalUserId::new(id)))
	}

	/// Insert a user. Duplicate usernames or emails are a `Conflict`.
	#[tracing::instrument(skip(self, user))]
	pub async fn create_user(&self, user: &NewLocalUser) -> Result<LocalUserId, DbError> {
		if user.username.trim().is_empty() {
			return Err(DbError::Conflict("username cannot be empty".to_string()));
		}

		let result = sqlx::query("INSERT INTO users (username, email) VALUES (?, ?)")
			.bind(&user.username)
			.bind(&user.email)
			.execute(&self.pool)
			.await
			.map_err(|e| match e {
				sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
					DbError::Conflict("username or email already registered".to_string())
				}
				_ => DbError::Sqlx(e),
			})?;

		let id = LocalUserId::new(result.last_insert_rowid());
		tracing::debug!(user_id = %id, "user created");
		Ok(id)
	}

	#[tracing::instrument(skip(self, value), fields(user_id = %uid))]
	pub async fn set_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
		value: &str,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO user_fields (user_id, field, value) VALUES (?, ?, ?)
			ON CONFLICT (user_id, field) DO UPDATE SET value = excluded.value
			"#,
		)
		.bind(uid.get())
		.bind(field)
		.bind(value)
		.execute(&self.pool)
		.await
		.map_err(|e| match e {
			sqlx::Error::Database(ref db_err) if db_err.is_foreign_key_violation() => {
				DbError::NotFound(format!("user {uid}"))
			}
			_ => DbError::Sqlx(e),
		})?;

		Ok(())
	}

	#[tracing::instrument(skip(self), fields(user_id = %uid))]
	pub async fn get_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
	) -> Result<Option<String>, DbError> {
		let row: Option<(String,)> =
			sqlx::query_as("SELECT value FROM user_fields WHERE user_id = ? AND field = ?")
				.bind(uid.get())
				.bind(field)
				.fetch_optional(&self.pool)
				.await?;

		Ok(row.map(|(value,)| value))
	}

	#[tracing::instrument(skip(self), fields(user_id = %uid))]
	pub async fn remove_user_field(&self, uid: LocalUserId, field: &str) -> Result<(), DbError> {
		sqlx::query("DELETE FROM user_fields WHERE user_id = ? AND field = ?")
			.bind(uid.get())
			.bind(field)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	pub async fn count_users(&self) -> Result<i64, DbError> {
		let (count,): (i64,) = sqlx::query_as("SELECT COUNT(*) FROM users")
			.fetch_one(&self.pool)
			.await?;
		Ok(count)
	}

	pub async fn get_username(&self, uid: LocalUserId) -> Result<Option<String>, DbError> {
		let row: Option<(String,)> = sqlx::query_as("SELECT username FROM users WHERE id = ?")
			.bind(uid.get())
			.fetch_optional(&self.pool)
			.await?;
		Ok(row.map(|(username,)| username))
	}
}

#[async_trait]
impl UserStore for UserRepository {
	async fn get_uid_by_email(&self, email: &str) -> Result<Option<LocalUserId>, StoreError> {
		Ok(self.get_uid_by_email(email).await?)
	}

	async fn create_user(&self, user: &NewLocalUser) -> Result<LocalUserId, StoreError> {
		Ok(self.create_user(user).await?)
	}

	async fn set_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
		value: &str,
	) -> Result<(), StoreError> {
		Ok(self.set_user_field(uid, field, value).await?)
	}

	async fn get_user_field(
		&self,
		uid: LocalUserId,
		field: &str,
	) -> Result<Option<String>, StoreError> {
		Ok(self.get_user_field(uid, field).await?)
	}

	async fn remove_user_field(&self, uid: LocalUserId, field: &str) -> Result<(), StoreError> {
		Ok(self.remove_user_field(uid, field).await?)
	}
}
