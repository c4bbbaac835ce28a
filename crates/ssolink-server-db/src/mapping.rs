// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

//! Namespaced object field repository backing identity mappings.

use async_trait::async_trait;
use sqlx::sqlite::SqlitePool;
use ssolink_server_link::{MappingStore, StoreError};

use crate::error::DbError;

#[derive(Clone)]
pub struct MappingRepository {
	pool: SqlitePool,
}

impl MappingRepository {
	pub fn new(pool: SqlitePool) -> Self {
		Self { pool }
	}

	#[tracing::instrument(skip(self))]
	pub async fn get_object_field(
		&self,
		namespace: &str,
		key: &str,
	) -> Result<Option<String>, DbError> {
		let row: Option<(String,)> =
			sqlx::query_as("SELECT value FROM object_fields WHERE namespace = ? AND key = ?")
				.bind(namespace)
				.bind(key)
				.fetch_optional(&self.pool)
				.await?;

		Ok(row.map(|(value,)| value))
	}

	#[tracing::instrument(skip(self, value))]
	pub async fn set_object_field(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<(), DbError> {
		sqlx::query(
			r#"
			INSERT INTO object_fields (namespace, key, value) VALUES (?, ?, ?)
			ON CONFLICT (namespace, key) DO UPDATE SET value = excluded.value
			"#,
		)
		.bind(namespace)
		.bind(key)
		.bind(value)
		.execute(&self.pool)
		.await?;

		Ok(())
	}

	/// Insert unless the key exists. Returns whether this call inserted.
	#[tracing::instrument(skip(self, value))]
	pub async fn set_object_field_if_absent(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<bool, DbError> {
		let result = sqlx::query(
			r#"
			INSERT INTO object_fields (namespace, key, value) VALUES (?, ?, ?)
			ON CONFLICT (namespace, key) DO NOTHING
			"#,
		)
		.bind(namespace)
		.bind(key)
		.bind(value)
		.execute(&self.pool)
		.await?;

		let inserted = result.rows_affected() == 1;
		if !inserted {
			tracing::debug!("object field already set");
		}
		Ok(inserted)
	}

	#[tracing::instrument(skip(self))]
	pub async fn delete_object_field(&self, namespace: &str, key: &str) -> Result<(), DbError> {
		sqlx::query("DELETE FROM object_fields WHERE namespace = ? AND key = ?")
			.bind(namespace)
			.bind(key)
			.execute(&self.pool)
			.await?;

		Ok(())
	}

	pub async fn count_namespace(&self, namespace: &str) -> Result<i64, DbError> {
		let (count,): (i64,) =
			sqlx::query_as("SELECT COUNT(*) FROM object_fields WHERE namespace = ?")
				.bind(namespace)
				.fetch_one(&self.pool)
				.await?;
		Ok(count)
	}
}

#[async_trait]
impl MappingStore for MappingRepository {
	async fn get_object_field(
		&self,
		namespace: &str,
		key: &str,
	) -> Result<Option<String>, StoreError> {
		Ok(self.get_object_field(namespace, key).await?)
	}

	async fn set_object_field(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<(), StoreError> {
		Ok(self.set_object_field(namespace, key, value).await?)
	}

	async fn set_object_field_if_absent(
		&self,
		namespace: &str,
		key: &str,
		value: &str,
	) -> Result<bool, StoreError> {
		Ok(self.set_object_field_if_absent(namespace, key, value).await?)
	}

	async fn delete_object_field(&self, namespace: &str, key: &str) -> Result<(), StoreError> {
		Ok(self.delete_object_field(namespace, key).await?)
	}
}
