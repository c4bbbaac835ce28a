// Copyright (c) 2025 Geoffrey Huntley <ghuntley@ghuntley.com>. All rights reserved.
// SPDX-License-Identifier: Proprietary

use axum::{
	extract::{Path, State},
	Json,
};
use serde::Serialize;
use ssolink_server_link::LocalUserId;

use crate::{api::AppState, error::ServerError};

#[derive(Debug, Serialize)]
pub struct DeleteUserDataResponse {
	pub uid: LocalUserId,
}

/// DELETE /api/users/{uid}/sso - remove every provider link from an account.
///
/// Called by the host while deleting an account; succeeds for accounts that
/// were never linked.
#[tracing::instrument(skip(state))]
pub async fn delete_user_data(
	State(state): State<AppState>,
	Path(uid): Path<i64>,
) -> Result<Json<DeleteUserDataResponse>, ServerError> {
	let uid = state.registry.unlink_all(LocalUserId::new(uid)).await?;
	Ok(Json(DeleteUserDataResponse { uid }))
}
