//! User route handlers.

use axum::{
    extract::{Query, State},
    response::Response,
};
use tracing::instrument;

use super::{JsonBody, ListQuery, list};
use crate::error::Result;
use crate::models::{RegisterUserRequest, UserEntity, UserView};
use crate::services::hash_password;
use crate::state::AppState;
use crate::store::Table;

/// Register a user keyed by email.
///
/// A second registration with the same email fails as a server error.
#[instrument(skip_all)]
pub async fn register(
    State(state): State<AppState>,
    JsonBody(body): JsonBody<RegisterUserRequest>,
) -> Result<String> {
    let user = body.validate()?;
    tracing::info!(email = %user.email, "registering user");

    let hashed_password = hash_password(&user.password)?;
    let entity = UserEntity::new(user, hashed_password);

    Table::<UserEntity>::new(state.store(), state.config().scan_page_size)
        .insert(&entity)
        .await?;

    Ok(format!(
        "User {} {} registered successfully.",
        entity.name, entity.surname
    ))
}

/// List users without their password hashes.
#[instrument(skip(state))]
pub async fn list_users(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Response> {
    list::<UserEntity, UserView>(&state, &query, |row| row.map(UserView::from)).await
}
