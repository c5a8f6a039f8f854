use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use tracing::warn;
use uuid::Uuid;

use crate::auth::repo::{AccessToken, User};
use crate::auth::token::hash_token;
use crate::error::ApiError;
use crate::state::AppState;

/// Resolves `Authorization: Bearer <token>` to the acting user plus the
/// id of the token that authenticated this request. Every protected
/// handler takes this explicitly; there is no ambient auth context.
pub struct CurrentUser {
    pub user: User,
    pub token_id: Uuid,
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let auth = parts
            .headers
            .get(axum::http::header::AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .ok_or_else(ApiError::unauthenticated)?;

        let secret = auth
            .strip_prefix("Bearer ")
            .or_else(|| auth.strip_prefix("bearer "))
            .ok_or_else(ApiError::unauthenticated)?;

        let token = AccessToken::find_by_hash(&state.db, &hash_token(secret))
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(|| {
                warn!("bearer token not recognized");
                ApiError::unauthenticated()
            })?;

        let user = User::find_by_id(&state.db, token.user_id)
            .await
            .map_err(ApiError::Internal)?
            .ok_or_else(ApiError::unauthenticated)?;

        Ok(CurrentUser {
            user,
            token_id: token.id,
        })
    }
}
