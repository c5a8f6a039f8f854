use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument, warn};

use crate::auth::{
    dto::{AuthData, LoginRequest, PublicUser, RegisterRequest, TokenData},
    extractors::CurrentUser,
    password::{hash_password, verify_password},
    repo::{AccessToken, User},
    token::{generate_token, hash_token},
    validate::{is_valid_email, password_meets_policy},
};
use crate::error::{ApiError, ValidationBag};
use crate::response::{self, ApiResponse};
use crate::state::AppState;

const TOKEN_NAME: &str = "auth_token";

pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(register))
        .route("/login", post(login))
        .route("/logout", post(logout))
        .route("/refresh-token", post(refresh_token))
}

#[instrument(skip(state, payload))]
pub async fn register(
    State(state): State<AppState>,
    Json(mut payload): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<ApiResponse<AuthData>>), ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    let mut bag = ValidationBag::new();
    if payload.name.trim().is_empty() {
        bag.add("name", "The name field is required.");
    } else if payload.name.len() > 255 {
        bag.add("name", "The name may not be greater than 255 characters.");
    }
    if !is_valid_email(&payload.email) {
        bag.add("email", "The email must be a valid email address.");
    }
    if !password_meets_policy(&payload.password) {
        bag.add(
            "password",
            "The password must be at least 8 characters and contain a letter and a number.",
        );
    }
    if payload.password != payload.password_confirmation {
        bag.add("password", "The password confirmation does not match.");
    }
    if User::find_by_email(&state.db, &payload.email).await?.is_some() {
        warn!(email = %payload.email, "email already registered");
        bag.add("email", "The email has already been taken.");
    }
    bag.finish()?;

    let hash = hash_password(&payload.password)?;
    let user = User::create(&state.db, payload.name.trim(), &payload.email, &hash).await?;

    let secret = generate_token();
    AccessToken::issue(&state.db, user.id, TOKEN_NAME, &hash_token(&secret)).await?;

    info!(user_id = %user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        response::ok(
            "User registered successfully.",
            AuthData {
                user: PublicUser::from(&user),
                token: secret,
            },
        ),
    ))
}

#[instrument(skip(state, payload))]
pub async fn login(
    State(state): State<AppState>,
    Json(mut payload): Json<LoginRequest>,
) -> Result<Json<ApiResponse<AuthData>>, ApiError> {
    payload.email = payload.email.trim().to_lowercase();

    // One message for both unknown email and bad password, so the
    // endpoint cannot be used to enumerate accounts.
    let invalid = || ApiError::Authentication("Invalid credentials.".into());

    let user = User::find_by_email(&state.db, &payload.email)
        .await?
        .ok_or_else(|| {
            warn!(email = %payload.email, "login unknown email");
            invalid()
        })?;

    if !verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = %user.id, "login invalid password");
        return Err(invalid());
    }

    // Revoke every prior session, then issue the single replacement.
    let secret = generate_token();
    AccessToken::rotate_all(&state.db, user.id, TOKEN_NAME, &hash_token(&secret)).await?;

    info!(user_id = %user.id, "user logged in");
    Ok(response::ok(
        "User logged in successfully.",
        AuthData {
            user: PublicUser::from(&user),
            token: secret,
        },
    ))
}

#[instrument(skip(state, current))]
pub async fn logout(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<()>>, ApiError> {
    AccessToken::revoke(&state.db, current.token_id).await?;
    info!(user_id = %current.user.id, "user logged out");
    Ok(response::message_only("Logged out successfully."))
}

#[instrument(skip(state, current))]
pub async fn refresh_token(
    State(state): State<AppState>,
    current: CurrentUser,
) -> Result<Json<ApiResponse<TokenData>>, ApiError> {
    let secret = generate_token();
    AccessToken::rotate_one(
        &state.db,
        current.token_id,
        current.user.id,
        TOKEN_NAME,
        &hash_token(&secret),
    )
    .await?;

    info!(user_id = %current.user.id, "token refreshed");
    Ok(response::ok(
        "Token refreshed successfully.",
        TokenData { token: secret },
    ))
}
