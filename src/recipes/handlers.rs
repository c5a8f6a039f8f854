use axum::{extract::State, http::StatusCode, routing::post, Json, Router};
use tracing::{info, instrument};

use crate::auth::extractors::CurrentUser;
use crate::error::{ApiError, ValidationBag};
use crate::families::repo::Family;
use crate::recipes::{
    dto::CreateRecipeRequest,
    repo::{NewRecipe, Recipe, RecipeVisibility},
};
use crate::response::{self, ApiResponse};
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/recipes", post(create_recipe))
}

#[instrument(skip(state, current, payload))]
pub async fn create_recipe(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(payload): Json<CreateRecipeRequest>,
) -> Result<(StatusCode, Json<ApiResponse<Recipe>>), ApiError> {
    let title = payload.title.trim();

    let mut bag = ValidationBag::new();
    if title.len() < 3 || title.len() > 255 {
        bag.add("title", "The title must be between 3 and 255 characters.");
    }
    if matches!(payload.prep_time, Some(t) if t < 0) {
        bag.add("prep_time", "The prep time may not be negative.");
    }
    if matches!(payload.cook_time, Some(t) if t < 0) {
        bag.add("cook_time", "The cook time may not be negative.");
    }
    if matches!(payload.servings, Some(s) if s < 1) {
        bag.add("servings", "The servings must be at least 1.");
    }
    bag.finish()?;

    if let Some(family_id) = payload.family_id {
        Family::find(&state.db, family_id)
            .await?
            .ok_or(ApiError::NotFound("Family"))?;
    }

    let recipe = Recipe::create(
        &state.db,
        NewRecipe {
            user_id: current.user.id,
            family_id: payload.family_id,
            title,
            description: payload.description.as_deref(),
            visibility: payload.visibility.unwrap_or(RecipeVisibility::Private),
            image_path: payload.image_path.as_deref(),
            prep_time: payload.prep_time,
            cook_time: payload.cook_time,
            servings: payload.servings,
        },
    )
    .await?;

    info!(recipe_id = %recipe.id, user_id = %current.user.id, "recipe created");
    Ok((
        StatusCode::CREATED,
        response::ok("Recipe created successfully.", recipe),
    ))
}
