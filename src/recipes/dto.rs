use serde::Deserialize;
use uuid::Uuid;

use crate::recipes::repo::RecipeVisibility;

#[derive(Debug, Deserialize)]
pub struct CreateRecipeRequest {
    pub title: String,
    pub description: Option<String>,
    pub visibility: Option<RecipeVisibility>,
    pub family_id: Option<Uuid>,
    pub image_path: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
}
