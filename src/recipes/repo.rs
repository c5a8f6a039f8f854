use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::OffsetDateTime;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "recipe_visibility", rename_all = "lowercase")]
#[serde(rename_all = "lowercase")]
pub enum RecipeVisibility {
    Private,
    Family,
    Public,
}

#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct Recipe {
    pub id: Uuid,
    pub user_id: Uuid,
    pub family_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub visibility: RecipeVisibility,
    pub image_path: Option<String>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
    pub created_at: OffsetDateTime,
}

pub struct NewRecipe<'a> {
    pub user_id: Uuid,
    pub family_id: Option<Uuid>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub visibility: RecipeVisibility,
    pub image_path: Option<&'a str>,
    pub prep_time: Option<i32>,
    pub cook_time: Option<i32>,
    pub servings: Option<i32>,
}

impl Recipe {
    pub async fn create(db: &PgPool, new: NewRecipe<'_>) -> anyhow::Result<Recipe> {
        let recipe = sqlx::query_as::<_, Recipe>(
            r#"
            INSERT INTO recipes
                (user_id, family_id, title, description, visibility,
                 image_path, prep_time, cook_time, servings)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING id, user_id, family_id, title, description, visibility,
                      image_path, prep_time, cook_time, servings, created_at
            "#,
        )
        .bind(new.user_id)
        .bind(new.family_id)
        .bind(new.title)
        .bind(new.description)
        .bind(new.visibility)
        .bind(new.image_path)
        .bind(new.prep_time)
        .bind(new.cook_time)
        .bind(new.servings)
        .fetch_one(db)
        .await?;
        Ok(recipe)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn visibility_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&RecipeVisibility::Private).unwrap(),
            "\"private\""
        );
        assert_eq!(
            serde_json::to_string(&RecipeVisibility::Family).unwrap(),
            "\"family\""
        );
        assert_eq!(
            serde_json::to_string(&RecipeVisibility::Public).unwrap(),
            "\"public\""
        );
    }
}
