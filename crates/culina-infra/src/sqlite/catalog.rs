//! SQLite recipe catalog implementation.
//!
//! Implements `RecipeCatalog` from `culina-core`: case-insensitive
//! substring search over recipe names and full-recipe assembly (recipe row
//! + ingredients + steps) rendered as markdown for mention expansion.

use sqlx::Row;

use culina_core::catalog::RecipeCatalog;
use culina_types::error::RepositoryError;
use culina_types::recipe::{Ingredient, Recipe, RecipeRef};

use super::pool::DatabasePool;

/// Upper bound on search results; the caller applies its own display cap.
const SEARCH_LIMIT: i64 = 50;

/// SQLite-backed implementation of `RecipeCatalog`.
pub struct SqliteRecipeCatalog {
    pool: DatabasePool,
}

impl SqliteRecipeCatalog {
    /// Create a new catalog backed by the given database pool.
    pub fn new(pool: DatabasePool) -> Self {
        Self { pool }
    }

    /// Number of recipes in the cookbook.
    pub async fn recipe_count(&self) -> Result<u64, RepositoryError> {
        let row = sqlx::query("SELECT COUNT(*) as cnt FROM recipes")
            .fetch_one(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        let count: i64 = row
            .try_get("cnt")
            .map_err(|e| RepositoryError::Query(e.to_string()))?;
        Ok(count as u64)
    }

    /// Load a full recipe with its ingredients and steps.
    pub async fn get_recipe(&self, id: i64) -> Result<Recipe, RepositoryError> {
        let row = sqlx::query("SELECT * FROM recipes WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool.reader)
            .await
            .map_err(|e| RepositoryError::Query(e.to_string()))?
            .ok_or(RepositoryError::NotFound)?;

        let mut recipe = Recipe {
            id: row
                .try_get("id")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
            name: row
                .try_get("name")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
            description: row
                .try_get("description")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
            author: row
                .try_get("author")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
            url: row
                .try_get("url")
                .map_err(|e| RepositoryError::Query(e.to_string()))?,
            servings: row
                .try_get::<i64, _>("servings")
                .map_err(|e| RepositoryError::Query(e.to_string()))? as u32,
            prep_minutes: row
                .try_get::<i64, _>("prep_minutes")
                .map_err(|e| RepositoryError::Query(e.to_string()))? as u32,
            cook_minutes: row
                .try_get::<i64, _>("cook_minutes")
                .map_err(|e| RepositoryError::Query(e.to_string()))? as u32,
            favourite: row
                .try_get::<i64, _>("favourite")
                .map_err(|e| RepositoryError::Query(e.to_string()))?
                != 0,
            ingredients: Vec::new(),
            steps: Vec::new(),
        };

        let ingredient_rows = sqlx::query(
            "SELECT amount, unit, name, details FROM recipe_ingredients WHERE recipe_id = ? ORDER BY id ASC",
        )
        .bind(id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for row in &ingredient_rows {
            recipe.ingredients.push(Ingredient {
                amount: row
                    .try_get("amount")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                unit: row
                    .try_get("unit")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                name: row
                    .try_get("name")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                details: row
                    .try_get("details")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
            });
        }

        let step_rows = sqlx::query(
            "SELECT instruction FROM recipe_steps WHERE recipe_id = ? ORDER BY step_number ASC",
        )
        .bind(id)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        for row in &step_rows {
            recipe.steps.push(
                row.try_get("instruction")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
            );
        }

        Ok(recipe)
    }
}

impl RecipeCatalog for SqliteRecipeCatalog {
    async fn search_by_name(&self, query: &str) -> Result<Vec<RecipeRef>, RepositoryError> {
        let escaped = query
            .replace('\\', "\\\\")
            .replace('%', "\\%")
            .replace('_', "\\_");
        let pattern = format!("%{escaped}%");
        // SQLite LIKE is case-insensitive for ASCII by default.
        let rows = sqlx::query(
            r#"SELECT id, name FROM recipes
               WHERE name LIKE ? ESCAPE '\'
               ORDER BY name COLLATE NOCASE ASC
               LIMIT ?"#,
        )
        .bind(pattern)
        .bind(SEARCH_LIMIT)
        .fetch_all(&self.pool.reader)
        .await
        .map_err(|e| RepositoryError::Query(e.to_string()))?;

        let mut results = Vec::with_capacity(rows.len());
        for row in &rows {
            results.push(RecipeRef {
                id: row
                    .try_get("id")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
                name: row
                    .try_get("name")
                    .map_err(|e| RepositoryError::Query(e.to_string()))?,
            });
        }

        Ok(results)
    }

    async fn fetch_full(&self, id: i64) -> Result<String, RepositoryError> {
        let recipe = self.get_recipe(id).await?;
        Ok(recipe.to_markdown())
    }
}
