//! RecipeCatalog trait definition.
//!
//! The lookup used by mention resolution and autocomplete. Implementations
//! live in culina-infra (e.g., `SqliteRecipeCatalog`).
//! Uses native async fn in traits (RPITIT, Rust 2024 edition).

use culina_types::error::RepositoryError;
use culina_types::recipe::RecipeRef;

/// Read-only port to the recipe catalog.
pub trait RecipeCatalog: Send + Sync {
    /// Search recipes whose name contains `query`, case-insensitively.
    fn search_by_name(
        &self,
        query: &str,
    ) -> impl std::future::Future<Output = Result<Vec<RecipeRef>, RepositoryError>> + Send;

    /// Fetch the full recipe content rendered as markdown.
    fn fetch_full(
        &self,
        id: i64,
    ) -> impl std::future::Future<Output = Result<String, RepositoryError>> + Send;
}
