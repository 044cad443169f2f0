//! `@[Recipe Name]` mention resolution and autocomplete.
//!
//! Mentions are expanded into full recipe context for the model-facing
//! prompt while the display text keeps the raw bracketed syntax so the
//! renderer can style it later. Unresolved mentions degrade silently to
//! plain text.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::warn;

use culina_types::recipe::RecipeRef;

use crate::catalog::RecipeCatalog;

/// Matches `@[Recipe Name]` references in submitted text. Recipe names are
/// wrapped in square brackets to allow spaces.
static MENTION_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"@\[([^\]]+)\]").expect("mention regex is valid"));

/// The model-facing prompt and the user-facing display text for one turn.
///
/// `display` is always the literal submitted input; `prompt` is a strict
/// superset when at least one mention resolved, identical otherwise.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPrompt {
    pub prompt: String,
    pub display: String,
}

/// Resolve all `@[Name]` references in `input` against the catalog.
///
/// Names are deduplicated as written (case-sensitive); the catalog lookup
/// itself is an exact, case-insensitive match. Lookup misses and catalog
/// errors skip the mention without failing the turn. When nothing
/// resolves, both prompt and display are the input, byte for byte.
pub async fn resolve<C: RecipeCatalog>(input: &str, catalog: &C) -> ResolvedPrompt {
    let mut seen = HashSet::new();
    let mut contexts = Vec::new();

    for capture in MENTION_RE.captures_iter(input) {
        let name = &capture[1];
        if !seen.insert(name.to_string()) {
            continue;
        }

        match lookup_exact(catalog, name).await {
            Some((reference, content)) => {
                contexts.push(format!(
                    "--- Referenced Recipe: {} ---\n{}\n---",
                    reference.name, content
                ));
            }
            None => continue,
        }
    }

    if contexts.is_empty() {
        return ResolvedPrompt {
            prompt: input.to_string(),
            display: input.to_string(),
        };
    }

    let mut prompt =
        String::from("The user is referencing the following recipe(s) from their cookbook:\n\n");
    for context in &contexts {
        prompt.push_str(context);
        prompt.push_str("\n\n");
    }
    prompt.push_str("User message: ");
    prompt.push_str(input);

    ResolvedPrompt {
        prompt,
        display: input.to_string(),
    }
}

/// Exact case-insensitive catalog lookup by name, returning the reference
/// and its full markdown content.
async fn lookup_exact<C: RecipeCatalog>(catalog: &C, name: &str) -> Option<(RecipeRef, String)> {
    let candidates = match catalog.search_by_name(name).await {
        Ok(candidates) => candidates,
        Err(err) => {
            warn!(error = %err, recipe = name, "recipe search failed, skipping mention");
            return None;
        }
    };

    let reference = candidates
        .into_iter()
        .find(|r| r.name.to_lowercase() == name.to_lowercase())?;

    match catalog.fetch_full(reference.id).await {
        Ok(content) => Some((reference, content)),
        Err(err) => {
            warn!(error = %err, recipe = name, "recipe fetch failed, skipping mention");
            None
        }
    }
}

/// Ranked autocomplete suggestions for an unterminated `@` reference.
///
/// Pure function of `(text, cursor, catalog)`: finds the last `@` before
/// the byte offset `cursor`, requires it to sit at the start of input or
/// after whitespace, and treats a closing `]` as the end of the mention.
/// A `[` the user already typed is stripped from the query. Results are
/// capped at `limit`.
pub async fn suggest<C: RecipeCatalog>(
    text: &str,
    cursor: usize,
    limit: usize,
    catalog: &C,
) -> Vec<RecipeRef> {
    let before = match text.get(..cursor.min(text.len())) {
        Some(prefix) => prefix,
        None => text,
    };

    let Some(at_idx) = before.rfind('@') else {
        return Vec::new();
    };

    // The trigger must be at the start or after whitespace.
    if at_idx > 0 {
        let preceding = before[..at_idx].chars().next_back();
        if !matches!(preceding, Some(' ') | Some('\n')) {
            return Vec::new();
        }
    }

    let query = &before[at_idx + 1..];
    if query.contains(']') {
        return Vec::new();
    }
    let query = query.strip_prefix('[').unwrap_or(query);

    let mut results = match catalog.search_by_name(query).await {
        Ok(results) => results,
        Err(err) => {
            warn!(error = %err, "recipe search failed during autocomplete");
            return Vec::new();
        }
    };
    results.truncate(limit);
    results
}

/// Byte spans of every `@[Name]` mention in `text`, for styling.
pub fn mention_spans(text: &str) -> Vec<(usize, usize)> {
    MENTION_RE
        .find_iter(text)
        .map(|m| (m.start(), m.end()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    use culina_types::error::RepositoryError;

    /// Stub catalog with a fixed set of named recipes.
    struct StubCatalog {
        recipes: Vec<(i64, &'static str, &'static str)>,
    }

    impl StubCatalog {
        fn cookbook() -> Self {
            Self {
                recipes: vec![
                    (1, "Pasta Carbonara", "# Pasta Carbonara\n\n- 400 g spaghetti\n- 150 g guanciale\n\n1. Boil the pasta."),
                    (2, "Pasta Primavera", "# Pasta Primavera\n\nSpring vegetables."),
                    (3, "Chicken Tikka Masala", "# Chicken Tikka Masala\n\nSpiced curry."),
                ],
            }
        }
    }

    impl RecipeCatalog for StubCatalog {
        async fn search_by_name(&self, query: &str) -> Result<Vec<RecipeRef>, RepositoryError> {
            let query = query.to_lowercase();
            Ok(self
                .recipes
                .iter()
                .filter(|(_, name, _)| name.to_lowercase().contains(&query))
                .map(|(id, name, _)| RecipeRef {
                    id: *id,
                    name: name.to_string(),
                })
                .collect())
        }

        async fn fetch_full(&self, id: i64) -> Result<String, RepositoryError> {
            self.recipes
                .iter()
                .find(|(rid, _, _)| *rid == id)
                .map(|(_, _, content)| content.to_string())
                .ok_or(RepositoryError::NotFound)
        }
    }

    #[tokio::test]
    async fn test_resolve_identity_without_mentions() {
        let catalog = StubCatalog::cookbook();
        for text in ["", "hello", "what about pasta@home?", "a[b] @ c"] {
            let resolved = resolve(text, &catalog).await;
            assert_eq!(resolved.prompt, text);
            assert_eq!(resolved.display, text);
        }
    }

    #[tokio::test]
    async fn test_resolve_is_idempotent_on_resolved_display() {
        let catalog = StubCatalog::cookbook();
        let input = "How long to cook @[Pasta Carbonara]?";
        let first = resolve(input, &catalog).await;
        let second = resolve(&first.display, &catalog).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn test_resolve_expands_known_recipe() {
        let catalog = StubCatalog::cookbook();
        let input = "How long to cook @[Pasta Carbonara]?";
        let resolved = resolve(input, &catalog).await;

        assert_eq!(resolved.display, input);
        assert!(resolved
            .prompt
            .starts_with("The user is referencing the following recipe(s) from their cookbook:"));
        assert!(resolved.prompt.contains("--- Referenced Recipe: Pasta Carbonara ---"));
        assert!(resolved.prompt.contains("- 150 g guanciale"));
        assert!(resolved
            .prompt
            .ends_with("User message: How long to cook @[Pasta Carbonara]?"));
    }

    #[tokio::test]
    async fn test_resolve_lookup_is_case_insensitive() {
        let catalog = StubCatalog::cookbook();
        let resolved = resolve("Tell me about @[pasta carbonara]", &catalog).await;
        assert!(resolved.prompt.contains("--- Referenced Recipe: Pasta Carbonara ---"));
    }

    #[tokio::test]
    async fn test_resolve_dedupes_repeated_mentions() {
        let catalog = StubCatalog::cookbook();
        let resolved =
            resolve("@[Pasta Carbonara] vs @[Pasta Carbonara]?", &catalog).await;
        let occurrences = resolved
            .prompt
            .matches("--- Referenced Recipe: Pasta Carbonara ---")
            .count();
        assert_eq!(occurrences, 1);
    }

    #[tokio::test]
    async fn test_resolve_unknown_mention_degrades_to_plain_text() {
        let catalog = StubCatalog::cookbook();
        let input = "What about @[Beef Wellington]?";
        let resolved = resolve(input, &catalog).await;
        assert_eq!(resolved.prompt, input);
        assert_eq!(resolved.display, input);
    }

    #[tokio::test]
    async fn test_resolve_mixed_known_and_unknown() {
        let catalog = StubCatalog::cookbook();
        let resolved = resolve(
            "Compare @[Pasta Carbonara] and @[Beef Wellington]",
            &catalog,
        )
        .await;
        assert!(resolved.prompt.contains("--- Referenced Recipe: Pasta Carbonara ---"));
        assert!(!resolved.prompt.contains("Referenced Recipe: Beef Wellington"));
        assert!(resolved
            .prompt
            .ends_with("User message: Compare @[Pasta Carbonara] and @[Beef Wellington]"));
    }

    #[tokio::test]
    async fn test_suggest_matches_substring() {
        let catalog = StubCatalog::cookbook();
        let text = "tell me about @past";
        let suggestions = suggest(text, text.len(), 8, &catalog).await;
        let names: Vec<&str> = suggestions.iter().map(|r| r.name.as_str()).collect();
        assert_eq!(names, vec!["Pasta Carbonara", "Pasta Primavera"]);
    }

    #[tokio::test]
    async fn test_suggest_strips_typed_bracket() {
        let catalog = StubCatalog::cookbook();
        let text = "@[chicken";
        let suggestions = suggest(text, text.len(), 8, &catalog).await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].name, "Chicken Tikka Masala");
    }

    #[tokio::test]
    async fn test_suggest_requires_trigger_boundary() {
        let catalog = StubCatalog::cookbook();
        let text = "email@past";
        let suggestions = suggest(text, text.len(), 8, &catalog).await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_inactive_after_closing_bracket() {
        let catalog = StubCatalog::cookbook();
        let text = "@[Pasta Carbonara] and";
        let suggestions = suggest(text, text.len(), 8, &catalog).await;
        assert!(suggestions.is_empty());
    }

    #[tokio::test]
    async fn test_suggest_respects_limit() {
        let catalog = StubCatalog::cookbook();
        let text = "@a";
        let suggestions = suggest(text, text.len(), 1, &catalog).await;
        assert_eq!(suggestions.len(), 1);
    }

    #[tokio::test]
    async fn test_suggest_uses_cursor_position() {
        let catalog = StubCatalog::cookbook();
        let text = "@chicken and more text";
        // Cursor right after "@chicken"
        let suggestions = suggest(text, 8, 8, &catalog).await;
        assert_eq!(suggestions.len(), 1);
        assert_eq!(suggestions[0].name, "Chicken Tikka Masala");
    }

    #[test]
    fn test_mention_spans() {
        let text = "try @[Pasta Carbonara] or @[Toast]";
        let spans = mention_spans(text);
        assert_eq!(spans.len(), 2);
        assert_eq!(&text[spans[0].0..spans[0].1], "@[Pasta Carbonara]");
        assert_eq!(&text[spans[1].0..spans[1].1], "@[Toast]");
    }
}
