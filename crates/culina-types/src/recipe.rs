//! Recipe catalog types for Culina.
//!
//! The conversational pipeline only needs two views of a recipe: a
//! lightweight reference for search/autocomplete results, and the full
//! recipe rendered as markdown for mention expansion.

use serde::{Deserialize, Serialize};

/// A lightweight recipe reference returned by catalog searches.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipeRef {
    pub id: i64,
    pub name: String,
}

/// A single ingredient line of a recipe.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Ingredient {
    pub amount: String,
    pub unit: String,
    pub name: String,
    pub details: String,
}

/// A full recipe as stored in the cookbook.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub author: String,
    pub url: String,
    pub servings: u32,
    pub prep_minutes: u32,
    pub cook_minutes: u32,
    pub favourite: bool,
    pub ingredients: Vec<Ingredient>,
    pub steps: Vec<String>,
}

impl Recipe {
    /// Render the recipe as a markdown block.
    ///
    /// This is the shape injected into the model prompt when the user
    /// references the recipe with `@[Name]`.
    pub fn to_markdown(&self) -> String {
        let mut out = String::new();
        out.push_str(&format!("# {}\n", self.name));

        if !self.description.is_empty() {
            out.push_str(&format!("\n{}\n", self.description));
        }
        if !self.author.is_empty() {
            out.push_str(&format!("\nBy {}\n", self.author));
        }

        let mut meta = Vec::new();
        if self.servings > 0 {
            meta.push(format!("Servings: {}", self.servings));
        }
        if self.prep_minutes > 0 {
            meta.push(format!("Prep: {} min", self.prep_minutes));
        }
        if self.cook_minutes > 0 {
            meta.push(format!("Cook: {} min", self.cook_minutes));
        }
        if !meta.is_empty() {
            out.push_str(&format!("\n{}\n", meta.join(" | ")));
        }

        if !self.ingredients.is_empty() {
            out.push_str("\n## Ingredients\n\n");
            for ing in &self.ingredients {
                let mut line = String::from("- ");
                if !ing.amount.is_empty() {
                    line.push_str(&ing.amount);
                    line.push(' ');
                }
                if !ing.unit.is_empty() {
                    line.push_str(&ing.unit);
                    line.push(' ');
                }
                line.push_str(&ing.name);
                if !ing.details.is_empty() {
                    line.push_str(&format!(" ({})", ing.details));
                }
                out.push_str(line.trim_end());
                out.push('\n');
            }
        }

        if !self.steps.is_empty() {
            out.push_str("\n## Instructions\n\n");
            for (i, step) in self.steps.iter().enumerate() {
                out.push_str(&format!("{}. {}\n", i + 1, step));
            }
        }

        out
    }
}
