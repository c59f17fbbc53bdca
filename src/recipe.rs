use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Number of `strIngredientN` / `strMeasureN` slots a meal carries.
pub const MAX_INGREDIENTS: usize = 20;

const INGREDIENT_IMAGE_BASE: &str = "https://www.themealdb.com/images/ingredients";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Ingredient {
    pub name: String,
    pub measure: String,
}

impl Ingredient {
    /// "measure name", e.g. "1 tbsp Olive Oil".
    pub fn line(&self) -> String {
        format!("{} {}", self.measure, self.name).trim().to_string()
    }

    pub fn image_small(&self) -> String {
        format!(
            "{}/{}-Small.png",
            INGREDIENT_IMAGE_BASE,
            urlencoding::encode(&self.name)
        )
    }

    pub fn image_2x(&self) -> String {
        format!("{}/{}.png", INGREDIENT_IMAGE_BASE, urlencoding::encode(&self.name))
    }
}

/// A fully hydrated recipe. Two recipes are equal iff their ids are.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recipe {
    pub id: String,
    pub name: String,
    pub category: Option<String>,
    pub area: Option<String>,
    pub thumbnail: Option<String>,
    pub instructions: String,
    pub video: Option<String>,
    pub ingredients: Vec<Ingredient>,
}

impl PartialEq for Recipe {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Recipe {}

impl Recipe {
    /// First `take` ingredient lines joined with ", ".
    pub fn ingredient_summary(&self, take: usize) -> String {
        self.ingredients
            .iter()
            .take(take)
            .map(Ingredient::line)
            .collect::<Vec<_>>()
            .join(", ")
    }

    pub fn steps(&self) -> Vec<&str> {
        self.instructions
            .lines()
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect()
    }

    /// "Category • Area", skipping whichever is unknown.
    pub fn tagline(&self) -> String {
        [self.category.as_deref(), self.area.as_deref()]
            .into_iter()
            .flatten()
            .collect::<Vec<_>>()
            .join(" • ")
    }
}

/// Meal payload as served by TheMealDB search and lookup endpoints.
#[derive(Debug, Deserialize)]
pub struct MealRecord {
    #[serde(rename = "idMeal")]
    pub id: Option<String>,
    #[serde(rename = "strMeal")]
    pub name: Option<String>,
    #[serde(rename = "strCategory")]
    pub category: Option<String>,
    #[serde(rename = "strArea")]
    pub area: Option<String>,
    #[serde(rename = "strMealThumb")]
    pub thumbnail: Option<String>,
    #[serde(rename = "strInstructions")]
    pub instructions: Option<String>,
    #[serde(rename = "strYoutube")]
    pub video: Option<String>,
    #[serde(flatten)]
    pub slots: HashMap<String, serde_json::Value>,
}

impl MealRecord {
    fn slot(&self, key: &str) -> &str {
        self.slots
            .get(key)
            .and_then(|v| v.as_str())
            .map(str::trim)
            .unwrap_or("")
    }

    /// Returns `None` for records without an id.
    pub fn into_recipe(self) -> Option<Recipe> {
        let mut ingredients = Vec::new();
        for i in 1..=MAX_INGREDIENTS {
            let name = self.slot(&format!("strIngredient{i}"));
            if name.is_empty() {
                break;
            }
            ingredients.push(Ingredient {
                name: name.to_string(),
                measure: self.slot(&format!("strMeasure{i}")).to_string(),
            });
        }

        let id = non_empty(self.id)?;
        Some(Recipe {
            id,
            name: self.name.unwrap_or_default(),
            category: non_empty(self.category),
            area: non_empty(self.area),
            thumbnail: non_empty(self.thumbnail),
            instructions: self.instructions.unwrap_or_default(),
            video: non_empty(self.video),
            ingredients,
        })
    }
}

/// Thin record returned by the `filter.php` endpoints; only the id is kept
/// since every thin record is hydrated before display.
#[derive(Debug, Clone, Deserialize)]
pub struct MealRef {
    #[serde(rename = "idMeal")]
    pub id: String,
}

fn non_empty(value: Option<String>) -> Option<String> {
    value
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}
