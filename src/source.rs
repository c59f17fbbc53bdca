//! Access to the remote recipe provider (TheMealDB).
//!
//! Every endpoint answers with `{ "meals": [...] }`, or `{ "meals": null }`
//! when nothing matched. Both shapes come back from here as a plain `Vec`.

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Deserialize;

use crate::error::AppError;
use crate::recipe::{MealRecord, MealRef, Recipe};

const SERVICE: &str = "TheMealDB";

pub const DEFAULT_API_URL: &str = "https://www.themealdb.com/api/json/v1/1";

#[async_trait]
pub trait RecipeSource: Send + Sync {
    async fn search_first_letter(&self, letter: char) -> Result<Vec<Recipe>, AppError>;
    async fn search_name(&self, term: &str) -> Result<Vec<Recipe>, AppError>;
    async fn filter_category(&self, category: &str) -> Result<Vec<MealRef>, AppError>;
    async fn filter_area(&self, area: &str) -> Result<Vec<MealRef>, AppError>;
    async fn filter_ingredient(&self, ingredient: &str) -> Result<Vec<MealRef>, AppError>;
    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, AppError>;
    async fn list_categories(&self) -> Result<Vec<String>, AppError>;
    async fn list_areas(&self) -> Result<Vec<String>, AppError>;
}

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    meals: Option<Vec<T>>,
}

#[derive(Debug, Deserialize)]
struct CategoryName {
    #[serde(rename = "strCategory")]
    name: String,
}

#[derive(Debug, Deserialize)]
struct AreaName {
    #[serde(rename = "strArea")]
    name: String,
}

fn into_recipes(records: Vec<MealRecord>) -> Vec<Recipe> {
    records
        .into_iter()
        .filter_map(MealRecord::into_recipe)
        .collect()
}

pub struct MealDbClient {
    base_url: String,
    http_client: reqwest::Client,
}

impl MealDbClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            http_client: reqwest::Client::new(),
        }
    }

    async fn get<T: DeserializeOwned>(
        &self,
        endpoint: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        log::debug!("GET {} {:?}", url, query);

        let response = self
            .http_client
            .get(&url)
            .query(query)
            .send()
            .await
            .map_err(|e| AppError::remote(SERVICE, e))?;

        if !response.status().is_success() {
            return Err(AppError::remote(
                SERVICE,
                format!("HTTP {} for {}", response.status(), endpoint),
            ));
        }

        let envelope: Envelope<T> = response
            .json()
            .await
            .map_err(|e| AppError::decode(SERVICE, e))?;
        Ok(envelope.meals.unwrap_or_default())
    }
}

impl Default for MealDbClient {
    fn default() -> Self {
        Self::new(DEFAULT_API_URL)
    }
}

#[async_trait]
impl RecipeSource for MealDbClient {
    async fn search_first_letter(&self, letter: char) -> Result<Vec<Recipe>, AppError> {
        let letter = letter.to_string();
        let records = self.get("search.php", &[("f", letter.as_str())]).await?;
        Ok(into_recipes(records))
    }

    async fn search_name(&self, term: &str) -> Result<Vec<Recipe>, AppError> {
        let records = self.get("search.php", &[("s", term)]).await?;
        Ok(into_recipes(records))
    }

    async fn filter_category(&self, category: &str) -> Result<Vec<MealRef>, AppError> {
        self.get("filter.php", &[("c", category)]).await
    }

    async fn filter_area(&self, area: &str) -> Result<Vec<MealRef>, AppError> {
        self.get("filter.php", &[("a", area)]).await
    }

    async fn filter_ingredient(&self, ingredient: &str) -> Result<Vec<MealRef>, AppError> {
        self.get("filter.php", &[("i", ingredient)]).await
    }

    async fn lookup(&self, id: &str) -> Result<Option<Recipe>, AppError> {
        let records: Vec<MealRecord> = self.get("lookup.php", &[("i", id)]).await?;
        Ok(records.into_iter().find_map(MealRecord::into_recipe))
    }

    async fn list_categories(&self) -> Result<Vec<String>, AppError> {
        let names: Vec<CategoryName> = self.get("list.php", &[("c", "list")]).await?;
        Ok(names.into_iter().map(|c| c.name).collect())
    }

    async fn list_areas(&self) -> Result<Vec<String>, AppError> {
        let names: Vec<AreaName> = self.get("list.php", &[("a", "list")]).await?;
        Ok(names.into_iter().map(|a| a.name).collect())
    }
}

#[cfg(test)]
pub mod fake {
    //! In-memory provider used by the aggregation tests.

    use super::*;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::{AtomicUsize, Ordering};

    pub fn recipe(id: &str, name: &str, category: &str, area: &str) -> Recipe {
        Recipe {
            id: id.to_string(),
            name: name.to_string(),
            category: Some(category.to_string()),
            area: Some(area.to_string()),
            thumbnail: None,
            instructions: String::new(),
            video: None,
            ingredients: Vec::new(),
        }
    }

    #[derive(Default)]
    pub struct FakeSource {
        pub recipes: Vec<Recipe>,
        /// ingredient name -> recipe ids
        pub ingredients: HashMap<String, Vec<String>>,
        pub failing_letters: HashSet<char>,
        pub fail_everything: bool,
        pub lookups: AtomicUsize,
    }

    impl FakeSource {
        pub fn new(recipes: Vec<Recipe>) -> Self {
            Self {
                recipes,
                ..Default::default()
            }
        }

        fn check(&self) -> Result<(), AppError> {
            if self.fail_everything {
                return Err(AppError::remote(SERVICE, "connection refused"));
            }
            Ok(())
        }

        fn refs<F: Fn(&Recipe) -> bool>(&self, keep: F) -> Vec<MealRef> {
            self.recipes
                .iter()
                .filter(|r| keep(r))
                .map(|r| MealRef { id: r.id.clone() })
                .collect()
        }
    }

    #[async_trait]
    impl RecipeSource for FakeSource {
        async fn search_first_letter(&self, letter: char) -> Result<Vec<Recipe>, AppError> {
            self.check()?;
            if self.failing_letters.contains(&letter) {
                return Err(AppError::remote(SERVICE, "HTTP 500"));
            }
            Ok(self
                .recipes
                .iter()
                .filter(|r| r.name.to_lowercase().starts_with(letter))
                .cloned()
                .collect())
        }

        async fn search_name(&self, term: &str) -> Result<Vec<Recipe>, AppError> {
            self.check()?;
            let term = term.to_lowercase();
            Ok(self
                .recipes
                .iter()
                .filter(|r| r.name.to_lowercase().contains(&term))
                .cloned()
                .collect())
        }

        async fn filter_category(&self, category: &str) -> Result<Vec<MealRef>, AppError> {
            self.check()?;
            Ok(self.refs(|r| r.category.as_deref() == Some(category)))
        }

        async fn filter_area(&self, area: &str) -> Result<Vec<MealRef>, AppError> {
            self.check()?;
            Ok(self.refs(|r| r.area.as_deref() == Some(area)))
        }

        async fn filter_ingredient(&self, ingredient: &str) -> Result<Vec<MealRef>, AppError> {
            self.check()?;
            let ids = self.ingredients.get(ingredient).cloned().unwrap_or_default();
            Ok(self.refs(|r| ids.contains(&r.id)))
        }

        async fn lookup(&self, id: &str) -> Result<Option<Recipe>, AppError> {
            self.check()?;
            self.lookups.fetch_add(1, Ordering::SeqCst);
            Ok(self.recipes.iter().find(|r| r.id == id).cloned())
        }

        async fn list_categories(&self) -> Result<Vec<String>, AppError> {
            self.check()?;
            let set: HashSet<_> = self.recipes.iter().filter_map(|r| r.category.clone()).collect();
            Ok(set.into_iter().collect())
        }

        async fn list_areas(&self) -> Result<Vec<String>, AppError> {
            self.check()?;
            let set: HashSet<_> = self.recipes.iter().filter_map(|r| r.area.clone()).collect();
            Ok(set.into_iter().collect())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn null_meals_decode_as_empty() {
        let envelope: Envelope<MealRef> = serde_json::from_value(json!({ "meals": null })).unwrap();
        assert!(envelope.meals.unwrap_or_default().is_empty());
    }

    #[test]
    fn thin_records_decode() {
        let envelope: Envelope<MealRef> = serde_json::from_value(json!({
            "meals": [{ "strMeal": "Brown Stew Chicken", "strMealThumb": "x.jpg", "idMeal": "52940" }]
        }))
        .unwrap();
        let meals = envelope.meals.unwrap();
        assert_eq!(meals.len(), 1);
        assert_eq!(meals[0].id, "52940");
    }

    #[test]
    fn base_url_trailing_slash_is_trimmed() {
        let client = MealDbClient::new("http://localhost:9000/api/");
        assert_eq!(client.base_url, "http://localhost:9000/api");
    }
}
