//! Whole-catalog assembly.
//!
//! TheMealDB has no "list everything" endpoint, so the catalog is rebuilt from
//! one first-letter search per letter of the alphabet. Callers only see
//! [`load_catalog`]; swapping the fan-out for a single call stays local here.

use futures::future::join_all;
use std::cmp::Ordering;
use std::collections::HashMap;

use crate::error::AppError;
use crate::recipe::Recipe;
use crate::source::RecipeSource;

/// Case-insensitive first, raw comparison as the tie break.
pub fn compare_names(a: &str, b: &str) -> Ordering {
    a.to_lowercase()
        .cmp(&b.to_lowercase())
        .then_with(|| a.cmp(b))
}

/// Same-name recipes fall back to id order so reloads list them identically.
pub fn sort_by_name(recipes: &mut [Recipe]) {
    recipes.sort_by(|a, b| compare_names(&a.name, &b.name).then_with(|| a.id.cmp(&b.id)));
}

/// Union by id (last write wins), sorted by name.
pub fn merge_recipes<I>(lists: I) -> Vec<Recipe>
where
    I: IntoIterator<Item = Vec<Recipe>>,
{
    let mut by_id: HashMap<String, Recipe> = HashMap::new();
    for recipe in lists.into_iter().flatten() {
        by_id.insert(recipe.id.clone(), recipe);
    }
    let mut merged: Vec<Recipe> = by_id.into_values().collect();
    sort_by_name(&mut merged);
    merged
}

pub async fn load_catalog(source: &dyn RecipeSource) -> Result<Vec<Recipe>, AppError> {
    let letters: Vec<char> = ('a'..='z').collect();
    let responses = join_all(letters.iter().map(|&l| source.search_first_letter(l))).await;

    let mut failures = 0;
    let mut lists = Vec::with_capacity(responses.len());
    for (letter, response) in letters.iter().zip(responses) {
        match response {
            Ok(recipes) => lists.push(recipes),
            Err(e) => {
                log::warn!("Search for letter '{}' failed, skipping it: {}", letter, e);
                failures += 1;
            }
        }
    }
    if failures == letters.len() {
        return Err(AppError::remote(
            "TheMealDB",
            "every first-letter search failed",
        ));
    }

    let catalog = merge_recipes(lists);
    log::info!("Loaded catalog of {} recipes", catalog.len());
    Ok(catalog)
}

/// Re-fetches full records by id. Ids the provider no longer knows are dropped.
pub async fn hydrate<I, S>(source: &dyn RecipeSource, ids: I) -> Result<Vec<Recipe>, AppError>
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let ids: Vec<S> = ids.into_iter().collect();
    let details = join_all(ids.iter().map(|id| source.lookup(id.as_ref()))).await;
    let mut recipes = Vec::with_capacity(details.len());
    for detail in details {
        if let Some(recipe) = detail? {
            recipes.push(recipe);
        }
    }
    Ok(recipes)
}

/// The home page selection: the first `limit` meals of `category`.
/// Individual lookup failures are dropped rather than failing the page.
pub async fn load_featured(
    source: &dyn RecipeSource,
    category: &str,
    limit: usize,
) -> Result<Vec<Recipe>, AppError> {
    let refs = source.filter_category(category).await?;
    let details = join_all(refs.iter().take(limit).map(|r| source.lookup(&r.id))).await;
    Ok(details
        .into_iter()
        .filter_map(|detail| match detail {
            Ok(recipe) => recipe,
            Err(e) => {
                log::warn!("Dropping featured meal: {}", e);
                None
            }
        })
        .collect())
}

pub async fn category_options(source: &dyn RecipeSource) -> Vec<String> {
    sorted_or_empty("categories", source.list_categories().await)
}

pub async fn cuisine_options(source: &dyn RecipeSource) -> Vec<String> {
    sorted_or_empty("cuisines", source.list_areas().await)
}

fn sorted_or_empty(what: &str, result: Result<Vec<String>, AppError>) -> Vec<String> {
    match result {
        Ok(mut names) => {
            names.sort();
            names
        }
        Err(e) => {
            log::warn!("Could not list {}: {}", what, e);
            Vec::new()
        }
    }
}
