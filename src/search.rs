use futures::future::try_join_all;
use std::collections::{BTreeSet, HashSet};

use crate::catalog::{hydrate, load_catalog, merge_recipes, sort_by_name};
use crate::error::AppError;
use crate::recipe::Recipe;
use crate::source::RecipeSource;

/// Chosen categories and cuisines. An empty axis places no constraint.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterSelection {
    pub categories: BTreeSet<String>,
    pub cuisines: BTreeSet<String>,
}

impl FilterSelection {
    pub fn is_empty(&self) -> bool {
        self.categories.is_empty() && self.cuisines.is_empty()
    }

    /// Parses `"Beef, Chicken | Italian"`: categories before the bar,
    /// cuisines after it. Either side may be blank.
    pub fn parse(text: &str) -> Self {
        let (categories, cuisines) = text.split_once('|').unwrap_or((text, ""));
        Self {
            categories: split_names(categories),
            cuisines: split_names(cuisines),
        }
    }

    /// "Beef, Chicken • Any"
    pub fn summary(&self) -> String {
        format!("{} • {}", describe(&self.categories), describe(&self.cuisines))
    }
}

fn split_names(text: &str) -> BTreeSet<String> {
    text.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}

fn describe(names: &BTreeSet<String>) -> String {
    if names.is_empty() {
        "Any".to_string()
    } else {
        names.iter().cloned().collect::<Vec<_>>().join(", ")
    }
}

/// Name search unioned with ingredient search. A blank query loads the
/// whole catalog instead.
pub async fn search(source: &dyn RecipeSource, query: &str) -> Result<Vec<Recipe>, AppError> {
    let query = query.trim();
    if query.is_empty() {
        return load_catalog(source).await;
    }

    let (by_name, by_ingredient) = futures::try_join!(
        source.search_name(query),
        search_by_ingredient(source, query)
    )?;
    log::debug!(
        "Search '{}': {} by name, {} by ingredient",
        query,
        by_name.len(),
        by_ingredient.len()
    );
    Ok(merge_recipes([by_name, by_ingredient]))
}

async fn search_by_ingredient(
    source: &dyn RecipeSource,
    ingredient: &str,
) -> Result<Vec<Recipe>, AppError> {
    let refs = source.filter_ingredient(ingredient).await?;
    if refs.is_empty() {
        return Ok(Vec::new());
    }
    hydrate(source, refs.iter().map(|r| r.id.as_str())).await
}

async fn ids_by_category(
    source: &dyn RecipeSource,
    categories: &BTreeSet<String>,
) -> Result<Option<HashSet<String>>, AppError> {
    if categories.is_empty() {
        return Ok(None);
    }
    let lists = try_join_all(categories.iter().map(|c| source.filter_category(c))).await?;
    Ok(Some(lists.into_iter().flatten().map(|r| r.id).collect()))
}

async fn ids_by_cuisine(
    source: &dyn RecipeSource,
    cuisines: &BTreeSet<String>,
) -> Result<Option<HashSet<String>>, AppError> {
    if cuisines.is_empty() {
        return Ok(None);
    }
    let lists = try_join_all(cuisines.iter().map(|a| source.filter_area(a))).await?;
    Ok(Some(lists.into_iter().flatten().map(|r| r.id).collect()))
}

/// `None` stands for "unconstrained" and is the identity of the intersection.
fn intersect(
    a: Option<HashSet<String>>,
    b: Option<HashSet<String>>,
) -> Option<HashSet<String>> {
    match (a, b) {
        (None, None) => None,
        (Some(a), None) => Some(a),
        (None, Some(b)) => Some(b),
        (Some(a), Some(b)) => Some(a.intersection(&b).cloned().collect()),
    }
}

/// Narrows `base` down to the selected categories and cuisines.
pub async fn apply_filters(
    source: &dyn RecipeSource,
    base: &[Recipe],
    selection: &FilterSelection,
) -> Result<Vec<Recipe>, AppError> {
    if selection.is_empty() {
        return Ok(base.to_vec());
    }

    let (by_category, by_cuisine) = futures::try_join!(
        ids_by_category(source, &selection.categories),
        ids_by_cuisine(source, &selection.cuisines)
    )?;
    let base_ids: HashSet<String> = base.iter().map(|r| r.id.clone()).collect();
    let ids = intersect(intersect(by_category, by_cuisine), Some(base_ids)).unwrap_or_default();

    if ids.is_empty() {
        log::debug!("No recipes match {}", selection.summary());
        return Ok(Vec::new());
    }

    let mut recipes = hydrate(source, ids).await?;
    sort_by_name(&mut recipes);
    Ok(recipes)
}
