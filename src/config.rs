use std::{env, fmt::Display, str::FromStr};

use crate::error::AppError;
use crate::listing::DEFAULT_PAGE_SIZE;
use crate::source::DEFAULT_API_URL;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_url: String,
    pub db_path: String,
    pub page_size: usize,
    pub featured_category: String,
    pub featured_limit: usize,
}

impl Config {
    /// Reads the environment (after `.env` has been loaded).
    pub fn load() -> Result<Self, AppError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    fn from_lookup<F>(lookup: F) -> Result<Self, AppError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let page_size = try_load(&lookup, "PAGE_SIZE", DEFAULT_PAGE_SIZE)?;
        if page_size == 0 {
            return Err(AppError::Config {
                key: "PAGE_SIZE".to_string(),
                message: "must be at least 1".to_string(),
            });
        }
        Ok(Self {
            api_url: try_load(&lookup, "MEALDB_API_URL", DEFAULT_API_URL.to_string())?,
            db_path: try_load(&lookup, "MEAL_PALETTE_DB", "meal-palette.db".to_string())?,
            page_size,
            featured_category: try_load(&lookup, "FEATURED_CATEGORY", "Chicken".to_string())?,
            featured_limit: try_load(&lookup, "FEATURED_LIMIT", 8)?,
        })
    }
}

fn try_load<F, T>(lookup: &F, key: &str, default: T) -> Result<T, AppError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr + Display,
    T::Err: Display,
{
    match lookup(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| AppError::Config {
            key: key.to_string(),
            message: e.to_string(),
        }),
        None => {
            log::info!("{key} not set, using default: {default}");
            Ok(default)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn load(vars: &[(&str, &str)]) -> Result<Config, AppError> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Config::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn defaults_apply_when_unset() {
        let config = load(&[]).unwrap();
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.page_size, 16);
        assert_eq!(config.featured_category, "Chicken");
        assert_eq!(config.featured_limit, 8);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            load(&[("PAGE_SIZE", "many")]),
            Err(AppError::Config { .. })
        ));
        assert!(load(&[("PAGE_SIZE", "0")]).is_err());
        assert_eq!(load(&[("PAGE_SIZE", " 12 ")]).unwrap().page_size, 12);
    }
}
