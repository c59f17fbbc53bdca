use std::collections::HashSet;
use std::sync::Arc;

use crate::db::KvStore;
use crate::error::AppError;
use crate::recipe::Recipe;
use crate::session::{AuthState, Profile};

const STORAGE_PREFIX: &str = "savedRecipes:";

pub fn storage_key(uid: &str) -> String {
    format!("{STORAGE_PREFIX}{uid}")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Toggled {
    Added,
    Removed,
}

/// Saved recipes of the signed-in user, most recently added first.
#[derive(Clone)]
pub struct FavoritesStore {
    storage: Arc<KvStore>,
    auth: AuthState,
    items: Vec<Recipe>,
}

impl FavoritesStore {
    pub fn new(storage: Arc<KvStore>) -> Self {
        Self {
            storage,
            auth: AuthState::default(),
            items: Vec::new(),
        }
    }

    pub fn auth(&self) -> &AuthState {
        &self.auth
    }

    /// Swaps in the persisted collection of `profile`.
    pub fn sign_in(&mut self, profile: Profile) -> Result<(), AppError> {
        self.items = self.load(&profile.uid)?;
        log::info!("{} signed in with {} favorites", profile.uid, self.items.len());
        self.auth = AuthState::SignedIn(profile);
        Ok(())
    }

    /// Picks up changes the same user made from another chat.
    pub fn refresh(&mut self) -> Result<(), AppError> {
        if let Some(profile) = self.auth.profile() {
            self.items = self.load(&profile.uid)?;
        }
        Ok(())
    }

    /// Persisted collection of `uid`; unreadable data counts as empty.
    fn load(&self, uid: &str) -> Result<Vec<Recipe>, AppError> {
        let items = match self.storage.get(&storage_key(uid))? {
            Some(raw) => serde_json::from_str::<Vec<Recipe>>(&raw).unwrap_or_else(|e| {
                log::warn!("Ignoring unreadable favorites of {}: {}", uid, e);
                Vec::new()
            }),
            None => Vec::new(),
        };
        let mut seen = HashSet::new();
        Ok(items
            .into_iter()
            .filter(|r| seen.insert(r.id.clone()))
            .collect())
    }

    /// Clears memory only; the persisted copy is restored on the next sign-in.
    pub fn sign_out(&mut self) {
        if let Some(profile) = self.auth.profile() {
            log::info!("{} signed out", profile.uid);
        }
        self.auth = AuthState::SignedOut;
        self.items.clear();
    }

    pub fn is_favorite(&self, id: &str) -> bool {
        self.items.iter().any(|r| r.id == id)
    }

    pub fn favorites(&self) -> Result<&[Recipe], AppError> {
        self.auth.require()?;
        Ok(&self.items)
    }

    /// Removes `recipe` if saved, prepends it otherwise, then persists.
    ///
    /// Only the signed-in user may toggle. The change applies to the persisted
    /// list; the in-memory copy is stale once the same user toggles elsewhere.
    pub fn toggle(&mut self, caller: &str, recipe: &Recipe) -> Result<Toggled, AppError> {
        let uid = self.auth.require_user(caller)?.uid.clone();

        let mut items = self.load(&uid)?;
        let toggled = match items.iter().position(|r| r.id == recipe.id) {
            Some(index) => {
                items.remove(index);
                Toggled::Removed
            }
            None => {
                items.insert(0, recipe.clone());
                Toggled::Added
            }
        };

        let raw = serde_json::to_string(&items)?;
        self.storage.set(&storage_key(&uid), &raw)?;
        self.items = items;
        Ok(toggled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::source::fake::recipe;

    fn store() -> FavoritesStore {
        FavoritesStore::new(Arc::new(KvStore::open_in_memory().unwrap()))
    }

    fn ids(store: &FavoritesStore) -> Vec<String> {
        store
            .favorites()
            .unwrap()
            .iter()
            .map(|r| r.id.clone())
            .collect()
    }

    #[test]
    fn toggle_requires_a_session() {
        let mut store = store();
        let meal = recipe("52772", "Teriyaki Chicken Casserole", "Chicken", "Japanese");

        let err = store.toggle("userA", &meal).unwrap_err();
        assert!(err.is_auth_required());
        assert!(!store.is_favorite("52772"));
        assert!(store.favorites().is_err());

        store.sign_in(Profile::new("userA")).unwrap();
        store.sign_out();
        assert!(store.toggle("userA", &meal).unwrap_err().is_auth_required());
        assert!(store.storage.get(&storage_key("userA")).unwrap().is_none());
    }

    #[test]
    fn toggle_round_trip_restores_contents() {
        let mut store = store();
        store.sign_in(Profile::new("userA")).unwrap();
        store.toggle("userA", &recipe("1", "One", "Beef", "British")).unwrap();
        store.toggle("userA", &recipe("2", "Two", "Beef", "British")).unwrap();
        assert_eq!(ids(&store), vec!["2", "1"]);

        let third = recipe("3", "Three", "Pork", "Thai");
        assert_eq!(store.toggle("userA", &third).unwrap(), Toggled::Added);
        assert_eq!(ids(&store), vec!["3", "2", "1"]);
        assert_eq!(store.toggle("userA", &third).unwrap(), Toggled::Removed);
        assert_eq!(ids(&store), vec!["2", "1"]);
    }

    #[test]
    fn favorites_are_per_user_and_survive_sign_out() {
        let storage = Arc::new(KvStore::open_in_memory().unwrap());
        let mut store = FavoritesStore::new(storage.clone());
        store.sign_in(Profile::new("userA")).unwrap();
        store
            .toggle("userA", &recipe("52772", "Teriyaki Chicken Casserole", "Chicken", "Japanese"))
            .unwrap();
        store.sign_out();
        assert!(!store.is_favorite("52772"));

        store.sign_in(Profile::new("userB")).unwrap();
        assert!(!store.is_favorite("52772"));
        assert!(ids(&store).is_empty());

        let mut again = FavoritesStore::new(storage);
        again.sign_in(Profile::new("userA")).unwrap();
        assert_eq!(ids(&again), vec!["52772"]);
    }

    #[test]
    fn two_chats_of_one_user_keep_both_toggles() {
        let storage = Arc::new(KvStore::open_in_memory().unwrap());
        let mut private = FavoritesStore::new(storage.clone());
        let mut group = FavoritesStore::new(storage.clone());
        private.sign_in(Profile::new("userA")).unwrap();
        group.sign_in(Profile::new("userA")).unwrap();

        private.toggle("userA", &recipe("1", "One", "Beef", "British")).unwrap();
        group.toggle("userA", &recipe("2", "Two", "Beef", "British")).unwrap();
        assert_eq!(ids(&group), vec!["2", "1"]);

        private.refresh().unwrap();
        assert_eq!(ids(&private), vec!["2", "1"]);

        let mut fresh = FavoritesStore::new(storage);
        fresh.sign_in(Profile::new("userA")).unwrap();
        assert_eq!(ids(&fresh), vec!["2", "1"]);
    }

    #[test]
    fn only_the_signed_in_user_can_toggle() {
        let mut store = store();
        store.sign_in(Profile::new("userA")).unwrap();
        let meal = recipe("1", "One", "Beef", "British");

        assert!(store.toggle("userB", &meal).unwrap_err().is_auth_required());
        assert!(ids(&store).is_empty());
        assert!(store.storage.get(&storage_key("userA")).unwrap().is_none());
    }

    #[test]
    fn corrupt_storage_loads_as_empty() {
        let storage = Arc::new(KvStore::open_in_memory().unwrap());
        storage.set(&storage_key("userA"), "not json").unwrap();
        let mut store = FavoritesStore::new(storage);
        store.sign_in(Profile::new("userA")).unwrap();
        assert!(ids(&store).is_empty());
    }
}
