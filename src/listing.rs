//! What a chat is currently looking at: the base set from the last search or
//! catalog load, the filtered set on display, and the page within it.

use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::AppError;
use crate::recipe::Recipe;
use crate::search::FilterSelection;

pub const LABEL_ALL: &str = "All Recipes";
pub const DEFAULT_PAGE_SIZE: usize = 16;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum Status {
    #[default]
    Idle,
    Loading,
    Success,
    Error(String),
}

pub fn page_count(len: usize, page_size: usize) -> usize {
    len.div_ceil(page_size)
}

/// Slice for 1-based `page`. Out-of-range pages yield an empty slice; keeping
/// `page` within bounds is the caller's job.
pub fn paginate<T>(items: &[T], page: usize, page_size: usize) -> &[T] {
    let start = page.saturating_sub(1) * page_size;
    if page == 0 || start >= items.len() {
        return &[];
    }
    let end = (start + page_size).min(items.len());
    &items[start..end]
}

/// Issued by [`ListingState::begin`]; results carrying an older ticket than
/// the latest one are dropped.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ticket(u64);

#[derive(Debug, Clone)]
pub struct ListingState {
    status: Status,
    base: Vec<Recipe>,
    displayed: Vec<Recipe>,
    page: usize,
    page_size: usize,
    query: String,
    selection: FilterSelection,
    label: String,
    generation: u64,
}

impl ListingState {
    pub fn new(page_size: usize) -> Self {
        Self {
            status: Status::Idle,
            base: Vec::new(),
            displayed: Vec::new(),
            page: 1,
            page_size: page_size.max(1),
            query: String::new(),
            selection: FilterSelection::default(),
            label: LABEL_ALL.to_string(),
            generation: 0,
        }
    }

    pub fn status(&self) -> &Status {
        &self.status
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn selection(&self) -> &FilterSelection {
        &self.selection
    }

    pub fn base(&self) -> &[Recipe] {
        &self.base
    }

    pub fn displayed(&self) -> &[Recipe] {
        &self.displayed
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn page_count(&self) -> usize {
        page_count(self.displayed.len(), self.page_size)
    }

    /// Current page; empty unless the last operation succeeded.
    pub fn current_page(&self) -> &[Recipe] {
        if self.status != Status::Success {
            return &[];
        }
        paginate(&self.displayed, self.page, self.page_size)
    }

    /// Refuses pages outside `1..=page_count`.
    pub fn go_to(&mut self, page: usize) -> bool {
        if self.status != Status::Success || page == 0 || page > self.page_count() {
            return false;
        }
        self.page = page;
        true
    }

    pub fn begin(&mut self) -> Ticket {
        self.generation += 1;
        self.status = Status::Loading;
        Ticket(self.generation)
    }

    pub fn is_current(&self, ticket: Ticket) -> bool {
        ticket.0 == self.generation
    }

    /// New base set from a search; a blank query means the whole catalog.
    /// Returns `false` when `ticket` was superseded and nothing changed.
    pub fn finish_search(
        &mut self,
        ticket: Ticket,
        query: &str,
        result: Result<Vec<Recipe>, AppError>,
    ) -> bool {
        if !self.is_current(ticket) {
            log::debug!("Dropping superseded search for '{}'", query);
            return false;
        }
        let query = query.trim();
        match result {
            Ok(recipes) => {
                self.query = query.to_string();
                self.selection = FilterSelection::default();
                self.label = self.search_label();
                self.base = recipes.clone();
                self.show(recipes);
            }
            Err(e) => {
                log::warn!("Search for '{}' failed: {}", query, e);
                let message = if query.is_empty() {
                    "Failed to load recipes."
                } else {
                    "Search failed."
                };
                self.base.clear();
                self.displayed.clear();
                self.status = Status::Error(message.to_string());
            }
        }
        true
    }

    pub fn finish_filter(
        &mut self,
        ticket: Ticket,
        selection: FilterSelection,
        result: Result<Vec<Recipe>, AppError>,
    ) -> bool {
        if !self.is_current(ticket) {
            log::debug!("Dropping superseded filter {}", selection.summary());
            return false;
        }
        match result {
            Ok(recipes) => {
                self.label = if selection.is_empty() {
                    self.search_label()
                } else {
                    selection.summary()
                };
                self.selection = selection;
                self.show(recipes);
            }
            Err(e) => {
                log::warn!("Applying {} failed: {}", selection.summary(), e);
                self.displayed.clear();
                self.status = Status::Error("Failed to apply filters.".to_string());
            }
        }
        true
    }

    pub fn find(&self, id: &str) -> Option<&Recipe> {
        self.displayed
            .iter()
            .chain(self.base.iter())
            .find(|r| r.id == id)
    }

    pub fn pick_random<R: Rng + ?Sized>(&self, rng: &mut R) -> Option<&Recipe> {
        if self.status != Status::Success {
            return None;
        }
        self.displayed.choose(rng)
    }

    fn search_label(&self) -> String {
        if self.query.is_empty() {
            LABEL_ALL.to_string()
        } else {
            format!("Search: {}", self.query)
        }
    }

    fn show(&mut self, recipes: Vec<Recipe>) {
        self.displayed = recipes;
        self.page = 1;
        self.status = Status::Success;
    }
}
