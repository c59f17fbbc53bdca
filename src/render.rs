//! MarkdownV2 text for the bot replies.

use crate::favorites::FavoritesStore;
use crate::listing::{self, ListingState, Status};
use crate::recipe::Recipe;

static SPECIAL_CHARACTERS: [char; 19] = [
    '_', '*', '[', ']', '(', ')', '~', '`', '>', '#', '+', '-', '=', '|', '{', '}', '.', '!', '\\',
];

const SUMMARY_INGREDIENTS: usize = 8;

/// Longest text Telegram accepts in one message.
pub const MESSAGE_LIMIT: usize = 4096;

pub fn escape_markdown(str: &str) -> String {
    let mut new_str = String::with_capacity(str.len());
    for c in str.chars() {
        if SPECIAL_CHARACTERS.contains(&c) {
            new_str.push('\\');
        }
        new_str.push(c)
    }
    new_str
}

fn marker(favorites: &FavoritesStore, id: &str) -> &'static str {
    if favorites.is_favorite(id) {
        "♥"
    } else {
        "♡"
    }
}

pub fn card(recipe: &Recipe, favorites: &FavoritesStore) -> String {
    let mut out = format!(
        "{} *{}* `/show {}`",
        marker(favorites, &recipe.id),
        escape_markdown(&recipe.name),
        recipe.id
    );
    let tagline = recipe.tagline();
    if !tagline.is_empty() {
        out.push_str(&format!("\n_{}_", escape_markdown(&tagline)));
    }
    let summary = recipe.ingredient_summary(SUMMARY_INGREDIENTS);
    if !summary.is_empty() {
        out.push_str(&format!("\n{}", escape_markdown(&summary)));
    }
    out
}

pub fn cards(recipes: &[Recipe], favorites: &FavoritesStore) -> String {
    recipes
        .iter()
        .map(|r| card(r, favorites))
        .collect::<Vec<_>>()
        .join("\n\n")
}

pub fn page(listing: &ListingState, favorites: &FavoritesStore) -> String {
    let mut out = format!("*{}*\n\n", escape_markdown(listing.label()));
    match listing.status() {
        Status::Idle => out.push_str("Use /recipes to browse or /search to look something up\\."),
        Status::Loading => out.push_str("Loading recipes…"),
        Status::Error(message) => {
            out.push_str(&escape_markdown(message));
            out.push_str(" /reload to try again\\.");
        }
        Status::Success if listing.displayed().is_empty() => {
            out.push_str("No recipes match\\. Try another search or /filter\\.")
        }
        Status::Success => {
            out.push_str(&cards(listing.current_page(), favorites));
            if listing.page_count() > 1 {
                out.push_str(&format!(
                    "\n\nPage {}/{}  /prev  /next",
                    listing.page(),
                    listing.page_count()
                ));
            }
        }
    }
    if !listing.selection().is_empty() {
        out.push_str("\n\n/filter with no argument clears the filters\\.");
    }
    out
}

pub fn details(recipe: &Recipe, favorites: &FavoritesStore) -> String {
    let mut out = format!(
        "{} *{}*",
        marker(favorites, &recipe.id),
        escape_markdown(&recipe.name)
    );
    let tagline = recipe.tagline();
    if !tagline.is_empty() {
        out.push_str(&format!("\n_{}_", escape_markdown(&tagline)));
    }

    if !recipe.ingredients.is_empty() {
        out.push_str("\n\n*Ingredients*");
        for ingredient in &recipe.ingredients {
            out.push_str(&format!(
                "\n• [{}]({}) [⤢]({})",
                escape_markdown(&ingredient.line()),
                ingredient.image_small(),
                ingredient.image_2x()
            ));
        }
    }

    let steps = recipe.steps();
    if !steps.is_empty() {
        out.push_str("\n\n*Instructions*");
        for (i, step) in steps.iter().enumerate() {
            out.push_str(&format!("\n{}\\. {}", i + 1, escape_markdown(step)));
        }
    }

    if let Some(video) = &recipe.video {
        out.push_str(&format!("\n\n[Watch on YouTube]({})", video));
    }
    out.push_str(&format!("\n\n/fav {} to save or unsave", recipe.id));
    out
}

pub fn options(title: &str, names: &[String]) -> String {
    if names.is_empty() {
        return format!("No {} available right now\\.", escape_markdown(title));
    }
    format!(
        "*{}*\n{}",
        escape_markdown(title),
        escape_markdown(&names.join(", "))
    )
}

pub fn sign_in_prompt() -> String {
    "Sign in first to open the Favorites page or save recipes\\. Use /signin\\.".to_string()
}

/// Page `page` (1-based) of the signed-in user's favorites.
pub fn favorites(store: &FavoritesStore, page: usize, page_size: usize) -> String {
    let (Some(profile), Ok(items)) = (store.auth().profile(), store.favorites()) else {
        return sign_in_prompt();
    };
    let mut header = format!("*{}'s favorites*", escape_markdown(profile.display_name()));
    if let Some(avatar) = &profile.avatar_url {
        header.push_str(&format!(" [👤]({})", avatar));
    }
    if items.is_empty() {
        return format!("{header}\n\nNothing saved yet\\. Use /fav followed by a recipe id\\.");
    }

    let pages = listing::page_count(items.len(), page_size);
    let shown = listing::paginate(items, page, page_size);
    if shown.is_empty() {
        return format!("{header}\n\nNo such page\\. You have {pages} pages of favorites\\.");
    }
    let mut out = format!("{header}\n\n{}", cards(shown, store));
    if pages > 1 {
        out.push_str(&format!("\n\nPage {page}/{pages}"));
        if page < pages {
            out.push_str(&format!("  /favorites {}", page + 1));
        }
    }
    out
}

/// Cuts `text` into messages of at most `limit` characters. Cuts fall on line
/// breaks where possible; a line too long on its own is cut mid-line, but never
/// between a backslash and the character it escapes.
pub fn split_message(text: &str, limit: usize) -> Vec<String> {
    let mut chunks = Vec::new();
    let mut current = String::new();
    let mut current_len = 0;
    for line in text.split('\n') {
        let mut rest = line;
        loop {
            let len = rest.chars().count();
            let separator = usize::from(current_len > 0);
            if current_len + separator + len <= limit {
                if separator == 1 {
                    current.push('\n');
                }
                current.push_str(rest);
                current_len += separator + len;
                break;
            }
            if current_len > 0 {
                chunks.push(std::mem::take(&mut current));
                current_len = 0;
                continue;
            }
            let (head, tail) = cut_line(rest, limit);
            chunks.push(head.to_string());
            rest = tail;
        }
    }
    if !current.is_empty() {
        chunks.push(current);
    }
    chunks
}

fn cut_line(line: &str, limit: usize) -> (&str, &str) {
    let mut end = line
        .char_indices()
        .nth(limit)
        .map_or(line.len(), |(index, _)| index);
    let escapes = line[..end].chars().rev().take_while(|&c| c == '\\').count();
    if escapes % 2 == 1 && end > 1 {
        end -= 1;
    }
    line.split_at(end)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::KvStore;
    use crate::recipe::Ingredient;
    use crate::session::Profile;
    use crate::source::fake::recipe;
    use std::sync::Arc;

    fn store() -> FavoritesStore {
        FavoritesStore::new(Arc::new(KvStore::open_in_memory().unwrap()))
    }

    #[test]
    fn escapes_markdown_specials() {
        assert_eq!(escape_markdown("Pie (1.5)!"), "Pie \\(1\\.5\\)\\!");
        assert_eq!(escape_markdown("plain"), "plain");
    }

    #[test]
    fn card_marks_favorites() {
        let mut store = store();
        let meal = recipe("52772", "Teriyaki Chicken", "Chicken", "Japanese");
        assert!(card(&meal, &store).starts_with("♡ *Teriyaki Chicken*"));

        store.sign_in(Profile::new("userA")).unwrap();
        store.toggle("userA", &meal).unwrap();
        let text = card(&meal, &store);
        assert!(text.starts_with("♥"));
        assert!(text.contains("_Chicken • Japanese_"));
    }

    #[test]
    fn details_list_ingredients_and_steps() {
        let mut meal = recipe("1", "Stew", "Beef", "Irish");
        meal.ingredients.push(Ingredient {
            name: "Beef Brisket".to_string(),
            measure: "1kg".to_string(),
        });
        meal.instructions = "Brown the beef.\n\nSimmer.".to_string();

        let text = details(&meal, &store());
        assert!(text.contains(
            "• [1kg Beef Brisket](https://www.themealdb.com/images/ingredients/Beef%20Brisket-Small.png) \
             [⤢](https://www.themealdb.com/images/ingredients/Beef%20Brisket.png)"
        ));
        assert!(text.contains("1\\. Brown the beef\\."));
        assert!(text.contains("2\\. Simmer\\."));
    }

    #[test]
    fn favorites_page_is_gated() {
        let mut store = store();
        assert!(favorites(&store, 1, 16).starts_with("Sign in first"));
        store
            .sign_in(Profile {
                display_name: Some("Ada".to_string()),
                avatar_url: Some("https://example.com/ada.png".to_string()),
                ..Profile::new("userA")
            })
            .unwrap();
        let text = favorites(&store, 1, 16);
        assert!(text.starts_with("*Ada's favorites* [👤](https://example.com/ada.png)"));
        assert!(text.contains("Nothing saved yet"));
    }

    fn hearty(i: usize) -> Recipe {
        let mut meal = recipe(&i.to_string(), &format!("Meal {i}"), "Beef", "British");
        meal.ingredients = (1..=8)
            .map(|k| Ingredient {
                name: format!("Ingredient {k}"),
                measure: "1 cup".to_string(),
            })
            .collect();
        meal
    }

    #[test]
    fn long_favorites_lists_are_paged() {
        let mut store = store();
        store.sign_in(Profile::new("userA")).unwrap();
        for i in 1..=40 {
            store.toggle("userA", &hearty(i)).unwrap();
        }

        let first = favorites(&store, 1, 16);
        assert!(first.chars().count() <= MESSAGE_LIMIT);
        assert_eq!(first.matches("`/show ").count(), 16);
        assert!(first.contains("`/show 40`"));
        assert!(first.ends_with("Page 1/3  /favorites 2"));

        let last = favorites(&store, 3, 16);
        assert_eq!(last.matches("`/show ").count(), 8);
        assert!(last.ends_with("Page 3/3"));

        assert!(favorites(&store, 4, 16).contains("No such page"));
    }

    #[test]
    fn long_details_split_into_messages() {
        let mut meal = hearty(1);
        meal.instructions = (1..=400)
            .map(|i| format!("Stir the pot for {i} minutes."))
            .collect::<Vec<_>>()
            .join("\n");

        let text = details(&meal, &store());
        assert!(text.chars().count() > MESSAGE_LIMIT);
        let chunks = split_message(&text, MESSAGE_LIMIT);
        assert!(chunks.len() > 1);
        assert!(chunks.iter().all(|c| c.chars().count() <= MESSAGE_LIMIT));
        assert_eq!(chunks.join("\n"), text);
    }

    #[test]
    fn overlong_lines_keep_escapes_whole() {
        assert_eq!(split_message("ab\ncd", 3), vec!["ab", "cd"]);
        assert_eq!(
            split_message("aaaaaaaaa\\.", 10),
            vec!["aaaaaaaaa", "\\."]
        );
        assert_eq!(split_message("short", MESSAGE_LIMIT), vec!["short"]);
    }
}
