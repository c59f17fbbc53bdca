use dotenv::dotenv;
use std::sync::Arc;
use teloxide::dispatching::dialogue::{InMemStorage, InMemStorageError};
use teloxide::dispatching::*;
use teloxide::types::{InputFile, ParseMode};
use teloxide::{prelude::*, utils::command::BotCommands};

mod catalog;
mod config;
mod db;
mod error;
mod favorites;
mod listing;
mod recipe;
mod render;
mod search;
mod session;
mod source;

use config::Config;
use db::KvStore;
use error::AppError;
use favorites::{FavoritesStore, Toggled};
use listing::{ListingState, Status};
use recipe::Recipe;
use search::FilterSelection;
use session::Profile;
use source::{MealDbClient, RecipeSource};

type HandlerResult = Result<(), Box<dyn std::error::Error + Send + Sync>>;
type MyDialogue = Dialogue<State, InMemStorage<State>>;

#[derive(BotCommands, Clone)]
#[command(
    rename_rule = "lowercase",
    description = "These commands are supported:"
)]
enum Command {
    #[command(description = "Display this text.")]
    Help,
    #[command(description = "Show a few featured recipes.")]
    Start,
    #[command(description = "Browse every recipe.")]
    Recipes,
    #[command(description = "Search by dish or ingredient.")]
    Search(String),
    #[command(description = "List the recipe categories.")]
    Categories,
    #[command(description = "List the cuisines.")]
    Cuisines,
    #[command(description = "Filter as `Beef, Chicken | Italian`; no argument clears filters.")]
    Filter(String),
    #[command(description = "Jump to a page of the current list.")]
    Page(String),
    #[command(description = "Next page.")]
    Next,
    #[command(description = "Previous page.")]
    Prev,
    #[command(description = "Clear search and filters and reload every recipe.")]
    Reload,
    #[command(description = "Show a recipe by id.")]
    Show(String),
    #[command(description = "Save or unsave a recipe by id.")]
    Fav(String),
    #[command(description = "List your saved recipes; add a page number to see more.")]
    Favorites(String),
    #[command(description = "Pick a random recipe from the current list.")]
    Surprise,
    #[command(description = "Sign in to save recipes.")]
    Signin,
    #[command(description = "Sign out.")]
    Signout,
}

#[derive(Clone, Default)]
pub enum State {
    #[default]
    Start,
    Browsing(Box<ChatSession>),
}

/// Everything a chat carries between commands.
#[derive(Clone)]
pub struct ChatSession {
    listing: ListingState,
    favorites: FavoritesStore,
}

struct App {
    source: Arc<dyn RecipeSource>,
    storage: Arc<KvStore>,
    config: Config,
}

impl App {
    fn session(&self, state: State) -> ChatSession {
        match state {
            State::Start => ChatSession {
                listing: ListingState::new(self.config.page_size),
                favorites: FavoritesStore::new(self.storage.clone()),
            },
            State::Browsing(session) => *session,
        }
    }

    /// Re-reads the chat state; used after awaiting the remote source.
    async fn current_session(&self, dialogue: &MyDialogue) -> Result<ChatSession, InMemStorageError> {
        let state = dialogue.get().await?.unwrap_or_default();
        Ok(self.session(state))
    }
}

async fn save(dialogue: &MyDialogue, session: ChatSession) -> HandlerResult {
    dialogue.update(State::Browsing(Box::new(session))).await?;
    Ok(())
}

#[tokio::main]
async fn main() {
    // Load all env variables from .env file.
    dotenv().ok();
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "info");
    }
    pretty_env_logger::init();
    log::info!("Starting bot...");

    let config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            log::error!("{}", e);
            std::process::exit(1);
        }
    };

    log::info!("Loading storage");
    let storage = match KvStore::open(&config.db_path) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            log::error!("Failed to open {}: {}", config.db_path, e);
            std::process::exit(1);
        }
    };

    let source: Arc<dyn RecipeSource> = Arc::new(MealDbClient::new(config.api_url.clone()));
    let app = Arc::new(App {
        source,
        storage,
        config,
    });

    let bot = Bot::from_env();

    let handler = Update::filter_message()
        .filter_command::<Command>()
        .enter_dialogue::<Message, InMemStorage<State>, State>()
        .branch(dptree::case![Command::Help].endpoint(help))
        .branch(dptree::case![Command::Start].endpoint(featured))
        .branch(dptree::case![Command::Recipes].endpoint(browse_all))
        .branch(dptree::case![Command::Reload].endpoint(browse_all))
        .branch(dptree::case![Command::Search(query)].endpoint(run_search))
        .branch(dptree::case![Command::Categories].endpoint(categories))
        .branch(dptree::case![Command::Cuisines].endpoint(cuisines))
        .branch(dptree::case![Command::Filter(text)].endpoint(filter))
        .branch(dptree::case![Command::Page(number)].endpoint(go_to_page))
        .branch(dptree::case![Command::Next].endpoint(next_page))
        .branch(dptree::case![Command::Prev].endpoint(prev_page))
        .branch(dptree::case![Command::Show(id)].endpoint(show))
        .branch(dptree::case![Command::Fav(id)].endpoint(toggle_favorite))
        .branch(dptree::case![Command::Favorites(page)].endpoint(list_favorites))
        .branch(dptree::case![Command::Surprise].endpoint(surprise))
        .branch(dptree::case![Command::Signin].endpoint(sign_in))
        .branch(dptree::case![Command::Signout].endpoint(sign_out));

    Dispatcher::builder(bot, handler)
        .dependencies(dptree::deps![app, InMemStorage::<State>::new()])
        .enable_ctrlc_handler()
        .build()
        .dispatch()
        .await;
}

async fn reply(bot: &Bot, msg: &Message, text: String) -> HandlerResult {
    for chunk in render::split_message(&text, render::MESSAGE_LIMIT) {
        bot.send_message(msg.chat.id, chunk)
            .parse_mode(ParseMode::MarkdownV2)
            .await?;
    }
    Ok(())
}

/// Telegram user id of whoever sent `msg`, as stored in a [`Profile`].
fn caller(msg: &Message) -> Option<String> {
    msg.from.as_ref().map(|user| user.id.0.to_string())
}

async fn help(bot: Bot, msg: Message) -> HandlerResult {
    bot.send_message(msg.chat.id, Command::descriptions().to_string())
        .await?;
    Ok(())
}

async fn featured(bot: Bot, app: Arc<App>, msg: Message, state: State) -> HandlerResult {
    let session = app.session(state);
    let text = match catalog::load_featured(
        app.source.as_ref(),
        &app.config.featured_category,
        app.config.featured_limit,
    )
    .await
    {
        Ok(recipes) if !recipes.is_empty() => format!(
            "*Featured {} recipes*\n\n{}",
            render::escape_markdown(&app.config.featured_category),
            render::cards(&recipes, &session.favorites)
        ),
        Ok(_) => "No featured recipes right now\\. Try /recipes\\.".to_string(),
        Err(e) => {
            log::warn!("Featured recipes failed: {}", e);
            "Could not load featured recipes\\. Try /recipes\\.".to_string()
        }
    };
    reply(&bot, &msg, text).await
}

async fn browse_all(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
) -> HandlerResult {
    run_search(bot, dialogue, app, msg, state, String::new()).await
}

async fn run_search(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
    query: String,
) -> HandlerResult {
    let mut session = app.session(state);
    let ticket = session.listing.begin();
    save(&dialogue, session).await?;

    let result = search::search(app.source.as_ref(), &query).await;

    let mut session = app.current_session(&dialogue).await?;
    if !session.listing.finish_search(ticket, &query, result) {
        return Ok(());
    }
    let text = render::page(&session.listing, &session.favorites);
    save(&dialogue, session).await?;
    reply(&bot, &msg, text).await
}

async fn categories(bot: Bot, app: Arc<App>, msg: Message) -> HandlerResult {
    let names = catalog::category_options(app.source.as_ref()).await;
    reply(&bot, &msg, render::options("Categories", &names)).await
}

async fn cuisines(bot: Bot, app: Arc<App>, msg: Message) -> HandlerResult {
    let names = catalog::cuisine_options(app.source.as_ref()).await;
    reply(&bot, &msg, render::options("Cuisines", &names)).await
}

async fn filter(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
    text: String,
) -> HandlerResult {
    let mut session = app.session(state);
    if session.listing.status() == &Status::Idle {
        return reply(&bot, &msg, "Use /recipes or /search first\\.".to_string()).await;
    }
    let selection = FilterSelection::parse(&text);
    let base = session.listing.base().to_vec();
    let ticket = session.listing.begin();
    save(&dialogue, session).await?;

    let result = search::apply_filters(app.source.as_ref(), &base, &selection).await;

    let mut session = app.current_session(&dialogue).await?;
    if !session.listing.finish_filter(ticket, selection, result) {
        return Ok(());
    }
    let text = render::page(&session.listing, &session.favorites);
    save(&dialogue, session).await?;
    reply(&bot, &msg, text).await
}

async fn turn_page(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
    target: impl FnOnce(&ListingState) -> Option<usize>,
) -> HandlerResult {
    let mut session = app.session(state);
    let moved = target(&session.listing)
        .map(|page| session.listing.go_to(page))
        .unwrap_or(false);
    if !moved {
        return reply(&bot, &msg, "No such page\\.".to_string()).await;
    }
    let text = render::page(&session.listing, &session.favorites);
    save(&dialogue, session).await?;
    reply(&bot, &msg, text).await
}

async fn go_to_page(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
    number: String,
) -> HandlerResult {
    let page = number.trim().parse::<usize>().ok();
    turn_page(bot, dialogue, app, msg, state, move |_| page).await
}

async fn next_page(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
) -> HandlerResult {
    turn_page(bot, dialogue, app, msg, state, |l| Some(l.page() + 1)).await
}

async fn prev_page(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
) -> HandlerResult {
    turn_page(bot, dialogue, app, msg, state, |l| l.page().checked_sub(1)).await
}

/// Finds a recipe in what the chat already holds before asking the source.
async fn resolve(app: &App, session: &ChatSession, id: &str) -> Result<Option<Recipe>, AppError> {
    if let Some(recipe) = session.listing.find(id) {
        return Ok(Some(recipe.clone()));
    }
    if let Ok(saved) = session.favorites.favorites() {
        if let Some(recipe) = saved.iter().find(|r| r.id == id) {
            return Ok(Some(recipe.clone()));
        }
    }
    app.source.lookup(id).await
}

async fn show(bot: Bot, app: Arc<App>, msg: Message, state: State, id: String) -> HandlerResult {
    let session = app.session(state);
    let id = id.trim();
    let recipe = match resolve(&app, &session, id).await {
        Ok(Some(recipe)) => recipe,
        Ok(None) => return reply(&bot, &msg, "No recipe with that id\\.".to_string()).await,
        Err(e) => {
            log::warn!("Lookup of {} failed: {}", id, e);
            return reply(&bot, &msg, "Could not load that recipe\\.".to_string()).await;
        }
    };

    if let Some(url) = recipe.thumbnail.as_ref().and_then(|t| t.parse().ok()) {
        if let Err(e) = bot.send_photo(msg.chat.id, InputFile::url(url)).await {
            log::warn!("Could not send thumbnail of {}: {}", recipe.id, e);
        }
    }
    reply(&bot, &msg, render::details(&recipe, &session.favorites)).await
}

async fn toggle_favorite(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
    id: String,
) -> HandlerResult {
    let mut session = app.session(state);
    let uid = caller(&msg).unwrap_or_default();
    if session.favorites.auth().require_user(&uid).is_err() {
        return reply(&bot, &msg, render::sign_in_prompt()).await;
    }

    let id = id.trim();
    let recipe = match resolve(&app, &session, id).await {
        Ok(Some(recipe)) => recipe,
        Ok(None) => return reply(&bot, &msg, "No recipe with that id\\.".to_string()).await,
        Err(e) => {
            log::warn!("Lookup of {} failed: {}", id, e);
            return reply(&bot, &msg, "Could not load that recipe\\.".to_string()).await;
        }
    };

    let text = match session.favorites.toggle(&uid, &recipe) {
        Ok(Toggled::Added) => format!("Saved *{}*\\.", render::escape_markdown(&recipe.name)),
        Ok(Toggled::Removed) => format!("Removed *{}*\\.", render::escape_markdown(&recipe.name)),
        Err(e) if e.is_auth_required() => render::sign_in_prompt(),
        Err(e) => {
            log::error!("Could not save favorites: {}", e);
            "Could not save your favorites right now\\.".to_string()
        }
    };
    save(&dialogue, session).await?;
    reply(&bot, &msg, text).await
}

async fn list_favorites(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
    page: String,
) -> HandlerResult {
    let mut session = app.session(state);
    let uid = caller(&msg).unwrap_or_default();
    if session.favorites.auth().require_user(&uid).is_err() {
        return reply(&bot, &msg, render::sign_in_prompt()).await;
    }
    let page = match page.trim() {
        "" => 1,
        number => match number.parse::<usize>() {
            Ok(page) => page,
            Err(_) => return reply(&bot, &msg, "No such page\\.".to_string()).await,
        },
    };

    session.favorites.refresh()?;
    let text = render::favorites(&session.favorites, page, app.config.page_size);
    save(&dialogue, session).await?;
    reply(&bot, &msg, text).await
}

async fn surprise(bot: Bot, app: Arc<App>, msg: Message, state: State) -> HandlerResult {
    let session = app.session(state);
    let pick = session.listing.pick_random(&mut rand::thread_rng()).cloned();
    let text = match pick {
        Some(recipe) => render::details(&recipe, &session.favorites),
        None => "Nothing to pick from\\. Use /recipes or /search first\\.".to_string(),
    };
    reply(&bot, &msg, text).await
}

async fn sign_in(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
) -> HandlerResult {
    let Some(user) = msg.from.as_ref() else {
        return reply(&bot, &msg, "Sign in needs a user account\\.".to_string()).await;
    };
    let profile = Profile {
        display_name: Some(user.full_name()),
        ..Profile::new(user.id.0.to_string())
    };

    let mut session = app.session(state);
    if session.favorites.auth().profile() == Some(&profile) {
        return reply(&bot, &msg, "You are already signed in\\.".to_string()).await;
    }
    let name = render::escape_markdown(profile.display_name());
    session.favorites.sign_in(profile)?;
    save(&dialogue, session).await?;
    reply(&bot, &msg, format!("Signed in as *{}*\\. See /favorites\\.", name)).await
}

async fn sign_out(
    bot: Bot,
    dialogue: MyDialogue,
    app: Arc<App>,
    msg: Message,
    state: State,
) -> HandlerResult {
    let mut session = app.session(state);
    let uid = caller(&msg).unwrap_or_default();
    if session.favorites.auth().require_user(&uid).is_err() {
        return reply(&bot, &msg, "You are not signed in\\.".to_string()).await;
    }
    session.favorites.sign_out();
    save(&dialogue, session).await?;
    reply(&bot, &msg, "Signed out\\. /signin to come back\\.".to_string()).await
}
