//! Anime Search CLI application.

use anime_search::{
    qualifies, DetailLoader, FileStore, JikanClient, LogScroll, Ports, SearchHistoryStore,
    SearchOrchestrator, SearchState, SearchView, SortKey, SystemClock, UiEvent, UrlState,
    MIN_QUERY_LEN, QUERY_PARAM,
};
use anyhow::{bail, Context, Result};
use chrono::DateTime;
use clap::{Parser, Subcommand};
use reqwest::Url;
use shared::Config;
use std::path::PathBuf;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Address the search state is mirrored into
const APP_URL: &str = "app://anime-search/";

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Search anime by title
    Search {
        query: String,

        /// Page to show
        #[arg(short, long, default_value_t = 1)]
        page: u32,

        /// Result ordering: default, rating or members
        #[arg(short, long, default_value = "default")]
        sort: SortKey,
    },

    /// Show the full record of one anime
    Detail {
        /// MyAnimeList id
        id: u32,
    },

    /// Show recent searches
    History {
        /// Forget all recent searches
        #[arg(long)]
        clear: bool,
    },

    /// Search as you type, one line at a time
    Interactive,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = Config::from_file(&args.config)
        .with_context(|| format!("Failed to load config from {}", args.config.display()))?;

    let mut log_config =
        shared::LogConfig::from_settings("anime-search", &config.log_dir(), &config.logging);
    if args.verbose {
        log_config.default_level = tracing::Level::DEBUG;
    }
    let _log_guard = shared::logging::init(log_config)?;

    info!(config_file = %args.config.display(), "Anime search starting");

    match args.command {
        Command::Search { query, page, sort } => search(&config, &query, page, sort).await,
        Command::Detail { id } => detail(&config, id).await,
        Command::History { clear } => history(&config, clear),
        Command::Interactive => interactive(&config).await,
    }
}

fn load_history(config: &Config) -> Result<SearchHistoryStore> {
    let state_dir = config.state_dir();
    let store = FileStore::new(&state_dir)
        .with_context(|| format!("Failed to open state directory {}", state_dir.display()))?;
    Ok(SearchHistoryStore::load(
        Box::new(store),
        config.search.history_key.clone(),
    ))
}

fn orchestrator(config: &Config, url: Url) -> Result<SearchOrchestrator> {
    let client = JikanClient::from_config(&config.api).context("Failed to create Jikan client")?;
    let ports = Ports {
        api: Arc::new(client),
        clock: Arc::new(SystemClock),
        url: Box::new(UrlState::new(url)),
        scroll: Box::new(LogScroll),
    };
    let state = SearchState::new(load_history(config)?);
    Ok(SearchOrchestrator::new(
        state,
        ports,
        Duration::from_millis(config.search.debounce_ms),
    ))
}

async fn search(config: &Config, query: &str, page: u32, sort: SortKey) -> Result<()> {
    if !qualifies(query) {
        bail!("Search query must be at least {} characters", MIN_QUERY_LEN);
    }

    let mut url = Url::parse(APP_URL)?;
    url.query_pairs_mut().append_pair(QUERY_PARAM, query.trim());

    let mut orchestrator = orchestrator(config, url)?;
    // Sort first: no query is active yet, so the bootstrap fetch is the only one
    if sort != SortKey::Default {
        orchestrator.handle(UiEvent::SortChanged(sort));
    }
    orchestrator.bootstrap();
    orchestrator.settled().await;

    // Pages are reached the same way a reader would, one step at a time
    while orchestrator.state().page() < page
        && orchestrator.state().pagination().has_next
        && orchestrator.state().error().is_none()
    {
        orchestrator.handle(UiEvent::NextPage);
        orchestrator.settled().await;
    }

    let view = orchestrator.view();
    if let Some(error) = view.error {
        bail!("{}", error.message);
    }
    print!("{}", render(&view));
    Ok(())
}

async fn detail(config: &Config, id: u32) -> Result<()> {
    let client = JikanClient::from_config(&config.api).context("Failed to create Jikan client")?;
    let mut loader = DetailLoader::new(Arc::new(client));

    loader.load(id);
    let state = loader.settled().await;

    if let Some(error) = &state.error {
        bail!("{}", error.message);
    }
    let Some(anime) = &state.anime else {
        bail!("No details received for {}", id);
    };

    println!("{} (#{})", anime.title, anime.mal_id);
    if let Some(english) = &anime.title_english {
        println!("  English:  {}", english);
    }
    if let Some(japanese) = &anime.title_japanese {
        println!("  Japanese: {}", japanese);
    }
    println!(
        "  {} | {} episodes | {}",
        anime.anime_type.as_deref().unwrap_or("?"),
        anime
            .episodes
            .map_or_else(|| "?".to_string(), |n| n.to_string()),
        anime.status.as_deref().unwrap_or("unknown status"),
    );
    if let Some(aired) = anime.aired.as_ref().and_then(|a| a.from.as_deref()) {
        println!("  Aired:    {}", format_date(aired));
    }
    if let Some(score) = anime.score {
        println!(
            "  Score:    {:.2} ({} votes)",
            score,
            anime.scored_by.unwrap_or(0)
        );
    }
    if let Some(rank) = anime.rank {
        println!("  Rank:     #{}", rank);
    }
    if !anime.studios.is_empty() {
        let studios: Vec<&str> = anime.studios.iter().map(|s| s.name.as_str()).collect();
        println!("  Studios:  {}", studios.join(", "));
    }
    if !anime.genres.is_empty() {
        let genres: Vec<&str> = anime.genres.iter().map(|g| g.name.as_str()).collect();
        println!("  Genres:   {}", genres.join(", "));
    }
    if let Some(synopsis) = &anime.synopsis {
        println!();
        println!("{}", synopsis);
    }
    Ok(())
}

fn history(config: &Config, clear: bool) -> Result<()> {
    let mut history = load_history(config)?;

    if clear {
        history.clear();
        info!("Search history cleared");
        return Ok(());
    }

    if history.is_empty() {
        println!("No recent searches");
    }
    for (i, entry) in history.entries().iter().enumerate() {
        println!("{}. {}", i + 1, entry);
    }
    Ok(())
}

async fn interactive(config: &Config) -> Result<()> {
    let orchestrator = orchestrator(config, Url::parse(APP_URL)?)?;

    let (events_tx, events) = mpsc::channel(32);
    let shutdown = CancellationToken::new();
    let recent = Arc::new(Mutex::new(Vec::<String>::new()));

    println!("Type to search. Commands: :next :prev :sort <key> :pick <n> :clear :clear-history :retry :quit");

    let reader = tokio::spawn(read_commands(events_tx, shutdown.clone(), Arc::clone(&recent)));

    let mut last_frame = String::new();
    let state = orchestrator
        .run(events, shutdown.clone(), |view| {
            if let Ok(mut recent) = recent.lock() {
                *recent = view.history_entries.to_vec();
            }
            let frame = render(view);
            if frame != last_frame {
                print!("{}", frame);
                last_frame = frame;
            }
        })
        .await;

    shutdown.cancel();
    reader.await.context("Input reader failed")??;
    info!(recent = state.history().len(), "Interactive session ended");
    Ok(())
}

/// A parsed line of interactive input
#[derive(Debug, PartialEq)]
enum Line {
    Event(UiEvent),
    Quit,
}

fn parse_line(line: &str, recent: &[String]) -> Result<Line, String> {
    let Some(command) = line.strip_prefix(':') else {
        return Ok(Line::Event(UiEvent::InputChanged(line.to_string())));
    };

    let mut parts = command.split_whitespace();
    let event = match (parts.next(), parts.next()) {
        (Some("quit" | "q"), _) => return Ok(Line::Quit),
        (Some("next"), _) => UiEvent::NextPage,
        (Some("prev"), _) => UiEvent::PrevPage,
        (Some("clear"), _) => UiEvent::Clear,
        (Some("clear-history"), _) => UiEvent::ClearHistory,
        (Some("retry"), _) => UiEvent::Retry,
        (Some("sort"), Some(key)) => UiEvent::SortChanged(key.parse().map_err(|e| format!("{e}"))?),
        (Some("pick"), Some(n)) => {
            let index: usize = n.parse().map_err(|_| format!("Not a number: {n}"))?;
            let entry = index
                .checked_sub(1)
                .and_then(|i| recent.get(i))
                .ok_or_else(|| format!("No recent search #{index}"))?;
            UiEvent::HistoryPicked(entry.clone())
        }
        _ => return Err(format!("Unknown command: {line}")),
    };
    Ok(Line::Event(event))
}

async fn read_commands(
    events: mpsc::Sender<UiEvent>,
    shutdown: CancellationToken,
    recent: Arc<Mutex<Vec<String>>>,
) -> Result<()> {
    let mut lines = BufReader::new(tokio::io::stdin()).lines();

    loop {
        let line = tokio::select! {
            _ = shutdown.cancelled() => break,
            line = lines.next_line() => line.context("Failed to read input")?,
        };
        let Some(line) = line else { break };

        let snapshot = recent.lock().map(|r| r.clone()).unwrap_or_default();
        match parse_line(&line, &snapshot) {
            Ok(Line::Quit) => break,
            Ok(Line::Event(event)) => {
                debug!(event = ?event, "Input event");
                if events.send(event).await.is_err() {
                    break;
                }
            }
            Err(message) => eprintln!("{}", message),
        }
    }

    shutdown.cancel();
    Ok(())
}

fn render(view: &SearchView<'_>) -> String {
    use std::fmt::Write;

    let mut out = String::new();
    if view.is_loading {
        let _ = writeln!(
            out,
            "Searching \"{}\" (page {}, {})...",
            view.query, view.page, view.sort_key
        );
        return out;
    }
    if let Some(error) = view.error {
        let _ = writeln!(out, "! {}", error.message);
        if error.category.is_retryable() {
            let _ = writeln!(out, "  (:retry to try again)");
        }
        return out;
    }
    if view.query.is_empty() {
        if !view.history_entries.is_empty() {
            let _ = writeln!(out, "Recent: {}", numbered(view.history_entries));
        }
        return out;
    }

    let pagination = view.pagination;
    let _ = writeln!(
        out,
        "\"{}\" page {}/{} ({} results, sorted by {})",
        view.query, pagination.current_page, pagination.last_page, pagination.total, view.sort_key
    );
    for anime in view.results {
        let _ = writeln!(
            out,
            "  {:>6}  {}  [{}, {} eps, {}]  score {}  members {}",
            anime.mal_id,
            anime.title,
            anime.anime_type.as_deref().unwrap_or("?"),
            anime.episodes.map_or_else(|| "?".to_string(), |n| n.to_string()),
            anime.year.map_or_else(|| "?".to_string(), |y| y.to_string()),
            anime.score.map_or_else(|| "-".to_string(), |s| format!("{s:.2}")),
            anime.members.unwrap_or(0),
        );
    }
    if view.results.is_empty() {
        let _ = writeln!(out, "  No results");
    }
    out
}

fn numbered(entries: &[String]) -> String {
    entries
        .iter()
        .enumerate()
        .map(|(i, entry)| format!("{}. {}", i + 1, entry))
        .collect::<Vec<_>>()
        .join("  ")
}

/// Render an RFC 3339 timestamp as a calendar date, or pass it through
fn format_date(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .map(|date| date.format("%b %-d, %Y").to_string())
        .unwrap_or_else(|_| raw.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use anime_search::{ErrorCategory, FetchContext, Pagination, SearchError};

    fn recent() -> Vec<String> {
        vec!["naruto".to_string(), "bleach".to_string()]
    }

    #[test]
    fn test_plain_line_is_input() {
        assert_eq!(
            parse_line("one piece", &recent()),
            Ok(Line::Event(UiEvent::InputChanged("one piece".to_string())))
        );
    }

    #[test]
    fn test_commands() {
        let recent = recent();
        assert_eq!(parse_line(":next", &recent), Ok(Line::Event(UiEvent::NextPage)));
        assert_eq!(parse_line(":prev", &recent), Ok(Line::Event(UiEvent::PrevPage)));
        assert_eq!(parse_line(":retry", &recent), Ok(Line::Event(UiEvent::Retry)));
        assert_eq!(parse_line(":clear", &recent), Ok(Line::Event(UiEvent::Clear)));
        assert_eq!(
            parse_line(":clear-history", &recent),
            Ok(Line::Event(UiEvent::ClearHistory))
        );
        assert_eq!(
            parse_line(":sort rating", &recent),
            Ok(Line::Event(UiEvent::SortChanged(SortKey::Rating)))
        );
        assert_eq!(parse_line(":quit", &recent), Ok(Line::Quit));
    }

    #[test]
    fn test_pick_uses_one_based_index() {
        assert_eq!(
            parse_line(":pick 2", &recent()),
            Ok(Line::Event(UiEvent::HistoryPicked("bleach".to_string())))
        );
        assert!(parse_line(":pick 0", &recent()).is_err());
        assert!(parse_line(":pick 3", &recent()).is_err());
        assert!(parse_line(":pick x", &recent()).is_err());
    }

    #[test]
    fn test_unknown_command() {
        assert!(parse_line(":jump 4", &recent()).is_err());
        assert!(parse_line(":sort", &recent()).is_err());
    }

    fn view_with_error<'a>(error: &'a SearchError, pagination: &'a Pagination) -> SearchView<'a> {
        SearchView {
            input_value: "naruto",
            query: "naruto",
            page: 1,
            sort_key: SortKey::Default,
            is_loading: false,
            results: &[],
            pagination,
            error: Some(error),
            history_entries: &[],
        }
    }

    #[test]
    fn test_render_offers_retry_for_retryable_errors() {
        let pagination = Pagination::default();

        let busy = SearchError::new(ErrorCategory::RateLimited, FetchContext::Search);
        let frame = render(&view_with_error(&busy, &pagination));
        assert!(frame.contains("The anime API is currently busy."));
        assert!(frame.contains(":retry"));

        let missing = SearchError::new(ErrorCategory::NotFound, FetchContext::Search);
        let frame = render(&view_with_error(&missing, &pagination));
        assert!(frame.contains("No anime found matching your search."));
        assert!(!frame.contains(":retry"));
    }

    #[test]
    fn test_format_date() {
        assert_eq!(format_date("1998-04-03T00:00:00+00:00"), "Apr 3, 1998");
        assert_eq!(format_date("1998"), "1998");
    }
}
