//! usacycling CLI
//!
//! Fetches events, categories and results from the legacy results site and
//! prints them as JSON.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde::Serialize;
use usacycling::{
    UsaCyclingClient,
    error::Result,
    fetch::{HttpFetcher, ResponseCache},
    models::Config,
};

/// usacycling - USA Cycling legacy results scraper
#[derive(Parser, Debug)]
#[command(
    name = "usacycling",
    version,
    about = "Scrape events and race results from legacy.usacycling.org"
)]
struct Cli {
    /// Path to the TOML configuration file
    #[arg(short, long, default_value = "usacycling.toml")]
    config: PathBuf,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    /// Bypass the response cache
    #[arg(long)]
    no_cache: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// List events for a state and year
    Events {
        /// Two-letter state code
        #[arg(long)]
        state: String,

        #[arg(long)]
        year: i32,
    },

    /// Show an event's permit page details
    Details { permit: String },

    /// List an event's disciplines
    Disciplines { permit: String },

    /// List the categories of a discipline
    Categories { info_id: String, label: String },

    /// List an event's races
    Races { permit: String },

    /// Show the results of a race
    Results { race_id: String },

    /// Details, disciplines, categories and results of an event
    Event {
        permit: String,

        /// Skip fetching result pages
        #[arg(long)]
        no_results: bool,
    },

    /// Validate the configuration file
    Validate,

    /// Delete cached responses
    ClearCache,
}

/// Initialize logging; `RUST_LOG` overrides `level`.
fn init_logging(level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level))
        .format_timestamp_secs()
        .init();
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let loaded = Config::load(&cli.config);
    let level = match (&loaded, cli.verbose) {
        (_, true) => "debug".to_string(),
        (Ok(config), false) => config.logging.level.clone(),
        (Err(_), false) => "info".to_string(),
    };
    init_logging(&level);

    let config = loaded.unwrap_or_else(|e| {
        log::warn!(
            "Config load failed from {}: {}. Using defaults.",
            cli.config.display(),
            e
        );
        Config::default()
    });

    if let Err(e) = config.validate() {
        log::error!("Config validation failed: {}", e);
        return Err(e);
    }

    match cli.command {
        Command::Validate => {
            log::info!("Config OK ({})", cli.config.display());
            return Ok(());
        }
        Command::ClearCache => {
            let cache = ResponseCache::new(&config.cache.dir, None);
            let removed = cache.clear()?;
            log::info!("Removed {} cached responses from {}", removed, cache.dir().display());
            return Ok(());
        }
        _ => {}
    }

    let mut fetcher = HttpFetcher::new(&config)?;
    if cli.no_cache {
        fetcher = fetcher.with_cache(None);
    }
    let base_url = url::Url::parse(&config.client.base_url)?;
    let client = UsaCyclingClient::new(fetcher, base_url);

    match cli.command {
        Command::Events { state, year } => print_json(&client.list_events(&state, year)?)?,
        Command::Details { permit } => print_json(&client.get_event_details(&permit)?)?,
        Command::Disciplines { permit } => print_json(&client.list_disciplines(&permit)?)?,
        Command::Categories { info_id, label } => {
            print_json(&client.get_race_categories(&info_id, &label)?)?
        }
        Command::Races { permit } => print_json(&client.list_races(&permit)?)?,
        Command::Results { race_id } => print_json(&client.get_race_results(&race_id, None)?)?,
        Command::Event { permit, no_results } => {
            print_json(&client.get_complete_event_data(&permit, !no_results)?)?
        }
        Command::Validate | Command::ClearCache => {}
    }

    Ok(())
}
