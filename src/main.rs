use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use serde::Serialize;
use tracing::warn;
use tracing_subscriber::EnvFilter;

use placeresolver::cache::set_cache_enabled;
use placeresolver::date::RecordDate;
use placeresolver::registry::Registry;
use placeresolver::resolve::Resolver;
use placeresolver::settings::Settings;
use placeresolver::validate::{PlaceRecord, validate_places};
use placeresolver::{ResolverError, Result};

#[derive(Parser)]
#[command(
    name = "placeresolver",
    version,
    about = "Resolves historical place names against per-country gazetteers"
)]
struct Cli {
    /// Settings file (defaults to ./placeresolver.toml when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    /// Directory of gazetteer JSON files, overriding the settings
    #[arg(long, global = true)]
    data: Option<PathBuf>,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Split a place string into town, county and country
    Parts {
        place: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Resolve a place for the year of a record, e.g. "ABT 1860"
    Resolve {
        place: String,
        #[arg(long)]
        date: Option<String>,
    },
    /// Look up what a town is called and where it belongs today
    Current {
        place: String,
        #[arg(long)]
        only_if_different: bool,
    },
    /// Guess the placement of a bare town name
    Guess {
        name: String,
        #[arg(long)]
        date: Option<String>,
        #[arg(long)]
        country: Option<String>,
        #[arg(long)]
        only_sources: bool,
    },
    /// Validate a JSON array of {"id", "place", "date"} records
    Validate { records: PathBuf },
    /// Dump the normalized town database of a country
    Towns { country: String },
}

fn parse_date(date: Option<&str>) -> Option<RecordDate> {
    let text = date?;
    let parsed = RecordDate::parse(text);
    if parsed.is_none() {
        warn!(date = text, "no year found, resolving without a date");
    }
    parsed
}

fn print_json<T: Serialize>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

fn run(cli: Cli) -> Result<()> {
    let mut settings = Settings::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data {
        settings.data.dir = dir;
    }
    set_cache_enabled(settings.cache.enabled);
    let registry = Registry::load_dir(&settings.data.dir)?;
    let resolver = Resolver::with_settings(Arc::new(registry), settings);

    match cli.command {
        Command::Parts { place, date } => {
            let date = parse_date(date.as_deref());
            print_json(&resolver.get_place_parts(&place, date.as_ref()))
        }
        Command::Resolve { place, date } => {
            let date = parse_date(date.as_deref());
            print_json(&resolver.get_valid_county_by_town_and_year(&place, date.as_ref()))
        }
        Command::Current { place, only_if_different } => {
            print_json(&resolver.get_current_name_of_town(&place, only_if_different))
        }
        Command::Guess { name, date, country, only_sources } => {
            let date = parse_date(date.as_deref());
            print_json(&resolver.guess_town(&name, date.as_ref(), country.as_deref(), only_sources))
        }
        Command::Validate { records } => {
            let text = fs::read_to_string(&records).map_err(|e| ResolverError::io(&records, e))?;
            let records: Vec<PlaceRecord> = serde_json::from_str(&text)?;
            print_json(&validate_places(&resolver, &records))
        }
        Command::Towns { country } => {
            let name = resolver
                .registry()
                .detect_country_name(&country)
                .unwrap_or(country);
            let towns = resolver.towns();
            match towns.country(&name) {
                Some(table) => print_json(table),
                None => Err(ResolverError::Dataset {
                    message: format!("no country named {:?}", name),
                }),
            }
        }
    }
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    // RUST_LOG wins over the settings file; both may be absent
    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| {
            Settings::load(cli.config.as_deref())
                .map(|s| s.log.filter)
                .map(EnvFilter::new)
        })
        .unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {}", e);
            ExitCode::FAILURE
        }
    }
}
