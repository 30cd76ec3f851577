use anyhow::{Context, bail};
use clap::{Args, Parser, Subcommand};
use inquire::{Password, PasswordDisplayMode, Select, Text};
use meteodash_core::{
    Config, LocationQuery, UnitSystem, WeatherClient, WeatherError, client_from_config,
    fetch_dashboard,
};
use tracing::info;

use crate::render;

/// Top-level CLI struct.
#[derive(Debug, Parser)]
#[command(name = "meteodash", version, about = "Current weather and dashboard from OpenWeatherMap")]
pub struct Cli {
    /// Increase log verbosity (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Subcommand)]
pub enum Command {
    /// Store the API key and defaults in the config file.
    Configure,

    /// Show current conditions for a location.
    Current(QueryArgs),

    /// Show current conditions, daily forecast, rain chances and air quality.
    Dashboard(QueryArgs),
}

#[derive(Debug, Args)]
pub struct QueryArgs {
    /// City, optionally with a country code (e.g. "Madrid,ES"). Defaults to the configured location.
    pub query: Option<String>,

    /// Unit system: metric or imperial.
    #[arg(long)]
    pub units: Option<UnitSystem>,

    /// Language for condition descriptions, e.g. "es".
    #[arg(long)]
    pub lang: Option<String>,
}

impl QueryArgs {
    /// Merge command-line values over the stored config.
    fn resolve(self, mut config: Config) -> anyhow::Result<(Config, LocationQuery, UnitSystem)> {
        let raw = match self.query.or_else(|| config.default_location.clone()) {
            Some(q) => q,
            None => bail!(
                "No location given and no default configured.\n\
                 Hint: pass a city (e.g. `meteodash current Madrid,ES`) or run `meteodash configure`."
            ),
        };
        let query = LocationQuery::new(raw)?;
        let units = self.units.unwrap_or(config.units);
        if let Some(lang) = self.lang {
            config.client.lang = lang;
        }
        Ok((config, query, units))
    }
}

impl Cli {
    pub async fn run(self) -> anyhow::Result<()> {
        match self.command {
            Command::Configure => configure(),
            Command::Current(args) => {
                let (config, query, units) = args.resolve(Config::load()?)?;
                let client = client_from_config(&config)?;
                info!(%query, %units, "Fetching current weather");

                let snapshot = client
                    .fetch_current_weather(&query, units)
                    .await
                    .map_err(with_hint)?;
                print!("{}", render::snapshot(&snapshot));
                Ok(())
            }
            Command::Dashboard(args) => {
                let (config, query, units) = args.resolve(Config::load()?)?;
                let client = client_from_config(&config)?;
                info!(%query, %units, "Fetching dashboard");

                let dashboard = fetch_dashboard(&client, &query, units).await.map_err(with_hint)?;
                print!("{}", render::dashboard(&dashboard));
                Ok(())
            }
        }
    }
}

fn with_hint(err: WeatherError) -> anyhow::Error {
    anyhow::anyhow!("{err}\nHint: {}", err.hint())
}

fn configure() -> anyhow::Result<()> {
    let mut config = Config::load()?;

    let message = if config.is_configured() {
        "OpenWeatherMap API key (leave empty to keep the stored key):"
    } else {
        "OpenWeatherMap API key:"
    };
    let api_key = Password::new(message)
        .with_display_mode(PasswordDisplayMode::Masked)
        .without_confirmation()
        .prompt()
        .context("Failed to read API key")?;
    apply_api_key(&mut config, &api_key)?;

    let location = Text::new("Default location (optional, e.g. Madrid,ES):")
        .with_default(config.default_location.as_deref().unwrap_or(""))
        .prompt()
        .context("Failed to read default location")?;
    config.default_location = Some(location.trim().to_string()).filter(|l| !l.is_empty());

    let start = UnitSystem::all().iter().position(|u| *u == config.units).unwrap_or(0);
    config.units = Select::new("Units:", UnitSystem::all().to_vec())
        .with_starting_cursor(start)
        .prompt()
        .context("Failed to read unit system")?;

    config.client.lang = Text::new("Description language:")
        .with_default(&config.client.lang)
        .prompt()
        .context("Failed to read language")?;

    let path = config.save()?;
    println!("Configuration saved to {}", path.display());
    Ok(())
}

/// Store a newly entered key; blank input keeps an existing one.
fn apply_api_key(config: &mut Config, input: &str) -> anyhow::Result<()> {
    let key = input.trim();
    if !key.is_empty() {
        config.set_api_key(key.to_string());
    } else if !config.is_configured() {
        bail!("API key must not be empty");
    }
    Ok(())
}
