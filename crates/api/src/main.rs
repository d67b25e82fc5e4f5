//! whenis - query every calendar you can see at once

use std::path::PathBuf;

use anyhow::Context;
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use tracing::{debug, warn};
use whenis_infra::config;
use whenis_lib::utils::logging::init_tracing;
use whenis_lib::{commands, AddEventRequest, AppContext};

#[derive(Debug, Parser)]
#[command(name = "whenis", version, about = "Search and list events across Google calendars")]
struct Cli {
    /// Config file (TOML or JSON). Without it the environment is tried first.
    #[arg(long, global = true, env = "WHENIS_CONFIG")]
    config: Option<PathBuf>,

    /// Emit logs as JSON lines on stderr.
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Upcoming events whose text matches
    Search {
        text: String,
        #[arg(long, default_value_t = 5)]
        limit: usize,
    },
    /// The single best match, falling back to calendar names
    Lookup { text: String },
    /// The next event on any calendar
    Next,
    /// Events happening right now
    Ongoing,
    /// Names of the available calendars
    Calendars,
    /// Create an event on the primary calendar
    Add {
        #[arg(long)]
        title: String,
        /// RFC 3339 start, e.g. 2024-05-01T18:00:00Z
        #[arg(long)]
        start: DateTime<Utc>,
        /// Minutes
        #[arg(long)]
        duration: i64,
        #[arg(long)]
        keywords: Option<String>,
        #[arg(long, env = "USER", default_value = "whenis")]
        creator: String,
        #[arg(long)]
        location: Option<String>,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let dotenv = dotenvy::dotenv();

    init_tracing(cli.json_logs);
    match dotenv {
        Ok(path) => debug!(path = %path.display(), "loaded .env"),
        Err(err) => debug!(error = %err, "no .env loaded"),
    }

    let config = match cli.config {
        Some(path) => config::load_from_file(Some(path)),
        None => config::load(),
    }
    .context("failed to load configuration")?;

    let app = AppContext::new(config).await.context("failed to initialise")?;
    let output = run(&app, cli.command).await;
    app.shutdown().await?;

    println!("{}", serde_json::to_string_pretty(&output?)?);
    Ok(())
}

async fn run(app: &AppContext, command: Command) -> anyhow::Result<serde_json::Value> {
    let value = match command {
        Command::Search { text, limit } => {
            report(serde_json::to_value(commands::search_events(app, &text, limit).await?)?)
        }
        Command::Lookup { text } => {
            report(serde_json::to_value(commands::lookup_event(app, &text).await?)?)
        }
        Command::Next => report(serde_json::to_value(commands::next_event(app).await?)?),
        Command::Ongoing => report(serde_json::to_value(commands::ongoing_events(app).await?)?),
        Command::Calendars => serde_json::to_value(commands::list_calendars(app).await?)?,
        Command::Add { title, start, duration, keywords, creator, location } => {
            let request = AddEventRequest {
                creator,
                title,
                keywords,
                start,
                duration_minutes: duration,
                location,
            };
            serde_json::to_value(commands::add_event(app, request).await?)?
        }
    };
    Ok(value)
}

/// Warn on stderr when some calendars did not answer.
fn report(value: serde_json::Value) -> serde_json::Value {
    let failed = value["failedCalendars"].as_array().map_or(0, Vec::len);
    if failed > 0 {
        warn!(failed, "answer is missing some calendars");
    }
    value
}
