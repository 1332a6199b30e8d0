use std::fs;
use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use chrono::Local;
use clap::{Parser, Subcommand};
use raksha_agents::{ChatAgent, Directions, Generator, NavigationAgent};
use raksha_core::{
    decode_polyline, validate_contacts, Classifier, Coordinate, DirectionsResponse, MatchMode,
    NearbyPlace, PlaceCategory, Responder, SosAlert,
};
use raksha_observability::{init_tracing, AppMetrics};
use raksha_remote::directions::interpret_directions;
use raksha_remote::{GeminiConfig, GeocodeClient, MapsConfig, PlacesClient};

#[derive(Debug, Parser)]
#[command(name = "raksha")]
#[command(about = "RakshaSetu safety assistant CLI")]
struct Cli {
    /// Display name substituted into canned answers.
    #[arg(long, env = "RAKSHA_APP_NAME", default_value = "RakshaSetu")]
    app_name: String,

    /// `substring` (default) or `word`.
    #[arg(long, env = "RAKSHA_MATCH_MODE")]
    match_mode: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Interactive chat; type 'exit' to quit.
    Chat,
    /// Answer a single message.
    Ask { text: String },
    /// Decode an encoded polyline.
    Decode { encoded: String },
    /// Pick the shortest route from a saved directions response.
    Route {
        #[arg(long)]
        file: PathBuf,
    },
    /// Fetch driving directions and pick the shortest route.
    Plan {
        #[arg(long, value_parser = parse_coordinate)]
        from: Coordinate,
        #[arg(long, value_parser = parse_coordinate)]
        to: Coordinate,
    },
    /// List hospitals, police stations, or pharmacies near a point.
    Nearby {
        #[arg(long)]
        category: String,
        #[arg(long, value_parser = parse_coordinate)]
        at: Coordinate,
    },
    /// Find a destination by name.
    Search { query: String },
    /// Compose an SOS alert for the given contacts (at least three).
    Sos {
        #[arg(long, value_parser = parse_coordinate)]
        at: Coordinate,
        #[arg(long)]
        sender: Option<String>,
        #[arg(long = "contact")]
        contacts: Vec<String>,
    },
    /// Distance left and the next instruction.
    Progress {
        #[arg(long, value_parser = parse_coordinate)]
        at: Coordinate,
        #[arg(long, value_parser = parse_coordinate)]
        to: Coordinate,
    },
}

fn parse_coordinate(value: &str) -> Result<Coordinate, String> {
    Coordinate::parse(value).map_err(|err| err.to_string())
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing("raksha_cli");
    let cli = Cli::parse();
    let metrics = AppMetrics::shared();
    let mode = MatchMode::from_optional_str(cli.match_mode.as_deref());
    let responder = Responder::new(cli.app_name.clone()).with_mode(mode);

    match cli.command {
        Command::Chat => run_chat(build_chat_agent(responder, mode, metrics)?).await?,
        Command::Ask { text } => {
            let agent = build_chat_agent(responder, mode, metrics)?;
            let reply = agent.reply(&text).await;
            println!("{}", serde_json::to_string_pretty(&reply)?);
        }
        Command::Decode { encoded } => {
            let points = decode_polyline(&encoded).context("invalid encoded polyline")?;
            println!("{}", serde_json::to_string_pretty(&points)?);
        }
        Command::Route { file } => {
            let raw = fs::read_to_string(&file)
                .with_context(|| format!("failed reading {}", file.display()))?;
            let response: DirectionsResponse =
                serde_json::from_str(&raw).context("file is not a directions response")?;
            let routes = interpret_directions(response)?;
            let agent = NavigationAgent::new(Arc::new(Directions::Unconfigured), metrics);
            let selection = agent.select(&routes)?;
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        Command::Plan { from, to } => {
            let maps = MapsConfig::from_env().context("RAKSHA_MAPS_API_KEY is not set")?;
            let timeout = maps.timeout;
            let directions = Directions::from_config(Some(maps))?;
            let agent =
                NavigationAgent::new(Arc::new(directions), metrics).with_timeout(timeout);
            let selection = agent.plan(from, to).await?;
            println!("{}", serde_json::to_string_pretty(&selection)?);
        }
        Command::Nearby { category, at } => {
            let Some(category) = PlaceCategory::parse(&category) else {
                bail!("unknown category `{category}`; use hospital, police, or pharmacy");
            };
            let maps = MapsConfig::from_env().context("RAKSHA_MAPS_API_KEY is not set")?;
            let places = PlacesClient::new(maps)?.nearby(at, category).await?;
            let (json, listing) = nearby_report(&places)?;
            if !listing.is_empty() {
                eprintln!("{listing}");
            }
            println!("{json}");
        }
        Command::Search { query } => {
            let maps = MapsConfig::from_env().context("RAKSHA_MAPS_API_KEY is not set")?;
            let Some(found) = GeocodeClient::new(maps)?.search(query.trim()).await? else {
                bail!("No results found for `{query}`");
            };
            println!("{}", serde_json::to_string_pretty(&found)?);
        }
        Command::Sos {
            at,
            sender,
            contacts,
        } => {
            let recipients =
                validate_contacts(&contacts).context("pass --contact once per trusted contact")?;
            let alert = SosAlert::compose(sender.as_deref(), at, Local::now().naive_local());
            println!(
                "{}",
                serde_json::to_string_pretty(&serde_json::json!({
                    "alert": alert,
                    "recipients": recipients
                }))?
            );
        }
        Command::Progress { at, to } => {
            let agent = NavigationAgent::new(Arc::new(Directions::Unconfigured), metrics);
            println!("{}", serde_json::to_string_pretty(&agent.progress(at, to))?);
        }
    }

    Ok(())
}

/// Pretty JSON for stdout and a readable listing for stderr.
fn nearby_report(places: &[NearbyPlace]) -> Result<(String, String)> {
    let listing = places
        .iter()
        .map(|place| format!("{} ({})", place.name, place.distance_label()))
        .collect::<Vec<_>>()
        .join("\n");
    Ok((serde_json::to_string_pretty(places)?, listing))
}

fn build_chat_agent(
    responder: Responder,
    mode: MatchMode,
    metrics: Arc<AppMetrics>,
) -> Result<ChatAgent<Generator>> {
    let config = GeminiConfig::from_env();
    let timeout = config
        .as_ref()
        .map(|config| config.timeout)
        .unwrap_or(raksha_remote::gemini::DEFAULT_CHAT_TIMEOUT);
    let generator = Generator::from_config(config).context("failed to build Gemini client")?;

    Ok(ChatAgent::new(responder, Arc::new(generator), metrics)
        .with_classifier(Classifier::with_mode(mode))
        .with_timeout(timeout))
}

async fn run_chat(agent: ChatAgent<Generator>) -> Result<()> {
    let mut conversation = agent.start_conversation();
    if let Some(welcome) = conversation.turns().first() {
        println!("{}\n", welcome.text);
    }
    println!("type 'exit' to quit.");

    loop {
        print!("> ");
        io::stdout().flush()?;

        let mut line = String::new();
        if io::stdin().read_line(&mut line)? == 0 {
            break;
        }

        let message = line.trim();
        if message.eq_ignore_ascii_case("exit") || message.eq_ignore_ascii_case("quit") {
            break;
        }

        if message.is_empty() {
            continue;
        }

        let reply = agent.handle(&mut conversation, message).await;
        println!("\n{}\n", reply.text);
    }

    Ok(())
}
