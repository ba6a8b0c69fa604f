#![deny(warnings)]

//! Command-line front end: list characters and weapons, and evaluate a
//! batch of plans from a YAML file.

use anyhow::{bail, Context, Result};
use chrono::{Local, NaiveDateTime};
use clap::{Parser, Subcommand, ValueEnum};
use planner_calc::{BatchResult, ResolvedMaterial};
use planner_core::{is_released, CharacterInfo, WeaponInfo};
use planner_data::{DataCache, Language, PlannerConfig, SourceKind, UpstreamSource};
use std::fmt::Write as _;
use std::path::PathBuf;
use tracing::{info, Subscriber};
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

const VERSION: &str = concat!(
    env!("CARGO_PKG_VERSION"),
    " (",
    env!("GIT_SHA"),
    " ",
    env!("BUILD_DATE"),
    ")"
);

#[derive(Parser, Debug)]
#[command(name = "planner", version = VERSION, about = "Character material planner")]
struct Cli {
    /// YAML configuration file.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the configured upstream schema.
    #[arg(long, global = true, value_enum)]
    source: Option<SourceArg>,

    /// Override the configured base URL.
    #[arg(long, global = true)]
    base_url: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Evaluate the `plan` batch of the configuration.
    Plan {
        /// Print the result as JSON.
        #[arg(long)]
        json: bool,
    },
    /// List playable characters.
    Characters {
        #[arg(long, value_enum)]
        language: Option<LanguageArg>,
    },
    /// List weapons.
    Weapons {
        #[arg(long, value_enum)]
        language: Option<LanguageArg>,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum SourceArg {
    Json,
    LegacyScript,
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum LanguageArg {
    En,
    Chs,
    Jp,
    Kr,
}

impl From<SourceArg> for SourceKind {
    fn from(arg: SourceArg) -> Self {
        match arg {
            SourceArg::Json => SourceKind::Json,
            SourceArg::LegacyScript => SourceKind::LegacyScript,
        }
    }
}

impl From<LanguageArg> for Language {
    fn from(arg: LanguageArg) -> Self {
        match arg {
            LanguageArg::En => Language::En,
            LanguageArg::Chs => Language::Chs,
            LanguageArg::Jp => Language::Jp,
            LanguageArg::Kr => Language::Kr,
        }
    }
}

fn load_config(cli: &Cli) -> Result<PlannerConfig> {
    let mut config = match &cli.config {
        Some(path) => PlannerConfig::load(path)
            .with_context(|| format!("loading configuration from {}", path.display()))?,
        None => PlannerConfig::default(),
    };
    config.apply_env()?;
    if let Some(source) = cli.source {
        config.source = source.into();
    }
    if let Some(url) = &cli.base_url {
        config.base_url = url.clone();
    }
    let language = match &cli.command {
        Command::Characters { language } | Command::Weapons { language } => *language,
        Command::Plan { .. } => None,
    };
    if let Some(language) = language {
        config.language = language.into();
    }
    Ok(config)
}

fn material_line(out: &mut String, m: &ResolvedMaterial) {
    let _ = writeln!(out, "  {:<36} x{:>9}  ({}★, {})", m.name, m.count, m.rarity, m.id);
}

fn render_batch(result: &BatchResult) -> String {
    let mut out = String::new();
    for character in &result.per_character {
        let _ = writeln!(out, "{}", character.name);
        if character.items.is_empty() {
            let _ = writeln!(out, "  nothing needed");
        }
        for m in &character.items {
            material_line(&mut out, m);
        }
    }
    if result.per_character.len() > 1 {
        let _ = writeln!(out, "Total");
        for m in &result.combined {
            material_line(&mut out, m);
        }
    }
    out
}

fn render_characters(list: &[CharacterInfo], now: NaiveDateTime) -> String {
    let mut out = String::new();
    for c in list {
        let release = match c.release {
            Some(r) if is_released(c.release, now) => r.format("%Y-%m-%d").to_string(),
            _ => "unreleased".to_string(),
        };
        let _ = writeln!(
            out,
            "{:>10}  {:<24} {}★  {:<10} {:<10} {}",
            c.id,
            c.display_name,
            c.rarity,
            format!("{:?}", c.element),
            format!("{:?}", c.weapon),
            release
        );
    }
    out
}

fn render_weapons(list: &[WeaponInfo]) -> String {
    let mut out = String::new();
    for w in list {
        let _ = writeln!(
            out,
            "{:>6}  {:<32} {}★  {:?}",
            w.id, w.display_name, w.rarity, w.weapon
        );
    }
    out
}

async fn run(cli: Cli) -> Result<()> {
    let config = load_config(&cli)?;
    let cache = DataCache::new(config.build_source());
    info!(source = cache.source().name(), base_url = %config.base_url, "starting CLI");

    match cli.command {
        Command::Plan { json } => {
            if config.plan.is_empty() {
                bail!("the configuration has no `plan` entries");
            }
            let result = cache.plan_batch(&config.plan).await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&result)?);
            } else {
                print!("{}", render_batch(&result));
            }
        }
        Command::Characters { .. } => {
            let now = Local::now().naive_local();
            print!("{}", render_characters(&cache.characters().await?, now));
        }
        Command::Weapons { .. } => print!("{}", render_weapons(&cache.weapons().await?)),
    }
    Ok(())
}

/// Log records go to stderr so stdout stays parseable.
fn subscriber(filter: EnvFilter) -> impl Subscriber + Send + Sync + 'static {
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .finish()
}

fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    subscriber(filter).init();

    let cli = Cli::parse();
    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
        .context("starting async runtime")?;
    runtime.block_on(run(cli))
}
