use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{EnvFilter, fmt};
use wanderlust_core::{Catalog, PreferenceExtractor, Session, top_matches, trait_label};
use wanderlust_guard::{ContentPolicy, SafetyFilter};
use wanderlust_server::{
    config::{Config, init_config, load_config},
    start_server,
    state::AppState,
};

#[derive(Parser, Debug)]
#[command(name = "wanderlust", version, about = "Travel destination matcher")]
struct Cli {
    /// Config file (missing file means defaults)
    #[arg(long, global = true, default_value = "wanderlust.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP service
    Serve,

    /// Write a default config file
    InitConfig,

    /// Score free text and print the best destinations
    Rank {
        /// One chat message; repeat for several turns
        #[arg(long, required = true)]
        text: Vec<String>,

        /// Number of destinations printed (default: 3)
        #[arg(long, default_value_t = 3)]
        limit: usize,
    },

    /// Run the input sanitizer on TEXT and print the verdict
    Check { text: String },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Serve => {
            fmt().with_env_filter(EnvFilter::from_default_env()).init();
            let cfg = load_config(&cli.config)?;
            let state = AppState::from_config(cfg)?;
            start_server(state).await?;
        }

        Command::InitConfig => init_config(&cli.config)?,

        Command::Rank { text, limit } => {
            let cfg = load_config(&cli.config)?;
            rank(&cfg, &text, limit)?;
        }

        Command::Check { text } => {
            let cfg = load_config(&cli.config)?;
            check(&cfg, &text)?;
        }
    }

    Ok(())
}

fn rank(cfg: &Config, texts: &[String], limit: usize) -> Result<()> {
    let catalog = match &cfg.data.catalog {
        Some(p) => Catalog::from_path(p)?,
        None => Catalog::builtin()?,
    };
    let extractor = match &cfg.data.extraction_rules {
        Some(p) => PreferenceExtractor::from_path(p)?,
        None => PreferenceExtractor::with_defaults()?,
    };

    let mut session = Session::new();
    for t in texts {
        session.absorb_message(&extractor, t);
    }

    let top = session.scores.top(5);
    if top.is_empty() {
        println!("No preferences detected.");
    } else {
        let shown: Vec<String> = top
            .iter()
            .map(|(t, v)| format!("{} {v:.0}", trait_label(t)))
            .collect();
        println!("Preferences: {}\n", shown.join(", "));
    }

    for (i, m) in top_matches(&session.scores, &catalog, limit).iter().enumerate() {
        println!(
            "{}. {}, {} | {}% | {}",
            i + 1,
            m.destination.name,
            m.destination.country,
            m.match_percent,
            m.matched_traits.join(", ")
        );
    }
    Ok(())
}

fn check(cfg: &Config, text: &str) -> Result<()> {
    let policy = match &cfg.data.policy {
        Some(p) => ContentPolicy::from_path(p)?,
        None => ContentPolicy::default(),
    };
    let filter = SafetyFilter::new(&policy).context("compile content policy")?;
    let verdict = filter.validate_input(text);
    println!("{}", serde_json::to_string_pretty(&verdict)?);
    Ok(())
}
