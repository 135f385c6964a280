use anyhow::{Context, bail};
use clap::{Parser, Subcommand};
use log::info;
use std::{path::PathBuf, sync::Arc};

use crate::config;
use crate::domain::query::{DEFAULT_COUNT, Period, Query};
use crate::lastfm::LastFmClient;
use crate::palette::{
    PaletteFetcher,
    cover::HttpCoverSource,
    render::{self, Presentation},
};

#[derive(Parser)]
#[command(name = "aquarela")]
#[command(version = "0.1")]
#[command(about = "Color palette of the albums you listen to the most")]
pub struct Cli {
    /// Path to the config TOML file
    #[arg(short, long, default_value = "config.toml")]
    pub config: PathBuf,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Run http server with the palette form
    Serve,
    /// Fetch a palette once and print it
    Palette {
        /// Last.fm user name, defaults to the configured one
        #[arg(short, long)]
        user: Option<String>,
        /// Time window: 7day, 1month, 3month, 6month, 12month, overall (or their labels)
        #[arg(short, long, default_value = "7day")]
        period: Period,
        /// Number of top albums, clamped to 10..=100
        #[arg(short, long, default_value_t = DEFAULT_COUNT)]
        limit: u32,
        /// Write the swatch strip to this PNG file
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn build_fetcher(cfg: &config::Config) -> anyhow::Result<PaletteFetcher> {
    let metadata = LastFmClient::new(cfg.lastfm.api_url.clone())
        .context("Failed to create Last.fm client")?;
    let covers = HttpCoverSource::new().context("Failed to create cover client")?;
    Ok(PaletteFetcher::new(
        Arc::new(metadata),
        Arc::new(covers),
        cfg.cache.into(),
    ))
}

/// Entrypoint for CLI
pub fn run() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();

    let config_path = cli.config.to_string_lossy();
    let cfg = config::Config::load(&config_path)?;

    match cli.command {
        Commands::Serve => {
            let fetcher = build_fetcher(&cfg)?;
            let http_server =
                crate::http::server::HttpServer::new(fetcher, cfg.lastfm, cfg.defaults, cfg.http);

            info!(
                "HTTP server running at http://{}:{}",
                http_server.config.bind_addr, http_server.config.port
            );
            http_server.run();
        }

        Commands::Palette {
            user,
            period,
            limit,
            output,
        } => {
            let fetcher = build_fetcher(&cfg)?;
            let credentials = cfg.lastfm.credentials()?;
            let query = Query::new(user.unwrap_or(cfg.defaults.identity), period, limit);

            let result = fetcher.fetch(&query, &credentials);
            let presentation = Presentation::from_result(&result)?;

            if let Presentation::Failed(_) = presentation {
                bail!(presentation.message());
            }

            if let Ok(palette) = &result {
                for sample in &palette.samples {
                    println!(
                        "{:>3}  {}  {} - {}",
                        sample.rank,
                        sample.color.hex(),
                        sample.artist,
                        sample.title
                    );
                }
            }

            if let (Presentation::Strip { png, .. }, Some(path)) = (&presentation, &output) {
                std::fs::write(path, png)
                    .with_context(|| format!("Failed to write {}", path.to_string_lossy()))?;
                println!("Strip written to {}", path.to_string_lossy());
            } else if output.is_some() {
                println!("Nothing to write: {}", render::EMPTY_NOTICE);
            }

            println!("{}", presentation.message());
        }
    }

    Ok(())
}
