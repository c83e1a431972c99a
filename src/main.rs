use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::process::ExitCode;
use std::sync::Arc;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{fmt, EnvFilter};

use forecast_scraper::utils::Timer;
use forecast_scraper::{AppConfig, ScrapeOrchestrator};

#[derive(Parser)]
#[command(name = "forecast-scraper", about = "Windguru spot forecast scraper", version)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,
}

#[derive(Subcommand)]
enum Command {
    /// Scrape one spot and print the forecast as JSON
    Scrape {
        /// Spot URL, e.g. https://www.windguru.cz/500760
        url: String,
    },

    /// Check that a spot URL can be scraped
    TestUrl { url: String },

    /// Scrape several spots concurrently
    Batch {
        #[arg(required = true)]
        urls: Vec<String>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();

    let filter = match cli.verbose {
        0 => "forecast_scraper=info,warn",
        1 => "forecast_scraper=debug,info",
        _ => "trace",
    };

    tracing_subscriber::registry()
        .with(fmt::layer().compact().with_target(false))
        .with(EnvFilter::new(filter))
        .init();

    let config = AppConfig::load()?;
    let orchestrator = Arc::new(
        ScrapeOrchestrator::new(&config).context("Failed to build scraper")?,
    );

    match cli.command {
        Command::Scrape { url } => {
            let _t = Timer::start(format!("Scrape {}", url));
            match orchestrator.scrape(&url).await {
                Ok(result) => {
                    println!("{}", serde_json::to_string_pretty(&*result)?);
                }
                Err(e) => {
                    eprintln!("{} ({})", e.reason().message(), e);
                    return Ok(ExitCode::FAILURE);
                }
            }
        }

        Command::TestUrl { url } => {
            if orchestrator.test_url(&url).await {
                println!("ok");
            } else {
                println!("failed");
                return Ok(ExitCode::FAILURE);
            }
        }

        Command::Batch { urls } => {
            let _t = Timer::start(format!("Batch of {} spots", urls.len()));
            let outcomes = orchestrator.scrape_batch(urls).await;
            let failed = outcomes.iter().filter(|o| o.result.is_err()).count();

            println!("─────────────────────────────────");
            for o in &outcomes {
                match &o.result {
                    Ok(r) => println!("  ✔ {:<40} {} ({} points)", o.url, r.spot_name, r.forecasts.len()),
                    Err(e) => println!("  ✘ {:<40} {}", o.url, e.reason().message()),
                }
            }
            println!("─────────────────────────────────");
            println!("  {} ok, {} failed", outcomes.len() - failed, failed);

            if failed > 0 {
                return Ok(ExitCode::FAILURE);
            }
        }
    }

    Ok(ExitCode::SUCCESS)
}
