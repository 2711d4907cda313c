//! Linkindle - Linky consumption charts from an Enedis account.
//!
//! ```bash
//! LINKY_USERNAME=me@example.org LINKY_PASSWORD=secret linkindle --output-dir out
//! linkindle --only day --only hour --table
//! ```

use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use linky::api::consumption::{ConsumptionClient, Granularity};
use linky::api::DateRange;
use linky::render::{self, CalendarStep};
use linky::{Credentials, Linky};

/// Fetches Linky consumption curves and renders them as bar charts.
#[derive(Parser)]
#[command(name = "linkindle")]
#[command(version)]
pub struct Cli {
    #[arg(long, env = "LINKY_USERNAME")]
    pub username: String,

    #[arg(long, env = "LINKY_PASSWORD", hide_env_values = true)]
    pub password: String,

    /// Directory receiving the charts.
    #[arg(long, short, default_value = "out")]
    pub output_dir: PathBuf,

    /// Only fetch these granularities (all four by default).
    #[arg(long, value_enum)]
    pub only: Vec<Step>,

    /// Also print every series as a table.
    #[arg(long)]
    pub table: bool,

    /// Override the login host, e.g. the historical erdf.fr one.
    #[arg(long, requires = "api_url")]
    pub login_url: Option<String>,

    /// Override the consumption portal base URL.
    #[arg(long, requires = "login_url")]
    pub api_url: Option<String>,

    #[arg(long, default_value_t = 30)]
    pub timeout_secs: u64,

    /// Verbose output (show debug info).
    #[arg(long, short)]
    pub verbose: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Step {
    Hour,
    Day,
    Month,
    Year,
}

impl From<Step> for Granularity {
    fn from(step: Step) -> Self {
        match step {
            Step::Hour => Granularity::Hour,
            Step::Day => Granularity::Day,
            Step::Month => Granularity::Month,
            Step::Year => Granularity::Year,
        }
    }
}

fn setup_logging(verbose: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            EnvFilter::new("linky=debug,linkindle=debug,info")
        } else {
            EnvFilter::new("linky=info,linkindle=info,warn")
        }
    });

    tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .init();
}

/// Year first, then month, day and hour.
fn requested(only: &[Step]) -> Vec<Granularity> {
    Granularity::ALL
        .into_iter()
        .rev()
        .filter(|g| only.is_empty() || only.iter().any(|s| Granularity::from(*s) == *g))
        .collect()
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut linky = Linky::new().with_timeout(Duration::from_secs(cli.timeout_secs));
    if let (Some(login_url), Some(api_url)) = (cli.login_url.clone(), cli.api_url.clone()) {
        linky = linky.with_base_urls(login_url, api_url);
    }

    let credentials = Credentials::new(cli.username.clone(), cli.password.clone());
    let session = linky.login(&credentials)?;
    let consumption = ConsumptionClient::new(&session);

    let today = chrono::Local::now().date_naive();
    let mut series = vec![];
    for granularity in requested(&cli.only) {
        let range = DateRange::default_for(granularity, today);
        let data = consumption
            .fetch(granularity, range)
            .with_context(|| format!("retrieving {:?} data", granularity))?;
        series.push(data);
    }
    info!(count = series.len(), "got data");

    std::fs::create_dir_all(&cli.output_dir)
        .with_context(|| format!("creating {}", cli.output_dir.display()))?;

    for data in &series {
        render::write_chart(data, &cli.output_dir)?;

        if cli.table {
            let df = data.as_polars_df(CalendarStep::for_granularity(data.granularity))?;
            println!("{:?}\n{}", data.granularity, df);
        }
    }
    info!(dir = %cli.output_dir.display(), "successfully generated charts");

    Ok(())
}
