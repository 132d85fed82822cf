use anyhow::{Context, Result};
use clap::{Parser, ValueEnum};
use hydro_usage::auth::{Credentials, fetch_usage_export};
use hydro_usage::config::Config;
use hydro_usage::error::ErrorKind;
use hydro_usage::logging::init_logging;
use hydro_usage::tariff::{TariffPeriod, TouClassifier};
use hydro_usage::trust::TrustBundle;
use hydro_usage::usage::{Binning, UsageRecord, UsageSummary, parse_export, summarize, summarize_by};
use std::path::PathBuf;
use tracing::{error, info};

/// Download Toronto Hydro usage data and break it down by time-of-use period
#[derive(Debug, Parser)]
#[command(name = "hydro-usage", version = env!("APP_VERSION"))]
struct Cli {
    /// YAML configuration file (default locations are searched otherwise)
    #[arg(short, long, env = "HYDRO_CONFIG")]
    config: Option<PathBuf>,

    /// Portal username (TORONTOHYDRO_USERNAME is also accepted)
    #[arg(long, env = "HYDRO_USERNAME", hide_env_values = true)]
    username: Option<String>,

    /// Portal password (TORONTOHYDRO_PASSWORD is also accepted)
    #[arg(long, env = "HYDRO_PASSWORD", hide_env_values = true)]
    password: Option<String>,

    /// Classify a previously saved export instead of logging in
    #[arg(long, conflicts_with = "save_csv")]
    csv_file: Option<PathBuf>,

    /// Write the raw CSV export to this file
    #[arg(long)]
    save_csv: Option<PathBuf>,

    /// Also break the totals down per calendar bucket
    #[arg(long, value_enum)]
    bin: Option<BinArg>,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum BinArg {
    Hourly,
    Daily,
    Monthly,
    Yearly,
}

impl From<BinArg> for Binning {
    fn from(arg: BinArg) -> Self {
        match arg {
            BinArg::Hourly => Binning::Hourly,
            BinArg::Daily => Binning::Daily,
            BinArg::Monthly => Binning::Monthly,
            BinArg::Yearly => Binning::Yearly,
        }
    }
}

fn credential(value: Option<String>, legacy_var: &str, name: &str) -> Result<String> {
    value
        .or_else(|| std::env::var(legacy_var).ok())
        .filter(|v| !v.is_empty())
        .with_context(|| format!("Missing {} (use --{} or set {})", name, name, legacy_var))
}

fn print_summary(summary: &UsageSummary) {
    if let (Some(first), Some(last)) = (summary.first, summary.last) {
        println!("Usage from {} to {}", first, last);
    }
    println!("{:<10} {:>8} {:>12} {:>12}", "Period", "Records", "Quantity", "Cost");
    for period in TariffPeriod::ALL {
        let totals = summary.totals(period);
        println!(
            "{:<10} {:>8} {:>12.3} {:>12.2}",
            period.as_str(),
            totals.records,
            totals.quantity,
            totals.cost
        );
    }
    println!(
        "{:<10} {:>8} {:>12.3} {:>12.2}",
        "Total",
        "",
        summary.total_quantity(),
        summary.total_cost()
    );
}

fn print_binned(records: &[UsageRecord], binning: Binning) {
    print!("{:<16}", "Bucket");
    for period in TariffPeriod::ALL {
        print!(" {:>10}", period.as_str());
    }
    println!(" {:>10}", "Cost");
    for (start, summary) in summarize_by(records, binning) {
        print!("{:<16}", binning.label(start));
        for period in TariffPeriod::ALL {
            print!(" {:>10.3}", summary.totals(period).quantity);
        }
        println!(" {:>10.2}", summary.total_cost());
    }
    println!();
}

fn advice(kind: ErrorKind) -> &'static str {
    match kind {
        ErrorKind::LoginRejected => "check the username and password",
        ErrorKind::TrustBroken => "update the pinned certificate bundle",
        ErrorKind::ProviderChanged => "the portal pages changed; the extractor needs updating",
        ErrorKind::Defect => "tariff rule table is inconsistent",
        ErrorKind::Transport => "network problem; try again later",
        ErrorKind::Environment => "check the configuration and input files",
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::from_file(path)
            .with_context(|| format!("Failed to load {}", path.display()))?,
        None => Config::load().context("Failed to load configuration")?,
    };
    config.apply_env_overrides();
    config.validate()?;
    init_logging(&config.logging)?;

    info!("hydro-usage {} starting", env!("APP_VERSION"));

    let classifier = TouClassifier::from_config(&config.tariff)?;
    info!(
        "Classifying in {} with {:?} resolution of repeated hours",
        classifier.timezone(),
        classifier.ambiguity_policy()
    );

    let csv = if let Some(path) = &cli.csv_file {
        std::fs::read_to_string(path).with_context(|| format!("Failed to read {}", path.display()))?
    } else {
        let credentials = Credentials::new(
            credential(cli.username, "TORONTOHYDRO_USERNAME", "username")?,
            credential(cli.password, "TORONTOHYDRO_PASSWORD", "password")?,
        );
        // Loaded once; read-only for the rest of the process
        let trust = TrustBundle::load(&config.provider.ca_bundle)?;
        match fetch_usage_export(&config.provider, &trust, credentials).await {
            Ok(csv) => csv,
            Err(e) => {
                error!("Could not retrieve usage export: {}", e);
                return Err(anyhow::anyhow!("{} ({})", e, advice(e.kind())));
            }
        }
    };

    if let Some(path) = &cli.save_csv {
        std::fs::write(path, &csv).with_context(|| format!("Failed to write {}", path.display()))?;
        info!("Saved raw export to {}", path.display());
    }

    let records = parse_export(&csv, &classifier)?;
    info!("Parsed {} usage records", records.len());
    if let Some(bin) = cli.bin {
        print_binned(&records, bin.into());
    }
    print_summary(&summarize(&records));
    Ok(())
}
