use std::error::Error;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::time::Duration;

use clap::Parser;
use tracing_subscriber::EnvFilter;

use station_prep::cache::{CacheConfig, KeyPolicy, ResultCache};
use station_prep::pipeline::{self, PipelineConfig};

#[derive(Parser, Debug)]
#[command(name = "station-prep")]
#[command(about = "Attribute user sessions to base stations and compute the distances between them.", long_about = None)]
struct Cli {
    /// Base station CSV: address,latitude,longitude with no header, sorted by address
    #[arg(short, long)]
    stations: PathBuf,

    /// Session log CSV with a header; start, end and address in columns 2-4, sorted by address
    #[arg(short = 'u', long)]
    sessions: PathBuf,

    /// Directory for cached stage results
    #[arg(long, default_value = "cache")]
    cache_dir: PathBuf,

    /// How cached results are matched to inputs: "content" or "cardinality"
    #[arg(long, default_value_t = KeyPolicy::Content)]
    key_policy: KeyPolicy,

    /// Treat cached results older than this many seconds as stale
    #[arg(long)]
    ttl_secs: Option<u64>,

    /// Clear cached results before running
    #[arg(long, default_value_t = false)]
    no_cache: bool,

    /// Write stations, distances and merge report as JSON. If omitted, prints a summary.
    #[arg(short, long)]
    out: Option<PathBuf>,
}

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    let mut cache_config = CacheConfig::new(&cli.cache_dir).with_key_policy(cli.key_policy);
    if let Some(secs) = cli.ttl_secs {
        cache_config = cache_config.with_ttl(Duration::from_secs(secs));
    }

    if cli.no_cache {
        pipeline::invalidate_all(&ResultCache::new(cache_config.clone()))?;
    }

    let config = PipelineConfig::new(&cli.stations, &cli.sessions).with_cache(cache_config);
    let output = pipeline::run(&config)?;

    match &cli.out {
        Some(path) => {
            let writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(writer, &output)?;
            println!("Wrote {} stations to {}", output.stations.len(), path.display());
        }
        None => {
            let report = &output.report;
            println!("Stations with usage: {}", output.stations.len());
            println!("Distance matrix:     {0}x{0}", output.distances.len());
            println!("Sessions read:       {}", report.sessions_read);
            println!("  attributed:        {}", report.sessions_attributed);
            println!("  unmatched:         {}", report.unmatched_sessions);
            println!("  bad timestamps:    {}", report.timestamp_failures);
            if !report.unmatched_addresses.is_empty() {
                println!("Unmatched addresses: {}", report.unmatched_addresses.join(", "));
            }
        }
    }

    Ok(())
}
