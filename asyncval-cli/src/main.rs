//! asyncval CLI
//!
//! Load driver for the asyncval cache: hammer it with concurrent callers and report
//! what the engine did.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use rand::Rng;
use tokio::task::JoinSet;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use asyncval_cache::AsyncValueCache;
use asyncval_core::{CacheConfig, CacheError, CacheStats};

type LoadCache = AsyncValueCache<u64, u64, CacheError>;

/// asyncval - memoizing cache for async computations
#[derive(Parser)]
#[command(name = "asyncval")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// JSON configuration file (otherwise ASYNCVAL_* environment variables are used)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Override the capacity bound
    #[arg(long, global = true)]
    max_items: Option<usize>,

    /// Override the default TTL in milliseconds
    #[arg(long, global = true)]
    ttl_ms: Option<u64>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Issue random-key requests from many tasks, then run a maintenance pass
    Bench {
        /// Total number of requests
        #[arg(short, long, default_value = "10000")]
        requests: usize,
        /// Size of the key space requests draw from
        #[arg(short, long, default_value = "2000")]
        keys: u64,
        /// Number of concurrent tasks
        #[arg(short = 'j', long, default_value = "64")]
        concurrency: usize,
        /// Simulated producer latency in milliseconds
        #[arg(short, long, default_value = "5")]
        latency_ms: u64,
        /// Fraction of producer calls that fail (0.0 to 1.0)
        #[arg(long, default_value = "0.0")]
        failure_rate: f64,
    },

    /// Race many callers on one fresh key and check the producer ran once
    Storm {
        /// Number of concurrent callers
        #[arg(short, long, default_value = "1000")]
        callers: usize,
        /// Simulated producer latency in milliseconds
        #[arg(short, long, default_value = "50")]
        latency_ms: u64,
    },

    /// Print the effective configuration as JSON
    Config,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    let cli = Cli::parse();

    // Initialize logging
    let filter = if cli.verbose {
        "asyncval=debug,info"
    } else {
        "asyncval=info,warn"
    };

    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| filter.into()))
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = load_config(cli.config.as_deref(), cli.max_items, cli.ttl_ms)?;

    match cli.command {
        Commands::Bench {
            requests,
            keys,
            concurrency,
            latency_ms,
            failure_rate,
        } => {
            cmd_bench(
                config,
                requests,
                keys,
                concurrency,
                Duration::from_millis(latency_ms),
                failure_rate,
            )
            .await
        }
        Commands::Storm { callers, latency_ms } => {
            cmd_storm(config, callers, Duration::from_millis(latency_ms)).await
        }
        Commands::Config => cmd_config(&config),
    }
}

/// Builds the configuration from a file or the environment, then applies flag overrides.
fn load_config(path: Option<&Path>, max_items: Option<usize>, ttl_ms: Option<u64>) -> Result<CacheConfig> {
    let config = match path {
        Some(path) => {
            let raw = std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file {}", path.display()))?;
            CacheConfig::from_json(&raw).context("Invalid config file")?
        }
        None => CacheConfig::from_env().context("Invalid ASYNCVAL_* environment")?,
    };
    apply_overrides(config, max_items, ttl_ms)
}

/// Applies `--max-items` / `--ttl-ms` on top of `config` and validates the result.
fn apply_overrides(mut config: CacheConfig, max_items: Option<usize>, ttl_ms: Option<u64>) -> Result<CacheConfig> {
    if let Some(max_items) = max_items {
        config.max_items = max_items;
    }
    if let Some(ttl_ms) = ttl_ms {
        config.default_ttl_ms = Some(ttl_ms);
    }
    config.validate()?;
    Ok(config)
}

/// Random-key load run
async fn cmd_bench(
    config: CacheConfig,
    requests: usize,
    keys: u64,
    concurrency: usize,
    latency: Duration,
    failure_rate: f64,
) -> Result<()> {
    anyhow::ensure!(keys > 0, "key space must not be empty");
    anyhow::ensure!(concurrency > 0, "concurrency must be at least 1");
    anyhow::ensure!(
        (0.0..=1.0).contains(&failure_rate),
        "failure rate must be between 0.0 and 1.0"
    );

    println!(
        "{} {} requests over {} keys ({} tasks)",
        "📊 Benchmarking with".cyan().bold(),
        requests,
        keys,
        concurrency
    );

    let cache: Arc<LoadCache> = AsyncValueCache::shared(config)?;
    let produced = Arc::new(AtomicUsize::new(0));
    let failures = Arc::new(AtomicUsize::new(0));

    let pb = ProgressBar::new(requests as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("   [{bar:40.cyan/blue}] {pos}/{len} ({eta})")?
            .progress_chars("#>-"),
    );

    let start = Instant::now();
    let mut tasks = JoinSet::new();
    let per_task = requests / concurrency;
    let remainder = requests % concurrency;

    for worker in 0..concurrency {
        let quota = per_task + usize::from(worker < remainder);
        let cache = Arc::clone(&cache);
        let produced = Arc::clone(&produced);
        let failures = Arc::clone(&failures);
        let pb = pb.clone();

        tasks.spawn(async move {
            for _ in 0..quota {
                let key = rand::thread_rng().gen_range(0..keys);
                let fail = rand::thread_rng().gen_bool(failure_rate);
                let produced = Arc::clone(&produced);

                let result = cache
                    .get_or_add(key, move |key| async move {
                        tokio::time::sleep(latency).await;
                        produced.fetch_add(1, Ordering::Relaxed);
                        if fail {
                            Err(CacheError::Producer(format!("simulated failure for key {key}")))
                        } else {
                            Ok(key * 2)
                        }
                    })
                    .await;

                match result {
                    Err(err) if err.is_producer_error() => {
                        failures.fetch_add(1, Ordering::Relaxed);
                    }
                    Err(err) => warn!(error = %err, "Unexpected cache error"),
                    Ok(_) => {}
                }
                pb.inc(1);
            }
        });
    }

    while let Some(joined) = tasks.join_next().await {
        joined.context("Load task panicked")?;
    }
    pb.finish();
    let elapsed = start.elapsed();

    let before = cache.len();
    let sweep = Instant::now();
    cache.handle_expiration();
    let sweep_time = sweep.elapsed();
    cache.dispose();

    let stats = cache.stats();
    info!(entries = stats.total_entries, "Load run finished");

    println!("\n{}", "📈 Results:".green().bold());
    println!("   Elapsed: {:?}", elapsed);
    println!(
        "   Throughput: {:.0} requests/sec",
        requests as f64 / elapsed.as_secs_f64()
    );
    println!("   Producer calls: {}", produced.load(Ordering::Relaxed));
    println!("   Failed requests: {}", failures.load(Ordering::Relaxed));
    println!(
        "   Maintenance pass: {} → {} entries in {:?}",
        before, stats.total_entries, sweep_time
    );
    print_stats(&stats);

    Ok(())
}

/// Single-key stampede
async fn cmd_storm(config: CacheConfig, callers: usize, latency: Duration) -> Result<()> {
    println!(
        "{} {} callers on one key",
        "🌪  Racing".cyan().bold(),
        callers
    );

    let cache: Arc<LoadCache> = Arc::new(AsyncValueCache::with_config(config)?);
    let produced = Arc::new(AtomicUsize::new(0));
    let mut tasks = JoinSet::new();

    let start = Instant::now();
    for _ in 0..callers {
        let cache = Arc::clone(&cache);
        let produced = Arc::clone(&produced);
        tasks.spawn(async move {
            cache
                .get_or_add(42, move |key| async move {
                    tokio::time::sleep(latency).await;
                    Ok::<u64, CacheError>(produced.fetch_add(1, Ordering::SeqCst) as u64 + key)
                })
                .await
        });
    }

    let mut values = Vec::with_capacity(callers);
    while let Some(joined) = tasks.join_next().await {
        values.push(joined.context("Caller task panicked")??);
    }
    let elapsed = start.elapsed();

    let calls = produced.load(Ordering::SeqCst);
    let agreed = values.windows(2).all(|pair| pair[0] == pair[1]);

    println!("   Elapsed: {:?}", elapsed);
    if calls == 1 && agreed {
        println!(
            "   {} Producer ran once; all {} callers saw the same value",
            "✅".green(),
            values.len()
        );
    } else {
        println!(
            "   {} Producer ran {} times; values agree: {}",
            "❌".red(),
            calls,
            agreed
        );
    }
    print_stats(&cache.stats());

    anyhow::ensure!(calls == 1 && agreed, "request coalescing failed");
    Ok(())
}

/// Print effective configuration
fn cmd_config(config: &CacheConfig) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(config)?);
    Ok(())
}

fn print_stats(stats: &CacheStats) {
    println!("\n{}", "Cache stats:".yellow().bold());
    println!("   {} {}", "Entries:".dimmed(), stats.total_entries);
    println!("   {} {}", "Capacity:".dimmed(), stats.capacity);
    println!(
        "   {} {} hits / {} misses ({:.1}%)",
        "Requests:".dimmed(),
        stats.hits,
        stats.misses,
        stats.hit_rate() * 100.0
    );
    println!(
        "   {} {} expired, {} evicted",
        "Removed:".dimmed(),
        stats.expirations,
        stats.evictions
    );
}
