use clap::{Parser, Subcommand};
use docfetch::config::{ConfigLoader, ConfigOverrides, Verbosity};
use docfetch::metrics::snapshot::MetricsSnapshot;
use docfetch::{manifest, Collector, FetchEngine};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Arc;

#[derive(Parser)]
#[command(name = "docfetch")]
#[command(version = "0.1.0")]
#[command(about = "Bulk-download the documents listed in a CSV manifest into one zip archive", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct RunArgs {
    /// Optional configuration file (JSON/YAML/TOML); flags override it
    #[arg(long)]
    config: Option<PathBuf>,

    /// The csv file that contains the document urls
    #[arg(long)]
    csv: Option<PathBuf>,

    /// Maximum number of concurrent download workers
    #[arg(long = "max-workers")]
    max_workers: Option<usize>,

    /// Timeout in seconds for a single download
    #[arg(long)]
    timeout: Option<u64>,

    /// CSV field separator (one ASCII char)
    #[arg(long)]
    sep: Option<char>,

    /// Log level for archived items
    #[arg(long, value_enum)]
    log: Option<Verbosity>,

    /// Path of the zip archive to write
    #[arg(short, long)]
    output: Option<PathBuf>,
}

impl RunArgs {
    fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            manifest: self.csv.clone(),
            pool_size: self.max_workers,
            timeout_secs: self.timeout,
            delimiter: self.sep,
            verbosity: self.log,
            output: self.output.clone(),
        }
    }
}

#[derive(Subcommand)]
enum Commands {
    /// Download every document in the manifest and archive the results
    Run {
        #[command(flatten)]
        args: RunArgs,

        /// Show progress bars (stderr)
        #[arg(short, long, default_value_t = false)]
        progress: bool,
    },
    /// Validate configuration and manifest without downloading anything
    Check {
        #[command(flatten)]
        args: RunArgs,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    if std::env::var("RUST_LOG").is_err() {
        unsafe { std::env::set_var("RUST_LOG", "info"); }
    }
    let cli = Cli::parse();
    let logger = env_logger::Builder::from_default_env().build();
    let multi = Arc::new(indicatif::MultiProgress::new());

    match cli.command {
        Commands::Run { args, progress } => {
            let max_level = logger.filter();
            if progress {
                indicatif_log_bridge::LogWrapper::new((*multi).clone(), logger).try_init()?;
            } else {
                log::set_boxed_logger(Box::new(logger))?;
            }
            log::set_max_level(max_level);

            let config = ConfigLoader::resolve(args.config.as_deref(), args.overrides())?;
            let jobs = manifest::load_jobs(&config.manifest, config.delimiter)?;
            let total = jobs.len();
            println!("{} urls found. Downloading...", total);

            // The archive must be writable before the first fetch starts.
            let collector = Collector::from_config(&config)?;
            let engine = FetchEngine::from_config(&config, None);

            let mut progress_bar: Option<ProgressBar> = None;
            let mut _progress_task = None;
            if progress {
                let pb = multi.add(ProgressBar::new(total as u64));
                pb.set_style(ProgressStyle::default_bar()
                    .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta}) {msg}")?
                    .progress_chars("#>-"));

                let mut metrics_rx = engine.watch_metrics();
                let pb_clone = pb.clone();
                progress_bar = Some(pb);
                _progress_task = Some(tokio::spawn(async move {
                    while metrics_rx.changed().await.is_ok() {
                        let snapshot: MetricsSnapshot = metrics_rx.borrow().clone();
                        pb_clone.set_position(snapshot.jobs_completed);
                        pb_clone.set_message(format!(
                            "Active: {} | Success: {:.1}% | {} KiB",
                            snapshot.active_workers,
                            snapshot.success_rate,
                            snapshot.bytes_downloaded / 1024
                        ));
                    }
                }));
            }

            let summary = engine.run(jobs, collector).await?;

            if let Some(task) = _progress_task {
                task.abort();
            }
            if let Some(pb) = progress_bar {
                pb.finish_with_message(format!(
                    "Archived: {} | Failed: {} - Completed",
                    summary.succeeded, summary.failed
                ));
            }

            println!(
                "Found {} records in {} CSV file.",
                summary.total,
                config.manifest.display()
            );
            println!(
                "Download success: {}, failed: {} in time {} ms",
                summary.succeeded,
                summary.failed,
                summary.elapsed_ms()
            );
            println!("Archive written to {}", config.output.display());
        }
        Commands::Check { args } => {
            log::set_boxed_logger(Box::new(logger))?;
            log::set_max_level(log::LevelFilter::Info);

            let checked = ConfigLoader::resolve(args.config.as_deref(), args.overrides())
                .and_then(|cfg| {
                    let jobs = manifest::load_jobs(&cfg.manifest, cfg.delimiter)?;
                    Ok((cfg, jobs))
                });
            match checked {
                Ok((cfg, jobs)) => {
                    for job in &jobs {
                        if let Err(e) = url::Url::parse(job.source_url.trim()) {
                            log::warn!("Record {}: url {:?} will fail: {}", job.id, job.source_url, e);
                        }
                    }
                    println!("✅ Config is valid:");
                    println!("   Manifest: {}", cfg.manifest.display());
                    println!("   Records: {}", jobs.len());
                    println!("   Workers: {}", cfg.pool_size);
                    println!("   Timeout: {}s", cfg.timeout_secs);
                    println!("   Archive: {}", cfg.output.display());
                }
                Err(e) => {
                    eprintln!("❌ Config error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }

    Ok(())
}
