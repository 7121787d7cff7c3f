use anyhow::Result;
use clap::Parser;
use std::path::Path;
use tracing::info;
use walkdir::WalkDir;

use filingfreq::aggregator;
use filingfreq::cli::{Cli, Commands};
use filingfreq::config::Config;
use filingfreq::downloader;
use filingfreq::keywords::KeywordGroups;
use filingfreq::manifest;
use filingfreq::models::{DownloadMode, WriteMode};
use filingfreq::storage::Ledger;

#[tokio::main]
async fn main() -> Result<()> {
    // Set default log level to INFO if not specified
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "filingfreq=info");
    }

    // Initialize logging to both console and file
    use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

    let file_appender = tracing_appender::rolling::never(".", "filingfreq.log");

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(EnvFilter::from_default_env()),
        )
        .with(
            fmt::layer()
                .with_writer(file_appender)
                .with_ansi(false)
                .with_filter(EnvFilter::from_default_env()),
        )
        .init();

    let cli = Cli::parse();

    match &cli.command {
        Commands::Download {
            manifest,
            database,
            content_dir,
            only_failed,
            limit,
            workers,
        } => {
            let mode = if *only_failed {
                DownloadMode::OnlyFailed
            } else {
                DownloadMode::All
            };
            run_download(manifest, database, content_dir.as_deref(), *workers, mode, *limit).await?;
        }

        Commands::Count {
            manifest,
            database,
            keywords,
            output,
            overwrite,
            limit,
        } => {
            let mode = if *overwrite {
                WriteMode::Overwrite
            } else {
                WriteMode::Append
            };
            run_count(manifest, database, keywords, output, mode, *limit).await?;
        }

        Commands::Run {
            manifest,
            database,
            content_dir,
            keywords,
            output,
            workers,
        } => {
            run_download(
                manifest,
                database,
                content_dir.as_deref(),
                *workers,
                DownloadMode::All,
                None,
            )
            .await?;
            run_count(manifest, database, keywords, output, WriteMode::Append, None).await?;
        }

        Commands::RetryFailed {
            manifest,
            database,
            content_dir,
            workers,
        } => {
            run_download(
                manifest,
                database,
                content_dir.as_deref(),
                *workers,
                DownloadMode::OnlyFailed,
                None,
            )
            .await?;
        }

        Commands::Status {
            database,
            content_dir,
            output,
        } => {
            run_status(database, content_dir.as_deref(), output).await?;
        }
    }

    Ok(())
}

fn build_config(content_dir: Option<&str>, workers: Option<usize>) -> Result<Config> {
    let mut config = Config::from_env()?;
    if let Some(dir) = content_dir {
        config.content_dir = dir.into();
    }
    if let Some(workers) = workers {
        config.download_workers = workers;
    }
    config.validate()?;
    Ok(config)
}

async fn run_download(
    manifest_path: &str,
    database: &str,
    content_dir: Option<&str>,
    workers: Option<usize>,
    mode: DownloadMode,
    limit: Option<usize>,
) -> Result<()> {
    let config = build_config(content_dir, workers)?;

    let mut entries = manifest::load(Path::new(manifest_path))?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    info!("Starting download of {} manifest entries", entries.len());
    let ledger = Ledger::open(database).await?;
    downloader::download(&entries, mode, &ledger, &config).await?;
    Ok(())
}

async fn run_count(
    manifest_path: &str,
    database: &str,
    keywords_path: &str,
    output: &str,
    mode: WriteMode,
    limit: Option<usize>,
) -> Result<()> {
    let groups = KeywordGroups::from_file(Path::new(keywords_path))?;

    let mut entries = manifest::load(Path::new(manifest_path))?;
    if let Some(limit) = limit {
        entries.truncate(limit);
    }

    info!("Starting keyword counting for {} manifest entries", entries.len());
    let ledger = Ledger::open(database).await?;
    aggregator::process(&entries, &ledger, &groups, mode, Path::new(output)).await?;
    Ok(())
}

async fn run_status(database: &str, content_dir: Option<&str>, output: &str) -> Result<()> {
    let config = build_config(content_dir, None)?;

    println!("\nfilingfreq status");
    println!("{}", "-".repeat(40));

    if Path::new(database).exists() {
        let ledger = Ledger::open(database).await?;
        let counts = ledger.status_counts().await?;
        println!("{:<24} {}", "Ledger:", database);
        for (status, count) in &counts {
            println!("{:<24} {}", format!("  {}:", status), count);
        }
    } else {
        println!("{:<24} {}", "Ledger:", "not created yet");
    }

    let files = WalkDir::new(&config.content_dir)
        .into_iter()
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().is_file())
        .count();
    println!("{:<24} {}", "Files in content store:", files);

    let output_path = Path::new(output);
    if output_path.exists() {
        let mut reader = csv::ReaderBuilder::new().flexible(true).from_path(output_path)?;
        let rows = reader.records().filter_map(std::result::Result::ok).count();
        println!("{:<24} {}", "Count rows:", rows);
    } else {
        println!("{:<24} {}", "Count rows:", "no output yet");
    }

    Ok(())
}
