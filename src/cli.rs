use clap::{Parser, Subcommand};

#[derive(Parser)]
#[command(name = "filingfreq")]
#[command(about = "Download annual report filings and compute keyword frequency statistics")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Download the documents listed in the manifest
    Download {
        /// Manifest CSV produced by the upstream listing stage
        #[arg(short, long, default_value = "./manifest.csv")]
        manifest: String,

        /// Ledger database file path
        #[arg(short, long, default_value = "./filingfreq.db")]
        database: String,

        /// Directory for downloaded documents (overrides FILINGFREQ_CONTENT_DIR)
        #[arg(short, long)]
        content_dir: Option<String>,

        /// Attempt only entries currently recorded as failed
        #[arg(long)]
        only_failed: bool,

        /// Only process the first N manifest entries
        #[arg(short, long)]
        limit: Option<usize>,

        /// Number of concurrent fetches
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Extract text and compute keyword counts for downloaded documents
    Count {
        /// Manifest CSV produced by the upstream listing stage
        #[arg(short, long, default_value = "./manifest.csv")]
        manifest: String,

        /// Ledger database file path
        #[arg(short, long, default_value = "./filingfreq.db")]
        database: String,

        /// Keyword group configuration (JSON, group name -> keywords)
        #[arg(short, long, default_value = "./keywords.json")]
        keywords: String,

        /// Output CSV for keyword counts
        #[arg(short, long, default_value = "./keyword_counts.csv")]
        output: String,

        /// Discard the existing output table and recompute everything
        #[arg(long)]
        overwrite: bool,

        /// Only process the first N manifest entries
        #[arg(short, long)]
        limit: Option<usize>,
    },

    /// Run the pipeline stages in order: download, then count
    Run {
        /// Manifest CSV produced by the upstream listing stage
        #[arg(short, long, default_value = "./manifest.csv")]
        manifest: String,

        /// Ledger database file path
        #[arg(short, long, default_value = "./filingfreq.db")]
        database: String,

        /// Directory for downloaded documents (overrides FILINGFREQ_CONTENT_DIR)
        #[arg(short, long)]
        content_dir: Option<String>,

        /// Keyword group configuration (JSON, group name -> keywords)
        #[arg(short, long, default_value = "./keywords.json")]
        keywords: String,

        /// Output CSV for keyword counts
        #[arg(short, long, default_value = "./keyword_counts.csv")]
        output: String,

        /// Number of concurrent fetches
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Retry failed downloads (shorthand for download --only-failed)
    RetryFailed {
        /// Manifest CSV produced by the upstream listing stage
        #[arg(short, long, default_value = "./manifest.csv")]
        manifest: String,

        /// Ledger database file path
        #[arg(short, long, default_value = "./filingfreq.db")]
        database: String,

        /// Directory for downloaded documents (overrides FILINGFREQ_CONTENT_DIR)
        #[arg(short, long)]
        content_dir: Option<String>,

        /// Number of concurrent fetches
        #[arg(short, long)]
        workers: Option<usize>,
    },

    /// Show ledger, content store, and output tallies
    Status {
        /// Ledger database file path
        #[arg(short, long, default_value = "./filingfreq.db")]
        database: String,

        /// Directory for downloaded documents (overrides FILINGFREQ_CONTENT_DIR)
        #[arg(short, long)]
        content_dir: Option<String>,

        /// Output CSV for keyword counts
        #[arg(short, long, default_value = "./keyword_counts.csv")]
        output: String,
    },
}
