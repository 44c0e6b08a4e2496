//! s3-artifact-store -- move build artifacts in and out of an S3 bucket.
//!
//! Connection settings come from an optional YAML file, then command-line
//! overrides, then the environment (`AWS_DEFAULT_REGION`, `S3_ENDPOINT`,
//! `S3_PATH_STYLE_ENABLED`, `PUBLIC_REPOSITORY`) and the AWS SDK chains.

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use tracing::info;

use s3_artifact_store::config::{load_config, Config, ProcessEnv};
use s3_artifact_store::{goals, StorageRepository};

/// Command-line arguments.
#[derive(Parser, Debug)]
#[command(
    name = "s3-artifact-store",
    version,
    about = "Artifact repository access on S3-compatible storage"
)]
struct Cli {
    /// Path to the YAML configuration file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Override the bucket.
    #[arg(long)]
    bucket: Option<String>,

    /// Override the key prefix inside the bucket.
    #[arg(long)]
    base_directory: Option<String>,

    /// Override the region.
    #[arg(long)]
    region: Option<String>,

    /// Override the endpoint (scheme://host[:port]).
    #[arg(long)]
    endpoint: Option<String>,

    /// Force path-style addressing.
    #[arg(long)]
    path_style: bool,

    /// Upload with the public-read ACL.
    #[arg(long)]
    public_read: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Download one key to a file, or every object under several prefixes
    /// into a directory.
    Download {
        /// Target file (one key) or directory (several keys).
        #[arg(short, long)]
        path: PathBuf,

        #[arg(required = true)]
        keys: Vec<String>,
    },
    /// Upload a file or a directory tree.
    Upload {
        path: PathBuf,

        /// Destination key (file) or key prefix (directory).
        #[arg(short, long)]
        key: Option<String>,
    },
    /// List keys under a prefix.
    List {
        #[arg(default_value = "")]
        prefix: String,

        /// Print a directory-style listing instead of raw keys.
        #[arg(long)]
        tree: bool,
    },
    /// Exit with status 0 if the object exists, 1 otherwise.
    Exists { path: String },
}

fn init_tracing(config: &Config) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if config.logging.format == "json" {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => Config::default(),
    };
    init_tracing(&config);
    if let Some(path) = &cli.config {
        info!("Loaded configuration from {}", path.display());
    }

    let repo = &mut config.repository;
    if let Some(bucket) = cli.bucket {
        repo.bucket = bucket;
    }
    if let Some(base_directory) = cli.base_directory {
        repo.base_directory = base_directory;
    }
    if cli.region.is_some() {
        repo.region = cli.region;
    }
    if cli.endpoint.is_some() {
        repo.endpoint = cli.endpoint;
    }
    if cli.path_style {
        repo.path_style = Some(true);
    }
    if cli.public_read {
        repo.public_read = Some(true);
    }

    let env = ProcessEnv;
    let settings = config.repository_settings(&env)?;
    let params = config.connection_params(&env);
    let repository = StorageRepository::connect(settings, &params)?;

    match cli.command {
        Command::Download { path, keys } => {
            let count = goals::download(&repository, keys.as_slice(), &path)?;
            info!("{} file(s) downloaded", count);
        }
        Command::Upload { path, key } => {
            let count = goals::upload(&repository, &path, key.as_deref())?;
            info!("{} file(s) uploaded", count);
        }
        Command::List { prefix, tree } => {
            let entries = if tree {
                repository.file_listing(&prefix)?
            } else {
                repository.list(&prefix)?
            };
            for entry in entries {
                println!("{entry}");
            }
        }
        Command::Exists { path } => {
            let exists = repository.exists(&path)?;
            println!("{exists}");
            repository.disconnect();
            std::process::exit(if exists { 0 } else { 1 });
        }
    }

    repository.disconnect();
    Ok(())
}
