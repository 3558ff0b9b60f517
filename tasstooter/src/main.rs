//! tasstooter - organize toots and toot them later

use clap::{Parser, Subcommand};
use libtasstooter::logging::{LogFormat, LoggingConfig};
use libtasstooter::platforms::mastodon::MastodonClient;
use libtasstooter::service::posting::PublishOutcome;
use libtasstooter::service::TootService;
use libtasstooter::{Config, Result, TootError};
use std::future::Future;
use std::path::PathBuf;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "tasstooter")]
#[command(version)]
#[command(about = "Organize toots and toot them later", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,

    /// Path to the config file (defaults to ~/.config/tasstooter/config.toml)
    #[arg(short, long, global = true, env = "TASSTOOTER_CONFIG")]
    config: Option<PathBuf>,

    /// Log output format (text, json or pretty)
    #[arg(long, global = true)]
    log_format: Option<LogFormat>,

    /// Enable verbose logging
    #[arg(short, long, global = true)]
    verbose: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Add a toot to the archive, with a source url (0 for no source)
    Add {
        toot: String,
        source: Option<String>,
    },

    /// Insert a newline-separated file of sourceless toots into the archive
    Insert {
        #[arg(value_name = "FILENAME")]
        file: PathBuf,
    },

    /// Toot a toot from the archive with a different source than the last one
    Toot,

    /// Answer replies asking for the source of a toot, until interrupted
    Listen,

    /// Show how many toots are left
    Status,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let mut logging = LoggingConfig::from_env(cli.verbose);
    if let Some(format) = cli.log_format {
        logging.format = format;
    }
    logging.init();

    if let Err(e) = run(cli).await {
        eprintln!("Error: {}", e);
        std::process::exit(e.exit_code());
    }
}

async fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from_path(path)?,
        None => Config::load()?,
    };
    let service = TootService::from_config(config).await?;

    let result = execute(&service, cli.command).await;
    service.shutdown().await?;
    result
}

async fn execute(service: &TootService, command: Command) -> Result<()> {
    match command {
        Command::Add { toot, source } => {
            let id = service.archive().add(&toot, source.as_deref()).await?;
            println!("Added toot {}", id);
        }
        Command::Insert { file } => {
            let content = std::fs::read_to_string(&file).map_err(|e| {
                TootError::InvalidInput(format!("Failed to read {}: {}", file.display(), e))
            })?;
            let count = service.archive().add_many(content.lines()).await?;
            println!("Inserted {} toots into the archive", count);
        }
        Command::Toot => toot(service).await?,
        Command::Listen => listen(service).await?,
        Command::Status => {
            let stats = service.archive().stats().await?;
            println!("total: {}", stats.total);
            println!("unused: {}", stats.unused);
            println!("eligible: {}", stats.eligible);
            match stats.last_source {
                Some(source) => println!("last source: {}", source),
                None => println!("last source: -"),
            }
        }
    }

    Ok(())
}

async fn toot(service: &TootService) -> Result<()> {
    let client = MastodonClient::from_config(service.config().require_mastodon()?)?;

    match service.posting().publish_next(&client).await? {
        PublishOutcome::Published { post, external_id } => {
            println!("tooting: {}", post.text);
            info!(external_id = %external_id, "Toot published");
        }
        PublishOutcome::NothingToPublish => println!("No toots in the archive"),
    }

    Ok(())
}

async fn listen(service: &TootService) -> Result<()> {
    let client = MastodonClient::from_config(service.config().require_mastodon()?)?;
    let mut notifications = client.notifications(service.config().replies.poll_interval);

    let summary = service
        .replies()
        .run(&mut notifications, &client, shutdown_signal()?)
        .await?;

    info!(
        disclosed = summary.disclosed,
        skipped = summary.skipped,
        ignored = summary.ignored,
        failed = summary.failed,
        "Reply listener stopped"
    );
    Ok(())
}

/// Resolves on SIGINT or SIGTERM
#[cfg(unix)]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    use futures::StreamExt;
    use signal_hook::consts::{SIGINT, SIGTERM};
    use signal_hook_tokio::Signals;

    let mut signals = Signals::new([SIGINT, SIGTERM]).map_err(TootError::Signal)?;

    Ok(async move {
        if let Some(signal) = signals.next().await {
            info!(signal, "Received shutdown signal, stopping gracefully...");
        }
    })
}

#[cfg(not(unix))]
fn shutdown_signal() -> Result<impl Future<Output = ()>> {
    Ok(async {
        let _ = tokio::signal::ctrl_c().await;
    })
}
