use anyhow::{bail, Result};
use chrono::{DateTime, Utc};
use clap::{Parser, Subcommand};
use estate_feed::dispatch::dispatcher::Dispatcher;
use estate_feed::helpers::urls::FeedUrls;
use estate_feed::observability::metrics::get_metrics;
use estate_feed::utils::config_loader;
use estate_feed::utils::constants::DEFAULT_CONFIG_PATH;
use estate_feed::utils::logging;
use estate_feed::utils::logging::LogLevel;
use estate_feed::TokenStore;
use tracing::{info, warn};

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Args {
    #[arg(short, long, env = "CONFIG", default_value = DEFAULT_CONFIG_PATH)]
    config: String,
    #[arg(long, env = "LOG_LEVEL", value_enum)]
    log_level: Option<LogLevel>,
    /// Print prometheus metrics to stderr before exiting
    #[arg(long)]
    print_metrics: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// List branches
    Branches,
    /// Branch details
    Branch { branch_id: String },
    /// Properties of a branch
    Properties { branch_id: String },
    /// Property details
    Property { branch_id: String, property_id: String },
    /// Properties changed since an RFC3339 timestamp
    ChangedSince { since: DateTime<Utc> },
    /// Files changed since an RFC3339 timestamp
    FilesChangedSince { since: DateTime<Utc> },
    /// Any feed URL, e.g. one taken from a previous response
    Get { url: String },
}

impl Command {
    fn url(&self, urls: &FeedUrls) -> String {
        match self {
            Command::Branches => urls.branch_list(),
            Command::Branch { branch_id } => urls.branch(branch_id),
            Command::Properties { branch_id } => urls.property_list(branch_id),
            Command::Property { branch_id, property_id } => urls.property(branch_id, property_id),
            Command::ChangedSince { since } => urls.properties_changed_since(since),
            Command::FilesChangedSince { since } => urls.files_changed_since(since),
            Command::Get { url } => url.to_owned(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // -------------------------------
    // 1. Load YAML config, init logging
    // -------------------------------

    let args = Args::parse();
    let service_config = config_loader::run(&args.config).await?;
    logging::run(&service_config, args.log_level.to_owned()).await?;

    // -------------------------------
    // 2. Build store and dispatcher
    // -------------------------------

    let store = TokenStore::from_config(&service_config.store);
    let dispatcher = Dispatcher::new(store, &service_config.feed, &service_config.settings)?;
    let url = args.command.url(dispatcher.urls());

    // -------------------------------
    // 3. Dispatch, ctrl-c drops the in-flight request
    // -------------------------------

    info!(url, "dispatching");
    let outcome = tokio::select! {
        result = dispatcher.dispatch(&url) => result,
        _ = tokio::signal::ctrl_c() => {
            warn!("interrupted");
            bail!("interrupted before '{}' completed", url);
        }
    };

    if args.print_metrics {
        eprint!("{}", get_metrics().await.render()?);
    }

    let value = outcome?;
    println!("{}", serde_json::to_string_pretty(&value)?);
    Ok(())
}
