mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;

use bug_reporter::{
    init_logging, AppConfig, BugGateway, HttpGateway, LocalGateway, Priority, Status, Verbosity,
};

use commands::metadata::parse_key_value;

#[derive(Parser)]
#[command(name = "bug-reporter")]
#[command(about = "Report and track bugs against a small HTTP bug store")]
#[command(version)]
struct Cli {
    /// Config file (defaults to ./bug-reporter.toml when present)
    #[arg(long, global = true, env = "BUG_REPORTER_CONFIG")]
    config: Option<PathBuf>,

    /// Use the SQLite database directly instead of the HTTP API
    #[arg(long, global = true)]
    local: bool,

    /// Database path for --local and serve (overrides config)
    #[arg(long, global = true)]
    database: Option<PathBuf>,

    /// Bug collection URL (overrides config)
    #[arg(long, global = true)]
    api: Option<String>,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Errors only
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    quiet: bool,

    /// Log as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the HTTP bug store
    Serve {
        /// Address to bind (overrides config)
        #[arg(short, long)]
        bind: Option<String>,
    },

    /// Submit a new bug report
    Submit {
        /// Bug title
        title: String,
        /// Bug description
        #[arg(short, long)]
        description: Option<String>,
        /// Screenshot URL
        #[arg(short, long)]
        screenshot: Option<String>,
        /// Priority (low, medium, high, critical)
        #[arg(short, long)]
        priority: Option<Priority>,
        /// Metadata as key=value, repeatable
        #[arg(short, long = "meta", value_parser = parse_key_value)]
        metadata: Vec<(String, String)>,
        /// Do not attach OS, user and host details
        #[arg(long)]
        no_context: bool,
    },

    /// List bugs, newest first
    List,

    /// Show bug details
    Show {
        /// Bug ID
        id: i64,
        /// Print the record as JSON
        #[arg(long)]
        json: bool,
    },

    /// Change a bug's status
    Status {
        /// Bug ID
        id: i64,
        /// New status (open, in_progress, closed)
        status: Status,
    },

    /// Change a bug's priority
    Priority {
        /// Bug ID
        id: i64,
        /// New priority (low, medium, high, critical)
        priority: Priority,
    },

    /// Merge metadata into a bug
    Metadata {
        /// Bug ID
        id: i64,
        /// Entries as key=value; JSON numbers, booleans and null keep their type
        #[arg(value_parser = parse_key_value, required = true)]
        entries: Vec<(String, String)>,
    },

    /// Delete a bug
    Delete {
        /// Bug ID
        id: i64,
        /// Skip confirmation
        #[arg(short, long)]
        force: bool,
    },
}

fn load_config(cli: &Cli) -> Result<AppConfig> {
    let mut config = AppConfig::load_from(cli.config.as_deref()).context("Failed to load config")?;

    if let Some(path) = &cli.database {
        config.server.database_path = path.clone();
    }
    if let Some(api) = &cli.api {
        config.reporter.api_endpoint = Some(api.clone());
    }

    Ok(config)
}

fn get_gateway(local: bool, config: &AppConfig) -> Result<Arc<dyn BugGateway>> {
    if local {
        let gateway = LocalGateway::open(&config.server.database_path)
            .context("Failed to open database")?;
        Ok(Arc::new(gateway))
    } else {
        Ok(Arc::new(HttpGateway::new(config.reporter.endpoint())))
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(Verbosity::from_flags(cli.quiet, cli.verbose), cli.json_logs);

    let mut config = load_config(&cli)?;
    let local = cli.local;

    match cli.command {
        Commands::Serve { bind } => {
            if let Some(bind) = bind {
                config.server.bind = bind;
            }
            bug_reporter::server::serve(&config.server).await
        }

        Commands::Submit {
            title,
            description,
            screenshot,
            priority,
            metadata,
            no_context,
        } => {
            let gateway = get_gateway(local, &config)?;
            let submission = commands::submit::Submission {
                title,
                description,
                screenshot_url: screenshot,
                priority,
                metadata,
                with_context: !no_context,
            };
            commands::submit::run(gateway, config.reporter, submission).await
        }

        Commands::List => {
            let gateway = get_gateway(local, &config)?;
            commands::list::run(gateway.as_ref()).await
        }

        Commands::Show { id, json } => {
            let gateway = get_gateway(local, &config)?;
            commands::show::run(gateway.as_ref(), id, json).await
        }

        Commands::Status { id, status } => {
            let gateway = get_gateway(local, &config)?;
            commands::status::run(gateway.as_ref(), id, status).await
        }

        Commands::Priority { id, priority } => {
            let gateway = get_gateway(local, &config)?;
            commands::priority::run(gateway.as_ref(), id, priority).await
        }

        Commands::Metadata { id, entries } => {
            let gateway = get_gateway(local, &config)?;
            commands::metadata::run(gateway.as_ref(), id, &entries).await
        }

        Commands::Delete { id, force } => {
            let gateway = get_gateway(local, &config)?;
            commands::delete::run(gateway.as_ref(), id, force).await
        }
    }
}
