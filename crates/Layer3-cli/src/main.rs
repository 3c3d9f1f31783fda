//! Launchpad CLI - Main entry point

mod init;
mod run;
mod tools;

use clap::{Parser, Subcommand};
use std::path::PathBuf;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Launchpad - start, stop and watch local helper tools
#[derive(Parser, Debug)]
#[command(name = "launchpad")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Directory holding tools_config.json and the tool projects
    #[arg(long, global = true)]
    base_dir: Option<PathBuf>,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Write the default tools_config.json
    Init {
        /// Overwrite an existing tools_config.json
        #[arg(short, long)]
        force: bool,
    },
    /// List configured tools
    List,
    /// Validate tools_config.json
    Check,
    /// Start tools and follow their merged output until Ctrl-C
    Run {
        /// Tool ids to start
        ids: Vec<String>,

        /// Start every enabled tool
        #[arg(short, long, conflicts_with = "ids")]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // Initialize logging (stderr, so the feed on stdout stays clean)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(log_level)),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let base_dir = match args.base_dir {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    match args.command {
        Command::Init { force } => init::init_tools(&base_dir, force),
        Command::List => tools::list_tools(&base_dir),
        Command::Check => tools::check_tools(&base_dir),
        Command::Run { ids, all } => run::run_tools(&base_dir, ids, all).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_all() {
        let args = Args::parse_from(["launchpad", "--base-dir", "/tmp/tools", "run", "--all"]);
        assert_eq!(args.base_dir, Some(PathBuf::from("/tmp/tools")));
        assert!(matches!(args.command, Command::Run { all: true, .. }));
    }

    #[test]
    fn test_parse_run_ids() {
        let args = Args::parse_from(["launchpad", "run", "dash1", "helper1", "--debug"]);
        assert!(args.debug);
        match args.command {
            Command::Run { ids, all } => {
                assert_eq!(ids, vec!["dash1", "helper1"]);
                assert!(!all);
            }
            other => panic!("unexpected command: {:?}", other),
        }
    }

    #[test]
    fn test_all_conflicts_with_ids() {
        assert!(Args::try_parse_from(["launchpad", "run", "dash1", "--all"]).is_err());
    }
}
