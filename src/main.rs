//! sitemount
//!
//! Exposes local directories and git repositories as virtual websites, then
//! hands a URL-only configuration to an external crawler.
//!
//! # Architecture Overview
//!
//! ```text
//!   config file ──▶ config (load, validate) ──▶ ValidatedConfig
//!                                                     │
//!                      ┌──────────────────────────────┼───────────────────┐
//!                      ▼                              ▼                   ▼
//!               sources (git clone)          directory mounts     domains (as-is)
//!                      │                              │                   │
//!                      └──────────────┬───────────────┘                   │
//!                                     ▼                                   │
//!                        http (VirtualHostServer, one port,               │
//!                              Host header → mounts)                      │
//!                                     │                                   │
//!                                     ▼                                   │
//!                        resolve (hosts file block)                       │
//!                                     │                                   │
//!                                     ▼                                   ▼
//!                        config::translate ──▶ crawler-config.json ──▶ crawler
//! ```

use std::net::IpAddr;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use clap::{ArgAction, Parser, Subcommand};

use sitemount::config::{self, PublicEndpoint, RuntimeSettings};
use sitemount::lifecycle::signals::shutdown_signal;
use sitemount::lifecycle::{RunError, Session};
use sitemount::observability::logging;

#[derive(Parser)]
#[command(name = "sitemount")]
#[command(version, about = "Serve local content as virtual websites for a crawler", long_about = None)]
struct Cli {
    /// Address the virtual host server binds to
    #[arg(long, global = true, env = "SITEMOUNT_BIND")]
    bind: Option<String>,

    /// Address virtual hostnames resolve to
    #[arg(long, global = true, env = "SITEMOUNT_ADVERTISE")]
    advertise: Option<IpAddr>,

    /// Directory for clones and the generated crawler config (default: a fresh temp dir)
    #[arg(long, global = true, env = "SITEMOUNT_WORK_DIR")]
    work_dir: Option<PathBuf>,

    /// Hosts file that receives the resolution override
    #[arg(long, global = true, env = "SITEMOUNT_HOSTS_FILE")]
    hosts_file: Option<PathBuf>,

    /// External crawler executable
    #[arg(long, global = true, env = "SITEMOUNT_CRAWLER")]
    crawler: Option<PathBuf>,

    /// Git executable
    #[arg(long, global = true, env = "SITEMOUNT_GIT")]
    git: Option<PathBuf>,

    /// Clone and serve, but leave name resolution alone and skip the crawler
    #[arg(long, global = true, env = "SITEMOUNT_DRY_RUN")]
    dry_run: bool,

    /// Do not mirror mounts on localhost
    #[arg(long, global = true)]
    no_localhost_mirror: bool,

    /// Seconds `stop` waits for in-flight requests
    #[arg(long, global = true, env = "SITEMOUNT_SHUTDOWN_TIMEOUT")]
    shutdown_timeout: Option<u64>,

    /// More logging (-v, -vv)
    #[arg(short, long, global = true, action = ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check a configuration file and list its entries
    Validate { config: PathBuf },
    /// Print the crawler-facing configuration without side effects
    Translate {
        config: PathBuf,
        /// Port the virtual hosts are assumed to be served on
        #[arg(long, default_value_t = 80)]
        port: u16,
    },
    /// Prepare everything and serve until interrupted
    Serve { config: PathBuf },
    /// Prepare everything, run the crawler, then tear down
    Crawl {
        config: PathBuf,
        /// Extra arguments passed to the crawler
        #[arg(last = true)]
        crawler_args: Vec<String>,
    },
}

impl Cli {
    fn settings(&self) -> RuntimeSettings {
        let mut settings = RuntimeSettings::default();
        if let Some(bind) = &self.bind {
            settings.server.bind_address = bind.clone();
        }
        if let Some(timeout) = self.shutdown_timeout {
            settings.server.shutdown_timeout_secs = timeout;
        }
        if let Some(addr) = self.advertise {
            settings.advertise_address = addr;
        }
        if let Some(dir) = &self.work_dir {
            settings.work_dir = Some(dir.clone());
        }
        if let Some(hosts) = &self.hosts_file {
            settings.hosts_file = hosts.clone();
        }
        if let Some(crawler) = &self.crawler {
            settings.crawler_program = Some(crawler.clone());
        }
        if let Some(git) = &self.git {
            settings.git_program = git.clone();
        }
        settings.dry_run = self.dry_run;
        settings.mirror_on_localhost = !self.no_localhost_mirror;
        settings
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match run(cli).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Run failed");
            eprintln!("error: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> Result<ExitCode, RunError> {
    let settings = cli.settings();

    match cli.command {
        Commands::Validate { config: path } => {
            let validated = config::load_config(&path)?;
            if validated.is_empty() {
                println!("{}: no entries", path.display());
            }
            for entry in &validated.entries {
                println!("{:<10} {}", entry.kind(), entry.host());
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Translate { config: path, port } => {
            let validated = config::load_config(&path)?;
            let translated = config::to_crawler_config(&validated, &PublicEndpoint { port });
            match serde_json::to_string_pretty(&translated) {
                Ok(text) => println!("{text}"),
                Err(e) => tracing::error!(error = %e, "Failed to render crawler config"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Commands::Serve { config: path } => serve(&path, settings).await,
        Commands::Crawl { config: path, crawler_args } => crawl(&path, settings, &crawler_args).await,
    }
}

async fn serve(config_path: &Path, settings: RuntimeSettings) -> Result<ExitCode, RunError> {
    let validated = config::load_config(config_path)?;
    let mut session = Session::prepare(validated, settings).await?;

    let result = match session.write_crawler_config() {
        Ok(path) => {
            match session.local_addr() {
                Some(addr) => {
                    tracing::info!(
                        address = %addr,
                        hosts = ?session.server().hostnames(),
                        crawler_config = %path.display(),
                        "Serving; press Ctrl+C to stop"
                    );
                    shutdown_signal().await;
                }
                None => tracing::warn!("Nothing to serve"),
            }
            Ok(ExitCode::SUCCESS)
        }
        Err(e) => Err(e),
    };

    session.teardown().await;
    result
}

async fn crawl(config_path: &Path, settings: RuntimeSettings, args: &[String]) -> Result<ExitCode, RunError> {
    let validated = config::load_config(config_path)?;
    let mut session = Session::prepare(validated, settings).await?;

    let result = tokio::select! {
        result = session.run_crawler(args) => result.map(|status| match status {
            None => ExitCode::SUCCESS,
            Some(status) => match status.code() {
                Some(code) => ExitCode::from(u8::try_from(code).unwrap_or(1)),
                None => ExitCode::FAILURE,
            },
        }),
        _ = shutdown_signal() => {
            tracing::warn!("Interrupted; stopping crawl");
            Ok(ExitCode::from(130))
        }
    };

    session.teardown().await;
    result
}
