// Copyright (c) 2026 Bountyy Oy. All rights reserved.
// This software is proprietary and confidential.

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use lonkero_ddp::capture::{extract_targets, DumpFilter};
use lonkero_ddp::config::{self, AppConfig};
use lonkero_ddp::confuser::{load_templates, run_campaign};
use lonkero_ddp::ddp::{DdpClient, Message};
use lonkero_ddp::probe::attacks::{
    run_password_bruteforce, run_user_enumeration, run_wordlist_buster, BusterKind,
};
use lonkero_ddp::replay::forward_message;

#[derive(Parser)]
#[command(name = "lonkero-ddp")]
#[command(author = "Bountyy Oy <info@bountyy.fi>")]
#[command(version)]
#[command(about = "Security assessment toolkit for DDP (Meteor) applications", long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Increase log verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Emit logs as JSON lines
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (yaml, toml or json)
    #[arg(long, global = true, env = "DDP_CONFIG")]
    config: Option<PathBuf>,

    /// App URL or websocket URL of the target
    #[arg(short, long, global = true)]
    url: Option<String>,

    #[arg(long, global = true, conflicts_with_all = ["email", "token"])]
    username: Option<String>,

    #[arg(long, global = true, conflicts_with = "token")]
    email: Option<String>,

    #[arg(long, global = true)]
    password: Option<String>,

    /// Resume token of an existing session
    #[arg(long, global = true)]
    token: Option<String>,

    /// Upstream HTTP proxy (host:port)
    #[arg(long, global = true)]
    proxy: Option<String>,

    /// In-flight probe ceiling per orchestrator (0 = unbounded)
    #[arg(short, long, global = true)]
    concurrency: Option<usize>,

    /// Write results to this file instead of stdout
    #[arg(short, long, global = true)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Recover every DDP message from a capture file
    DumpMessages {
        capture: PathBuf,

        #[arg(short, long, value_enum, default_value = "all")]
        filter: DumpKind,
    },

    /// Recover distinct method and subscription calls from a capture file
    DumpTargets {
        capture: PathBuf,
    },

    /// Type-confuse every template in a targets file
    Confuser {
        targets: PathBuf,
    },

    /// Discover methods by calling each wordlist entry
    MethodBuster {
        wordlist: PathBuf,

        /// Partitioned connections over the wordlist
        #[arg(short, long)]
        parallelism: Option<usize>,
    },

    /// Discover publications by subscribing to each wordlist entry
    PubBuster {
        wordlist: PathBuf,

        #[arg(short, long)]
        parallelism: Option<usize>,
    },

    /// Find existing accounts by logging in as each wordlist entry
    UserEnum {
        wordlist: PathBuf,
    },

    /// Guess the password of one account
    PasswordBrute {
        /// Account to attack
        #[arg(long = "user")]
        user: String,

        wordlist: PathBuf,
    },

    /// Send one message and print the correlated reply
    Replay {
        /// Message JSON, or @file to read it from a file
        message: String,

        /// Seconds to wait for the reply
        #[arg(long, default_value = "30")]
        wait: u64,
    },
}

#[derive(Copy, Clone, PartialEq, Eq, ValueEnum)]
enum DumpKind {
    All,
    Methods,
    Subscriptions,
    ClientCalls,
}

impl From<DumpKind> for DumpFilter {
    fn from(kind: DumpKind) -> Self {
        match kind {
            DumpKind::All => DumpFilter::All,
            DumpKind::Methods => DumpFilter::Methods,
            DumpKind::Subscriptions => DumpFilter::Subscriptions,
            DumpKind::ClientCalls => DumpFilter::ClientCalls,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    init_logging(cli.verbose, cli.json_logs);

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .thread_name("lonkero-ddp")
        .enable_all()
        .build()?;

    runtime.block_on(async_main(cli))
}

fn init_logging(verbose: u8, json: bool) {
    let default_level = match verbose {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(default_level));

    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// File values, then environment, then flags
fn resolve_config(cli: &Cli) -> Result<AppConfig> {
    let mut app = config::load(cli.config.as_deref())?;

    if let Some(url) = &cli.url {
        app.target.url = Some(url.clone());
    }
    let credential_flags = cli.username.is_some()
        || cli.email.is_some()
        || cli.password.is_some()
        || cli.token.is_some();
    if credential_flags {
        app.target.username = cli.username.clone();
        app.target.email = cli.email.clone();
        app.target.password = cli.password.clone();
        app.target.token = cli.token.clone();
    }
    if let Some(proxy) = &cli.proxy {
        app.target.proxy = Some(proxy.clone());
    }
    if let Some(concurrency) = cli.concurrency {
        app.probing.concurrency = concurrency;
    }

    config::ConfigValidator::validate_app_config(&app)?;
    Ok(app)
}

async fn async_main(cli: Cli) -> Result<()> {
    let app = resolve_config(&cli)?;

    match &cli.command {
        Commands::DumpMessages { capture, filter } => {
            let messages = scan_capture(&app, capture).await?;
            let filter = DumpFilter::from(*filter);
            write_output(cli.output.as_deref(), &filter.apply(&messages))
        }
        Commands::DumpTargets { capture } => {
            let messages = scan_capture(&app, capture).await?;
            let targets = extract_targets(&messages, &app.capture.ignored_operations);
            info!("{} distinct targets", targets.len());
            write_output(cli.output.as_deref(), &targets)
        }
        Commands::Confuser { targets } => {
            let templates = load_templates(targets)
                .await
                .with_context(|| format!("Failed to load targets from {:?}", targets))?;
            let client = DdpClient::connect(app.client_config()?)
                .await
                .context("Failed to connect to target")?;
            let results = run_campaign(
                &client,
                templates,
                app.filters.confuser_match_failed.clone(),
                &app.probing.orchestrator_options(),
            )
            .await;
            client.close();

            let answers: std::collections::BTreeMap<_, _> = results
                .into_iter()
                .map(|(template, report)| {
                    if let Some(reason) = &report.halted {
                        warn!("Confuser for {} halted: {}", template, reason);
                    }
                    (template, report.answers)
                })
                .collect();
            write_output(cli.output.as_deref(), &answers)
        }
        Commands::MethodBuster { wordlist, parallelism } => {
            let report = run_wordlist_buster(
                BusterKind::Method,
                &app.client_config()?,
                wordlist,
                parallelism.unwrap_or(app.probing.parallelism),
                app.filters.method_not_found.clone(),
                &app.probing.orchestrator_options(),
            )
            .await
            .context("Method buster failed")?;
            write_output(cli.output.as_deref(), &report)
        }
        Commands::PubBuster { wordlist, parallelism } => {
            let report = run_wordlist_buster(
                BusterKind::Publication,
                &app.client_config()?,
                wordlist,
                parallelism.unwrap_or(app.probing.parallelism),
                app.filters.publication_not_found.clone(),
                &app.probing.orchestrator_options(),
            )
            .await
            .context("Publication buster failed")?;
            write_output(cli.output.as_deref(), &report)
        }
        Commands::UserEnum { wordlist } => {
            let report = run_user_enumeration(
                &app.client_config()?,
                wordlist,
                app.filters.user_not_found.clone(),
                &app.probing.orchestrator_options(),
                app.client.retry(),
            )
            .await
            .context("User enumeration failed")?;
            write_output(cli.output.as_deref(), &report)
        }
        Commands::PasswordBrute { user, wordlist } => {
            let report = run_password_bruteforce(
                &app.client_config()?,
                user,
                wordlist,
                app.filters.incorrect_password.clone(),
                &app.probing.orchestrator_options(),
                app.client.retry(),
            )
            .await
            .context("Password brute force failed")?;
            write_output(cli.output.as_deref(), &report)
        }
        Commands::Replay { message, wait } => {
            let text = match message.strip_prefix('@') {
                Some(path) => tokio::fs::read_to_string(path)
                    .await
                    .with_context(|| format!("Failed to read message from {}", path))?,
                None => message.clone(),
            };
            let message: Message =
                serde_json::from_str(&text).context("Message is not a valid DDP message")?;
            let outcome = forward_message(&app.client_config()?, message, Duration::from_secs(*wait))
                .await
                .context("Replay failed")?;
            write_output(cli.output.as_deref(), &outcome)
        }
    }
}

async fn scan_capture(app: &AppConfig, capture: &Path) -> Result<Vec<Message>> {
    let scanner = app.capture_scanner();
    let path = capture.to_path_buf();
    let scan = tokio::task::spawn_blocking(move || scanner.scan_file(&path))
        .await
        .context("Capture scan task panicked")?
        .with_context(|| format!("Failed to scan capture {:?}", capture))?;
    if scan.rejected > 0 {
        info!("{} marker candidates rejected", scan.rejected);
    }
    Ok(scan.messages)
}

fn write_output<T: Serialize + ?Sized>(path: Option<&Path>, value: &T) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match path {
        Some(path) => std::fs::write(path, json)
            .with_context(|| format!("Failed to write results to {:?}", path))?,
        None => println!("{}", json),
    }
    Ok(())
}
