use crate::cloud_providers::logs::CloudWatchLogs;
use crate::config::{ConfigLoader, ConfigParams};
use crate::layer::ShipperLayer;
use crate::logging::setup_logging;
use crate::shipper::{LogShipper, ShipperOptions};
use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use cwlogs_aws::aws_metadata::host_identifier;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn};

#[derive(Parser, Clone)]
#[clap(
    name = "cwlogs",
    about = "Ships log lines to a CloudWatch Logs stream",
    version
)]
pub struct Cli {
    /// Also write diagnostics to a daily rolling file in this directory
    #[clap(long, global = true, value_name = "DIR")]
    pub log_dir: Option<PathBuf>,
    #[clap(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Read lines from stdin and ship each one as a log event
    Ship(ShipArgs),

    /// Print the resolved configuration and destination
    Config(ShipArgs),

    /// Print the identifier used in default stream names
    HostId,
}

#[derive(Args, Debug, Clone, Default)]
pub struct ShipArgs {
    /// TOML file with shipper settings
    #[clap(long, value_name = "FILE")]
    pub config: Option<PathBuf>,

    /// Log group name
    #[clap(long)]
    pub group: Option<String>,

    /// Log stream name, defaults to `<host id>_<epoch seconds>`
    #[clap(long)]
    pub stream: Option<String>,

    /// AWS region, e.g. us-east-1
    #[clap(long)]
    pub region: Option<String>,

    /// Seconds between flushes
    #[clap(long, value_name = "SECS")]
    pub flush_period: Option<u64>,

    /// AWS profile from the shared credentials file
    #[clap(long, conflicts_with = "role_arn")]
    pub profile: Option<String>,

    /// IAM role to assume
    #[clap(long)]
    pub role_arn: Option<String>,
}

impl From<ShipArgs> for ConfigParams {
    fn from(args: ShipArgs) -> Self {
        ConfigParams {
            config_file: args.config,
            log_group_name: args.group,
            log_stream_name: args.stream,
            region: args.region,
            flush_period_secs: args.flush_period,
            aws_profile: args.profile,
            aws_role_arn: args.role_arn,
        }
    }
}

/// Process the command line.
pub fn process_command() -> Result<()> {
    let cli = Cli::parse();

    setup_logging(cli.log_dir.as_deref(), None::<ShipperLayer>)?;

    tokio::runtime::Runtime::new()
        .context("Failed to start the tokio runtime")?
        .block_on(run(cli.command))
}

pub async fn run(command: Command) -> Result<()> {
    match command {
        Command::Ship(args) => ship(args.into()).await,
        Command::Config(args) => {
            let config = ConfigLoader::load(&args.into())?;
            println!("{:#?}", config);
            println!("{:#?}", config.destination().await);
            Ok(())
        }
        Command::HostId => {
            println!("{}", host_identifier().await);
            Ok(())
        }
    }
}

async fn ship(params: ConfigParams) -> Result<()> {
    let config = ConfigLoader::load(&params)?;
    let api = CloudWatchLogs::from_config(&config).await?;
    let destination = config.destination().await;

    let shipper = LogShipper::start(api, destination, ShipperOptions::from(&config))
        .await
        .context("Failed to prepare the log destination")?;
    let handle = shipper.handle();

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            line = lines.next_line() => match line {
                Ok(Some(line)) => {
                    if !line.trim().is_empty() {
                        handle.submit_now(line);
                    }
                }
                Ok(None) => break,
                Err(err) => {
                    warn!("Failed to read stdin: {}", err);
                    break;
                }
            },
            _ = &mut ctrl_c => {
                info!("Interrupted, flushing pending log events");
                break;
            }
        }
    }

    let report = shipper.shutdown().await?;
    if report.dropped > 0 || report.queue_overflow > 0 {
        warn!(
            "{} log events were not delivered",
            report.dropped as u64 + report.queue_overflow
        );
    }
    Ok(())
}
