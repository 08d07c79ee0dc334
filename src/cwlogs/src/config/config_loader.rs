use anyhow::{ensure, Context, Result};
use chrono::Utc;
use serde::{Deserialize, Deserializer, Serialize};
use std::path::PathBuf;

use crate::constants::{
    DEFAULT_LOG_GROUP_NAME, DRAIN_LIMIT, ENV_LOG_FLUSH_PERIOD, ENV_LOG_GROUP_NAME, ENV_LOG_REGION,
    ENV_LOG_STREAM_NAME, FLUSH_PERIOD_SECS, MAX_EVENTS_PER_PUT, MAX_QUEUE_CAPACITY,
    QUEUE_CAPACITY, SHUTDOWN_TIMEOUT_SECS,
};
use crate::shipper::Destination;
use config::{Config as RConfig, File, FileFormat};
use cwlogs_aws::aws_metadata::host_identifier;
use cwlogs_aws::{get_aws_default_profile, AwsConfig, AwsRegion};

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct ShipperConfig {
    pub log_group_name: String,
    /// Derived from the host id and the start time when unset
    pub log_stream_name: Option<String>,
    /// SDK default region chain when unset
    #[serde(default, deserialize_with = "deserialize_region")]
    pub region: Option<AwsRegion>,
    pub flush_period_secs: u64,
    pub drain_limit: usize,
    pub queue_capacity: usize,
    pub shutdown_timeout_secs: u64,

    #[serde(default = "default_aws_init_type")]
    pub aws_init_type: AwsConfig,
}

fn default_aws_init_type() -> AwsConfig {
    AwsConfig::Profile(get_aws_default_profile())
}

fn deserialize_region<'de, D>(deserializer: D) -> Result<Option<AwsRegion>, D::Error>
where
    D: Deserializer<'de>,
{
    let value: Option<String> = Option::deserialize(deserializer)?;
    value
        .filter(|name| !name.trim().is_empty())
        .map(|name| name.parse().map_err(serde::de::Error::custom))
        .transpose()
}

/// Values given explicitly by the embedding application or the command line.
#[derive(Debug, Clone, Default)]
pub struct ConfigParams {
    pub config_file: Option<PathBuf>,
    pub log_group_name: Option<String>,
    pub log_stream_name: Option<String>,
    pub region: Option<String>,
    pub flush_period_secs: Option<u64>,
    pub aws_profile: Option<String>,
    pub aws_role_arn: Option<String>,
}

impl ConfigParams {
    fn aws_init_type(&self) -> Option<AwsConfig> {
        match (&self.aws_role_arn, &self.aws_profile) {
            (Some(arn), _) => Some(AwsConfig::RoleArn(arn.clone())),
            (None, Some(profile)) => Some(AwsConfig::Profile(profile.clone())),
            (None, None) => None,
        }
    }
}

pub struct ConfigLoader;

impl ConfigLoader {
    /// Resolves the configuration with precedence
    /// environment > explicit parameters > config file > defaults.
    pub fn load(params: &ConfigParams) -> Result<ShipperConfig> {
        Self::load_with_env(params, |key| std::env::var(key).ok())
    }

    pub fn load_with_env(
        params: &ConfigParams,
        env: impl Fn(&str) -> Option<String>,
    ) -> Result<ShipperConfig> {
        let non_empty = |key: &str| env(key).filter(|value| !value.trim().is_empty());

        let mut builder = RConfig::builder();

        // set defaults
        builder = builder
            .set_default("log_group_name", DEFAULT_LOG_GROUP_NAME)?
            .set_default("flush_period_secs", FLUSH_PERIOD_SECS)?
            .set_default("drain_limit", DRAIN_LIMIT as u64)?
            .set_default("queue_capacity", QUEUE_CAPACITY as u64)?
            .set_default("shutdown_timeout_secs", SHUTDOWN_TIMEOUT_SECS)?;

        if let Some(path) = &params.config_file {
            builder = builder.add_source(
                File::new(&path.to_string_lossy(), FileFormat::Toml).required(true),
            );
        }

        // explicit parameters
        builder = builder
            .set_override_option("log_group_name", params.log_group_name.clone())?
            .set_override_option("log_stream_name", params.log_stream_name.clone())?
            .set_override_option("region", params.region.clone())?
            .set_override_option("flush_period_secs", params.flush_period_secs)?;

        // environment overrides, applied last so they win
        builder = builder
            .set_override_option("log_group_name", non_empty(ENV_LOG_GROUP_NAME))?
            .set_override_option("log_stream_name", non_empty(ENV_LOG_STREAM_NAME))?
            .set_override_option("region", non_empty(ENV_LOG_REGION))?
            .set_override_option("flush_period_secs", non_empty(ENV_LOG_FLUSH_PERIOD))?;

        let mut config: ShipperConfig = builder
            .build()?
            .try_deserialize()
            .context("failed to parse configuration")?;

        // tables merge key by key, so the credential source is replaced whole
        if let Some(aws_init_type) = params.aws_init_type() {
            config.aws_init_type = aws_init_type;
        }

        config.validate()?;
        Ok(config)
    }
}

impl ShipperConfig {
    pub fn validate(&self) -> Result<()> {
        ensure!(
            !self.log_group_name.trim().is_empty(),
            "log_group_name must not be empty"
        );
        if let Some(stream) = &self.log_stream_name {
            ensure!(
                !stream.trim().is_empty(),
                "log_stream_name must not be empty"
            );
            ensure!(
                !stream.contains([':', '*']),
                "log_stream_name '{}' must not contain ':' or '*'",
                stream
            );
        }
        ensure!(
            self.flush_period_secs > 0,
            "flush_period_secs must be at least 1"
        );
        ensure!(
            (1..=MAX_EVENTS_PER_PUT).contains(&self.drain_limit),
            "drain_limit must be between 1 and {}",
            MAX_EVENTS_PER_PUT
        );
        ensure!(
            (1..=MAX_QUEUE_CAPACITY).contains(&self.queue_capacity),
            "queue_capacity must be between 1 and {}",
            MAX_QUEUE_CAPACITY
        );
        Ok(())
    }

    /// Resolves the destination, naming the stream after this host when no
    /// stream name was configured.
    pub async fn destination(&self) -> Destination {
        let stream_name = match &self.log_stream_name {
            Some(name) => name.clone(),
            None => default_stream_name(&host_identifier().await, Utc::now().timestamp()),
        };

        Destination::new(self.log_group_name.clone(), stream_name).with_region(self.region)
    }
}

pub fn default_stream_name(host_id: &str, epoch_secs: i64) -> String {
    format!("{}_{}", host_id.replace([':', '*'], "-"), epoch_secs)
}
