use crate::aws_region::AwsRegion;
use aws_config::{BehaviorVersion, Region, SdkConfig};
use aws_credential_types::provider::ProvideCredentials;
use serde::{Deserialize, Serialize};
use std::fmt;

/// How the AWS credentials for the logs client are obtained.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AwsConfig {
    Profile(String),
    RoleArn(String),
    Env,
}

impl fmt::Display for AwsConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AwsConfig::Profile(profile) => write!(f, "profile:{}", profile),
            AwsConfig::RoleArn(role) => write!(f, "role_arn:{}", role),
            AwsConfig::Env => write!(f, "env"),
        }
    }
}

// Without an explicit region the SDK falls back to its default provider chain
// (AWS_REGION, profile, IMDS).
pub async fn get_initialized_aws_conf(
    initialization_conf: AwsConfig,
    region: Option<AwsRegion>,
) -> Option<SdkConfig> {
    let config_loader = aws_config::defaults(BehaviorVersion::latest());
    let loader = match initialization_conf {
        AwsConfig::Profile(profile) => {
            tracing::debug!("Trying to load AWS config using profile '{}'", profile);
            config_loader.profile_name(profile)
        }
        AwsConfig::RoleArn(arn) => {
            tracing::debug!("Trying to assume role '{}'", &arn);
            let mut role_builder =
                aws_config::sts::AssumeRoleProvider::builder(&arn).session_name("cwlogs-session");
            if let Some(region) = region {
                role_builder = role_builder.region(Region::new(region.as_str()));
            }
            let assumed_role_provider = role_builder.build().await;

            let assumed_credentials_provider =
                match assumed_role_provider.provide_credentials().await {
                    Ok(creds) => creds,
                    Err(err) => {
                        tracing::warn!("Failed to assume role '{}': {:?}", arn, err);
                        return None;
                    }
                };

            config_loader.credentials_provider(assumed_credentials_provider)
        }
        AwsConfig::Env => {
            tracing::debug!("Trying to load AWS config from environment (EC2/IMDS)");
            aws_config::from_env()
        }
    };

    let loader = match region {
        Some(region) => loader.region(Region::new(region.as_str())),
        None => loader,
    };

    let config = loader.load().await;
    let credentials_provider = config.credentials_provider()?;

    match credentials_provider.provide_credentials().await {
        Ok(_) => {
            tracing::debug!("Successfully retrieved AWS credentials");
            Some(config)
        }
        Err(err) => {
            tracing::warn!("Failed to get AWS credentials: {:?}", err);
            None
        }
    }
}

/// Tries the requested credential source first and falls back to the
/// environment chain when a named profile cannot be used.
pub async fn resolve_available_aws_config(
    initialization_conf: AwsConfig,
    region: Option<AwsRegion>,
) -> Option<SdkConfig> {
    match &initialization_conf {
        AwsConfig::Profile(profile_name) => {
            let profile_conf = get_initialized_aws_conf(initialization_conf.clone(), region).await;
            if profile_conf.is_some() {
                tracing::info!("Resolved AWS credentials using profile '{}'", profile_name);
                return profile_conf;
            }
            tracing::warn!(
                "Failed to resolve credentials using profile '{}'",
                profile_name
            );
        }
        AwsConfig::RoleArn(_) => {
            // an explicitly requested role must not silently degrade to other credentials
            return get_initialized_aws_conf(initialization_conf, region).await;
        }
        AwsConfig::Env => {}
    }

    let env_conf = get_initialized_aws_conf(AwsConfig::Env, region).await;
    if env_conf.is_some() {
        tracing::info!("Resolved AWS credentials using environment.");
        return env_conf;
    }

    tracing::warn!("Could not resolve AWS credentials from profile or environment.");
    None
}

/// `AWS_PROFILE` when set, otherwise the `default` profile.
pub fn get_aws_default_profile() -> String {
    std::env::var("AWS_PROFILE")
        .ok()
        .filter(|profile| !profile.trim().is_empty())
        .unwrap_or_else(|| "default".to_string())
}
