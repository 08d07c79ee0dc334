use std::time::Duration;
use sysinfo::System;

const METADATA_BASE_URL: &str = "http://169.254.169.254/latest";
const METADATA_TIMEOUT_SECS: u64 = 5;
const METADATA_TOKEN_TTL_SECS: &str = "60";
const UNKNOWN_HOST: &str = "unknown";

/// Identifier of the machine we run on, used to name log streams.
///
/// Prefers the EC2 instance id and falls back to the local hostname when the
/// instance metadata service is unreachable (not on EC2, IMDS disabled, ...).
pub async fn host_identifier() -> String {
    let hostname = local_hostname();

    match fetch_instance_id().await {
        Some(instance_id) => instance_id,
        None => {
            tracing::info!(
                "Could not reach the AWS instance metadata service, using {} as host id",
                hostname
            );
            hostname
        }
    }
}

pub fn local_hostname() -> String {
    System::host_name()
        .map(|name| name.trim().to_string())
        .filter(|name| !name.is_empty())
        .unwrap_or_else(|| UNKNOWN_HOST.to_string())
}

async fn fetch_imds_token(client: &reqwest::Client) -> Option<String> {
    let response = client
        .put(format!("{}/api/token", METADATA_BASE_URL))
        .header("X-aws-ec2-metadata-token-ttl-seconds", METADATA_TOKEN_TTL_SECS)
        .send()
        .await
        .ok()?;

    if !response.status().is_success() {
        return None;
    }

    response.text().await.ok()
}

// IMDSv2 first; instances that still allow IMDSv1 answer without a token.
pub async fn fetch_instance_id() -> Option<String> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(METADATA_TIMEOUT_SECS))
        .connect_timeout(Duration::from_secs(METADATA_TIMEOUT_SECS))
        .build()
        .ok()?;

    let token = fetch_imds_token(&client).await;

    let mut request = client.get(format!("{}/meta-data/instance-id", METADATA_BASE_URL));
    if let Some(token) = &token {
        request = request.header("X-aws-ec2-metadata-token", token);
    }

    let response = request.send().await.ok()?;
    if !response.status().is_success() {
        tracing::debug!(
            "Instance metadata service answered with status {}",
            response.status()
        );
        return None;
    }

    let text = response.text().await.ok()?;
    parse_instance_id(&text)
}

fn parse_instance_id(text: &str) -> Option<String> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .last()
        .map(str::to_string)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_instance_id_takes_last_non_empty_line() {
        assert_eq!(
            parse_instance_id("i-0abc123\n"),
            Some("i-0abc123".to_string())
        );
        assert_eq!(
            parse_instance_id("garbage\ni-0def456\n\n"),
            Some("i-0def456".to_string())
        );
        assert_eq!(parse_instance_id("  \n"), None);
    }

    #[test]
    fn local_hostname_is_never_empty() {
        assert!(!local_hostname().is_empty());
    }
}
