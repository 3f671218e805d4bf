use std::time::Duration;

use anyhow::{bail, Context};
use serde_json::Value;

use crate::cli::utils::{output_error, output_success};
use crate::cli::OutputFormat;

pub async fn handle(url: &str, output_format: OutputFormat) -> anyhow::Result<()> {
    let base = url::Url::parse(url).with_context(|| format!("invalid server URL {}", url))?;
    let health = base.join("/health")?;

    let client = reqwest::Client::builder().timeout(Duration::from_secs(5)).build()?;
    let response = client
        .get(health.clone())
        .send()
        .await
        .with_context(|| format!("failed to reach {}", health))?;

    let status = response.status();
    let body: Value = response.json().await.unwrap_or(Value::Null);
    if !status.is_success() {
        output_error(&output_format, &format!("{} answered {}", health, status), Some("UNHEALTHY"))?;
        bail!("server unhealthy");
    }
    output_success(&output_format, &format!("{} is healthy", base), body.get("data").cloned())
}
