use clap::Subcommand;
use serde_json::Value;

use crate::cli::utils::output_value;
use crate::cli::OutputFormat;

const DEFAULT_URL: &str = "http://localhost:3000";

#[derive(Subcommand)]
pub enum ServerCommands {
    #[command(about = "Check server health status from the /health endpoint")]
    Health {
        #[arg(long, default_value = DEFAULT_URL, help = "Server base URL")]
        url: String,
    },

    #[command(about = "Show server information from the API root endpoint")]
    Info {
        #[arg(long, default_value = DEFAULT_URL, help = "Server base URL")]
        url: String,
    },
}

pub async fn handle(cmd: ServerCommands, output_format: OutputFormat) -> anyhow::Result<()> {
    let (url, path) = match cmd {
        ServerCommands::Health { url } => (url, "/health"),
        ServerCommands::Info { url } => (url, "/"),
    };

    let body = fetch(&url, path).await?;
    output_value(&output_format, &body)
}

async fn fetch(base: &str, path: &str) -> anyhow::Result<Value> {
    let url = endpoint(base, path)?;
    let response = reqwest::get(url.clone()).await?;
    let status = response.status();
    let body: Value = response.json().await?;

    if !status.is_success() {
        let message = body.get("message").and_then(Value::as_str).unwrap_or("no message");
        anyhow::bail!("{} returned {}: {}", url, status, message);
    }
    Ok(body)
}

fn endpoint(base: &str, path: &str) -> anyhow::Result<url::Url> {
    let base = url::Url::parse(base)?;
    Ok(base.join(path)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_joins_paths() {
        assert_eq!(endpoint("http://localhost:3000", "/health").unwrap().as_str(), "http://localhost:3000/health");
        assert_eq!(endpoint("http://gw:8080/", "/").unwrap().as_str(), "http://gw:8080/");
        assert!(endpoint("not a url", "/health").is_err());
    }
}
