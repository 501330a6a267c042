use std::process::ExitCode;

use clap::{Parser, Subcommand};
use serde_json::{json, Map, Value};

#[derive(Parser)]
#[command(name = "keyward-cli")]
#[command(about = "Diagnostic client for a running keyward gateway", long_about = None)]
struct Cli {
    #[arg(short, long, env = "KEYWARD_URL", default_value = "http://localhost:3000")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check gateway health
    Health,
    /// List configured services
    Services,
    /// Proxy one request through the gateway
    Call {
        /// Service name (e.g. openai)
        service: String,
        /// Upstream endpoint, relative to the service base URL
        endpoint: String,
        #[arg(short, long, default_value = "GET")]
        method: String,
        /// Query parameter as key=value; repeatable
        #[arg(short, long = "param", value_parser = parse_param)]
        params: Vec<(String, String)>,
        /// JSON request body
        #[arg(short, long)]
        body: Option<String>,
    },
}

fn parse_param(raw: &str) -> Result<(String, String), String> {
    raw.split_once('=')
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .ok_or_else(|| format!("expected key=value, got `{raw}`"))
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let client = reqwest::Client::new();
    let base = cli.url.trim_end_matches('/');

    let res = match cli.command {
        Commands::Health => client.get(format!("{base}/health")).send().await?,
        Commands::Services => client.get(format!("{base}/api/proxy/services")).send().await?,
        Commands::Call {
            service,
            endpoint,
            method,
            params,
            body,
        } => {
            let mut payload = json!({ "endpoint": endpoint, "method": method.to_uppercase() });
            if !params.is_empty() {
                let params: Map<String, Value> =
                    params.into_iter().map(|(k, v)| (k, Value::String(v))).collect();
                payload["params"] = Value::Object(params);
            }
            if let Some(body) = body {
                payload["body"] = serde_json::from_str(&body)?;
            }
            client
                .post(format!("{base}/api/proxy/{service}"))
                .json(&payload)
                .send()
                .await?
        }
    };

    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    let text = res.text().await?;
    let rendered = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|json| serde_json::to_string_pretty(&json).ok())
        .unwrap_or(text);

    if !status.is_success() {
        eprintln!("Error: gateway returned status {}", status);
        eprintln!("{}", rendered);
        return Ok(ExitCode::FAILURE);
    }

    println!("{}", rendered);
    Ok(ExitCode::SUCCESS)
}
