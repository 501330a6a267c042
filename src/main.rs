//! keyward gateway binary.

use std::path::PathBuf;

use clap::Parser;

#[derive(Parser)]
#[command(name = "keyward", version)]
#[command(about = "Credential-injecting API gateway", long_about = None)]
struct Args {
    /// TOML configuration file
    #[arg(short, long, env = "KEYWARD_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    keyward::lifecycle::startup::run(args.config.as_deref()).await?;
    Ok(())
}
