use std::{fs, path::PathBuf};

use anyhow::{Context, Result};
use clap::Parser;
use milk_ledger::openapi::ApiDocV1;
use utoipa::OpenApi;

#[derive(Parser)]
#[command(name = "openapi-export", about = "Write the ledger OpenAPI document to disk")]
struct Cli {
    #[arg(long, default_value = "openapi", help = "Directory to write into")]
    out_dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let json = ApiDocV1::openapi()
        .to_pretty_json()
        .context("failed to serialize OpenAPI document")?;

    fs::create_dir_all(&cli.out_dir)
        .with_context(|| format!("failed to create {}", cli.out_dir.display()))?;

    let output_path = cli.out_dir.join("milk-ledger.v1.json");
    fs::write(&output_path, json)
        .with_context(|| format!("failed to write {}", output_path.display()))?;

    println!("OpenAPI document written to {}", output_path.display());
    Ok(())
}
