use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION};
use serde_json::Value;

use warden::config::load_config;
use warden::lifecycle::build_core;
use warden::rules::provider::{parser, FileProvider, Format};
use warden::rules::RuleFactory;

#[derive(Parser)]
#[command(name = "warden-cli")]
#[command(about = "Management CLI for the Warden decision engine", long_about = None)]
struct Cli {
    #[arg(short, long, default_value = "http://localhost:4457")]
    url: String,

    #[arg(short, long, env = "WARDEN_ADMIN_KEY", default_value = "")]
    key: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Check system status
    Status,
    /// List active rules in match order
    Rules,
    /// Show reconciliation status per provider
    Providers,
    /// Validate rule files offline against a configuration
    Validate {
        #[arg(short, long, default_value = "warden.toml")]
        config: PathBuf,

        #[arg(required = true)]
        files: Vec<PathBuf>,
    },
}

#[tokio::main]
async fn main() -> Result<ExitCode, Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let path = match cli.command {
        Commands::Status => "status",
        Commands::Rules => "rules",
        Commands::Providers => "providers",
        Commands::Validate { config, files } => return validate(&config, &files),
    };

    let mut headers = HeaderMap::new();
    headers.insert(
        AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", cli.key))?,
    );

    let res = reqwest::Client::new()
        .get(format!("{}/admin/{}", cli.url.trim_end_matches('/'), path))
        .headers(headers)
        .send()
        .await?;
    print_response(res).await
}

async fn print_response(res: reqwest::Response) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: Admin API returned status {}", status);
        if let Ok(text) = res.text().await {
            eprintln!("Response: {}", text);
        }
        return Ok(ExitCode::FAILURE);
    }

    let json: Value = res.json().await?;
    println!("{}", serde_json::to_string_pretty(&json)?);
    Ok(ExitCode::SUCCESS)
}

fn validate(config: &PathBuf, files: &[PathBuf]) -> Result<ExitCode, Box<dyn std::error::Error>> {
    let config = load_config(config)?;
    let core = build_core(&config)?;
    let factory = RuleFactory::new(core.prototypes);

    let mut failed = false;
    for file in files {
        let format = Format::from_path(file)
            .ok_or_else(|| format!("{} is not a rule-set file", file.display()))?;
        let content = std::fs::read_to_string(file)?;
        let document = match parser::parse(format, &content) {
            Ok(document) => document,
            Err(e) => {
                println!("{}: {}", file.display(), e);
                failed = true;
                continue;
            }
        };

        let provider = FileProvider::provider_name(file);
        let version = document.version.as_deref().unwrap_or("unversioned");
        match factory.create_rule_set(&provider, version, &document.rules) {
            Ok(set) => println!("{}: ok ({} rules)", file.display(), set.len()),
            Err(errors) => {
                failed = true;
                println!("{}: {} error(s)", file.display(), errors.len());
                for error in errors {
                    println!("  - {}", error);
                }
            }
        }
    }

    Ok(if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}
