use std::path::PathBuf;

use clap::{Parser, Subcommand};
use serde_json::{Map, Value};

use contact_forms::config::load_config;
use contact_forms::forms::ConfigBuilder;

#[derive(Parser)]
#[command(name = "contact-cli")]
#[command(about = "Inspect and exercise a contact form service", long_about = None)]
struct Cli {
    /// Base URL of a running service.
    #[arg(short, long, default_value = "http://localhost:8080")]
    url: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate a configuration file and report form warnings
    Check {
        config: PathBuf,
    },
    /// List categories and their fields, from a config file or the running service
    Categories {
        config: Option<PathBuf>,
    },
    /// Fetch a CSRF token from the service
    Token,
    /// Submit a form through the JSON API
    Submit {
        #[arg(short, long)]
        category: String,
        /// Field values as key=value
        #[arg(short, long = "field")]
        fields: Vec<String>,
        /// Do not fetch and send a CSRF token
        #[arg(long)]
        no_csrf: bool,
    },
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Check { config } => {
            let config = load_config(&config)?;
            let forms = ConfigBuilder::new().build(&config.forms)?;
            println!(
                "OK: {} categories, {} fields",
                forms.forms.categories.len(),
                forms.forms.field_configs.len()
            );
            for warning in &forms.warnings {
                println!("warning: {}", warning);
            }
        }
        Commands::Categories { config: Some(path) } => {
            let config = load_config(&path)?;
            let forms = ConfigBuilder::new().build(&config.forms)?;
            for (slug, category) in &forms.forms.categories {
                println!("{} ({})", slug, category.label);
                for name in forms.category_to_field_map.get(slug).into_iter().flatten() {
                    let required = forms.field(name).map(|f| f.required).unwrap_or(false);
                    println!("  - {}{}", name, if required { " *" } else { "" });
                }
            }
        }
        Commands::Categories { config: None } => {
            let client = reqwest::Client::new();
            let res = client.get(format!("{}/api/config", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Token => {
            let client = reqwest::Client::new();
            let res = client.get(format!("{}/api/csrf", cli.url)).send().await?;
            print_response(res).await?;
        }
        Commands::Submit {
            category,
            fields,
            no_csrf,
        } => {
            let client = reqwest::Client::new();
            let mut body = Map::new();
            for pair in &fields {
                let (key, value) = pair
                    .split_once('=')
                    .ok_or_else(|| format!("expected key=value, got '{}'", pair))?;
                body.insert(key.to_string(), Value::String(value.to_string()));
            }
            body.insert("category".to_string(), Value::String(category));

            if !no_csrf {
                let token: Value = client
                    .get(format!("{}/api/csrf", cli.url))
                    .send()
                    .await?
                    .error_for_status()?
                    .json()
                    .await?;
                if let Some(token) = token.get("token").cloned() {
                    body.insert("csrf".to_string(), token);
                }
            }

            let res = client
                .post(format!("{}/api/contact", cli.url))
                .json(&body)
                .send()
                .await?;
            print_response(res).await?;
        }
    }

    Ok(())
}

async fn print_response(res: reqwest::Response) -> Result<(), Box<dyn std::error::Error>> {
    let status = res.status();
    if !status.is_success() {
        eprintln!("Error: service returned status {}", status);
    }

    let text = res.text().await?;
    match serde_json::from_str::<Value>(&text) {
        Ok(json) => println!("{}", serde_json::to_string_pretty(&json)?),
        Err(_) => println!("{}", text),
    }
    Ok(())
}
