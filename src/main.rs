//! `sitedeploy` command line
//!
//! Without a subcommand the binary runs the MCP server on stdio. stdout is
//! reserved for protocol traffic and command output; logs go to stderr.

use anyhow::Context;
use clap::{Parser, Subcommand};
use std::collections::HashMap;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

use sitedeploy_mcp::auth::AuthorizationFlow;
use sitedeploy_mcp::mcp::{DeployServer, ServiceExt, stdio};
use sitedeploy_mcp::{AgentConfig, DeployRequest, McpClientConfig, WebsiteClient};

const LOG_ENV: &str = "SITEDEPLOY_LOG";
const FORWARDED_ENV: &[&str] = &[
    "SITEDEPLOY_API_URL",
    "SITEDEPLOY_AUTH_URL",
    "SITEDEPLOY_CREDENTIALS",
];

#[derive(Parser)]
#[command(
    name = "sitedeploy",
    version,
    about = "Deploy static websites from the terminal or an AI assistant"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the MCP server on stdio (default)
    Serve,
    /// Sign in through the browser
    Login,
    /// Remove stored credentials
    Logout,
    /// Show whether you are signed in
    Status,
    /// List your websites
    List,
    /// Deploy a directory, .zip file, or https URL of a .zip file
    Deploy {
        /// Directory, .zip path, or https URL
        path: String,
        /// Display name for the website
        #[arg(long)]
        name: Option<String>,
        /// Existing website to update
        #[arg(long = "id")]
        website_id: Option<String>,
    },
    /// Show one website
    Get {
        /// Website identifier
        website_id: String,
    },
    /// Delete a website
    Delete {
        /// Website identifier
        website_id: String,
    },
    /// Sign in if needed and check that the backend answers
    Test,
    /// Print the MCP client configuration for this binary
    Config {
        /// Write to a file instead of stdout
        #[arg(long, short)]
        output: Option<PathBuf>,
    },
    /// Remove stored credentials
    Clean {
        /// Also remove the sitedeploy config directory
        #[arg(long)]
        all: bool,
    },
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();
    let cli = Cli::parse();

    match run(cli.command.unwrap_or(Command::Serve)).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error: {e}");
            ExitCode::FAILURE
        }
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

async fn run(command: Command) -> anyhow::Result<()> {
    let config = AgentConfig::from_env()?;

    match command {
        Command::Serve => serve(config).await,
        Command::Login => login(config).await,
        Command::Logout => {
            config.credential_store().clear()?;
            println!("Signed out.");
            Ok(())
        }
        Command::Status => status(&config),
        Command::List => {
            let client = WebsiteClient::from_config(config)?;
            println!("{}", client.list_websites().await?);
            Ok(())
        }
        Command::Deploy {
            path,
            name,
            website_id,
        } => {
            let client = WebsiteClient::from_config(config)?;
            let request = DeployRequest {
                zip_file: path,
                website_id,
                name,
            };
            println!("{}", client.deploy(&request).await?);
            Ok(())
        }
        Command::Get { website_id } => {
            let client = WebsiteClient::from_config(config)?;
            println!("{}", client.get_website(&website_id).await?);
            Ok(())
        }
        Command::Delete { website_id } => {
            let client = WebsiteClient::from_config(config)?;
            println!("{}", client.delete_website(&website_id).await?);
            Ok(())
        }
        Command::Test => {
            let client = WebsiteClient::from_config(config)?;
            client.dispatcher().ensure_authenticated().await?;
            let list = client.list_websites().await?;
            println!(
                "Connection OK: signed in, {} website(s) found.",
                list.websites.len()
            );
            Ok(())
        }
        Command::Config { output } => print_client_config(output),
        Command::Clean { all } => {
            let store = config.credential_store();
            if all {
                store.remove_all()?;
                println!("Removed credentials and the sitedeploy config directory.");
            } else {
                store.clear()?;
                println!("Removed credentials.");
            }
            Ok(())
        }
    }
}

async fn serve(config: AgentConfig) -> anyhow::Result<()> {
    let client = WebsiteClient::from_config(config)?;
    tracing::info!(version = sitedeploy_mcp::VERSION, "starting MCP server on stdio");

    let service = DeployServer::new(client)
        .serve(stdio())
        .await
        .context("failed to start MCP server")?;
    service.waiting().await?;
    Ok(())
}

async fn login(config: AgentConfig) -> anyhow::Result<()> {
    let flow = AuthorizationFlow::new(config);
    let record = flow.authorize().await?;

    println!("Signed in.");
    if !record.user_id.is_empty() {
        println!("  User: {}", record.user_id);
    }
    if let Some(expires) = record.expires_at_utc() {
        println!("  Expires: {}", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    Ok(())
}

fn status(config: &AgentConfig) -> anyhow::Result<()> {
    let store = config.credential_store();
    let record = match store.load() {
        Ok(Some(record)) => record,
        Ok(None) => {
            println!("Not signed in. Run `sitedeploy login`.");
            return Ok(());
        }
        Err(e) => {
            println!("Stored credentials are unreadable ({e}). Run `sitedeploy login`.");
            return Ok(());
        }
    };

    if record.is_expired() {
        println!("Credentials expired. Run `sitedeploy login`.");
        return Ok(());
    }

    println!("Signed in.");
    if !record.user_id.is_empty() {
        println!("  User: {}", record.user_id);
    }
    if let Some(expires) = record.expires_at_utc() {
        println!("  Expires: {}", expires.format("%Y-%m-%d %H:%M UTC"));
    }
    if let Some(remaining) = record.remaining_validity() {
        println!("  Remaining: {} day(s)", remaining.as_secs() / 86_400);
    }
    println!("  Scopes: {}", record.scopes.join(", "));
    println!("  Credential file: {}", store.path().display());
    if record.needs_renewal_soon() {
        println!("Credentials expire soon. Run `sitedeploy login` to renew.");
    }
    Ok(())
}

fn print_client_config(output: Option<PathBuf>) -> anyhow::Result<()> {
    let executable = std::env::current_exe().context("cannot locate the sitedeploy binary")?;
    let env: HashMap<String, String> = FORWARDED_ENV
        .iter()
        .filter_map(|name| std::env::var(name).ok().map(|v| ((*name).to_string(), v)))
        .collect();

    let json = serde_json::to_string_pretty(&McpClientConfig::for_executable(&executable, env))?;
    match output {
        Some(path) => {
            std::fs::write(&path, format!("{json}\n"))
                .with_context(|| format!("cannot write {}", path.display()))?;
            eprintln!("Wrote MCP client configuration to {}", path.display());
        }
        None => println!("{json}"),
    }
    Ok(())
}
