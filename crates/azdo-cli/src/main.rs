//! azdo CLI - Azure DevOps MCP server and its configuration.

use std::io::{self, BufRead, Write};
use std::sync::Arc;

use anyhow::Context;
use azdo_api::AzureDevOpsClient;
use azdo_core::config::organization_name;
use azdo_core::{Config, DevOpsClient, Settings, User};
use azdo_mcp::{serve_http, McpServer, ToolHandler, ToolRegistry};
use azdo_storage::{delete_token, load_token, save_token, KeychainStore};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "azdo")]
#[command(author, version, about = "Azure DevOps tools for AI assistants over MCP", long_about = None)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Start the MCP server (stdio by default)
    Serve {
        /// Serve the HTTP binding instead of stdio
        #[arg(long)]
        http: bool,

        /// HTTP port (overrides MCP_HTTP_PORT and server.http_port)
        #[arg(short, long)]
        port: Option<u16>,
    },

    /// Verify the organization URL and token
    Check,

    /// List the tools the server exposes
    Tools,

    /// Manage the configuration file
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },

    /// Manage the stored personal access token
    Auth {
        #[command(subcommand)]
        command: AuthCommands,
    },
}

#[derive(Subcommand)]
enum ConfigCommands {
    /// Show current configuration
    Show,

    /// Set a value, e.g. `azure_devops.default_project Fabrikam`
    Set { key: String, value: String },

    /// Print a value
    Get { key: String },

    /// Print the config file location
    Path,
}

#[derive(Subcommand)]
enum AuthCommands {
    /// Store a token in the OS keychain (read from stdin when omitted)
    Login {
        #[arg(long)]
        token: Option<String>,
    },

    /// Remove the stored token
    Logout,

    /// Show where the token comes from
    Status,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // stdout belongs to the stdio transport
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    match cli.command {
        Some(Commands::Serve { http, port }) => serve(http, port).await,
        Some(Commands::Check) => check().await,
        Some(Commands::Tools) => list_tools(),
        Some(Commands::Config { command }) => handle_config(command),
        Some(Commands::Auth { command }) => handle_auth(command),
        None => {
            println!("azdo - Azure DevOps tools for AI assistants");
            println!("Run with --help for usage information");
            Ok(())
        }
    }
}

fn env_var(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn load_settings() -> anyhow::Result<Settings> {
    let config = Config::load()?;
    let store = KeychainStore::new();
    let settings = config.resolve(env_var, |org| load_token(&store, org))?;
    Ok(settings)
}

async fn connect(settings: &Settings) -> anyhow::Result<(Arc<AzureDevOpsClient>, User)> {
    let client = AzureDevOpsClient::new(
        settings.org_url.as_str(),
        settings.pat.as_str(),
        settings.default_project.clone(),
    )?;
    let user = client
        .validate_connection()
        .await
        .with_context(|| format!("Cannot connect to {}", settings.org_url))?;
    tracing::info!(
        org = %settings.org_url,
        user = %user.display_name,
        "Connected to Azure DevOps"
    );
    Ok((Arc::new(client), user))
}

async fn serve(http: bool, port: Option<u16>) -> anyhow::Result<()> {
    let settings = load_settings()?;
    let (client, _) = connect(&settings).await?;

    let registry = Arc::new(ToolRegistry::new()?);
    let handler = Arc::new(ToolHandler::new(client, registry));
    let server = Arc::new(McpServer::new(handler));

    if http {
        let port = port.unwrap_or(settings.http_port);
        serve_http(server, port, settings.session_timeout).await?;
    } else {
        server.run_stdio().await?;
    }
    Ok(())
}

async fn check() -> anyhow::Result<()> {
    let settings = load_settings()?;
    let (_, user) = connect(&settings).await?;

    println!("Organization: {}", settings.org_url);
    println!("User:         {}", user.display_name);
    match &settings.default_project {
        Some(project) => println!("Project:      {}", project),
        None => println!("Project:      (none; tools need an explicit `project`)"),
    }
    Ok(())
}

fn list_tools() -> anyhow::Result<()> {
    let registry = ToolRegistry::new()?;
    for tool in registry.tools() {
        let domain = registry
            .domain_of(&tool.name)
            .map(|d| d.as_str())
            .unwrap_or("-");
        println!("{:<12} {:<30} {}", domain, tool.name, tool.description);
    }
    println!("\n{} tools", registry.len());
    Ok(())
}

fn handle_config(command: ConfigCommands) -> anyhow::Result<()> {
    match command {
        ConfigCommands::Show => {
            let config = Config::load()?;
            let org_url = config.org_url(&env_var);
            println!("Config file:     {}", Config::config_path()?.display());
            println!(
                "Organization:    {}",
                org_url.as_deref().unwrap_or("(not set)")
            );
            let project = env_var("AZURE_DEVOPS_DEFAULT_PROJECT").or_else(|| {
                config
                    .azure_devops
                    .as_ref()
                    .and_then(|c| c.default_project.clone())
            });
            println!(
                "Default project: {}",
                project.as_deref().unwrap_or("(not set)")
            );
            if let Some(server) = &config.server {
                if let Some(port) = server.http_port {
                    println!("HTTP port:       {}", port);
                }
                if let Some(secs) = server.session_timeout_secs {
                    println!("Session timeout: {}s", secs);
                }
            }
        }
        ConfigCommands::Set { key, value } => {
            let mut config = Config::load()?;
            config.set(&key, &value)?;
            config.save()?;
            println!("Set {} = {}", key, value);
        }
        ConfigCommands::Get { key } => match Config::load()?.get(&key)? {
            Some(value) => println!("{}", value),
            None => println!("(not set)"),
        },
        ConfigCommands::Path => println!("{}", Config::config_path()?.display()),
    }
    Ok(())
}

fn current_organization() -> anyhow::Result<String> {
    let config = Config::load()?;
    let org_url = config
        .org_url(&env_var)
        .context("Organization URL is not configured: run `azdo config set azure_devops.org_url <url>`")?;
    organization_name(&org_url)
        .with_context(|| format!("Cannot derive organization name from {}", org_url))
}

fn handle_auth(command: AuthCommands) -> anyhow::Result<()> {
    let store = KeychainStore::new();
    match command {
        AuthCommands::Login { token } => {
            let org = current_organization()?;
            let token = match token {
                Some(token) => token,
                None => read_token()?,
            };
            save_token(&store, &org, &token)?;
            println!("Token stored for organization {}", org);
        }
        AuthCommands::Logout => {
            let org = current_organization()?;
            delete_token(&store, &org)?;
            println!("Token removed for organization {}", org);
        }
        AuthCommands::Status => {
            if env_var("AZURE_DEVOPS_PAT").is_some_and(|t| !t.trim().is_empty()) {
                println!("Token: from AZURE_DEVOPS_PAT");
                return Ok(());
            }
            let org = current_organization()?;
            match load_token(&store, &org)? {
                Some(_) => println!("Token: stored in keychain for {}", org),
                None => println!("Token: not configured for {}", org),
            }
        }
    }
    Ok(())
}

fn read_token() -> anyhow::Result<String> {
    eprint!("Personal access token: ");
    io::stderr().flush()?;
    let mut line = String::new();
    io::stdin().lock().read_line(&mut line)?;
    Ok(line.trim().to_string())
}
