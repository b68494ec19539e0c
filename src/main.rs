use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info};

use fincheck::{chat, constants, web_server, PlanProxy, ProxyClient, ProxyConfig, Script};

// Define the command-line interface structure using clap
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Subcommand, Debug)]
enum Commands {
    /// Run the plan proxy and the web chat UI. The only process that holds the API key.
    Serve {
        #[arg(long, env = "FINCHECK_PORT", default_value_t = constants::DEFAULT_PORT, help = "Port for the web server.")]
        port: u16,
        #[arg(long, env = "GEMINI_API_KEY", hide_env_values = true, help = "Gemini API key.")]
        api_key: Option<String>,
        #[arg(long, env = "GEMINI_MODEL", help = "Gemini model used to write the plan.")]
        model: Option<String>,
        #[arg(long, env = "GEMINI_BASE_URL", help = "Base URL of the Gemini API.")]
        gemini_url: Option<String>,
    },
    /// Answer the questionnaire in the terminal and fetch the plan from a running server.
    Chat {
        #[arg(long, env = "FINCHECK_SERVER_URL", help = "URL of a running `fincheck serve`.")]
        server: Option<String>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (for GEMINI_API_KEY and friends)
    dotenvy::dotenv().ok();

    // Reads log level from RUST_LOG (e.g., RUST_LOG=info,fincheck=debug).
    // Logs go to stderr so the chat transcript owns stdout.
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Serve {
            port,
            api_key,
            model,
            gemini_url,
        } => {
            let defaults = ProxyConfig::default();
            let config = ProxyConfig {
                api_key,
                base_url: gemini_url.unwrap_or(defaults.base_url),
                model: model.unwrap_or(defaults.model),
            };
            info!(?config, "Starting fincheck server on port {}...", port);

            let proxy = Arc::new(PlanProxy::new(config));
            let state = web_server::AppState::new(Script::financial_profile(), proxy)?;

            tokio::select! {
                res = web_server::start_web_server(port, state) => {
                    if let Err(e) = &res {
                        error!("Web server failed: {:?}", e);
                    }
                    res?;
                }
                _ = tokio::signal::ctrl_c() => {
                    info!("Ctrl-C received, shutting down.");
                }
            }
        }
        Commands::Chat { server } => {
            let server = server.unwrap_or_else(|| constants::SERVER_URL.clone());
            info!(%server, "Using plan server");
            let client = ProxyClient::new(&server);

            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            chat::run_chat(Script::financial_profile(), &client, stdin, std::io::stdout())
                .await
                .context("Chat session failed")?;
        }
    }

    Ok(())
}
