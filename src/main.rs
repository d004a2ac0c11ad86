use std::process::ExitCode;
use std::sync::Arc;

use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use atende_gateway::api::{ApiServer, ApiState};
use atende_gateway::assistant::{CompletionClient, SpeechTranscriber};
use atende_gateway::db::{self, ConversationRepo, TenantRepo};
use atende_gateway::provider::ProviderClient;
use atende_gateway::Config;

/// Atende - WhatsApp AI assistant relay for salon management platforms
#[derive(Parser)]
#[command(name = "atende", version, about)]
struct Cli {
    /// Port to listen on
    #[arg(long, env = "ATENDE_PORT", default_value = "8081")]
    port: u16,

    /// Path to the SQLite database
    #[arg(long, env = "ATENDE_DB", default_value = "atende.db")]
    database: String,

    /// Increase verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Register an establishment and its assistant settings
    AddTenant {
        /// Establishment display name
        #[arg(short, long)]
        name: String,
        /// Instance credential used by the provider webhook path
        #[arg(short, long)]
        instance: String,
        /// LLM API key for this establishment
        #[arg(short, long)]
        api_key: String,
        /// Custom welcome message (defaults to a standard greeting)
        #[arg(short, long)]
        welcome: Option<String>,
        /// Free-form establishment description given to the assistant
        #[arg(short, long)]
        description: Option<String>,
    },
    /// List registered establishments
    ListTenants,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Set up logging based on verbosity
    let filter = match cli.verbose {
        0 => "info,atende_gateway=info",
        1 => "info,atende_gateway=debug",
        2 => "debug",
        _ => "trace",
    };

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(filter))
        .init();

    match run(cli).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            tracing::error!("fatal: {e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(cli: Cli) -> anyhow::Result<()> {
    let pool = db::init(&cli.database)?;

    // Handle subcommands
    if let Some(cmd) = cli.command {
        return match cmd {
            Command::AddTenant {
                name,
                instance,
                api_key,
                welcome,
                description,
            } => add_tenant(
                &pool,
                &name,
                &instance,
                &api_key,
                welcome.as_deref(),
                description.as_deref(),
            ),
            Command::ListTenants => list_tenants(&pool),
        };
    }

    let config = Config::load()?;
    tracing::debug!(?config, "loaded configuration");

    let provider = ProviderClient::new(
        &config.provider_url,
        &config.provider_api_key,
        config.provider_timeout,
        config.send_delay_ms,
    )?;
    let transcriber = SpeechTranscriber::new(
        provider.clone(),
        &config.llm_url,
        &config.stt_model,
        &config.stt_language,
        config.llm_timeout,
    )?;
    let responder = CompletionClient::new(
        &config.llm_url,
        &config.chat_model,
        config.temperature,
        config.max_tokens,
        config.llm_timeout,
    )?;

    let state = Arc::new(ApiState {
        tenants: Arc::new(TenantRepo::new(pool.clone())),
        conversations: Arc::new(ConversationRepo::new(pool)),
        messenger: Arc::new(provider),
        transcriber: Arc::new(transcriber),
        responder: Arc::new(responder),
        history_limit: config.history_limit,
    });

    tracing::info!(port = cli.port, "starting atende gateway");
    ApiServer::new(state, cli.port).run().await?;

    Ok(())
}

/// Register an establishment with its assistant settings
fn add_tenant(
    pool: &atende_gateway::DbPool,
    name: &str,
    instance: &str,
    api_key: &str,
    welcome: Option<&str>,
    description: Option<&str>,
) -> anyhow::Result<()> {
    let repo = TenantRepo::new(pool.clone());
    let id = repo.create(name, instance, api_key, welcome, description)?;
    println!("Registered {name} ({id}) for instance {instance}");
    Ok(())
}

/// List registered establishments
fn list_tenants(pool: &atende_gateway::DbPool) -> anyhow::Result<()> {
    let repo = TenantRepo::new(pool.clone());
    let tenants = repo.list()?;

    if tenants.is_empty() {
        println!("No establishments registered");
        return Ok(());
    }

    for tenant in tenants {
        let status = if tenant.active { "active" } else { "inactive" };
        println!(
            "{}  {}  instance={}  [{status}]",
            tenant.id, tenant.name, tenant.instance_token
        );
    }

    Ok(())
}
