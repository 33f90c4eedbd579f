//! Collector Provider
//!
//! Command line front end:
//! - `serve`: host one or more providers on an endpoint
//! - `admin`: create, open, close, destroy and list collectors
//! - `client`: talk to one collector through a handle

use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{error, info, Level};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use collector_provider::{
    AdminClient, ApiServer, ApiServerConfig, Client, CollectorId, ProviderConfig, ProviderHandle,
    ProviderSet, ServerConfig, DEFAULT_POOL_SIZE,
};

// =============================================================================
// CLI Arguments
// =============================================================================

/// Collector Provider - Typed remote resources over RPC
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info", global = true)]
    log_level: String,

    /// Output logs as JSON
    #[arg(long, env = "LOG_JSON", global = true)]
    log_json: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Host providers on an endpoint until interrupted
    Serve(ServeArgs),
    /// Administer collectors
    Admin(AdminArgs),
    /// Use a collector
    Client(ClientArgs),
}

#[derive(Args, Debug)]
struct ServeArgs {
    /// Bind address
    #[arg(long, env = "COLLECTOR_ADDR", default_value = "0.0.0.0:8090")]
    addr: String,

    /// Admin token for providers declared on the command line
    #[arg(long, env = "COLLECTOR_TOKEN")]
    token: Option<String>,

    /// Worker pool size for providers declared on the command line
    #[arg(long, env = "COLLECTOR_POOL_SIZE", default_value_t = DEFAULT_POOL_SIZE)]
    pool_size: usize,

    /// Provider id to host (repeatable)
    #[arg(long = "provider-id")]
    provider_ids: Vec<u16>,

    /// Provider configuration file (JSON or YAML)
    #[arg(long, env = "COLLECTOR_CONFIG")]
    config: Option<PathBuf>,
}

#[derive(Args, Debug)]
struct Target {
    /// Endpoint address, `host:port` or URL
    #[arg(long, env = "COLLECTOR_ENDPOINT", default_value = "127.0.0.1:8090")]
    address: String,

    /// Provider id on the endpoint
    #[arg(long, default_value_t = 0)]
    provider_id: u16,
}

impl Target {
    fn handle(&self) -> ProviderHandle {
        ProviderHandle::new(&self.address, self.provider_id)
    }
}

#[derive(Args, Debug)]
struct AdminArgs {
    #[command(flatten)]
    target: Target,

    /// Admin token
    #[arg(long, env = "COLLECTOR_TOKEN")]
    token: Option<String>,

    #[command(subcommand)]
    action: AdminAction,
}

#[derive(Subcommand, Debug)]
enum AdminAction {
    /// Create a collector and print its id
    Create {
        #[arg(long = "type", default_value = "dummy")]
        backend: String,
        #[arg(long)]
        config: Option<String>,
    },
    /// Open a collector on existing state and print its id
    Open {
        #[arg(long = "type", default_value = "dummy")]
        backend: String,
        #[arg(long)]
        config: Option<String>,
    },
    /// Close a collector
    Close { id: CollectorId },
    /// Destroy a collector
    Destroy { id: CollectorId },
    /// List collector ids
    List {
        #[arg(long, default_value_t = 64)]
        max: usize,
    },
}

#[derive(Args, Debug)]
struct ClientArgs {
    #[command(flatten)]
    target: Target,

    /// Collector id
    id: CollectorId,

    #[command(subcommand)]
    action: ClientAction,
}

#[derive(Subcommand, Debug)]
enum ClientAction {
    /// Ask the collector to greet
    Hello,
    /// Compute x + y remotely
    Sum {
        #[arg(allow_negative_numbers = true)]
        x: i32,
        #[arg(allow_negative_numbers = true)]
        y: i32,
    },
    /// Run a backend-specific operation
    Invoke {
        operation: String,
        /// Arguments as JSON
        #[arg(default_value = "null")]
        args: String,
    },
}

// =============================================================================
// Main
// =============================================================================

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Initialize logging
    init_logging(&cli.log_level, cli.log_json)?;

    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Admin(args) => admin(args).await,
        Command::Client(args) => client(args).await,
    }
}

// =============================================================================
// Serve
// =============================================================================

async fn serve(args: ServeArgs) -> anyhow::Result<()> {
    let mut config = match &args.config {
        Some(path) => ServerConfig::from_file(path)
            .with_context(|| format!("loading {}", path.display()))?,
        None => ServerConfig::default(),
    };
    for provider_id in &args.provider_ids {
        config.providers.push(ProviderConfig {
            provider_id: *provider_id,
            token: args.token.clone(),
            pool_size: args.pool_size,
        });
    }
    if config.providers.is_empty() {
        config.providers.push(ProviderConfig {
            token: args.token.clone(),
            pool_size: args.pool_size,
            ..Default::default()
        });
    }
    config.validate()?;

    let addr: SocketAddr = args
        .addr
        .parse()
        .with_context(|| format!("invalid bind address {}", args.addr))?;

    info!("Starting Collector Provider");
    info!("  Version: {}", collector_provider::VERSION);
    info!("  Address: {}", addr);

    let providers = ProviderSet::from_configs(&config.providers)?;
    let server = Arc::new(ApiServer::new(
        ApiServerConfig {
            addr,
            ..Default::default()
        },
        providers,
    ));

    let signal_server = server.clone();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("Interrupt received");
                signal_server.shutdown();
            }
            Err(e) => error!("Failed to listen for interrupt: {}", e),
        }
    });

    server.run().await?;
    info!("Collector provider shutdown complete");
    Ok(())
}

// =============================================================================
// Admin
// =============================================================================

async fn admin(args: AdminArgs) -> anyhow::Result<()> {
    let provider = args.target.handle();
    let token = args.token.as_deref();
    let admin = AdminClient::new()?;

    match args.action {
        AdminAction::Create { backend, config } => {
            let id = admin
                .create_collector(&provider, token, &backend, config.as_deref())
                .await?;
            println!("{}", id);
        }
        AdminAction::Open { backend, config } => {
            let id = admin
                .open_collector(&provider, token, &backend, config.as_deref())
                .await?;
            println!("{}", id);
        }
        AdminAction::Close { id } => admin.close_collector(&provider, token, id).await?,
        AdminAction::Destroy { id } => admin.destroy_collector(&provider, token, id).await?,
        AdminAction::List { max } => {
            for id in admin.list_collectors(&provider, token, max).await? {
                println!("{}", id);
            }
        }
    }
    Ok(())
}

// =============================================================================
// Client
// =============================================================================

async fn client(args: ClientArgs) -> anyhow::Result<()> {
    let provider = args.target.handle();
    let client = Client::new()?;
    let handle = client.collector_handle(&provider, args.id);

    let outcome = match args.action {
        ClientAction::Hello => handle.say_hello().await.map_err(anyhow::Error::from),
        ClientAction::Sum { x, y } => handle
            .compute_sum(x, y)
            .await
            .map(|result| println!("{}", result))
            .map_err(anyhow::Error::from),
        ClientAction::Invoke { operation, args } => {
            match serde_json::from_str(&args).context("invoke arguments must be JSON") {
                Ok(args) => handle
                    .invoke(&operation, args)
                    .await
                    .map(|result| println!("{}", result))
                    .map_err(anyhow::Error::from),
                Err(e) => Err(e),
            }
        }
    };

    handle.release()?;
    client.finalize();
    outcome
}

// =============================================================================
// Logging Setup
// =============================================================================

fn init_logging(log_level: &str, log_json: bool) -> anyhow::Result<()> {
    let level = match log_level.to_lowercase().as_str() {
        "trace" => Level::TRACE,
        "debug" => Level::DEBUG,
        "info" => Level::INFO,
        "warn" => Level::WARN,
        "error" => Level::ERROR,
        _ => Level::INFO,
    };

    let filter = EnvFilter::from_default_env()
        .add_directive(level.into())
        .add_directive("hyper=warn".parse()?)
        .add_directive("reqwest=warn".parse()?)
        .add_directive("tower=warn".parse()?)
        .add_directive("axum=info".parse()?);

    if log_json {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_target(true).with_writer(std::io::stderr))
            .init();
    }
    Ok(())
}
