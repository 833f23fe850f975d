// crates/metric-gate-cli/src/main.rs
// ============================================================================
// Module: Metric Gate CLI Entry Point
// Description: Command dispatcher for the Domain MCP server binary.
// Purpose: Assemble configuration, adapters, plugins, and resources, then
//          serve the HTTP surface until interrupted.
// Dependencies: clap, metric-gate-adapters, metric-gate-config,
//               metric-gate-server, tokio, tracing-subscriber
// ============================================================================

//! ## Overview
//! The binary exposes two commands: `serve` (the Domain MCP server) and
//! `tools` (print the tool definitions as JSON for client integration).
//! Startup order: environment settings, tracing, JSON config, adapter
//! construction by source type, plugin registration with configuration
//! filtering, resource loading, then the axum serve loop. SIGINT sets the
//! shutdown path and the process exits with status 130.

// ============================================================================
// SECTION: Modules
// ============================================================================


// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::net::IpAddr;
use std::net::SocketAddr;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use clap::Subcommand;
use metric_gate_adapters::AdapterRegistry;
use metric_gate_adapters::ElasticsearchAdapter;
use metric_gate_adapters::HorreumHttpAdapter;
use metric_gate_adapters::HorreumHttpConfig;
use metric_gate_adapters::StdioBridgeAdapter;
use metric_gate_adapters::StdioProcessTransport;
use metric_gate_adapters::StdioTransportConfig;
use metric_gate_config::AppConfig;
use metric_gate_config::EnvSettings;
use metric_gate_config::SourceConfig;
use metric_gate_config::SourceKind;
use metric_gate_plugins::PluginRegistry;
use metric_gate_server::AppState;
use metric_gate_server::GeminiClient;
use metric_gate_server::RateLimitConfig;
use metric_gate_server::RateLimiter;
use metric_gate_server::ResourceRegistry;
use metric_gate_server::ToolRouter;
use metric_gate_server::build_router;
use metric_gate_server::correlation::CorrelationIdGenerator;
use metric_gate_server::llm::LlmClient;
use metric_gate_server::orchestrator::Orchestrator;
use metric_gate_server::telemetry::TracingMetricsSink;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit status used after an interrupt-driven shutdown.
const SIGINT_EXIT_CODE: u8 = 130;

/// Environment variable naming the JSON configuration file.
const CONFIG_ENV_VAR: &str = "DOMAIN_MCP_CONFIG";

// ============================================================================
// SECTION: Command Line
// ============================================================================

/// Metric Gate: a Domain MCP server for performance data.
#[derive(Debug, Parser)]
#[command(name = "metric-gate", version, about)]
struct Cli {
    /// Command to run.
    #[command(subcommand)]
    command: Command,
}

/// Top-level commands.
#[derive(Debug, Subcommand)]
enum Command {
    /// Run the Domain MCP server.
    Serve {
        /// Bind address.
        #[arg(long, default_value = "127.0.0.1")]
        host: IpAddr,
        /// Bind port.
        #[arg(long, default_value_t = 8080)]
        port: u16,
        /// JSON configuration file (overrides DOMAIN_MCP_CONFIG).
        #[arg(long)]
        config: Option<PathBuf>,
        /// Resources root directory.
        #[arg(long, default_value = "resources")]
        resources: PathBuf,
    },
    /// Print the Domain MCP tool definitions as JSON.
    Tools,
}

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// Process entry point.
fn main() -> ExitCode {
    let cli = Cli::parse();
    match cli.command {
        Command::Serve {
            host,
            port,
            config,
            resources,
        } => run_serve(host, port, config, &resources),
        Command::Tools => run_tools(),
    }
}

/// Prints the tool definitions for client integration.
fn run_tools() -> ExitCode {
    let definitions = metric_gate_contract::tool_definitions();
    let Ok(rendered) = serde_json::to_string_pretty(&definitions) else {
        return ExitCode::FAILURE;
    };
    let mut stdout = std::io::stdout();
    if stdout.write_all(rendered.as_bytes()).is_err() || stdout.write_all(b"\n").is_err() {
        return ExitCode::FAILURE;
    }
    ExitCode::SUCCESS
}

/// Runs the server until interrupted.
fn run_serve(
    host: IpAddr,
    port: u16,
    config_override: Option<PathBuf>,
    resources_root: &Path,
) -> ExitCode {
    let settings = match EnvSettings::from_env() {
        Ok(settings) => settings,
        Err(err) => {
            // Tracing is not yet installed; stderr is the only channel.
            let _ = writeln!(std::io::stderr(), "configuration error: {err}");
            return ExitCode::FAILURE;
        }
    };
    init_tracing(&settings.log_level);

    let config = match load_app_config(config_override) {
        Ok(config) => config,
        Err(err) => {
            tracing::error!(error = %err, "startup.config_failed");
            return ExitCode::FAILURE;
        }
    };

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(runtime) => runtime,
        Err(err) => {
            tracing::error!(error = %err, "startup.runtime_failed");
            return ExitCode::FAILURE;
        }
    };
    runtime.block_on(serve(host, port, settings, config, resources_root))
}

/// Installs the tracing subscriber honoring the configured log level.
fn init_tracing(log_level: &str) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_level)
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}

/// Loads the JSON application config from the flag or environment.
fn load_app_config(config_override: Option<PathBuf>) -> Result<AppConfig, String> {
    let path = config_override.or_else(|| std::env::var(CONFIG_ENV_VAR).ok().map(PathBuf::from));
    match path {
        Some(path) => {
            tracing::info!(path = %path.display(), "startup.config_loading");
            AppConfig::load(&path).map_err(|err| err.to_string())
        }
        None => {
            tracing::info!(
                "no configuration file set; only raw mode will be available \
                 (set DOMAIN_MCP_CONFIG to enable source-driven mode)"
            );
            Ok(AppConfig::default())
        }
    }
}

/// Builds the adapter registry from the source configuration table.
fn build_adapters(config: &AppConfig) -> Result<AdapterRegistry, String> {
    let mut registry = AdapterRegistry::new();
    for (source_id, source) in &config.sources {
        let adapter = build_adapter(source_id, source)?;
        registry.register(source_id.clone(), adapter).map_err(|err| err.to_string())?;
        tracing::info!(source_id = %source_id, source_type = %source.source_type, "adapter.registered");
    }
    Ok(registry)
}

/// Builds one adapter instance according to its source kind.
fn build_adapter(
    source_id: &str,
    source: &SourceConfig,
) -> Result<Arc<dyn metric_gate_adapters::SourceAdapter>, String> {
    match source.kind().map_err(|err| err.to_string())? {
        SourceKind::Http => {
            let http_config = HorreumHttpConfig {
                api_key: source.api_key.clone(),
                timeout_seconds: source.timeout_seconds,
                max_retries: source.max_retries,
                backoff_initial_ms: source.backoff_initial_ms,
                backoff_multiplier: source.backoff_multiplier,
                ..HorreumHttpConfig::new(source.endpoint.clone())
            };
            let adapter =
                HorreumHttpAdapter::new(source_id, http_config).map_err(|err| err.to_string())?;
            Ok(Arc::new(adapter))
        }
        SourceKind::Stdio => {
            let transport = spawn_transport(source)?;
            Ok(Arc::new(StdioBridgeAdapter::new(transport, source.timeout_seconds)))
        }
        SourceKind::Elasticsearch => {
            let transport = spawn_transport(source)?;
            Ok(Arc::new(ElasticsearchAdapter::new(transport, source.timeout_seconds)))
        }
    }
}

/// Spawns the stdio child process transport for a source.
fn spawn_transport(
    source: &SourceConfig,
) -> Result<Arc<dyn metric_gate_adapters::BridgeTransport>, String> {
    let transport = StdioProcessTransport::spawn(&StdioTransportConfig {
        command: source.endpoint.clone(),
        args: source.stdio_args.clone().unwrap_or_default(),
        env: source.env.clone().unwrap_or_default(),
    })
    .map_err(|err| err.to_string())?;
    Ok(Arc::new(transport))
}

/// Builds the LLM client when the environment configures one.
fn build_llm(settings: &EnvSettings) -> Result<Option<Arc<dyn LlmClient>>, String> {
    if !settings.llm_configured() {
        tracing::info!("llm not configured; /api/query is disabled");
        return Ok(None);
    }
    let provider = settings.llm_provider.clone().unwrap_or_default().to_lowercase();
    if provider != "gemini" {
        return Err(format!("unsupported LLM provider: {provider} (supported: gemini)"));
    }
    let api_key = settings.llm_api_key.clone().unwrap_or_default();
    let model = settings.llm_model.clone().unwrap_or_default();
    let client = GeminiClient::new(api_key, model, settings.llm_gemini_endpoint.clone())
        .map_err(|err| err.to_string())?;
    Ok(Some(Arc::new(client)))
}

/// Assembles the application state and serves until ctrl-c.
async fn serve(
    host: IpAddr,
    port: u16,
    settings: EnvSettings,
    config: AppConfig,
    resources_root: &Path,
) -> ExitCode {
    let adapters = match build_adapters(&config) {
        Ok(registry) => Arc::new(registry),
        Err(err) => {
            tracing::error!(error = %err, "startup.adapters_failed");
            return ExitCode::FAILURE;
        }
    };
    adapters.log_status();

    let plugins = Arc::new(PluginRegistry::with_builtin_plugins());
    let filter_outcome = plugins.apply_enabled(&config.enabled_plugins);
    tracing::info!(kept = ?filter_outcome.kept, "startup.plugins_ready");
    plugins.log_discovery_debug();

    let resources = Arc::new(ResourceRegistry::load(resources_root));
    let llm = match build_llm(&settings) {
        Ok(llm) => llm,
        Err(err) => {
            tracing::error!(error = %err, "startup.llm_failed");
            return ExitCode::FAILURE;
        }
    };
    let rate_limiter = Arc::new(RateLimiter::new(RateLimitConfig {
        requests_per_hour: settings.rate_limit_requests_per_hour,
        tokens_per_hour: settings.rate_limit_tokens_per_hour,
        window_seconds: 3600,
        enabled: settings.rate_limit_enabled,
        admin_key: settings.rate_limit_admin_key.clone(),
    }));

    let orchestrator = Arc::new(Orchestrator::new(Arc::clone(&adapters), Arc::clone(&plugins)));
    let tools = Arc::new(ToolRouter::new(orchestrator, Arc::clone(&resources)));
    let state = Arc::new(AppState {
        tools,
        resources,
        plugins,
        adapters,
        settings,
        rate_limiter,
        llm,
        correlation: Arc::new(CorrelationIdGenerator::new("req")),
        metrics: Arc::new(TracingMetricsSink),
    });
    let router = build_router(state);

    let bind = SocketAddr::new(host, port);
    let listener = match tokio::net::TcpListener::bind(bind).await {
        Ok(listener) => listener,
        Err(err) => {
            tracing::error!(error = %err, address = %bind, "startup.bind_failed");
            return ExitCode::FAILURE;
        }
    };
    tracing::info!(address = %bind, "server.listening");

    let shutdown = async {
        if tokio::signal::ctrl_c().await.is_err() {
            tracing::error!("shutdown signal handler failed");
        }
        tracing::info!("shutdown.signal_received");
    };
    match axum::serve(listener, router).with_graceful_shutdown(shutdown).await {
        Ok(()) => {
            tracing::info!("server.stopped");
            ExitCode::from(SIGINT_EXIT_CODE)
        }
        Err(err) => {
            tracing::error!(error = %err, "server.failed");
            ExitCode::FAILURE
        }
    }
}
