// crates/toolgate-cli/src/main.rs
// ============================================================================
// Module: Toolgate CLI
// Description: Command-line entry point for serving and calling the gateway.
// Purpose: Run the MCP server, validate config, and call tools over HTTP.
// Dependencies: clap, dotenvy, toolgate-config, toolgate-mcp, toolgate-tools, tracing-subscriber
// ============================================================================

//! ## Overview
//! The `toolgate` binary wires configuration, built-in tools, and the MCP
//! server together, and ships a small HTTP MCP client for manual calls.
//!
//! Diagnostics go to stderr through `tracing-subscriber`; stdout carries
//! command output only (and JSON-RPC frames when serving over stdio).
//!
//! Security posture: tokens given on the command line or through
//! `TOOLGATE_TOKEN` are never logged.

// ============================================================================
// SECTION: Modules
// ============================================================================

pub(crate) mod mcp_client;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Duration;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use serde_json::Value;
use serde_json::json;
use thiserror::Error;
use toolgate_config::GatewayConfig;
use toolgate_config::LogFormat;
use toolgate_config::LoggingConfig;
use toolgate_config::ServerTransport;
use toolgate_mcp::McpServer;
use toolgate_tools::build_registry;
use tracing_subscriber::EnvFilter;

use crate::mcp_client::McpClient;
use crate::mcp_client::McpClientConfig;
use crate::mcp_client::TokenPlacement;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the caller credential for client commands.
const TOKEN_ENV: &str = "TOOLGATE_TOKEN";
/// Environment variable holding the HTTP gate token for client commands.
const GATE_TOKEN_ENV: &str = "TOOLGATE_GATE_TOKEN";
/// Default MCP endpoint for client commands.
const DEFAULT_ENDPOINT: &str = "http://127.0.0.1:8080/mcp";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Toolgate command-line interface.
#[derive(Parser, Debug)]
#[command(name = "toolgate", about = "Authenticated MCP tool gateway", disable_version_flag = true)]
struct Cli {
    /// Print the version and exit.
    #[arg(long = "version", short = 'V', action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected command.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Top-level commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Run the MCP server on the configured transport.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Built-in tool utilities.
    Tools {
        /// Selected tools subcommand.
        #[command(subcommand)]
        command: ToolsCommand,
    },
    /// HTTP MCP client.
    Client {
        /// Selected client subcommand.
        #[command(subcommand)]
        command: ClientCommand,
    },
}

/// Arguments shared by commands that read a config file.
#[derive(Args, Debug, Clone)]
struct ConfigArgs {
    /// Config file path (defaults to `TOOLGATE_CONFIG` or `toolgate.toml`).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// `serve` arguments.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Config selection.
    #[command(flatten)]
    config: ConfigArgs,
}

/// `config` subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Check(ConfigArgs),
}

/// `tools` subcommands.
#[derive(Subcommand, Debug)]
enum ToolsCommand {
    /// List the built-in tools the config would register.
    List(ConfigArgs),
}

/// `client` subcommands.
#[derive(Subcommand, Debug)]
enum ClientCommand {
    /// Call `tools/list`.
    List(ClientArgs),
    /// Call `tools/call`.
    Call(ClientCallCommand),
}

/// Connection arguments for client commands.
#[derive(Args, Clone)]
struct ClientArgs {
    /// MCP endpoint URL.
    #[arg(long, value_name = "URL", default_value = DEFAULT_ENDPOINT)]
    url: String,
    /// Caller credential.
    #[arg(long, value_name = "TOKEN", env = TOKEN_ENV, hide_env_values = true)]
    token: Option<String>,
    /// Send the credential as `params.auth_token` instead of a header.
    #[arg(long, action = ArgAction::SetTrue)]
    token_in_params: bool,
    /// HTTP gate token; implies `--token-in-params`.
    #[arg(long, value_name = "TOKEN", env = GATE_TOKEN_ENV, hide_env_values = true)]
    gate_token: Option<String>,
    /// Request timeout in milliseconds.
    #[arg(long, value_name = "MS", default_value_t = 10_000)]
    timeout_ms: u64,
}

impl std::fmt::Debug for ClientArgs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientArgs")
            .field("url", &self.url)
            .field("token", &self.token.as_ref().map(|_| "<redacted>"))
            .field("token_in_params", &self.token_in_params)
            .field("gate_token", &self.gate_token.as_ref().map(|_| "<redacted>"))
            .field("timeout_ms", &self.timeout_ms)
            .finish()
    }
}

/// `client call` arguments.
#[derive(Args, Debug)]
struct ClientCallCommand {
    /// Connection arguments.
    #[command(flatten)]
    client: ClientArgs,
    /// Tool name.
    #[arg(long, value_name = "NAME")]
    tool: String,
    /// Tool arguments as a JSON object.
    #[arg(long, value_name = "JSON", default_value = "{}")]
    args: String,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper carrying a user-facing message.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`].
    fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// CLI result alias for fallible operations.
type CliResult<T> = Result<T, CliError>;

// ============================================================================
// SECTION: Entry Point
// ============================================================================

/// CLI entry point returning an exit code.
#[tokio::main(flavor = "multi_thread")]
async fn main() -> ExitCode {
    match run().await {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
async fn run() -> CliResult<ExitCode> {
    load_dotenv()?;
    let cli = Cli::parse();

    if cli.show_version {
        write_stdout_line(&format!("toolgate {}", env!("CARGO_PKG_VERSION")))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        Cli::command()
            .print_help()
            .map_err(|err| CliError::new(format!("failed to write help: {err}")))?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command: ConfigCommand::Check(args),
        } => command_config_check(&args),
        Commands::Tools {
            command: ToolsCommand::List(args),
        } => command_tools_list(&args),
        Commands::Client {
            command,
        } => command_client(command).await,
    }
}

/// Loads `.env` from the working directory when present.
fn load_dotenv() -> CliResult<()> {
    match dotenvy::dotenv() {
        Ok(_) => Ok(()),
        Err(err) if err.not_found() => Ok(()),
        Err(err) => Err(CliError::new(format!("failed to load .env: {err}"))),
    }
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = load_config(&command.config)?;
    init_tracing(&config.logging)?;
    if config.server.transport == ServerTransport::Http && config.server.http.gate_tokens.is_empty()
    {
        tracing::info!("http gate disabled; per-call credentials still required");
    }
    let registry = build_registry(&config.tools)
        .map_err(|err| CliError::new(format!("failed to build tool registry: {err}")))?;
    let server = McpServer::from_config(config, registry)
        .map_err(|err| CliError::new(format!("server init failed: {err}")))?;
    server.serve_with_shutdown(shutdown_signal()).await.map_err(|err| {
        tracing::error!(error = %err, "server failed");
        CliError::new(format!("server failed: {err}"))
    })?;
    Ok(ExitCode::SUCCESS)
}

/// Resolves when the process receives Ctrl-C.
async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %err, "ctrl-c handler unavailable; running until transport ends");
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown requested");
}

// ============================================================================
// SECTION: Config and Tools Commands
// ============================================================================

/// Executes `config check`.
fn command_config_check(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    write_stdout_line(&format!(
        "config ok: server '{}' over {} with {} auth",
        config.server.name,
        config.server.transport.as_str(),
        config.auth.mode.as_str()
    ))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `tools list`.
fn command_tools_list(args: &ConfigArgs) -> CliResult<ExitCode> {
    let config = load_config(args)?;
    let registry = build_registry(&config.tools)
        .map_err(|err| CliError::new(format!("failed to build tool registry: {err}")))?;
    let tools: Vec<Value> = registry
        .list_all()
        .iter()
        .map(|tool| {
            json!({
                "name": tool.name(),
                "description": tool.description(),
                "requiredPermissions": tool.required_permissions(),
            })
        })
        .collect();
    write_json_value(&json!({ "tools": tools }))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads and validates configuration.
fn load_config(args: &ConfigArgs) -> CliResult<GatewayConfig> {
    GatewayConfig::load(args.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))
}

// ============================================================================
// SECTION: Client Commands
// ============================================================================

/// Dispatches client subcommands.
async fn command_client(command: ClientCommand) -> CliResult<ExitCode> {
    init_tracing(&LoggingConfig {
        level: "warn".to_string(),
        format: LogFormat::Text,
    })?;
    match command {
        ClientCommand::List(args) => command_client_list(&args).await,
        ClientCommand::Call(command) => command_client_call(command).await,
    }
}

/// Executes `client list`.
async fn command_client_list(args: &ClientArgs) -> CliResult<ExitCode> {
    let mut client = build_client(args)?;
    client.initialize().await.map_err(|err| CliError::new(err.to_string()))?;
    let tools = client.list_tools().await.map_err(|err| CliError::new(err.to_string()))?;
    write_json_value(&json!({ "tools": tools }))?;
    Ok(ExitCode::SUCCESS)
}

/// Executes `client call`.
async fn command_client_call(command: ClientCallCommand) -> CliResult<ExitCode> {
    let arguments = parse_arguments(&command.args)?;
    let mut client = build_client(&command.client)?;
    client.initialize().await.map_err(|err| CliError::new(err.to_string()))?;
    let outcome = client
        .call_tool(&command.tool, arguments)
        .await
        .map_err(|err| CliError::new(err.to_string()))?;
    write_json_value(&outcome.envelope)?;
    Ok(if outcome.is_error { ExitCode::FAILURE } else { ExitCode::SUCCESS })
}

/// Builds an MCP client from connection arguments.
fn build_client(args: &ClientArgs) -> CliResult<McpClient> {
    McpClient::new(client_config(args)).map_err(|err| CliError::new(err.to_string()))
}

/// Resolves client configuration from arguments.
fn client_config(args: &ClientArgs) -> McpClientConfig {
    let placement = if args.token_in_params || args.gate_token.is_some() {
        TokenPlacement::Params
    } else {
        TokenPlacement::Header
    };
    McpClientConfig {
        endpoint: args.url.clone(),
        timeout: Duration::from_millis(args.timeout_ms),
        token: args.token.clone(),
        placement,
        gate_token: args.gate_token.clone(),
    }
}

/// Parses `--args` into a JSON object.
fn parse_arguments(raw: &str) -> CliResult<Value> {
    let value: Value = serde_json::from_str(raw)
        .map_err(|err| CliError::new(format!("--args must be valid JSON: {err}")))?;
    if !value.is_object() {
        return Err(CliError::new("--args must be a JSON object"));
    }
    Ok(value)
}

// ============================================================================
// SECTION: Logging
// ============================================================================

/// Installs the global tracing subscriber writing to stderr.
fn init_tracing(logging: &LoggingConfig) -> CliResult<()> {
    let env_directive = std::env::var(EnvFilter::DEFAULT_ENV).ok();
    let filter = log_filter(&logging.level, env_directive.as_deref())?;
    let builder =
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr);
    let result = match logging.format {
        LogFormat::Text => builder.try_init(),
        LogFormat::Json => builder.json().try_init(),
    };
    result.map_err(|err| CliError::new(format!("failed to initialize logging: {err}")))
}

/// Builds the log filter; a non-empty `RUST_LOG` overrides the configured level.
fn log_filter(level: &str, env_directive: Option<&str>) -> CliResult<EnvFilter> {
    let directive = env_directive.map(str::trim).filter(|value| !value.is_empty()).unwrap_or(level);
    EnvFilter::try_new(directive)
        .map_err(|err| CliError::new(format!("invalid log filter '{directive}': {err}")))
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> CliResult<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}").map_err(|err| output_error("stdout", &err))
}

/// Writes a JSON value to stdout with a trailing newline.
fn write_json_value(value: &Value) -> CliResult<()> {
    let mut bytes = serde_json::to_vec_pretty(value)
        .map_err(|err| CliError::new(format!("failed to render json: {err}")))?;
    bytes.push(b'\n');
    let mut stdout = std::io::stdout();
    stdout.write_all(&bytes).map_err(|err| output_error("stdout", &err))
}

/// Formats an output stream failure.
fn output_error(stream: &str, err: &std::io::Error) -> CliError {
    CliError::new(format!("failed to write {stream}: {err}"))
}

/// Writes an error to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let mut stderr = std::io::stderr();
    let _ = writeln!(&mut stderr, "error: {message}");
    ExitCode::FAILURE
}
