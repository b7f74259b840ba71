// crates/canteen-cli/src/main.rs
// ============================================================================
// Module: Canteen CLI Entry Point
// Description: Command dispatcher for the canteen HTTP server and operator tasks.
// Purpose: Start the server, validate configuration, and bootstrap admin accounts.
// Dependencies: clap, canteen-api, canteen-config, serde_json, thiserror, tokio.
// ============================================================================

//! ## Overview
//! The `canteen` binary is the operator surface for the canteen backend. It
//! loads the TOML configuration, starts the HTTP server, and creates admin
//! accounts, which the public signup route never produces. Admin passwords are
//! never accepted as command-line arguments.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::BufRead;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use canteen_api::ApiServer;
use canteen_config::CanteenConfig;
use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Environment variable holding the admin password for `admin create`.
const ADMIN_PASSWORD_ENV: &str = "CANTEEN_ADMIN_PASSWORD";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "canteen", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the canteen HTTP server.
    Serve(ServeCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Account administration.
    Admin {
        /// Selected admin subcommand.
        #[command(subcommand)]
        command: AdminCommand,
    },
}

/// Configuration for the `serve` command.
#[derive(Args, Debug)]
struct ServeCommand {
    /// Optional config file path (defaults to canteen.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Load and validate a config file.
    Validate(ConfigValidateCommand),
}

/// Arguments for config validation.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to canteen.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Admin subcommands.
#[derive(Subcommand, Debug)]
enum AdminCommand {
    /// Create an admin account.
    Create(AdminCreateCommand),
}

/// Arguments for admin creation.
#[derive(Args, Debug)]
struct AdminCreateCommand {
    /// Display name of the admin.
    #[arg(long, value_name = "NAME")]
    name: String,
    /// Login email of the admin.
    #[arg(long, value_name = "EMAIL")]
    email: String,
    /// Read the password from the first line of stdin instead of the environment.
    #[arg(long, action = ArgAction::SetTrue)]
    password_stdin: bool,
    /// Optional config file path (defaults to canteen.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
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
    const fn new(message: String) -> Self {
        Self {
            message,
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
    let cli = Cli::parse();

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&format!("canteen {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Serve(command) => command_serve(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Admin {
            command,
        } => command_admin(command).await,
    }
}

/// Prints top-level help.
fn show_help() -> CliResult<()> {
    let help = Cli::command().render_help().to_string();
    write_stdout_line(help.trim_end()).map_err(|err| CliError::new(output_error("stdout", &err)))
}

// ============================================================================
// SECTION: Serve Command
// ============================================================================

/// Executes the `serve` command.
async fn command_serve(command: ServeCommand) -> CliResult<ExitCode> {
    let config = CanteenConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = build_server(config).await?;
    write_stderr_line(&format!("canteen listening on {}", server.bind_addr()))
        .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    server.serve().await.map_err(|err| CliError::new(format!("server failed: {err}")))?;
    Ok(ExitCode::SUCCESS)
}

/// Builds the server off the async workers; its HTTP clients are blocking.
async fn build_server(config: CanteenConfig) -> CliResult<ApiServer> {
    tokio::task::spawn_blocking(move || ApiServer::from_config(config))
        .await
        .map_err(|err| CliError::new(format!("server init failed: init join failed: {err}")))?
        .map_err(|err| CliError::new(format!("server init failed: {err}")))
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let _config = CanteenConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    write_stdout_line("config is valid").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Admin Commands
// ============================================================================

/// Dispatches admin subcommands.
async fn command_admin(command: AdminCommand) -> CliResult<ExitCode> {
    match command {
        AdminCommand::Create(command) => command_admin_create(command).await,
    }
}

/// Executes the admin creation command.
async fn command_admin_create(command: AdminCreateCommand) -> CliResult<ExitCode> {
    let password = if command.password_stdin {
        read_password_line(std::io::stdin().lock())?
    } else {
        password_from_env(std::env::var(ADMIN_PASSWORD_ENV).ok())?
    };
    let config = CanteenConfig::load(command.config.as_deref())
        .map_err(|err| CliError::new(format!("failed to load config: {err}")))?;
    let server = build_server(config).await?;
    let AdminCreateCommand {
        name,
        email,
        ..
    } = command;
    let user = tokio::task::spawn_blocking(move || {
        server.services().auth.create_admin(&name, &email, &password)
    })
    .await
    .map_err(|err| CliError::new(format!("admin create failed: join failed: {err}")))?
    .map_err(|err| CliError::new(format!("admin create failed: {err}")))?;
    let rendered = serde_json::to_string_pretty(&user.to_dto())
        .map_err(|err| CliError::new(format!("failed to render admin: {err}")))?;
    write_stdout_line(&rendered).map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Reads the admin password from the first line of `reader`.
fn read_password_line(mut reader: impl BufRead) -> CliResult<String> {
    let mut line = String::new();
    reader
        .read_line(&mut line)
        .map_err(|err| CliError::new(format!("failed to read password from stdin: {err}")))?;
    let password = line.trim_end_matches(['\r', '\n']);
    if password.is_empty() {
        return Err(CliError::new("password on stdin is empty".to_string()));
    }
    Ok(password.to_string())
}

/// Resolves the admin password from the environment value.
fn password_from_env(value: Option<String>) -> CliResult<String> {
    match value {
        Some(password) if !password.is_empty() => Ok(password),
        _ => Err(CliError::new(format!(
            "admin password required: set {ADMIN_PASSWORD_ENV} or pass --password-stdin"
        ))),
    }
}

// ============================================================================
// SECTION: Output
// ============================================================================

/// Writes a line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output failure message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
