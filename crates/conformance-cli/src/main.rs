// crates/conformance-cli/src/main.rs
// ============================================================================
// Module: Conformance CLI Entry Point
// Description: Command dispatcher for conformance runs and catalog utilities.
// Purpose: Run the metadata-store harness from the command line.
// Dependencies: clap, conformance-cli, conformance-config, conformance-core, tokio
// ============================================================================

//! ## Overview
//! `conformance run` loads a harness config, applies command-line overrides,
//! and runs the harness on a blocking worker while Ctrl-C requests
//! cancellation. Interrupted runs still emit a report. Exit codes: `0` when
//! every unit completed without failures, `2` when the run finished with
//! failures, aborted units, or an interruption, and `1` for usage or setup
//! errors.

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use conformance_cli::render_report;
use conformance_cli::run_session;
use conformance_cli::write_report;
use conformance_config::CatalogFile;
use conformance_config::HarnessConfig;
use conformance_config::config_toml_example;
use conformance_config::load_type_catalog;
use conformance_core::OperationFamily;
use conformance_core::PerformanceProfile;
use conformance_core::TypeCatalog;
use conformance_core::runtime::CancellationToken;
use conformance_core::runtime::RunOutcome;
use conformance_core::runtime::builtin_type_catalog;
use thiserror::Error;

// ============================================================================
// SECTION: Constants
// ============================================================================

/// Exit code for runs that completed with failures or were interrupted.
const EXIT_NONCONFORMANT: u8 = 2;

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "conformance", disable_help_subcommand = true, disable_version_flag = true)]
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
    /// Run the conformance harness against the configured store.
    Run(RunCommand),
    /// Configuration utilities.
    Config {
        /// Selected config subcommand.
        #[command(subcommand)]
        command: ConfigCommand,
    },
    /// Type catalog utilities.
    Catalog {
        /// Selected catalog subcommand.
        #[command(subcommand)]
        command: CatalogCommand,
    },
    /// List the performance profiles a report aggregates into.
    Profiles(ProfilesCommand),
}

/// Arguments for `run`.
#[derive(Args, Debug)]
struct RunCommand {
    /// Optional config file path (defaults to conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    /// Instances to create per type.
    #[arg(long, value_name = "N")]
    instances: Option<usize>,
    /// Worker threads per phase.
    #[arg(long, value_name = "N")]
    workers: Option<usize>,
    /// Whole-run timeout in milliseconds.
    #[arg(long = "timeout-ms", value_name = "MS")]
    timeout_ms: Option<u64>,
    /// Operation families to run (repeatable; defaults to the config).
    #[arg(long = "family", value_enum, value_name = "FAMILY")]
    families: Vec<FamilyArg>,
    /// Report output path (stdout when unset).
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,
    /// Emit compact single-line JSON.
    #[arg(long, action = ArgAction::SetTrue)]
    compact: bool,
}

/// Config subcommands.
#[derive(Subcommand, Debug)]
enum ConfigCommand {
    /// Validate a harness configuration file.
    Validate(ConfigValidateCommand),
    /// Print an example configuration.
    Example,
}

/// Arguments for `config validate`.
#[derive(Args, Debug)]
struct ConfigValidateCommand {
    /// Optional config file path (defaults to conformance.toml or env override).
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
}

/// Catalog subcommands.
#[derive(Subcommand, Debug)]
enum CatalogCommand {
    /// Print the type catalog a run would exercise.
    Show(CatalogShowCommand),
}

/// Arguments for `catalog show`.
#[derive(Args, Debug)]
struct CatalogShowCommand {
    /// Config file whose catalog section selects the catalog.
    #[arg(long, value_name = "PATH", conflicts_with = "file")]
    config: Option<PathBuf>,
    /// Catalog file to load directly.
    #[arg(long, value_name = "PATH")]
    file: Option<PathBuf>,
    /// Output format.
    #[arg(long, value_enum, default_value_t = ListFormat::Text)]
    format: ListFormat,
}

/// Arguments for `profiles`.
#[derive(Args, Debug)]
struct ProfilesCommand {
    /// Output format.
    #[arg(long, value_enum, default_value_t = ListFormat::Text)]
    format: ListFormat,
}

/// Output formats for listings.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum ListFormat {
    /// JSON output.
    Json,
    /// Human-readable text output.
    Text,
}

/// Operation family selector.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum FamilyArg {
    /// Instance creation.
    Create,
    /// Identity replacement.
    ReIdentify,
    /// Type replacement.
    ReType,
    /// Soft delete and restore.
    DeleteRestore,
    /// Soft delete and purge.
    Purge,
}

impl From<FamilyArg> for OperationFamily {
    fn from(value: FamilyArg) -> Self {
        match value {
            FamilyArg::Create => Self::Create,
            FamilyArg::ReIdentify => Self::ReIdentify,
            FamilyArg::ReType => Self::ReType,
            FamilyArg::DeleteRestore => Self::DeleteRestore,
            FamilyArg::Purge => Self::Purge,
        }
    }
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for user-facing messages.
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
        write_stdout_line(&format!("conformance {version}"))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    match command {
        Commands::Run(command) => command_run(command).await,
        Commands::Config {
            command,
        } => command_config(command),
        Commands::Catalog {
            command,
        } => command_catalog(command),
        Commands::Profiles(command) => command_profiles(&command),
    }
}

/// Emits the top-level help message for the CLI.
fn show_help() -> CliResult<()> {
    let mut command = Cli::command();
    command.print_help().map_err(|err| CliError::new(output_error("stdout", &err)))?;
    write_stdout_line("").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(())
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
async fn command_run(command: RunCommand) -> CliResult<ExitCode> {
    let mut config = load_config(command.config.as_ref())?;
    apply_overrides(&mut config, &command)?;
    let report_path = command.report.clone().or_else(|| config.report.path.clone());
    let pretty = config.report.pretty && !command.compact;

    let token = CancellationToken::new();
    let interrupt = {
        let token = token.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                token.cancel();
            }
        })
    };
    let outcome = tokio::task::spawn_blocking(move || run_session(&config, &token))
        .await
        .map_err(|err| CliError::new(format!("run failed: join error: {err}")))?
        .map_err(|err| CliError::new(format!("run failed: {err}")))?;
    interrupt.abort();

    let rendered = render_report(&outcome.report, pretty)
        .map_err(|err| CliError::new(err.to_string()))?;
    match report_path {
        Some(path) => {
            write_report(&path, &rendered).map_err(|err| CliError::new(err.to_string()))?;
            write_stdout_line(&summary_line(&outcome))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        None => {
            write_stdout_line(&rendered)
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
    }
    if let Some(reason) = outcome.stopped {
        write_stderr_line(&format!("run stopped early: {reason}"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    if outcome.worker_panics > 0 {
        write_stderr_line(&format!("worker threads panicked: {}", outcome.worker_panics))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }
    Ok(exit_code(&outcome))
}

/// Applies command-line overrides and revalidates the result.
fn apply_overrides(config: &mut HarnessConfig, command: &RunCommand) -> CliResult<()> {
    if let Some(instances) = command.instances {
        config.run.instances_per_type = instances;
    }
    if let Some(workers) = command.workers {
        config.run.workers = workers;
    }
    if let Some(timeout_ms) = command.timeout_ms {
        config.run.timeout_ms = Some(timeout_ms);
    }
    if !command.families.is_empty() {
        config.run.families = command.families.iter().copied().map(OperationFamily::from).collect();
    }
    config.validate().map_err(|err| CliError::new(format!("config load failed: {err}")))
}

/// One-line run summary for terminal output.
fn summary_line(outcome: &RunOutcome) -> String {
    let totals = &outcome.report.totals;
    format!(
        "assertions {} pass {} fail {} unsupported {} units completed {} aborted {} skipped {}",
        totals.assertions,
        totals.pass,
        totals.fail,
        totals.unsupported,
        totals.units_completed,
        totals.units_aborted,
        totals.units_skipped
    )
}

/// Maps a run outcome to the process exit code.
fn exit_code(outcome: &RunOutcome) -> ExitCode {
    let totals = &outcome.report.totals;
    let clean = totals.fail == 0
        && totals.units_aborted == 0
        && !outcome.report.interrupted
        && outcome.worker_panics == 0;
    if clean { ExitCode::SUCCESS } else { ExitCode::from(EXIT_NONCONFORMANT) }
}

// ============================================================================
// SECTION: Config Commands
// ============================================================================

/// Dispatches config subcommands.
fn command_config(command: ConfigCommand) -> CliResult<ExitCode> {
    match command {
        ConfigCommand::Validate(command) => command_config_validate(&command),
        ConfigCommand::Example => {
            write_stdout_line(config_toml_example().trim_end())
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Executes the config validation command.
fn command_config_validate(command: &ConfigValidateCommand) -> CliResult<ExitCode> {
    let config = load_config(command.config.as_ref())?;
    config.type_catalog().map_err(|err| CliError::new(format!("config load failed: {err}")))?;
    write_stdout_line("config ok").map_err(|err| CliError::new(output_error("stdout", &err)))?;
    Ok(ExitCode::SUCCESS)
}

/// Loads a harness config from an explicit path or the default resolution.
fn load_config(path: Option<&PathBuf>) -> CliResult<HarnessConfig> {
    HarnessConfig::load(path.map(PathBuf::as_path))
        .map_err(|err| CliError::new(format!("config load failed: {err}")))
}

// ============================================================================
// SECTION: Catalog Commands
// ============================================================================

/// Dispatches catalog subcommands.
fn command_catalog(command: CatalogCommand) -> CliResult<ExitCode> {
    match command {
        CatalogCommand::Show(command) => command_catalog_show(&command),
    }
}

/// Executes `catalog show`.
fn command_catalog_show(command: &CatalogShowCommand) -> CliResult<ExitCode> {
    let catalog = match (&command.file, &command.config) {
        (Some(file), _) => load_type_catalog(file)
            .map_err(|err| CliError::new(format!("catalog load failed: {err}")))?,
        (None, Some(config)) => load_config(Some(config))?
            .type_catalog()
            .map_err(|err| CliError::new(format!("catalog load failed: {err}")))?,
        (None, None) => builtin_type_catalog()
            .map_err(|err| CliError::new(format!("catalog load failed: {err}")))?,
    };
    let types =
        catalog.types().map_err(|err| CliError::new(format!("catalog load failed: {err}")))?;
    match command.format {
        ListFormat::Json => {
            let document = CatalogFile {
                types,
            };
            let rendered = serde_json::to_string_pretty(&document)
                .map_err(|err| CliError::new(format!("catalog render failed: {err}")))?;
            write_stdout_line(&rendered)
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ListFormat::Text => {
            for descriptor in types {
                let super_type =
                    descriptor.super_type.as_ref().map_or("-", |super_type| super_type.as_str());
                write_stdout_line(&format!(
                    "{}\t{}\t{}\t{}",
                    descriptor.category, descriptor.name, descriptor.id, super_type
                ))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Profile Commands
// ============================================================================

/// Executes `profiles`.
fn command_profiles(command: &ProfilesCommand) -> CliResult<ExitCode> {
    match command.format {
        ListFormat::Json => {
            let rendered = serde_json::to_string_pretty(&PerformanceProfile::ALL)
                .map_err(|err| CliError::new(format!("profile render failed: {err}")))?;
            write_stdout_line(&rendered)
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        }
        ListFormat::Text => {
            for profile in PerformanceProfile::ALL {
                write_stdout_line(&format!("{profile}\t{}", profile.description()))
                    .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats an output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    format!("failed to write to {stream}: {error}")
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
