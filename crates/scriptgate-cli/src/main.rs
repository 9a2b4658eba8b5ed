// crates/scriptgate-cli/src/main.rs
// ============================================================================
// Module: Script Gate CLI Entry Point
// Description: Command dispatcher for script fetch and gated execution.
// Purpose: Provide a safe, localized CLI for the delivery pipeline.
// Dependencies: clap, scriptgate-client, scriptgate-core, thiserror.
// ============================================================================

//! ## Overview
//! The `scriptgate` binary fetches named scripts from a configured host,
//! decrypts them when a private key is available, and executes them only
//! behind an interactive confirmation gate. All user-facing strings are
//! routed through the i18n catalog.
//!
//! Security posture: fetched scripts are remote-authored and untrusted; the
//! confirmation prompt shows the full plaintext before anything runs.

// ============================================================================
// SECTION: Modules
// ============================================================================

#[cfg(test)]
mod main_tests;

// ============================================================================
// SECTION: Imports
// ============================================================================

use std::fs;
use std::io::Write;
use std::path::Path;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::ArgAction;
use clap::Args;
use clap::CommandFactory;
use clap::Parser;
use clap::Subcommand;
use clap::ValueEnum;
use scriptgate_cli::i18n::Locale;
use scriptgate_cli::i18n::set_locale;
use scriptgate_cli::t;
use scriptgate_client::ClientConfig;
use scriptgate_client::ConfigError;
use scriptgate_client::Credentials;
use scriptgate_client::HttpTransport;
use scriptgate_client::ScriptFetch;
use scriptgate_client::ScriptQuery;
use scriptgate_core::ConfirmationGate;
use scriptgate_core::DispatchError;
use scriptgate_core::DispatchOutcome;
use scriptgate_core::DispatchRequest;
use scriptgate_core::Dispatcher;
use scriptgate_core::ScriptSource;
use thiserror::Error;

// ============================================================================
// SECTION: Limits
// ============================================================================

/// Maximum size of a PEM private key file.
const MAX_KEY_BYTES: u64 = 16 * 1024;
/// Environment variable for CLI locale selection.
const LANG_ENV: &str = "SCRIPTGATE_LANG";

// ============================================================================
// SECTION: CLI Types
// ============================================================================

/// Top-level CLI definition.
#[derive(Parser, Debug)]
#[command(name = "scriptgate", disable_help_subcommand = true, disable_version_flag = true)]
struct Cli {
    /// Print version information and exit.
    #[arg(long = "version", action = ArgAction::SetTrue, global = true)]
    show_version: bool,
    /// Preferred output language (overrides `SCRIPTGATE_LANG`).
    #[arg(long, value_enum, value_name = "LANG", global = true)]
    lang: Option<LangArg>,
    /// Path to the config file (overrides `SCRIPTGATE_CONFIG`).
    #[arg(long, value_name = "PATH", global = true)]
    config: Option<PathBuf>,
    /// Base URL of the script host (overrides the config file).
    #[arg(long, value_name = "URL", global = true)]
    server: Option<String>,
    /// Selected subcommand to execute.
    #[command(subcommand)]
    command: Option<Commands>,
}

/// Supported CLI subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Fetch a script (decrypting it when possible) without executing it.
    Get(GetCommand),
    /// Fetch a script and execute it behind the confirmation gate.
    Run(RunCommand),
}

/// Supported CLI language selections.
#[derive(ValueEnum, Copy, Clone, Debug)]
enum LangArg {
    /// English.
    En,
    /// Catalan.
    Ca,
}

impl From<LangArg> for Locale {
    fn from(value: LangArg) -> Self {
        match value {
            LangArg::En => Self::En,
            LangArg::Ca => Self::Ca,
        }
    }
}

/// Arguments shared by every fetching subcommand.
#[derive(Args, Debug)]
struct FetchArgs {
    /// Script reference: `owner/script`, or a bare name with `--user`.
    #[arg(value_name = "SCRIPT")]
    script: String,
    /// Script owner when the reference is a bare name.
    #[arg(short = 'u', long, value_name = "OWNER")]
    user: Option<String>,
    /// Specific version tag to fetch (defaults to the latest).
    #[arg(long = "script-version", value_name = "TAG")]
    script_version: Option<String>,
    /// Share token for private scripts.
    #[arg(long, value_name = "TOKEN")]
    token: Option<String>,
    /// Path to the RSA private key for encrypted scripts.
    #[arg(short = 'k', long, value_name = "PATH")]
    key: Option<PathBuf>,
}

/// Arguments for the `get` command.
#[derive(Args, Debug)]
struct GetCommand {
    /// Shared fetch arguments.
    #[command(flatten)]
    fetch: FetchArgs,
    /// Write the script to a file instead of stdout.
    #[arg(short = 'O', long, value_name = "PATH")]
    output: Option<PathBuf>,
}

/// Arguments for the `run` command.
#[derive(Args, Debug)]
struct RunCommand {
    /// Shared fetch arguments.
    #[command(flatten)]
    fetch: FetchArgs,
    /// Skip the confirmation prompt.
    #[arg(short = 'a', long, action = ArgAction::SetTrue)]
    accept: bool,
    /// Arguments forwarded to the script.
    #[arg(value_name = "ARGS", trailing_var_arg = true, allow_hyphen_values = true)]
    args: Vec<String>,
}

// ============================================================================
// SECTION: Errors
// ============================================================================

/// CLI error wrapper for localized error messages.
#[derive(Debug, Error)]
#[error("{message}")]
struct CliError {
    /// Human-readable error message.
    message: String,
}

impl CliError {
    /// Constructs a new [`CliError`] from a localized message.
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
fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(err) => emit_error(&err.to_string()),
    }
}

/// Executes the CLI command dispatcher.
fn run() -> CliResult<ExitCode> {
    let cli = Cli::parse();
    let env_lang = std::env::var(LANG_ENV).ok();
    let locale = resolve_locale(cli.lang, env_lang.as_deref())?;
    set_locale(locale);
    if locale != Locale::En {
        write_stderr_line(&t!("i18n.disclaimer.machine_translated"))
            .map_err(|err| CliError::new(output_error("stderr", &err)))?;
    }

    if cli.show_version {
        let version = env!("CARGO_PKG_VERSION");
        write_stdout_line(&t!("main.version", version = version))
            .map_err(|err| CliError::new(output_error("stdout", &err)))?;
        return Ok(ExitCode::SUCCESS);
    }

    let Some(command) = cli.command else {
        show_help()?;
        return Ok(ExitCode::SUCCESS);
    };

    let config = load_optional_config(cli.config.as_deref())?;
    let server = resolve_server(cli.server.as_deref(), config.as_ref())?;

    match command {
        Commands::Get(command) => command_get(command, &server, config.as_ref()),
        Commands::Run(command) => command_run(command, &server, config.as_ref()),
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
// SECTION: Get Command
// ============================================================================

/// Executes the `get` command.
fn command_get(
    command: GetCommand,
    server: &str,
    config: Option<&ClientConfig>,
) -> CliResult<ExitCode> {
    let (source, fetch) = fetch_script(&command.fetch, server, config)?;
    let key_pem = read_fetch_key(&command.fetch, config, &fetch)?;

    let mut request = DispatchRequest::new(source, fetch.metadata, fetch.body);
    request.private_key_pem = key_pem;

    let mut gate = StdioGate;
    let outcome = Dispatcher::new()
        .dispatch(request, &mut gate)
        .map_err(|err| CliError::new(t!("fetch.failed", error = err)))?;

    match outcome {
        DispatchOutcome::Plaintext(plaintext) => {
            deliver_bytes(plaintext.as_str().as_bytes(), command.output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        DispatchOutcome::EncryptedPassthrough(bytes) => {
            write_stderr_line(&t!("get.note.encrypted"))
                .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            deliver_bytes(&bytes, command.output.as_deref())?;
            Ok(ExitCode::SUCCESS)
        }
        DispatchOutcome::Cancelled
        | DispatchOutcome::Exited {
            ..
        }
        | DispatchOutcome::Evaluated(_) => {
            Err(CliError::new(t!("internal.unexpected_outcome")))
        }
    }
}

/// Writes fetched script bytes to the output file or stdout.
fn deliver_bytes(bytes: &[u8], output: Option<&Path>) -> CliResult<()> {
    match output {
        Some(path) => {
            fs::write(path, bytes).map_err(|err| {
                CliError::new(t!("get.write_failed", path = path.display(), error = err))
            })?;
            write_stdout_line(&t!("get.saved", path = path.display()))
                .map_err(|err| CliError::new(output_error("stdout", &err)))
        }
        None => {
            write_stdout_bytes(bytes).map_err(|err| CliError::new(output_error("stdout", &err)))
        }
    }
}

// ============================================================================
// SECTION: Run Command
// ============================================================================

/// Executes the `run` command.
fn command_run(
    command: RunCommand,
    server: &str,
    config: Option<&ClientConfig>,
) -> CliResult<ExitCode> {
    let (source, fetch) = fetch_script(&command.fetch, server, config)?;
    let key_pem = read_fetch_key(&command.fetch, config, &fetch)?;

    let mut request = DispatchRequest::new(source, fetch.metadata, fetch.body);
    request.private_key_pem = key_pem;
    request.accept = command.accept;
    request.execute = true;
    request.args = command.args;

    let mut gate = StdioGate;
    let outcome = Dispatcher::new()
        .dispatch(request, &mut gate)
        .map_err(|err| CliError::new(t!("run.failed", error = err)))?;

    match outcome {
        DispatchOutcome::EncryptedPassthrough(_) => {
            Err(CliError::new(t!("run.encrypted_no_key")))
        }
        DispatchOutcome::Cancelled => {
            write_stderr_line(&t!("gate.cancelled"))
                .map_err(|err| CliError::new(output_error("stderr", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        DispatchOutcome::Exited {
            code, ..
        } => Ok(exit_code_from(code)),
        DispatchOutcome::Evaluated(bindings) => {
            write_stdout_line(&t!("run.evaluated", count = bindings.len()))
                .map_err(|err| CliError::new(output_error("stdout", &err)))?;
            Ok(ExitCode::SUCCESS)
        }
        DispatchOutcome::Plaintext(_) => Err(CliError::new(t!("internal.unexpected_outcome"))),
    }
}

/// Maps a child exit code onto the process exit code.
fn exit_code_from(code: i32) -> ExitCode {
    if code == 0 {
        ExitCode::SUCCESS
    } else {
        u8::try_from(code).map_or(ExitCode::FAILURE, ExitCode::from)
    }
}

// ============================================================================
// SECTION: Fetch Helpers
// ============================================================================

/// Resolves the script reference and fetches it from the configured host.
fn fetch_script(
    args: &FetchArgs,
    server: &str,
    config: Option<&ClientConfig>,
) -> CliResult<(ScriptSource, ScriptFetch)> {
    let config_user = config.and_then(|config| config.username.as_deref());
    let source = parse_script_ref(&args.script, args.user.as_deref().or(config_user))?;

    let credentials = config.map_or(Credentials::Anonymous, ClientConfig::credentials);
    let transport = HttpTransport::with_credentials(server, credentials)
        .map_err(|err| CliError::new(t!("fetch.failed", error = err)))?;

    let mut query = ScriptQuery::new(source.clone());
    query.version = args.script_version.clone();
    query.share_token = args.token.clone();

    let fetch = transport
        .fetch(&query)
        .map_err(|err| CliError::new(t!("fetch.failed", error = err)))?;
    Ok((source, fetch))
}

/// Reads the private key when the fetched script is encrypted and a key path
/// is available from the flags or the config file.
fn read_fetch_key(
    args: &FetchArgs,
    config: Option<&ClientConfig>,
    fetch: &ScriptFetch,
) -> CliResult<Option<Vec<u8>>> {
    if !fetch.metadata.encrypted {
        return Ok(None);
    }
    let config_key = config.and_then(|config| config.key_path.as_deref());
    match args.key.as_deref().or(config_key) {
        Some(path) => read_private_key(path).map(Some),
        None => Ok(None),
    }
}

/// Reads a PEM private key with a hard size limit.
fn read_private_key(path: &Path) -> CliResult<Vec<u8>> {
    let metadata = fs::metadata(path)
        .map_err(|err| CliError::new(t!("key.read_failed", path = path.display(), error = err)))?;
    if metadata.len() > MAX_KEY_BYTES {
        return Err(CliError::new(t!(
            "key.too_large",
            path = path.display(),
            size = metadata.len(),
            limit = MAX_KEY_BYTES
        )));
    }
    fs::read(path)
        .map_err(|err| CliError::new(t!("key.read_failed", path = path.display(), error = err)))
}

/// Parses `owner/script` (or a bare name plus a user) into a script source.
fn parse_script_ref(value: &str, user: Option<&str>) -> CliResult<ScriptSource> {
    if let Some((owner, name)) = value.split_once('/') {
        if owner.is_empty() || name.is_empty() || name.contains('/') {
            return Err(CliError::new(t!("script.ref_invalid", value = value)));
        }
        return Ok(ScriptSource {
            owner: owner.to_string(),
            name: name.to_string(),
        });
    }
    match user {
        Some(owner) if !owner.is_empty() && !value.is_empty() => Ok(ScriptSource {
            owner: owner.to_string(),
            name: value.to_string(),
        }),
        _ => Err(CliError::new(t!("script.ref_invalid", value = value))),
    }
}

// ============================================================================
// SECTION: Configuration Helpers
// ============================================================================

/// Loads the config file, treating a missing default file as absence.
fn load_optional_config(path: Option<&Path>) -> CliResult<Option<ClientConfig>> {
    match path {
        Some(path) => ClientConfig::load(Some(path))
            .map(Some)
            .map_err(|err| CliError::new(t!("config.load_failed", error = err))),
        None => match ClientConfig::load(None) {
            Ok(config) => Ok(Some(config)),
            Err(ConfigError::Io(_)) => Ok(None),
            Err(err) => Err(CliError::new(t!("config.load_failed", error = err))),
        },
    }
}

/// Resolves the server base URL from the flag or the config file.
fn resolve_server(flag: Option<&str>, config: Option<&ClientConfig>) -> CliResult<String> {
    if let Some(server) = flag {
        return Ok(server.to_string());
    }
    if let Some(config) = config {
        return Ok(config.server.clone());
    }
    Err(CliError::new(t!("config.server_missing")))
}

/// Resolves the CLI locale from flags or environment.
fn resolve_locale(lang: Option<LangArg>, env_lang: Option<&str>) -> CliResult<Locale> {
    if let Some(lang) = lang {
        return Ok(lang.into());
    }
    if let Some(value) = env_lang {
        return Locale::parse(value).ok_or_else(|| {
            CliError::new(t!("i18n.lang.invalid_env", env = LANG_ENV, value = value))
        });
    }
    Ok(Locale::En)
}

// ============================================================================
// SECTION: Confirmation Gate
// ============================================================================

/// Interactive yes/no gate on the process's stdio streams.
///
/// Shows the source identity and the full plaintext, then blocks on one line
/// of input. Anything other than an explicit affirmative declines.
struct StdioGate;

impl ConfirmationGate for StdioGate {
    fn confirm(&mut self, source: &ScriptSource, plaintext: &str) -> Result<bool, DispatchError> {
        write_stdout_line(&t!("gate.banner", source = source))
            .map_err(|err| DispatchError::Prompt(err.to_string()))?;
        write_stdout_line(plaintext).map_err(|err| DispatchError::Prompt(err.to_string()))?;
        write_stdout_prompt(&t!("gate.prompt"))
            .map_err(|err| DispatchError::Prompt(err.to_string()))?;
        let mut answer = String::new();
        std::io::stdin()
            .read_line(&mut answer)
            .map_err(|err| DispatchError::Prompt(err.to_string()))?;
        Ok(is_affirmative(&answer))
    }
}

/// Returns true only for an explicit yes (`y` or `yes`, case-insensitive).
fn is_affirmative(answer: &str) -> bool {
    let answer = answer.trim();
    answer.eq_ignore_ascii_case("y") || answer.eq_ignore_ascii_case("yes")
}

// ============================================================================
// SECTION: Output Helpers
// ============================================================================

/// Writes a single line to stdout.
fn write_stdout_line(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    writeln!(&mut stdout, "{message}")
}

/// Writes raw bytes to stdout without adding a newline.
fn write_stdout_bytes(bytes: &[u8]) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(bytes)
}

/// Writes a prompt to stdout without a newline and flushes it.
fn write_stdout_prompt(message: &str) -> std::io::Result<()> {
    let mut stdout = std::io::stdout();
    stdout.write_all(message.as_bytes())?;
    stdout.flush()
}

/// Writes a single line to stderr.
fn write_stderr_line(message: &str) -> std::io::Result<()> {
    let mut stderr = std::io::stderr();
    writeln!(&mut stderr, "{message}")
}

/// Formats a localized output error message.
fn output_error(stream: &str, error: &std::io::Error) -> String {
    let stream_label = match stream {
        "stdout" => t!("output.stream.stdout"),
        "stderr" => t!("output.stream.stderr"),
        _ => t!("output.stream.unknown"),
    };
    t!("output.write_failed", stream = stream_label, error = error)
}

/// Emits an error message to stderr and returns a failure exit code.
fn emit_error(message: &str) -> ExitCode {
    let _ = write_stderr_line(message);
    ExitCode::FAILURE
}
