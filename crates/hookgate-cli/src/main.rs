use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

mod commands;
mod settings;

use commands::logs::LogsArgs;
use settings::Settings;

#[derive(Parser, Debug)]
#[command(
    name = "hookgate",
    version,
    about = "Safety gate and event log for coding-agent lifecycle hooks"
)]
struct Cli {
    /// Configuration file (YAML or TOML). Defaults to ./hookgate.yaml when present.
    #[arg(long, global = true, env = "HOOKGATE_CONFIG")]
    config: Option<PathBuf>,

    /// Log directory, overriding logging.directory from the configuration
    #[arg(long = "log-dir", global = true, env = "HOOKGATE_LOG_DIR")]
    log_dir: Option<PathBuf>,

    #[command(subcommand)]
    cmd: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Handle one lifecycle event; the hook JSON is read from stdin.
    ///
    /// For PreToolUse, exits with code 2 when the action is blocked.
    Hook {
        /// Event name (SessionStart, SessionStop, PreToolUse, PostToolUse, SubagentStop, UserPromptSubmit)
        event: String,

        /// Report the decision as JSON on stdout instead of an exit code
        #[arg(long, default_value_t = false)]
        json: bool,
    },

    /// Query recorded events
    Logs(LogsArgs),

    /// Inspect and try out rules
    Rules {
        #[command(subcommand)]
        cmd: RulesCommand,
    },

    /// Validate the configuration file
    Check,

    /// Write a starter configuration file
    Init {
        /// Where to write the configuration
        #[arg(long, default_value = "hookgate.yaml")]
        output: PathBuf,

        /// Overwrite an existing file
        #[arg(long, default_value_t = false)]
        force: bool,
    },
}

#[derive(Subcommand, Debug)]
enum RulesCommand {
    /// List the effective rules in evaluation order
    List {
        /// Show patterns and exclusions
        #[arg(long, short, default_value_t = false)]
        verbose: bool,
    },

    /// Evaluate an action against the rules without recording it
    Test {
        /// Tool name, e.g. Bash
        #[arg(long, required_unless_present = "prompt")]
        tool: Option<String>,

        /// Tool parameter as key=value (repeatable)
        #[arg(long = "param", value_parser = commands::rules::parse_param)]
        params: Vec<(String, String)>,

        /// Evaluate a submitted prompt instead of a tool call
        #[arg(long, conflicts_with_all = ["tool", "params"])]
        prompt: Option<String>,
    },
}

fn main() -> anyhow::Result<ExitCode> {
    // stdout is reserved for hook responses and reports
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .init();

    let cli = Cli::parse();
    let settings = Settings::new(cli.config, cli.log_dir);

    match cli.cmd {
        Command::Hook { event, json } => return commands::hook::run(&settings, &event, json),

        Command::Logs(args) => commands::logs::run(&settings, &args)?,

        Command::Rules { cmd } => match cmd {
            RulesCommand::List { verbose } => commands::rules::list(&settings, verbose)?,
            RulesCommand::Test { tool, params, prompt } => {
                let action = commands::rules::test_action(tool, params, prompt);
                commands::rules::test(&settings, &action)?
            }
        },

        Command::Check => commands::check::run(settings.config_path())?,

        Command::Init { output, force } => commands::init::run(&output, force)?,
    }

    Ok(ExitCode::SUCCESS)
}
