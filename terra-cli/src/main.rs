//! Terra CLI - publish events and inspect handler configuration.
//!
//! # Commands
//!
//! - `terra send-event --action <ACTION> [--kwargs key:value]...` - Dispatch one event
//! - `terra handlers [--action <ACTION>]` - List configured handlers
//! - `terra check-condition <EXPR> [--kwargs key:value]...` - Evaluate a condition
//! - `terra completions <shell>` - Generate shell completions

use clap::{Args, CommandFactory, Parser, Subcommand};
use clap_complete::{Shell, generate};
use colored::Colorize;
use std::io;
use std::path::PathBuf;
use terra_log::{Level, LogConfig};

mod commands;
mod error;
mod kwargs;
mod runtime;

use commands::{check_condition, handlers, send_event};
use error::CliResult;
use runtime::Runtime;

/// Terra CLI - event dispatch tools
#[derive(Parser)]
#[command(name = "terra")]
#[command(version)]
#[command(about = "Publish Terra events and inspect the handlers attached to them")]
#[command(long_about = None)]
#[command(propagate_version = true)]
#[command(after_help = format!(
    "{}\n  {} terra send-event --action REQUEST_APPROVED --instance request:42 --kwargs layer:roads\n  {} terra handlers --action REQUEST_APPROVED\n  {} terra check-condition \"status == 'approved'\" --kwargs status:approved",
    "Examples:".bright_cyan().bold(),
    "$".dimmed(),
    "$".dimmed(),
    "$".dimmed(),
))]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Settings file (TOML or JSON)
    #[arg(short, long, global = true, env = "TERRA_CONFIG")]
    config: Option<PathBuf>,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true)]
    quiet: bool,
}

#[derive(Subcommand)]
enum Commands {
    /// Publish an event to every handler configured for its action
    #[command(alias = "send")]
    SendEvent(SendEventArgs),

    /// List configured handlers
    #[command(alias = "h")]
    Handlers {
        /// Only show handlers for this action
        #[arg(short, long)]
        action: Option<String>,

        /// Print the rows as JSON
        #[arg(long)]
        json: bool,
    },

    /// Evaluate a condition expression against kwargs
    #[command(alias = "check")]
    CheckCondition {
        /// Condition expression, e.g. "status == 'approved'"
        expr: String,

        /// Variable as key:value (repeatable)
        #[arg(long = "kwargs", value_name = "KEY:VALUE")]
        kwargs: Vec<String>,
    },

    /// Generate shell completions
    Completions {
        /// The shell to generate completions for
        #[arg(value_enum)]
        shell: Shell,
    },
}

#[derive(Args)]
struct SendEventArgs {
    /// Action name, e.g. REQUEST_APPROVED
    #[arg(short, long)]
    action: Option<String>,

    /// Sender recorded on the event
    #[arg(short, long)]
    sender: Option<String>,

    /// Instance the event is about, as `id` or `model:id`
    #[arg(short, long)]
    instance: Option<String>,

    /// Acting user, as an id or an email address
    #[arg(short, long)]
    user: Option<String>,

    /// Extra event data as key:value (repeatable)
    #[arg(long = "kwargs", value_name = "KEY:VALUE")]
    kwargs: Vec<String>,

    /// Print the dispatch report as JSON
    #[arg(long)]
    json: bool,
}

impl From<SendEventArgs> for send_event::EventArgs {
    fn from(args: SendEventArgs) -> Self {
        Self {
            action: args.action,
            sender: args.sender,
            instance: args.instance,
            user: args.user,
            kwargs: args.kwargs,
        }
    }
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    if cli.no_color {
        colored::control::set_override(false);
    }

    let mut log = LogConfig::from_env();
    if cli.verbose {
        log = log.with_level(Level::Debug);
    } else if cli.quiet {
        log = log.with_level(Level::Error);
    }
    if cli.no_color {
        log.color = false;
    }
    terra_log::init_with(log);

    if let Err(e) = run(cli).await {
        eprintln!("\n  {} {}\n", "Error:".red().bold(), e);
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> CliResult<()> {
    let config = cli.config.as_deref();

    match cli.command {
        Commands::SendEvent(args) => {
            let json = args.json;
            let runtime = Runtime::load(config)?;
            send_event::execute(&runtime, args.into(), json, cli.quiet).await
        }
        Commands::Handlers { action, json } => {
            let runtime = Runtime::load(config)?;
            handlers::execute(&runtime.bus, action.as_deref(), json)
        }
        Commands::CheckCondition { expr, kwargs } => {
            let settings = runtime::load_settings(config)?;
            check_condition::execute(&settings.events, &expr, &kwargs)
        }
        Commands::Completions { shell } => {
            let mut cmd = Cli::command();
            let name = cmd.get_name().to_string();
            generate(shell, &mut cmd, name, &mut io::stdout());
            Ok(())
        }
    }
}
