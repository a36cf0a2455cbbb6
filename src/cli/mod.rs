pub mod args;
pub mod commands;

pub use args::{DotArgs, ExecutionsArgs, RunArgs, ValidateArgs};
use clap::{Parser, Subcommand};

const HELP_TEMPLATE: &str = "\
{name} {version}\n\
{about-with-newline}\n\
USAGE:\n    {usage}\n\
\nOPTIONS:\n{options}\n\
WORKFLOW COMMANDS:\n{subcommands}\n";

#[derive(Parser)]
#[command(name = "weft")]
#[command(version = crate::VERSION)]
#[command(about = "Workflow graph execution engine with human-in-the-loop suspension")]
#[command(help_template = HELP_TEMPLATE)]
#[command(
    after_long_help = "Typical flow: validate a workflow file, run it, answer human tasks as they suspend, then inspect persisted executions."
)]
pub struct Args {
    /// Default log level when RUST_LOG is unset (trace, debug, info, warn, error)
    #[arg(long, global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    #[command(
        about = "Validate a workflow definition",
        long_about = "Validate runs every structural check (single START, END presence, reachability, decision handles) and reports all failures at once.",
        after_help = "Example:\n    weft validate workflows/order.json"
    )]
    Validate(ValidateArgs),
    #[command(
        about = "Run a workflow to completion",
        long_about = "Run drives an execution with the built-in echo executor, prompting on stdin whenever the workflow suspends on a HUMAN node, and persists state after every transition.",
        after_help = "Example:\n    weft run workflows/order.json --input '{\"amount\": 250}'"
    )]
    Run(RunArgs),
    #[command(
        about = "Render a workflow as Graphviz DOT",
        long_about = "Dot prints the workflow graph in Graphviz DOT format for rendering with external tooling.",
        after_help = "Example:\n    weft dot workflows/order.json | dot -Tsvg > order.svg"
    )]
    Dot(DotArgs),
    #[command(
        about = "List persisted executions",
        long_about = "Executions scans the state directory and lists every persisted execution with its status and start time, newest first.",
        after_help = "Example:\n    weft executions --state-dir .weft/state"
    )]
    Executions(ExecutionsArgs),
}

pub async fn run(args: Args) -> crate::Result<()> {
    match args.command {
        Command::Validate(validate_args) => commands::validate(validate_args).await,
        Command::Run(run_args) => commands::run(run_args).await,
        Command::Dot(dot_args) => commands::dot(dot_args).await,
        Command::Executions(executions_args) => commands::executions(executions_args).await,
    }
}
