use clap::Args;
use std::path::PathBuf;

#[derive(Args)]
pub struct ValidateArgs {
    /// Workflow definition file (JSON or YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct RunArgs {
    /// Workflow definition file (JSON or YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,

    /// Initial input payload as inline JSON (default: {})
    #[arg(long, value_name = "JSON")]
    pub input: Option<String>,

    /// Directory for persisted execution state (default from weft.toml)
    #[arg(long, value_name = "DIR", help_heading = "State")]
    pub state_dir: Option<PathBuf>,

    /// Answer every human task with an empty payload instead of prompting
    #[arg(long, help_heading = "Human Tasks")]
    pub yes: bool,
}

#[derive(Args)]
pub struct DotArgs {
    /// Workflow definition file (JSON or YAML)
    #[arg(value_name = "FILE")]
    pub file: PathBuf,
}

#[derive(Args)]
pub struct ExecutionsArgs {
    /// Directory holding persisted execution state (default from weft.toml)
    #[arg(long, value_name = "DIR")]
    pub state_dir: Option<PathBuf>,
}
