use clap::{Args, Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "sk-cli")]
#[command(about = "Scriptlet loader CLI")]
pub(crate) struct Cli {
    #[command(subcommand)]
    pub(crate) command: Mode,
}

#[derive(Debug, Subcommand)]
pub(crate) enum Mode {
    /// Load a scriptlet and print its value
    Run(RunArgs),
    /// Print the dependencies a scriptlet declares
    Inspect(InspectArgs),
    /// Compile every scriptlet under a directory
    Check(CheckArgs),
}

#[derive(Debug, Args)]
pub(crate) struct RunArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
    #[arg(long = "cache", default_value = "none")]
    pub(crate) cache: String,
    #[arg(long = "bind")]
    pub(crate) bind: Vec<String>,
    #[arg(long = "repeat", default_value_t = 1)]
    pub(crate) repeat: usize,
}

#[derive(Debug, Args)]
pub(crate) struct InspectArgs {
    #[arg(long = "script")]
    pub(crate) script: String,
}

#[derive(Debug, Args)]
pub(crate) struct CheckArgs {
    #[arg(long = "dir")]
    pub(crate) dir: String,
}
