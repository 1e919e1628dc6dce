use std::ffi::OsString;

use clap::Parser;
use sk_core::ScriptletError;

mod cli_args;
mod commands;
mod error_map;
mod source_loader;

pub(crate) use cli_args::{CheckArgs, Cli, InspectArgs, Mode, RunArgs};
pub(crate) use commands::{run_check, run_inspect, run_run};
#[cfg(test)]
pub(crate) use commands::{format_cache_stats, format_summary, parse_bindings, value_json};
pub(crate) use error_map::{
    emit_error, map_cli_bind_invalid, map_cli_source_path, map_cli_value_json,
};
pub(crate) use source_loader::{collect_scriptlets, resolve_scriptlet_dir};

pub fn run_cli_from_args<I, T>(args: I) -> i32
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let cli = match Cli::try_parse_from(args) {
        Ok(cli) => cli,
        Err(error) => return error.exit_code(),
    };
    match run(cli) {
        Ok(code) => code,
        Err(error) => emit_error(error),
    }
}

fn run(cli: Cli) -> Result<i32, ScriptletError> {
    match cli.command {
        Mode::Run(args) => run_run(args),
        Mode::Inspect(args) => run_inspect(args),
        Mode::Check(args) => run_check(args),
    }
}
