use std::collections::BTreeMap;

use sk_api::{inspect_scriptlet, run_scriptlet_with, RunScriptletOptions, ScriptletSummary};
use sk_core::{CachePolicy, CacheStats, ScriptletError, SkValue};
use sk_runtime::ScriptletLoader;
use tracing::{debug, info};

use crate::{
    collect_scriptlets, map_cli_bind_invalid, map_cli_value_json, resolve_scriptlet_dir,
    CheckArgs, InspectArgs, RunArgs,
};

pub(crate) fn run_run(args: RunArgs) -> Result<i32, ScriptletError> {
    let bindings = parse_bindings(&args.bind)?;
    let cache_policy = CachePolicy::parse(&args.cache);
    let options = RunScriptletOptions {
        bindings,
        cache_policy,
    };
    let loader = ScriptletLoader::default();

    let mut value = SkValue::Null;
    for round in 0..args.repeat.max(1) {
        debug!(round, script = %args.script, policy = %cache_policy, "running scriptlet");
        value = run_scriptlet_with(&loader, &args.script, options.clone())?;
    }

    println!("RESULT:OK");
    println!("VALUE_JSON:{}", value_json(&value)?);
    println!("{}", format_cache_stats(cache_policy, loader.cache_stats()));
    Ok(0)
}

pub(crate) fn run_inspect(args: InspectArgs) -> Result<i32, ScriptletError> {
    let summary = inspect_scriptlet(&args.script, CachePolicy::None)?;

    println!("RESULT:OK");
    for line in format_summary(&summary)? {
        println!("{}", line);
    }
    Ok(0)
}

pub(crate) fn run_check(args: CheckArgs) -> Result<i32, ScriptletError> {
    let root = resolve_scriptlet_dir(&args.dir)?;
    let files = collect_scriptlets(&root)?;
    let loader = ScriptletLoader::default();
    for file in &files {
        loader.compile(file)?;
    }
    info!(count = files.len(), root = %root.display(), "checked scriptlets");

    println!("RESULT:OK");
    println!("CHECKED:{}", files.len());
    Ok(0)
}

pub(crate) fn parse_bindings(raw: &[String]) -> Result<BTreeMap<String, SkValue>, ScriptletError> {
    let mut bindings = BTreeMap::new();
    for entry in raw {
        let Some((name, json)) = entry.split_once('=') else {
            return Err(ScriptletError::new(
                "CLI_BIND_INVALID",
                format!("Binding \"{}\" must look like name=json.", entry),
            ));
        };
        let name = name.trim();
        if name.is_empty() {
            return Err(ScriptletError::new(
                "CLI_BIND_INVALID",
                format!("Binding \"{}\" has an empty name.", entry),
            ));
        }
        let value = serde_json::from_str::<SkValue>(json).map_err(map_cli_bind_invalid)?;
        bindings.insert(name.to_string(), value);
    }
    Ok(bindings)
}

pub(crate) fn value_json(value: &SkValue) -> Result<String, ScriptletError> {
    serde_json::to_string(value).map_err(map_cli_value_json)
}

pub(crate) fn format_summary(summary: &ScriptletSummary) -> Result<Vec<String>, ScriptletError> {
    let mut lines = Vec::with_capacity(summary.dependencies.len() + 1);
    for dependency in &summary.dependencies {
        let encoded = serde_json::to_string(dependency).map_err(map_cli_value_json)?;
        lines.push(format!("DEP_JSON:{}", encoded));
    }
    let factory = if summary.invocable { "fn" } else { "value" };
    lines.push(format!("FACTORY:{}", factory));
    Ok(lines)
}

pub(crate) fn format_cache_stats(policy: CachePolicy, stats: CacheStats) -> String {
    format!(
        "CACHE:policy={} hits={} misses={} compiles={}",
        policy, stats.hits, stats.misses, stats.compiles
    )
}
