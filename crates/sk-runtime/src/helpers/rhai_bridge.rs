use std::collections::BTreeMap;
use std::path::Path;

use rhai::{Array, Dynamic, EvalAltResult, ImmutableString, Map, Position, FLOAT, INT};
use sk_core::{ScriptletError, SkValue, VALUE_UNSUPPORTED};

pub fn skvalue_to_dynamic(value: &SkValue) -> Dynamic {
    match value {
        SkValue::Null => Dynamic::UNIT,
        SkValue::Bool(value) => Dynamic::from_bool(*value),
        SkValue::Integer(value) => Dynamic::from_int(*value as INT),
        SkValue::Number(value) => Dynamic::from_float(*value as FLOAT),
        SkValue::String(value) => Dynamic::from(value.clone()),
        SkValue::Array(values) => {
            Dynamic::from_array(values.iter().map(skvalue_to_dynamic).collect::<Array>())
        }
        SkValue::Map(values) => {
            let mut map = Map::new();
            for (key, value) in values {
                map.insert(key.as_str().into(), skvalue_to_dynamic(value));
            }
            Dynamic::from_map(map)
        }
    }
}

pub fn dynamic_to_skvalue(value: Dynamic) -> Result<SkValue, ScriptletError> {
    if value.is_unit() {
        return Ok(SkValue::Null);
    }
    if value.is::<bool>() {
        return Ok(SkValue::Bool(value.cast::<bool>()));
    }
    if value.is::<INT>() {
        return Ok(SkValue::Integer(value.cast::<INT>() as i64));
    }
    if value.is::<FLOAT>() {
        return Ok(SkValue::Number(value.cast::<FLOAT>()));
    }
    if value.is::<ImmutableString>() {
        return Ok(SkValue::String(value.cast::<ImmutableString>().to_string()));
    }
    if value.is::<char>() {
        return Ok(SkValue::String(value.cast::<char>().to_string()));
    }
    if value.is::<Array>() {
        let array = value.cast::<Array>();
        let mut out = Vec::with_capacity(array.len());
        for item in array {
            out.push(dynamic_to_skvalue(item)?);
        }
        return Ok(SkValue::Array(out));
    }
    if value.is::<Map>() {
        let map = value.cast::<Map>();
        let mut out = BTreeMap::new();
        for (key, value) in map {
            out.insert(key.to_string(), dynamic_to_skvalue(value)?);
        }
        return Ok(SkValue::Map(out));
    }

    Err(ScriptletError::new(
        VALUE_UNSUPPORTED,
        format!("Value of type \"{}\" has no plain data form.", value.type_name()),
    ))
}

/// Carries a loader error through Rhai so it can be recovered unchanged.
pub(crate) fn into_eval_error(error: ScriptletError) -> Box<EvalAltResult> {
    Box::new(EvalAltResult::ErrorRuntime(Dynamic::from(error), Position::NONE))
}

pub(crate) fn scriptlet_error_from_eval(error: &EvalAltResult) -> Option<ScriptletError> {
    match error {
        EvalAltResult::ErrorRuntime(value, _) => value.clone().try_cast::<ScriptletError>(),
        EvalAltResult::ErrorInFunctionCall(_, _, inner, _) => scriptlet_error_from_eval(inner),
        EvalAltResult::ErrorInModule(_, inner, _) => scriptlet_error_from_eval(inner),
        _ => None,
    }
}

pub(crate) fn map_eval_error(code: &str, path: &Path, error: &EvalAltResult) -> ScriptletError {
    scriptlet_error_from_eval(error).unwrap_or_else(|| {
        ScriptletError::new(code, format!("{}: {}", path.display(), error))
    })
}
