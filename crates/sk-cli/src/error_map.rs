use sk_core::ScriptletError;
use std::fmt::Display;

fn map_error(code: &'static str, error: impl Display) -> ScriptletError {
    ScriptletError::new(code, error.to_string())
}

pub(crate) fn emit_error(error: ScriptletError) -> i32 {
    println!("RESULT:ERROR");
    println!("ERROR_CODE:{}", error.code);
    println!(
        "ERROR_MSG_JSON:{}",
        serde_json::to_string(&error.message).expect("string json")
    );
    1
}

pub(crate) fn map_cli_bind_invalid(error: serde_json::Error) -> ScriptletError {
    map_error("CLI_BIND_INVALID", error)
}

pub(crate) fn map_cli_source_path(error: std::io::Error) -> ScriptletError {
    map_error("CLI_SOURCE_PATH", error)
}

pub(crate) fn map_cli_value_json(error: serde_json::Error) -> ScriptletError {
    map_error("CLI_VALUE_JSON", error)
}

#[cfg(test)]
mod error_map_tests {
    use super::*;

    #[test]
    fn emit_error_returns_non_zero_exit_code() {
        let code = emit_error(ScriptletError::new("ERR", "failed"));
        assert_eq!(code, 1);
    }

    #[test]
    fn mapping_helpers_keep_error_codes() {
        let invalid = serde_json::from_str::<serde_json::Value>("{").expect_err("invalid json");
        assert_eq!(map_cli_bind_invalid(invalid).code, "CLI_BIND_INVALID");
        assert_eq!(
            map_cli_source_path(std::io::Error::other("path")).code,
            "CLI_SOURCE_PATH"
        );
        let invalid = serde_json::from_str::<serde_json::Value>("[").expect_err("invalid json");
        assert_eq!(map_cli_value_json(invalid).code, "CLI_VALUE_JSON");
    }
}
