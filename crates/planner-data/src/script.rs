//! Pulls data literals out of legacy script files.
//!
//! Each file assigns one JSON-compatible literal to a named variable, e.g.
//! `var AvatarInfo = {...};`. The literal is read with a streaming
//! deserializer so whatever follows it (a semicolon, more statements) is
//! ignored. Nothing is evaluated.

use crate::DataError;
use regex::Regex;
use serde::de::DeserializeOwned;

/// Decode the literal assigned to `name` in `script`.
pub fn extract_variable<T: DeserializeOwned>(script: &str, name: &str) -> Result<T, DataError> {
    let pattern = format!(
        r"(?m)(?:^|[;\s])(?:var|let|const)\s+{}\s*=\s*",
        regex::escape(name)
    );
    let re = Regex::new(&pattern).map_err(|e| DataError::Decode {
        context: name.to_string(),
        message: e.to_string(),
    })?;
    let found = re
        .find(script)
        .ok_or_else(|| DataError::ScriptVariable(name.to_string()))?;
    let rest = &script[found.end()..];

    let mut values = serde_json::Deserializer::from_str(rest).into_iter::<T>();
    match values.next() {
        Some(Ok(value)) => Ok(value),
        Some(Err(e)) => Err(DataError::Decode {
            context: format!("script variable `{name}`"),
            message: e.to_string(),
        }),
        None => Err(DataError::ScriptVariable(name.to_string())),
    }
}
