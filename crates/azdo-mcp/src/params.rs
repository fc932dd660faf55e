//! Argument parsing shared by the tool modules.

use azdo_core::{Error, Result};
use serde::de::DeserializeOwned;
use serde_json::Value;

/// Deserialize tool arguments into a params struct.
///
/// Serde applies field defaults; a missing or mistyped field is reported as
/// a validation error naming the field.
pub fn parse_args<T: DeserializeOwned>(args: Value) -> Result<T> {
    let args = match args {
        Value::Null => Value::Object(Default::default()),
        other => other,
    };
    serde_json::from_value(args).map_err(|e| Error::Validation(e.to_string()))
}

/// Fail with a validation error unless `condition` holds.
pub fn ensure(condition: bool, message: impl FnOnce() -> String) -> Result<()> {
    if condition {
        Ok(())
    } else {
        Err(Error::Validation(message()))
    }
}

pub fn default_true() -> bool {
    true
}
