//! Custom scalar codecs.
//!
//! A custom scalar travels over the wire as its alias type (for example a
//! `DateTime` as a `String`). A codec converts between the wire value and the
//! value callers work with: `serialize` runs on outgoing variables, `parse`
//! on incoming response data.

use std::fmt;
use std::sync::Arc;

use serde_json::Value;

type ConvertFn = dyn Fn(Value) -> Result<Value, String> + Send + Sync;

/// Conversion functions for one custom scalar. Missing functions pass values through.
#[derive(Clone, Default)]
pub struct ScalarCodec {
    parse: Option<Arc<ConvertFn>>,
    serialize: Option<Arc<ConvertFn>>,
}

impl ScalarCodec {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the wire → caller conversion.
    #[must_use]
    pub fn parse<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.parse = Some(Arc::new(f));
        self
    }

    /// Sets the caller → wire conversion.
    #[must_use]
    pub fn serialize<F>(mut self, f: F) -> Self
    where
        F: Fn(Value) -> Result<Value, String> + Send + Sync + 'static,
    {
        self.serialize = Some(Arc::new(f));
        self
    }

    /// Converts a response value.
    pub fn parse_value(&self, value: Value) -> Result<Value, String> {
        match &self.parse {
            Some(f) => f(value),
            None => Ok(value),
        }
    }

    /// Converts a variable value.
    pub fn serialize_value(&self, value: Value) -> Result<Value, String> {
        match &self.serialize {
            Some(f) => f(value),
            None => Ok(value),
        }
    }
}

impl fmt::Debug for ScalarCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScalarCodec")
            .field("parse", &self.parse.is_some())
            .field("serialize", &self.serialize.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_passthrough_without_functions() {
        let codec = ScalarCodec::new();
        assert_eq!(codec.parse_value(json!("x")), Ok(json!("x")));
        assert_eq!(codec.serialize_value(json!(1)), Ok(json!(1)));
    }

    #[test]
    fn test_functions_applied() {
        let codec = ScalarCodec::new()
            .parse(|v| Ok(json!({ "wrapped": v })))
            .serialize(|v| match v {
                Value::Object(mut map) => map.remove("wrapped").ok_or_else(|| "no value".into()),
                other => Err(format!("expected an object, got {other}")),
            });
        let parsed = codec.parse_value(json!("2024-01-01")).unwrap();
        assert_eq!(parsed, json!({ "wrapped": "2024-01-01" }));
        assert_eq!(codec.serialize_value(parsed), Ok(json!("2024-01-01")));
        assert!(codec.serialize_value(json!(3)).is_err());
    }
}
