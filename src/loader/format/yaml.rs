use super::super::{ConfigError, Format};
use serde::Deserialize;
use serde_json::Value;

/// YAML format parser using `serde_yaml`.
pub struct Yaml;

impl Format for Yaml {
    fn name(&self) -> &'static str {
        "yaml"
    }

    /// Parses the first document of the stream. A stream with no documents
    /// (empty, or comments only) is `null`.
    fn parse(&self, input: &[u8]) -> Result<Value, ConfigError> {
        match serde_yaml::Deserializer::from_slice(input).next() {
            Some(document) => {
                Value::deserialize(document).map_err(|e| ConfigError::Parse(e.to_string()))
            }
            None => Ok(Value::Null),
        }
    }
}
