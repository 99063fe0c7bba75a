/* src/loader/format/json.rs */

use super::super::{ConfigError, Format};
use serde_json::Value;

/// JSON format parser using `serde_json`.
pub struct Json;

impl Format for Json {
	fn name(&self) -> &'static str {
		"json"
	}

	fn parse(&self, input: &[u8]) -> Result<Value, ConfigError> {
		serde_json::from_slice(input).map_err(|e| ConfigError::Parse(e.to_string()))
	}
}
