/* src/loader/format/mod.rs */

use super::{ConfigError, Document, Format};
use serde_json::Value;

mod json;
pub use json::Json;

mod yaml;
pub use yaml::Yaml;

/// An enum wrapper for all supported formats, enabling dynamic dispatch-like behavior.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnyFormat {
	Yaml,
	Json,
}

/// Formats attempted by [`parse_document`], in order.
pub const PARSE_ORDER: [AnyFormat; 2] = [AnyFormat::Yaml, AnyFormat::Json];

impl Format for AnyFormat {
	fn name(&self) -> &'static str {
		match self {
			Self::Yaml => Yaml.name(),
			Self::Json => Json.name(),
		}
	}

	fn parse(&self, input: &[u8]) -> Result<Value, ConfigError> {
		match self {
			Self::Yaml => Yaml.parse(input),
			Self::Json => Json.parse(input),
		}
	}
}

/// Parses raw bytes into a document, trying YAML first and JSON second.
///
/// The root must be a mapping. An empty document yields an empty mapping.
pub fn parse_document(input: &[u8]) -> Result<Document, ConfigError> {
	let mut failures = Vec::with_capacity(PARSE_ORDER.len());

	for format in PARSE_ORDER {
		match format.parse(input).and_then(into_mapping) {
			Ok(document) => return Ok(document),
			Err(ConfigError::Parse(reason)) => failures.push(format!("{}: {reason}", format.name())),
			Err(e) => failures.push(e.to_string()),
		}
	}

	Err(ConfigError::Parse(format!(
		"failed to parse as YAML or JSON: {}",
		failures.join("; ")
	)))
}

fn into_mapping(value: Value) -> Result<Document, ConfigError> {
	match value {
		Value::Object(map) => Ok(map),
		Value::Null => Ok(Document::new()),
		other => Err(ConfigError::Parse(format!(
			"root must be a mapping, got {}",
			kind_of(&other)
		))),
	}
}

pub(crate) fn kind_of(value: &Value) -> &'static str {
	match value {
		Value::Null => "null",
		Value::Bool(_) => "boolean",
		Value::Number(n) if n.is_f64() => "float",
		Value::Number(_) => "integer",
		Value::String(_) => "string",
		Value::Array(_) => "sequence",
		Value::Object(_) => "mapping",
	}
}
