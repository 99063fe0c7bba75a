/* src/validate/classify.rs */

//!
//! Turns a decoder error message into structured diagnostics.
//!
//! The descriptor walk catches most problems before decoding. What reaches this
//! module is whatever the strict decode still rejected, available only as text.

use super::schema::{SchemaFieldIndex, join_path};
use super::suggest::{MAX_DISTANCE, find_similar};
use super::{FieldError, ValidationResult};

const INVALID_KEYS: &str = "has invalid keys:";
const UNKNOWN_FIELD: &str = "unknown field";
const TYPE_MARKERS: [&str; 5] = [
	"expected",
	"cannot unmarshal",
	"cannot decode",
	"invalid type",
	"invalid value",
];

pub(crate) fn classify(message: &str, index: &SchemaFieldIndex, result: &mut ValidationResult) {
	let before = result.error_count();

	if let Some(keys) = unknown_keys(message) {
		for (parent, key) in keys {
			let path = join_path(&parent, &key);
			// The decoder's view of nesting can disagree with the catalog; trust the catalog.
			if index.contains(&path) {
				continue;
			}
			let suggestions = find_similar(&key, index.names(), MAX_DISTANCE);
			result.unknown_fields.push(FieldError::unknown(path, suggestions));
		}
	} else if has_quote(message) && TYPE_MARKERS.iter().any(|m| message.contains(m)) {
		let field = first_quoted(message).unwrap_or_else(|| "unknown".to_string());
		result
			.type_errors
			.push(FieldError::type_mismatch(field, message.to_string()));
	} else if message.contains("unused") || message.contains("unknown") {
		result
			.unknown_fields
			.push(FieldError::generic(message.to_string()));
	} else {
		result.type_errors.push(FieldError::generic(message.to_string()));
	}

	if result.error_count() == before {
		result.type_errors.push(FieldError::generic(message.to_string()));
	}
}

/// Extracts `(parent, key)` pairs from an unknown-key message, if it is one.
fn unknown_keys(message: &str) -> Option<Vec<(String, String)>> {
	if let Some(at) = message.find(INVALID_KEYS) {
		let parent = last_single_quoted(&message[..at]).unwrap_or_default();
		let keys = message[at + INVALID_KEYS.len()..]
			.split(',')
			.map(|k| k.trim().trim_matches(|c| c == '\'' || c == '`' || c == '"'))
			.filter(|k| !k.is_empty())
			.map(|k| (parent.clone(), k.to_string()))
			.collect();
		return Some(keys);
	}

	if message.contains(UNKNOWN_FIELD) {
		let key = first_quoted(message)?;
		return Some(vec![(String::new(), key)]);
	}

	None
}

fn has_quote(message: &str) -> bool {
	message.contains('\'') || message.contains('`')
}

/// First token enclosed in backticks or single quotes.
fn first_quoted(message: &str) -> Option<String> {
	let start = message.find(['`', '\''])?;
	let quote = message[start..].chars().next()?;
	let rest = &message[start + 1..];
	let end = rest.find(quote)?;
	Some(rest[..end].to_string())
}

fn last_single_quoted(message: &str) -> Option<String> {
	let end = message.rfind('\'')?;
	let start = message[..end].rfind('\'')?;
	Some(message[start + 1..end].to_string())
}
