/* src/validate/walk.rs */

use serde_json::{Map, Number, Value};

use super::schema::{FieldKind, SchemaDescriptor, SchemaFieldIndex, join_path};
use super::suggest::{MAX_DISTANCE, find_similar};
use super::{FieldError, ValidationResult};
use crate::loader::format::kind_of;

/// Checks every key and value of `document` against `descriptor`.
pub(crate) fn check(
	document: &Map<String, Value>,
	descriptor: &SchemaDescriptor,
	index: &SchemaFieldIndex,
	result: &mut ValidationResult,
) {
	Walker { index, result }.check_struct(document, descriptor, "");
}

struct Walker<'a> {
	index: &'a SchemaFieldIndex,
	result: &'a mut ValidationResult,
}

impl Walker<'_> {
	fn check_struct(&mut self, map: &Map<String, Value>, descriptor: &SchemaDescriptor, path: &str) {
		for (key, value) in map {
			let field_path = join_path(path, key);
			match descriptor.get(key) {
				Some(spec) => {
					if let Some(note) = &spec.deprecated {
						self.result
							.warnings
							.push(FieldError::deprecated(field_path.clone(), note));
					}
					self.check_value(value, &spec.kind, &field_path);
				}
				None => {
					// Siblings first so they win ties against names from other levels.
					let candidates = descriptor.names().chain(self.index.names());
					let suggestions = find_similar(key, candidates, MAX_DISTANCE);
					self.result
						.unknown_fields
						.push(FieldError::unknown(field_path, suggestions));
				}
			}
		}
	}

	fn check_value(&mut self, value: &Value, kind: &FieldKind, path: &str) {
		match (kind, value) {
			(_, Value::Null) | (FieldKind::Any, _) => {}
			(FieldKind::String, Value::String(_)) => {}
			(FieldKind::Integer, Value::Number(n)) if !n.is_f64() => {}
			(FieldKind::Float, Value::Number(_)) => {}
			(FieldKind::Bool, Value::Bool(_)) => {}
			(FieldKind::Integer | FieldKind::Float | FieldKind::Bool, Value::String(s))
				if coerce_scalar(kind, s).is_some() => {}
			(FieldKind::List(inner), Value::Array(items)) => {
				for (i, item) in items.iter().enumerate() {
					self.check_value(item, inner, &join_path(path, &i.to_string()));
				}
			}
			(FieldKind::Map(inner), Value::Object(map)) => {
				for (key, item) in map {
					self.check_value(item, inner, &join_path(path, key));
				}
			}
			(FieldKind::Struct(nested), Value::Object(map)) => self.check_struct(map, nested, path),
			_ => self.result.type_errors.push(FieldError::type_mismatch(
				path.to_string(),
				format!("expected {}, got {}", kind.name(), describe(value)),
			)),
		}
	}
}

fn describe(value: &Value) -> String {
	match value {
		Value::String(s) => format!("string {s:?}"),
		Value::Number(n) => format!("{} {n}", kind_of(value)),
		Value::Bool(b) => format!("boolean {b}"),
		other => kind_of(other).to_string(),
	}
}

fn coerce_scalar(kind: &FieldKind, raw: &str) -> Option<Value> {
	let raw = raw.trim();
	match kind {
		FieldKind::Integer => raw
			.parse::<i64>()
			.map(Value::from)
			.or_else(|_| raw.parse::<u64>().map(Value::from))
			.ok(),
		FieldKind::Float => raw
			.parse::<f64>()
			.ok()
			.and_then(Number::from_f64)
			.map(Value::Number),
		FieldKind::Bool => raw.parse::<bool>().ok().map(Value::Bool),
		_ => None,
	}
}

/// Returns a copy of `document` with numeric and boolean strings converted to the
/// declared scalar type. Environment expansion always produces strings.
pub(crate) fn coerce(document: &Map<String, Value>, descriptor: &SchemaDescriptor) -> Map<String, Value> {
	let mut out = document.clone();
	coerce_struct(&mut out, descriptor);
	out
}

fn coerce_struct(map: &mut Map<String, Value>, descriptor: &SchemaDescriptor) {
	for (key, value) in map.iter_mut() {
		if let Some(spec) = descriptor.get(key) {
			coerce_value(value, &spec.kind);
		}
	}
}

fn coerce_value(value: &mut Value, kind: &FieldKind) {
	match (kind, value) {
		(FieldKind::Integer | FieldKind::Float | FieldKind::Bool, value) => {
			let coerced = match value {
				Value::String(s) => coerce_scalar(kind, s),
				_ => None,
			};
			if let Some(coerced) = coerced {
				*value = coerced;
			}
		}
		(FieldKind::List(inner), Value::Array(items)) => {
			for item in items {
				coerce_value(item, inner);
			}
		}
		(FieldKind::Map(inner), Value::Object(map)) => {
			for item in map.values_mut() {
				coerce_value(item, inner);
			}
		}
		(FieldKind::Struct(nested), Value::Object(map)) => coerce_struct(map, nested),
		_ => {}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use serde_json::json;

	fn descriptor() -> SchemaDescriptor {
		SchemaDescriptor::new()
			.field("port", FieldKind::Integer)
			.field("ratio", FieldKind::Float)
			.field("debug", FieldKind::Bool)
			.field("hosts", FieldKind::list(FieldKind::String))
			.field("limits", FieldKind::map(FieldKind::Integer))
	}

	fn run(value: Value) -> ValidationResult {
		let Value::Object(map) = value else { unreachable!() };
		let descriptor = descriptor();
		let index = SchemaFieldIndex::from_descriptor(&descriptor);
		let mut result = ValidationResult::default();
		check(&map, &descriptor, &index, &mut result);
		result
	}

	#[test]
	fn list_elements_are_checked_with_index_paths() {
		let result = run(json!({"hosts": ["a", 2, "c"]}));
		assert_eq!(result.type_errors.len(), 1);
		assert_eq!(result.type_errors[0].field, "hosts.1");
		assert_eq!(result.type_errors[0].message, "expected string, got integer 2");
	}

	#[test]
	fn map_values_are_checked() {
		let result = run(json!({"limits": {"cpu": 2, "mem": "lots"}}));
		assert_eq!(result.type_errors.len(), 1);
		assert_eq!(result.type_errors[0].field, "limits.mem");
	}

	#[test]
	fn float_rejected_for_integer() {
		let result = run(json!({"port": 80.5}));
		assert_eq!(result.type_errors[0].message, "expected integer, got float 80.5");
	}

	#[test]
	fn nulls_are_accepted() {
		assert!(run(json!({"port": null, "hosts": null})).is_valid());
	}

	#[test]
	fn coerces_expanded_strings() {
		let Value::Object(map) = json!({
			"port": " 8080 ",
			"ratio": "0.25",
			"debug": "true",
			"hosts": ["10"],
			"limits": {"cpu": "4"},
		}) else {
			unreachable!()
		};
		let out = coerce(&map, &descriptor());
		assert_eq!(out["port"], 8080);
		assert_eq!(out["ratio"], 0.25);
		assert_eq!(out["debug"], true);
		assert_eq!(out["hosts"], json!(["10"]));
		assert_eq!(out["limits"]["cpu"], 4);
	}
}
