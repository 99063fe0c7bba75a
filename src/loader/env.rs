/* src/loader/env.rs */

//!
//! Environment variable expansion over parsed documents.
//!
//! Three reference forms are recognized in string leaves:
//!
//! - `${NAME:-default}`: the value of `NAME` when set and non-empty, else `default`.
//! - `${NAME}`: the value of `NAME`, or the empty string when unset.
//! - `$NAME`: same as `${NAME}`.
//!
//! Expanded values are not expanded again and there is no escape for a literal `$`.

use std::collections::HashMap;
use std::sync::LazyLock;

use regex::{Captures, Regex};
use serde_json::Value;

use super::Document;

static ENV_REFERENCE: LazyLock<Regex> = LazyLock::new(|| {
	Regex::new(r"\$\{([^}]+)\}|\$([A-Za-z_][A-Za-z0-9_]*)").expect("env reference pattern is valid")
});

/// Lookup of variable values used during expansion.
pub trait VarSource: Send + Sync {
	/// Returns the value of `name`, or `None` when unset.
	fn var(&self, name: &str) -> Option<String>;
}

/// Reads variables from the process environment.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl VarSource for ProcessEnv {
	fn var(&self, name: &str) -> Option<String> {
		std::env::var(name).ok()
	}
}

impl VarSource for HashMap<String, String> {
	fn var(&self, name: &str) -> Option<String> {
		self.get(name).cloned()
	}
}

/// Expands references in every string leaf using the process environment.
pub fn expand_env_vars(document: &Document) -> Document {
	expand_with(document, &ProcessEnv)
}

/// Expands references in every string leaf using `vars`.
///
/// Returns a deep copy; the input is never modified.
pub fn expand_with(document: &Document, vars: &dyn VarSource) -> Document {
	document
		.iter()
		.map(|(key, value)| (key.clone(), expand_value(value, vars)))
		.collect()
}

/// Expands a single value recursively.
pub fn expand_value(value: &Value, vars: &dyn VarSource) -> Value {
	match value {
		Value::String(s) => Value::String(expand_str(s, vars)),
		Value::Array(items) => Value::Array(items.iter().map(|v| expand_value(v, vars)).collect()),
		Value::Object(map) => Value::Object(expand_with(map, vars)),
		other => other.clone(),
	}
}

/// Expands all references in one string, left to right.
pub fn expand_str(input: &str, vars: &dyn VarSource) -> String {
	if !input.contains('$') {
		return input.to_string();
	}

	ENV_REFERENCE
		.replace_all(input, |caps: &Captures| {
			if let Some(inner) = caps.get(1) {
				let inner = inner.as_str();
				return match inner.split_once(":-") {
					Some((name, default)) => match vars.var(name) {
						Some(value) if !value.is_empty() => value,
						_ => default.to_string(),
					},
					None => vars.var(inner).unwrap_or_default(),
				};
			}

			caps.get(2)
				.and_then(|name| vars.var(name.as_str()))
				.unwrap_or_default()
		})
		.into_owned()
}

#[cfg(test)]
mod tests {
	use super::*;
	use proptest::prelude::*;
	use serde_json::json;

	fn vars(pairs: &[(&str, &str)]) -> HashMap<String, String> {
		pairs
			.iter()
			.map(|(k, v)| (k.to_string(), v.to_string()))
			.collect()
	}

	#[test]
	fn expands_all_three_forms() {
		let env = vars(&[("HOST", "db.local"), ("PORT", "5432")]);
		assert_eq!(expand_str("${HOST}", &env), "db.local");
		assert_eq!(expand_str("$HOST", &env), "db.local");
		assert_eq!(expand_str("${PORT:-1}", &env), "5432");
		assert_eq!(expand_str("${MISSING:-fallback}", &env), "fallback");
	}

	#[test]
	fn unset_variables_expand_to_empty() {
		let env = vars(&[]);
		assert_eq!(expand_str("a${NOPE}b", &env), "ab");
		assert_eq!(expand_str("a$NOPE", &env), "a");
	}

	#[test]
	fn empty_value_uses_default() {
		let env = vars(&[("EMPTY", "")]);
		assert_eq!(expand_str("${EMPTY:-d}", &env), "d");
		assert_eq!(expand_str("${EMPTY}", &env), "");
	}

	#[test]
	fn multiple_references_in_one_string() {
		let env = vars(&[("USER", "admin"), ("HOST", "h")]);
		assert_eq!(
			expand_str("postgres://${USER}@$HOST:${PORT:-5432}/db", &env),
			"postgres://admin@h:5432/db"
		);
	}

	#[test]
	fn expanded_values_are_not_reexpanded() {
		let env = vars(&[("OUTER", "$INNER"), ("INNER", "boom")]);
		assert_eq!(expand_str("${OUTER}", &env), "$INNER");
	}

	#[test]
	fn lone_dollar_is_kept() {
		let env = vars(&[]);
		assert_eq!(expand_str("cost: $5", &env), "cost: $5");
		assert_eq!(expand_str("$", &env), "$");
	}

	#[test]
	fn walks_nested_documents_without_touching_other_scalars() {
		let env = vars(&[("KEY", "secret")]);
		let doc = json!({
			"llms": {"openai": {"api_key": "${KEY}", "temperature": 0.5}},
			"tools": ["$KEY", 3, true, null],
		});
		let Value::Object(doc) = doc else { unreachable!() };

		let out = expand_with(&doc, &env);
		assert_eq!(out["llms"]["openai"]["api_key"], "secret");
		assert_eq!(out["llms"]["openai"]["temperature"], 0.5);
		assert_eq!(out["tools"], json!(["secret", 3, true, null]));
		// input untouched
		assert_eq!(doc["llms"]["openai"]["api_key"], "${KEY}");
	}

	#[test]
	fn process_env_reads_unset_as_empty() {
		assert_eq!(
			expand_str("${LIVECONF_SURELY_UNSET_VARIABLE_42}", &ProcessEnv),
			""
		);
	}

	proptest! {
		#[test]
		fn identity_without_references(s in "[^$]*") {
			prop_assert_eq!(expand_str(&s, &vars(&[])), s);
		}

		#[test]
		fn default_form_matches_lookup(value in "[a-zA-Z0-9 ./-]{0,12}", default in "[a-z0-9]{1,8}") {
			let env = vars(&[("X", value.as_str())]);
			let expected = if value.is_empty() { default.clone() } else { value.clone() };
			prop_assert_eq!(expand_str(&format!("${{X:-{default}}}"), &env), expected);
		}

		#[test]
		fn braced_and_bare_forms_agree(value in "[a-zA-Z0-9]{0,12}") {
			let env = vars(&[("X", value.as_str())]);
			prop_assert_eq!(expand_str("${X}", &env), expand_str("$X", &env));
		}
	}
}
