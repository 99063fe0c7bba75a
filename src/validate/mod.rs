/* src/validate/mod.rs */

//!
//! Strict structural validation of raw documents against a schema descriptor.
//!
//! Every key of the document must be declared at its nesting level and every value
//! must have the declared shape. Problems are collected (not short-circuited) into a
//! [`ValidationResult`] whose `Display` is an operator-facing report.

mod classify;
mod report;
mod schema;
mod suggest;
mod walk;

pub use schema::{FieldKind, FieldSpec, SchemaDescriptor, SchemaFieldIndex, WILDCARD};
pub use suggest::{MAX_DISTANCE, MAX_SUGGESTIONS, find_similar, levenshtein};

use std::fmt;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::loader::{Document, Schema};

/// Whether a diagnostic blocks loading.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
	Error,
	Warning,
}

impl fmt::Display for Severity {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Error => f.write_str("error"),
			Self::Warning => f.write_str("warning"),
		}
	}
}

/// A single problem found in a document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
	/// Dotted path of the offending field (e.g. `agents.assistant.llm`).
	pub field: String,
	pub message: String,
	/// Ranked corrections, best first.
	pub suggestions: Vec<String>,
	pub severity: Severity,
	pub context: String,
}

impl FieldError {
	pub(crate) fn unknown(field: String, suggestions: Vec<String>) -> Self {
		Self {
			field,
			message: "field is not recognized in configuration structure".to_string(),
			suggestions,
			severity: Severity::Error,
			context: "This field does not exist in the configuration schema".to_string(),
		}
	}

	pub(crate) fn type_mismatch(field: String, message: String) -> Self {
		Self {
			field,
			message,
			suggestions: Vec::new(),
			severity: Severity::Error,
			context: "Check that the value type matches the expected type (string, number, boolean, etc.)"
				.to_string(),
		}
	}

	pub(crate) fn generic(message: String) -> Self {
		Self {
			field: "unknown".to_string(),
			message,
			suggestions: Vec::new(),
			severity: Severity::Error,
			context: String::new(),
		}
	}

	pub(crate) fn deprecated(field: String, note: &str) -> Self {
		Self {
			field,
			message: "field is deprecated".to_string(),
			suggestions: Vec::new(),
			severity: Severity::Warning,
			context: note.to_string(),
		}
	}
}

/// Outcome of a structural validation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ValidationResult {
	pub unknown_fields: Vec<FieldError>,
	pub type_errors: Vec<FieldError>,
	/// Non-fatal; never block loading.
	pub warnings: Vec<FieldError>,
}

impl ValidationResult {
	/// True when there are no unknown fields and no type errors.
	pub fn is_valid(&self) -> bool {
		self.unknown_fields.is_empty() && self.type_errors.is_empty()
	}

	/// True when there is anything to report, warnings included.
	pub fn has_issues(&self) -> bool {
		!self.is_valid() || !self.warnings.is_empty()
	}

	/// Number of blocking diagnostics.
	pub fn error_count(&self) -> usize {
		self.unknown_fields.len() + self.type_errors.len()
	}

	/// Renders the operator report. Empty when there are no issues.
	pub fn format_errors(&self) -> String {
		report::render(self)
	}
}

impl fmt::Display for ValidationResult {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(&self.format_errors())
	}
}

/// Validates `document` against the schema of `T`, including a strict decode attempt.
pub fn validate_structure<T: Schema>(document: &Document) -> ValidationResult {
	match check_and_decode::<T>(document, &T::schema()) {
		Ok((_, result)) => result,
		Err(result) => result,
	}
}

/// Validates `document` against `descriptor` without decoding.
pub fn validate_against(document: &Document, descriptor: &SchemaDescriptor) -> ValidationResult {
	let index = SchemaFieldIndex::from_descriptor(descriptor);
	let mut result = ValidationResult::default();
	walk::check(document, descriptor, &index, &mut result);
	result
}

/// Walks the document, then decodes it into `T` when the walk found no errors.
///
/// On success the returned result may still carry warnings.
pub(crate) fn check_and_decode<T: DeserializeOwned>(
	document: &Document,
	descriptor: &SchemaDescriptor,
) -> Result<(T, ValidationResult), ValidationResult> {
	let index = SchemaFieldIndex::from_descriptor(descriptor);
	let mut result = ValidationResult::default();
	walk::check(document, descriptor, &index, &mut result);
	if !result.is_valid() {
		return Err(result);
	}

	let coerced = walk::coerce(document, descriptor);
	match serde_json::from_value::<T>(Value::Object(coerced)) {
		Ok(value) => Ok((value, result)),
		Err(e) => {
			classify::classify(&e.to_string(), &index, &mut result);
			Err(result)
		}
	}
}
