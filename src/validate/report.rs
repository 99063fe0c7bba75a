/* src/validate/report.rs */

use std::fmt::Write;

use super::{FieldError, ValidationResult};

const COMMON_CAUSES: [&str; 4] = [
	"Typos in field names",
	"Incorrect nesting level",
	"Using removed/deprecated fields",
	"Copy-paste errors from examples",
];

const HINTS: [&str; 4] = [
	"Check field names against the configuration reference",
	"Verify correct nesting (e.g., 'agents.my-agent.llm' not 'agents.llm')",
	"Print the expanded configuration to see what was actually loaded",
	"Compare with a known-good configuration file",
];

/// Renders the operator report for `result`. Empty when there is nothing to report.
pub(crate) fn render(result: &ValidationResult) -> String {
	if !result.has_issues() {
		return String::new();
	}

	let has_errors = !result.is_valid();
	let mut out = String::new();

	if has_errors {
		out.push_str("ERROR: Configuration validation errors:\n\n");
	}

	if !result.unknown_fields.is_empty() {
		out.push_str("UNKNOWN: Unknown/Typo Fields (not recognized):\n");
		for field in &result.unknown_fields {
			entry(&mut out, field);
		}
		out.push_str("\n   Common causes:\n");
		for cause in COMMON_CAUSES {
			let _ = writeln!(out, "   - {cause}");
		}
		out.push('\n');
	}

	section(&mut out, "TYPE_ERROR: Type Errors:", &result.type_errors);
	section(&mut out, "WARN: Warnings (non-fatal):", &result.warnings);

	if has_errors {
		out.push_str("TIP: Hints:\n");
		for hint in HINTS {
			let _ = writeln!(out, "   • {hint}");
		}
	}

	out
}

fn section(out: &mut String, header: &str, errors: &[FieldError]) {
	if errors.is_empty() {
		return;
	}
	out.push_str(header);
	out.push('\n');
	for error in errors {
		entry(out, error);
	}
	out.push('\n');
}

fn entry(out: &mut String, error: &FieldError) {
	let _ = writeln!(out, "   • {}: {}", error.field, error.message);
	if !error.suggestions.is_empty() {
		let _ = writeln!(out, "     TIP: Did you mean: {}?", error.suggestions.join(", "));
	}
	if !error.context.is_empty() {
		let _ = writeln!(out, "     INFO: {}", error.context);
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_result_renders_nothing() {
		assert_eq!(render(&ValidationResult::default()), "");
	}

	#[test]
	fn unknown_fields_section() {
		let result = ValidationResult {
			unknown_fields: vec![FieldError::unknown(
				"ageents".to_string(),
				vec!["agents".to_string()],
			)],
			..Default::default()
		};
		let text = render(&result);
		assert!(text.starts_with("ERROR: Configuration validation errors:\n\n"));
		assert!(text.contains("UNKNOWN: Unknown/Typo Fields (not recognized):\n"));
		assert!(text.contains("   • ageents: field is not recognized in configuration structure\n"));
		assert!(text.contains("     TIP: Did you mean: agents?\n"));
		assert!(text.contains("   Common causes:\n   - Typos in field names\n"));
		assert!(text.contains("TIP: Hints:\n"));
		assert!(!text.contains("TYPE_ERROR"));
	}

	#[test]
	fn warnings_only_omit_error_banner_and_hints() {
		let result = ValidationResult {
			warnings: vec![FieldError::deprecated("old".to_string(), "use `new`")],
			..Default::default()
		};
		let text = render(&result);
		assert!(text.starts_with("WARN: Warnings (non-fatal):\n"));
		assert!(text.contains("   • old: field is deprecated\n     INFO: use `new`\n"));
		assert!(!text.contains("ERROR:"));
		assert!(!text.contains("TIP: Hints:"));
	}

	#[test]
	fn type_errors_section() {
		let result = ValidationResult {
			type_errors: vec![FieldError::type_mismatch(
				"port".to_string(),
				"expected integer, got string \"x\"".to_string(),
			)],
			..Default::default()
		};
		let text = render(&result);
		assert!(text.contains("TYPE_ERROR: Type Errors:\n   • port: expected integer"));
		assert!(text.contains("     INFO: Check that the value type matches"));
	}
}
