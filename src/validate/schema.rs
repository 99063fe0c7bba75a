/* src/validate/schema.rs */

//!
//! Explicit schema descriptors and the flattened field catalog derived from them.

/// Placeholder segment standing for any key of a map (or any index of a list).
pub const WILDCARD: &str = "*";

/// Shape of a single schema field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
	/// Accepts any value; the subtree is not checked.
	Any,
	String,
	Integer,
	Float,
	Bool,
	/// A sequence whose elements have the given shape.
	List(Box<FieldKind>),
	/// A map with arbitrary string keys whose values have the given shape.
	Map(Box<FieldKind>),
	/// A nested structure with a fixed set of keys.
	Struct(SchemaDescriptor),
}

impl FieldKind {
	pub fn list(inner: impl Into<FieldKind>) -> Self {
		Self::List(Box::new(inner.into()))
	}

	pub fn map(inner: impl Into<FieldKind>) -> Self {
		Self::Map(Box::new(inner.into()))
	}

	/// Human-readable name used in type mismatch messages.
	pub fn name(&self) -> &'static str {
		match self {
			Self::Any => "any",
			Self::String => "string",
			Self::Integer => "integer",
			Self::Float => "float",
			Self::Bool => "boolean",
			Self::List(_) => "sequence",
			Self::Map(_) => "mapping",
			Self::Struct(_) => "mapping",
		}
	}
}

impl From<SchemaDescriptor> for FieldKind {
	fn from(descriptor: SchemaDescriptor) -> Self {
		Self::Struct(descriptor)
	}
}

/// One named field of a [`SchemaDescriptor`].
#[derive(Debug, Clone, PartialEq)]
pub struct FieldSpec {
	pub name: String,
	pub kind: FieldKind,
	/// Replacement note when the field is deprecated. Presence yields a warning.
	pub deprecated: Option<String>,
}

/// Describes the keys a structure accepts at one nesting level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SchemaDescriptor {
	fields: Vec<FieldSpec>,
}

impl SchemaDescriptor {
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds a field.
	pub fn field(mut self, name: impl Into<String>, kind: impl Into<FieldKind>) -> Self {
		self.fields.push(FieldSpec {
			name: name.into(),
			kind: kind.into(),
			deprecated: None,
		});
		self
	}

	/// Adds a field that is still accepted but reported with a warning.
	pub fn deprecated(
		mut self,
		name: impl Into<String>,
		kind: impl Into<FieldKind>,
		note: impl Into<String>,
	) -> Self {
		self.fields.push(FieldSpec {
			name: name.into(),
			kind: kind.into(),
			deprecated: Some(note.into()),
		});
		self
	}

	pub fn get(&self, name: &str) -> Option<&FieldSpec> {
		self.fields.iter().find(|f| f.name == name)
	}

	pub fn fields(&self) -> &[FieldSpec] {
		&self.fields
	}

	/// Field names accepted at this level, in declaration order.
	pub fn names(&self) -> impl Iterator<Item = &str> {
		self.fields.iter().map(|f| f.name.as_str())
	}
}

/// Flattened catalog of every recognized field path.
///
/// Struct fields are joined with `.`; map keys and list indices appear as [`WILDCARD`].
#[derive(Debug, Clone, Default)]
pub struct SchemaFieldIndex {
	paths: Vec<String>,
}

impl SchemaFieldIndex {
	pub fn from_descriptor(descriptor: &SchemaDescriptor) -> Self {
		let mut index = Self::default();
		index.add_struct(descriptor, "");
		index
	}

	fn add_struct(&mut self, descriptor: &SchemaDescriptor, prefix: &str) {
		for field in descriptor.fields() {
			let path = join_path(prefix, &field.name);
			self.paths.push(path.clone());
			self.add_kind(&field.kind, &path);
		}
	}

	fn add_kind(&mut self, kind: &FieldKind, path: &str) {
		match kind {
			FieldKind::Struct(nested) => self.add_struct(nested, path),
			FieldKind::Map(inner) | FieldKind::List(inner) => {
				let element = join_path(path, WILDCARD);
				self.paths.push(element.clone());
				self.add_kind(inner, &element);
			}
			_ => {}
		}
	}

	/// All cataloged paths, in schema order.
	pub fn paths(&self) -> &[String] {
		&self.paths
	}

	/// Returns true if `path` names a known field.
	///
	/// A path matches a catalog entry when both have the same number of segments and
	/// every segment is equal or the catalog segment is the wildcard.
	pub fn contains(&self, path: &str) -> bool {
		self.paths.iter().any(|pattern| path_matches(pattern, path))
	}

	/// Distinct field names (last path segment), excluding wildcard levels.
	pub fn names(&self) -> Vec<&str> {
		let mut names: Vec<&str> = Vec::new();
		for path in &self.paths {
			let last = path.rsplit('.').next().unwrap_or(path);
			if last != WILDCARD && !names.contains(&last) {
				names.push(last);
			}
		}
		names
	}
}

fn path_matches(pattern: &str, path: &str) -> bool {
	let mut pattern_segments = pattern.split('.');
	let mut path_segments = path.split('.');
	loop {
		match (pattern_segments.next(), path_segments.next()) {
			(None, None) => return true,
			(Some(p), Some(s)) if p == WILDCARD || p == s => continue,
			_ => return false,
		}
	}
}

pub(crate) fn join_path(prefix: &str, key: &str) -> String {
	if prefix.is_empty() {
		key.to_string()
	} else {
		format!("{prefix}.{key}")
	}
}
