//! Navigate, build, parse and write Avro schemas

mod error;
mod safe;
pub(crate) mod self_referential;
mod union_selection;

pub use {
	error::{ErrorKind, SchemaError},
	safe::*,
	self_referential::Schema,
};

pub(crate) use union_selection::BranchHint;

impl std::str::FromStr for Schema {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let graph: safe::SchemaGraph = s.parse()?;
		graph.try_into()
	}
}

/// Name of a named schema node (*record*, *enum* or *fixed*)
///
/// This holds both the "name" and the "namespace" as a single fully
/// qualified string, the way they are compared and interned.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Name {
	fully_qualified_name: String,
	namespace_delimiter_idx: Option<usize>,
}

impl std::fmt::Debug for Name {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.fully_qualified_name, f)
	}
}

impl Name {
	/// Build a [`Name`] from a fully qualified name, validating it against
	/// the Avro name grammar
	///
	/// Every dot-separated segment must match `[A-Za-z_][A-Za-z0-9_]*`;
	/// anything else errors with the offending text.
	pub fn new(fully_qualified_name: impl Into<String>) -> Result<Self, SchemaError> {
		fn non_generic_inner(fully_qualified_name: String) -> Result<Name, SchemaError> {
			if fully_qualified_name
				.split('.')
				.any(|segment| !is_valid_identifier(segment))
			{
				return Err(SchemaError::invalid_name(fully_qualified_name));
			}
			Ok(Name {
				namespace_delimiter_idx: fully_qualified_name.rfind('.'),
				fully_qualified_name,
			})
		}
		non_generic_inner(fully_qualified_name.into())
	}

	pub(crate) fn from_parts(namespace: Option<&str>, name: &str) -> Result<Self, SchemaError> {
		match namespace {
			None => Self::new(name),
			Some(namespace) => Self::new(format!("{}.{}", namespace, name)),
		}
	}

	/// The rightmost component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `c`
	pub fn name(&self) -> &str {
		match self.namespace_delimiter_idx {
			None => &self.fully_qualified_name,
			Some(delimiter_idx) => &self.fully_qualified_name[delimiter_idx + 1..],
		}
	}

	/// The namespace component of the fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b`
	pub fn namespace(&self) -> Option<&str> {
		self.namespace_delimiter_idx
			.map(|idx| &self.fully_qualified_name[..idx])
	}

	/// The fully qualified name
	///
	/// e.g. in `a.b.c` it's `a.b.c`
	pub fn fully_qualified_name(&self) -> &str {
		&self.fully_qualified_name
	}
}

/// `[A-Za-z_][A-Za-z0-9_]*`
pub(crate) fn is_valid_identifier(s: &str) -> bool {
	let mut bytes = s.bytes();
	matches!(bytes.next(), Some(b'A'..=b'Z' | b'a'..=b'z' | b'_'))
		&& bytes.all(|b| matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'_'))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn name_parts() {
		let name = Name::new("a.b.c").unwrap();
		assert_eq!(name.name(), "c");
		assert_eq!(name.namespace(), Some("a.b"));
		assert_eq!(name.fully_qualified_name(), "a.b.c");

		let name = Name::new("justaname").unwrap();
		assert_eq!(name.name(), "justaname");
		assert_eq!(name.namespace(), None);
	}

	#[test]
	fn invalid_names_are_rejected() {
		for invalid in ["", "1abc", "a-b", "a.", ".a", "a..b", "na me"] {
			let err = Name::new(invalid).unwrap_err();
			assert!(
				matches!(err.kind(), ErrorKind::InvalidName { name } if name == invalid),
				"{invalid:?} should be rejected as an invalid name"
			);
		}
	}
}
