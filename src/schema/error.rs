use std::borrow::Cow;

/// Any error that may happen when building, parsing or writing a schema
#[derive(thiserror::Error)]
#[error("{}", kind)]
pub struct SchemaError {
	kind: Box<ErrorKind>,
}

/// What went wrong when building, parsing or writing a schema
///
/// Obtained through [`SchemaError::kind`].
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum ErrorKind {
	/// A name or namespace does not match the Avro name grammar
	/// (`[A-Za-z_][A-Za-z0-9_]*`, dot-separated for namespaces)
	#[error("Invalid Avro name: {name:?}")]
	InvalidName {
		/// The offending text
		name: String,
	},
	/// An enum symbol is not a valid identifier (or is duplicated)
	#[error("Invalid enum symbol: {symbol:?}")]
	InvalidSymbol {
		/// The offending symbol
		symbol: String,
	},
	/// The schema violates a structural constraint (union rules, duplicate
	/// field names, logical type over an incorrect base type...)
	#[error("Invalid schema: {0}")]
	InvalidSchema(Cow<'static, str>),
	/// A JSON value could not be matched to any schema form
	#[error("Unknown schema in JSON: {}", reasons.join(", "))]
	UnknownSchema {
		/// Why each attempted interpretation did not apply
		reasons: Vec<String>,
	},
	/// The same full-name designates two schema definitions
	#[error("The schema contains duplicate definitions for {name}")]
	ConflictingSchema {
		/// The duplicated full-name
		name: String,
	},
	/// The schema JSON itself could not be parsed or written
	#[error(transparent)]
	Json(serde_json::Error),
}

impl SchemaError {
	pub(crate) fn invalid_name(name: impl Into<String>) -> Self {
		ErrorKind::InvalidName { name: name.into() }.into()
	}

	pub(crate) fn invalid_symbol(symbol: impl Into<String>) -> Self {
		ErrorKind::InvalidSymbol {
			symbol: symbol.into(),
		}
		.into()
	}

	pub(crate) fn new(s: &'static str) -> Self {
		ErrorKind::InvalidSchema(Cow::Borrowed(s)).into()
	}

	pub(crate) fn msg(s: std::fmt::Arguments<'_>) -> Self {
		Self::display(s)
	}

	pub(crate) fn display(s: impl std::fmt::Display) -> Self {
		ErrorKind::InvalidSchema(Cow::Owned(s.to_string())).into()
	}

	pub(crate) fn unknown(reasons: Vec<String>) -> Self {
		ErrorKind::UnknownSchema { reasons }.into()
	}

	pub(crate) fn conflicting(name: impl Into<String>) -> Self {
		ErrorKind::ConflictingSchema { name: name.into() }.into()
	}

	pub(crate) fn serde_json(serde_json_error: serde_json::Error) -> Self {
		ErrorKind::Json(serde_json_error).into()
	}

	/// What category of schema error this is
	pub fn kind(&self) -> &ErrorKind {
		&self.kind
	}
}

impl From<ErrorKind> for SchemaError {
	fn from(kind: ErrorKind) -> Self {
		Self { kind: kind.into() }
	}
}

impl std::fmt::Debug for SchemaError {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&*self.kind, f)
	}
}
