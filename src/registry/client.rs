//! The schema registry client seam

/// Error code the registry answers with when a subject or version does not
/// exist
pub const ERROR_CODE_SUBJECT_NOT_FOUND: u32 = 40401;

/// A schema as registered under a subject
#[derive(Clone, Debug)]
pub struct RegisteredSchema {
	/// The globally unique schema id (what goes in the wire header)
	pub id: i32,
	/// The version of the schema under its subject
	pub version: u32,
	/// The schema JSON text
	pub schema_json: String,
}

/// Any error the registry (or its transport) may answer with
#[derive(thiserror::Error, Debug)]
#[error("Schema registry error (code {code:?}): {message}")]
pub struct RegistryError {
	code: Option<u32>,
	message: String,
}

impl RegistryError {
	/// An error with no registry error code (e.g. a transport failure)
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			code: None,
			message: message.into(),
		}
	}

	/// An error carrying the registry's error code
	pub fn with_code(code: u32, message: impl Into<String>) -> Self {
		Self {
			code: Some(code),
			message: message.into(),
		}
	}

	/// The registry's error code, if the registry answered at all
	pub fn code(&self) -> Option<u32> {
		self.code
	}

	/// Whether this is the well-known "subject/version not found" answer
	pub fn is_subject_not_found(&self) -> bool {
		self.code == Some(ERROR_CODE_SUBJECT_NOT_FOUND)
	}

	/// Whether the registry rejected the schema or type as incompatible
	/// with what is already registered
	pub fn is_incompatible(&self) -> bool {
		// 409 is the incompatible-schema conflict, 42201 an invalid schema
		matches!(self.code, Some(409) | Some(42201))
	}

	/// The narrow set of failures that registering a fresh schema may
	/// recover from
	pub(crate) fn recoverable_by_registration(&self) -> bool {
		self.is_subject_not_found() || self.is_incompatible()
	}
}

/// What the wire-format builders need from a schema registry
///
/// Implemented by the caller over their HTTP client of choice; the
/// endpoints map one-to-one to the Confluent Schema Registry REST API.
#[async_trait::async_trait]
pub trait RegistryClient: Send + Sync {
	/// `GET /schemas/ids/{id}`: the schema JSON for a schema id
	async fn schema_by_id(&self, id: i32) -> Result<String, RegistryError>;

	/// `GET /subjects/{subject}/versions/latest`
	async fn latest_schema(&self, subject: &str) -> Result<RegisteredSchema, RegistryError>;

	/// `GET /subjects/{subject}/versions/{version}`: the schema JSON for a
	/// pinned version of a subject
	async fn schema_by_version(&self, subject: &str, version: u32)
		-> Result<String, RegistryError>;

	/// `POST /subjects/{subject}`: the id under which this exact schema is
	/// registered
	async fn schema_id(&self, subject: &str, schema_json: &str) -> Result<i32, RegistryError>;

	/// `POST /subjects/{subject}/versions`: register a schema, returning
	/// its id
	async fn register_schema(&self, subject: &str, schema_json: &str)
		-> Result<i32, RegistryError>;
}
