use super::WireError;

use crate::{schema::SchemaError, types::TypeResolution};

/// How the registry subject is derived from the topic and the record type
///
/// These mirror the strategies of the Kafka ecosystem; the default is
/// [`TopicName`](SubjectNameStrategy::TopicName) (`"{topic}-{key|value}"`).
#[derive(Clone, Debug)]
pub enum SubjectNameStrategy {
	/// `"{topic}-key"` or `"{topic}-value"`
	TopicName {
		/// Whether the payload is the message key (the message value
		/// otherwise)
		is_key: bool,
	},
	/// The full name of the record type, regardless of topic
	RecordName,
	/// `"{topic}-{record full name}"`
	TopicRecordName,
}

impl Default for SubjectNameStrategy {
	fn default() -> Self {
		SubjectNameStrategy::TopicName { is_key: false }
	}
}

impl SubjectNameStrategy {
	/// The subject under which a value described by `resolution` is
	/// registered when produced to `topic`
	pub fn subject_for(
		&self,
		topic: &str,
		resolution: &TypeResolution,
	) -> Result<String, WireError> {
		let record_name = || -> Result<&str, WireError> {
			match resolution.root_name() {
				Some(resolved) => Ok(resolved.name.fully_qualified_name()),
				None => Err(WireError::Schema(SchemaError::new(
					"Record-name subject strategies require a named (record or enum) root type",
				))),
			}
		};
		Ok(match self {
			SubjectNameStrategy::TopicName { is_key } => {
				format!("{topic}-{}", if *is_key { "key" } else { "value" })
			}
			SubjectNameStrategy::RecordName => record_name()?.to_owned(),
			SubjectNameStrategy::TopicRecordName => format!("{topic}-{}", record_name()?),
		})
	}
}
