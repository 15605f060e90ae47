//! Defines everything necessary for avro serialization
//!
//! # For advanced usage
//!
//! You typically want to use top-level functions such as
//! [`to_datum`](crate::to_datum) but access to this may be necessary for
//! more advanced usage.
//!
//! This gives manual access to the type that implements
//! [`serde::Serializer`]:
//! ```
//! let schema: serde_avro_wire::Schema = r#"
//! {
//! 	"namespace": "test",
//! 	"type": "record",
//! 	"name": "Test",
//! 	"fields": [
//! 		{
//! 			"type": "string",
//! 			"name": "field"
//! 		}
//! 	]
//! }
//! "#
//! .parse()
//! .expect("Failed to parse schema");
//!
//! #[derive(serde_derive::Serialize, Debug, PartialEq)]
//! struct Test<'a> {
//! 	field: &'a str,
//! }
//!
//! let serializer_config = serde_avro_wire::ser::SerializerConfig::new(&schema);
//! let mut serializer_state =
//! 	serde_avro_wire::ser::SerializerState::from_writer(Vec::new(), &serializer_config);
//!
//! // It's not the `SerializerState` that implements `serde::Serializer`
//! // directly: that is `DatumSerializer`, which tracks the current schema
//! // node in addition. We build it through `SerializerState::serializer`.
//! serde::Serialize::serialize(&Test { field: "foo" }, serializer_state.serializer())
//! 	.expect("Failed to serialize");
//! let serialized = serializer_state.into_writer();
//!
//! assert_eq!(serialized, &[6, 102, 111, 111]);
//! ```

mod error;
mod serializer;

pub use {error::SerError, serializer::*};

use crate::schema::{self_referential::*, BranchHint};

use {integer_encoding::VarIntWriter, serde::ser::*, std::io::Write};

/// Schema to serialize against
///
/// One `SerializerConfig` can serve any number of serializations against
/// the same schema, concurrently if needed.
pub struct SerializerConfig<'s> {
	schema: &'s Schema,
}

impl<'s> SerializerConfig<'s> {
	/// Build a new `SerializerConfig` for the given `schema`
	pub fn new(schema: &'s Schema) -> Self {
		Self { schema }
	}

	/// Get the schema that was used when creating this `SerializerConfig`
	pub fn schema(&self) -> &'s Schema {
		self.schema
	}
}

/// All state necessary for one serialization: a writer plus the
/// [`SerializerConfig`]
///
/// Does not implement [`Serializer`] directly (use
/// [`.serializer`](Self::serializer) to obtain that).
pub struct SerializerState<'c, 's, W> {
	writer: W,
	config: &'c SerializerConfig<'s>,
}

impl<'c, 's, W: std::io::Write> SerializerState<'c, 's, W> {
	/// Build a `SerializerState` from a writer and a `SerializerConfig`
	pub fn from_writer(writer: W, config: &'c SerializerConfig<'s>) -> Self {
		Self { writer, config }
	}

	/// Obtain the actual [`serde::Serializer`] for this `SerializerState`
	pub fn serializer<'r>(&'r mut self) -> DatumSerializer<'r, 'c, 's, W> {
		DatumSerializer {
			schema_node: self.config.schema.root().as_ref(),
			state: self,
		}
	}

	fn write_length_delimited(&mut self, data: &[u8]) -> Result<(), SerError> {
		self.writer
			.write_varint::<i64>(data.len().try_into().map_err(|_| {
				SerError::new(
					"Buffer len does not fit i64 for encoding as length-delimited field size",
				)
			})?)
			.map_err(SerError::io)?;
		self.writer.write_all(data).map_err(SerError::io)
	}
}

impl<W> SerializerState<'_, '_, W> {
	/// Get the writer back
	pub fn into_writer(self) -> W {
		self.writer
	}

	/// Get the writer by reference
	///
	/// This may be useful to observe the state of the inner buffer.
	pub fn writer(&self) -> &W {
		&self.writer
	}

	/// Get the writer by mutable reference
	///
	/// This may be useful to clear the inner buffer when re-using a
	/// `SerializerState`.
	pub fn writer_mut(&mut self) -> &mut W {
		&mut self.writer
	}
}
