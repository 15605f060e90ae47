//! # Getting started
//!
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
//! #[derive(serde_derive::Serialize, serde_derive::Deserialize, Debug, PartialEq)]
//! struct Test<'a> {
//! 	field: &'a str,
//! }
//!
//! let rust_value = Test { field: "foo" };
//! let avro_datum = &[6, 102, 111, 111];
//!
//! // Avro datum deserialization
//! assert_eq!(
//! 	serde_avro_wire::from_datum_slice::<Test>(avro_datum, &schema)
//! 		.expect("Failed to deserialize"),
//! 	rust_value
//! );
//!
//! // Avro datum serialization
//! assert_eq!(
//! 	serde_avro_wire::to_datum_vec(
//! 		&rust_value,
//! 		&serde_avro_wire::ser::SerializerConfig::new(&schema)
//! 	)
//! 	.expect("Failed to serialize"),
//! 	avro_datum
//! );
//! ```
//!
//! # Schema registry integration
//!
//! With the `registry` feature (default on), the [`registry`] module wraps
//! these codecs in the `[0x00][schema id][datum]` wire format used by the
//! Kafka ecosystem: codecs are compiled from schemas fetched by id or
//! subject through a [`registry::RegistryClient`], schemas can be
//! registered on the fly for types describing themselves via
//! [`types::ResolveType`], and the async
//! [`registry::CachingSerializer`]/[`registry::CachingDeserializer`]
//! compile each codec at most once per subject/id even under concurrent
//! use.
//!
//! # An idiomatic (re)implementation of serde/avro (de)serialization
//!
//! The codecs interpret the schema while driving
//! [`serde`]'s traits directly: no intermediate dynamic value tree is
//! built, no `HashMap` lookup is made for ordered record fields, and
//! deserialization can borrow `&str`s straight from the input slice.

// Get docs.rs to display all feature flags.
// That is used jointly with `package.metadata.docs.rs` in the `Cargo.toml`
#![cfg_attr(docsrs, feature(doc_auto_cfg))]

pub mod de;
#[cfg(feature = "registry")]
pub mod registry;
pub mod schema;
pub mod ser;
pub mod types;

pub use schema::Schema;

/// Deserialize from an avro "datum" (raw data, no headers...) slice
///
/// This is zero-alloc.
///
/// Your structure may contain `&'a str`s that will end up pointing directly
/// into this slice for ideal performance.
pub fn from_datum_slice<'a, T>(slice: &'a [u8], schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::Deserialize<'a>,
{
	serde::Deserialize::deserialize(de::DeserializerState::from_slice(slice, schema).deserializer())
}

/// Deserialize from an avro "datum" (raw data, no headers...)
/// `impl BufRead`
///
/// If you only have an `impl Read`, wrap it in a
/// [`BufReader`](std::io::BufReader) first.
///
/// If deserializing from a slice, a `Vec`, ... prefer using
/// [`from_datum_slice`], as it will be more performant and enable you to
/// borrow `&str`s from the original slice.
pub fn from_datum_reader<R, T>(reader: R, schema: &Schema) -> Result<T, de::DeError>
where
	T: serde::de::DeserializeOwned,
	R: std::io::BufRead,
{
	serde::Deserialize::deserialize(
		de::DeserializerState::from_reader(reader, schema).deserializer(),
	)
}

/// Serialize an avro "datum" (raw data, no headers...) to the provided
/// writer
///
/// [`SerializerConfig`](ser::SerializerConfig) can be built from a schema:
/// ```
/// # use serde_avro_wire::{ser, Schema};
/// let schema: Schema = r#""int""#.parse().unwrap();
/// let serializer_config = ser::SerializerConfig::new(&schema);
///
/// let serialized: Vec<u8> = serde_avro_wire::to_datum_vec(&3, &serializer_config).unwrap();
/// assert_eq!(serialized, &[6]);
///
/// // writers can be reused across serializations
/// let mut serialized = serialized;
/// serialized.clear();
/// let serialized = serde_avro_wire::to_datum(&4, serialized, &serializer_config).unwrap();
/// assert_eq!(serialized, &[8]);
/// ```
pub fn to_datum<T, W>(
	value: &T,
	writer: W,
	serializer_config: &ser::SerializerConfig<'_>,
) -> Result<W, ser::SerError>
where
	T: serde::Serialize + ?Sized,
	W: std::io::Write,
{
	let mut serializer_state = ser::SerializerState::from_writer(writer, serializer_config);
	serde::Serialize::serialize(value, serializer_state.serializer())?;
	Ok(serializer_state.into_writer())
}

/// Serialize an avro "datum" (raw data, no headers...) to a newly
/// allocated `Vec`
///
/// Note that unless you would otherwise allocate a new `Vec` anyway, it
/// will be more efficient to use [`to_datum`] instead.
pub fn to_datum_vec<T>(
	value: &T,
	serializer_config: &ser::SerializerConfig<'_>,
) -> Result<Vec<u8>, ser::SerError>
where
	T: serde::Serialize + ?Sized,
{
	to_datum(value, Vec::new(), serializer_config)
}
