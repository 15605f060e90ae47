//! Confluent-style schema registry integration
//!
//! Messages on the wire are framed as
//! `[0x00][schema id: 4 bytes big-endian][avro datum]`. This module builds
//! [`WireSerializer`]s and [`WireDeserializer`]s that produce and consume
//! that framing, fetching (and optionally registering) the schema through a
//! [`RegistryClient`].
//!
//! The async [`CachingSerializer`]/[`CachingDeserializer`] compile each
//! codec at most once per subject (resp. schema id), sharing the pending
//! build between concurrent callers.
//!
//! The registry HTTP client itself is not provided by this crate: bring
//! your own implementation of [`RegistryClient`] (most HTTP clients make
//! this a few lines per endpoint).

mod client;
mod deserializer;
mod serializer;
mod subject;

pub use {client::*, deserializer::*, serializer::*, subject::*};

use crate::{
	de::DeError, schema::SchemaError, ser::SerError, types::IncompatibleType,
};

/// First byte of every wire-format payload
pub const WIRE_MAGIC: u8 = 0x00;
/// Magic byte + big-endian schema id
pub const WIRE_HEADER_LEN: usize = 5;

pub(crate) fn encode_wire_header(id: i32) -> [u8; WIRE_HEADER_LEN] {
	let mut header = [0u8; WIRE_HEADER_LEN];
	header[0] = WIRE_MAGIC;
	header[1..].copy_from_slice(&id.to_be_bytes());
	header
}

pub(crate) fn decode_wire_header(bytes: &[u8]) -> Result<(i32, &[u8]), DeError> {
	let header = match bytes.get(..WIRE_HEADER_LEN) {
		Some(header) => header,
		None => return Err(DeError::new("Payload is too short for the wire format header")),
	};
	if header[0] != WIRE_MAGIC {
		return Err(DeError::new(
			"Wire format payload does not start with the 0x00 magic byte",
		));
	}
	let id = i32::from_be_bytes(header[1..].try_into().expect("sliced to header length"));
	Ok((id, &bytes[WIRE_HEADER_LEN..]))
}

/// Any error that may happen while building or using a wire-format codec
#[derive(thiserror::Error, Debug)]
#[non_exhaustive]
pub enum WireError {
	/// The schema fetched from (or generated for) the registry is invalid
	#[error(transparent)]
	Schema(#[from] SchemaError),
	/// The value could not be serialized with the subject's schema
	#[error(transparent)]
	Ser(#[from] SerError),
	/// The payload violated the wire format or the schema
	#[error(transparent)]
	De(#[from] DeError),
	/// The registry could not satisfy the request
	#[error(transparent)]
	Registry(#[from] RegistryError),
	/// The host type cannot be coded with the registered schema
	#[error(transparent)]
	IncompatibleType(#[from] IncompatibleType),
	/// A previously-failed shared build was hit again
	///
	/// Failed builds stay cached so that every concurrent (and later)
	/// caller observes the same failure, preserving at-most-once
	/// registration.
	#[error(transparent)]
	Shared(std::sync::Arc<WireError>),
}
