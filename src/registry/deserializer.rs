use super::*;

use crate::{
	de::DeError,
	schema::{Schema, SchemaGraph},
	types::{check_compatible, ResolveType, TypeResolution},
};

use serde::de::{DeserializeOwned, Error as _};

use {
	super::serializer::SharedBuild,
	futures::FutureExt as _,
	std::{collections::HashMap, marker::PhantomData, sync::Arc, sync::Mutex},
};

/// A compiled wire-format deserializer for values of type `T`
///
/// Built against a specific schema id: payloads whose embedded id differs
/// are rejected without touching the datum.
///
/// Obtained through a [`DeserializerBuilder`] (or a
/// [`CachingDeserializer`]).
pub struct WireDeserializer<T> {
	id: i32,
	schema: Arc<Schema>,
	_type: PhantomData<fn() -> T>,
}

impl<T> WireDeserializer<T> {
	/// The schema id this deserializer accepts
	pub fn id(&self) -> i32 {
		self.id
	}

	/// The writer schema this deserializer decodes with
	pub fn schema(&self) -> &Schema {
		&self.schema
	}
}

impl<T: DeserializeOwned> WireDeserializer<T> {
	/// Deserialize a whole wire-format payload (header + avro datum)
	pub fn deserialize(&self, bytes: &[u8]) -> Result<T, WireError> {
		let (id, datum) = decode_wire_header(bytes)?;
		if id != self.id {
			return Err(DeError::custom(format_args!(
				"Wire format payload carries schema id {id}, \
					but this deserializer was built against schema id {}",
				self.id
			))
			.into());
		}
		Ok(crate::from_datum_slice(datum, &self.schema)?)
	}
}

/// Builds [`WireDeserializer`]s against schemas fetched from a schema
/// registry
pub struct DeserializerBuilder<'c, C> {
	client: &'c C,
}

impl<'c, C: RegistryClient> DeserializerBuilder<'c, C> {
	/// Build against the given registry client
	pub fn new(client: &'c C) -> Self {
		Self { client }
	}

	/// Build a deserializer against a known schema id
	pub async fn build_for_id<T: ResolveType>(
		&self,
		id: i32,
	) -> Result<WireDeserializer<T>, WireError> {
		let schema_json = self.client.schema_by_id(id).await?;
		build_checked::<T>(id, &schema_json)
	}

	/// Build a deserializer against the latest schema of a subject
	pub async fn build_for_subject<T: ResolveType>(
		&self,
		subject: &str,
	) -> Result<WireDeserializer<T>, WireError> {
		let latest = self.client.latest_schema(subject).await?;
		build_checked::<T>(latest.id, &latest.schema_json)
	}

	/// Build a deserializer against a pinned version of a subject
	pub async fn build_for_subject_version<T: ResolveType>(
		&self,
		subject: &str,
		version: u32,
	) -> Result<WireDeserializer<T>, WireError> {
		let schema_json = self.client.schema_by_version(subject, version).await?;
		let id = self.client.schema_id(subject, &schema_json).await?;
		build_checked::<T>(id, &schema_json)
	}
}

fn build_checked<T: ResolveType>(
	id: i32,
	schema_json: &str,
) -> Result<WireDeserializer<T>, WireError> {
	let graph: SchemaGraph = schema_json.parse()?;
	check_compatible(&graph, &TypeResolution::of::<T>())?;
	Ok(WireDeserializer {
		id,
		schema: Arc::new(graph.freeze()?),
		_type: PhantomData,
	})
}

/// Deserializes wire-format payloads into values of type `T`, compiling
/// (and caching) one [`WireDeserializer`] per schema id encountered in the
/// payload headers
///
/// As with [`CachingSerializer`], the cache stores pending builds: the
/// registry is queried at most once per schema id, concurrent callers
/// attach to the in-flight build, and a failed build stays cached.
pub struct CachingDeserializer<C, T> {
	client: Arc<C>,
	cache: Mutex<HashMap<i32, SharedBuild<WireDeserializer<T>>>>,
}

impl<C, T> CachingDeserializer<C, T>
where
	C: RegistryClient + 'static,
	T: ResolveType + DeserializeOwned + 'static,
{
	/// Deserialize with schemas fetched from the given client
	pub fn new(client: Arc<C>) -> Self {
		Self {
			client,
			cache: Mutex::new(HashMap::new()),
		}
	}

	/// Deserialize a whole wire-format payload (header + avro datum),
	/// resolving the writer schema from the embedded id
	pub async fn deserialize(&self, bytes: &[u8]) -> Result<T, WireError> {
		let (id, _) = decode_wire_header(bytes)?;
		let deserializer = self.deserializer_for(id).await?;
		deserializer.deserialize(bytes)
	}

	async fn deserializer_for(&self, id: i32) -> Result<Arc<WireDeserializer<T>>, WireError> {
		let build = {
			let mut cache = self.cache.lock().expect("cache mutex poisoned");
			match cache.entry(id) {
				std::collections::hash_map::Entry::Occupied(entry) => entry.get().clone(),
				std::collections::hash_map::Entry::Vacant(entry) => {
					let client = Arc::clone(&self.client);
					tracing::debug!(id, "compiling wire deserializer");
					let build = async move {
						DeserializerBuilder::new(&*client)
							.build_for_id::<T>(id)
							.await
							.map(Arc::new)
							.map_err(Arc::new)
					}
					.boxed()
					.shared();
					entry.insert(build).clone()
				}
			}
		};
		build.await.map_err(WireError::Shared)
	}
}
