use super::*;

use crate::{
	schema::{Schema, SchemaGraph},
	ser::{SerializerConfig, SerializerState},
	types::{check_compatible, ResolveType, TypeResolution},
};

use serde::Serialize;

use {
	futures::{future::Shared, FutureExt as _},
	std::{collections::HashMap, marker::PhantomData, sync::Arc, sync::Mutex},
};

/// A compiled wire-format serializer for values of type `T`
///
/// Holds the schema id and the compiled schema it was built against;
/// serializing writes the 5-byte wire header followed by the avro datum.
///
/// Obtained through a [`SerializerBuilder`] (or a [`CachingSerializer`]).
pub struct WireSerializer<T: ?Sized> {
	id: i32,
	schema: Arc<Schema>,
	_type: PhantomData<fn(&T)>,
}

impl<T: ?Sized> std::fmt::Debug for WireSerializer<T> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("WireSerializer").field("id", &self.id).field("schema", &self.schema).finish()
	}
}

impl<T: ?Sized> WireSerializer<T> {
	/// The schema id stamped into the wire header
	pub fn id(&self) -> i32 {
		self.id
	}

	/// The schema this serializer encodes with
	pub fn schema(&self) -> &Schema {
		&self.schema
	}
}

impl<T: Serialize + ?Sized> WireSerializer<T> {
	/// Serialize `value` to the provided writer, wire header included
	pub fn serialize<W: std::io::Write>(&self, value: &T, mut writer: W) -> Result<W, WireError> {
		writer
			.write_all(&encode_wire_header(self.id))
			.map_err(crate::ser::SerError::io)?;
		let config = SerializerConfig::new(&self.schema);
		let mut state = SerializerState::from_writer(writer, &config);
		value.serialize(state.serializer())?;
		Ok(state.into_writer())
	}

	/// Serialize `value` to a newly allocated `Vec`, wire header included
	pub fn serialize_to_vec(&self, value: &T) -> Result<Vec<u8>, WireError> {
		self.serialize(value, Vec::new())
	}
}

/// Builds [`WireSerializer`]s against schemas fetched from (or registered
/// in) a schema registry
pub struct SerializerBuilder<'c, C> {
	client: &'c C,
}

impl<'c, C: RegistryClient> SerializerBuilder<'c, C> {
	/// Build against the given registry client
	pub fn new(client: &'c C) -> Self {
		Self { client }
	}

	/// Build a serializer against a known schema id
	pub async fn build_for_id<T: ResolveType + ?Sized>(
		&self,
		id: i32,
	) -> Result<WireSerializer<T>, WireError> {
		let schema_json = self.client.schema_by_id(id).await?;
		build_checked::<T>(id, &schema_json)
	}

	/// Build a serializer against the latest schema of a subject
	pub async fn build_for_subject<T: ResolveType + ?Sized>(
		&self,
		subject: &str,
	) -> Result<WireSerializer<T>, WireError> {
		let latest = self.client.latest_schema(subject).await?;
		build_checked::<T>(latest.id, &latest.schema_json)
	}

	/// Build a serializer against a pinned version of a subject
	pub async fn build_for_subject_version<T: ResolveType + ?Sized>(
		&self,
		subject: &str,
		version: u32,
	) -> Result<WireSerializer<T>, WireError> {
		let schema_json = self.client.schema_by_version(subject, version).await?;
		let id = self.client.schema_id(subject, &schema_json).await?;
		build_checked::<T>(id, &schema_json)
	}

	/// Build a serializer against the latest schema of a subject,
	/// registering a schema generated from `T` when the subject does not
	/// exist yet or its latest schema cannot code `T`
	pub async fn build_registering<T: ResolveType + ?Sized>(
		&self,
		subject: &str,
	) -> Result<WireSerializer<T>, WireError> {
		match self.client.latest_schema(subject).await {
			Ok(latest) => match build_checked::<T>(latest.id, &latest.schema_json) {
				Ok(serializer) => Ok(serializer),
				Err(WireError::IncompatibleType(incompatible)) => {
					tracing::debug!(
						subject = %subject,
						%incompatible,
						"latest registered schema cannot code the host type, registering a fresh one",
					);
					self.register::<T>(subject).await
				}
				Err(other) => Err(other),
			},
			Err(registry_error) if registry_error.recoverable_by_registration() => {
				tracing::debug!(
					subject = %subject,
					code = ?registry_error.code(),
					"no usable schema registered under subject, registering one",
				);
				self.register::<T>(subject).await
			}
			Err(registry_error) => Err(registry_error.into()),
		}
	}

	async fn register<T: ResolveType + ?Sized>(
		&self,
		subject: &str,
	) -> Result<WireSerializer<T>, WireError> {
		let graph = TypeResolution::of::<T>().to_schema_graph()?;
		let schema_json = graph.to_json(false)?;
		let id = self.client.register_schema(subject, &schema_json).await?;
		tracing::debug!(subject = %subject, id, "registered generated schema");
		Ok(WireSerializer {
			id,
			schema: Arc::new(graph.freeze()?),
			_type: PhantomData,
		})
	}
}

fn build_checked<T: ResolveType + ?Sized>(
	id: i32,
	schema_json: &str,
) -> Result<WireSerializer<T>, WireError> {
	let graph: SchemaGraph = schema_json.parse()?;
	check_compatible(&graph, &TypeResolution::of::<T>())?;
	Ok(WireSerializer {
		id,
		schema: Arc::new(graph.freeze()?),
		_type: PhantomData,
	})
}

pub(super) type SharedBuild<X> =
	Shared<futures::future::BoxFuture<'static, Result<Arc<X>, Arc<WireError>>>>;

/// Serializes values of type `T` for whatever topic they are produced to,
/// compiling (and caching) one [`WireSerializer`] per subject
///
/// The cache stores pending builds, not results: under concurrent callers
/// the registry is queried (and at most one schema registered) exactly once
/// per subject for the lifetime of this value, and everyone awaits the same
/// build. A failed build stays cached, so all callers observe the same
/// failure.
pub struct CachingSerializer<C, T: ?Sized> {
	client: Arc<C>,
	strategy: SubjectNameStrategy,
	auto_register: bool,
	cache: Mutex<HashMap<String, SharedBuild<WireSerializer<T>>>>,
}

impl<C, T> CachingSerializer<C, T>
where
	C: RegistryClient + 'static,
	T: ResolveType + Serialize + ?Sized + 'static,
{
	/// `auto_register` enables registering a schema generated from `T`
	/// when a subject has no compatible schema
	pub fn new(client: Arc<C>, strategy: SubjectNameStrategy, auto_register: bool) -> Self {
		Self {
			client,
			strategy,
			auto_register,
			cache: Mutex::new(HashMap::new()),
		}
	}

	/// Serialize `value` as it should be produced to `topic`, wire header
	/// included
	pub async fn serialize(&self, topic: &str, value: &T) -> Result<Vec<u8>, WireError> {
		let subject = self
			.strategy
			.subject_for(topic, &TypeResolution::of::<T>())?;
		let serializer = self.serializer_for(subject).await?;
		serializer.serialize_to_vec(value)
	}

	async fn serializer_for(&self, subject: String) -> Result<Arc<WireSerializer<T>>, WireError> {
		let build = {
			let mut cache = self.cache.lock().expect("cache mutex poisoned");
			match cache.entry(subject) {
				std::collections::hash_map::Entry::Occupied(entry) => entry.get().clone(),
				std::collections::hash_map::Entry::Vacant(entry) => {
					let client = Arc::clone(&self.client);
					let auto_register = self.auto_register;
					let subject = entry.key().clone();
					tracing::debug!(subject = %subject, "compiling wire serializer");
					let build = async move {
						let builder = SerializerBuilder::new(&*client);
						let built = if auto_register {
							builder.build_registering::<T>(&subject).await
						} else {
							builder.build_for_subject::<T>(&subject).await
						};
						built.map(Arc::new).map_err(Arc::new)
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
