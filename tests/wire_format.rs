#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::registry::{
		CachingDeserializer, CachingSerializer, DeserializerBuilder, RegisteredSchema,
		RegistryClient, RegistryError, SerializerBuilder, SubjectNameStrategy,
		ERROR_CODE_SUBJECT_NOT_FOUND,
	},
	std::{
		collections::HashMap,
		sync::{
			atomic::{AtomicUsize, Ordering},
			Arc, Mutex,
		},
		time::Duration,
	},
};

/// In-memory registry double: schemas by id, one (latest) schema per
/// subject, and counters for the at-most-once assertions
#[derive(Default)]
struct MockRegistry {
	schemas_by_id: Mutex<HashMap<i32, String>>,
	latest_by_subject: Mutex<HashMap<String, RegisteredSchema>>,
	next_id: AtomicUsize,
	register_calls: AtomicUsize,
	latest_calls: AtomicUsize,
	by_id_calls: AtomicUsize,
	/// Delay served before every `latest_schema` answer, to force overlap
	/// between concurrent builds
	latest_delay: Option<Duration>,
}

impl MockRegistry {
	fn with_schema(id: i32, subject: &str, schema_json: &str) -> Self {
		let registry = Self {
			next_id: AtomicUsize::new(100),
			..Self::default()
		};
		registry
			.schemas_by_id
			.lock()
			.unwrap()
			.insert(id, schema_json.to_owned());
		registry.latest_by_subject.lock().unwrap().insert(
			subject.to_owned(),
			RegisteredSchema {
				id,
				version: 1,
				schema_json: schema_json.to_owned(),
			},
		);
		registry
	}

	fn empty() -> Self {
		Self {
			next_id: AtomicUsize::new(100),
			..Self::default()
		}
	}
}

#[async_trait::async_trait]
impl RegistryClient for MockRegistry {
	async fn schema_by_id(&self, id: i32) -> Result<String, RegistryError> {
		self.by_id_calls.fetch_add(1, Ordering::SeqCst);
		self.schemas_by_id
			.lock()
			.unwrap()
			.get(&id)
			.cloned()
			.ok_or_else(|| RegistryError::with_code(40403, format!("schema id {id} not found")))
	}

	async fn latest_schema(&self, subject: &str) -> Result<RegisteredSchema, RegistryError> {
		self.latest_calls.fetch_add(1, Ordering::SeqCst);
		if let Some(delay) = self.latest_delay {
			tokio::time::sleep(delay).await;
		}
		self.latest_by_subject
			.lock()
			.unwrap()
			.get(subject)
			.cloned()
			.ok_or_else(|| {
				RegistryError::with_code(
					ERROR_CODE_SUBJECT_NOT_FOUND,
					format!("subject {subject} not found"),
				)
			})
	}

	async fn schema_by_version(
		&self,
		subject: &str,
		version: u32,
	) -> Result<String, RegistryError> {
		let latest = self.latest_schema(subject).await?;
		if latest.version != version {
			return Err(RegistryError::with_code(
				40402,
				format!("version {version} of {subject} not found"),
			));
		}
		Ok(latest.schema_json)
	}

	async fn schema_id(&self, subject: &str, _schema_json: &str) -> Result<i32, RegistryError> {
		Ok(self.latest_schema(subject).await?.id)
	}

	async fn register_schema(
		&self,
		subject: &str,
		schema_json: &str,
	) -> Result<i32, RegistryError> {
		self.register_calls.fetch_add(1, Ordering::SeqCst);
		let id = self.next_id.fetch_add(1, Ordering::SeqCst) as i32;
		self.schemas_by_id
			.lock()
			.unwrap()
			.insert(id, schema_json.to_owned());
		self.latest_by_subject.lock().unwrap().insert(
			subject.to_owned(),
			RegisteredSchema {
				id,
				version: 1,
				schema_json: schema_json.to_owned(),
			},
		);
		Ok(id)
	}
}

const WIRE_SUP: &[u8] = &[0x00, 0x00, 0x00, 0x00, 0x0c, 0x06, b's', b'u', b'p'];

#[tokio::test]
async fn decodes_wire_format_payloads() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	let deserializer = DeserializerBuilder::new(&registry)
		.build_for_id::<String>(12)
		.await
		.unwrap();
	assert_eq!(deserializer.deserialize(WIRE_SUP).unwrap(), "sup");
}

#[tokio::test]
async fn rejects_mismatched_schema_ids() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	registry
		.schemas_by_id
		.lock()
		.unwrap()
		.insert(11, r#""string""#.to_owned());
	let deserializer = DeserializerBuilder::new(&registry)
		.build_for_id::<String>(11)
		.await
		.unwrap();
	let err = deserializer.deserialize(WIRE_SUP).unwrap_err();
	assert!(format!("{err}").contains("schema id 12"));
}

#[tokio::test]
async fn rejects_malformed_headers() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	let deserializer = DeserializerBuilder::new(&registry)
		.build_for_id::<String>(12)
		.await
		.unwrap();

	// Truncated header
	let err = deserializer.deserialize(&[0x00, 0x00]).unwrap_err();
	assert!(format!("{err}").contains("too short"));

	// Wrong magic byte
	let mut bad_magic = WIRE_SUP.to_vec();
	bad_magic[0] = 0x01;
	let err = deserializer.deserialize(&bad_magic).unwrap_err();
	assert!(format!("{err}").contains("magic"));
}

#[tokio::test]
async fn serializes_with_wire_header() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	let serializer = SerializerBuilder::new(&registry)
		.build_for_subject::<str>("t-value")
		.await
		.unwrap();
	assert_eq!(serializer.id(), 12);
	assert_eq!(serializer.serialize_to_vec("sup").unwrap(), WIRE_SUP);
}

#[tokio::test]
async fn builds_against_pinned_versions() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	let serializer = SerializerBuilder::new(&registry)
		.build_for_subject_version::<String>("t-value", 1)
		.await
		.unwrap();
	assert_eq!(serializer.id(), 12);

	let err = SerializerBuilder::new(&registry)
		.build_for_subject_version::<String>("t-value", 2)
		.await
		.unwrap_err();
	assert!(format!("{err}").contains("version 2"));
}

#[tokio::test]
async fn incompatible_subject_schema_is_rejected_without_auto_register() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	let err = SerializerBuilder::new(&registry)
		.build_for_subject::<i32>("t-value")
		.await
		.unwrap_err();
	assert!(format!("{err}").contains("incompatible"));
	assert_eq!(registry.register_calls.load(Ordering::SeqCst), 0);
}

/// The latest schema for the subject is `"string"` but the value type is
/// `i32`: with auto-registration the generated `"int"` schema is
/// registered and its fresh id is used in the wire header
#[tokio::test]
async fn auto_registers_on_incompatible_latest() {
	let registry = MockRegistry::with_schema(12, "t-value", r#""string""#);
	let serializer = SerializerBuilder::new(&registry)
		.build_registering::<i32>("t-value")
		.await
		.unwrap();

	assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);
	assert_eq!(
		registry.schemas_by_id.lock().unwrap().get(&100).unwrap(),
		r#""int""#
	);
	assert_eq!(serializer.id(), 100);
	let encoded = serializer.serialize_to_vec(&3).unwrap();
	assert_eq!(encoded, &[0x00, 0x00, 0x00, 0x00, 100, 6]);
}

#[tokio::test]
async fn auto_registers_on_missing_subject() {
	let registry = MockRegistry::empty();
	let serializer = SerializerBuilder::new(&registry)
		.build_registering::<String>("fresh-value")
		.await
		.unwrap();
	assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);
	assert_eq!(serializer.id(), 100);
}

/// N concurrent serializations against a subject the registry doesn't know
/// yet: everyone attaches to the same pending build, and the schema is
/// registered exactly once
#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_serializations_register_at_most_once() {
	let registry = Arc::new(MockRegistry {
		next_id: AtomicUsize::new(100),
		latest_delay: Some(Duration::from_millis(50)),
		..MockRegistry::default()
	});
	let serializer: Arc<CachingSerializer<MockRegistry, String>> = Arc::new(
		CachingSerializer::new(
			Arc::clone(&registry),
			SubjectNameStrategy::TopicName { is_key: false },
			true,
		),
	);

	let tasks: Vec<_> = (0..10)
		.map(|i| {
			let serializer = Arc::clone(&serializer);
			tokio::spawn(async move {
				serializer
					.serialize("events", &format!("message-{i}"))
					.await
					.unwrap()
			})
		})
		.collect();
	for task in tasks {
		let encoded = task.await.unwrap();
		assert_eq!(&encoded[..5], &[0x00, 0x00, 0x00, 0x00, 100]);
	}

	assert_eq!(registry.register_calls.load(Ordering::SeqCst), 1);
	assert_eq!(registry.latest_calls.load(Ordering::SeqCst), 1);
}

/// A failed build stays cached: all callers (concurrent or later) observe
/// the same failure and the registry is not hammered again
#[tokio::test]
async fn failed_builds_stay_cached() {
	let registry = Arc::new(MockRegistry::with_schema(12, "t-value", r#""string""#));
	// No auto-registration: building for an int against "string" fails
	let serializer: Arc<CachingSerializer<MockRegistry, i32>> = Arc::new(CachingSerializer::new(
		Arc::clone(&registry),
		SubjectNameStrategy::TopicName { is_key: false },
		false,
	));

	assert!(serializer.serialize("t", &1).await.is_err());
	assert!(serializer.serialize("t", &2).await.is_err());
	assert_eq!(registry.latest_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn caching_deserializer_resolves_ids_from_payloads() {
	let registry = Arc::new(MockRegistry::with_schema(12, "t-value", r#""string""#));
	let deserializer: CachingDeserializer<MockRegistry, String> =
		CachingDeserializer::new(Arc::clone(&registry));

	assert_eq!(deserializer.deserialize(WIRE_SUP).await.unwrap(), "sup");
	// Second payload with the same id does not hit the registry again
	assert_eq!(deserializer.deserialize(WIRE_SUP).await.unwrap(), "sup");
	assert_eq!(registry.by_id_calls.load(Ordering::SeqCst), 1);
}

#[test]
fn subject_name_strategies() {
	let string_resolution = serde_avro_wire::types::TypeResolution::of::<String>();
	let subject = |strategy: SubjectNameStrategy, resolution| {
		strategy.subject_for("events", resolution).unwrap()
	};
	assert_eq!(
		subject(
			SubjectNameStrategy::TopicName { is_key: false },
			&string_resolution
		),
		"events-value"
	);
	assert_eq!(
		subject(
			SubjectNameStrategy::TopicName { is_key: true },
			&string_resolution
		),
		"events-key"
	);

	struct Named;
	impl serde_avro_wire::types::ResolveType for Named {
		fn resolve(
			resolver: &mut serde_avro_wire::types::TypeResolver,
		) -> serde_avro_wire::types::ResolutionKey {
			let reserved = resolver.reserve();
			resolver.nodes[reserved.idx()] = serde_avro_wire::types::ResolutionNode::Record(
				serde_avro_wire::types::RecordResolution {
					name: serde_avro_wire::types::ResolvedName::explicit("ns.Named").unwrap(),
					fields: vec![],
				},
			);
			reserved
		}
		type Memo = Self;
	}
	let named_resolution = serde_avro_wire::types::TypeResolution::of::<Named>();
	assert_eq!(
		subject(SubjectNameStrategy::RecordName, &named_resolution),
		"ns.Named"
	);
	assert_eq!(
		subject(SubjectNameStrategy::TopicRecordName, &named_resolution),
		"events-ns.Named"
	);
	// Record-name strategies require a named root
	assert!(SubjectNameStrategy::RecordName
		.subject_for("events", &string_resolution)
		.is_err());
}
