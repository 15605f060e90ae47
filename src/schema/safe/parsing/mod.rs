//! JSON schema text -> [`SchemaGraph`]

mod raw;

use crate::schema::safe::*;

use std::collections::HashMap;

/// Marks a [`NodeId`] as an index into the pending-references table instead
/// of the node storage, until the whole document has been read
const PENDING_REF_BIT: usize = 1usize << (usize::BITS - 1);

struct SchemaConstructionState<'a> {
	nodes: Vec<SchemaNode>,
	names: HashMap<NameKey<'a>, usize>,
	pending_refs: Vec<NameKey<'a>>,
}

impl std::str::FromStr for SchemaGraph {
	type Err = SchemaError;
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let mut state = SchemaConstructionState {
			nodes: Vec::new(),
			names: HashMap::new(),
			pending_refs: Vec::new(),
		};

		let raw_schema: raw::RawNode = serde_json::from_str(s).map_err(SchemaError::serde_json)?;

		state.register_node(&raw_schema, None)?;

		// Names may be referenced before (or after) their definition, so
		// resolve whatever is still pending now that everything was read
		if !state.pending_refs.is_empty() {
			let resolved: Vec<NodeId> = state
				.pending_refs
				.iter()
				.map(|name| match state.names.get(name) {
					Some(&idx) => Ok(NodeId { idx }),
					None => Err(SchemaError::unknown(vec![format!(
						"{} is not a known schema reference",
						name
					)])),
				})
				.collect::<Result<_, _>>()?;
			let fix_key = |key: &mut NodeId| {
				if key.idx & PENDING_REF_BIT != 0 {
					*key = resolved[key.idx ^ PENDING_REF_BIT];
				}
			};
			for schema_node in &mut state.nodes {
				match &mut schema_node.kind {
					SchemaKind::Array(ArraySchema { items: key })
					| SchemaKind::Map(MapSchema { values: key }) => fix_key(key),
					SchemaKind::Union(union) => union.variants.iter_mut().for_each(fix_key),
					SchemaKind::Record(record) => {
						record.fields.iter_mut().for_each(|f| fix_key(&mut f.type_))
					}
					SchemaKind::Null
					| SchemaKind::Boolean
					| SchemaKind::Int
					| SchemaKind::Long
					| SchemaKind::Float
					| SchemaKind::Double
					| SchemaKind::Bytes
					| SchemaKind::String
					| SchemaKind::Enum(_)
					| SchemaKind::Fixed(_) => {}
				}
			}
		}

		let schema = Self {
			nodes: state.nodes,
			schema_json: Some(
				String::from_utf8({
					// Sanitize & minify json, preserving all keys
					let mut serializer = serde_json::Serializer::new(Vec::new());
					serde_transcode::transcode(
						&mut serde_json::Deserializer::from_str(s),
						&mut serializer,
					)
					.map_err(SchemaError::serde_json)?;
					serializer.into_inner()
				})
				.map_err(|e| {
					SchemaError::msg(format_args!(
						"serde_json should not emit invalid UTF-8 but got {e}"
					))
				})?,
			),
		};

		schema
			.check_for_cycles()
			.map_err(|e: UnconditionalCycle| SchemaError::display(e))?;

		Ok(schema)
	}
}

impl<'a> SchemaConstructionState<'a> {
	fn register_node(
		&mut self,
		raw_node: &'a raw::RawNode<'a>,
		enclosing_namespace: Option<&'a str>,
	) -> Result<NodeId, SchemaError> {
		Ok(match *raw_node {
			raw::RawNode::Type(type_) => {
				let idx = self.nodes.len();
				self.nodes.push(SchemaNode::new(primitive_kind(type_)?));
				NodeId { idx }
			}
			raw::RawNode::Union(ref variants) => {
				let idx = self.nodes.len();
				// Reserve the spot for us so that the discriminant order is
				// that of the document
				self.nodes.push(SchemaNode::new(SchemaKind::Null));
				let union = UnionSchema::new(
					variants
						.iter()
						.map(|variant| self.register_node(variant, enclosing_namespace))
						.collect::<Result<_, _>>()?,
				);
				self.nodes[idx] = SchemaNode::new(SchemaKind::Union(union));
				NodeId { idx }
			}
			raw::RawNode::Ref(ref reference) => {
				// This is the fullname of a named type. The Avro
				// specification wants the definition parsed before the
				// reference, but we also support the unordered case.
				let name_key = NameKey::from_reference(reference, enclosing_namespace);
				match self.names.get(&name_key) {
					Some(&idx) => NodeId { idx },
					None => {
						let idx = self.pending_refs.len();
						self.pending_refs.push(name_key);
						NodeId {
							idx: idx | PENDING_REF_BIT,
						}
					}
				}
			}
			raw::RawNode::Object(ref object) => self.register_object(object, enclosing_namespace)?,
		})
	}

	fn register_object(
		&mut self,
		object: &'a raw::RawObject<'a>,
		enclosing_namespace: Option<&'a str>,
	) -> Result<NodeId, SchemaError> {
		let idx = self.nodes.len();

		let logical = match object.logical_type {
			None => None,
			Some(ref logical_type) => Some(parse_logical_type(&logical_type.0, object)?),
		};

		let name_key = |required_by: raw::Type| -> Result<NameKey<'a>, SchemaError> {
			let name: &str = match object.name {
				Some(ref name) => &name.0,
				None => {
					return Err(SchemaError::msg(format_args!(
						"Missing name for type {:?}",
						required_by
					)))
				}
			};
			Ok(if let Some((namespace, name)) = name.rsplit_once('.') {
				// A dotted name carries its own namespace, the `namespace`
				// attribute is ignored
				NameKey {
					namespace: Some(namespace).filter(|s| !s.is_empty()),
					name,
				}
			} else {
				NameKey {
					namespace: match object.namespace {
						// An explicitly empty namespace means the null
						// namespace, regardless of what encloses us
						Some(ref namespace) => Some(&*namespace.0).filter(|s| !s.is_empty()),
						None => enclosing_namespace,
					},
					name,
				}
			})
		};

		let aliases = || -> Vec<String> {
			object
				.aliases
				.iter()
				.flatten()
				.map(|alias| (*alias.0).to_owned())
				.collect()
		};
		let doc = || object.doc.as_ref().map(|doc| (*doc.0).to_owned());

		macro_rules! field {
			($type_: ident, $name: ident) => {
				match &object.$name {
					Some(v) => v,
					None => {
						return Err(SchemaError::msg(format_args!(
							concat!("Missing field `", stringify!($name), "` on type {:?}"),
							$type_
						)));
					}
				}
			};
		}

		let kind = match object.type_ {
			raw::RawNode::Type(t @ raw::Type::Array) => {
				// Reserve the spot before recursing so that this node gets
				// the id callers will use
				self.nodes.push(SchemaNode::new(SchemaKind::Null));
				SchemaKind::Array(ArraySchema::new(
					self.register_node(field!(t, items), enclosing_namespace)?,
				))
			}
			raw::RawNode::Type(t @ raw::Type::Map) => {
				self.nodes.push(SchemaNode::new(SchemaKind::Null));
				SchemaKind::Map(MapSchema::new(
					self.register_node(field!(t, values), enclosing_namespace)?,
				))
			}
			raw::RawNode::Type(t @ raw::Type::Enum) => {
				let name_key = name_key(t)?;
				self.intern(name_key, idx)?;
				self.nodes.push(SchemaNode::new(SchemaKind::Null));
				let mut enum_ = EnumSchema::new(
					name_key.name()?,
					field!(t, symbols)
						.iter()
						.map(|s| (*s.0).to_owned())
						.collect(),
				)?;
				enum_.aliases = aliases();
				enum_.doc = doc();
				SchemaKind::Enum(enum_)
			}
			raw::RawNode::Type(t @ raw::Type::Fixed) => {
				let name_key = name_key(t)?;
				self.intern(name_key, idx)?;
				self.nodes.push(SchemaNode::new(SchemaKind::Null));
				let mut fixed = FixedSchema::new(name_key.name()?, *field!(t, size));
				fixed.aliases = aliases();
				SchemaKind::Fixed(fixed)
			}
			raw::RawNode::Type(t @ raw::Type::Record) => {
				let name_key = name_key(t)?;
				// Interning happens before the fields are read, so that a
				// record referring to itself by name can resolve
				self.intern(name_key, idx)?;
				self.nodes.push(SchemaNode::new(SchemaKind::Null));
				let fields = field!(t, fields)
					.iter()
					.map(|field| {
						let mut record_field = RecordField::new(
							(*field.name.0).to_owned(),
							self.register_node(&field.type_, name_key.namespace)?,
						);
						record_field.doc = field.doc.as_ref().map(|doc| (*doc.0).to_owned());
						record_field.default = field.default.clone();
						Ok(record_field)
					})
					.collect::<Result<_, SchemaError>>()?;
				let mut record = RecordSchema::new(name_key.name()?, fields)?;
				record.aliases = aliases();
				record.doc = doc();
				SchemaKind::Record(record)
			}
			raw::RawNode::Type(primitive) => primitive_kind(primitive)?,
			ref nested @ (raw::RawNode::Object(_) | raw::RawNode::Union(_) | raw::RawNode::Ref(_)) => {
				// `{"type": {"type": "string"}}` (or a field-like wrapper
				// around a union) is a valid representation of the inner
				// type, but unwrapping it must not drop anything structural
				if object.has_structural_attributes() {
					return Err(SchemaError::new(
						"Got unnecessarily-nested type, but structural object properties \
							are set - those would be ignored",
					));
				}
				if logical.is_some() {
					return Err(SchemaError::new(
						"Logical type annotations on nested or referenced types \
							are not supported",
					));
				}
				// A namespace on the wrapper still applies to what's inside
				let passthrough_namespace = match object.namespace {
					Some(ref namespace) => Some(&*namespace.0).filter(|s| !s.is_empty()),
					None => enclosing_namespace,
				};
				return self.register_node(nested, passthrough_namespace);
			}
		};

		let node = SchemaNode { kind, logical };
		match self.nodes.get_mut(idx) {
			Some(reserved) => *reserved = node,
			None => self.nodes.push(node),
		}
		Ok(NodeId { idx })
	}

	fn intern(&mut self, name_key: NameKey<'a>, idx: usize) -> Result<(), SchemaError> {
		if self.names.insert(name_key, idx).is_some() {
			return Err(SchemaError::conflicting(name_key.to_string()));
		}
		Ok(())
	}
}

fn primitive_kind(type_: raw::Type) -> Result<SchemaKind, SchemaError> {
	Ok(match type_ {
		raw::Type::Null => SchemaKind::Null,
		raw::Type::Boolean => SchemaKind::Boolean,
		raw::Type::Int => SchemaKind::Int,
		raw::Type::Long => SchemaKind::Long,
		raw::Type::Float => SchemaKind::Float,
		raw::Type::Double => SchemaKind::Double,
		raw::Type::Bytes => SchemaKind::Bytes,
		raw::Type::String => SchemaKind::String,
		complex @ (raw::Type::Array
		| raw::Type::Map
		| raw::Type::Record
		| raw::Type::Enum
		| raw::Type::Fixed) => {
			return Err(SchemaError::msg(format_args!(
				"Expected primitive type name, but got {:?} as type, \
					which is a complex type, so should be in an object",
				complex
			)))
		}
	})
}

fn parse_logical_type(
	logical_type: &str,
	object: &raw::RawObject<'_>,
) -> Result<LogicalType, SchemaError> {
	Ok(match logical_type {
		"decimal" => LogicalType::Decimal(DecimalLogical {
			precision: match object.precision {
				Some(precision) => precision,
				None => {
					return Err(SchemaError::new(
						"Missing field `precision` on decimal logical type",
					))
				}
			},
			// Unlike precision, scale defaults to zero
			scale: object.scale.unwrap_or(0),
		}),
		"uuid" => LogicalType::Uuid,
		"date" => LogicalType::Date,
		"time-millis" => LogicalType::TimeMillis,
		"time-micros" => LogicalType::TimeMicros,
		"timestamp-millis" => LogicalType::TimestampMillis,
		"timestamp-micros" => LogicalType::TimestampMicros,
		"duration" => LogicalType::Duration,
		unknown => LogicalType::Unknown(UnknownLogicalType::new(unknown)),
	})
}

#[derive(PartialEq, Eq, Hash, Clone, Copy)]
struct NameKey<'a> {
	namespace: Option<&'a str>,
	name: &'a str,
}
impl<'a> NameKey<'a> {
	fn from_reference(reference: &'a str, enclosing_namespace: Option<&'a str>) -> Self {
		if let Some((namespace, name)) = reference.rsplit_once('.') {
			NameKey {
				namespace: Some(namespace).filter(|s| !s.is_empty()),
				name,
			}
		} else {
			NameKey {
				namespace: enclosing_namespace,
				name: reference,
			}
		}
	}
	fn name(&self) -> Result<Name, SchemaError> {
		Name::from_parts(self.namespace, self.name)
	}
}
impl std::fmt::Display for NameKey<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		match self.namespace {
			None => self.name.fmt(f),
			Some(namespace) => write!(f, "{}.{}", namespace, self.name),
		}
	}
}
