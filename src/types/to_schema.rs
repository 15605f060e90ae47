//! Generate a schema for a resolved host type
//!
//! This is what the registry adapter registers when a subject has no
//! (compatible) schema yet.

use super::*;

use crate::schema::{
	ArraySchema, DecimalLogical, EnumSchema, FixedSchema, LogicalType, MapSchema, NodeId,
	RecordField, RecordSchema, Schema, SchemaGraph, SchemaKind, SchemaNode, UnionSchema,
};

impl TypeResolution {
	/// Generate the [`SchemaGraph`] that naturally encodes this resolution
	pub fn to_schema_graph(&self) -> Result<SchemaGraph, SchemaError> {
		let mut state = GenerationState {
			resolution: self,
			nodes: Vec::new(),
			generated: HashMap::new(),
		};
		let root = state.node_for(ResolutionKey { idx: 0 })?;
		assert_eq!(root.idx(), 0, "root schema node should land at index 0");
		Ok(SchemaGraph::from_nodes(state.nodes))
	}

	/// Generate the frozen [`Schema`] that naturally encodes this
	/// resolution
	pub fn to_schema(&self) -> Result<Schema, SchemaError> {
		self.to_schema_graph()?.freeze()
	}
}

struct GenerationState<'r> {
	resolution: &'r TypeResolution,
	nodes: Vec<SchemaNode>,
	/// Already-generated nodes, which also breaks recursion for
	/// self-referential resolutions
	generated: HashMap<ResolutionKey, NodeId>,
}

impl GenerationState<'_> {
	fn node_for(&mut self, key: ResolutionKey) -> Result<NodeId, SchemaError> {
		if let Some(&node_id) = self.generated.get(&key) {
			return Ok(node_id);
		}
		let resolution_node = self.resolution.get(key).ok_or_else(|| {
			SchemaError::msg(format_args!(
				"ResolutionKey {} is out of bounds",
				key.idx()
			))
		})?;
		// Reserve before recursing into members so that cyclic resolutions
		// terminate
		let node_id = NodeId::from_idx(self.nodes.len());
		self.generated.insert(key, node_id);
		self.nodes.push(SchemaNode::new(SchemaKind::Null));
		let node: SchemaNode = match *resolution_node {
			ResolutionNode::Null => SchemaKind::Null.into(),
			ResolutionNode::Boolean => SchemaKind::Boolean.into(),
			ResolutionNode::Integer { bits, signed } => {
				// Unsigned 32-bit values do not all fit in an Avro int
				if (signed && bits <= 32) || (!signed && bits < 32) {
					SchemaKind::Int.into()
				} else {
					SchemaKind::Long.into()
				}
			}
			ResolutionNode::Float { bits: 32 } => SchemaKind::Float.into(),
			ResolutionNode::Float { .. } => SchemaKind::Double.into(),
			ResolutionNode::Decimal { precision, scale } => SchemaNode::with_logical(
				SchemaKind::Bytes,
				LogicalType::Decimal(DecimalLogical { precision, scale }),
			),
			ResolutionNode::Str => SchemaKind::String.into(),
			ResolutionNode::Bytes { fixed_len: None } => SchemaKind::Bytes.into(),
			ResolutionNode::Bytes {
				fixed_len: Some(n),
			} => FixedSchema::new(Name::new(format!("u8_array_{}", n))?, n).into(),
			ResolutionNode::Timestamp { micros } => SchemaNode::with_logical(
				SchemaKind::Long,
				if micros {
					LogicalType::TimestampMicros
				} else {
					LogicalType::TimestampMillis
				},
			),
			ResolutionNode::Duration => SchemaNode::with_logical(
				SchemaKind::Fixed(FixedSchema::new(Name::new("duration")?, 12)),
				LogicalType::Duration,
			),
			ResolutionNode::Uuid => {
				SchemaNode::with_logical(SchemaKind::String, LogicalType::Uuid)
			}
			ResolutionNode::Optional(inner) => {
				let null = self.push(SchemaKind::Null.into());
				let inner = self.node_for(inner)?;
				SchemaKind::Union(UnionSchema::new(vec![null, inner])).into()
			}
			ResolutionNode::Array(items) => {
				SchemaKind::Array(ArraySchema::new(self.node_for(items)?)).into()
			}
			ResolutionNode::Map { keys, values } => {
				match self.resolution.get(keys) {
					Some(ResolutionNode::Str) => {}
					_ => {
						return Err(SchemaError::new(
							"Only string-keyed maps can be represented as an Avro map",
						))
					}
				}
				SchemaKind::Map(MapSchema::new(self.node_for(values)?)).into()
			}
			ResolutionNode::Record(ref record) => {
				let fields = record
					.fields
					.iter()
					.map(|field| {
						Ok(RecordField::new(
							field.name.clone(),
							self.node_for(field.type_)?,
						))
					})
					.collect::<Result<_, SchemaError>>()?;
				RecordSchema::new(record.name.name.clone(), fields)?.into()
			}
			ResolutionNode::Enum(ref enum_) => EnumSchema::new(
				enum_.name.name.clone(),
				enum_.symbols.iter().map(|s| s.name.clone()).collect(),
			)?
			.into(),
		};
		self.nodes[node_id.idx()] = node;
		Ok(node_id)
	}

	fn push(&mut self, node: SchemaNode) -> NodeId {
		let node_id = NodeId::from_idx(self.nodes.len());
		self.nodes.push(node);
		node_id
	}
}
