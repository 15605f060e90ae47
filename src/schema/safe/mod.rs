//! Defines the editable counterpart of the [`Schema`](crate::Schema): a
//! graph of nodes that can be built, inspected and rewritten before being
//! frozen for use by the serializer and deserializer

mod canonical_form;
mod check_for_cycles;
mod equality;
mod parsing;
mod serializing;

use super::{is_valid_identifier, Name, SchemaError};

pub use check_for_cycles::UnconditionalCycle;

/// An editable representation of an Avro schema
///
/// References to other nodes are represented as [`NodeId`]s, which index
/// into the graph's node storage.
///
/// It is useful to represent the schema this way because, due to how
/// referencing via [Names](https://avro.apache.org/docs/current/specification/#names)
/// works in Avro, a schema is not a tree but a possibly-cyclic directed
/// graph.
#[derive(Clone, Debug)]
pub struct SchemaGraph {
	// First node in the array is considered to be the root
	pub(super) nodes: Vec<SchemaNode>,
	pub(super) schema_json: Option<String>,
}

impl SchemaGraph {
	/// Initialize a [`SchemaGraph`] from a set of nodes
	///
	/// The first node (index `0`) is the root of the schema.
	pub fn from_nodes(nodes: Vec<SchemaNode>) -> Self {
		Self {
			nodes,
			schema_json: None,
		}
	}

	/// Obtain the underlying node storage
	///
	/// The first node (index `0`) is the root of the schema.
	pub fn nodes(&self) -> &[SchemaNode] {
		&self.nodes
	}

	/// Obtain the underlying node storage mutably
	///
	/// This loses the original JSON: if needed again it will be re-generated
	/// from the graph.
	pub fn nodes_mut(&mut self) -> &mut Vec<SchemaNode> {
		self.schema_json = None;
		&mut self.nodes
	}

	/// Obtain the root of the schema
	///
	/// # Panics
	/// If the `nodes` `Vec` is empty. This can only happen if you have
	/// emptied it through [`nodes_mut`](Self::nodes_mut), as parsing
	/// otherwise guarantees that this cannot happen.
	pub fn root(&self) -> &SchemaNode {
		self.nodes.first().expect(
			"Schema should have nodes - have you updated it \
				in such a way that all of its nodes were removed?",
		)
	}

	/// Try to get the node at the given [`NodeId`]
	///
	/// (or return `None` if the key is invalid)
	///
	/// If you want to panic on invalid keys, use `graph[key]` instead.
	pub fn get(&self, key: NodeId) -> Option<&SchemaNode> {
		self.nodes.get(key.idx)
	}

	/// Turn this [`SchemaGraph`] into a [`Schema`](crate::Schema)
	///
	/// [`Schema`](crate::Schema) is necessary for use with the serializer
	/// and deserializer.
	///
	/// This will fail if the schema is invalid (incorrect [`NodeId`],
	/// duplicate union branch kinds, duplicate record field names, logical
	/// type over an incorrect base type, unconditionally cyclic record...)
	pub fn freeze(self) -> Result<super::Schema, SchemaError> {
		self.try_into()
	}
}

/// The location of a node in a [`SchemaGraph`]
///
/// This can be used to [`Index`](std::ops::Index) into the [`SchemaGraph`].
///
/// (Note that `Index`ing into a `SchemaGraph` with an invalid index would
/// cause a panic.)
#[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NodeId {
	pub(super) idx: usize,
}

impl NodeId {
	/// Construct a new `NodeId` from an index in the
	/// [`nodes`](SchemaGraph::nodes) `Vec` of a [`SchemaGraph`]
	pub const fn from_idx(idx: usize) -> Self {
		Self { idx }
	}
	/// Obtain the index in the [`nodes`](SchemaGraph::nodes) `Vec` of a
	/// [`SchemaGraph`] that this [`NodeId`] points to
	pub const fn idx(self) -> usize {
		self.idx
	}
	/// The root of the schema: always the first element of the `nodes` array
	pub const fn root() -> Self {
		Self { idx: 0 }
	}
}
impl std::ops::Index<NodeId> for SchemaGraph {
	type Output = SchemaNode;
	fn index(&self, key: NodeId) -> &Self::Output {
		&self.nodes[key.idx]
	}
}
impl std::fmt::Debug for NodeId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		std::fmt::Debug::fmt(&self.idx, f)
	}
}

/// A node of an Avro schema, stored in a [`SchemaGraph`]
///
/// A node is a regular Avro type, possibly annotated with a logical type.
#[derive(Clone, Debug)]
pub struct SchemaNode {
	/// The underlying regular type of this node
	pub kind: SchemaKind,
	/// Logical type the regular type is annotated with, if any
	pub logical: Option<LogicalType>,
}

impl SchemaNode {
	/// Build a new [`SchemaNode`] from the given regular type, with no
	/// logical type
	///
	/// This is equivalent to `kind.into()`.
	pub fn new(kind: SchemaKind) -> Self {
		kind.into()
	}

	/// Build a new [`SchemaNode`] from the given regular type and logical
	/// type
	pub fn with_logical(kind: SchemaKind, logical: LogicalType) -> Self {
		Self {
			kind,
			logical: Some(logical),
		}
	}
}

/// A primitive or complex type of an Avro schema, stored in a [`SchemaNode`]
///
/// References to other nodes are represented as [`NodeId`]s, which index
/// into the [`SchemaGraph`].
#[derive(Clone, Debug)]
pub enum SchemaKind {
	/// A `null` Avro schema
	Null,
	/// A `boolean` Avro schema
	Boolean,
	/// An `int` Avro schema: 32-bit signed
	Int,
	/// A `long` Avro schema: 64-bit signed
	Long,
	/// A `float` Avro schema: IEEE-754 single precision
	Float,
	/// A `double` Avro schema: IEEE-754 double precision
	Double,
	/// A `bytes` Avro schema: a sequence of 8-bit unsigned bytes
	Bytes,
	/// A `string` Avro schema: a unicode character sequence
	String,
	/// An `array` Avro schema: all elements share the same schema
	Array(ArraySchema),
	/// A `map` Avro schema: string keys, all values share the same schema
	Map(MapSchema),
	/// A `union` Avro schema
	Union(UnionSchema),
	/// A `record` Avro schema (~= a Rust struct)
	Record(RecordSchema),
	/// An `enum` Avro schema (~= a C-style Rust enum)
	Enum(EnumSchema),
	/// A `fixed` Avro schema: a fixed number of raw bytes
	Fixed(FixedSchema),
}

impl SchemaKind {
	/// If the type is a named type, returns its name
	pub fn name(&self) -> Option<&Name> {
		match self {
			SchemaKind::Record(record) => Some(&record.name),
			SchemaKind::Enum(enum_) => Some(&enum_.name),
			SchemaKind::Fixed(fixed) => Some(&fixed.name),
			_ => None,
		}
	}
}

/// Component of a [`SchemaGraph`]
#[derive(Clone, Debug)]
pub struct ArraySchema {
	/// The node id of the schema of each item that will be in the array
	pub items: NodeId,
}
impl ArraySchema {
	/// `items` is the node id of the schema of each item of the array
	pub fn new(items: NodeId) -> Self {
		Self { items }
	}
}

/// Component of a [`SchemaGraph`]
#[derive(Clone, Debug)]
pub struct MapSchema {
	/// The node id of the schema of each value that will be in the map
	///
	/// In an Avro map, all keys are strings.
	pub values: NodeId,
}
impl MapSchema {
	/// `values` is the node id of the schema of each value of the map
	pub fn new(values: NodeId) -> Self {
		Self { values }
	}
}

/// Component of a [`SchemaGraph`]
///
/// Per the Avro union rules (checked when freezing): branches may not
/// themselves be unions, and no two branches may be of the same unnamed
/// kind or be named types with the same full name.
#[derive(Clone, Debug)]
pub struct UnionSchema {
	/// The node ids of the schemas of each branch of this *union*, in
	/// declaration order
	pub variants: Vec<NodeId>,
}
impl UnionSchema {
	/// `variants` is the node ids of the branches, in declaration order
	pub fn new(variants: Vec<NodeId>) -> Self {
		Self { variants }
	}
}

/// Component of a [`SchemaGraph`]
#[derive(Clone, Debug)]
pub struct RecordSchema {
	/// The name of the record (including namespace)
	pub name: Name,
	/// Alternate names this record is known under
	pub aliases: Vec<String>,
	/// Documentation for the record
	pub doc: Option<String>,
	/// The ordered list of fields of this *record*
	pub fields: Vec<RecordField>,
}
impl RecordSchema {
	/// Build a record schema, checking that field names are unique
	pub fn new(name: Name, fields: Vec<RecordField>) -> Result<Self, SchemaError> {
		for (i, field) in fields.iter().enumerate() {
			if fields[..i].iter().any(|other| other.name == field.name) {
				return Err(SchemaError::msg(format_args!(
					"Record {} declares field {:?} more than once",
					name.fully_qualified_name(),
					field.name,
				)));
			}
		}
		Ok(Self {
			name,
			aliases: Vec::new(),
			doc: None,
			fields,
		})
	}
}

/// Component of a [`SchemaGraph`]
#[derive(Clone, Debug)]
pub struct RecordField {
	/// Name of the field
	pub name: String,
	/// Documentation for the field
	pub doc: Option<String>,
	/// The node id of the schema of the type of this field
	pub type_: NodeId,
	/// Default value for the field, as the JSON value the schema declared
	pub default: Option<serde_json::Value>,
}
impl RecordField {
	/// `type_` is the node id of the schema of the type of this field
	pub fn new(name: impl Into<String>, type_: NodeId) -> Self {
		Self {
			name: name.into(),
			doc: None,
			type_,
			default: None,
		}
	}
}

/// Component of a [`SchemaGraph`]
///
/// This is the ~equivalent of a Rust `enum` where none of the variants hold
/// any inner value (e.g. `enum Foo { Bar, Baz }`).
#[derive(Clone, Debug)]
pub struct EnumSchema {
	/// The name of the enum (including namespace)
	pub name: Name,
	/// Alternate names this enum is known under
	pub aliases: Vec<String>,
	/// Documentation for the enum
	pub doc: Option<String>,
	/// All the symbols of the enum (e.g. `["Bar", "Baz"]`), in order
	pub symbols: Vec<String>,
}
impl EnumSchema {
	/// Build an enum schema, checking that symbols are valid identifiers
	/// and unique
	pub fn new(name: Name, symbols: Vec<String>) -> Result<Self, SchemaError> {
		for (i, symbol) in symbols.iter().enumerate() {
			if !is_valid_identifier(symbol) || symbols[..i].contains(symbol) {
				return Err(SchemaError::invalid_symbol(symbol.clone()));
			}
		}
		Ok(Self {
			name,
			aliases: Vec::new(),
			doc: None,
			symbols,
		})
	}
}

/// Component of a [`SchemaGraph`]
#[derive(Clone, Debug)]
pub struct FixedSchema {
	/// The name of the *fixed* type, including the namespace
	pub name: Name,
	/// Alternate names this fixed is known under
	pub aliases: Vec<String>,
	/// The size in bytes of the *fixed* type
	pub size: usize,
}
impl FixedSchema {
	/// `size` is the size in bytes of the fixed type
	pub fn new(name: Name, size: usize) -> Self {
		Self {
			name,
			aliases: Vec::new(),
			size,
		}
	}
}

/// Logical type annotating a [`SchemaNode`]
///
/// <https://avro.apache.org/docs/current/specification/#logical-types>
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum LogicalType {
	/// Decimal number: two's-complement big-endian unscaled value over
	/// `bytes` or `fixed`, with a fixed decimal point position
	Decimal(DecimalLogical),
	/// A universally unique identifier, annotating a `string`
	Uuid,
	/// Number of days since the unix epoch, annotating an `int`
	Date,
	/// Time of day in milliseconds after midnight, annotating an `int`
	TimeMillis,
	/// Time of day in microseconds after midnight, annotating a `long`
	TimeMicros,
	/// Instant in milliseconds since the unix epoch, annotating a `long`
	TimestampMillis,
	/// Instant in microseconds since the unix epoch, annotating a `long`
	TimestampMicros,
	/// An amount of time defined by months, days and milliseconds,
	/// annotating a `fixed` of size 12 (three little-endian `u32`s)
	Duration,
	/// A logical type this library does not know
	///
	/// The annotated node behaves as its base type. The name is preserved
	/// so it can be inspected via [`as_str`](LogicalType::as_str).
	Unknown(UnknownLogicalType),
}

/// Component of a [`SchemaGraph`]
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct DecimalLogical {
	/// Upper bound on the number of significant digits (informational)
	pub precision: usize,
	/// Number of digits to the right of the decimal point
	pub scale: u32,
}
impl DecimalLogical {
	/// `precision` is the number of significant digits, `scale` the number
	/// of digits to the right of the decimal point
	pub fn new(precision: usize, scale: u32) -> Self {
		Self { precision, scale }
	}
}

/// Component of a [`SchemaGraph`]
///
/// A logical type that is not known to this library, preserved by name.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnknownLogicalType {
	/// The name of the logical type, as it appears in the schema JSON
	pub logical_type_name: String,
}
impl UnknownLogicalType {
	/// `logical_type_name` is the name as it appears in the schema JSON
	pub fn new(logical_type_name: impl Into<String>) -> Self {
		Self {
			logical_type_name: logical_type_name.into(),
		}
	}
}

impl LogicalType {
	/// The name of the logical type, as used in the schema JSON
	pub fn as_str(&self) -> &str {
		match self {
			LogicalType::Decimal(_) => "decimal",
			LogicalType::Uuid => "uuid",
			LogicalType::Date => "date",
			LogicalType::TimeMillis => "time-millis",
			LogicalType::TimeMicros => "time-micros",
			LogicalType::TimestampMillis => "timestamp-millis",
			LogicalType::TimestampMicros => "timestamp-micros",
			LogicalType::Duration => "duration",
			LogicalType::Unknown(unknown) => &unknown.logical_type_name,
		}
	}
}

impl From<SchemaKind> for SchemaNode {
	fn from(kind: SchemaKind) -> Self {
		Self {
			kind,
			logical: None,
		}
	}
}

macro_rules! impl_froms_for_kind {
	($($component: ident => $variant: ident)*) => {
		$(
			impl From<$component> for SchemaKind {
				fn from(component: $component) -> Self {
					Self::$variant(component)
				}
			}
			impl From<$component> for SchemaNode {
				fn from(component: $component) -> Self {
					Self {
						kind: SchemaKind::$variant(component),
						logical: None,
					}
				}
			}
		)*
	};
}
impl_froms_for_kind! {
	ArraySchema => Array
	MapSchema => Map
	UnionSchema => Union
	RecordSchema => Record
	EnumSchema => Enum
	FixedSchema => Fixed
}
