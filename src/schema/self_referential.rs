//! Pre-computed, self-referential form of the schema, used by the
//! serializer and deserializer

use super::{
	safe::{self, LogicalType, SchemaKind},
	union_selection::BranchLookup,
	SchemaError,
};

use std::{
	collections::{HashMap, HashSet},
	marker::PhantomData,
};

pub(crate) use super::Name;

/// Main schema type: opaque, pre-computed representation of an Avro schema
///
/// This is what the serializer and deserializer run on.
///
/// To achieve ideal performance and ease of use via self-referencing nodes,
/// it is built using `unsafe`, so it can only be obtained through
/// [its editable counterpart](crate::schema::SchemaGraph) (via
/// [`freeze`](crate::schema::SchemaGraph::freeze), [`TryFrom`] or
/// [`FromStr`](std::str::FromStr)), which keeps the conversion code simple
/// enough that its correctness can reasonably be guaranteed despite the
/// usage of `unsafe`.
///
/// Due to how referencing via
/// [Names](https://avro.apache.org/docs/current/specification/#names) works
/// in Avro, the runtime representation is a possibly-cyclic directed graph,
/// not a tree.
pub struct Schema {
	// First node in the array is considered to be the root
	//
	// This lifetime is fake: all elements are accessed through the `root`
	// function which downgrades it, and nothing is ever pushed in there
	// (which would reallocate and invalidate all nodes)
	nodes: Vec<CodecNode<'static>>,
	schema_json: String,
}

impl Schema {
	/// The root node of the schema graph
	pub(crate) fn root<'a>(&'a self) -> NodeRef<'a> {
		// the signature of this function downgrades the fake 'static
		// lifetime in a way that makes it correct
		assert!(
			!self.nodes.is_empty(),
			"Schema must have at least one node (the root)"
		);
		// SAFETY: bounds checked just above
		unsafe { NodeRef::new(self.nodes.as_ptr() as *mut _) }
	}

	/// Obtain the JSON text for this schema
	///
	/// If the schema was parsed from JSON, this is the (minified) input
	/// text, all attributes preserved; otherwise it was generated from the
	/// graph.
	pub fn json(&self) -> &str {
		&self.schema_json
	}
}

/// A `NodeRef` is a pointer to a node of a [`Schema`]
///
/// This is morally equivalent to `&'a CodecNode<'a>`, only Rust will not
/// assume as much when it comes to aliasing constraints.
///
/// SAFETY: the invariant to uphold is that with regards to lifetimes this
/// behaves like an `&'a CodecNode<'a>`. Plain references are not used
/// because the pointees get updated after references to them are created
/// while building the schema, and that does not pass Miri's Stacked Borrows
/// checks.
pub(crate) struct NodeRef<'a, N = CodecNode<'a>> {
	node: std::ptr::NonNull<N>,
	_spooky: PhantomData<&'a N>,
}
impl<N> Copy for NodeRef<'_, N> {}
impl<N> Clone for NodeRef<'_, N> {
	fn clone(&self) -> Self {
		*self
	}
}
/// SAFETY: `NonNull` is `!Send !Sync`, but `NodeRef` is really just a
/// reference, so we can implement `Send`/`Sync` whenever the node is `Sync`
unsafe impl<T: Sync> Sync for NodeRef<'_, T> {}
/// SAFETY: see the `Sync` impl
unsafe impl<T: Sync> Send for NodeRef<'_, T> {}
impl<N> NodeRef<'static, N> {
	const unsafe fn new(ptr: *mut N) -> Self {
		Self {
			node: std::ptr::NonNull::new_unchecked(ptr),
			_spooky: PhantomData,
		}
	}
}
impl<'a, N> NodeRef<'a, N> {
	/// Compared to `Deref`, this propagates the lifetime of the reference
	pub(crate) fn as_ref(self) -> &'a N {
		// SAFETY: this module never leaks a `NodeRef` that isn't tied to
		// the appropriate lifetime
		unsafe { self.node.as_ref() }
	}
}
impl<'a, N> std::ops::Deref for NodeRef<'a, N> {
	type Target = N;
	fn deref(&self) -> &Self::Target {
		self.as_ref()
	}
}

/// A node of the pre-computed schema graph, borrowed from a [`Schema`]
///
/// Logical types the codecs interpret are fused into dedicated variants, so
/// the (de)serializers dispatch on a single `match`.
pub(crate) enum CodecNode<'a> {
	Null,
	Boolean,
	Int,
	Long,
	Float,
	Double,
	Bytes,
	String,
	Array(NodeRef<'a>),
	Map(NodeRef<'a>),
	Union(UnionCodec<'a>),
	Record(RecordCodec<'a>),
	Enum(EnumCodec),
	Fixed(FixedCodec),
	Decimal(DecimalCodec),
	Uuid,
	Date,
	TimeMillis,
	TimeMicros,
	TimestampMillis,
	TimestampMicros,
	Duration,
}

/// Component of a [`CodecNode`]
pub(crate) struct UnionCodec<'a> {
	pub(crate) variants: Vec<NodeRef<'a>>,
	pub(crate) branch_lookup: BranchLookup<'a>,
}

impl std::fmt::Debug for UnionCodec<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		// Skip branch_lookup for readability
		f.debug_struct("Union")
			.field("variants", &self.variants)
			.finish()
	}
}

/// Component of a [`CodecNode`]
pub(crate) struct RecordCodec<'a> {
	pub(crate) fields: Vec<RecordFieldCodec<'a>>,
	pub(crate) name: Name,
	pub(crate) per_name_lookup: HashMap<String, usize>,
}

impl std::fmt::Debug for RecordCodec<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Record")
			.field("fields", &self.fields)
			.field("name", &self.name)
			.finish()
	}
}

/// Component of a [`CodecNode`]
#[derive(Debug)]
pub(crate) struct RecordFieldCodec<'a> {
	pub(crate) name: String,
	pub(crate) schema: NodeRef<'a>,
}

/// Component of a [`CodecNode`]
pub(crate) struct EnumCodec {
	pub(crate) symbols: Vec<String>,
	pub(crate) name: Name,
	pub(crate) per_name_lookup: HashMap<String, usize>,
}

impl std::fmt::Debug for EnumCodec {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Enum")
			.field("name", &self.name)
			.field("symbols", &self.symbols)
			.finish()
	}
}

/// Component of a [`CodecNode`]
#[derive(Clone, Debug)]
pub(crate) struct FixedCodec {
	pub(crate) name: Name,
	pub(crate) size: usize,
}

/// Component of a [`CodecNode`]
#[derive(Clone, Debug)]
pub(crate) struct DecimalCodec {
	/// Informational upper bound, tolerated but not enforced when coding
	pub(crate) _precision: usize,
	pub(crate) scale: u32,
	pub(crate) repr: DecimalRepr,
}
#[derive(Clone, Debug)]
pub(crate) enum DecimalRepr {
	Bytes,
	Fixed(FixedCodec),
}

impl TryFrom<safe::SchemaGraph> for Schema {
	type Error = SchemaError;
	fn try_from(safe: safe::SchemaGraph) -> Result<Self, SchemaError> {
		if safe.nodes().is_empty() {
			return Err(SchemaError::new(
				"Schema must have at least one node (the root)",
			));
		}
		validate(&safe)?;

		// The `nodes` allocation must never move, otherwise the references
		// would be invalidated
		let mut ret = Self {
			nodes: (0..safe.nodes().len()).map(|_| CodecNode::Null).collect(),
			schema_json: match safe.schema_json {
				None => safe.serialize_to_json()?,
				Some(ref json) => json.clone(),
			},
		};
		let len = ret.nodes.len();
		// Let's be extra-sure (second condition is for calls to add)
		assert!(len > 0 && len == safe.nodes.len() && len <= (isize::MAX as usize));
		let storage_start_ptr = ret.nodes.as_mut_ptr();
		// `validate` has checked all the ids already
		let key_to_ref = |key: safe::NodeId| -> NodeRef<'static> {
			assert!(key.idx() < len, "validate should have checked all node ids");
			// SAFETY: see below
			unsafe { NodeRef::new(storage_start_ptr.add(key.idx())) }
		};

		// Now we can initialize the nodes
		let mut curr_storage_node_ptr = storage_start_ptr;
		for safe_node in safe.nodes {
			// SAFETY:
			// - The nodes created here never move in memory since the
			//   entire vec is preallocated and nothing is pushed.
			// - The fake `'static` lifetimes are always downgraded before
			//   being made available.
			// - Only pointers derived from `as_mut_ptr` are used from this
			//   point on, so the compiler has no aliasing constraints.
			// - The ~references created by `key_to_ref` are not
			//   dereferenced until all nodes are initialized.

			let new_node = match fused_logical(&safe_node) {
				Some(fused) => fused,
				None => match safe_node.kind {
					SchemaKind::Null => CodecNode::Null,
					SchemaKind::Boolean => CodecNode::Boolean,
					SchemaKind::Int => CodecNode::Int,
					SchemaKind::Long => CodecNode::Long,
					SchemaKind::Float => CodecNode::Float,
					SchemaKind::Double => CodecNode::Double,
					SchemaKind::Bytes => CodecNode::Bytes,
					SchemaKind::String => CodecNode::String,
					SchemaKind::Array(array) => CodecNode::Array(key_to_ref(array.items)),
					SchemaKind::Map(map) => CodecNode::Map(key_to_ref(map.values)),
					SchemaKind::Union(union) => CodecNode::Union(UnionCodec {
						variants: union.variants.into_iter().map(key_to_ref).collect(),
						// Can't be initialized just yet because the other
						// nodes may not have been initialized
						branch_lookup: BranchLookup::placeholder(),
					}),
					SchemaKind::Record(record) => CodecNode::Record(RecordCodec {
						per_name_lookup: record
							.fields
							.iter()
							.enumerate()
							.map(|(i, f)| (f.name.clone(), i))
							.collect(),
						fields: record
							.fields
							.into_iter()
							.map(|field| RecordFieldCodec {
								name: field.name,
								schema: key_to_ref(field.type_),
							})
							.collect(),
						name: record.name,
					}),
					SchemaKind::Enum(enum_) => CodecNode::Enum(EnumCodec {
						per_name_lookup: enum_
							.symbols
							.iter()
							.enumerate()
							.map(|(i, s)| (s.clone(), i))
							.collect(),
						symbols: enum_.symbols,
						name: enum_.name,
					}),
					SchemaKind::Fixed(fixed) => CodecNode::Fixed(FixedCodec {
						name: fixed.name,
						size: fixed.size,
					}),
				},
			};
			// SAFETY: see comment at beginning of loop
			unsafe {
				*curr_storage_node_ptr = new_node;
				curr_storage_node_ptr = curr_storage_node_ptr.add(1);
			};
		}

		// Now that all nodes are fully initialized (except their
		// `branch_lookup` tables) the lookup tables can be built. This has
		// to happen after every node is initialized because the table may
		// read late-initialized fields of the other nodes (e.g. decimal
		// repr).
		curr_storage_node_ptr = storage_start_ptr;
		for _ in 0..len {
			// SAFETY: `BranchLookup::new` never reads `branch_lookup` of
			// the other nodes, so there are no aliasing issues
			unsafe {
				if let CodecNode::Union(UnionCodec {
					ref variants,
					ref mut branch_lookup,
				}) = *curr_storage_node_ptr
				{
					*branch_lookup = BranchLookup::new(variants);
				}
				curr_storage_node_ptr = curr_storage_node_ptr.add(1);
			}
		}
		Ok(ret)
	}
}

/// If the node's logical type is known and its base type agrees, the codec
/// node it fuses into
///
/// A known logical type over an incorrect base, or an unknown logical type,
/// behaves as its base type (the Avro rule for unhandled logical types).
fn fused_logical(node: &safe::SchemaNode) -> Option<CodecNode<'static>> {
	Some(match (node.logical.as_ref()?, &node.kind) {
		(LogicalType::Decimal(decimal), SchemaKind::Bytes) => CodecNode::Decimal(DecimalCodec {
			_precision: decimal.precision,
			scale: decimal.scale,
			repr: DecimalRepr::Bytes,
		}),
		(LogicalType::Decimal(decimal), SchemaKind::Fixed(fixed)) => {
			CodecNode::Decimal(DecimalCodec {
				_precision: decimal.precision,
				scale: decimal.scale,
				repr: DecimalRepr::Fixed(FixedCodec {
					name: fixed.name.clone(),
					size: fixed.size,
				}),
			})
		}
		(LogicalType::Uuid, SchemaKind::String) => CodecNode::Uuid,
		(LogicalType::Date, SchemaKind::Int) => CodecNode::Date,
		(LogicalType::TimeMillis, SchemaKind::Int) => CodecNode::TimeMillis,
		(LogicalType::TimeMicros, SchemaKind::Long) => CodecNode::TimeMicros,
		(LogicalType::TimestampMillis, SchemaKind::Long) => CodecNode::TimestampMillis,
		(LogicalType::TimestampMicros, SchemaKind::Long) => CodecNode::TimestampMicros,
		(LogicalType::Duration, SchemaKind::Fixed(fixed)) if fixed.size == 12 => {
			CodecNode::Duration
		}
		_ => return None,
	})
}

/// Check every structural invariant the codecs rely on, so that the
/// conversion itself cannot fail
fn validate(safe: &safe::SchemaGraph) -> Result<(), SchemaError> {
	let node = |key: safe::NodeId| {
		safe.get(key).ok_or_else(|| {
			SchemaError::msg(format_args!(
				"NodeId {} is out of bounds (len: {})",
				key.idx(),
				safe.nodes().len(),
			))
		})
	};
	for current in safe.nodes() {
		match &current.kind {
			SchemaKind::Array(array) => {
				node(array.items)?;
			}
			SchemaKind::Map(map) => {
				node(map.values)?;
			}
			SchemaKind::Union(union) => {
				let mut seen = HashSet::with_capacity(union.variants.len());
				for &variant_key in &union.variants {
					let variant = node(variant_key)?;
					let branch_kind = match &variant.kind {
						SchemaKind::Union(_) => {
							return Err(SchemaError::new(
								"Union may not directly contain another union",
							))
						}
						named @ (SchemaKind::Record(_)
						| SchemaKind::Enum(_)
						| SchemaKind::Fixed(_)) => {
							let name = named
								.name()
								.expect("named kinds have names")
								.fully_qualified_name();
							format!("named:{name}")
						}
						SchemaKind::Null => "null".to_owned(),
						SchemaKind::Boolean => "boolean".to_owned(),
						SchemaKind::Int => "int".to_owned(),
						SchemaKind::Long => "long".to_owned(),
						SchemaKind::Float => "float".to_owned(),
						SchemaKind::Double => "double".to_owned(),
						SchemaKind::Bytes => "bytes".to_owned(),
						SchemaKind::String => "string".to_owned(),
						SchemaKind::Array(_) => "array".to_owned(),
						SchemaKind::Map(_) => "map".to_owned(),
					};
					if !seen.insert(branch_kind.clone()) {
						return Err(SchemaError::msg(format_args!(
							"Union contains several branches of the same kind: {branch_kind}",
						)));
					}
				}
			}
			SchemaKind::Record(record) => {
				for (i, field) in record.fields.iter().enumerate() {
					node(field.type_)?;
					if record.fields[..i].iter().any(|other| other.name == field.name) {
						return Err(SchemaError::msg(format_args!(
							"Record {} declares field {:?} more than once",
							record.name.fully_qualified_name(),
							field.name,
						)));
					}
				}
			}
			SchemaKind::Enum(enum_) => {
				for (i, symbol) in enum_.symbols.iter().enumerate() {
					if !super::is_valid_identifier(symbol) || enum_.symbols[..i].contains(symbol) {
						return Err(SchemaError::invalid_symbol(symbol.clone()));
					}
				}
			}
			SchemaKind::Null
			| SchemaKind::Boolean
			| SchemaKind::Int
			| SchemaKind::Long
			| SchemaKind::Float
			| SchemaKind::Double
			| SchemaKind::Bytes
			| SchemaKind::String
			| SchemaKind::Fixed(_) => {}
		}
	}
	safe.check_for_cycles().map_err(SchemaError::display)?;
	Ok(())
}

impl std::fmt::Debug for Schema {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		<CodecNode<'_> as std::fmt::Debug>::fmt(self.root().as_ref(), f)
	}
}

impl<N: std::fmt::Debug> std::fmt::Debug for NodeRef<'_, N> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		<N as std::fmt::Debug>::fmt(self.as_ref(), f)
	}
}

impl std::fmt::Debug for CodecNode<'_> {
	fn fmt(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
		// Cap the rendering depth so that cyclic schemas don't overflow the
		// stack when debug-printed

		use std::cell::Cell;
		struct DepthGuard;
		thread_local! {
			static DEPTH: Cell<u32> = const { Cell::new(0) };
		}
		impl Drop for DepthGuard {
			fn drop(&mut self) {
				DEPTH.with(|cell| cell.set(cell.get().checked_sub(1).unwrap()));
			}
		}
		const MAX_DEPTH: u32 = 2;
		let depth = DEPTH.with(|cell| {
			let val = cell.get();
			cell.set(val + 1);
			val
		});
		let _decrement_depth_guard = DepthGuard;

		fn nested(
			f: &mut std::fmt::Formatter,
			depth: u32,
			name: &str,
			inner: &dyn std::fmt::Debug,
		) -> std::fmt::Result {
			let mut d = f.debug_tuple(name);
			if depth < MAX_DEPTH {
				d.field(inner);
			}
			d.finish()
		}

		match self {
			CodecNode::Null => f.debug_tuple("Null").finish(),
			CodecNode::Boolean => f.debug_tuple("Boolean").finish(),
			CodecNode::Int => f.debug_tuple("Int").finish(),
			CodecNode::Long => f.debug_tuple("Long").finish(),
			CodecNode::Float => f.debug_tuple("Float").finish(),
			CodecNode::Double => f.debug_tuple("Double").finish(),
			CodecNode::Bytes => f.debug_tuple("Bytes").finish(),
			CodecNode::String => f.debug_tuple("String").finish(),
			CodecNode::Array(inner) => nested(f, depth, "Array", inner.as_ref()),
			CodecNode::Map(inner) => nested(f, depth, "Map", inner.as_ref()),
			CodecNode::Union(inner) => nested(f, depth, "Union", inner),
			CodecNode::Record(inner) => nested(f, depth, "Record", inner),
			CodecNode::Enum(inner) => nested(f, depth, "Enum", inner),
			CodecNode::Fixed(inner) => nested(f, depth, "Fixed", inner),
			CodecNode::Decimal(inner) => nested(f, depth, "Decimal", inner),
			CodecNode::Uuid => f.debug_tuple("Uuid").finish(),
			CodecNode::Date => f.debug_tuple("Date").finish(),
			CodecNode::TimeMillis => f.debug_tuple("TimeMillis").finish(),
			CodecNode::TimeMicros => f.debug_tuple("TimeMicros").finish(),
			CodecNode::TimestampMillis => f.debug_tuple("TimestampMillis").finish(),
			CodecNode::TimestampMicros => f.debug_tuple("TimestampMicros").finish(),
			CodecNode::Duration => f.debug_tuple("Duration").finish(),
		}
	}
}
