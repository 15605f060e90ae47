//! Describe Rust types structurally, so that schemas can be generated from
//! them and checked against them
//!
//! A [`TypeResolution`] is a language-neutral description of the shape of a
//! host type: its fields, symbols and names. It is produced by the
//! [`ResolveType`] trait, which plays the role reflection plays in dynamic
//! languages: primitives, collections and `Option`s are provided by this
//! crate, and user types implement it manually (listing their members the
//! way their `Serialize`/`Deserialize` implementations expose them).
//!
//! Resolutions are used by the registry adapter to generate a schema for a
//! type that has none registered yet, and to check that a fetched schema
//! can actually (de)serialize the type before building a codec for it.
//!
//! ```
//! use serde_avro_wire::types::{
//! 	FieldResolution, RecordResolution, ResolutionNode, ResolveType, ResolvedName,
//! 	TypeResolution, TypeResolver,
//! };
//!
//! struct Point {
//! 	x: i32,
//! 	y: i32,
//! }
//!
//! impl ResolveType for Point {
//! 	fn resolve(resolver: &mut TypeResolver) -> serde_avro_wire::types::ResolutionKey {
//! 		let reserved = resolver.reserve();
//! 		let node = ResolutionNode::Record(RecordResolution {
//! 			name: ResolvedName::implicit("Point").unwrap(),
//! 			fields: vec![
//! 				FieldResolution::new("x", resolver.key_for::<i32>()),
//! 				FieldResolution::new("y", resolver.key_for::<i32>()),
//! 			],
//! 		});
//! 		resolver.nodes[reserved.idx()] = node;
//! 		reserved
//! 	}
//! 	type Memo = Self;
//! }
//!
//! let resolution = TypeResolution::of::<Point>();
//! let schema = resolution.to_schema().unwrap();
//! assert_eq!(
//! 	schema.json(),
//! 	r#"{"name":"Point","type":"record","fields":[{"name":"x","type":"int"},{"name":"y","type":"int"}]}"#
//! );
//! ```

mod compat;
mod to_schema;

pub use compat::{check_compatible, IncompatibleType};

use crate::schema::{Name, SchemaError};

use std::{any::TypeId, collections::HashMap};

/// The finished structural description of a host type
///
/// Like schemas, resolutions are stored as a graph of nodes indexed by
/// [`ResolutionKey`] so that self-referential types resolve in bounded
/// time. The first node (index `0`) is the root.
#[derive(Debug)]
pub struct TypeResolution {
	nodes: Vec<ResolutionNode>,
}

impl TypeResolution {
	/// Resolve the structure of `T`
	pub fn of<T: ResolveType + ?Sized>() -> Self {
		let mut resolver = TypeResolver::default();
		let root = resolver.key_for::<T>();
		assert_eq!(root.idx(), 0, "root resolution should land at index 0");
		Self {
			nodes: resolver.nodes,
		}
	}

	/// The root node of the resolution
	pub fn root(&self) -> &ResolutionNode {
		&self.nodes[0]
	}

	/// Try to get the node at the given [`ResolutionKey`]
	pub fn get(&self, key: ResolutionKey) -> Option<&ResolutionNode> {
		self.nodes.get(key.idx)
	}

	/// The underlying node storage (the first node is the root)
	pub fn nodes(&self) -> &[ResolutionNode] {
		&self.nodes
	}

	/// The declared name of the root node, if it is a named resolution
	pub fn root_name(&self) -> Option<&ResolvedName> {
		match self.root() {
			ResolutionNode::Record(record) => Some(&record.name),
			ResolutionNode::Enum(enum_) => Some(&enum_.name),
			_ => None,
		}
	}
}

/// The location of a node in a [`TypeResolution`] (or in the
/// [`TypeResolver`] while it is being built)
#[derive(Copy, Clone, PartialEq, Eq, Hash, Debug)]
pub struct ResolutionKey {
	idx: usize,
}

impl ResolutionKey {
	/// Obtain the index in the node storage this key points to
	pub const fn idx(self) -> usize {
		self.idx
	}
}

/// A node of a [`TypeResolution`]
#[derive(Clone, Debug, PartialEq)]
pub enum ResolutionNode {
	/// The unit type: carries no information
	Null,
	Boolean,
	/// An integer of the given width, signed or not
	Integer {
		/// Width in bits (16, 32, 64)
		bits: u8,
		/// Whether the integer is signed
		signed: bool,
	},
	/// An IEEE-754 floating point number of the given width
	Float {
		/// Width in bits (32 or 64)
		bits: u8,
	},
	/// A decimal number with a fixed position for the decimal point
	Decimal {
		/// Number of significant digits the host type can carry
		precision: usize,
		/// Number of digits to the right of the decimal point
		scale: u32,
	},
	/// A unicode string
	Str,
	/// A byte sequence, of fixed length if `fixed_len` is set
	Bytes {
		/// `Some(n)` for `[u8; n]`-shaped hosts
		fixed_len: Option<usize>,
	},
	/// An instant since the unix epoch
	Timestamp {
		/// Microsecond precision (milliseconds otherwise)
		micros: bool,
	},
	/// A months/days/milliseconds amount of time
	Duration,
	/// A universally unique identifier
	Uuid,
	/// A value that may be absent (`Option`)
	Optional(ResolutionKey),
	/// A growable sequence of items of a single type
	Array(ResolutionKey),
	/// String-keyed mapping
	Map {
		/// Resolution of the keys (must describe a string to be
		/// Avro-compatible)
		keys: ResolutionKey,
		/// Resolution of the values
		values: ResolutionKey,
	},
	/// A struct-shaped host type
	Record(RecordResolution),
	/// A C-style enum host type
	Enum(EnumResolution),
}

/// The name a named resolution goes by, and whether it was set explicitly
///
/// An explicit name (supplied by the implementor, the equivalent of an
/// external-metadata override) must match a schema's full name exactly; an
/// implicit name (derived from the Rust type name) matches on the
/// unqualified name only, since Rust module paths don't line up with Avro
/// namespaces.
#[derive(Clone, Debug, PartialEq)]
pub struct ResolvedName {
	/// The (possibly namespaced) name
	pub name: Name,
	/// Whether the name was supplied explicitly
	pub explicit: bool,
}

impl ResolvedName {
	/// A name supplied explicitly by the implementor
	pub fn explicit(name: impl Into<String>) -> Result<Self, SchemaError> {
		Ok(Self {
			name: Name::new(name)?,
			explicit: true,
		})
	}

	/// A name derived from the host type's declared name
	pub fn implicit(name: impl Into<String>) -> Result<Self, SchemaError> {
		Ok(Self {
			name: Name::new(name)?,
			explicit: false,
		})
	}
}

/// Component of a [`TypeResolution`]
#[derive(Clone, Debug, PartialEq)]
pub struct RecordResolution {
	/// The name of the record type
	pub name: ResolvedName,
	/// The fields, in the order the host type (de)serializes them
	pub fields: Vec<FieldResolution>,
}

/// Component of a [`TypeResolution`]
#[derive(Clone, Debug, PartialEq)]
pub struct FieldResolution {
	/// The name under which the field (de)serializes
	pub name: String,
	/// The resolution of the field's type
	pub type_: ResolutionKey,
}

impl FieldResolution {
	/// `type_` is the key of the resolution of the field's type
	pub fn new(name: impl Into<String>, type_: ResolutionKey) -> Self {
		Self {
			name: name.into(),
			type_,
		}
	}
}

/// Component of a [`TypeResolution`]
#[derive(Clone, Debug, PartialEq)]
pub struct EnumResolution {
	/// The name of the enum type
	pub name: ResolvedName,
	/// The symbols, ordered by raw value then name
	pub symbols: Vec<SymbolResolution>,
}

impl EnumResolution {
	/// Build an enum resolution, normalizing symbol order (raw value
	/// ascending, then name ascending)
	pub fn new(name: ResolvedName, mut symbols: Vec<SymbolResolution>) -> Self {
		symbols.sort_by(|a, b| a.value.cmp(&b.value).then_with(|| a.name.cmp(&b.name)));
		Self { name, symbols }
	}
}

/// Component of a [`TypeResolution`]
#[derive(Clone, Debug, PartialEq)]
pub struct SymbolResolution {
	/// The symbol's name
	pub name: String,
	/// The symbol's raw value on the host type
	pub value: i64,
}

impl SymbolResolution {
	/// `value` is the symbol's raw value on the host type
	pub fn new(name: impl Into<String>, value: i64) -> Self {
		Self {
			name: name.into(),
			value,
		}
	}
}

/// Builds [`TypeResolution`]s, memoizing each host type it has already
/// described
///
/// The memoization is keyed by [`TypeId`] and lives for a single
/// resolver invocation. Besides avoiding duplicate work, it is what breaks
/// the recursion for self-referential types: the key is registered before
/// the type's members are resolved.
#[derive(Default)]
pub struct TypeResolver {
	/// The node storage being built
	pub nodes: Vec<ResolutionNode>,
	memo: HashMap<TypeId, ResolutionKey>,
}

impl TypeResolver {
	/// Reserve a node slot, so that a type's key is registered before its
	/// members are resolved
	///
	/// The placeholder must be overwritten by the caller.
	pub fn reserve(&mut self) -> ResolutionKey {
		let idx = self.nodes.len();
		self.nodes.push(ResolutionNode::Null);
		ResolutionKey { idx }
	}

	/// The key of `T`'s resolution, resolving it if this resolver hasn't
	/// seen it yet
	pub fn key_for<T: ResolveType + ?Sized>(&mut self) -> ResolutionKey {
		match self.memo.entry(TypeId::of::<T::Memo>()) {
			std::collections::hash_map::Entry::Occupied(entry) => *entry.get(),
			std::collections::hash_map::Entry::Vacant(entry) => {
				let expected = ResolutionKey {
					idx: self.nodes.len(),
				};
				entry.insert(expected);
				let key = T::resolve(self);
				assert_eq!(
					key, expected,
					"ResolveType implementations should produce their node at the reserved index"
				);
				key
			}
		}
	}
}

/// A structural description can be produced for this type
///
/// Implementations must describe the type the way its
/// `Serialize`/`Deserialize` implementations expose it to serde, since the
/// codecs are driven by those.
pub trait ResolveType {
	/// Produce this type's resolution node(s) into the resolver, returning
	/// the key of the root node
	///
	/// Implementations with members must [`reserve`](TypeResolver::reserve)
	/// their slot before resolving members, then fill it.
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey;

	/// The type under which this resolution is memoized
	///
	/// This is typically `Self`, with lifetimes erased to `'static` for
	/// borrowing types.
	type Memo: std::any::Any;
}

macro_rules! impl_resolve {
	($($ty: ty => $node: expr;)+) => {
		$(
			impl ResolveType for $ty {
				fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
					let key = ResolutionKey { idx: resolver.nodes.len() };
					resolver.nodes.push($node);
					key
				}
				type Memo = Self;
			}
		)*
	};
}
impl_resolve! {
	() => ResolutionNode::Null;
	bool => ResolutionNode::Boolean;
	i16 => ResolutionNode::Integer { bits: 16, signed: true };
	i32 => ResolutionNode::Integer { bits: 32, signed: true };
	i64 => ResolutionNode::Integer { bits: 64, signed: true };
	u16 => ResolutionNode::Integer { bits: 16, signed: false };
	u32 => ResolutionNode::Integer { bits: 32, signed: false };
	u64 => ResolutionNode::Integer { bits: 64, signed: false };
	f32 => ResolutionNode::Float { bits: 32 };
	f64 => ResolutionNode::Float { bits: 64 };
	String => ResolutionNode::Str;
	Vec<u8> => ResolutionNode::Bytes { fixed_len: None };
}

impl<const N: usize> ResolveType for [u8; N] {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		let key = ResolutionKey {
			idx: resolver.nodes.len(),
		};
		resolver.nodes.push(ResolutionNode::Bytes {
			fixed_len: Some(N),
		});
		key
	}
	type Memo = Self;
}

macro_rules! delegate_impl {
	($($ty: ty => $to: ty;)+) => {
		$(
			impl ResolveType for $ty {
				fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
					<$to as ResolveType>::resolve(resolver)
				}
				type Memo = <$to as ResolveType>::Memo;
			}
		)*
	};
}
delegate_impl! {
	str => String;
	&'_ str => String;
	&'_ [u8] => Vec<u8>;
}

impl<T: ResolveType> ResolveType for Vec<T> {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		let reserved = resolver.reserve();
		let node = ResolutionNode::Array(resolver.key_for::<T>());
		resolver.nodes[reserved.idx()] = node;
		reserved
	}
	type Memo = Vec<T::Memo>;
}

impl<T: ResolveType> ResolveType for &'_ [T] {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		<Vec<T> as ResolveType>::resolve(resolver)
	}
	type Memo = <Vec<T> as ResolveType>::Memo;
}

impl<T: ResolveType> ResolveType for Option<T> {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		let reserved = resolver.reserve();
		let node = ResolutionNode::Optional(resolver.key_for::<T>());
		resolver.nodes[reserved.idx()] = node;
		reserved
	}
	type Memo = Option<T::Memo>;
}

impl<V: ResolveType> ResolveType for HashMap<String, V> {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		let reserved = resolver.reserve();
		let node = ResolutionNode::Map {
			keys: resolver.key_for::<String>(),
			values: resolver.key_for::<V>(),
		};
		resolver.nodes[reserved.idx()] = node;
		reserved
	}
	type Memo = HashMap<String, V::Memo>;
}
impl<V: ResolveType> ResolveType for std::collections::BTreeMap<String, V> {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		<HashMap<String, V> as ResolveType>::resolve(resolver)
	}
	type Memo = <HashMap<String, V> as ResolveType>::Memo;
}
