//! Union branch selection for the serializer
//!
//! When writing a union the serializer has to decide, from the shape of the
//! value it is given, which branch is being written. The tables built here
//! answer that in constant time for each kind of query the serializer may
//! make, favoring earlier branches (schema declaration order) whenever
//! several branches could accept the value at the same priority level.
//!
//! The contents of this module are very tied to the serializer's behavior.

use std::{borrow::Cow, cmp::Ordering, collections::HashMap};

use super::{self_referential::*, Name};

/// Branch indexes that can be obtained directly from the shape of the
/// serialized value
///
/// When the branch may additionally be designated by name (named types,
/// newtype structs, enum variants), that goes through the by-name table
/// instead.
#[derive(Debug, Clone, Copy)]
pub(crate) enum BranchHint {
	Null,
	UnitStruct,
	Boolean,
	Integer,
	Integer4,
	Integer8,
	Float4,
	Float8,
	Str,
	SliceU8,
	UnitVariant,
	StructOrMap,
	Seq,
}
const N_HINTS: usize = 13;

pub(crate) struct BranchLookup<'a> {
	per_name: HashMap<Cow<'static, str>, (i64, NodeRef<'a>)>,
	per_hint: [Option<(i64, NodeRef<'a>)>; N_HINTS],
}

impl<'a> BranchLookup<'a> {
	pub(crate) fn placeholder() -> Self {
		Self {
			per_name: Default::default(),
			per_hint: Default::default(),
		}
	}

	pub(crate) fn unnamed(&self, hint: BranchHint) -> Option<(i64, &'a CodecNode<'a>)> {
		self.per_hint[hint as usize].map(|(i, n)| (i, n.as_ref()))
	}
	pub(crate) fn named(&self, name: &str) -> Option<(i64, &'a CodecNode<'a>)> {
		self.per_name
			.get(name)
			.copied()
			.map(|(i, n)| (i, n.as_ref()))
	}

	/// Constructs the lookup tables
	///
	/// Note that the correctness of the self-referential construction
	/// relies on that this function does not read `branch_lookup` of the
	/// other nodes (it doesn't need to anyway).
	pub(crate) fn new(variants: &[NodeRef<'a>]) -> BranchLookup<'a> {
		#[derive(Clone, Copy)]
		enum Entry<'a> {
			None,
			Some {
				priority: usize,
				discriminant_and_node: (i64, NodeRef<'a>),
			},
			// Two branches accept the hint equally well: force the caller
			// to disambiguate by name
			Conflict {
				priority: usize,
			},
		}
		let mut per_hint = [Entry::None; N_HINTS];
		let per_name = std::cell::RefCell::new(HashMap::new());
		for (discriminant, &node) in variants.iter().enumerate() {
			let discriminant: i64 = discriminant
				.try_into()
				.expect("Variants array should not possibly be larger than i64::MAX");
			let mut register = |hint: BranchHint, priority: usize| {
				let entry = &mut per_hint[hint as usize];
				match *entry {
					Entry::None => {
						*entry = Entry::Some {
							discriminant_and_node: (discriminant, node),
							priority,
						}
					}
					Entry::Some {
						priority: old_priority,
						..
					} => {
						// Favor lowest priority; at equal priority the
						// earlier branch already won, so this is a conflict
						match old_priority.cmp(&priority) {
							Ordering::Less => {}
							Ordering::Equal => {
								*entry = Entry::Conflict {
									priority: old_priority,
								};
							}
							Ordering::Greater => {
								*entry = Entry::Some {
									priority,
									discriminant_and_node: (discriminant, node),
								};
							}
						}
					}
					Entry::Conflict {
						priority: old_priority,
					} => {
						if priority < old_priority {
							*entry = Entry::Some {
								priority,
								discriminant_and_node: (discriminant, node),
							};
						}
					}
				}
			};
			let register_name = |name: &Name| {
				let mut per_name = per_name.borrow_mut();
				per_name.insert(Cow::Owned(name.name().to_owned()), (discriminant, node));
				per_name.insert(
					Cow::Owned(name.fully_qualified_name().to_owned()),
					(discriminant, node),
				);
			};
			let register_type_name = |type_name: &'static str| {
				per_name
					.borrow_mut()
					.insert(Cow::Borrowed(type_name), (discriminant, node));
			};
			// The following list is very coupled with the serializer: every
			// `BranchHint` corresponds to one (or more) function of
			// `Serializer`, and every `register` call corresponds to a
			// capability of that function to write that branch.
			match node.as_ref() {
				CodecNode::Null => {
					register_type_name("Null");
					register(BranchHint::Null, 0);
					register(BranchHint::UnitStruct, 0);
					register(BranchHint::UnitVariant, 2);
				}
				CodecNode::Boolean => {
					register_type_name("Boolean");
					register(BranchHint::Boolean, 0);
				}
				CodecNode::Int => {
					register_type_name("Int");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 0);
					register(BranchHint::Integer8, 1);
				}
				CodecNode::Long => {
					register_type_name("Long");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 1);
					register(BranchHint::Integer8, 0);
				}
				CodecNode::Float => {
					register_type_name("Float");
					register(BranchHint::Float4, 0);
					register(BranchHint::Float8, 1);
				}
				CodecNode::Double => {
					register_type_name("Double");
					register(BranchHint::Float8, 0);
					register(BranchHint::Float4, 1); // Just for better error
				}
				CodecNode::Bytes => {
					register_type_name("Bytes");
					register(BranchHint::Str, 10);
					register(BranchHint::UnitStruct, 10);
					register(BranchHint::SliceU8, 0);
					register(BranchHint::UnitVariant, 10);
				}
				CodecNode::String => {
					register_type_name("String");
					register(BranchHint::Str, 0);
					register(BranchHint::UnitStruct, 0);
					register(BranchHint::SliceU8, 1);
					register(BranchHint::UnitVariant, 1);
				}
				CodecNode::Array(_) => {
					register_type_name("Array");
					register(BranchHint::Seq, 0);
				}
				CodecNode::Map(_) => {
					register_type_name("Map");
					register(BranchHint::StructOrMap, 0);
				}
				CodecNode::Union(_) => {
					// Union in union is not allowed by the Avro rules, so
					// you'd better not rely on looking up through nested
					// unions
					register_type_name("Union");
				}
				CodecNode::Enum(EnumCodec { name, .. }) => {
					register_name(name);
					register(BranchHint::Integer, 10);
					register(BranchHint::Integer4, 10);
					register(BranchHint::Integer8, 10);
					register(BranchHint::UnitStruct, 0);
					register(BranchHint::Str, 5);
					register(BranchHint::UnitVariant, 0);
				}
				CodecNode::Record(RecordCodec { name, .. }) => {
					register_name(name);
					register(BranchHint::StructOrMap, 0);
				}
				CodecNode::Fixed(FixedCodec { name, .. }) => {
					register_name(name);
					register(BranchHint::Str, 15);
					register(BranchHint::SliceU8, 0);
					register(BranchHint::Seq, 2);
				}
				CodecNode::Decimal(DecimalCodec { repr, .. }) => {
					register_type_name("Decimal");
					if let DecimalRepr::Fixed(fixed) = repr {
						register_name(&fixed.name);
					}
					register(BranchHint::Integer, 5);
					register(BranchHint::Integer4, 5);
					register(BranchHint::Integer8, 5);
					register(BranchHint::Float8, 2);
					register(BranchHint::Str, 20);
				}
				CodecNode::Uuid => {
					register_type_name("Uuid");
					// A user may assume that a uuid type will serialize to
					// Uuid by default, but since it serializes as &str we
					// can't distinguish that from a plain &str, so a union
					// with both Uuid and String conflicts and requires
					// designating the branch by name.
					register(BranchHint::Str, 0);
				}
				CodecNode::Date => {
					register_type_name("Date");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 0);
					register(BranchHint::Integer8, 1);
				}
				CodecNode::TimeMillis => {
					register_type_name("TimeMillis");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 0);
					register(BranchHint::Integer8, 1);
				}
				CodecNode::TimeMicros => {
					register_type_name("TimeMicros");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 1);
					register(BranchHint::Integer8, 0);
				}
				CodecNode::TimestampMillis => {
					register_type_name("TimestampMillis");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 1);
					register(BranchHint::Integer8, 0);
				}
				CodecNode::TimestampMicros => {
					register_type_name("TimestampMicros");
					register(BranchHint::Integer, 0);
					register(BranchHint::Integer4, 1);
					register(BranchHint::Integer8, 0);
				}
				CodecNode::Duration => {
					register(BranchHint::StructOrMap, 5);
					register(BranchHint::Seq, 5);
					register(BranchHint::SliceU8, 5);
				}
			}
		}
		let per_hint = per_hint.map(|entry| match entry {
			Entry::None | Entry::Conflict { .. } => None,
			Entry::Some {
				discriminant_and_node,
				..
			} => Some(discriminant_and_node),
		});
		BranchLookup {
			per_name: per_name.into_inner(),
			per_hint,
		}
	}
}
