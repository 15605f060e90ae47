//! Cycle-safe structural comparison of schema graphs
//!
//! Two schemas are considered structurally equal when their trees coincide:
//! same kinds, names, symbols, sizes, field names and field types, and same
//! logical types. Documentation, aliases and field defaults do not
//! participate (they don't affect the encoded bytes).

use super::*;

use std::collections::HashSet;

impl SchemaGraph {
	/// Whether this schema is structurally equal to `other`
	///
	/// Cyclic schemas compare in bounded time: a pair of nodes that is
	/// already being compared higher up the stack is assumed equal, which
	/// makes equal cycles compare equal instead of recursing forever.
	pub fn structural_eq(&self, other: &SchemaGraph) -> bool {
		if self.nodes.is_empty() || other.nodes.is_empty() {
			return self.nodes.is_empty() && other.nodes.is_empty();
		}
		nodes_eq(
			self,
			NodeId::root(),
			other,
			NodeId::root(),
			&mut HashSet::new(),
		)
	}

	/// Whether two nodes of this same graph are structurally equal
	///
	/// Used by the JSON writers to decide between emitting a name reference
	/// and raising a name conflict.
	pub(crate) fn nodes_structural_eq(&self, a: NodeId, b: NodeId) -> bool {
		nodes_eq(self, a, self, b, &mut HashSet::new())
	}
}

fn nodes_eq(
	left: &SchemaGraph,
	a: NodeId,
	right: &SchemaGraph,
	b: NodeId,
	visited: &mut HashSet<(usize, usize)>,
) -> bool {
	let (node_a, node_b) = match (left.get(a), right.get(b)) {
		(Some(node_a), Some(node_b)) => (node_a, node_b),
		// Invalid ids never compare equal
		_ => return false,
	};
	if !visited.insert((a.idx, b.idx)) {
		// This pair is already being compared higher up the stack
		return true;
	}
	let kind_eq = match (&node_a.kind, &node_b.kind) {
		(SchemaKind::Null, SchemaKind::Null)
		| (SchemaKind::Boolean, SchemaKind::Boolean)
		| (SchemaKind::Int, SchemaKind::Int)
		| (SchemaKind::Long, SchemaKind::Long)
		| (SchemaKind::Float, SchemaKind::Float)
		| (SchemaKind::Double, SchemaKind::Double)
		| (SchemaKind::Bytes, SchemaKind::Bytes)
		| (SchemaKind::String, SchemaKind::String) => true,
		(SchemaKind::Array(array_a), SchemaKind::Array(array_b)) => {
			nodes_eq(left, array_a.items, right, array_b.items, visited)
		}
		(SchemaKind::Map(map_a), SchemaKind::Map(map_b)) => {
			nodes_eq(left, map_a.values, right, map_b.values, visited)
		}
		(SchemaKind::Union(union_a), SchemaKind::Union(union_b)) => {
			union_a.variants.len() == union_b.variants.len()
				&& std::iter::zip(&union_a.variants, &union_b.variants)
					.all(|(&variant_a, &variant_b)| {
						nodes_eq(left, variant_a, right, variant_b, visited)
					})
		}
		(SchemaKind::Record(record_a), SchemaKind::Record(record_b)) => {
			record_a.name == record_b.name
				&& record_a.fields.len() == record_b.fields.len()
				&& std::iter::zip(&record_a.fields, &record_b.fields).all(|(field_a, field_b)| {
					field_a.name == field_b.name
						&& nodes_eq(left, field_a.type_, right, field_b.type_, visited)
				})
		}
		(SchemaKind::Enum(enum_a), SchemaKind::Enum(enum_b)) => {
			enum_a.name == enum_b.name && enum_a.symbols == enum_b.symbols
		}
		(SchemaKind::Fixed(fixed_a), SchemaKind::Fixed(fixed_b)) => {
			fixed_a.name == fixed_b.name && fixed_a.size == fixed_b.size
		}
		_ => false,
	};
	kind_eq && node_a.logical == node_b.logical
}
