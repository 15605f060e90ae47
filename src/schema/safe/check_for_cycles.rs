use super::{SchemaGraph, SchemaKind};

impl SchemaGraph {
	/// Check that the schema does not contain zero-sized unconditional
	/// cycles
	///
	/// This is called by the parsing functions already, so this may only be
	/// useful if you've manually edited the graph.
	///
	/// Note that the deserializer otherwise already prevents stack overflows
	/// by limiting the recursion depth.
	pub(crate) fn check_for_cycles(&self) -> Result<(), UnconditionalCycle> {
		// Zero-size cycles (that would trigger infinite recursion when
		// decoding, without consuming any input) can only happen with
		// records that end up containing themselves immediately, that is,
		// only through record paths. Any other path consumes at least one
		// byte (union discriminant, block count...).

		// Conditional self-referential records (e.g. through
		// `union { null, Self }`) are legitimate, so deeper stack overflows
		// can't be prevented here and are instead bounded at decode time.
		let mut visited_nodes = vec![false; self.nodes.len()];
		let mut checked_nodes = vec![false; self.nodes.len()];
		for (idx, node) in self.nodes.iter().enumerate() {
			if matches!(node.kind, SchemaKind::Record(_)) && !checked_nodes[idx] {
				check_no_zero_sized_cycle_inner(self, idx, &mut visited_nodes, &mut checked_nodes)?;
			}
		}
		Ok(())
	}
}

/// Error: the schema contains a record that ends up always containing itself
#[derive(Debug, thiserror::Error)]
#[error("The schema contains a record that ends up always containing itself")]
pub struct UnconditionalCycle {
	_private: (),
}

fn check_no_zero_sized_cycle_inner(
	schema: &SchemaGraph,
	node_idx: usize,
	visited_nodes: &mut Vec<bool>,
	checked_nodes: &mut Vec<bool>,
) -> Result<(), UnconditionalCycle> {
	visited_nodes[node_idx] = true;
	for field in match &schema.nodes[node_idx].kind {
		SchemaKind::Record(record) => &record.fields,
		_ => unreachable!(),
	} {
		// Invalid node ids are left for `freeze` to report
		if let Some(SchemaKind::Record(_)) = schema.nodes.get(field.type_.idx).map(|n| &n.kind) {
			if visited_nodes[field.type_.idx] {
				return Err(UnconditionalCycle { _private: () });
			} else {
				check_no_zero_sized_cycle_inner(
					schema,
					field.type_.idx,
					visited_nodes,
					checked_nodes,
				)?;
			}
		}
	}
	visited_nodes[node_idx] = false;
	// If a node was fine as part of another record, no need to re-visit it
	// individually
	checked_nodes[node_idx] = true;
	Ok(())
}
