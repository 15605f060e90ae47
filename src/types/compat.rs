//! Check that a resolved host type can be (de)serialized against a given
//! schema
//!
//! The walk is permissive the way the codecs are: primitive promotions
//! (int into long, integers into floats...), string/bytes interchange, and
//! record fields present on only one side are all accepted. Everything it
//! rejects would error at (de)serialization time anyway; checking up front
//! is what lets the registry adapter fall back to registering a fresh
//! schema instead.

use super::*;

use crate::schema::{LogicalType, NodeId, SchemaGraph, SchemaKind, SchemaNode};

use std::collections::HashSet;

/// Error: the host type cannot be encoded or decoded with the schema
///
/// Carries one reason per incompatible path through the two graphs.
#[derive(thiserror::Error, Debug)]
#[error("Type resolution is incompatible with schema: {}", reasons.join("; "))]
pub struct IncompatibleType {
	/// Why each incompatible path does not line up
	pub reasons: Vec<String>,
}

/// Check that `resolution` can be (de)serialized against `schema`
pub fn check_compatible(
	schema: &SchemaGraph,
	resolution: &TypeResolution,
) -> Result<(), IncompatibleType> {
	if schema.nodes().is_empty() {
		return Err(IncompatibleType {
			reasons: vec!["schema has no nodes".to_owned()],
		});
	}
	let mut checker = Checker {
		schema,
		resolution,
		assumed_ok: HashSet::new(),
	};
	match checker.check(NodeId::root(), ResolutionKey { idx: 0 }, "$") {
		Ok(()) => Ok(()),
		Err(reasons) => Err(IncompatibleType { reasons }),
	}
}

struct Checker<'a> {
	schema: &'a SchemaGraph,
	resolution: &'a TypeResolution,
	/// Pairs currently assumed compatible higher up the stack, so that
	/// matching cycles terminate
	assumed_ok: HashSet<(usize, usize)>,
}

impl Checker<'_> {
	fn check(
		&mut self,
		schema_key: NodeId,
		resolution_key: ResolutionKey,
		path: &str,
	) -> Result<(), Vec<String>> {
		if self.schema.get(schema_key).is_none() {
			return Err(vec![format!("{path}: schema node id is out of bounds")]);
		}
		if self.resolution.get(resolution_key).is_none() {
			return Err(vec![format!("{path}: resolution key is out of bounds")]);
		}
		if !self
			.assumed_ok
			.insert((schema_key.idx(), resolution_key.idx()))
		{
			return Ok(());
		}
		let result = self.check_nodes(schema_key, resolution_key, path);
		if result.is_err() {
			// Only keep the assumption when the pair actually matched,
			// otherwise a failed speculative union branch could make a
			// later identical query pass
			self.assumed_ok
				.remove(&(schema_key.idx(), resolution_key.idx()));
		}
		result
	}

	fn check_nodes(
		&mut self,
		schema_key: NodeId,
		resolution_key: ResolutionKey,
		path: &str,
	) -> Result<(), Vec<String>> {
		let schema_node = &self.schema[schema_key];
		let resolution_node = &self.resolution.nodes[resolution_key.idx()];

		let mismatch = || -> Result<(), Vec<String>> {
			Err(vec![format!(
				"{path}: host type shape {resolution_node:?} cannot be coded as schema {:?}",
				schema_node.kind,
			)])
		};

		// Unions are handled first: they absorb `Optional` hosts, and any
		// other host matches the first accepting branch. An `Optional` host
		// against a plain schema is then checked as its inner type (`None`
		// would simply fail to encode at runtime).
		if let SchemaKind::Union(union) = &schema_node.kind {
			// Grab the variants by value so `self` isn't held borrowed
			let variants = union.variants.clone();
			return self.check_against_union(&variants, resolution_key, path);
		}
		if let ResolutionNode::Optional(inner) = *resolution_node {
			if matches!(schema_node.kind, SchemaKind::Null) {
				return Ok(());
			}
			return self.check(schema_key, inner, path);
		}

		// A known logical type over its correct base narrows what the host
		// side must look like; anything else behaves as the base type
		if let Some(logical) = effective_logical(schema_node) {
			let accepted = match logical {
				LogicalType::Decimal(_) => matches!(
					resolution_node,
					ResolutionNode::Decimal { .. }
						| ResolutionNode::Float { bits: 64 }
						| ResolutionNode::Integer { .. }
				),
				LogicalType::Uuid => {
					matches!(resolution_node, ResolutionNode::Uuid | ResolutionNode::Str)
				}
				LogicalType::Date | LogicalType::TimeMillis => matches!(
					resolution_node,
					ResolutionNode::Integer { bits, signed } if int_fits(*bits, *signed)
				),
				LogicalType::TimeMicros => {
					matches!(resolution_node, ResolutionNode::Integer { .. })
				}
				LogicalType::TimestampMillis => matches!(
					resolution_node,
					ResolutionNode::Timestamp { micros: false } | ResolutionNode::Integer { .. }
				),
				LogicalType::TimestampMicros => matches!(
					resolution_node,
					ResolutionNode::Timestamp { micros: true } | ResolutionNode::Integer { .. }
				),
				LogicalType::Duration => matches!(
					resolution_node,
					ResolutionNode::Duration
						| ResolutionNode::Bytes {
							fixed_len: Some(12)
						}
				),
				// Unreachable: effective_logical never returns Unknown
				LogicalType::Unknown(_) => false,
			};
			return if accepted { Ok(()) } else { mismatch() };
		}

		match (&schema_node.kind, resolution_node) {
			(SchemaKind::Null, ResolutionNode::Null) => Ok(()),
			(SchemaKind::Boolean, ResolutionNode::Boolean) => Ok(()),
			(SchemaKind::Int, ResolutionNode::Integer { bits, signed })
				if int_fits(*bits, *signed) =>
			{
				Ok(())
			}
			(SchemaKind::Long, ResolutionNode::Integer { .. }) => Ok(()),
			(SchemaKind::Float, ResolutionNode::Float { bits: 32 }) => Ok(()),
			(SchemaKind::Float, ResolutionNode::Integer { .. }) => Ok(()),
			(SchemaKind::Double, ResolutionNode::Float { .. }) => Ok(()),
			(SchemaKind::Double, ResolutionNode::Integer { .. }) => Ok(()),
			(SchemaKind::Bytes, ResolutionNode::Bytes { fixed_len: None }) => Ok(()),
			(SchemaKind::Bytes, ResolutionNode::Str) => Ok(()),
			(SchemaKind::String, ResolutionNode::Str) => Ok(()),
			(SchemaKind::String, ResolutionNode::Bytes { fixed_len: None }) => Ok(()),
			(SchemaKind::String, ResolutionNode::Uuid) => Ok(()),
			(SchemaKind::Fixed(fixed), ResolutionNode::Bytes { fixed_len: Some(n) })
				if fixed.size == *n =>
			{
				Ok(())
			}
			(SchemaKind::Array(array), ResolutionNode::Array(items)) => {
				let (items_schema, items_resolution) = (array.items, *items);
				self.check(items_schema, items_resolution, &format!("{path}[]"))
			}
			(SchemaKind::Map(map), ResolutionNode::Map { keys, values }) => {
				let (values_schema, keys, values) = (map.values, *keys, *values);
				match self.resolution.get(keys) {
					Some(ResolutionNode::Str) => {}
					_ => {
						return Err(vec![format!(
							"{path}: map keys must be strings to be coded as an Avro map"
						)])
					}
				}
				self.check(values_schema, values, &format!("{path}{{}}"))
			}
			(SchemaKind::Record(record), ResolutionNode::Record(host)) => {
				let mut reasons = Vec::new();
				if !names_match(
					record.name.fully_qualified_name(),
					record.name.name(),
					&host.name,
				) {
					reasons.push(format!(
						"{path}: record name mismatch (schema: {}, host: {})",
						record.name.fully_qualified_name(),
						host.name.name.fully_qualified_name(),
					));
				}
				// Fields present on only one side are fine: extra schema
				// fields get skipped when decoding, extra host fields stay
				// at the host default
				let pairs: Vec<(String, NodeId, ResolutionKey)> = record
					.fields
					.iter()
					.filter_map(|field| {
						host.fields
							.iter()
							.find(|host_field| host_field.name == field.name)
							.map(|host_field| (field.name.clone(), field.type_, host_field.type_))
					})
					.collect();
				for (field_name, field_schema, field_resolution) in pairs {
					if let Err(mut field_reasons) = self.check(
						field_schema,
						field_resolution,
						&format!("{path}.{field_name}"),
					) {
						reasons.append(&mut field_reasons);
					}
				}
				if reasons.is_empty() {
					Ok(())
				} else {
					Err(reasons)
				}
			}
			(SchemaKind::Enum(enum_), ResolutionNode::Enum(host)) => {
				let mut reasons = Vec::new();
				if !names_match(
					enum_.name.fully_qualified_name(),
					enum_.name.name(),
					&host.name,
				) {
					reasons.push(format!(
						"{path}: enum name mismatch (schema: {}, host: {})",
						enum_.name.fully_qualified_name(),
						host.name.name.fully_qualified_name(),
					));
				}
				for symbol in &enum_.symbols {
					if !host
						.symbols
						.iter()
						.any(|host_symbol| host_symbol.name == *symbol)
					{
						reasons.push(format!(
							"{path}: schema symbol {symbol:?} has no counterpart on the host enum"
						));
					}
				}
				if reasons.is_empty() {
					Ok(())
				} else {
					Err(reasons)
				}
			}
			_ => mismatch(),
		}
	}

	/// Match a resolution against a union: a null branch satisfies the
	/// optional side, and otherwise the first branch that accepts the
	/// value wins (schema declaration order)
	fn check_against_union(
		&mut self,
		variants: &[NodeId],
		resolution_key: ResolutionKey,
		path: &str,
	) -> Result<(), Vec<String>> {
		let is_null_branch = |checker: &Self, variant: NodeId| {
			matches!(
				checker.schema.get(variant),
				Some(SchemaNode {
					kind: SchemaKind::Null,
					..
				})
			)
		};
		let (needs_null, value_key) = match self.resolution.get(resolution_key) {
			Some(&ResolutionNode::Optional(inner)) => (true, inner),
			_ => (false, resolution_key),
		};
		if needs_null && !variants.iter().any(|&variant| is_null_branch(self, variant)) {
			return Err(vec![format!(
				"{path}: host type is optional but the union has no null branch"
			)]);
		}
		let mut branch_reasons = Vec::new();
		for &variant in variants {
			if is_null_branch(self, variant) {
				// A null branch codes the value itself only if the host
				// side really is the unit type
				if matches!(self.resolution.get(value_key), Some(ResolutionNode::Null)) {
					return Ok(());
				}
				continue;
			}
			match self.check(variant, value_key, path) {
				Ok(()) => return Ok(()),
				Err(mut reasons) => branch_reasons.append(&mut reasons),
			}
		}
		branch_reasons.push(format!("{path}: no union branch accepts the host type"));
		Err(branch_reasons)
	}
}

/// Whether a host integer always fits an Avro `int`
fn int_fits(bits: u8, signed: bool) -> bool {
	(signed && bits <= 32) || (!signed && bits < 32)
}

fn names_match(schema_fully_qualified: &str, schema_unqualified: &str, host: &ResolvedName) -> bool {
	if host.explicit {
		schema_fully_qualified == host.name.fully_qualified_name()
	} else {
		schema_unqualified == host.name.name()
	}
}

/// The logical type to take into account: a known logical type over its
/// correct base
fn effective_logical(node: &SchemaNode) -> Option<&LogicalType> {
	let logical = node.logical.as_ref()?;
	let applies = match (logical, &node.kind) {
		(LogicalType::Decimal(_), SchemaKind::Bytes | SchemaKind::Fixed(_)) => true,
		(LogicalType::Uuid, SchemaKind::String) => true,
		(LogicalType::Date | LogicalType::TimeMillis, SchemaKind::Int) => true,
		(
			LogicalType::TimeMicros | LogicalType::TimestampMillis | LogicalType::TimestampMicros,
			SchemaKind::Long,
		) => true,
		(LogicalType::Duration, SchemaKind::Fixed(fixed)) => fixed.size == 12,
		_ => false,
	};
	applies.then_some(logical)
}
