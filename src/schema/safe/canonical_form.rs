//! [Parsing Canonical Form](https://avro.apache.org/docs/current/specification/#parsing-canonical-form-transforming-schemas)
//! rendering

use super::{serializing::WrittenNames, *};

use std::{collections::HashSet, fmt::Write};

impl SchemaGraph {
	/// Strictly mirrors the reference Java implementation: fixed attribute
	/// order, full names, and everything nonessential (docs, aliases,
	/// defaults, logical types) left out.
	///
	/// Note that this form is intended for fingerprinting, not for
	/// transmitting schemas: it loses the logical type information
	/// and performs no string escaping.
	pub(super) fn write_canonical_form(&self, names: &WrittenNames) -> Result<String, SchemaError> {
		let mut state = WriteCanonicalFormState {
			w: String::new(),
			names,
			written: HashSet::new(),
		};
		state.write_node(self, NodeId::root())?;
		Ok(state.w)
	}
}

struct WriteCanonicalFormState<'a> {
	w: String,
	names: &'a WrittenNames,
	written: HashSet<usize>,
}

impl WriteCanonicalFormState<'_> {
	fn write_node(&mut self, schema: &SchemaGraph, key: NodeId) -> Result<(), SchemaError> {
		let node = schema
			.get(key)
			.ok_or_else(|| SchemaError::new("NodeId refers to non-existing node"))?;

		// In PCF, logical types are completely ignored
		// https://issues.apache.org/jira/browse/AVRO-1721

		let mut first_time = true;
		match &node.kind {
			primitive @ (SchemaKind::Null
			| SchemaKind::Boolean
			| SchemaKind::Int
			| SchemaKind::Long
			| SchemaKind::Float
			| SchemaKind::Double
			| SchemaKind::Bytes
			| SchemaKind::String) => {
				self.w.push('"');
				self.w.push_str(serializing::primitive_name(primitive));
				self.w.push('"');
			}
			SchemaKind::Union(union) => {
				self.w.push('[');
				for &variant in &union.variants {
					if !first_time {
						self.w.push(',');
					} else {
						first_time = false;
					}
					self.write_node(schema, variant)?;
				}
				self.w.push(']');
			}
			SchemaKind::Array(array) => {
				self.w.push_str("{\"type\":\"array\",\"items\":");
				self.write_node(schema, array.items)?;
				self.w.push('}');
			}
			SchemaKind::Map(map) => {
				self.w.push_str("{\"type\":\"map\",\"values\":");
				self.write_node(schema, map.values)?;
				self.w.push('}');
			}
			SchemaKind::Enum(enum_) => {
				if self.should_write_definition(key, &enum_.name) {
					self.w.push_str("{\"name\":\"");
					self.w.push_str(enum_.name.fully_qualified_name());
					self.w.push_str("\",\"type\":\"enum\",\"symbols\":[");
					for symbol in &enum_.symbols {
						if !first_time {
							self.w.push(',');
						} else {
							first_time = false;
						}
						self.w.push('"');
						self.w.push_str(symbol);
						self.w.push('"');
					}
					self.w.push_str("]}");
				}
			}
			SchemaKind::Fixed(fixed) => {
				if self.should_write_definition(key, &fixed.name) {
					self.w.push_str("{\"name\":\"");
					self.w.push_str(fixed.name.fully_qualified_name());
					self.w.push_str("\",\"type\":\"fixed\",\"size\":");
					write!(self.w, "{}", fixed.size)
						.expect("write! to a String should not fail");
					self.w.push('}');
				}
			}
			SchemaKind::Record(record) => {
				if self.should_write_definition(key, &record.name) {
					self.w.push_str("{\"name\":\"");
					self.w.push_str(record.name.fully_qualified_name());
					self.w.push_str("\",\"type\":\"record\",\"fields\":[");
					for field in &record.fields {
						if !first_time {
							self.w.push(',');
						} else {
							first_time = false;
						}
						self.w.push_str("{\"name\":\"");
						self.w.push_str(&field.name);
						self.w.push_str("\",\"type\":");
						self.write_node(schema, field.type_)?;
						self.w.push('}');
					}
					self.w.push_str("]}");
				}
			}
		}
		Ok(())
	}

	/// On later encounters of an already-written full name, write just the
	/// name and return `false`
	fn should_write_definition(&mut self, key: NodeId, name: &Name) -> bool {
		match self.names.should_write_definition(key, &mut self.written) {
			true => true,
			false => {
				self.w.push('"');
				self.w.push_str(name.fully_qualified_name());
				self.w.push('"');
				false
			}
		}
	}
}
