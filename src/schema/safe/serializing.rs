//! [`SchemaGraph`] -> JSON schema text

use super::*;

use {
	serde::ser::{Error as _, SerializeMap, SerializeSeq, Serializer},
	std::{
		cell::RefCell,
		collections::{HashMap, HashSet},
	},
};

impl SchemaGraph {
	/// Write this schema as JSON schema text
	///
	/// With `canonical` set, this produces the
	/// [Parsing Canonical Form](https://avro.apache.org/docs/current/specification/#parsing-canonical-form-transforming-schemas)
	/// of the schema: full names only, fixed attribute order, and no
	/// `doc`, `aliases`, `default`, `namespace` or logical type attributes.
	///
	/// In both modes, the first occurrence of a named schema is written in
	/// full and later occurrences are written as just the full name. If the
	/// same full name designates two structurally distinct schemas, this
	/// errors.
	pub fn to_json(&self, canonical: bool) -> Result<String, SchemaError> {
		if self.nodes.is_empty() {
			return Err(SchemaError::new(
				"Schema must have at least one node (the root)",
			));
		}
		let names = self.collect_written_names()?;
		if canonical {
			self.write_canonical_form(&names)
		} else {
			serde_json::to_string(&SerializeSchema {
				graph: self,
				names: &names,
				written: &RefCell::new(HashSet::new()),
				key: NodeId::root(),
			})
			.map_err(SchemaError::serde_json)
		}
	}

	pub(in crate::schema) fn serialize_to_json(&self) -> Result<String, SchemaError> {
		self.to_json(false)
	}
}

/// Streaming form of the (non-canonical) JSON writer: a [`SchemaGraph`]
/// can be fed to any `serde` serializer, e.g. an open
/// [`serde_json::Serializer`]
impl serde::Serialize for SchemaGraph {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let names = self.collect_written_names().map_err(S::Error::custom)?;
		SerializeSchema {
			graph: self,
			names: &names,
			written: &RefCell::new(HashSet::new()),
			key: NodeId::root(),
		}
		.serialize(serializer)
	}
}

impl SchemaGraph {
	/// Walk the reachable graph, assigning each named node to the canonical
	/// node of its full name
	///
	/// Raises the name conflict error if a full name designates two
	/// structurally distinct nodes.
	pub(super) fn collect_written_names(&self) -> Result<WrittenNames, SchemaError> {
		let mut names = WrittenNames {
			canonical_of: HashMap::new(),
		};
		let mut by_name: HashMap<&str, usize> = HashMap::new();
		let mut visited = vec![false; self.nodes.len()];
		let mut stack = vec![NodeId::root()];
		while let Some(key) = stack.pop() {
			let node = self
				.get(key)
				.ok_or_else(|| SchemaError::new("NodeId refers to non-existing node"))?;
			if std::mem::replace(&mut visited[key.idx], true) {
				continue;
			}
			if let Some(name) = node.kind.name() {
				let canonical = *by_name
					.entry(name.fully_qualified_name())
					.or_insert(key.idx);
				if canonical != key.idx && !self.nodes_structural_eq(NodeId { idx: canonical }, key)
				{
					return Err(SchemaError::msg(format_args!(
						"The full name {} designates two structurally distinct schemas",
						name.fully_qualified_name(),
					)));
				}
				names.canonical_of.insert(key.idx, canonical);
			}
			match &node.kind {
				SchemaKind::Array(array) => stack.push(array.items),
				SchemaKind::Map(map) => stack.push(map.values),
				SchemaKind::Union(union) => stack.extend(union.variants.iter().copied()),
				SchemaKind::Record(record) => {
					stack.extend(record.fields.iter().map(|field| field.type_))
				}
				_ => {}
			}
		}
		Ok(names)
	}
}

/// Canonical node assignment for named nodes of a graph
///
/// Writers use this to decide between writing a full definition and writing
/// a name reference.
pub(super) struct WrittenNames {
	/// named node idx -> canonical node idx for that full name
	canonical_of: HashMap<usize, usize>,
}

impl WrittenNames {
	/// Whether the full definition should be written for this node (first
	/// encounter of its full name), updating `written`
	pub(super) fn should_write_definition(
		&self,
		key: NodeId,
		written: &mut HashSet<usize>,
	) -> bool {
		let canonical = *self
			.canonical_of
			.get(&key.idx)
			.expect("collect_written_names visits every reachable named node");
		written.insert(canonical)
	}
}

struct SerializeSchema<'a, K> {
	graph: &'a SchemaGraph,
	names: &'a WrittenNames,
	written: &'a RefCell<HashSet<usize>>,
	key: K,
}

impl<'a, K> SerializeSchema<'a, K> {
	fn serializable<NK>(&self, key: NK) -> SerializeSchema<'a, NK> {
		SerializeSchema {
			graph: self.graph,
			names: self.names,
			written: self.written,
			key,
		}
	}
}

impl serde::Serialize for SerializeSchema<'_, NodeId> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let node = self
			.graph
			.get(self.key)
			.ok_or_else(|| S::Error::custom("NodeId refers to non-existing node"))?;

		// Logical type attributes ride on the same object as the base type
		let logical_entries = |map: &mut S::SerializeMap| -> Result<(), S::Error> {
			if let Some(logical) = &node.logical {
				map.serialize_entry("logicalType", logical.as_str())?;
				if let LogicalType::Decimal(decimal) = logical {
					map.serialize_entry("precision", &decimal.precision)?;
					map.serialize_entry("scale", &decimal.scale)?;
				}
			}
			Ok(())
		};
		let aliases_and_doc = |map: &mut S::SerializeMap,
		                       aliases: &Vec<String>,
		                       doc: &Option<String>|
		 -> Result<(), S::Error> {
			if !aliases.is_empty() {
				map.serialize_entry("aliases", aliases)?;
			}
			if let Some(doc) = doc {
				map.serialize_entry("doc", doc)?;
			}
			Ok(())
		};

		match &node.kind {
			primitive @ (SchemaKind::Null
			| SchemaKind::Boolean
			| SchemaKind::Int
			| SchemaKind::Long
			| SchemaKind::Float
			| SchemaKind::Double
			| SchemaKind::Bytes
			| SchemaKind::String) => {
				let name = primitive_name(primitive);
				if node.logical.is_none() {
					serializer.serialize_str(name)
				} else {
					let mut map = serializer.serialize_map(None)?;
					map.serialize_entry("type", name)?;
					logical_entries(&mut map)?;
					map.end()
				}
			}
			SchemaKind::Array(array) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "array")?;
				map.serialize_entry("items", &self.serializable(array.items))?;
				logical_entries(&mut map)?;
				map.end()
			}
			SchemaKind::Map(map_schema) => {
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("type", "map")?;
				map.serialize_entry("values", &self.serializable(map_schema.values))?;
				logical_entries(&mut map)?;
				map.end()
			}
			SchemaKind::Union(union) => {
				let mut seq = serializer.serialize_seq(Some(union.variants.len()))?;
				for &variant_key in &union.variants {
					seq.serialize_element(&self.serializable(variant_key))?;
				}
				seq.end()
			}
			SchemaKind::Record(record) => {
				if !self
					.names
					.should_write_definition(self.key, &mut self.written.borrow_mut())
				{
					return serializer.serialize_str(record.name.fully_qualified_name());
				}
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("name", record.name.fully_qualified_name())?;
				map.serialize_entry("type", "record")?;
				aliases_and_doc(&mut map, &record.aliases, &record.doc)?;
				map.serialize_entry("fields", &self.serializable(record.fields.as_slice()))?;
				logical_entries(&mut map)?;
				map.end()
			}
			SchemaKind::Enum(enum_) => {
				if !self
					.names
					.should_write_definition(self.key, &mut self.written.borrow_mut())
				{
					return serializer.serialize_str(enum_.name.fully_qualified_name());
				}
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("name", enum_.name.fully_qualified_name())?;
				map.serialize_entry("type", "enum")?;
				aliases_and_doc(&mut map, &enum_.aliases, &enum_.doc)?;
				map.serialize_entry("symbols", &enum_.symbols)?;
				logical_entries(&mut map)?;
				map.end()
			}
			SchemaKind::Fixed(fixed) => {
				if !self
					.names
					.should_write_definition(self.key, &mut self.written.borrow_mut())
				{
					return serializer.serialize_str(fixed.name.fully_qualified_name());
				}
				let mut map = serializer.serialize_map(None)?;
				map.serialize_entry("name", fixed.name.fully_qualified_name())?;
				map.serialize_entry("type", "fixed")?;
				if !fixed.aliases.is_empty() {
					map.serialize_entry("aliases", &fixed.aliases)?;
				}
				map.serialize_entry("size", &fixed.size)?;
				logical_entries(&mut map)?;
				map.end()
			}
		}
	}
}

impl serde::Serialize for SerializeSchema<'_, &[RecordField]> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut seq = serializer.serialize_seq(Some(self.key.len()))?;
		for field in self.key {
			seq.serialize_element(&self.serializable(field))?;
		}
		seq.end()
	}
}

impl serde::Serialize for SerializeSchema<'_, &RecordField> {
	fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
		let mut map = serializer.serialize_map(None)?;
		map.serialize_entry("name", &self.key.name)?;
		map.serialize_entry("type", &self.serializable(self.key.type_))?;
		if let Some(doc) = &self.key.doc {
			map.serialize_entry("doc", doc)?;
		}
		if let Some(default) = &self.key.default {
			map.serialize_entry("default", default)?;
		}
		map.end()
	}
}

pub(super) fn primitive_name(kind: &SchemaKind) -> &'static str {
	match kind {
		SchemaKind::Null => "null",
		SchemaKind::Boolean => "boolean",
		SchemaKind::Int => "int",
		SchemaKind::Long => "long",
		SchemaKind::Float => "float",
		SchemaKind::Double => "double",
		SchemaKind::Bytes => "bytes",
		SchemaKind::String => "string",
		_ => unreachable!("primitive_name is only called on primitive kinds"),
	}
}
