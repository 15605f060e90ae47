#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::schema::{
		ErrorKind, Name, NodeId, RecordField, RecordSchema, SchemaGraph, SchemaKind, SchemaNode,
	},
};

#[test]
fn parses_nested_record_with_namespace_inheritance() {
	let graph: SchemaGraph = r#"
	{
		"type": "record",
		"namespace": "com.example",
		"name": "Outer",
		"fields": [
			{"name": "inner", "type": {"type": "record", "name": "Inner", "fields": [
				{"name": "value", "type": "long"}
			]}},
			{"name": "again", "type": "Inner"}
		]
	}
	"#
	.parse()
	.unwrap();

	let root = match &graph.root().kind {
		SchemaKind::Record(record) => record,
		other => panic!("expected record at root, got {other:?}"),
	};
	assert_eq!(root.name.fully_qualified_name(), "com.example.Outer");
	// The unqualified inner name inherits the enclosing namespace
	let inner = match &graph[root.fields[0].type_].kind {
		SchemaKind::Record(record) => record,
		other => panic!("expected record, got {other:?}"),
	};
	assert_eq!(inner.name.fully_qualified_name(), "com.example.Inner");
	// And the bare-name reference resolves to the same node
	assert_eq!(root.fields[1].type_, root.fields[0].type_);
}

#[test]
fn json_round_trip_preserves_structure() {
	let input = r#"
	{
		"type": "record",
		"name": "ns.WithEverything",
		"aliases": ["ns.OldName"],
		"doc": "a record with everything on it",
		"fields": [
			{"name": "id", "type": "long"},
			{"name": "tags", "type": {"type": "array", "items": "string"}},
			{"name": "attributes", "type": {"type": "map", "values": "string"}},
			{"name": "maybe", "type": ["null", "double"], "default": null},
			{"name": "state", "type": {"type": "enum", "name": "State", "symbols": ["ON", "OFF"]}},
			{"name": "mac", "type": {"type": "fixed", "name": "Mac", "size": 6}},
			{"name": "when", "type": {"type": "long", "logicalType": "timestamp-millis"}}
		]
	}
	"#;
	let graph: SchemaGraph = input.parse().unwrap();
	let written = graph.to_json(false).unwrap();
	let reparsed: SchemaGraph = written.parse().unwrap();
	assert!(graph.structural_eq(&reparsed));

	// Nonessential attributes survive the non-canonical write
	assert!(written.contains(r#""aliases":["ns.OldName"]"#));
	assert!(written.contains(r#""doc":"a record with everything on it""#));
	assert!(written.contains(r#""default":null"#));
	assert!(written.contains(r#""logicalType":"timestamp-millis""#));

	// Writing the reparsed schema again is stable
	assert_eq!(written, reparsed.to_json(false).unwrap());
}

#[test]
fn canonical_form_unwraps_logical_int() {
	let graph: SchemaGraph = r#"{"type": "int", "logicalType": "date"}"#.parse().unwrap();
	assert_eq!(graph.to_json(true).unwrap(), r#""int""#);
}

#[test]
fn canonical_form_omits_nonessential_attributes() {
	let graph: SchemaGraph = r#"
	{
		"type": "record",
		"name": "WithEverything",
		"namespace": "ns",
		"aliases": ["ns.OldName"],
		"doc": "docs docs docs",
		"fields": [
			{"name": "maybe", "type": ["null", "double"], "default": null, "doc": "perhaps"},
			{"name": "amount", "type": {"type": "bytes", "logicalType": "decimal", "precision": 10, "scale": 2}}
		]
	}
	"#
	.parse()
	.unwrap();
	let canonical = graph.to_json(true).unwrap();
	assert_eq!(
		canonical,
		r#"{"name":"ns.WithEverything","type":"record","fields":[{"name":"maybe","type":["null","double"]},{"name":"amount","type":"bytes"}]}"#
	);
	for needle in [
		"aliases",
		"doc",
		"default",
		"logicalType",
		"precision",
		"scale",
		"namespace",
	] {
		assert!(
			!canonical.contains(needle),
			"canonical form should not contain {needle:?}: {canonical}"
		);
	}
}

#[test]
fn canonical_form_is_idempotent_through_reparse() {
	let graph: SchemaGraph = r#"
	{
		"type": "record",
		"name": "ns.Stable",
		"fields": [
			{"name": "xs", "type": {"type": "array", "items": ["null", "ns.Stable"]}}
		]
	}
	"#
	.parse()
	.unwrap();
	let canonical = graph.to_json(true).unwrap();
	let reparsed: SchemaGraph = canonical.parse().unwrap();
	assert_eq!(reparsed.to_json(true).unwrap(), canonical);
}

/// Two structurally distinct records under the same full name cannot be
/// written; the same node referenced twice writes the definition once and
/// the name on later occurrences
#[test]
fn name_conflicts_on_write() {
	let dup_record = |field_type: SchemaKind, nodes: &mut Vec<SchemaNode>| -> NodeId {
		let field_type_id = NodeId::from_idx(nodes.len());
		nodes.push(SchemaNode::new(field_type));
		let id = NodeId::from_idx(nodes.len());
		nodes.push(
			RecordSchema::new(
				Name::new("ns.Dup").unwrap(),
				vec![RecordField::new("f", field_type_id)],
			)
			.unwrap()
			.into(),
		);
		id
	};

	// Distinct definitions: error
	let mut nodes = vec![SchemaNode::new(SchemaKind::Null)];
	let a = dup_record(SchemaKind::Int, &mut nodes);
	let b = dup_record(SchemaKind::String, &mut nodes);
	nodes[0] = RecordSchema::new(
		Name::new("Root").unwrap(),
		vec![RecordField::new("a", a), RecordField::new("b", b)],
	)
	.unwrap()
	.into();
	let graph = SchemaGraph::from_nodes(nodes);
	let err = graph.to_json(false).unwrap_err();
	assert!(
		matches!(err.kind(), ErrorKind::InvalidSchema(_)),
		"expected InvalidSchema, got {err:?}"
	);
	assert!(graph.to_json(true).is_err());

	// Same node twice: definition once, then a name reference
	let mut nodes = vec![SchemaNode::new(SchemaKind::Null)];
	let a = dup_record(SchemaKind::Int, &mut nodes);
	nodes[0] = RecordSchema::new(
		Name::new("Root").unwrap(),
		vec![RecordField::new("a", a), RecordField::new("b", a)],
	)
	.unwrap()
	.into();
	let written = SchemaGraph::from_nodes(nodes).to_json(false).unwrap();
	assert_eq!(written.matches(r#""name":"ns.Dup""#).count(), 1);
	assert!(written.contains(r#"{"name":"b","type":"ns.Dup"}"#));
}

#[test]
fn duplicate_definitions_in_json_are_rejected() {
	let err = r#"
	{
		"type": "record",
		"name": "Root",
		"fields": [
			{"name": "a", "type": {"type": "enum", "name": "E", "symbols": ["X"]}},
			{"name": "b", "type": {"type": "enum", "name": "E", "symbols": ["Y"]}}
		]
	}
	"#
	.parse::<SchemaGraph>()
	.unwrap_err();
	assert!(
		matches!(err.kind(), ErrorKind::ConflictingSchema { name } if name == "E"),
		"expected ConflictingSchema, got {err:?}"
	);
}

#[test]
fn invalid_names_are_rejected() {
	let err = r#"{"type": "record", "name": "0bad", "fields": []}"#
		.parse::<SchemaGraph>()
		.unwrap_err();
	assert!(
		matches!(err.kind(), ErrorKind::InvalidName { name } if name == "0bad"),
		"expected InvalidName, got {err:?}"
	);
}

#[test]
fn invalid_symbols_are_rejected() {
	let err = r#"{"type": "enum", "name": "E", "symbols": ["fine", "not fine"]}"#
		.parse::<SchemaGraph>()
		.unwrap_err();
	assert!(
		matches!(err.kind(), ErrorKind::InvalidSymbol { symbol } if symbol == "not fine"),
		"expected InvalidSymbol, got {err:?}"
	);
}

#[test]
fn unknown_references_are_rejected() {
	let err = r#"
	{
		"type": "record",
		"name": "Root",
		"fields": [{"name": "f", "type": "DoesNotExist"}]
	}
	"#
	.parse::<SchemaGraph>()
	.unwrap_err();
	assert!(
		matches!(err.kind(), ErrorKind::UnknownSchema { .. }),
		"expected UnknownSchema, got {err:?}"
	);
}

#[test]
fn malformed_json_is_rejected() {
	let err = "{{{{".parse::<SchemaGraph>().unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::Json(_)));
}

#[test]
fn union_rules_are_enforced_at_freeze() {
	// Two branches of the same primitive kind
	let err = r#"["int", "string", "int"]"#
		.parse::<SchemaGraph>()
		.unwrap()
		.freeze()
		.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::InvalidSchema(_)));

	// Two branches of the same named type is caught earlier as a
	// conflicting definition; distinct names are fine
	r#"[{"type": "fixed", "name": "A", "size": 2}, {"type": "fixed", "name": "B", "size": 2}]"#
		.parse::<SchemaGraph>()
		.unwrap()
		.freeze()
		.unwrap();
}

#[test]
fn unconditionally_cyclic_records_are_rejected() {
	let err = r#"
	{
		"type": "record",
		"name": "Ouroboros",
		"fields": [{"name": "tail", "type": "Ouroboros"}]
	}
	"#
	.parse::<SchemaGraph>()
	.unwrap_err();
	assert!(matches!(err.kind(), ErrorKind::InvalidSchema(_)));
}

#[test]
fn structural_equality_is_cycle_safe() {
	let cyclic = r#"
	{
		"type": "record",
		"name": "Node",
		"fields": [{"name": "children", "type": {"type": "array", "items": "Node"}}]
	}
	"#;
	let a: SchemaGraph = cyclic.parse().unwrap();
	let b: SchemaGraph = cyclic.parse().unwrap();
	assert!(a.structural_eq(&b));

	let different = r#"
	{
		"type": "record",
		"name": "Node",
		"fields": [{"name": "children", "type": {"type": "array", "items": "string"}}]
	}
	"#;
	let c: SchemaGraph = different.parse().unwrap();
	assert!(!a.structural_eq(&c));
}
