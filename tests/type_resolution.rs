#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::{
		schema::SchemaGraph,
		types::{
			check_compatible, EnumResolution, FieldResolution, RecordResolution, ResolutionKey,
			ResolutionNode, ResolveType, ResolvedName, SymbolResolution, TypeResolution,
			TypeResolver,
		},
	},
	std::collections::HashMap,
};

struct Point {
	_x: i32,
	_y: i32,
}

impl ResolveType for Point {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		let reserved = resolver.reserve();
		let node = ResolutionNode::Record(RecordResolution {
			name: ResolvedName::implicit("Point").unwrap(),
			fields: vec![
				FieldResolution::new("x", resolver.key_for::<i32>()),
				FieldResolution::new("y", resolver.key_for::<i32>()),
			],
		});
		resolver.nodes[reserved.idx()] = node;
		reserved
	}
	type Memo = Self;
}

struct Tree {
	_value: i64,
	_children: Vec<Tree>,
}

impl ResolveType for Tree {
	fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
		let reserved = resolver.reserve();
		let node = ResolutionNode::Record(RecordResolution {
			name: ResolvedName::implicit("Tree").unwrap(),
			fields: vec![
				FieldResolution::new("value", resolver.key_for::<i64>()),
				FieldResolution::new("children", resolver.key_for::<Vec<Tree>>()),
			],
		});
		resolver.nodes[reserved.idx()] = node;
		reserved
	}
	type Memo = Self;
}

#[test]
fn generates_schemas_for_primitives_and_collections() {
	assert_eq!(TypeResolution::of::<i32>().to_schema().unwrap().json(), r#""int""#);
	assert_eq!(TypeResolution::of::<u16>().to_schema().unwrap().json(), r#""int""#);
	assert_eq!(TypeResolution::of::<u32>().to_schema().unwrap().json(), r#""long""#);
	assert_eq!(TypeResolution::of::<i64>().to_schema().unwrap().json(), r#""long""#);
	assert_eq!(TypeResolution::of::<f64>().to_schema().unwrap().json(), r#""double""#);
	assert_eq!(TypeResolution::of::<String>().to_schema().unwrap().json(), r#""string""#);
	assert_eq!(TypeResolution::of::<Vec<u8>>().to_schema().unwrap().json(), r#""bytes""#);
	assert_eq!(
		TypeResolution::of::<Vec<i64>>().to_schema().unwrap().json(),
		r#"{"type":"array","items":"long"}"#
	);
	assert_eq!(
		TypeResolution::of::<Option<String>>().to_schema().unwrap().json(),
		r#"["null","string"]"#
	);
	assert_eq!(
		TypeResolution::of::<HashMap<String, bool>>()
			.to_schema()
			.unwrap()
			.json(),
		r#"{"type":"map","values":"boolean"}"#
	);
}

#[test]
fn generates_record_schemas() {
	assert_eq!(
		TypeResolution::of::<Point>().to_schema().unwrap().json(),
		r#"{"name":"Point","type":"record","fields":[{"name":"x","type":"int"},{"name":"y","type":"int"}]}"#
	);
}

/// A self-referential type resolves in bounded time and generates a schema
/// that references itself by name
#[test]
fn self_referential_types_resolve() {
	let resolution = TypeResolution::of::<Tree>();
	let schema_json = resolution.to_schema().unwrap().json().to_owned();
	assert_eq!(
		schema_json,
		r#"{"name":"Tree","type":"record","fields":[{"name":"value","type":"long"},{"name":"children","type":{"type":"array","items":"Tree"}}]}"#
	);
}

#[test]
fn enum_symbols_are_ordered_by_value_then_name() {
	let enum_ = EnumResolution::new(
		ResolvedName::implicit("Level").unwrap(),
		vec![
			SymbolResolution::new("Warn", 2),
			SymbolResolution::new("Info", 1),
			SymbolResolution::new("Error", 2),
			SymbolResolution::new("Debug", 0),
		],
	);
	assert_eq!(
		enum_
			.symbols
			.iter()
			.map(|symbol| symbol.name.as_str())
			.collect::<Vec<_>>(),
		["Debug", "Info", "Error", "Warn"],
	);
}

#[test]
fn compatibility_accepts_promotions() {
	let int_resolution = TypeResolution::of::<i32>();
	for schema_json in [r#""int""#, r#""long""#, r#""float""#, r#""double""#] {
		let graph: SchemaGraph = schema_json.parse().unwrap();
		check_compatible(&graph, &int_resolution)
			.unwrap_or_else(|e| panic!("i32 should be accepted by {schema_json}: {e}"));
	}

	let string_schema: SchemaGraph = r#""string""#.parse().unwrap();
	assert!(check_compatible(&string_schema, &int_resolution).is_err());

	// f32 is not accepted where the schema wants double-precision...
	let double_schema: SchemaGraph = r#""double""#.parse().unwrap();
	check_compatible(&double_schema, &TypeResolution::of::<f32>()).unwrap();
	// ...but a 64-bit host float does not fit a float schema
	let float_schema: SchemaGraph = r#""float""#.parse().unwrap();
	assert!(check_compatible(&float_schema, &TypeResolution::of::<f64>()).is_err());
}

#[test]
fn compatibility_handles_unions_and_options() {
	let nullable_long: SchemaGraph = r#"["null", "long"]"#.parse().unwrap();
	check_compatible(&nullable_long, &TypeResolution::of::<Option<i64>>()).unwrap();
	// A plain value against a union is fine as long as some branch takes it
	check_compatible(&nullable_long, &TypeResolution::of::<i64>()).unwrap();

	let no_null: SchemaGraph = r#"["string", "long"]"#.parse().unwrap();
	let err = check_compatible(&no_null, &TypeResolution::of::<Option<i64>>()).unwrap_err();
	assert!(format!("{err}").contains("no null branch"));
}

#[test]
fn compatibility_matches_record_fields_by_name() {
	let schema: SchemaGraph = r#"
	{
		"type": "record",
		"name": "Point",
		"namespace": "geometry",
		"fields": [
			{"name": "x", "type": "long"},
			{"name": "y", "type": "int"},
			{"name": "label", "type": "string"}
		]
	}
	"#
	.parse()
	.unwrap();

	// Implicit names match on the unqualified name; extra schema fields
	// (label) and promoted field types (x: i32 -> long) are fine
	check_compatible(&schema, &TypeResolution::of::<Point>()).unwrap();

	let wrong_field_type: SchemaGraph = r#"
	{
		"type": "record",
		"name": "Point",
		"fields": [{"name": "x", "type": "string"}, {"name": "y", "type": "int"}]
	}
	"#
	.parse()
	.unwrap();
	let err = check_compatible(&wrong_field_type, &TypeResolution::of::<Point>()).unwrap_err();
	assert!(format!("{err}").contains("$.x"));
}

#[test]
fn explicit_names_must_match_exactly() {
	struct Renamed;
	impl ResolveType for Renamed {
		fn resolve(resolver: &mut TypeResolver) -> ResolutionKey {
			let reserved = resolver.reserve();
			let node = ResolutionNode::Record(RecordResolution {
				name: ResolvedName::explicit("other.namespace.Point").unwrap(),
				fields: vec![FieldResolution::new("x", resolver.key_for::<i32>())],
			});
			resolver.nodes[reserved.idx()] = node;
			reserved
		}
		type Memo = Self;
	}

	let schema: SchemaGraph = r#"
	{
		"type": "record",
		"name": "Point",
		"namespace": "geometry",
		"fields": [{"name": "x", "type": "int"}]
	}
	"#
	.parse()
	.unwrap();
	let err = check_compatible(&schema, &TypeResolution::of::<Renamed>()).unwrap_err();
	assert!(format!("{err}").contains("name mismatch"));
}

#[test]
fn compatibility_is_cycle_safe() {
	let schema: SchemaGraph = r#"
	{
		"type": "record",
		"name": "Tree",
		"fields": [
			{"name": "value", "type": "long"},
			{"name": "children", "type": {"type": "array", "items": "Tree"}}
		]
	}
	"#
	.parse()
	.unwrap();
	check_compatible(&schema, &TypeResolution::of::<Tree>()).unwrap();
}
