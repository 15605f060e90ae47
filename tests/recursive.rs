#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::{from_datum_slice, ser::SerializerConfig, to_datum_vec, Schema},
};

const NODE_SCHEMA: &str = r#"
{
	"type": "record",
	"name": "Node",
	"fields": [
		{"name": "value", "type": "int"},
		{"name": "children", "type": {"type": "array", "items": "Node"}}
	]
}
"#;

#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
struct Node {
	value: i32,
	children: Vec<Node>,
}

fn leaf(value: i32) -> Node {
	Node {
		value,
		children: Vec::new(),
	}
}

/// Freezing a self-referential schema terminates, and the codec it
/// produces round-trips a whole tree
#[test]
fn recursive_record_round_trips() {
	let schema: Schema = NODE_SCHEMA.parse().unwrap();

	let tree = Node {
		value: 5,
		children: vec![
			leaf(4),
			Node {
				value: 7,
				children: vec![leaf(6), leaf(8)],
			},
		],
	};

	let encoded = to_datum_vec(&tree, &SerializerConfig::new(&schema)).unwrap();
	// value 5, block of 2 children, value 4, no children, value 7,
	// block of 2 children, value 6, no children, value 8, no children,
	// end markers
	assert_eq!(
		encoded,
		&[10, 4, 8, 0, 14, 4, 12, 0, 16, 0, 0, 0]
	);
	let decoded: Node = from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(decoded, tree);
}

/// Conditionally self-referential through a union
#[test]
fn recursive_record_through_union() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "LinkedList",
		"fields": [
			{"name": "value", "type": "long"},
			{"name": "next", "type": ["null", "LinkedList"]}
		]
	}
	"#
	.parse()
	.unwrap();

	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	struct LinkedList {
		value: i64,
		next: Option<Box<LinkedList>>,
	}

	let list = LinkedList {
		value: 1,
		next: Some(Box::new(LinkedList {
			value: 2,
			next: None,
		})),
	};
	let encoded = to_datum_vec(&list, &SerializerConfig::new(&schema)).unwrap();
	assert_eq!(encoded, &[2, 2, 4, 0]);
	let decoded: LinkedList = from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(decoded, list);
}

/// Debug-printing a cyclic schema must not recurse forever
#[test]
fn cyclic_schema_debug_is_bounded() {
	let schema: Schema = NODE_SCHEMA.parse().unwrap();
	let rendered = format!("{schema:?}");
	assert!(rendered.contains("Record"));
}

/// Adversarial depth: a deeply nested datum hits the recursion limit
/// instead of overflowing the stack
#[test]
fn deep_recursion_is_bounded_at_decode_time() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "LinkedList",
		"fields": [{"name": "next", "type": ["null", "LinkedList"]}]
	}
	"#
	.parse()
	.unwrap();

	#[derive(serde_derive::Deserialize, Debug)]
	#[allow(dead_code)]
	struct LinkedList {
		next: Option<Box<LinkedList>>,
	}

	// 100 000 "next" branches, no terminator needed: the depth limit
	// triggers long before the input runs out
	let datum: Vec<u8> = std::iter::repeat(2u8).take(100_000).collect();
	let err = from_datum_slice::<LinkedList>(&datum, &schema).unwrap_err();
	assert!(format!("{err}").contains("recursivity limit"));
}
