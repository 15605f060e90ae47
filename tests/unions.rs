#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::{from_datum_slice, ser::SerializerConfig, to_datum_vec, Schema},
};

fn round_trip<T>(schema: &Schema, value: T, expected_bytes: &[u8])
where
	T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
	let encoded = to_datum_vec(&value, &SerializerConfig::new(schema)).unwrap();
	assert_eq!(encoded, expected_bytes, "encoding {value:?}");
	let decoded: T = from_datum_slice(&encoded, schema).unwrap();
	assert_eq!(decoded, value);
}

#[test]
fn option_against_nullable_union() {
	let schema: Schema = r#"["null", "int"]"#.parse().unwrap();
	round_trip(&schema, None::<i32>, &[0]);
	round_trip(&schema, Some(3i32), &[2, 6]);
}

/// The branch is picked from the runtime shape of the value, in schema
/// declaration order
#[test]
fn branch_is_selected_by_value_shape() {
	let schema: Schema = r#"["string", "null", "long"]"#.parse().unwrap();
	round_trip(&schema, Some("hi".to_owned()), &[0, 4, b'h', b'i']);
	round_trip(&schema, None::<String>, &[2]);
	// i64 hints at the long branch even though string comes first
	let encoded = to_datum_vec(&Some(4i64), &SerializerConfig::new(&schema)).unwrap();
	assert_eq!(encoded, &[4, 8]);
}

/// When no branch accepts the value's shape, serialization errors instead
/// of guessing
#[test]
fn no_matching_branch_errors() {
	let schema: Schema = r#"["null", "string"]"#.parse().unwrap();
	let err = to_datum_vec(&Some(3i32), &SerializerConfig::new(&schema)).unwrap_err();
	assert!(format!("{err}").contains("Could not serialize"));
}

/// Rust enums select the branch by variant name, which takes precedence
/// over shape deduction
#[test]
fn branch_can_be_designated_by_name() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	enum IntOrString {
		Int(i32),
		String(String),
	}
	let schema: Schema = r#"["int", "string"]"#.parse().unwrap();
	round_trip(&schema, IntOrString::Int(7), &[0, 14]);
	round_trip(
		&schema,
		IntOrString::String("x".to_owned()),
		&[2, 2, b'x'],
	);
}

/// Record branches are selected by the struct's type name (or fully
/// qualified schema name)
#[test]
fn record_branch_by_struct_name() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	struct Foo {
		a: i64,
	}
	let schema: Schema = r#"["null", {"type": "record", "name": "Foo", "fields": [{"name": "a", "type": "long"}]}]"#
		.parse()
		.unwrap();
	round_trip(&schema, Some(Foo { a: 3 }), &[2, 6]);
	round_trip(&schema, None::<Foo>, &[0]);
}

/// Unions of several named records deserialize into an enum keyed on the
/// record names
#[test]
fn union_of_records_into_enum() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	struct Cat {
		lives: i32,
	}
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	struct Dog {
		good: bool,
	}
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	enum Pet {
		Cat(Cat),
		Dog(Dog),
	}
	let schema: Schema = r#"[
		{"type": "record", "name": "Cat", "fields": [{"name": "lives", "type": "int"}]},
		{"type": "record", "name": "Dog", "fields": [{"name": "good", "type": "boolean"}]}
	]"#
	.parse()
	.unwrap();
	round_trip(&schema, Pet::Cat(Cat { lives: 9 }), &[0, 18]);
	round_trip(&schema, Pet::Dog(Dog { good: true }), &[2, 1]);
}

/// Primitive union branches deserialize into an enum keyed on the
/// PascalCase type names
#[test]
fn union_of_primitives_into_enum() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	enum Value {
		Long(i64),
		String(String),
		Null,
	}
	let schema: Schema = r#"["long", "string", "null"]"#.parse().unwrap();
	round_trip(&schema, Value::Long(-2), &[0, 3]);
	round_trip(&schema, Value::String("ok".to_owned()), &[2, 4, b'o', b'k']);
	round_trip(&schema, Value::Null, &[4]);
}
