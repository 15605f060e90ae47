#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::{from_datum_slice, ser::SerializerConfig, to_datum_vec, Schema},
	std::collections::HashMap,
};

const SKIP_SCHEMA: &str = r#"
{
	"fields": [
		{
			"type": {"type": "array", "items": "int"},
			"name": "a"
		},
		{
			"type": {"type": "array", "items": "int"},
			"name": "b"
		},
		{
			"type": {"type": "array", "items": "int"},
			"name": "cd"
		}
	],
	"type": "record",
	"name": "test_skip"
}
"#;

#[derive(Debug, PartialEq, Eq, serde_derive::Deserialize)]
struct TestSkip {
	a: Vec<i32>,
	cd: Vec<i32>,
}

/// Fields the host type does not declare are consumed from the stream and
/// discarded, block structure included
#[test]
fn skip_block() {
	let schema: Schema = SKIP_SCHEMA.parse().unwrap();
	// Every array here uses the negative-count block form (count, then the
	// advertised byte size, which readers must accept but may not trust)
	// except `cd`, which uses the plain positive form
	let input: &[u8] = &[1, 2, 20, 0, 1, 2, 30, 0, 4, 40, 50, 0, 0xFF];
	let expected = TestSkip {
		a: vec![10],
		cd: vec![20, 25],
	};

	let deserialized: TestSkip = from_datum_slice(&input[..input.len() - 1], &schema).unwrap();
	assert_eq!(deserialized, expected);

	let mut reader = input;
	let deserialized: TestSkip = serde_avro_wire::from_datum_reader(&mut reader, &schema).unwrap();
	assert_eq!(deserialized, expected);
	// Also make sure that the reader stopped at the end of the datum
	assert_eq!(reader, &[0xFF]);
}

const EIGHT_FIELDS_SCHEMA: &str = r#"
{
	"type": "record",
	"name": "EightFields",
	"fields": [
		{"name": "f1", "type": ["null", {"type": "array", "items": "boolean"}]},
		{"name": "f2", "type": {"type": "array", "items": "boolean"}},
		{"name": "f3", "type": {"type": "map", "values": "boolean"}},
		{"name": "f4", "type": "boolean"},
		{"name": "f5", "type": ["null", {"type": "array", "items": "boolean"}]},
		{"name": "f6", "type": {"type": "array", "items": "boolean"}},
		{"name": "f7", "type": {"type": "map", "values": "boolean"}},
		{"name": "f8", "type": "boolean"}
	]
}
"#;

#[derive(serde_derive::Serialize, Debug)]
struct AllEight {
	f1: Option<Vec<bool>>,
	f2: Vec<bool>,
	f3: HashMap<String, bool>,
	f4: bool,
	f5: Option<Vec<bool>>,
	f6: Vec<bool>,
	f7: HashMap<String, bool>,
	f8: bool,
}

#[derive(serde_derive::Deserialize, Debug, PartialEq)]
struct OddFields {
	f1: Option<Vec<bool>>,
	f3: HashMap<String, bool>,
	f5: Option<Vec<bool>>,
	f7: HashMap<String, bool>,
}

/// Writing with all eight fields set and decoding into a type that only
/// declares the odd ones yields those four populated identically; the even
/// fields are consumed and discarded without error
#[test]
fn even_fields_are_skipped() {
	let schema: Schema = EIGHT_FIELDS_SCHEMA.parse().unwrap();
	let value = AllEight {
		f1: Some(vec![true, false]),
		f2: vec![false],
		f3: HashMap::from([("three".to_owned(), true)]),
		f4: true,
		f5: None,
		f6: vec![true, true],
		f7: HashMap::from([("seven".to_owned(), false)]),
		f8: false,
	};

	let encoded = to_datum_vec(&value, &SerializerConfig::new(&schema)).unwrap();
	let decoded: OddFields = from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(
		decoded,
		OddFields {
			f1: Some(vec![true, false]),
			f3: HashMap::from([("three".to_owned(), true)]),
			f5: None,
			f7: HashMap::from([("seven".to_owned(), false)]),
		}
	);
}

/// Host fields that the writer schema does not declare stay at the host
/// default
#[test]
fn extra_host_fields_take_their_default() {
	let schema: Schema = r#"
	{
		"type": "record",
		"name": "Small",
		"fields": [{"name": "present", "type": "long"}]
	}
	"#
	.parse()
	.unwrap();

	#[derive(serde_derive::Serialize)]
	struct Small {
		present: i64,
	}

	#[derive(serde_derive::Deserialize, Debug, PartialEq)]
	struct Grown {
		present: i64,
		#[serde(default = "default_label")]
		label: String,
	}
	fn default_label() -> String {
		"unset".to_owned()
	}

	let encoded = to_datum_vec(&Small { present: 42 }, &SerializerConfig::new(&schema)).unwrap();
	let decoded: Grown = from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(
		decoded,
		Grown {
			present: 42,
			label: "unset".to_owned(),
		}
	);
}
