#![allow(missing_docs)]

use {
	pretty_assertions::assert_eq,
	serde_avro_wire::{from_datum_slice, ser::SerializerConfig, to_datum_vec, Schema},
};

fn round_trip<T>(schema_json: &str, value: T, expected_bytes: &[u8])
where
	T: serde::Serialize + serde::de::DeserializeOwned + PartialEq + std::fmt::Debug,
{
	let schema: Schema = schema_json.parse().unwrap();
	let encoded = to_datum_vec(&value, &SerializerConfig::new(&schema)).unwrap();
	assert_eq!(encoded, expected_bytes, "encoding {value:?} as {schema_json}");
	let decoded: T = from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(decoded, value);

	// Also through the reader-based deserializer, which must stop exactly
	// at the end of the datum
	let mut suffixed = encoded.clone();
	suffixed.push(0xFF);
	let mut reader = suffixed.as_slice();
	let decoded: T = serde_avro_wire::from_datum_reader(&mut reader, &schema).unwrap();
	assert_eq!(decoded, value);
	assert_eq!(reader, &[0xFF]);
}

#[test]
fn primitives() {
	round_trip(r#""null""#, (), &[]);
	round_trip(r#""boolean""#, true, &[1]);
	round_trip(r#""int""#, 3, &[6]);
	round_trip(r#""int""#, -1, &[1]);
	round_trip(r#""int""#, 1234i32, &[164, 19]);
	round_trip(r#""long""#, 1234i64, &[164, 19]);
	round_trip(r#""long""#, i64::MIN, &[255, 255, 255, 255, 255, 255, 255, 255, 255, 1]);
	round_trip(r#""float""#, 1234.0f32, &[0, 64, 154, 68]);
	round_trip(r#""double""#, 1234.0f64, &[0, 0, 0, 0, 0, 72, 147, 64]);
	round_trip(r#""string""#, "foo".to_owned(), &[6, 102, 111, 111]);
	round_trip(
		r#""bytes""#,
		serde_bytes::ByteBuf::from(b"12345".to_vec()),
		&[10, b'1', b'2', b'3', b'4', b'5'],
	);
}

#[test]
fn fixed() {
	round_trip(
		r#"{"type": "fixed", "name": "Two", "size": 2}"#,
		serde_bytes::ByteBuf::from(vec![0xAB, 0xCD]),
		&[0xAB, 0xCD],
	);
}

#[test]
fn arrays_and_maps() {
	round_trip(
		r#"{"type": "array", "items": "long"}"#,
		vec![1i64, 3, 2],
		&[6, 2, 6, 4, 0],
	);
	// Single-entry map so the encoding is deterministic
	round_trip(
		r#"{"type": "map", "values": "long"}"#,
		std::collections::HashMap::from([("a".to_owned(), 1i64)]),
		&[2, 2, b'a', 2, 0],
	);
}

#[test]
fn negative_block_counts_are_accepted_on_read() {
	let schema: Schema = r#"{"type": "array", "items": "long"}"#.parse().unwrap();
	// Block of -3 items (zig-zag: 5), advertising a byte size of 3, then
	// the end marker
	let datum = &[5, 6, 2, 6, 4, 0];
	let decoded: Vec<i64> = from_datum_slice(datum, &schema).unwrap();
	assert_eq!(decoded, vec![1, 3, 2]);
}

#[test]
fn enums() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	enum Suit {
		Spades,
		Hearts,
	}
	round_trip(
		r#"{"type": "enum", "name": "Suit", "symbols": ["Spades", "Hearts"]}"#,
		Suit::Hearts,
		&[2],
	);
}

#[test]
fn records_and_field_order() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	struct LongerRecord {
		f: i64,
		g: i64,
		h: String,
	}
	round_trip(
		r#"{"type": "record", "name": "LongerRecord", "fields": [
			{"name": "f", "type": "long"}, {"name": "g", "type": "long"}, {"name": "h", "type": "string"}]}"#,
		LongerRecord {
			f: 1,
			g: 2,
			h: "Abc".to_owned(),
		},
		&[2, 4, 6, b'A', b'b', b'c'],
	);

	// A struct that provides the fields in a different order than the
	// schema; the output must still be in schema order
	#[derive(serde_derive::Serialize)]
	struct ShuffledRecord {
		h: String,
		f: i64,
		g: i64,
	}
	let schema: Schema = r#"{"type": "record", "name": "LongerRecord", "fields": [
		{"name": "f", "type": "long"}, {"name": "g", "type": "long"}, {"name": "h", "type": "string"}]}"#
		.parse()
		.unwrap();
	let encoded = to_datum_vec(
		&ShuffledRecord {
			h: "Abc".to_owned(),
			f: 1,
			g: 2,
		},
		&SerializerConfig::new(&schema),
	)
	.unwrap();
	assert_eq!(encoded, &[2, 4, 6, b'A', b'b', b'c']);
}

#[test]
fn missing_trailing_optional_fields_write_as_null() {
	#[derive(serde_derive::Serialize, PartialEq, Debug)]
	struct Partial {
		f: i64,
	}
	let schema: Schema = r#"{"type": "record", "name": "R", "fields": [
		{"name": "f", "type": "long"},
		{"name": "opt", "type": ["null", "string"], "default": null}]}"#
		.parse()
		.unwrap();
	let encoded = to_datum_vec(&Partial { f: 1 }, &SerializerConfig::new(&schema)).unwrap();
	assert_eq!(encoded, &[2, 0]);
}

#[test]
fn decimal_logical_type() {
	round_trip(
		r#"{"type": "bytes", "logicalType": "decimal", "precision": 6, "scale": 2}"#,
		rust_decimal_from_str("123.45"),
		&[4, 48, 57],
	);
	round_trip(
		r#"{"type": "bytes", "logicalType": "decimal", "precision": 6, "scale": 2}"#,
		rust_decimal_from_str("-123.45"),
		&[4, 207, 199],
	);
	round_trip(
		r#"{"type": "fixed", "name": "Dec", "size": 4, "logicalType": "decimal", "precision": 6, "scale": 2}"#,
		rust_decimal_from_str("123.45"),
		&[0, 0, 48, 57],
	);
}

fn rust_decimal_from_str(s: &str) -> rust_decimal::Decimal {
	s.parse().unwrap()
}

#[test]
fn date_and_timestamp_logical_types() {
	round_trip(r#"{"type": "int", "logicalType": "date"}"#, 19_000, &[240, 168, 2]);
	round_trip(
		r#"{"type": "long", "logicalType": "timestamp-millis"}"#,
		1_600_000_000_000i64,
		&[128, 128, 244, 246, 144, 93],
	);
}

#[test]
fn uuid_logical_type() {
	round_trip(
		r#"{"type": "string", "logicalType": "uuid"}"#,
		"f81d4fae-7dec-11d0-a765-00a0c91e6bf6".to_owned(),
		&{
			let mut expected = vec![72];
			expected.extend_from_slice(b"f81d4fae-7dec-11d0-a765-00a0c91e6bf6");
			expected
		},
	);
}

#[test]
fn duration_logical_type() {
	#[derive(serde_derive::Serialize, serde_derive::Deserialize, PartialEq, Debug)]
	struct Duration {
		months: u32,
		days: u32,
		milliseconds: u32,
	}
	round_trip(
		r#"{"type": "fixed", "name": "Dur", "size": 12, "logicalType": "duration"}"#,
		Duration {
			months: 1,
			days: 2,
			milliseconds: 3,
		},
		&[1, 0, 0, 0, 2, 0, 0, 0, 3, 0, 0, 0],
	);

	// And as a (u32, u32, u32) tuple
	let schema: Schema =
		r#"{"type": "fixed", "name": "Dur", "size": 12, "logicalType": "duration"}"#
			.parse()
			.unwrap();
	let encoded = to_datum_vec(&(4u32, 5u32, 6u32), &SerializerConfig::new(&schema)).unwrap();
	assert_eq!(encoded, &[4, 0, 0, 0, 5, 0, 0, 0, 6, 0, 0, 0]);
	let decoded: (u32, u32, u32) = from_datum_slice(&encoded, &schema).unwrap();
	assert_eq!(decoded, (4, 5, 6));
}

#[test]
fn truncated_input_errors_instead_of_panicking() {
	let schema: Schema = r#""string""#.parse().unwrap();
	// Advertises 3 bytes but only provides 2
	let err = from_datum_slice::<String>(&[6, 102, 111], &schema).unwrap_err();
	let message = format!("{err}");
	assert!(
		message.contains("end of slice"),
		"unexpected error message: {message}"
	);
}

#[test]
fn invalid_utf8_strings_are_rejected() {
	let schema: Schema = r#""string""#.parse().unwrap();
	let err = from_datum_slice::<String>(&[4, 0xC3, 0x28], &schema).unwrap_err();
	assert!(format!("{err}").contains("utf-8"));
}

#[test]
fn out_of_range_enum_discriminants_are_rejected() {
	let schema: Schema = r#"{"type": "enum", "name": "E", "symbols": ["A"]}"#.parse().unwrap();
	assert!(from_datum_slice::<String>(&[4], &schema).is_err());
}
