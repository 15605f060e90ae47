mod depth;
mod types;
mod unit_variant_enum_access;

use {types::*, unit_variant_enum_access::UnitVariantEnumAccess};

pub(crate) use depth::AllowedDepth;

use super::*;

/// Can't be instantiated directly - has to be constructed from a
/// [`DeserializerState`]
pub struct DatumDeserializer<'r, 's, R> {
	pub(super) state: &'r mut DeserializerState<'s, R>,
	pub(super) schema_node: &'s CodecNode<'s>,
	pub(super) allowed_depth: AllowedDepth,
}

impl<'de, R: ReadSlice<'de>> Deserializer<'de> for DatumDeserializer<'_, '_, R> {
	type Error = DeError;

	fn deserialize_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Null => visitor.visit_unit(),
			CodecNode::Boolean => read_bool(self.state, visitor),
			CodecNode::Int => visitor.visit_i32(self.state.read_varint()?),
			CodecNode::Long => visitor.visit_i64(self.state.read_varint()?),
			CodecNode::Float => {
				visitor.visit_f32(f32::from_le_bytes(self.state.read_const_size_buf()?))
			}
			CodecNode::Double => {
				visitor.visit_f64(f64::from_le_bytes(self.state.read_const_size_buf()?))
			}
			CodecNode::Bytes => read_length_delimited(self.state, BytesVisitor(visitor)),
			CodecNode::String => read_length_delimited(self.state, StringVisitor(visitor)),
			CodecNode::Array(elements_schema) => visitor.visit_seq(ArraySeqAccess {
				elements_schema: elements_schema.as_ref(),
				block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
			}),
			CodecNode::Map(elements_schema) => visitor.visit_map(MapMapAccess {
				elements_schema: elements_schema.as_ref(),
				block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
			}),
			CodecNode::Union(ref union) => Self {
				schema_node: read_union_discriminant(self.state, union)?,
				state: self.state,
				allowed_depth: self.allowed_depth.dec()?,
			}
			.deserialize_any(visitor),
			CodecNode::Record(ref record) => {
				// NB: infinite recursion is prevented here by the fact that
				// schemas that always end up containing themselves cannot
				// be constructed
				visitor.visit_map(RecordMapAccess {
					record_fields: record.fields.iter(),
					state: self.state,
					allowed_depth: self.allowed_depth.dec()?,
				})
			}
			CodecNode::Enum(ref enum_) => read_enum_as_str(self.state, &enum_.symbols, visitor),
			CodecNode::Fixed(ref fixed) => self.state.read_slice(fixed.size, BytesVisitor(visitor)),
			CodecNode::Decimal(ref decimal) => {
				read_decimal(self.state, decimal, VisitorHint::Str, visitor)
			}
			CodecNode::Uuid => read_length_delimited(self.state, StringVisitor(visitor)),
			CodecNode::Date => visitor.visit_i32(self.state.read_varint()?),
			CodecNode::TimeMillis => visitor.visit_i32(self.state.read_varint()?),
			CodecNode::TimeMicros => visitor.visit_i64(self.state.read_varint()?),
			CodecNode::TimestampMillis => visitor.visit_i64(self.state.read_varint()?),
			CodecNode::TimestampMicros => visitor.visit_i64(self.state.read_varint()?),
			CodecNode::Duration => visitor.visit_map(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
		}
	}

	serde::forward_to_deserialize_any! {
		bool i8 i16 i32 u8 u16 u32 f32 char
		unit unit_struct newtype_struct
	}

	fn deserialize_u64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// Allow deserializing discriminants without making the string
		// lookup for enums
		match *self.schema_node {
			CodecNode::Enum(_) => {
				let discriminant: i64 = self.state.read_varint()?;
				visitor.visit_u64(discriminant.try_into().map_err(|e| {
					DeError::custom(format_args!("Got negative enum discriminant: {e}"))
				})?)
			}
			CodecNode::Decimal(ref decimal) => {
				read_decimal(self.state, decimal, VisitorHint::U64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Long => visitor.visit_i64(self.state.read_varint()?),
			CodecNode::Decimal(ref decimal) => {
				read_decimal(self.state, decimal, VisitorHint::I64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_u128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Decimal(ref decimal) => {
				read_decimal(self.state, decimal, VisitorHint::U128, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_i128<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Decimal(ref decimal) => {
				read_decimal(self.state, decimal, VisitorHint::I128, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_f64<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Double => {
				visitor.visit_f64(f64::from_le_bytes(self.state.read_const_size_buf()?))
			}
			CodecNode::Decimal(ref decimal) => {
				read_decimal(self.state, decimal, VisitorHint::F64, visitor)
			}
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_str<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// If we get hinted on str, we may attempt to deserialize byte
		// arrays as utf-8 encoded strings
		match *self.schema_node {
			CodecNode::String | CodecNode::Bytes => {
				read_length_delimited(self.state, StringVisitor(visitor))
			}
			CodecNode::Fixed(ref fixed) => self.state.read_slice(fixed.size, StringVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_string<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_str(visitor)
	}

	fn deserialize_bytes<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Bytes => read_length_delimited(self.state, BytesVisitor(visitor)),
			CodecNode::Duration => self.state.read_slice(12, BytesVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_byte_buf<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_bytes(visitor)
	}

	fn deserialize_option<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match self.schema_node {
			CodecNode::Null => visitor.visit_none(),
			CodecNode::Union(union) => {
				let union_discriminant: usize = read_discriminant(self.state)?;
				match union
					.variants
					.get(union_discriminant)
					.map(|&node_ref| node_ref.as_ref())
				{
					None => Err(DeError::new("Could not find union discriminant in schema")),
					Some(CodecNode::Null) => visitor.visit_none(),
					Some(variant_schema) => visitor.visit_some(DatumDeserializer {
						state: self.state,
						schema_node: variant_schema,
						allowed_depth: self.allowed_depth.dec()?,
					}),
				}
			}
			_ => visitor.visit_some(self),
		}
	}

	fn deserialize_seq<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Array(elements_schema) => visitor.visit_seq(ArraySeqAccess {
				elements_schema: elements_schema.as_ref(),
				block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
			}),
			CodecNode::Duration => visitor.visit_seq(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_tuple<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// Allows deserializing Duration as (u32, u32, u32)
		match *self.schema_node {
			CodecNode::Array(elements_schema) => visitor.visit_seq(ArraySeqAccess {
				elements_schema: elements_schema.as_ref(),
				block_reader: BlockReader::new(self.state, self.allowed_depth.dec()?),
			}),
			CodecNode::Duration if len == 3 => visitor.visit_seq(DurationMapAndSeqAccess {
				duration_buf: &self.state.read_const_size_buf::<12>()?,
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_tuple_struct<V>(
		self,
		_: &'static str,
		len: usize,
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_tuple(len, visitor)
	}

	fn deserialize_map<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_any(visitor)
	}

	fn deserialize_struct<V>(
		self,
		_: &'static str,
		_: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserialize_map(visitor)
	}

	fn deserialize_enum<V>(
		self,
		_: &'static str,
		_: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Union(ref union) => visitor.visit_enum(SchemaTypeNameEnumAccess {
				variant_schema: read_union_discriminant(self.state, union)?,
				state: self.state,
				allowed_depth: self.allowed_depth.dec()?,
			}),
			ref possible_unit_variant_identifier @ (CodecNode::Int
			| CodecNode::Long
			| CodecNode::Bytes
			| CodecNode::String
			| CodecNode::Enum(_)
			| CodecNode::Fixed(_)) => visitor.visit_enum(UnitVariantEnumAccess {
				state: self.state,
				schema_node: possible_unit_variant_identifier,
				allowed_depth: self.allowed_depth.dec()?,
			}),
			ref not_unit_variant_identifier => visitor.visit_enum(SchemaTypeNameEnumAccess {
				state: self.state,
				variant_schema: not_unit_variant_identifier,
				allowed_depth: self.allowed_depth.dec()?,
			}),
		}
	}

	fn deserialize_identifier<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		match *self.schema_node {
			CodecNode::Int => visitor.visit_u64({
				let val: i32 = self.state.read_varint()?;
				val.try_into()
					.map_err(|_| DeError::new("Failed to convert i32 to u64 for enum identifier"))?
			}),
			CodecNode::Long => visitor.visit_u64({
				let val: i64 = self.state.read_varint()?;
				val.try_into()
					.map_err(|_| DeError::new("Failed to convert i64 to u64 for enum identifier"))?
			}),
			_ => self.deserialize_any(visitor),
		}
	}

	fn deserialize_ignored_any<V>(self, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		// The main thing that can be skipped here for performance is utf8
		// decoding of strings. The deserializer must otherwise be driven
		// mostly normally to properly advance the reader.
		match *self.schema_node {
			CodecNode::String => read_length_delimited(self.state, BytesVisitor(visitor)),
			_ => self.deserialize_any(visitor),
		}
	}
}
