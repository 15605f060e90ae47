use super::*;

pub(in super::super) fn read_union_discriminant<'de, 's, R>(
	state: &mut DeserializerState<'s, R>,
	union: &'s UnionCodec<'s>,
) -> Result<&'s CodecNode<'s>, DeError>
where
	R: ReadSlice<'de>,
{
	let union_discriminant: usize = read_discriminant(state)?;
	match union.variants.get(union_discriminant) {
		None => Err(DeError::new("Could not find union discriminant in schema")),
		Some(&variant_schema) => Ok(variant_schema.as_ref()),
	}
}

/// The name under which a union branch surfaces when deserializing a union
/// into a Rust enum
///
/// Named types go by their (full) name, everything else by the PascalCase
/// name of the type.
pub(in super::super) fn union_branch_name<'s>(node: &'s CodecNode<'s>) -> &'s str {
	match node {
		CodecNode::Null => "Null",
		CodecNode::Boolean => "Boolean",
		CodecNode::Int => "Int",
		CodecNode::Long => "Long",
		CodecNode::Float => "Float",
		CodecNode::Double => "Double",
		CodecNode::Bytes => "Bytes",
		CodecNode::String => "String",
		CodecNode::Array(_) => "Array",
		CodecNode::Map(_) => "Map",
		CodecNode::Union(_) => "Union",
		CodecNode::Record(record) => record.name.fully_qualified_name(),
		CodecNode::Enum(enum_) => enum_.name.fully_qualified_name(),
		CodecNode::Fixed(fixed) => fixed.name.fully_qualified_name(),
		CodecNode::Decimal(_) => "Decimal",
		CodecNode::Uuid => "Uuid",
		CodecNode::Date => "Date",
		CodecNode::TimeMillis => "TimeMillis",
		CodecNode::TimeMicros => "TimeMicros",
		CodecNode::TimestampMillis => "TimestampMillis",
		CodecNode::TimestampMicros => "TimestampMicros",
		CodecNode::Duration => "Duration",
	}
}

/// `EnumAccess` that presents the (already discriminated) branch schema's
/// name as the enum variant name, then deserializes the branch value
pub(in super::super) struct SchemaTypeNameEnumAccess<'r, 's, R> {
	pub(in super::super) state: &'r mut DeserializerState<'s, R>,
	pub(in super::super) variant_schema: &'s CodecNode<'s>,
	pub(in super::super) allowed_depth: AllowedDepth,
}

impl<'de, 'r, 's, R: ReadSlice<'de>> EnumAccess<'de> for SchemaTypeNameEnumAccess<'r, 's, R> {
	type Error = DeError;
	type Variant = SchemaTypeNameVariantAccess<'r, 's, R>;

	fn variant_seed<V>(self, seed: V) -> Result<(V::Value, Self::Variant), Self::Error>
	where
		V: DeserializeSeed<'de>,
	{
		let value = seed.deserialize(value::StrDeserializer::<DeError>::new(union_branch_name(
			self.variant_schema,
		)))?;
		Ok((
			value,
			SchemaTypeNameVariantAccess {
				state: self.state,
				variant_schema: self.variant_schema,
				allowed_depth: self.allowed_depth,
			},
		))
	}
}

pub(in super::super) struct SchemaTypeNameVariantAccess<'r, 's, R> {
	state: &'r mut DeserializerState<'s, R>,
	variant_schema: &'s CodecNode<'s>,
	allowed_depth: AllowedDepth,
}

impl<'r, 's, R> SchemaTypeNameVariantAccess<'r, 's, R> {
	fn deserializer(self) -> DatumDeserializer<'r, 's, R> {
		DatumDeserializer {
			state: self.state,
			schema_node: self.variant_schema,
			allowed_depth: self.allowed_depth,
		}
	}
}

impl<'de, R: ReadSlice<'de>> VariantAccess<'de> for SchemaTypeNameVariantAccess<'_, '_, R> {
	type Error = DeError;

	fn unit_variant(self) -> Result<(), Self::Error> {
		// The branch's value still has to be consumed from the stream even
		// if the enum variant holds nothing (for `Null` that's zero bytes)
		serde::de::IgnoredAny::deserialize(self.deserializer())?;
		Ok(())
	}

	fn newtype_variant_seed<T>(self, seed: T) -> Result<T::Value, Self::Error>
	where
		T: DeserializeSeed<'de>,
	{
		seed.deserialize(self.deserializer())
	}

	fn tuple_variant<V>(self, len: usize, visitor: V) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserializer().deserialize_tuple(len, visitor)
	}

	fn struct_variant<V>(
		self,
		fields: &'static [&'static str],
		visitor: V,
	) -> Result<V::Value, Self::Error>
	where
		V: Visitor<'de>,
	{
		self.deserializer().deserialize_struct("", fields, visitor)
	}
}
