use super::*;

pub(in super::super) fn read_enum_as_str<'de, R, V>(
	state: &mut DeserializerState<R>,
	symbols: &[String],
	visitor: V,
) -> Result<V::Value, DeError>
where
	R: ReadSlice<'de>,
	V: Visitor<'de>,
{
	let enum_discriminant = read_discriminant(state)?;
	match symbols.get(enum_discriminant) {
		None => Err(DeError::new("Could not find enum discriminant in schema")),
		Some(symbol) => {
			// Not visiting borrowed here, because that would tie the
			// lifetime of the deserializer to the lifetime of the schema,
			// which would otherwise be a bother in a lot of cases.
			// To avoid the allocation, the user may define an enum.
			visitor.visit_str(symbol)
		}
	}
}
