use super::*;

pub(in super::super) fn read_discriminant<'de, R>(
	state: &mut DeserializerState<R>,
) -> Result<usize, DeError>
where
	R: ReadSlice<'de>,
{
	let discriminant: i64 = state.read_varint()?;
	discriminant
		.try_into()
		.map_err(|e| DeError::custom(format_args!("Invalid negative discriminant in stream: {e}")))
}
