use super::*;

/// Write a decimal as its two's-complement big-endian unscaled value
///
/// Over `bytes` the minimal representation is written with a length prefix;
/// over `fixed` the value is sign-extended (or checked-truncated) to the
/// exact declared size.
pub(super) fn serialize<W>(
	state: &mut SerializerState<'_, '_, W>,
	decimal: &DecimalCodec,
	mut value: rust_decimal::Decimal,
) -> Result<(), SerError>
where
	W: Write,
{
	// Scale the number to the position the schema declares
	value.rescale(decimal.scale);
	if value.scale() != decimal.scale {
		return Err(SerError::new(
			"Decimal number cannot be scaled to fit in schema scale \
				with a 96 bit mantissa (number or scale too large)",
		));
	}
	let buf: [u8; 16] = value.mantissa().to_be_bytes();
	let start = match &decimal.repr {
		DecimalRepr::Bytes => {
			let start = leading_redundant_bytes(&buf);
			let len = (buf.len() - start) as i64;
			state.writer.write_varint(len).map_err(SerError::io)?;
			start
		}
		DecimalRepr::Fixed(fixed) => {
			let size = fixed.size;
			match buf.len().checked_sub(size) {
				Some(start) => {
					// About to truncate the leading bytes: make sure that
					// doesn't alter the number
					match buf.get(0..start + 1) {
						Some(relevant_buf_for_check) => {
							let can_truncate = leading_redundant_bytes(relevant_buf_for_check);
							if can_truncate < start {
								return Err(serde::ser::Error::custom(format_args!(
									"Decimal number does not fit in `fixed` field size \
										(fixed size: {size}, required: {})",
									size + (start - can_truncate)
								)));
							}
						}
						None => {
							assert!(size == 0);
							// Only zero can be represented in zero bytes
							if !value.is_zero() {
								return Err(SerError::new(
									"Non-zero decimal number can not be serialized \
										as a fixed size decimal with size 0",
								));
							}
						}
					}
					start
				}
				None => {
					// Declared size is larger than 16: sign-extend
					let byte: u8 = if buf[0] & 0x80 == 0 { 0x00 } else { 0xFF };
					for _ in buf.len()..size {
						state.writer.write_all(&[byte]).map_err(SerError::io)?;
					}
					0
				}
			}
		}
	};
	state.writer.write_all(&buf[start..]).map_err(SerError::io)
}

/// How many leading bytes can be dropped without altering the
/// two's-complement value
#[inline]
fn leading_redundant_bytes(buf: &[u8]) -> usize {
	let mut can_truncate = 0;
	if buf[0] & 0x80 == 0 {
		// Positive number: leading 0x00s followed by a clear MSB
		while buf.get(can_truncate).map_or(false, |&v| v == 0x00) {
			can_truncate += 1;
		}
		// Some deserializers dislike empty bytes for zero, so always keep
		// at least one byte
		if can_truncate != 0 && buf.get(can_truncate).map_or(true, |&v| v & 0x80 != 0) {
			can_truncate -= 1;
		}
	} else {
		// Negative number: leading 0xFFs followed by a set MSB
		while buf.get(can_truncate).map_or(false, |&v| v == 0xFF) {
			can_truncate += 1;
		}
		if can_truncate != 0 && buf.get(can_truncate).map_or(true, |&v| v & 0x80 == 0) {
			can_truncate -= 1;
		}
	}
	can_truncate
}
