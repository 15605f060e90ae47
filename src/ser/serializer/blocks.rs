use super::*;

/// Writes the block structure of arrays and maps
///
/// The writer only ever emits positive block counts (a single block sized
/// from the length the `Serialize` implementation advertised, then
/// one-element blocks for anything past that).
pub(super) struct BlockWriter<'r, 'c, 's, W> {
	pub(super) state: &'r mut SerializerState<'c, 's, W>,
	current_block_len: usize,
}

impl<'r, 'c, 's, W> BlockWriter<'r, 'c, 's, W>
where
	W: std::io::Write,
{
	pub(super) fn new(
		state: &'r mut SerializerState<'c, 's, W>,
		min_len: usize,
	) -> Result<Self, SerError> {
		if min_len > 0 {
			let len: i64 = min_len
				.try_into()
				.map_err(|_| SerError::new("Array or map len overflows i64"))?;
			state.writer.write_varint(len).map_err(SerError::io)?;
		}
		Ok(BlockWriter {
			state,
			current_block_len: min_len,
		})
	}

	pub(super) fn signal_next_record(&mut self) -> Result<(), SerError> {
		match self.current_block_len.checked_sub(1) {
			None => {
				self.state.writer.write_varint(1i32).map_err(SerError::io)?;
			}
			Some(new_block_len) => {
				self.current_block_len = new_block_len;
			}
		}
		Ok(())
	}

	/// Check that the last block is complete and advertise the end
	/// (zero-sized block)
	pub(super) fn end(self) -> Result<(), SerError> {
		// The block len was advertised based on the size provided by the
		// `Serialize` type, so getting fewer elements than that (which can
		// only happen if the `Serialize` impl does not respect the serde
		// contract) means the output is already invalid
		if self.current_block_len != 0 {
			Err(SerError::new(
				"Got fewer elements in Map or Array than initially advertised \
					by `Serialize` implementor (check your `impl Serialize` types)",
			))
		} else {
			self.state.writer.write_varint(0i32).map_err(SerError::io)?;
			Ok(())
		}
	}
}
