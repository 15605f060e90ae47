use super::*;

/// `SerializeSeq`/`SerializeTuple`/`SerializeTupleStruct` implementation
///
/// Sequences and tuples write as arrays, or as the three `u32` components
/// of the `duration` logical type.
pub struct SerializeSeqOrTupleOrTupleStruct<'r, 'c, 's, W> {
	kind: Kind<'r, 'c, 's, W>,
}

enum Kind<'r, 'c, 's, W> {
	Array {
		block_writer: BlockWriter<'r, 'c, 's, W>,
		elements_schema: &'s CodecNode<'s>,
	},
	Duration {
		state: &'r mut SerializerState<'c, 's, W>,
		n_values: u8,
	},
}

impl<'r, 'c, 's, W: Write> SerializeSeqOrTupleOrTupleStruct<'r, 'c, 's, W> {
	pub(super) fn array(
		block_writer: BlockWriter<'r, 'c, 's, W>,
		elements_schema: &'s CodecNode<'s>,
	) -> Self {
		Self {
			kind: Kind::Array {
				block_writer,
				elements_schema,
			},
		}
	}

	pub(super) fn duration(state: &'r mut SerializerState<'c, 's, W>) -> Self {
		Self {
			kind: Kind::Duration { state, n_values: 0 },
		}
	}

	fn serialize_element<T: ?Sized>(&mut self, value: &T) -> Result<(), SerError>
	where
		T: Serialize,
	{
		match self.kind {
			Kind::Array {
				ref mut block_writer,
				elements_schema,
			} => {
				block_writer.signal_next_record()?;
				value.serialize(DatumSerializer {
					state: block_writer.state,
					schema_node: elements_schema,
				})
			}
			Kind::Duration {
				ref mut state,
				ref mut n_values,
			} => {
				if *n_values >= 3 {
					Err(duration_seq_len_incorrect())
				} else {
					let val = value.serialize(duration::ExtractU32ForDuration)?;
					state
						.writer
						.write_all(&val.to_le_bytes())
						.map_err(SerError::io)?;
					*n_values += 1;
					Ok(())
				}
			}
		}
	}

	fn end(self) -> Result<(), SerError> {
		match self.kind {
			Kind::Array { block_writer, .. } => block_writer.end(),
			Kind::Duration { n_values, .. } => {
				if n_values != 3 {
					Err(duration_seq_len_incorrect())
				} else {
					Ok(())
				}
			}
		}
	}
}

pub(super) fn duration_seq_len_incorrect() -> SerError {
	SerError::new(
		"A sequence or tuple can indeed be serialized as Duration, \
			but only if it has exactly 3 elements: months/days/milliseconds",
	)
}

macro_rules! impl_serialize_seq_traits {
	($($trait_: ident: $fn_name: ident)*) => {
		$(
			impl<'r, 'c, 's, W: Write> $trait_ for SerializeSeqOrTupleOrTupleStruct<'r, 'c, 's, W> {
				type Ok = ();
				type Error = SerError;

				fn $fn_name<T: ?Sized>(&mut self, value: &T) -> Result<(), Self::Error>
				where
					T: Serialize,
				{
					self.serialize_element(value)
				}

				fn end(self) -> Result<Self::Ok, Self::Error> {
					SerializeSeqOrTupleOrTupleStruct::end(self)
				}
			}
		)*
	};
}

impl_serialize_seq_traits! {
	SerializeSeq: serialize_element
	SerializeTuple: serialize_element
	SerializeTupleStruct: serialize_field
	SerializeTupleVariant: serialize_field
}
