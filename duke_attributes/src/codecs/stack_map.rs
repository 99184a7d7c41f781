use anyhow::Result;
use crate::class_constants::{attribute, frame, verification_type};
use crate::macros::codec;
use crate::{AttributeError, BodyLayout, ClassReader, ClassWrite, ConstantPool, Version};
use crate::tree::Attribute;
use crate::tree::stack_map::{Frame, StackMapFrame, StackMapTableAttribute, VerificationType};

/// The state carried from one frame to the next when expanding the frames of a `StackMapTable`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FrameState {
	/// The offset of the previous frame, `-1` before the first one.
	previous_offset: i32,
	locals: Vec<VerificationType>,
	/// Whether `locals` are all the locals, and not just the ones after an unknown prefix.
	locals_known: bool,
}

impl FrameState {
	/// The state before the first frame, `initial_locals` are the locals implied by the method descriptor.
	pub fn new(initial_locals: &[VerificationType]) -> FrameState {
		FrameState {
			previous_offset: -1,
			locals: initial_locals.to_vec(),
			locals_known: true,
		}
	}

	/// The state before the first frame of a method whose descriptor isn't known.
	///
	/// Offsets are still checked. Chops are only checked once a full frame has set the locals, before that
	/// the locals of the frames are only the appended ones.
	pub fn without_locals() -> FrameState {
		FrameState {
			previous_offset: -1,
			locals: Vec::new(),
			locals_known: false,
		}
	}

	pub fn locals(&self) -> &[VerificationType] {
		&self.locals
	}

	/// Applies one frame, returning its absolute form.
	///
	/// The error is the reason the frame can't follow the current state.
	pub fn apply(&mut self, frame: &StackMapFrame) -> std::result::Result<Frame, String> {
		let offset = self.previous_offset + 1 + i32::from(frame.offset_delta());
		let offset = u16::try_from(offset)
			.map_err(|_| format!("frame offset {offset} doesn't fit into an u16"))?;

		let stack = match frame {
			StackMapFrame::Same { .. } |
			StackMapFrame::SameExtended { .. } => Vec::new(),
			StackMapFrame::SameLocals1StackItem { stack, .. } |
			StackMapFrame::SameLocals1StackItemExtended { stack, .. } => vec![*stack],
			&StackMapFrame::Chop { k, .. } => {
				let k = usize::from(k);
				if k > self.locals.len() && self.locals_known {
					return Err(format!("can't chop {k} locals, there are only {}", self.locals.len()));
				}
				self.locals.truncate(self.locals.len().saturating_sub(k));
				Vec::new()
			},
			StackMapFrame::Append { locals, .. } => {
				self.locals.extend_from_slice(locals);
				Vec::new()
			},
			StackMapFrame::Full { locals, stack, .. } => {
				self.locals.clone_from(locals);
				self.locals_known = true;
				stack.clone()
			},
		};

		self.previous_offset = i32::from(offset);

		Ok(Frame { offset, locals: self.locals.clone(), stack })
	}
}

impl StackMapTableAttribute {
	/// Computes the absolute frames.
	pub fn expand(&self, initial_locals: &[VerificationType]) -> Result<Vec<Frame>> {
		let mut state = FrameState::new(initial_locals);
		self.frames.iter()
			.map(|frame| state.apply(frame)
				.map_err(|reason| AttributeError::invalid(attribute::STACK_MAP_TABLE, reason).into())
			)
			.collect()
	}

	/// Computes the most compact frames describing the given absolute frames.
	///
	/// The offsets of `frames` must be strictly increasing.
	pub fn compress(initial_locals: &[VerificationType], frames: &[Frame]) -> Result<StackMapTableAttribute> {
		let mut previous_offset = -1;
		let mut locals = initial_locals;
		let mut compressed = Vec::with_capacity(frames.len());

		for frame in frames {
			let offset = i32::from(frame.offset);
			if offset <= previous_offset {
				return Err(AttributeError::invalid(attribute::STACK_MAP_TABLE,
					format!("frame offsets must be strictly increasing, got {} after {previous_offset}", frame.offset)
				).into());
			}
			// both offsets are in the range of u16, and offset > previous_offset
			let offset_delta = (offset - previous_offset - 1) as u16;

			compressed.push(compress_frame(locals, frame, offset_delta));

			previous_offset = offset;
			locals = frame.locals.as_slice();
		}

		Ok(StackMapTableAttribute { frames: compressed })
	}
}

fn compress_frame(previous_locals: &[VerificationType], frame: &Frame, offset_delta: u16) -> StackMapFrame {
	let short_delta = u8::try_from(offset_delta).ok().filter(|&delta| delta <= frame::SAME_MAX);

	if frame.locals == previous_locals {
		match (frame.stack.as_slice(), short_delta) {
			([], Some(offset_delta)) => return StackMapFrame::Same { offset_delta },
			([], None) => return StackMapFrame::SameExtended { offset_delta },
			(&[stack], Some(offset_delta)) => return StackMapFrame::SameLocals1StackItem { offset_delta, stack },
			(&[stack], None) => return StackMapFrame::SameLocals1StackItemExtended { offset_delta, stack },
			_ => {},
		}
	} else if frame.stack.is_empty() {
		let (current, previous) = (frame.locals.len(), previous_locals.len());

		if current < previous && previous - current <= 3 && previous_locals.starts_with(&frame.locals) {
			// at most 3
			let k = (previous - current) as u8;
			return StackMapFrame::Chop { k, offset_delta };
		}
		if current > previous && current - previous <= 3 && frame.locals.starts_with(previous_locals) {
			return StackMapFrame::Append { offset_delta, locals: frame.locals[previous..].to_vec() };
		}
	}

	StackMapFrame::Full {
		offset_delta,
		locals: frame.locals.clone(),
		stack: frame.stack.clone(),
	}
}

fn read_verification_type(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<VerificationType> {
	Ok(match reader.read_u8()? {
		verification_type::TOP => VerificationType::Top,
		verification_type::INTEGER => VerificationType::Integer,
		verification_type::FLOAT => VerificationType::Float,
		verification_type::DOUBLE => VerificationType::Double,
		verification_type::LONG => VerificationType::Long,
		verification_type::NULL => VerificationType::Null,
		verification_type::UNINITIALIZED_THIS => VerificationType::UninitializedThis,
		verification_type::OBJECT => VerificationType::Object(reader.read_index(pool)?),
		verification_type::UNINITIALIZED => VerificationType::Uninitialized(reader.read_u16()?),
		tag => return Err(reader.malformed(format!("unknown verification_type_info tag {tag}"))),
	})
}

fn write_verification_type(writer: &mut Vec<u8>, verification_type: &VerificationType) -> Result<()> {
	match *verification_type {
		VerificationType::Top => writer.write_u8(verification_type::TOP),
		VerificationType::Integer => writer.write_u8(verification_type::INTEGER),
		VerificationType::Float => writer.write_u8(verification_type::FLOAT),
		VerificationType::Double => writer.write_u8(verification_type::DOUBLE),
		VerificationType::Long => writer.write_u8(verification_type::LONG),
		VerificationType::Null => writer.write_u8(verification_type::NULL),
		VerificationType::UninitializedThis => writer.write_u8(verification_type::UNINITIALIZED_THIS),
		VerificationType::Object(index) => {
			writer.write_u8(verification_type::OBJECT)?;
			writer.write_u16(index)
		},
		VerificationType::Uninitialized(offset) => {
			writer.write_u8(verification_type::UNINITIALIZED)?;
			writer.write_u16(offset)
		},
	}
}

fn read_frame(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<StackMapFrame> {
	Ok(match reader.read_u8()? {
		offset_delta @ 0..=frame::SAME_MAX => StackMapFrame::Same { offset_delta },
		frame_type @ frame::SAME_LOCALS_1_STACK_ITEM..=frame::SAME_LOCALS_1_STACK_ITEM_MAX => StackMapFrame::SameLocals1StackItem {
			offset_delta: frame_type - frame::SAME_LOCALS_1_STACK_ITEM,
			stack: read_verification_type(reader, pool)?,
		},
		frame::SAME_LOCALS_1_STACK_ITEM_EXTENDED => StackMapFrame::SameLocals1StackItemExtended {
			offset_delta: reader.read_u16()?,
			stack: read_verification_type(reader, pool)?,
		},
		frame_type @ frame::CHOP_MIN..=250 => StackMapFrame::Chop {
			k: frame::SAME_EXTENDED - frame_type,
			offset_delta: reader.read_u16()?,
		},
		frame::SAME_EXTENDED => StackMapFrame::SameExtended { offset_delta: reader.read_u16()? },
		frame_type @ 252..=frame::APPEND_MAX => {
			let offset_delta = reader.read_u16()?;
			let count = frame_type - frame::SAME_EXTENDED;
			let locals = reader.read_vec(
				|_| Ok(count as usize),
				|r| read_verification_type(r, pool),
			)?;
			StackMapFrame::Append { offset_delta, locals }
		},
		frame::FULL => {
			let offset_delta = reader.read_u16()?;
			let locals = reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| read_verification_type(r, pool),
			)?;
			let stack = reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| read_verification_type(r, pool),
			)?;
			StackMapFrame::Full { offset_delta, locals, stack }
		},
		frame_type => return Err(reader.malformed(format!("reserved stack map frame type {frame_type}"))),
	})
}

fn write_frame(writer: &mut Vec<u8>, stack_map_frame: &StackMapFrame) -> Result<()> {
	let invalid = |reason: String| -> anyhow::Error {
		AttributeError::invalid(attribute::STACK_MAP_TABLE, reason).into()
	};

	match stack_map_frame {
		&StackMapFrame::Same { offset_delta } => {
			if offset_delta > frame::SAME_MAX {
				return Err(invalid(format!("offset delta {offset_delta} too large for a same frame")));
			}
			writer.write_u8(offset_delta)
		},
		StackMapFrame::SameLocals1StackItem { offset_delta, stack } => {
			if *offset_delta > frame::SAME_MAX {
				return Err(invalid(format!("offset delta {offset_delta} too large for a same_locals_1_stack_item frame")));
			}
			writer.write_u8(frame::SAME_LOCALS_1_STACK_ITEM + offset_delta)?;
			write_verification_type(writer, stack)
		},
		StackMapFrame::SameLocals1StackItemExtended { offset_delta, stack } => {
			writer.write_u8(frame::SAME_LOCALS_1_STACK_ITEM_EXTENDED)?;
			writer.write_u16(*offset_delta)?;
			write_verification_type(writer, stack)
		},
		&StackMapFrame::Chop { k, offset_delta } => {
			if !(1..=3).contains(&k) {
				return Err(invalid(format!("can only chop 1 to 3 locals, got {k}")));
			}
			writer.write_u8(frame::SAME_EXTENDED - k)?;
			writer.write_u16(offset_delta)
		},
		&StackMapFrame::SameExtended { offset_delta } => {
			writer.write_u8(frame::SAME_EXTENDED)?;
			writer.write_u16(offset_delta)
		},
		StackMapFrame::Append { offset_delta, locals } => {
			if !(1..=3).contains(&locals.len()) {
				return Err(invalid(format!("can only append 1 to 3 locals, got {}", locals.len())));
			}
			// at most 3
			writer.write_u8(frame::SAME_EXTENDED + locals.len() as u8)?;
			writer.write_u16(*offset_delta)?;
			for local in locals {
				write_verification_type(writer, local)?;
			}
			Ok(())
		},
		StackMapFrame::Full { offset_delta, locals, stack } => {
			writer.write_u8(frame::FULL)?;
			writer.write_u16(*offset_delta)?;
			writer.write_slice(locals,
				|w, size| w.write_usize_as_u16(size),
				write_verification_type
			)?;
			writer.write_slice(stack,
				|w, size| w.write_usize_as_u16(size),
				write_verification_type
			)
		},
	}
}

codec! {
	/// The frames the type checking verifier uses.
	///
	/// Decoding checks that the frame offsets fit into an u16. When the [`DecodeContext`](crate::DecodeContext) carries
	/// the initial locals of the method, it also checks that every chop removes existing locals. Without them, that's
	/// only checked after the first full frame.
	StackMapTableCodec = STACK_MAP_TABLE (attribute::STACK_MAP_TABLE, Version::V1_6, false, BodyLayout::Variable) {
		read(context, reader) {
			let pool = context.pool();
			let mut state = context.initial_locals().map_or_else(FrameState::without_locals, FrameState::new);

			let frames = reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| {
					let start = r.position();
					let frame = read_frame(r, pool)?;
					state.apply(&frame).map_err(|reason| {
						anyhow::Error::from(AttributeError::Malformed { attribute: attribute::STACK_MAP_TABLE, offset: start, reason })
					})?;
					Ok(frame)
				}
			)?;

			Ok(Attribute::StackMapTable(StackMapTableAttribute { frames }))
		}
		write(writer, Attribute::StackMapTable(table)) {
			writer.write_slice(&table.frames,
				|w, size| w.write_usize_as_u16(size),
				write_frame
			)
		}
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::AttributeError;
	use crate::codecs::stack_map::{compress_frame, FrameState};
	use crate::tree::stack_map::{Frame, StackMapFrame, StackMapTableAttribute, VerificationType};

	#[test]
	fn fold() {
		let mut state = FrameState::new(&[VerificationType::Integer]);

		let frame = state.apply(&StackMapFrame::Same { offset_delta: 4 });
		assert_eq!(frame, Ok(Frame { offset: 4, locals: vec![VerificationType::Integer], stack: vec![] }));

		let frame = state.apply(&StackMapFrame::Append { offset_delta: 0, locals: vec![VerificationType::Long, VerificationType::Null] });
		assert_eq!(frame, Ok(Frame {
			offset: 5,
			locals: vec![VerificationType::Integer, VerificationType::Long, VerificationType::Null],
			stack: vec![],
		}));

		let frame = state.apply(&StackMapFrame::SameLocals1StackItemExtended { offset_delta: 300, stack: VerificationType::Float });
		assert_eq!(frame.map(|frame| (frame.offset, frame.stack)), Ok((306, vec![VerificationType::Float])));

		assert!(state.apply(&StackMapFrame::Chop { k: 3, offset_delta: 0 }).is_ok());
		assert!(state.locals().is_empty());
		assert!(state.apply(&StackMapFrame::Chop { k: 1, offset_delta: 0 }).is_err());
	}

	#[test]
	fn offset_overflow() {
		let mut state = FrameState::new(&[]);
		assert!(state.apply(&StackMapFrame::SameExtended { offset_delta: u16::MAX }).is_ok());
		assert!(state.apply(&StackMapFrame::SameExtended { offset_delta: 0 }).is_err());
	}

	#[test]
	fn without_locals() {
		let mut state = FrameState::without_locals();
		assert!(state.apply(&StackMapFrame::Chop { k: 2, offset_delta: 3 }).is_ok());
		assert!(state.apply(&StackMapFrame::Append { offset_delta: 0, locals: vec![VerificationType::Integer] }).is_ok());
		assert!(state.apply(&StackMapFrame::Chop { k: 3, offset_delta: 0 }).is_ok());

		let frame = state.apply(&StackMapFrame::Full { offset_delta: 0, locals: vec![VerificationType::Float], stack: vec![] });
		assert_eq!(frame.map(|frame| frame.offset), Ok(6));
		assert!(state.apply(&StackMapFrame::Chop { k: 2, offset_delta: 0 }).is_err());

		let mut state = FrameState::without_locals();
		assert!(state.apply(&StackMapFrame::SameExtended { offset_delta: u16::MAX }).is_ok());
		assert!(state.apply(&StackMapFrame::Same { offset_delta: 0 }).is_err());
	}

	#[test]
	fn compress_chooses_smallest() {
		let locals = [VerificationType::Integer, VerificationType::Object(3)];
		let frame = |locals: &[VerificationType], stack: &[VerificationType]| Frame { offset: 0, locals: locals.to_vec(), stack: stack.to_vec() };

		assert_eq!(compress_frame(&locals, &frame(&locals, &[]), 63), StackMapFrame::Same { offset_delta: 63 });
		assert_eq!(compress_frame(&locals, &frame(&locals, &[]), 64), StackMapFrame::SameExtended { offset_delta: 64 });
		assert_eq!(
			compress_frame(&locals, &frame(&locals, &[VerificationType::Null]), 2),
			StackMapFrame::SameLocals1StackItem { offset_delta: 2, stack: VerificationType::Null }
		);
		assert_eq!(
			compress_frame(&locals, &frame(&locals, &[VerificationType::Null]), 200),
			StackMapFrame::SameLocals1StackItemExtended { offset_delta: 200, stack: VerificationType::Null }
		);
		assert_eq!(compress_frame(&locals, &frame(&[], &[]), 1), StackMapFrame::Chop { k: 2, offset_delta: 1 });
		assert_eq!(
			compress_frame(&locals[..1], &frame(&locals, &[]), 1),
			StackMapFrame::Append { offset_delta: 1, locals: vec![VerificationType::Object(3)] }
		);
		// different locals and a stack
		assert_eq!(
			compress_frame(&locals, &frame(&[VerificationType::Float], &[VerificationType::Float]), 7),
			StackMapFrame::Full { offset_delta: 7, locals: vec![VerificationType::Float], stack: vec![VerificationType::Float] }
		);
		// too many appended locals
		assert!(matches!(
			compress_frame(&[], &frame(&[VerificationType::Integer; 4], &[]), 0),
			StackMapFrame::Full { .. }
		));
	}

	#[test]
	fn expand_compress() -> Result<()> {
		let initial = [VerificationType::UninitializedThis];
		let frames = vec![
			Frame { offset: 3, locals: vec![VerificationType::Integer], stack: vec![] },
			Frame { offset: 9, locals: vec![VerificationType::Integer, VerificationType::Double], stack: vec![] },
			Frame { offset: 10, locals: vec![VerificationType::Integer, VerificationType::Double], stack: vec![VerificationType::Object(1)] },
		];

		let table = StackMapTableAttribute::compress(&initial, &frames)?;
		assert_eq!(table.frames, vec![
			StackMapFrame::Full { offset_delta: 3, locals: vec![VerificationType::Integer], stack: vec![] },
			StackMapFrame::Append { offset_delta: 5, locals: vec![VerificationType::Double] },
			StackMapFrame::SameLocals1StackItem { offset_delta: 0, stack: VerificationType::Object(1) },
		]);
		assert_eq!(table.expand(&initial)?, frames);
		Ok(())
	}

	#[test]
	fn compress_rejects_unordered() {
		let frames = [
			Frame { offset: 3, locals: vec![], stack: vec![] },
			Frame { offset: 3, locals: vec![], stack: vec![] },
		];
		let error = StackMapTableAttribute::compress(&[], &frames).unwrap_err();
		assert!(error.downcast_ref::<AttributeError>().is_some_and(AttributeError::is_programming_error));
	}

	#[test]
	fn expand_reports_invalid() {
		let table = StackMapTableAttribute { frames: vec![StackMapFrame::Chop { k: 1, offset_delta: 0 }] };
		let error = table.expand(&[]).unwrap_err();
		assert!(matches!(error.downcast_ref::<AttributeError>(), Some(AttributeError::InvalidValue { attribute: "StackMapTable", .. })));
	}
}
