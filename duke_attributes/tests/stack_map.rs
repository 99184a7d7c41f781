use anyhow::Result;
use pretty_assertions::assert_eq;
use duke_attributes::{AttributeCodec, AttributeError, DecodeContext, Pool};
use duke_attributes::codecs::{FrameState, STACK_MAP_TABLE};
use duke_attributes::tree::Attribute;
use duke_attributes::tree::stack_map::{Frame, StackMapFrame, StackMapTableAttribute, VerificationType};

fn decode(bytes: &[u8], initial_locals: &[VerificationType]) -> Result<StackMapTableAttribute> {
	let pool = Pool::new();
	let codec: &'static dyn AttributeCodec = &STACK_MAP_TABLE;
	let context = DecodeContext::new(bytes, &pool).with_initial_locals(initial_locals);
	match codec.decode(context, 0, u32::try_from(bytes.len())?)?.into_value()? {
		Attribute::StackMapTable(table) => Ok(table),
		other => panic!("expected a StackMapTable, got {other:?}"),
	}
}

#[test]
fn full_chop_same() -> Result<()> {
	let bytes = [
		0x00, 0x03,
		// full, two int locals, empty stack
		0xff, 0x00, 0x00, 0x00, 0x02, 0x01, 0x01, 0x00, 0x00,
		// chop 1
		0xfa, 0x00, 0x05,
		// same
		0x03,
	];
	let table = decode(&bytes, &[])?;
	assert_eq!(table.frames, vec![
		StackMapFrame::Full { offset_delta: 0, locals: vec![VerificationType::Integer; 2], stack: Vec::new() },
		StackMapFrame::Chop { k: 1, offset_delta: 5 },
		StackMapFrame::Same { offset_delta: 3 },
	]);

	let frames = table.expand(&[])?;
	let offsets: Vec<u16> = frames.iter().map(|frame| frame.offset).collect();
	assert_eq!(offsets, vec![0, 6, 10]);
	assert_eq!(frames.last().map(|frame| frame.locals.len()), Some(1));
	Ok(())
}

#[test]
fn offsets_increase() -> Result<()> {
	let initial = [VerificationType::UninitializedThis, VerificationType::Integer];
	let table = StackMapTableAttribute {
		frames: vec![
			StackMapFrame::Same { offset_delta: 0 },
			StackMapFrame::Same { offset_delta: 0 },
			StackMapFrame::Append { offset_delta: 12, locals: vec![VerificationType::Object(1)] },
			StackMapFrame::SameLocals1StackItemExtended { offset_delta: 1000, stack: VerificationType::Long },
			StackMapFrame::Chop { k: 3, offset_delta: 0 },
		],
	};

	let frames = table.expand(&initial)?;
	assert!(frames.windows(2).all(|pair| pair[0].offset < pair[1].offset));
	assert_eq!(frames.last().map(|frame| frame.locals.as_slice()), Some(&[][..]));
	Ok(())
}

#[test]
fn compress_expand() -> Result<()> {
	let initial = [VerificationType::Object(1)];
	let frames = vec![
		Frame { offset: 0, locals: vec![VerificationType::Object(1)], stack: vec![VerificationType::Integer] },
		Frame { offset: 80, locals: vec![VerificationType::Object(1), VerificationType::Float], stack: Vec::new() },
		Frame { offset: 81, locals: Vec::new(), stack: Vec::new() },
		Frame { offset: 90, locals: vec![VerificationType::Double; 4], stack: Vec::new() },
	];

	let table = StackMapTableAttribute::compress(&initial, &frames)?;
	assert_eq!(table.frames, vec![
		StackMapFrame::SameLocals1StackItem { offset_delta: 0, stack: VerificationType::Integer },
		StackMapFrame::Append { offset_delta: 79, locals: vec![VerificationType::Float] },
		StackMapFrame::Chop { k: 2, offset_delta: 0 },
		StackMapFrame::Full { offset_delta: 8, locals: vec![VerificationType::Double; 4], stack: Vec::new() },
	]);
	assert_eq!(table.expand(&initial)?, frames);

	let mut state = FrameState::new(&initial);
	for (frame, expected) in table.frames.iter().zip(&frames) {
		assert_eq!(state.apply(frame).as_ref(), Ok(expected));
	}
	Ok(())
}

#[test]
fn chop_too_many() {
	let bytes = [0x00, 0x01, 0xfa, 0x00, 0x00];
	let error = decode(&bytes, &[]).unwrap_err();
	assert!(matches!(
		error.downcast_ref::<AttributeError>(),
		Some(AttributeError::Malformed { attribute: "StackMapTable", offset: 2, .. })
	));

	// with a local to chop the same frame is fine
	assert!(decode(&bytes, &[VerificationType::Integer]).is_ok());
}

#[test]
fn reserved_frame_type() {
	let bytes = [0x00, 0x01, 0x80];
	let error = decode(&bytes, &[]).unwrap_err();
	assert!(error.downcast_ref::<AttributeError>().is_some_and(AttributeError::is_malformed));
}

#[test]
fn object_outside_pool() {
	// same_locals_1_stack_item with an Object(5), the pool is empty
	let bytes = [0x00, 0x01, 0x40, 0x07, 0x00, 0x05];
	let error = decode(&bytes, &[]).unwrap_err();
	assert!(matches!(
		error.downcast_ref::<AttributeError>(),
		Some(AttributeError::Malformed { offset: 4, .. })
	));
}

#[test]
fn unknown_verification_type() {
	let bytes = [0x00, 0x01, 0x40, 0x09];
	assert!(decode(&bytes, &[]).is_err());
}

fn decode_without_locals(bytes: &[u8]) -> Result<StackMapTableAttribute> {
	let pool = Pool::new();
	let codec: &'static dyn AttributeCodec = &STACK_MAP_TABLE;
	match codec.decode(DecodeContext::new(bytes, &pool), 0, u32::try_from(bytes.len())?)?.into_value()? {
		Attribute::StackMapTable(table) => Ok(table),
		other => panic!("expected a StackMapTable, got {other:?}"),
	}
}

#[test]
fn offset_overflow_without_locals() {
	// the second frame would be at 65536
	let bytes = [0x00, 0x02, 0xfb, 0xff, 0xff, 0xfb, 0x00, 0x00];
	let error = decode_without_locals(&bytes).unwrap_err();
	assert!(matches!(
		error.downcast_ref::<AttributeError>(),
		Some(AttributeError::Malformed { attribute: "StackMapTable", offset: 5, .. })
	));
}

#[test]
fn chop_after_full_without_locals() -> Result<()> {
	// nothing is known about the locals before the full frame
	let table = decode_without_locals(&[0x00, 0x01, 0xfa, 0x00, 0x00])?;
	assert_eq!(table.frames, vec![StackMapFrame::Chop { k: 1, offset_delta: 0 }]);

	// full with one int local, then chop 2
	let bytes = [
		0x00, 0x02,
		0xff, 0x00, 0x00, 0x00, 0x01, 0x01, 0x00, 0x00,
		0xf9, 0x00, 0x00,
	];
	let error = decode_without_locals(&bytes).unwrap_err();
	assert!(matches!(
		error.downcast_ref::<AttributeError>(),
		Some(AttributeError::Malformed { attribute: "StackMapTable", offset: 10, .. })
	));
	Ok(())
}
