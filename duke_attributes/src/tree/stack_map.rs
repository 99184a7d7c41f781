//! The frames of the `StackMapTable` attribute.
//!
//! [`StackMapFrame`] is the form stored in the class file: each frame is described by the difference to the
//! previous one. [`Frame`] is the absolute form. See [`StackMapTableAttribute::expand`] and
//! [`StackMapTableAttribute::compress`] for converting between the two.

/// The type of a local variable or stack slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VerificationType {
	Top,
	Integer,
	Float,
	Double,
	Long,
	Null,
	UninitializedThis,
	/// Index of a `CONSTANT_Class_info`.
	Object(u16),
	/// The bytecode offset of the `new` instruction creating the object.
	Uninitialized(u16),
}

/// A frame as stored in the class file.
///
/// The bytecode offset of the frame is `previous_offset + 1 + offset_delta`, where `previous_offset` is `-1` for the
/// first frame.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackMapFrame {
	/// Same locals, empty stack. `offset_delta` is at most `63`.
	Same { offset_delta: u8 },
	/// Same locals, one stack item. `offset_delta` is at most `63`.
	SameLocals1StackItem { offset_delta: u8, stack: VerificationType },
	SameLocals1StackItemExtended { offset_delta: u16, stack: VerificationType },
	/// The last `k` locals are removed, empty stack. `k` is between `1` and `3`.
	Chop { k: u8, offset_delta: u16 },
	SameExtended { offset_delta: u16 },
	/// One to three locals are added, empty stack.
	Append { offset_delta: u16, locals: Vec<VerificationType> },
	Full { offset_delta: u16, locals: Vec<VerificationType>, stack: Vec<VerificationType> },
}

impl StackMapFrame {
	pub fn offset_delta(&self) -> u16 {
		match *self {
			StackMapFrame::Same { offset_delta } => offset_delta.into(),
			StackMapFrame::SameLocals1StackItem { offset_delta, .. } => offset_delta.into(),
			StackMapFrame::SameLocals1StackItemExtended { offset_delta, .. } => offset_delta,
			StackMapFrame::Chop { offset_delta, .. } => offset_delta,
			StackMapFrame::SameExtended { offset_delta } => offset_delta,
			StackMapFrame::Append { offset_delta, .. } => offset_delta,
			StackMapFrame::Full { offset_delta, .. } => offset_delta,
		}
	}
}

/// A frame with its absolute bytecode offset and the complete locals and stack.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
	pub offset: u16,
	pub locals: Vec<VerificationType>,
	pub stack: Vec<VerificationType>,
}

/// The contents of the `StackMapTable` attribute.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StackMapTableAttribute {
	pub frames: Vec<StackMapFrame>,
}
