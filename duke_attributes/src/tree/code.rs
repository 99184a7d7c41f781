use std::num::NonZeroU16;
use crate::tree::AttributeInfo;

/// The contents of the `Code` attribute.
///
/// The bytecode isn't disassembled.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CodeAttribute {
	pub max_stack: u16,
	pub max_locals: u16,
	/// Between `1` and `65535` bytes.
	pub code: Vec<u8>,
	pub exception_table: Vec<ExceptionHandler>,
	pub attributes: Vec<AttributeInfo>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ExceptionHandler {
	pub start: u16,
	pub end: u16,
	pub handler: u16,
	/// Absent for handlers catching everything, like the ones of `finally` blocks.
	pub catch_type: Option<NonZeroU16>,
}
