use std::fmt::{Debug, Formatter};
use std::marker::PhantomData;
use std::num::NonZeroU16;
use std::sync::OnceLock;
use anyhow::{Context, Result};
use log::trace;
use crate::{AttributeCodec, AttributeError, BodyLayout, DecodeContext};
use crate::class_constants::attribute;
use crate::codec::read_body;
use crate::descriptor::AttributeDescriptor;
use crate::tree::{Attribute, CharacterRange, InnerClass, LineNumber, LocalVariable, LocalVariableType, MethodParameter};

/// An attribute body located in the bytes of a class file, together with the codec for it.
///
/// The length was checked against the [layout](AttributeCodec::layout) of the codec when this was created. The
/// [`Attribute`] value is only materialized when [`BoundAttribute::value`] is first called, except for
/// [`BodyLayout::Variable`] bodies, which are parsed right away.
#[derive(Clone)]
pub struct BoundAttribute<'a> {
	codec: &'static dyn AttributeCodec,
	context: DecodeContext<'a>,
	position: usize,
	length: usize,
	value: OnceLock<Attribute>,
}

impl<'a> BoundAttribute<'a> {
	pub(crate) fn new(codec: &'static dyn AttributeCodec, context: DecodeContext<'a>, position: usize, length: u32) -> Result<BoundAttribute<'a>> {
		let name = codec.name();
		let length = length as usize;

		if position.checked_add(length).map_or(true, |end| end > context.bytes().len()) {
			return Err(AttributeError::malformed(name, position,
				format!("body of {length} bytes doesn't fit into the {} bytes of the class file", context.bytes().len())
			).into());
		}

		let value = OnceLock::new();
		match codec.layout() {
			BodyLayout::Fixed(expected) => {
				if length != expected {
					return Err(AttributeError::malformed(name, position,
						format!("expected a body of {expected} bytes, got {length}")
					).into());
				}
			},
			BodyLayout::Table { count_width, record_size } => {
				let count_width = usize::from(count_width);
				let count = context.bytes().get(position..position + count_width.min(length))
					.filter(|count| count.len() == count_width)
					.map(|count| count.iter().fold(0usize, |acc, &byte| acc << 8 | usize::from(byte)))
					.ok_or_else(|| AttributeError::malformed(name, position,
						format!("expected a count of {count_width} bytes, but the body only has {length}")
					))?;

				let expected = count_width + count * record_size;
				if length != expected {
					return Err(AttributeError::malformed(name, position,
						format!("a table of {count} entries of {record_size} bytes needs {expected} bytes, got {length}")
					).into());
				}
			},
			BodyLayout::Blob => {},
			BodyLayout::Variable => {
				let attribute = read_body(codec, &context, position, length)?;
				// a fresh lock, can't fail
				let _ = value.set(attribute);
			},
		}

		trace!("bound {name} attribute of {length} bytes at {position}");

		Ok(BoundAttribute { codec, context, position, length, value })
	}

	/// Gets the materialized value, parsing the body on the first call.
	///
	/// If this is called concurrently for the first time, the body may be parsed more than once.
	pub fn value(&self) -> Result<&Attribute> {
		if let Some(value) = self.value.get() {
			return Ok(value);
		}
		let attribute = read_body(self.codec, &self.context, self.position, self.length)
			.with_context(|| format!("failed to read {} attribute at {}", self.name(), self.position))?;
		Ok(self.value.get_or_init(|| attribute))
	}

	pub fn into_value(self) -> Result<Attribute> {
		self.value()?;
		self.value.into_inner()
			.with_context(|| format!("the {} attribute at {} has no value", self.codec.name(), self.position))
	}

	/// The raw bytes of the body, without the `attribute_info` header.
	pub fn body(&self) -> &'a [u8] {
		// checked in new
		&self.context.bytes()[self.position..self.position + self.length]
	}

	pub fn codec(&self) -> &'static dyn AttributeCodec {
		self.codec
	}

	pub fn descriptor(&self) -> &'static AttributeDescriptor {
		self.codec.descriptor()
	}

	pub fn name(&self) -> &'static str {
		self.codec.name()
	}

	/// The position of the body in the class file.
	pub fn position(&self) -> usize {
		self.position
	}

	pub fn len(&self) -> usize {
		self.length
	}

	pub fn is_empty(&self) -> bool {
		self.length == 0
	}

	/// Gives access to the records of a table attribute, without materializing the entire [`Attribute`].
	///
	/// The records are read as they are, constant pool indices in them are not checked.
	pub fn table<T: TableEntry>(&self) -> Result<BoundTable<'a, T>> {
		let name = self.name();
		match self.codec.layout() {
			BodyLayout::Table { count_width, record_size } if record_size == T::SIZE && T::accepts(name) => {
				let records = &self.body()[usize::from(count_width)..];
				Ok(BoundTable { records, phantom: PhantomData })
			},
			_ => Err(AttributeError::WrongVariant { expected: std::any::type_name::<T>(), found: name }.into()),
		}
	}
}

impl Debug for BoundAttribute<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("BoundAttribute")
			.field("name", &self.name())
			.field("position", &self.position)
			.field("length", &self.length)
			.field("value", &self.value.get())
			.finish()
	}
}

/// A record of a table attribute, read from a fixed number of bytes.
pub trait TableEntry: Sized {
	const SIZE: usize;

	/// Whether the records of the attribute with this name are of this type.
	fn accepts(name: &str) -> bool;

	/// Reads the record from exactly [`TableEntry::SIZE`] bytes.
	fn read_entry(bytes: &[u8]) -> Self;
}

/// The records of a table attribute, still in the bytes of the class file.
#[derive(Debug, Clone, Copy)]
pub struct BoundTable<'a, T> {
	records: &'a [u8],
	phantom: PhantomData<fn() -> T>,
}

impl<'a, T: TableEntry> BoundTable<'a, T> {
	pub fn len(&self) -> usize {
		self.records.len() / T::SIZE
	}

	pub fn is_empty(&self) -> bool {
		self.records.is_empty()
	}

	pub fn get(&self, index: usize) -> Option<T> {
		let start = index.checked_mul(T::SIZE)?;
		self.records.get(start..start.checked_add(T::SIZE)?).map(T::read_entry)
	}

	pub fn iter(&self) -> impl Iterator<Item=T> + 'a where T: 'a {
		self.records.chunks_exact(T::SIZE).map(T::read_entry)
	}
}

fn u16_at(bytes: &[u8], at: usize) -> u16 {
	u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

fn i32_at(bytes: &[u8], at: usize) -> i32 {
	i32::from_be_bytes([bytes[at], bytes[at + 1], bytes[at + 2], bytes[at + 3]])
}

impl TableEntry for u16 {
	const SIZE: usize = 2;

	fn accepts(name: &str) -> bool {
		matches!(name, attribute::EXCEPTIONS | attribute::NEST_MEMBERS | attribute::MODULE_PACKAGES | attribute::PERMITTED_SUBCLASSES)
	}

	fn read_entry(bytes: &[u8]) -> u16 {
		u16_at(bytes, 0)
	}
}

impl TableEntry for LineNumber {
	const SIZE: usize = 4;

	fn accepts(name: &str) -> bool {
		name == attribute::LINE_NUMBER_TABLE
	}

	fn read_entry(bytes: &[u8]) -> LineNumber {
		LineNumber { start: u16_at(bytes, 0), line: u16_at(bytes, 2) }
	}
}

impl TableEntry for LocalVariable {
	const SIZE: usize = 10;

	fn accepts(name: &str) -> bool {
		name == attribute::LOCAL_VARIABLE_TABLE
	}

	fn read_entry(bytes: &[u8]) -> LocalVariable {
		LocalVariable {
			start: u16_at(bytes, 0),
			length: u16_at(bytes, 2),
			name_index: u16_at(bytes, 4),
			descriptor_index: u16_at(bytes, 6),
			index: u16_at(bytes, 8),
		}
	}
}

impl TableEntry for LocalVariableType {
	const SIZE: usize = 10;

	fn accepts(name: &str) -> bool {
		name == attribute::LOCAL_VARIABLE_TYPE_TABLE
	}

	fn read_entry(bytes: &[u8]) -> LocalVariableType {
		LocalVariableType {
			start: u16_at(bytes, 0),
			length: u16_at(bytes, 2),
			name_index: u16_at(bytes, 4),
			signature_index: u16_at(bytes, 6),
			index: u16_at(bytes, 8),
		}
	}
}

impl TableEntry for InnerClass {
	const SIZE: usize = 8;

	fn accepts(name: &str) -> bool {
		name == attribute::INNER_CLASSES
	}

	fn read_entry(bytes: &[u8]) -> InnerClass {
		InnerClass {
			inner_class: u16_at(bytes, 0),
			outer_class: NonZeroU16::new(u16_at(bytes, 2)),
			inner_name: NonZeroU16::new(u16_at(bytes, 4)),
			flags: u16_at(bytes, 6),
		}
	}
}

impl TableEntry for MethodParameter {
	const SIZE: usize = 4;

	fn accepts(name: &str) -> bool {
		name == attribute::METHOD_PARAMETERS
	}

	fn read_entry(bytes: &[u8]) -> MethodParameter {
		MethodParameter { name: NonZeroU16::new(u16_at(bytes, 0)), flags: u16_at(bytes, 2) }
	}
}

impl TableEntry for CharacterRange {
	const SIZE: usize = 14;

	fn accepts(name: &str) -> bool {
		name == attribute::CHARACTER_RANGE_TABLE
	}

	fn read_entry(bytes: &[u8]) -> CharacterRange {
		CharacterRange {
			start_pc: u16_at(bytes, 0),
			end_pc: u16_at(bytes, 2),
			range_start: i32_at(bytes, 4),
			range_end: i32_at(bytes, 8),
			flags: u16_at(bytes, 12),
		}
	}
}

#[cfg(test)]
mod testing {
	use std::num::NonZeroU16;
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::{AttributeCodec, AttributeError, DecodeContext, Pool};
	use crate::codecs::{EXCEPTIONS, INNER_CLASSES, LINE_NUMBER_TABLE, SIGNATURE, SOURCE_DEBUG_EXTENSION};
	use crate::tree::{Attribute, InnerClass, LineNumber};

	fn decode<'a>(codec: &'static dyn AttributeCodec, bytes: &'a [u8], pool: &'a Pool) -> Result<crate::BoundAttribute<'a>> {
		codec.decode(DecodeContext::new(bytes, pool), 0, u32::try_from(bytes.len())?)
	}

	#[test]
	fn fixed_is_lazy() -> Result<()> {
		let pool = Pool::new();
		// index 9 isn't in the pool, but nothing is parsed yet
		let bytes = [0x00, 0x09];
		let attribute = decode(&SIGNATURE, &bytes, &pool)?;
		assert_eq!(attribute.body(), &bytes);
		assert_eq!(attribute.name(), "Signature");

		let error = attribute.value().unwrap_err();
		assert!(error.downcast_ref::<AttributeError>().is_some_and(AttributeError::is_malformed));
		Ok(())
	}

	#[test]
	fn fixed_length() {
		let pool = Pool::new();
		let bytes = [0x00, 0x01, 0x00];
		let error = decode(&SIGNATURE, &bytes, &pool).unwrap_err();
		assert_eq!(
			error.downcast_ref::<AttributeError>(),
			Some(&AttributeError::malformed("Signature", 0, "expected a body of 2 bytes, got 3"))
		);
	}

	#[test]
	fn table_length() -> Result<()> {
		let pool = Pool::new();
		assert!(decode(&LINE_NUMBER_TABLE, &[0x00, 0x01, 0x00, 0x00, 0x00], &pool).is_err());
		assert!(decode(&LINE_NUMBER_TABLE, &[0x00], &pool).is_err());
		assert_eq!(decode(&LINE_NUMBER_TABLE, &[0x00, 0x00], &pool)?.len(), 2);
		Ok(())
	}

	#[test]
	fn outside_of_class_file() -> Result<()> {
		let pool = Pool::new();
		let bytes = [0x00, 0x00];
		let codec: &'static dyn AttributeCodec = &EXCEPTIONS;
		let error = codec.decode(DecodeContext::new(&bytes, &pool), 1, 2).unwrap_err();
		assert!(matches!(error.downcast_ref::<AttributeError>(), Some(AttributeError::Malformed { offset: 1, .. })));

		let blob: &'static dyn AttributeCodec = &SOURCE_DEBUG_EXTENSION;
		assert!(blob.decode(DecodeContext::new(&bytes, &pool), 2, 0)?.is_empty());
		Ok(())
	}

	#[test]
	fn table_view() -> Result<()> {
		let mut pool = Pool::new();
		let inner = pool.put_class(JavaStr::from_str("a/B$C"))?;
		let name = pool.put_utf8(JavaStr::from_str("C"))?;

		let bytes = [
			0x00, 0x01,
			0x00, 0x02, 0x00, 0x00, 0x00, 0x03, 0x00, 0x09,
		];
		let attribute = decode(&INNER_CLASSES, &bytes, &pool)?;
		let table = attribute.table::<InnerClass>()?;
		assert_eq!(table.len(), 1);
		let expected = InnerClass { inner_class: inner, outer_class: None, inner_name: NonZeroU16::new(name), flags: 9 };
		assert_eq!(table.get(0), Some(expected));
		assert_eq!(table.get(1), None);
		assert_eq!(attribute.value()?, &Attribute::InnerClasses(vec![expected]));

		let error = attribute.table::<LineNumber>().unwrap_err();
		assert!(matches!(error.downcast_ref::<AttributeError>(), Some(AttributeError::WrongVariant { found: "InnerClasses", .. })));
		Ok(())
	}

	#[test]
	fn u16_table() -> Result<()> {
		let pool = Pool::new();
		let bytes = [0x00, 0x02, 0x00, 0x07, 0x00, 0x08];
		let attribute = decode(&EXCEPTIONS, &bytes, &pool)?;
		assert_eq!(attribute.table::<u16>()?.iter().collect::<Vec<_>>(), vec![7, 8]);
		Ok(())
	}

	#[test]
	fn table_iter_outlives_attribute() -> Result<()> {
		let pool = Pool::new();
		let bytes = [0x00, 0x03, 0x00, 0x01, 0x00, 0x02, 0x00, 0x03];
		let iter = {
			let attribute = decode(&EXCEPTIONS, &bytes, &pool)?;
			let table = attribute.table::<u16>()?;
			table.iter()
		};
		assert_eq!(iter.collect::<Vec<_>>(), vec![1, 2, 3]);
		Ok(())
	}
}
