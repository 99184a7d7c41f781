use anyhow::{anyhow, Context, Result};
use java_string::JavaStr;
use log::debug;
use crate::{registry, AttributeCodec, AttributeError, BoundAttribute, ClassReader, ClassWrite, DecodeContext};
use crate::class_constants::attribute;
use crate::codec::read_body;
use crate::tree::{Attribute, AttributeInfo};

const ATTRIBUTE_INFO: &str = "attribute_info";

/// An attribute of a class, field, method or `Code` attribute, as read from a class file.
#[derive(Debug, Clone)]
pub enum ClassAttribute<'a> {
	/// An attribute with a codec in the [`registry()`](crate::registry()).
	Standard {
		name_index: u16,
		attribute: BoundAttribute<'a>,
	},
	/// An attribute nobody here knows, kept as bytes.
	Custom(CustomAttribute<'a>),
}

/// The raw bytes of an attribute without a codec.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CustomAttribute<'a> {
	pub name_index: u16,
	pub name: &'a JavaStr,
	pub bytes: &'a [u8],
	/// The position of the body in the class file.
	pub position: usize,
}

impl<'a> ClassAttribute<'a> {
	pub fn name_index(&self) -> u16 {
		match self {
			ClassAttribute::Standard { name_index, .. } => *name_index,
			ClassAttribute::Custom(custom) => custom.name_index,
		}
	}

	/// The raw bytes of the body.
	pub fn body(&self) -> &'a [u8] {
		match self {
			ClassAttribute::Standard { attribute, .. } => attribute.body(),
			ClassAttribute::Custom(custom) => custom.bytes,
		}
	}

	/// The position in the class file just after this attribute.
	pub fn end(&self) -> usize {
		match self {
			ClassAttribute::Standard { attribute, .. } => attribute.position() + attribute.len(),
			ClassAttribute::Custom(custom) => custom.position + custom.bytes.len(),
		}
	}

	/// Writes the attribute exactly as it was read, header included.
	///
	/// The name index is kept, so the constant pool written must be the one read.
	pub fn write_to(&self, writer: &mut impl ClassWrite) -> Result<()> {
		let body = self.body();
		writer.write_u16(self.name_index())?;
		writer.write_usize_as_u32(body.len())?;
		writer.write_u8_slice(body)
	}
}

fn attribute_name<'a>(context: &DecodeContext<'a>, name_index: u16, position: usize) -> Result<&'a JavaStr> {
	context.pool().get_utf8(name_index)
		.map_err(|error| AttributeError::malformed(ATTRIBUTE_INFO, position,
			format!("attribute name index {name_index} doesn't point to a CONSTANT_Utf8_info: {error}")
		).into())
}

/// Reads one `attribute_info` starting at `position`.
///
/// Attributes without a codec are returned as [`ClassAttribute::Custom`], this is never an error.
pub fn read_attribute<'a>(context: DecodeContext<'a>, position: usize) -> Result<ClassAttribute<'a>> {
	let mut reader = ClassReader::new(context.bytes(), position, 6, ATTRIBUTE_INFO)?;
	let name_index = reader.read_index(context.pool())?;
	let length = reader.read_u32()?;
	let body_position = reader.position();

	let name = attribute_name(&context, name_index, position)?;

	if let Some(codec) = registry().resolve(name) {
		let attribute = codec.decode(context, body_position, length)
			.with_context(|| anyhow!("failed to decode attribute {name:?} at {position}"))?;
		Ok(ClassAttribute::Standard { name_index, attribute })
	} else {
		let bytes = ClassReader::new(context.bytes(), body_position, length as usize, ATTRIBUTE_INFO)?
			.read_slice(length as usize)?;

		debug!("copying through unknown attribute {name:?} of {length} bytes at {position}");

		Ok(ClassAttribute::Custom(CustomAttribute { name_index, name, bytes, position: body_position }))
	}
}

/// Reads an `attributes_count` followed by that many `attribute_info`s.
///
/// Returns the attributes and the position just after the last one.
pub fn read_attributes<'a>(context: DecodeContext<'a>, position: usize) -> Result<(Vec<ClassAttribute<'a>>, usize)> {
	let mut reader = ClassReader::new(context.bytes(), position, 2, ATTRIBUTE_INFO)?;
	let count = reader.read_u16()?;

	let mut end = reader.position();
	let mut attributes = Vec::with_capacity(count.into());
	for i in 0..count {
		let attribute = read_attribute(context, end)
			.with_context(|| anyhow!("failed to read attribute {i} of {count}"))?;
		end = attribute.end();
		attributes.push(attribute);
	}

	Ok((attributes, end))
}

/// Writes an `attribute_info`, with the length computed from the encoded body.
///
/// The body of an [`Attribute::Unknown`] is written as is.
pub fn write_attribute(writer: &mut impl ClassWrite, name_index: u16, attribute: &Attribute) -> Result<()> {
	let mut body = Vec::new();
	match attribute {
		Attribute::Unknown(bytes) => body.extend_from_slice(bytes),
		attribute => {
			let codec = attribute.codec()
				.with_context(|| anyhow!("no codec for the {} attribute", attribute.name()))?;
			codec.encode(&mut body, attribute)?;
		},
	}

	let length = u32::try_from(body.len())
		.map_err(|_| AttributeError::invalid(attribute.name(), format!("a body of {} bytes is too long", body.len())))?;

	writer.write_u16(name_index)?;
	writer.write_u32(length)?;
	writer.write_u8_slice(&body)
}

/// Whether the attribute has attribute tables of its own. These only appear at the top level.
fn holds_attributes(codec: &dyn AttributeCodec) -> bool {
	matches!(codec.descriptor().name, attribute::CODE | attribute::RECORD)
}

/// Reads the nested attribute table of a `Code` attribute or a record component, materializing every attribute.
///
/// A nested table never contains attributes with tables of their own, so this doesn't recurse further.
pub(crate) fn read_attribute_infos(context: &DecodeContext<'_>, reader: &mut ClassReader<'_>) -> Result<Vec<AttributeInfo>> {
	let pool = context.pool();
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| {
			let start = r.position();
			let name_index = r.read_index(pool)?;
			let length = r.read_u32_as_usize()?;
			let position = r.position();
			let body = r.read_slice(length)?;

			let name = attribute_name(context, name_index, start)?;
			let attribute = match registry().resolve(name) {
				Some(codec) if holds_attributes(codec) => {
					return Err(AttributeError::malformed(r.attribute(), start,
						format!("a {} attribute can't be nested in another attribute", codec.name())
					).into());
				},
				Some(codec) => read_body(codec, context, position, length)?,
				None => {
					debug!("keeping unknown nested attribute {name:?} of {length} bytes at {start}");
					Attribute::Unknown(body.to_vec())
				},
			};

			Ok(AttributeInfo { name_index, attribute })
		}
	)
}

pub(crate) fn write_attribute_infos(writer: &mut Vec<u8>, attributes: &[AttributeInfo]) -> Result<()> {
	writer.write_slice(attributes,
		|w, size| w.write_usize_as_u16(size),
		|w, info| {
			if let Attribute::Code(_) | Attribute::Record(_) = info.attribute {
				return Err(AttributeError::invalid(info.attribute.name(), "can't be nested in another attribute").into());
			}
			write_attribute(w, info.name_index, &info.attribute)
		}
	)
}
