use crate::attributes::read_attribute_infos;
use crate::class_constants::attribute;
use crate::macros::codec;
use crate::{BodyLayout, Version};
use crate::tree::Attribute;
use crate::tree::code::{CodeAttribute, ExceptionHandler};

codec! {
	/// The bytecode of a method, with its exception table and attributes.
	///
	/// There is no encoder: the body depends on the bytecode and the frames computed with it, so the
	/// class writer has to produce it.
	CodeCodec = CODE (attribute::CODE, Version::V1_0, false, BodyLayout::Variable) {
		read(context, reader) {
			let pool = context.pool();

			let max_stack = reader.read_u16()?;
			let max_locals = reader.read_u16()?;

			let code_length = reader.read_u32()?;
			if code_length == 0 || code_length > u16::MAX.into() {
				return Err(reader.malformed(format!("code length must be between 1 and 65535, got {code_length}")));
			}
			let code = reader.read_slice(code_length as usize)?.to_vec();

			let exception_table = reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(ExceptionHandler {
					start: r.read_u16()?,
					end: r.read_u16()?,
					handler: r.read_u16()?,
					catch_type: r.read_optional_index(pool)?,
				})
			)?;

			let attributes = read_attribute_infos(context, reader)?;

			Ok(Attribute::Code(CodeAttribute { max_stack, max_locals, code, exception_table, attributes }))
		}
	}
}
