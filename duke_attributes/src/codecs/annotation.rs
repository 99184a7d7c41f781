use anyhow::Result;
use crate::class_constants::{attribute, element_value};
use crate::macros::codec;
use crate::{BodyLayout, ClassReader, ClassWrite, ConstantPool, Version};
use crate::tree::Attribute;
use crate::tree::annotation::{Annotation, ElementValue, ElementValuePair};

/// Element values nested deeper than this are rejected.
pub(crate) const MAX_ELEMENT_VALUE_DEPTH: usize = 256;

pub(super) fn read_annotations(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<Vec<Annotation>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| read_annotation(r, pool, 0)
	)
}

pub(super) fn read_annotation(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool, depth: usize) -> Result<Annotation> {
	Ok(Annotation {
		type_index: reader.read_index(pool)?,
		element_value_pairs: reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(ElementValuePair {
				name_index: r.read_index(pool)?,
				value: read_element_value(r, pool, depth + 1)?,
			})
		)?,
	})
}

fn read_element_value(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool, depth: usize) -> Result<ElementValue> {
	if depth > MAX_ELEMENT_VALUE_DEPTH {
		return Err(reader.malformed(format!("element values nested deeper than {MAX_ELEMENT_VALUE_DEPTH} levels")));
	}

	Ok(match reader.read_u8()? {
		element_value::BYTE => ElementValue::Byte(reader.read_index(pool)?),
		element_value::CHAR => ElementValue::Char(reader.read_index(pool)?),
		element_value::DOUBLE => ElementValue::Double(reader.read_index(pool)?),
		element_value::FLOAT => ElementValue::Float(reader.read_index(pool)?),
		element_value::INT => ElementValue::Int(reader.read_index(pool)?),
		element_value::LONG => ElementValue::Long(reader.read_index(pool)?),
		element_value::SHORT => ElementValue::Short(reader.read_index(pool)?),
		element_value::BOOLEAN => ElementValue::Boolean(reader.read_index(pool)?),
		element_value::STRING => ElementValue::String(reader.read_index(pool)?),
		element_value::ENUM => ElementValue::Enum {
			type_name_index: reader.read_index(pool)?,
			const_name_index: reader.read_index(pool)?,
		},
		element_value::CLASS => ElementValue::Class(reader.read_index(pool)?),
		element_value::ANNOTATION => ElementValue::Annotation(read_annotation(reader, pool, depth)?),
		element_value::ARRAY => ElementValue::Array(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| read_element_value(r, pool, depth + 1)
		)?),
		tag => return Err(reader.malformed(format!("unknown element_value tag {tag:?}"))),
	})
}

pub(super) fn write_annotations(writer: &mut Vec<u8>, annotations: &[Annotation]) -> Result<()> {
	writer.write_slice(annotations,
		|w, size| w.write_usize_as_u16(size),
		write_annotation
	)
}

pub(super) fn write_annotation(writer: &mut Vec<u8>, annotation: &Annotation) -> Result<()> {
	writer.write_u16(annotation.type_index)?;
	writer.write_slice(&annotation.element_value_pairs,
		|w, size| w.write_usize_as_u16(size),
		|w, pair| {
			w.write_u16(pair.name_index)?;
			write_element_value(w, &pair.value)
		}
	)
}

fn write_element_value(writer: &mut Vec<u8>, value: &ElementValue) -> Result<()> {
	writer.write_u8(value.tag())?;
	match value {
		ElementValue::Byte(index) |
		ElementValue::Char(index) |
		ElementValue::Double(index) |
		ElementValue::Float(index) |
		ElementValue::Int(index) |
		ElementValue::Long(index) |
		ElementValue::Short(index) |
		ElementValue::Boolean(index) |
		ElementValue::String(index) |
		ElementValue::Class(index) => writer.write_u16(*index),
		ElementValue::Enum { type_name_index, const_name_index } => {
			writer.write_u16(*type_name_index)?;
			writer.write_u16(*const_name_index)
		},
		ElementValue::Annotation(annotation) => write_annotation(writer, annotation),
		ElementValue::Array(values) => {
			writer.write_slice(values,
				|w, size| w.write_usize_as_u16(size),
				write_element_value
			)
		},
	}
}

fn read_parameter_annotations(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<Vec<Vec<Annotation>>> {
	reader.read_vec(
		|r| r.read_u8_as_usize(),
		|r| read_annotations(r, pool)
	)
}

fn write_parameter_annotations(writer: &mut Vec<u8>, parameters: &[Vec<Annotation>]) -> Result<()> {
	writer.write_slice(parameters,
		|w, size| w.write_usize_as_u8(size),
		|w, annotations| write_annotations(w, annotations)
	)
}

codec! {
	/// The default value of an annotation interface element.
	AnnotationDefaultCodec = ANNOTATION_DEFAULT (attribute::ANNOTATION_DEFAULT, Version::V1_5, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::AnnotationDefault(read_element_value(reader, context.pool(), 1)?))
		}
		write(writer, Attribute::AnnotationDefault(value)) {
			write_element_value(writer, value)
		}
	}
}

codec! {
	RuntimeInvisibleAnnotationsCodec = RUNTIME_INVISIBLE_ANNOTATIONS (attribute::RUNTIME_INVISIBLE_ANNOTATIONS, Version::V1_5, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::RuntimeInvisibleAnnotations(read_annotations(reader, context.pool())?))
		}
		write(writer, Attribute::RuntimeInvisibleAnnotations(annotations)) {
			write_annotations(writer, annotations)
		}
	}
}

codec! {
	RuntimeInvisibleParameterAnnotationsCodec = RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS (attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS, Version::V1_5, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::RuntimeInvisibleParameterAnnotations(read_parameter_annotations(reader, context.pool())?))
		}
		write(writer, Attribute::RuntimeInvisibleParameterAnnotations(parameters)) {
			write_parameter_annotations(writer, parameters)
		}
	}
}

codec! {
	RuntimeVisibleAnnotationsCodec = RUNTIME_VISIBLE_ANNOTATIONS (attribute::RUNTIME_VISIBLE_ANNOTATIONS, Version::V1_5, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::RuntimeVisibleAnnotations(read_annotations(reader, context.pool())?))
		}
		write(writer, Attribute::RuntimeVisibleAnnotations(annotations)) {
			write_annotations(writer, annotations)
		}
	}
}

codec! {
	/// Annotations of the formal parameters. The outer count is an `u1`.
	RuntimeVisibleParameterAnnotationsCodec = RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS (attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS, Version::V1_5, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::RuntimeVisibleParameterAnnotations(read_parameter_annotations(reader, context.pool())?))
		}
		write(writer, Attribute::RuntimeVisibleParameterAnnotations(parameters)) {
			write_parameter_annotations(writer, parameters)
		}
	}
}
