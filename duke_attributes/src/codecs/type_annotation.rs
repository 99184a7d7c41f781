use anyhow::Result;
use crate::class_constants::{attribute, type_annotation};
use crate::codecs::annotation::{read_annotation, write_annotation};
use crate::macros::codec;
use crate::{AttributeError, BodyLayout, ClassReader, ClassWrite, ConstantPool, Version};
use crate::tree::Attribute;
use crate::tree::type_annotation::{LocalVariableTarget, TargetInfo, TypeAnnotation, TypePathEntry};

fn read_type_annotations(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<Vec<TypeAnnotation>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| {
			let target_type = r.read_u8()?;
			let target_info = read_target_info(r, target_type)?;
			let target_path = r.read_vec(
				|r| r.read_u8_as_usize(),
				|r| {
					let kind = r.read_u8()?;
					if kind > 3 {
						return Err(r.malformed(format!("type_path_kind not in range from 0 to 3, got {kind}")));
					}
					Ok(TypePathEntry { kind, argument_index: r.read_u8()? })
				}
			)?;
			let annotation = read_annotation(r, pool, 0)?;
			Ok(TypeAnnotation { target_type, target_info, target_path, annotation })
		}
	)
}

fn read_target_info(reader: &mut ClassReader<'_>, target_type: u8) -> Result<TargetInfo> {
	Ok(match target_type {
		type_annotation::CLASS_TYPE_PARAMETER |
		type_annotation::METHOD_TYPE_PARAMETER => TargetInfo::TypeParameter { index: reader.read_u8()? },
		type_annotation::CLASS_EXTENDS => TargetInfo::Supertype { index: reader.read_u16()? },
		type_annotation::CLASS_TYPE_PARAMETER_BOUND |
		type_annotation::METHOD_TYPE_PARAMETER_BOUND => TargetInfo::TypeParameterBound {
			type_parameter_index: reader.read_u8()?,
			bound_index: reader.read_u8()?,
		},
		type_annotation::FIELD |
		type_annotation::METHOD_RETURN |
		type_annotation::METHOD_RECEIVER => TargetInfo::Empty,
		type_annotation::METHOD_FORMAL_PARAMETER => TargetInfo::FormalParameter { index: reader.read_u8()? },
		type_annotation::THROWS => TargetInfo::Throws { index: reader.read_u16()? },
		type_annotation::LOCAL_VARIABLE |
		type_annotation::RESOURCE_VARIABLE => TargetInfo::LocalVariable(reader.read_vec(
			|r| r.read_u16_as_usize(),
			|r| Ok(LocalVariableTarget {
				start: r.read_u16()?,
				length: r.read_u16()?,
				index: r.read_u16()?,
			})
		)?),
		type_annotation::EXCEPTION_PARAMETER => TargetInfo::Catch { exception_table_index: reader.read_u16()? },
		type_annotation::INSTANCEOF |
		type_annotation::NEW |
		type_annotation::CONSTRUCTOR_REFERENCE |
		type_annotation::METHOD_REFERENCE => TargetInfo::Offset { offset: reader.read_u16()? },
		type_annotation::CAST |
		type_annotation::CONSTRUCTOR_INVOCATION_TYPE_ARGUMENT |
		type_annotation::METHOD_INVOCATION_TYPE_ARGUMENT |
		type_annotation::CONSTRUCTOR_REFERENCE_TYPE_ARGUMENT |
		type_annotation::METHOD_REFERENCE_TYPE_ARGUMENT => TargetInfo::TypeArgument {
			offset: reader.read_u16()?,
			type_argument_index: reader.read_u8()?,
		},
		target_type => return Err(reader.malformed(format!("unknown target_type {target_type:#04x}"))),
	})
}

/// Checks that the `target_info` variant is the one `target_type` calls for.
fn matches_target_type(target_type: u8, target_info: &TargetInfo) -> bool {
	match target_info {
		TargetInfo::TypeParameter { .. } => matches!(target_type, type_annotation::CLASS_TYPE_PARAMETER | type_annotation::METHOD_TYPE_PARAMETER),
		TargetInfo::Supertype { .. } => target_type == type_annotation::CLASS_EXTENDS,
		TargetInfo::TypeParameterBound { .. } => matches!(target_type, type_annotation::CLASS_TYPE_PARAMETER_BOUND | type_annotation::METHOD_TYPE_PARAMETER_BOUND),
		TargetInfo::Empty => matches!(target_type, type_annotation::FIELD | type_annotation::METHOD_RETURN | type_annotation::METHOD_RECEIVER),
		TargetInfo::FormalParameter { .. } => target_type == type_annotation::METHOD_FORMAL_PARAMETER,
		TargetInfo::Throws { .. } => target_type == type_annotation::THROWS,
		TargetInfo::LocalVariable(_) => matches!(target_type, type_annotation::LOCAL_VARIABLE | type_annotation::RESOURCE_VARIABLE),
		TargetInfo::Catch { .. } => target_type == type_annotation::EXCEPTION_PARAMETER,
		TargetInfo::Offset { .. } => matches!(target_type,
			type_annotation::INSTANCEOF | type_annotation::NEW |
			type_annotation::CONSTRUCTOR_REFERENCE | type_annotation::METHOD_REFERENCE
		),
		TargetInfo::TypeArgument { .. } => (type_annotation::CAST..=type_annotation::METHOD_REFERENCE_TYPE_ARGUMENT).contains(&target_type),
	}
}

fn write_type_annotations(writer: &mut Vec<u8>, attribute: &'static str, annotations: &[TypeAnnotation]) -> Result<()> {
	writer.write_slice(annotations,
		|w, size| w.write_usize_as_u16(size),
		|w, annotation| {
			if !matches_target_type(annotation.target_type, &annotation.target_info) {
				return Err(AttributeError::invalid(attribute,
					format!("target_type {:#04x} doesn't fit {:?}", annotation.target_type, annotation.target_info)
				).into());
			}

			w.write_u8(annotation.target_type)?;
			match &annotation.target_info {
				&TargetInfo::TypeParameter { index } => w.write_u8(index)?,
				&TargetInfo::Supertype { index } => w.write_u16(index)?,
				&TargetInfo::TypeParameterBound { type_parameter_index, bound_index } => {
					w.write_u8(type_parameter_index)?;
					w.write_u8(bound_index)?;
				},
				TargetInfo::Empty => {},
				&TargetInfo::FormalParameter { index } => w.write_u8(index)?,
				&TargetInfo::Throws { index } => w.write_u16(index)?,
				TargetInfo::LocalVariable(table) => {
					w.write_slice(table,
						|w, size| w.write_usize_as_u16(size),
						|w, target| {
							w.write_u16(target.start)?;
							w.write_u16(target.length)?;
							w.write_u16(target.index)
						}
					)?;
				},
				&TargetInfo::Catch { exception_table_index } => w.write_u16(exception_table_index)?,
				&TargetInfo::Offset { offset } => w.write_u16(offset)?,
				&TargetInfo::TypeArgument { offset, type_argument_index } => {
					w.write_u16(offset)?;
					w.write_u8(type_argument_index)?;
				},
			}

			w.write_slice(&annotation.target_path,
				|w, size| w.write_usize_as_u8(size),
				|w, entry| {
					w.write_u8(entry.kind)?;
					w.write_u8(entry.argument_index)
				}
			)?;

			write_annotation(w, &annotation.annotation)
		}
	)
}

codec! {
	RuntimeInvisibleTypeAnnotationsCodec = RUNTIME_INVISIBLE_TYPE_ANNOTATIONS (attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS, Version::V1_8, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::RuntimeInvisibleTypeAnnotations(read_type_annotations(reader, context.pool())?))
		}
		write(writer, Attribute::RuntimeInvisibleTypeAnnotations(annotations)) {
			write_type_annotations(writer, attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS, annotations)
		}
	}
}

codec! {
	RuntimeVisibleTypeAnnotationsCodec = RUNTIME_VISIBLE_TYPE_ANNOTATIONS (attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS, Version::V1_8, false, BodyLayout::Variable) {
		read(context, reader) {
			Ok(Attribute::RuntimeVisibleTypeAnnotations(read_type_annotations(reader, context.pool())?))
		}
		write(writer, Attribute::RuntimeVisibleTypeAnnotations(annotations)) {
			write_type_annotations(writer, attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS, annotations)
		}
	}
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use pretty_assertions::assert_eq;
	use crate::{AttributeCodec, AttributeEncoder, AttributeError, DecodeContext, Pool};
	use crate::class_constants::type_annotation;
	use crate::codecs::{RUNTIME_INVISIBLE_TYPE_ANNOTATIONS, RUNTIME_VISIBLE_TYPE_ANNOTATIONS};
	use crate::tree::Attribute;
	use crate::tree::annotation::Annotation;
	use crate::tree::type_annotation::{LocalVariableTarget, TargetInfo, TypeAnnotation, TypePathEntry};

	fn pool() -> Result<Pool> {
		let mut pool = Pool::new();
		for i in 1..10 {
			pool.put_integer(i)?;
		}
		Ok(pool)
	}

	#[test]
	fn round_trip() -> Result<()> {
		let pool = pool()?;
		let bytes = [
			0x00, 0x02,
			// on a local variable, one range, path: type argument 0
			0x40, 0x00, 0x01, 0x00, 0x02, 0x00, 0x08, 0x00, 0x01,
			0x01, 0x03, 0x00,
			0x00, 0x04, 0x00, 0x00,
			// on the superclass, empty path
			0x10, 0xff, 0xff,
			0x00,
			0x00, 0x05, 0x00, 0x00,
		];
		let expected = Attribute::RuntimeVisibleTypeAnnotations(vec![
			TypeAnnotation {
				target_type: type_annotation::LOCAL_VARIABLE,
				target_info: TargetInfo::LocalVariable(vec![LocalVariableTarget { start: 2, length: 8, index: 1 }]),
				target_path: vec![TypePathEntry { kind: 3, argument_index: 0 }],
				annotation: Annotation { type_index: 4, element_value_pairs: Vec::new() },
			},
			TypeAnnotation {
				target_type: type_annotation::CLASS_EXTENDS,
				target_info: TargetInfo::Supertype { index: u16::MAX },
				target_path: Vec::new(),
				annotation: Annotation { type_index: 5, element_value_pairs: Vec::new() },
			},
		]);

		let codec: &'static dyn AttributeCodec = &RUNTIME_VISIBLE_TYPE_ANNOTATIONS;
		let attribute = codec.decode(DecodeContext::new(&bytes, &pool), 0, u32::try_from(bytes.len())?)?;
		assert_eq!(attribute.value()?, &expected);

		let mut written = Vec::new();
		RUNTIME_VISIBLE_TYPE_ANNOTATIONS.encode(&mut written, &expected)?;
		assert_eq!(written, bytes);
		Ok(())
	}

	#[test]
	fn mismatched_target() {
		let annotation = Attribute::RuntimeInvisibleTypeAnnotations(vec![TypeAnnotation {
			target_type: type_annotation::FIELD,
			target_info: TargetInfo::Throws { index: 0 },
			target_path: Vec::new(),
			annotation: Annotation { type_index: 1, element_value_pairs: Vec::new() },
		}]);

		let error = RUNTIME_INVISIBLE_TYPE_ANNOTATIONS.encode(&mut Vec::new(), &annotation).unwrap_err();
		assert!(error.downcast_ref::<AttributeError>().is_some_and(AttributeError::is_programming_error));
	}

	#[test]
	fn unknown_target_type() -> Result<()> {
		let pool = pool()?;
		let bytes = [0x00, 0x01, 0x20, 0x00];
		let codec: &'static dyn AttributeCodec = &RUNTIME_INVISIBLE_TYPE_ANNOTATIONS;
		let error = codec.decode(DecodeContext::new(&bytes, &pool), 0, 4).unwrap_err();
		assert!(matches!(error.downcast_ref::<AttributeError>(), Some(AttributeError::Malformed { offset: 3, .. })));
		Ok(())
	}
}
