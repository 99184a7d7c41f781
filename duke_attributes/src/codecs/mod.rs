//! The codecs of the standard attributes, one static per attribute.
//!
//! The codecs of attributes with a simple structure live here, the others in their own modules.

mod annotation;
mod code;
mod module;
mod record;
mod stack_map;
mod type_annotation;

use anyhow::Result;
use crate::class_constants::attribute;
use crate::macros::codec;
use crate::{AttributeCodec, BodyLayout, ClassReader, ClassWrite, ConstantPool, Version};
use crate::tree::{Attribute, BootstrapMethod, CharacterRange, EnclosingMethod, InnerClass, LineNumber, LocalVariable, LocalVariableType, MethodParameter, ModuleHash, ModuleHashes};

pub use annotation::{
	AnnotationDefaultCodec, ANNOTATION_DEFAULT,
	RuntimeInvisibleAnnotationsCodec, RUNTIME_INVISIBLE_ANNOTATIONS,
	RuntimeInvisibleParameterAnnotationsCodec, RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
	RuntimeVisibleAnnotationsCodec, RUNTIME_VISIBLE_ANNOTATIONS,
	RuntimeVisibleParameterAnnotationsCodec, RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
};
pub use code::{CodeCodec, CODE};
pub use module::{ModuleCodec, MODULE};
pub use record::{RecordCodec, RECORD};
pub use stack_map::{FrameState, StackMapTableCodec, STACK_MAP_TABLE};
pub use type_annotation::{
	RuntimeInvisibleTypeAnnotationsCodec, RUNTIME_INVISIBLE_TYPE_ANNOTATIONS,
	RuntimeVisibleTypeAnnotationsCodec, RUNTIME_VISIBLE_TYPE_ANNOTATIONS,
};

/// All standard codecs, sorted by attribute name.
pub static ALL: [&dyn AttributeCodec; 36] = [
	&ANNOTATION_DEFAULT,
	&BOOTSTRAP_METHODS,
	&CHARACTER_RANGE_TABLE,
	&CODE,
	&COMPILATION_ID,
	&CONSTANT_VALUE,
	&DEPRECATED,
	&ENCLOSING_METHOD,
	&EXCEPTIONS,
	&INNER_CLASSES,
	&LINE_NUMBER_TABLE,
	&LOCAL_VARIABLE_TABLE,
	&LOCAL_VARIABLE_TYPE_TABLE,
	&METHOD_PARAMETERS,
	&MODULE,
	&MODULE_HASHES,
	&MODULE_MAIN_CLASS,
	&MODULE_PACKAGES,
	&MODULE_RESOLUTION,
	&MODULE_TARGET,
	&NEST_HOST,
	&NEST_MEMBERS,
	&PERMITTED_SUBCLASSES,
	&RECORD,
	&RUNTIME_INVISIBLE_ANNOTATIONS,
	&RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
	&RUNTIME_INVISIBLE_TYPE_ANNOTATIONS,
	&RUNTIME_VISIBLE_ANNOTATIONS,
	&RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
	&RUNTIME_VISIBLE_TYPE_ANNOTATIONS,
	&SIGNATURE,
	&SOURCE_DEBUG_EXTENSION,
	&SOURCE_FILE,
	&SOURCE_ID,
	&STACK_MAP_TABLE,
	&SYNTHETIC,
];

/// Reads a `u2` counted list of constant pool indices.
fn read_index_list(reader: &mut ClassReader<'_>, pool: &dyn ConstantPool) -> Result<Vec<u16>> {
	reader.read_vec(
		|r| r.read_u16_as_usize(),
		|r| r.read_index(pool)
	)
}

fn write_index_list(writer: &mut Vec<u8>, list: &[u16]) -> Result<()> {
	writer.write_slice(list,
		|w, size| w.write_usize_as_u16(size),
		|w, &index| w.write_u16(index)
	)
}

codec! {
	/// The bootstrap methods referenced by `invokedynamic` instructions and dynamic constants.
	BootstrapMethodsCodec = BOOTSTRAP_METHODS (attribute::BOOTSTRAP_METHODS, Version::V1_7, false, BodyLayout::Variable) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::BootstrapMethods(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(BootstrapMethod {
					method_handle: r.read_index(pool)?,
					arguments: read_index_list(r, pool)?,
				})
			)?))
		}
		write(writer, Attribute::BootstrapMethods(methods)) {
			writer.write_slice(methods,
				|w, size| w.write_usize_as_u16(size),
				|w, method| {
					w.write_u16(method.method_handle)?;
					write_index_list(w, &method.arguments)
				}
			)
		}
	}
}

codec! {
	CharacterRangeTableCodec = CHARACTER_RANGE_TABLE (attribute::CHARACTER_RANGE_TABLE, Version::V1_4, true, BodyLayout::Table { count_width: 2, record_size: 14 }) {
		read(_context, reader) {
			Ok(Attribute::CharacterRangeTable(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(CharacterRange {
					start_pc: r.read_u16()?,
					end_pc: r.read_u16()?,
					range_start: r.read_i32()?,
					range_end: r.read_i32()?,
					flags: r.read_u16()?,
				})
			)?))
		}
		write(writer, Attribute::CharacterRangeTable(ranges)) {
			writer.write_slice(ranges,
				|w, size| w.write_usize_as_u16(size),
				|w, range| {
					w.write_u16(range.start_pc)?;
					w.write_u16(range.end_pc)?;
					w.write_i32(range.range_start)?;
					w.write_i32(range.range_end)?;
					w.write_u16(range.flags)
				}
			)
		}
	}
}

codec! {
	CompilationIdCodec = COMPILATION_ID (attribute::COMPILATION_ID, Version::V1_0, true, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::CompilationId(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::CompilationId(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	/// The value of a constant field.
	ConstantValueCodec = CONSTANT_VALUE (attribute::CONSTANT_VALUE, Version::V1_0, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::ConstantValue(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::ConstantValue(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	DeprecatedCodec = DEPRECATED (attribute::DEPRECATED, Version::V1_0, true, BodyLayout::Fixed(0)) {
		read(_context, _reader) {
			Ok(Attribute::Deprecated)
		}
		write(_writer, Attribute::Deprecated) {
			Ok(())
		}
	}
}

codec! {
	EnclosingMethodCodec = ENCLOSING_METHOD (attribute::ENCLOSING_METHOD, Version::V1_5, false, BodyLayout::Fixed(4)) {
		read(context, reader) {
			Ok(Attribute::EnclosingMethod(EnclosingMethod {
				class: reader.read_index(context.pool())?,
				method: reader.read_optional_index(context.pool())?,
			}))
		}
		write(writer, Attribute::EnclosingMethod(enclosing_method)) {
			writer.write_u16(enclosing_method.class)?;
			writer.write_optional_index(enclosing_method.method)
		}
	}
}

codec! {
	/// The checked exceptions a method may throw.
	ExceptionsCodec = EXCEPTIONS (attribute::EXCEPTIONS, Version::V1_0, false, BodyLayout::Table { count_width: 2, record_size: 2 }) {
		read(context, reader) {
			Ok(Attribute::Exceptions(read_index_list(reader, context.pool())?))
		}
		write(writer, Attribute::Exceptions(exceptions)) {
			write_index_list(writer, exceptions)
		}
	}
}

codec! {
	InnerClassesCodec = INNER_CLASSES (attribute::INNER_CLASSES, Version::V1_0, false, BodyLayout::Table { count_width: 2, record_size: 8 }) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::InnerClasses(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(InnerClass {
					inner_class: r.read_index(pool)?,
					outer_class: r.read_optional_index(pool)?,
					inner_name: r.read_optional_index(pool)?,
					flags: r.read_u16()?,
				})
			)?))
		}
		write(writer, Attribute::InnerClasses(classes)) {
			writer.write_slice(classes,
				|w, size| w.write_usize_as_u16(size),
				|w, class| {
					w.write_u16(class.inner_class)?;
					w.write_optional_index(class.outer_class)?;
					w.write_optional_index(class.inner_name)?;
					w.write_u16(class.flags)
				}
			)
		}
	}
}

codec! {
	LineNumberTableCodec = LINE_NUMBER_TABLE (attribute::LINE_NUMBER_TABLE, Version::V1_0, true, BodyLayout::Table { count_width: 2, record_size: 4 }) {
		read(_context, reader) {
			Ok(Attribute::LineNumberTable(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(LineNumber {
					start: r.read_u16()?,
					line: r.read_u16()?,
				})
			)?))
		}
		write(writer, Attribute::LineNumberTable(lines)) {
			writer.write_slice(lines,
				|w, size| w.write_usize_as_u16(size),
				|w, line| {
					w.write_u16(line.start)?;
					w.write_u16(line.line)
				}
			)
		}
	}
}

codec! {
	LocalVariableTableCodec = LOCAL_VARIABLE_TABLE (attribute::LOCAL_VARIABLE_TABLE, Version::V1_0, true, BodyLayout::Table { count_width: 2, record_size: 10 }) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::LocalVariableTable(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(LocalVariable {
					start: r.read_u16()?,
					length: r.read_u16()?,
					name_index: r.read_index(pool)?,
					descriptor_index: r.read_index(pool)?,
					index: r.read_u16()?,
				})
			)?))
		}
		write(writer, Attribute::LocalVariableTable(variables)) {
			writer.write_slice(variables,
				|w, size| w.write_usize_as_u16(size),
				|w, variable| {
					w.write_u16(variable.start)?;
					w.write_u16(variable.length)?;
					w.write_u16(variable.name_index)?;
					w.write_u16(variable.descriptor_index)?;
					w.write_u16(variable.index)
				}
			)
		}
	}
}

codec! {
	LocalVariableTypeTableCodec = LOCAL_VARIABLE_TYPE_TABLE (attribute::LOCAL_VARIABLE_TYPE_TABLE, Version::V1_5, true, BodyLayout::Table { count_width: 2, record_size: 10 }) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::LocalVariableTypeTable(reader.read_vec(
				|r| r.read_u16_as_usize(),
				|r| Ok(LocalVariableType {
					start: r.read_u16()?,
					length: r.read_u16()?,
					name_index: r.read_index(pool)?,
					signature_index: r.read_index(pool)?,
					index: r.read_u16()?,
				})
			)?))
		}
		write(writer, Attribute::LocalVariableTypeTable(variables)) {
			writer.write_slice(variables,
				|w, size| w.write_usize_as_u16(size),
				|w, variable| {
					w.write_u16(variable.start)?;
					w.write_u16(variable.length)?;
					w.write_u16(variable.name_index)?;
					w.write_u16(variable.signature_index)?;
					w.write_u16(variable.index)
				}
			)
		}
	}
}

codec! {
	/// Names and flags of the formal parameters of a method. One of the two attributes counting with a `u1`.
	MethodParametersCodec = METHOD_PARAMETERS (attribute::METHOD_PARAMETERS, Version::V1_8, false, BodyLayout::Table { count_width: 1, record_size: 4 }) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::MethodParameters(reader.read_vec(
				|r| r.read_u8_as_usize(),
				|r| Ok(MethodParameter {
					name: r.read_optional_index(pool)?,
					flags: r.read_u16()?,
				})
			)?))
		}
		write(writer, Attribute::MethodParameters(parameters)) {
			writer.write_slice(parameters,
				|w, size| w.write_usize_as_u8(size),
				|w, parameter| {
					w.write_optional_index(parameter.name)?;
					w.write_u16(parameter.flags)
				}
			)
		}
	}
}

codec! {
	ModuleHashesCodec = MODULE_HASHES (attribute::MODULE_HASHES, Version::V9, false, BodyLayout::Variable) {
		read(context, reader) {
			let pool = context.pool();
			Ok(Attribute::ModuleHashes(ModuleHashes {
				algorithm: reader.read_index(pool)?,
				hashes: reader.read_vec(
					|r| r.read_u16_as_usize(),
					|r| {
						let module = r.read_index(pool)?;
						let length = r.read_u16_as_usize()?;
						let hash = r.read_slice(length)?.to_vec();
						Ok(ModuleHash { module, hash })
					}
				)?,
			}))
		}
		write(writer, Attribute::ModuleHashes(hashes)) {
			writer.write_u16(hashes.algorithm)?;
			writer.write_slice(&hashes.hashes,
				|w, size| w.write_usize_as_u16(size),
				|w, hash| {
					w.write_u16(hash.module)?;
					w.write_usize_as_u16(hash.hash.len())?;
					w.write_u8_slice(&hash.hash)
				}
			)
		}
	}
}

codec! {
	ModuleMainClassCodec = MODULE_MAIN_CLASS (attribute::MODULE_MAIN_CLASS, Version::V9, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::ModuleMainClass(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::ModuleMainClass(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	ModulePackagesCodec = MODULE_PACKAGES (attribute::MODULE_PACKAGES, Version::V9, false, BodyLayout::Table { count_width: 2, record_size: 2 }) {
		read(context, reader) {
			Ok(Attribute::ModulePackages(read_index_list(reader, context.pool())?))
		}
		write(writer, Attribute::ModulePackages(packages)) {
			write_index_list(writer, packages)
		}
	}
}

codec! {
	ModuleResolutionCodec = MODULE_RESOLUTION (attribute::MODULE_RESOLUTION, Version::V9, false, BodyLayout::Fixed(2)) {
		read(_context, reader) {
			Ok(Attribute::ModuleResolution(reader.read_u16()?))
		}
		write(writer, Attribute::ModuleResolution(flags)) {
			writer.write_u16(*flags)
		}
	}
}

codec! {
	ModuleTargetCodec = MODULE_TARGET (attribute::MODULE_TARGET, Version::V9, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::ModuleTarget(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::ModuleTarget(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	NestHostCodec = NEST_HOST (attribute::NEST_HOST, Version::V11, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::NestHost(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::NestHost(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	NestMembersCodec = NEST_MEMBERS (attribute::NEST_MEMBERS, Version::V11, false, BodyLayout::Table { count_width: 2, record_size: 2 }) {
		read(context, reader) {
			Ok(Attribute::NestMembers(read_index_list(reader, context.pool())?))
		}
		write(writer, Attribute::NestMembers(members)) {
			write_index_list(writer, members)
		}
	}
}

codec! {
	PermittedSubclassesCodec = PERMITTED_SUBCLASSES (attribute::PERMITTED_SUBCLASSES, Version::V15, false, BodyLayout::Table { count_width: 2, record_size: 2 }) {
		read(context, reader) {
			Ok(Attribute::PermittedSubclasses(read_index_list(reader, context.pool())?))
		}
		write(writer, Attribute::PermittedSubclasses(subclasses)) {
			write_index_list(writer, subclasses)
		}
	}
}

codec! {
	SignatureCodec = SIGNATURE (attribute::SIGNATURE, Version::V1_5, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::Signature(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::Signature(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	/// Extended debugging information, like the `SMAP` of languages compiling to java bytecode. The contents are not
	/// interpreted.
	SourceDebugExtensionCodec = SOURCE_DEBUG_EXTENSION (attribute::SOURCE_DEBUG_EXTENSION, Version::V1_5, false, BodyLayout::Blob) {
		read(_context, reader) {
			let length = reader.remaining();
			Ok(Attribute::SourceDebugExtension(reader.read_slice(length)?.to_vec()))
		}
		write(writer, Attribute::SourceDebugExtension(bytes)) {
			writer.write_u8_slice(bytes)
		}
	}
}

codec! {
	SourceFileCodec = SOURCE_FILE (attribute::SOURCE_FILE, Version::V1_0, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::SourceFile(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::SourceFile(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	SourceIdCodec = SOURCE_ID (attribute::SOURCE_ID, Version::V1_0, false, BodyLayout::Fixed(2)) {
		read(context, reader) {
			Ok(Attribute::SourceId(reader.read_index(context.pool())?))
		}
		write(writer, Attribute::SourceId(index)) {
			writer.write_u16(*index)
		}
	}
}

codec! {
	SyntheticCodec = SYNTHETIC (attribute::SYNTHETIC, Version::V1_0, false, BodyLayout::Fixed(0)) {
		read(_context, _reader) {
			Ok(Attribute::Synthetic)
		}
		write(_writer, Attribute::Synthetic) {
			Ok(())
		}
	}
}
