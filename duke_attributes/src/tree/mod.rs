//! The materialized form of attributes.
//!
//! Constant pool references are kept as raw indices. Fields that may be `0` in the class file to mean "absent" are
//! stored as [`Option<NonZeroU16>`].

pub mod annotation;
pub mod code;
pub mod module;
pub mod record;
pub mod stack_map;
pub mod type_annotation;

use std::num::NonZeroU16;
use anyhow::{Context, Result};
use java_string::{JavaStr, JavaString};
use crate::class_constants::attribute;
use crate::{registry, AttributeCodec};
use crate::tree::annotation::{Annotation, ElementValue};
use crate::tree::code::CodeAttribute;
use crate::tree::module::ModuleAttribute;
use crate::tree::record::RecordComponent;
use crate::tree::stack_map::StackMapTableAttribute;
use crate::tree::type_annotation::TypeAnnotation;

/// The contents of one attribute, without its name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Attribute {
	AnnotationDefault(ElementValue),
	BootstrapMethods(Vec<BootstrapMethod>),
	CharacterRangeTable(Vec<CharacterRange>),
	Code(CodeAttribute),
	CompilationId(u16),
	ConstantValue(u16),
	Deprecated,
	EnclosingMethod(EnclosingMethod),
	Exceptions(Vec<u16>),
	InnerClasses(Vec<InnerClass>),
	LineNumberTable(Vec<LineNumber>),
	LocalVariableTable(Vec<LocalVariable>),
	LocalVariableTypeTable(Vec<LocalVariableType>),
	MethodParameters(Vec<MethodParameter>),
	Module(ModuleAttribute),
	ModuleHashes(ModuleHashes),
	ModuleMainClass(u16),
	ModulePackages(Vec<u16>),
	/// The `resolution_flags` of the module.
	ModuleResolution(u16),
	ModuleTarget(u16),
	NestHost(u16),
	NestMembers(Vec<u16>),
	PermittedSubclasses(Vec<u16>),
	Record(Vec<RecordComponent>),
	RuntimeInvisibleAnnotations(Vec<Annotation>),
	RuntimeInvisibleParameterAnnotations(Vec<Vec<Annotation>>),
	RuntimeInvisibleTypeAnnotations(Vec<TypeAnnotation>),
	RuntimeVisibleAnnotations(Vec<Annotation>),
	RuntimeVisibleParameterAnnotations(Vec<Vec<Annotation>>),
	RuntimeVisibleTypeAnnotations(Vec<TypeAnnotation>),
	Signature(u16),
	/// The raw bytes, see [`decode_debug_extension`] for getting a string out of them.
	SourceDebugExtension(Vec<u8>),
	SourceFile(u16),
	SourceId(u16),
	StackMapTable(StackMapTableAttribute),
	Synthetic,
	/// The body of an attribute nested in a `Code` or `Record` attribute that has no codec.
	Unknown(Vec<u8>),
}

impl Attribute {
	/// The attribute name, as stored in the constant pool.
	///
	/// Returns `"Unknown"` for [`Attribute::Unknown`], whose name isn't known to the value.
	pub fn name(&self) -> &'static str {
		match self {
			Attribute::AnnotationDefault(_) => attribute::ANNOTATION_DEFAULT,
			Attribute::BootstrapMethods(_) => attribute::BOOTSTRAP_METHODS,
			Attribute::CharacterRangeTable(_) => attribute::CHARACTER_RANGE_TABLE,
			Attribute::Code(_) => attribute::CODE,
			Attribute::CompilationId(_) => attribute::COMPILATION_ID,
			Attribute::ConstantValue(_) => attribute::CONSTANT_VALUE,
			Attribute::Deprecated => attribute::DEPRECATED,
			Attribute::EnclosingMethod(_) => attribute::ENCLOSING_METHOD,
			Attribute::Exceptions(_) => attribute::EXCEPTIONS,
			Attribute::InnerClasses(_) => attribute::INNER_CLASSES,
			Attribute::LineNumberTable(_) => attribute::LINE_NUMBER_TABLE,
			Attribute::LocalVariableTable(_) => attribute::LOCAL_VARIABLE_TABLE,
			Attribute::LocalVariableTypeTable(_) => attribute::LOCAL_VARIABLE_TYPE_TABLE,
			Attribute::MethodParameters(_) => attribute::METHOD_PARAMETERS,
			Attribute::Module(_) => attribute::MODULE,
			Attribute::ModuleHashes(_) => attribute::MODULE_HASHES,
			Attribute::ModuleMainClass(_) => attribute::MODULE_MAIN_CLASS,
			Attribute::ModulePackages(_) => attribute::MODULE_PACKAGES,
			Attribute::ModuleResolution(_) => attribute::MODULE_RESOLUTION,
			Attribute::ModuleTarget(_) => attribute::MODULE_TARGET,
			Attribute::NestHost(_) => attribute::NEST_HOST,
			Attribute::NestMembers(_) => attribute::NEST_MEMBERS,
			Attribute::PermittedSubclasses(_) => attribute::PERMITTED_SUBCLASSES,
			Attribute::Record(_) => attribute::RECORD,
			Attribute::RuntimeInvisibleAnnotations(_) => attribute::RUNTIME_INVISIBLE_ANNOTATIONS,
			Attribute::RuntimeInvisibleParameterAnnotations(_) => attribute::RUNTIME_INVISIBLE_PARAMETER_ANNOTATIONS,
			Attribute::RuntimeInvisibleTypeAnnotations(_) => attribute::RUNTIME_INVISIBLE_TYPE_ANNOTATIONS,
			Attribute::RuntimeVisibleAnnotations(_) => attribute::RUNTIME_VISIBLE_ANNOTATIONS,
			Attribute::RuntimeVisibleParameterAnnotations(_) => attribute::RUNTIME_VISIBLE_PARAMETER_ANNOTATIONS,
			Attribute::RuntimeVisibleTypeAnnotations(_) => attribute::RUNTIME_VISIBLE_TYPE_ANNOTATIONS,
			Attribute::Signature(_) => attribute::SIGNATURE,
			Attribute::SourceDebugExtension(_) => attribute::SOURCE_DEBUG_EXTENSION,
			Attribute::SourceFile(_) => attribute::SOURCE_FILE,
			Attribute::SourceId(_) => attribute::SOURCE_ID,
			Attribute::StackMapTable(_) => attribute::STACK_MAP_TABLE,
			Attribute::Synthetic => attribute::SYNTHETIC,
			Attribute::Unknown(_) => "Unknown",
		}
	}

	/// The codec reading and writing this kind of attribute. [`None`] for [`Attribute::Unknown`].
	pub fn codec(&self) -> Option<&'static dyn AttributeCodec> {
		match self {
			Attribute::Unknown(_) => None,
			attribute => registry().resolve_str(attribute.name()),
		}
	}
}

/// An attribute together with the constant pool index of its name, as found in nested attribute tables.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeInfo {
	pub name_index: u16,
	pub attribute: Attribute,
}

/// An entry of the `BootstrapMethods` attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapMethod {
	/// Index of a `CONSTANT_MethodHandle_info`.
	pub method_handle: u16,
	/// Indices of loadable constants.
	pub arguments: Vec<u16>,
}

/// An entry of the `CharacterRangeTable` attribute, mapping bytecode to positions in the source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CharacterRange {
	pub start_pc: u16,
	pub end_pc: u16,
	/// Line and column, encoded as `line << 10 | column`.
	pub range_start: i32,
	pub range_end: i32,
	pub flags: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct EnclosingMethod {
	pub class: u16,
	/// Absent if the class isn't enclosed by a method or constructor, for example in a field initializer.
	pub method: Option<NonZeroU16>,
}

/// An entry of the `InnerClasses` attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct InnerClass {
	pub inner_class: u16,
	/// Absent for top level, local and anonymous classes.
	pub outer_class: Option<NonZeroU16>,
	/// Absent for anonymous classes.
	pub inner_name: Option<NonZeroU16>,
	pub flags: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LineNumber {
	pub start: u16,
	pub line: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalVariable {
	pub start: u16,
	pub length: u16,
	pub name_index: u16,
	pub descriptor_index: u16,
	/// The local variable index.
	pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct LocalVariableType {
	pub start: u16,
	pub length: u16,
	pub name_index: u16,
	pub signature_index: u16,
	pub index: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodParameter {
	/// Absent for parameters without a name.
	pub name: Option<NonZeroU16>,
	pub flags: u16,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHashes {
	pub algorithm: u16,
	pub hashes: Vec<ModuleHash>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleHash {
	/// Index of a `CONSTANT_Module_info`.
	pub module: u16,
	pub hash: Vec<u8>,
}

/// Gets the contents of a `SourceDebugExtension` attribute as a string.
pub fn decode_debug_extension(bytes: &[u8]) -> Result<JavaString> {
	JavaString::from_modified_utf8(bytes.to_vec())
		.context("SourceDebugExtension is not valid modified utf8")
}

/// Creates the contents of a `SourceDebugExtension` attribute from a string.
pub fn encode_debug_extension(string: &JavaStr) -> Vec<u8> {
	string.to_modified_utf8().into_owned()
}

#[cfg(test)]
mod testing {
	use anyhow::Result;
	use java_string::JavaStr;
	use pretty_assertions::assert_eq;
	use crate::tree::{decode_debug_extension, encode_debug_extension, Attribute};

	#[test]
	fn codec_matches_name() {
		let attribute = Attribute::NestMembers(vec![3, 4]);
		assert_eq!(attribute.name(), "NestMembers");
		assert_eq!(attribute.codec().map(|codec| codec.name()), Some("NestMembers"));

		assert!(Attribute::Unknown(vec![1, 2, 3]).codec().is_none());
	}

	#[test]
	fn debug_extension() -> Result<()> {
		let string = JavaStr::from_str("SMAP\nFoo.kt\nKotlin\n\0");
		let bytes = encode_debug_extension(string);
		assert_eq!(bytes.len(), 21);
		assert_eq!(decode_debug_extension(&bytes)?, string);
		assert!(decode_debug_extension(&[0xff]).is_err());
		Ok(())
	}
}
